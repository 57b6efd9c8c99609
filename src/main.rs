use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use anyhow::{Context, Result, bail};
use log::error;

use specfile::{CompileConfig, SpecFile};

use cli::CliArgs;

mod cli;
mod logging;

/// cli entrypoint
fn main() {
    if let Err(e) = try_main() {
        // Argument errors can occur before the logger is installed
        if log::max_level() == log::LevelFilter::Off {
            eprintln!("{}: error: {e:#}", env!("CARGO_BIN_NAME"));
        } else {
            error!("{e:#}");
        }

        std::process::exit(1);
    }
}

/// Main program entrypoint
fn try_main() -> Result<()> {
    let args = cli::parse_arguments()?;

    if args.options.help {
        cli::print_help();
        return Ok(());
    }

    if args.options.version {
        cli::print_version();
        return Ok(());
    }

    logging::setup_logger(&args.options)?;

    run_compiler(args)
}

/// Runs the spec compiler with the command line arguments
fn run_compiler(mut args: CliArgs) -> Result<()> {
    let input = args.input.take().context("no spec file specified")?;
    let arch = args.options.arch.context("no architecture specified")?;

    if args.options.with_tracing && args.options.stub_file.is_none() {
        bail!("cannot use --with-tracing without the -s option");
    }

    let dll_name = match args.options.dll_name.take() {
        Some(name) => name,
        None => default_dll_name(&input)?,
    };

    let mut config = CompileConfig::new(arch, dll_name);
    config.os_version = args.options.os_version;
    config.import_lib = args.options.implib;
    config.tracing = args.options.with_tracing;
    config.tool_name = env!("CARGO_PKG_NAME").into();

    let source = std::fs::read_to_string(&input)
        .with_context(|| format!("could not read spec file '{}'", input.display()))?;

    let spec = compile_spec(&input, &source, &config)?;

    if !args.options.no_private_warnings {
        spec.check_private_exports();
    }

    if let Some(def_path) = &args.options.def_file {
        let mut writer = create_output(def_path)?;
        spec.write_def(&mut writer, &config)
            .and_then(|()| writer.flush())
            .with_context(|| format!("could not write output file '{}'", def_path.display()))?;
    }

    if let Some(stub_path) = &args.options.stub_file {
        let mut writer = create_output(stub_path)?;
        spec.write_stubs(&mut writer, &config)
            .and_then(|()| writer.flush())
            .with_context(|| format!("could not write output file '{}'", stub_path.display()))?;
    }

    Ok(())
}

/// Parses the spec source and resolves ordinals.
///
/// Fatal compile diagnostics are prefixed with the input file name.
fn compile_spec<'a>(
    input: &Path,
    source: &'a str,
    config: &CompileConfig,
) -> Result<SpecFile<'a>> {
    let mut spec =
        SpecFile::parse(source, config).with_context(|| input.display().to_string())?;
    spec.resolve_ordinals()
        .with_context(|| input.display().to_string())?;

    Ok(spec)
}

/// Derives the dll name from the spec file stem.
fn default_dll_name(input: &Path) -> Result<String> {
    let stem = input
        .file_stem()
        .and_then(|stem| stem.to_str())
        .with_context(|| format!("cannot derive a dll name from '{}'", input.display()))?;

    Ok(format!("{stem}.dll"))
}

fn create_output(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path)
        .with_context(|| format!("could not open output file '{}'", path.display()))?;

    Ok(BufWriter::new(file))
}
