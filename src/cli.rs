use std::path::PathBuf;

use anyhow::{Context, bail};
use specfile::Arch;

use crate::logging::ColorOption;

const CARGO_PKG_NAME: &str = env!("CARGO_PKG_NAME");
const CARGO_PKG_VERSION: &str = env!("CARGO_PKG_VERSION");
const CARGO_PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

fn fmt_help(out: impl FnOnce(std::fmt::Arguments)) {
    const HELP_USAGE: &str = "[options] <spec file>";
    const HELP_ARGUMENTS: &str = r#"
  <spec file>                Export specification file to compile
"#;

    const HELP_OPTIONS: &str = r#"
  -d=<file>                  Generate a module-definition (.def) file
  -s=<file>                  Generate a C stub file
  -n=<name>                  Name of the dll [default: <spec file stem>.dll]
  -a=<arch>                  Set the target architecture [possible values: i386, i686, x86_64, amd64, arm, armv7, arm64, aarch64]
  --version=0x<version>      Minimum OS version to include exports for [default: 0x502]
  --implib                   Generate a def file for an import library
  --no-private-warnings      Suppress warnings about exports that should be private
  --with-tracing             Generate wine-like "+relay" trace trampolines (needs -s)
  --color-diagnostics[=<color>]
                             Use colors in diagnostic messages [default: auto] [possible values: auto, always, never]
  -v, --verbose...           Increase logging verbosity
  -h, --help                 Print help and exit
  -V                         Print version and exit
"#;

    let argv0 = std::env::args_os().next();

    let prog = argv0
        .as_ref()
        .map(|arg| arg.to_string_lossy())
        .unwrap_or_else(|| CARGO_PKG_NAME.into());

    out(format_args!(
        "{CARGO_PKG_DESCRIPTION}\n\
        Usage: {prog} {HELP_USAGE}\n\n\
        Arguments:\n\
        {arguments}\n\n\
        Options:\n\
        {options}",
        arguments = HELP_ARGUMENTS.trim_matches('\n'),
        options = HELP_OPTIONS.trim_matches('\n'),
    ));
}

/// Prints the help text to stdout.
pub fn print_help() {
    fmt_help(|args| println!("{args}"));
}

/// Prints the version line to stdout.
pub fn print_version() {
    println!("{CARGO_PKG_NAME} {CARGO_PKG_VERSION}");
}

#[derive(Debug, Default)]
pub struct CliArgs {
    pub input: Option<PathBuf>,
    pub options: CliOptions,
}

impl CliArgs {
    pub fn try_update_from<I, T>(&mut self, arg_iter: I) -> anyhow::Result<()>
    where
        I: Iterator<Item = T>,
        T: Into<String>,
    {
        for arg in arg_iter {
            if self.options.help || self.options.version {
                break;
            }

            let arg = arg.into();

            if self.options.try_update_from(&arg)? {
                continue;
            }

            if arg.starts_with('-') {
                bail!("unknown argument: {arg}");
            }

            if self.input.is_some() {
                bail!("unexpected argument: {arg}");
            }

            self.input = Some(arg.into());
        }

        Ok(())
    }
}

#[derive(Debug)]
pub struct CliOptions {
    pub def_file: Option<PathBuf>,
    pub stub_file: Option<PathBuf>,
    pub dll_name: Option<String>,
    pub arch: Option<Arch>,
    pub os_version: u32,
    pub implib: bool,
    pub no_private_warnings: bool,
    pub with_tracing: bool,
    pub color_diagnostics: ColorOption,
    pub verbose: usize,
    pub help: bool,
    pub version: bool,
}

impl std::default::Default for CliOptions {
    fn default() -> Self {
        Self {
            def_file: None,
            stub_file: None,
            dll_name: None,
            arch: None,
            os_version: 0x502,
            implib: false,
            no_private_warnings: false,
            with_tracing: false,
            color_diagnostics: ColorOption::Auto,
            verbose: 0,
            help: false,
            version: false,
        }
    }
}

impl CliOptions {
    fn try_update_from(&mut self, arg: &str) -> anyhow::Result<bool> {
        if arg.eq_ignore_ascii_case("-h") || arg.eq_ignore_ascii_case("--help") {
            self.help = true;
        } else if let Some(v) = arg.strip_prefix("-d=") {
            self.def_file = Some(v.into());
        } else if let Some(v) = arg.strip_prefix("-s=") {
            self.stub_file = Some(v.into());
        } else if let Some(v) = arg.strip_prefix("-n=") {
            self.dll_name = Some(v.to_owned());
        } else if let Some(v) = arg.strip_prefix("-a=") {
            self.arch =
                Some(Arch::parse(v).with_context(|| format!("invalid architecture: {v}"))?);
        } else if let Some(v) = arg.strip_prefix("--version=0x") {
            self.os_version = u32::from_str_radix(v, 16)
                .ok()
                .with_context(|| format!("invalid OS version: 0x{v}"))?;
        } else if arg.eq_ignore_ascii_case("--implib") {
            self.implib = true;
        } else if arg.eq_ignore_ascii_case("--no-private-warnings") {
            self.no_private_warnings = true;
        } else if arg.eq_ignore_ascii_case("--with-tracing") {
            self.with_tracing = true;
        } else if arg == "--color-diagnostics" {
            self.color_diagnostics = ColorOption::Auto;
        } else if let Some(v) = arg.strip_prefix("--color-diagnostics=") {
            self.color_diagnostics = ColorOption::parse(v, true)
                .with_context(|| format!("unknown '--color-diagnostics' value: {v}"))?;
        } else if arg == "-v" || arg == "--verbose" {
            self.verbose += 1;
        } else if arg == "-V" {
            self.version = true;
        } else {
            return Ok(false);
        }

        Ok(true)
    }
}

/// Parses the process command line arguments.
pub fn parse_arguments() -> anyhow::Result<CliArgs> {
    let mut args = CliArgs::default();
    args.try_update_from(std::env::args().skip(1))?;
    Ok(args)
}

#[cfg(test)]
mod tests {
    use specfile::Arch;

    use super::CliArgs;
    use crate::logging::ColorOption;

    fn parse(args: &[&str]) -> anyhow::Result<CliArgs> {
        let mut parsed = CliArgs::default();
        parsed.try_update_from(args.iter().copied())?;
        Ok(parsed)
    }

    #[test]
    fn full_invocation() {
        let args = parse(&[
            "-a=i686",
            "-d=widget.def",
            "-s=widget_stubs.c",
            "-n=widget.dll",
            "--with-tracing",
            "widget.spec",
        ])
        .expect("could not parse arguments");

        assert_eq!(args.options.arch, Some(Arch::X86));
        assert_eq!(args.options.def_file.as_deref(), Some("widget.def".as_ref()));
        assert_eq!(
            args.options.stub_file.as_deref(),
            Some("widget_stubs.c".as_ref())
        );
        assert_eq!(args.options.dll_name.as_deref(), Some("widget.dll"));
        assert!(args.options.with_tracing);
        assert_eq!(args.input.as_deref(), Some("widget.spec".as_ref()));
    }

    #[test]
    fn os_version_is_hex() {
        let args = parse(&["--version=0x600", "widget.spec"]).expect("could not parse arguments");
        assert_eq!(args.options.os_version, 0x600);

        parse(&["--version=0xzz"]).expect_err("expected an invalid version error");
    }

    #[test]
    fn arch_aliases() {
        for (value, arch) in [
            ("i386", Arch::X86),
            ("I686", Arch::X86),
            ("x86_64", Arch::Amd64),
            ("amd64", Arch::Amd64),
            ("armv7", Arch::Arm),
            ("aarch64", Arch::Arm64),
        ] {
            let arg = format!("-a={value}");
            let args = parse(&[arg.as_str()]).expect("could not parse arguments");
            assert_eq!(args.options.arch, Some(arch));
        }

        parse(&["-a=mips"]).expect_err("expected an invalid architecture error");
    }

    #[test]
    fn unknown_arguments_are_rejected() {
        parse(&["--frobnicate"]).expect_err("expected an unknown argument error");
        parse(&["one.spec", "two.spec"]).expect_err("expected an unexpected argument error");
    }

    #[test]
    fn color_diagnostics_values() {
        let args =
            parse(&["--color-diagnostics=never"]).expect("could not parse arguments");
        assert_eq!(args.options.color_diagnostics, ColorOption::Never);

        parse(&["--color-diagnostics=sometimes"]).expect_err("expected an unknown value error");
    }

    #[test]
    fn verbosity_accumulates() {
        let args = parse(&["-v", "-v"]).expect("could not parse arguments");
        assert_eq!(args.options.verbose, 2);
    }
}
