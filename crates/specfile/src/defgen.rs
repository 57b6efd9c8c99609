//! Module-definition (.def) output.

use std::io::{self, Write};

use crate::{
    export::{Arch, CallConv, CompileConfig, Export, ExportFlags},
    scan,
};

/// Writes the complete module-definition file for the included exports.
pub(crate) fn write_def<W: Write>(
    writer: &mut W,
    exports: &[Export<'_>],
    config: &CompileConfig,
) -> io::Result<()> {
    write!(
        writer,
        "; This file is generated automatically by {}, do not edit!\n\
         \n\
         NAME {}\n\
         \n\
         EXPORTS\n",
        config.tool_name, config.dll_name
    )?;

    for export in exports.iter().filter(|export| export.included) {
        write_export(writer, export, config)?;
    }

    Ok(())
}

/// Writes one export name, optionally with x86 calling-convention
/// decoration.
fn write_name<W: Write>(
    writer: &mut W,
    export: &Export<'_>,
    name: &str,
    decorate: bool,
    arch: Arch,
) -> io::Result<()> {
    let ordinal_name;
    let mut name = name;
    if name == "@" {
        ordinal_name = format!("ordinal{}", export.ordinal.unwrap_or(0));
        name = &ordinal_name;
    }

    if arch != Arch::X86 {
        // Strip stdcall decoration that only makes sense on x86
        if let Some(at) = scan::scan_token(name, b'@') {
            if name.starts_with('_') {
                name = &name[1..at];
            }
        }

        write!(writer, "{name}")
    } else if decorate
        && matches!(export.call_conv, CallConv::Stdcall | CallConv::Fastcall)
    {
        // A dotted name forwards into another dll
        if let Some(dot) = scan::scan_token(name, b'.') {
            write!(writer, "{}.", &name[..dot])?;
            name = &name[dot + 1..];
        }

        if scan::scan_token(name, b'@').is_some() {
            // Already decorated
            write!(writer, "{name}")
        } else {
            if export.call_conv == CallConv::Fastcall {
                write!(writer, "@")?;
            }

            write!(writer, "{name}@{}", export.stack_bytes)
        }
    } else {
        write!(writer, "{name}")
    }
}

fn write_export<W: Write>(
    writer: &mut W,
    export: &Export<'_>,
    config: &CompileConfig,
) -> io::Result<()> {
    write!(writer, " ")?;
    write_name(writer, export, export.name, false, config.arch)?;

    let is_msvc_mangled = export.name.starts_with('?');

    if config.import_lib {
        // Redirect into a stub so the import library gets the right
        // decoration
        write!(writer, "=_stub_")?;
        write_name(writer, export, export.name, false, config.arch)?;
    } else if let Some(target) = export.target {
        // C++ redirections cannot be expressed in a .def file
        if !is_msvc_mangled {
            write!(writer, "=")?;

            // A decorated source name wants a decorated forwarder
            if config.arch == Arch::X86
                && scan::scan_token(export.name, b'@').is_some()
                && scan::scan_token(target, b'@').is_none()
                && matches!(export.call_conv, CallConv::Stdcall | CallConv::Fastcall)
            {
                write_name(writer, export, target, true, config.arch)?;
            } else {
                write!(writer, "{target}")?;
            }
        }
    } else if (export.flags.contains(ExportFlags::STUB) || export.call_conv == CallConv::Stub)
        && is_msvc_mangled
    {
        // C++ stubs are forwarded to C stubs
        write!(writer, "=stub_function{}", export.line_number)?;
    } else if config.tracing
        && !export.flags.contains(ExportFlags::NORELAY)
        && export.call_conv == CallConv::Stdcall
        && !is_msvc_mangled
    {
        write!(writer, "=$relaytrace${}", export.name)?;
    }

    if export.flags.contains(ExportFlags::NONAME) {
        write!(writer, " NONAME")?;
    }

    if export.flags.contains(ExportFlags::PRIVATE) {
        write!(writer, " PRIVATE")?;
    } else if export.call_conv == CallConv::Extern {
        write!(writer, " DATA")?;
    }

    writeln!(writer)
}
