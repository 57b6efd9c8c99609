//! Stub and relay-trampoline C source output.

use std::io::{self, Write};

use crate::export::{Arch, ArgType, CallConv, CompileConfig, Export, ExportFlags};

/// Writes the C stub file for the included exports.
///
/// Stub entries get a warning body that returns zero; with tracing enabled,
/// plain stdcall exports additionally get a `$relaytrace$` trampoline that
/// logs arguments and the return value around a call to the real function.
pub(crate) fn write_stubs<W: Write>(
    writer: &mut W,
    exports: &[Export<'_>],
    config: &CompileConfig,
) -> io::Result<()> {
    write!(
        writer,
        "/* This file is generated automatically by {}, do not edit! */\n\
         \n\
         #include <stubs.h>\n",
        config.tool_name
    )?;

    if config.tracing {
        write!(
            writer,
            "#include <wine/debug.h>\n\
             #include <inttypes.h>\n\
             WINE_DECLARE_DEBUG_CHANNEL(relay);\n"
        )?;
    }

    writeln!(writer)?;

    for export in exports.iter().filter(|export| export.included) {
        write_stub(writer, export, config)?;
    }

    Ok(())
}

/// Writes the return type and C name of a stub or trampoline, followed by
/// its typed parameter list.
fn write_signature<W: Write>(
    writer: &mut W,
    export: &Export<'_>,
    config: &CompileConfig,
    relay_wrapper: bool,
) -> io::Result<()> {
    if export.flags.contains(ExportFlags::REGISTER) {
        write!(writer, "void ")?;
    } else if export.flags.contains(ExportFlags::RET64) {
        write!(writer, "__int64 ")?;
    } else {
        write!(writer, "int ")?;
    }

    if config.arch == Arch::X86 && export.call_conv == CallConv::Stdcall {
        write!(writer, "__stdcall ")?;
    }

    // C++ mangled names cannot appear in C source
    if export.name.starts_with('?') {
        write!(writer, "stub_function{}(", export.line_number)?;
    } else if relay_wrapper {
        write!(writer, "$relaytrace${}(", export.name)?;
    } else {
        write!(writer, "{}(", export.name)?;
    }

    for (i, arg) in export.args.iter().enumerate() {
        if i != 0 {
            write!(writer, ", ")?;
        }
        write!(writer, "{} a{i}", arg.c_type())?;
    }

    Ok(())
}

/// Writes the `DbgPrint`/`DPRINTF` argument list: format specifiers inside
/// the string, then the casted arguments.
fn write_format_args<W: Write>(writer: &mut W, export: &Export<'_>) -> io::Result<()> {
    for (i, arg) in export.args.iter().enumerate() {
        if i != 0 {
            write!(writer, ",")?;
        }
        write!(writer, "{}", arg.format_spec())?;
    }
    write!(writer, ")\\n\"")?;

    for (i, arg) in export.args.iter().enumerate() {
        write!(writer, ", ")?;
        if *arg == ArgType::Int128 {
            // GUIDs are formatted through the debug helper
            write!(writer, "wine_dbgstr_guid(&a{i})")?;
        } else {
            write!(writer, "({})a{i}", arg.c_type())?;
        }
    }
    write!(writer, ");\n")
}

fn write_stub<W: Write>(
    writer: &mut W,
    export: &Export<'_>,
    config: &CompileConfig,
) -> io::Result<()> {
    let is_stub =
        export.call_conv == CallConv::Stub || export.flags.contains(ExportFlags::STUB);

    let relay = if is_stub {
        false
    } else if config.tracing
        && export.call_conv == CallConv::Stdcall
        && !export.flags.contains(ExportFlags::NORELAY)
        && !export.name.starts_with('?')
    {
        true
    } else {
        return Ok(());
    };

    if relay {
        // Declare the real function ahead of the trampoline
        write!(writer, "extern ")?;
        write_signature(writer, export, config, false)?;
        write!(writer, ");\n\n")?;
    }

    write_signature(writer, export, config, relay)?;
    write!(writer, ")\n{{\n")?;

    if relay {
        if export.flags.contains(ExportFlags::RET64) {
            write!(writer, "\t__int64 retval;\n")?;
        } else if !export.flags.contains(ExportFlags::REGISTER) {
            write!(writer, "\tint retval;\n")?;
        }

        write!(
            writer,
            "\tif(TRACE_ON(relay))\n\t\tDPRINTF(\"{}: {}(",
            config.dll_name, export.name
        )?;
    } else {
        write!(writer, "\tDbgPrint(\"WARNING: calling stub {}(", export.name)?;
    }

    write_format_args(writer, export)?;

    if export.call_conv == CallConv::Stub {
        write!(
            writer,
            "\t__wine_spec_unimplemented_stub(\"{}\", __FUNCTION__);\n",
            config.dll_name
        )?;
    } else if relay {
        if export.flags.contains(ExportFlags::REGISTER) {
            write!(writer, "\t")?;
        } else {
            write!(writer, "\tretval = ")?;
        }

        write!(writer, "{}(", export.name)?;
        for i in 0..export.args.len() {
            if i != 0 {
                write!(writer, ", ")?;
            }
            write!(writer, "a{i}")?;
        }
        write!(writer, ");\n")?;
    }

    if !relay {
        write!(writer, "\treturn 0;\n}}\n\n")?;
    } else if export.flags.contains(ExportFlags::REGISTER) {
        write!(writer, "}}\n\n")?;
    } else {
        if export.flags.contains(ExportFlags::RET64) {
            write!(
                writer,
                "\tif(TRACE_ON(relay))\n\t\tDPRINTF(\"{}: {}: retval = %\"PRIx64\"\\n\", retval);\n",
                config.dll_name, export.name
            )?;
        } else {
            write!(
                writer,
                "\tif(TRACE_ON(relay))\n\t\tDPRINTF(\"{}: {}: retval = 0x%lx\\n\", retval);\n",
                config.dll_name, export.name
            )?;
        }
        write!(writer, "\treturn retval;\n}}\n\n")?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::write_stubs;
    use crate::{
        export::{Arch, CompileConfig},
        ordinal::assign_ordinals,
        parser::parse_spec,
    };

    fn compile(source: &str, config: &CompileConfig) -> String {
        let mut exports = parse_spec(source, config).expect("could not parse spec");
        assign_ordinals(&mut exports).expect("could not assign ordinals");

        let mut output = Vec::new();
        write_stubs(&mut output, &exports, config).expect("could not write stub file");
        String::from_utf8(output).expect("output should be utf-8")
    }

    #[test]
    fn header_without_tracing() {
        let config = CompileConfig::new(Arch::X86, "widget.dll");
        let output = compile("", &config);

        assert_eq!(
            output,
            "/* This file is generated automatically by specc, do not edit! */\n\
             \n\
             #include <stubs.h>\n\
             \n"
        );
    }

    #[test]
    fn header_with_tracing() {
        let mut config = CompileConfig::new(Arch::X86, "widget.dll");
        config.tracing = true;
        let output = compile("", &config);

        assert!(output.contains("#include <wine/debug.h>\n"));
        assert!(output.contains("#include <inttypes.h>\n"));
        assert!(output.contains("WINE_DECLARE_DEBUG_CHANNEL(relay);\n"));
    }

    #[test]
    fn plain_exports_produce_no_stub() {
        let config = CompileConfig::new(Arch::X86, "widget.dll");
        let output = compile("@ stdcall Frob(long)\n", &config);
        assert!(!output.contains("Frob"));
    }

    #[test]
    fn stub_body() {
        let config = CompileConfig::new(Arch::X86, "widget.dll");
        let output = compile("@ stub FrobEx@12\n", &config);

        assert!(output.contains(
            "int __stdcall FrobEx(long a0, long a1, long a2)\n\
             {\n\
             \tDbgPrint(\"WARNING: calling stub FrobEx(0x%lx,0x%lx,0x%lx)\\n\"\
             , (long)a0, (long)a1, (long)a2);\n\
             \treturn 0;\n\
             }\n\n"
        ));
    }

    #[test]
    fn plain_stub_calls_unimplemented_hook() {
        let config = CompileConfig::new(Arch::X86, "widget.dll");
        let output = compile("@ stub Missing\n", &config);

        assert!(output.contains("int Missing()\n"));
        assert!(output
            .contains("\t__wine_spec_unimplemented_stub(\"widget.dll\", __FUNCTION__);\n"));
        assert!(output.contains("\treturn 0;\n"));
    }

    #[test]
    fn mangled_stub_gets_c_name() {
        let config = CompileConfig::new(Arch::X86, "widget.dll");
        let output = compile("@ stub ?Frob@@YAXXZ\n", &config);

        assert!(output.contains("int stub_function1()\n"));
        assert!(output.contains("calling stub ?Frob@@YAXXZ("));
    }

    #[test]
    fn stub_option_marks_regular_export() {
        let config = CompileConfig::new(Arch::X86, "widget.dll");
        let output = compile("@ stdcall -stub Frob(ptr str)\n", &config);

        assert!(output.contains("int __stdcall Frob(void* a0, char* a1)\n"));
        assert!(output.contains("calling stub Frob(0x%p,'%s')"));
        // Only true stub lines call the unimplemented hook
        assert!(!output.contains("__wine_spec_unimplemented_stub"));
    }

    #[test]
    fn relay_trampoline() {
        let mut config = CompileConfig::new(Arch::X86, "widget.dll");
        config.tracing = true;
        let output = compile("@ stdcall Frob(long ptr)\n", &config);

        assert!(output.contains("extern int __stdcall Frob(long a0, void* a1);\n\n"));
        assert!(output.contains("int __stdcall $relaytrace$Frob(long a0, void* a1)\n"));
        assert!(output.contains("\tint retval;\n"));
        assert!(output.contains(
            "\tif(TRACE_ON(relay))\n\t\tDPRINTF(\"widget.dll: Frob(0x%lx,0x%p)\\n\"\
             , (long)a0, (void*)a1);\n"
        ));
        assert!(output.contains("\tretval = Frob(a0, a1);\n"));
        assert!(output.contains(
            "\tif(TRACE_ON(relay))\n\t\tDPRINTF(\"widget.dll: Frob: retval = 0x%lx\\n\", retval);\n"
        ));
        assert!(output.contains("\treturn retval;\n"));
    }

    #[test]
    fn relay_skips_norelay_and_cdecl() {
        let mut config = CompileConfig::new(Arch::X86, "widget.dll");
        config.tracing = true;
        let output = compile(
            "@ stdcall -norelay Quiet(long)\n@ cdecl Classic(long)\n",
            &config,
        );

        assert!(!output.contains("Quiet"));
        assert!(!output.contains("Classic"));
    }

    #[test]
    fn ret64_relay() {
        let mut config = CompileConfig::new(Arch::X86, "widget.dll");
        config.tracing = true;
        let output = compile("@ stdcall -ret64 Wide(int64)\n", &config);

        assert!(output.contains("extern __int64 __stdcall Wide(__int64 a0);\n"));
        assert!(output.contains("\t__int64 retval;\n"));
        assert!(output.contains("Wide(%\"PRIx64\")"));
        assert!(output.contains("retval = %\"PRIx64\""));
    }

    #[test]
    fn register_relay_has_no_return_value() {
        let mut config = CompileConfig::new(Arch::X86, "widget.dll");
        config.tracing = true;
        let output = compile("@ stdcall -register Service(long)\n", &config);

        assert!(output.contains("extern void __stdcall Service(long a0);\n"));
        assert!(!output.contains("retval"));
        assert!(output.contains("\tService(a0);\n"));
    }

    #[test]
    fn guid_argument_formatting() {
        let config = CompileConfig::new(Arch::X86, "widget.dll");
        let output = compile("@ stdcall -stub CoFrob(int128)\n", &config);

        assert!(output.contains("CoFrob(GUID a0)\n"));
        assert!(output.contains("CoFrob('%s')"));
        assert!(output.contains("wine_dbgstr_guid(&a0)"));
    }

    #[test]
    fn excluded_exports_are_omitted() {
        let mut config = CompileConfig::new(Arch::X86, "widget.dll");
        config.os_version = 0x502;
        let output = compile("@ stub -version=0x600+ Future\n", &config);
        assert!(!output.contains("Future"));
    }

    #[test]
    fn non_x86_omits_stdcall_keyword() {
        let config = CompileConfig::new(Arch::Amd64, "widget.dll");
        let output = compile("@ stub Frob@8\n", &config);
        assert!(output.contains("int Frob(long a0, long a1)\n"));
    }
}
