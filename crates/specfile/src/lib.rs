//! Compiler for DLL export specification (.spec) files.
//!
//! These files list the exports of a DLL, one per line, together with
//! ordinal, calling convention, per-line filtering options, argument types,
//! and an optional forwarding target.
//!
//! An example spec file looks like this.
//! ```text
//! # Core entry points
//! @ stdcall CreateWidget(long ptr str)
//! @ cdecl -private DllInstall(long wstr)
//! 5 stdcall -noname FrobInternal(ptr)
//! @ stdcall -arch=i386 LegacyFrob(long)
//! @ stdcall Sleep(long) kernel32.SleepEx
//! @ stub NotYetImplemented@8
//! @ extern WidgetVersion
//! ```
//!
//! The compiler turns such a file into a Windows module-definition (.def)
//! file for the linker and, optionally, a C source file containing stub
//! bodies and relay-tracing trampolines.
//!
//! ```no_run
//! use specfile::{Arch, CompileConfig, SpecFile};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let source = std::fs::read_to_string("widget.spec")?;
//! let config = CompileConfig::new(Arch::X86, "widget.dll");
//!
//! let mut spec = SpecFile::parse(&source, &config)?;
//! spec.resolve_ordinals()?;
//!
//! let mut def = Vec::new();
//! spec.write_def(&mut def, &config)?;
//! # Ok(())
//! # }
//! ```

mod defgen;
mod error;
mod export;
mod ordinal;
mod parser;
mod scan;
mod stubgen;

pub use error::{Error, ErrorKind, ParseError};
pub use export::{Arch, ArgType, CallConv, CompileConfig, Export, ExportFlags, MAX_ARGS};

use std::io;

/// Exports that MS LINK.EXE expects to be PRIVATE and ordinal-free.
///
/// Violations produce linker warnings LNK4104 and LNK4222.
const OLE_PRIVATE_EXPORTS: &[&str] = &[
    "DllCanUnloadNow",
    "DllGetClassObject",
    "DllGetClassFactoryFromClassString",
    "DllGetDocumentation",
    "DllInitialize",
    "DllInstall",
    "DllRegisterServer",
    "DllRegisterServerEx",
    "DllRegisterServerExW",
    "DllUnload",
    "DllUnregisterServer",
    "RasCustomDeleteEntryNotify",
    "RasCustomDial",
    "RasCustomDialDlg",
    "RasCustomEntryDlg",
];

/// A parsed export specification file.
#[derive(Debug, Clone)]
pub struct SpecFile<'a> {
    exports: Vec<Export<'a>>,
}

impl<'a> SpecFile<'a> {
    /// Parses a spec file.
    ///
    /// The configured architecture and OS version drive the per-line
    /// `-arch=` and `-version=` filters.
    pub fn parse(source: &'a str, config: &CompileConfig) -> Result<SpecFile<'a>, Error> {
        let exports = parser::parse_spec(source, config)?;
        Ok(SpecFile { exports })
    }

    /// Assigns an ordinal to every export that does not have one.
    ///
    /// Must run before the output backends; explicitly requested ordinals
    /// are reserved first and clashes are an error.
    pub fn resolve_ordinals(&mut self) -> Result<(), Error> {
        ordinal::assign_ordinals(&mut self.exports)
    }

    /// Returns the parsed export records.
    #[inline]
    pub fn exports(&self) -> &[Export<'a>] {
        &self.exports
    }

    /// Writes the module-definition file for the included exports.
    pub fn write_def<W: io::Write>(
        &self,
        writer: &mut W,
        config: &CompileConfig,
    ) -> io::Result<()> {
        defgen::write_def(writer, &self.exports, config)
    }

    /// Writes the C stub source for the included exports.
    pub fn write_stubs<W: io::Write>(
        &self,
        writer: &mut W,
        config: &CompileConfig,
    ) -> io::Result<()> {
        stubgen::write_stubs(writer, &self.exports, config)
    }

    /// Warns about well-known OLE exports that are not marked `-private`.
    pub fn check_private_exports(&self) {
        for export in self.exports.iter().filter(|export| export.included) {
            if export.flags.contains(ExportFlags::PRIVATE) {
                continue;
            }

            if OLE_PRIVATE_EXPORTS.contains(&export.name) {
                log::warn!(
                    "line {}: export '{}' should be marked -private",
                    export.line_number,
                    export.name
                );
            }
        }
    }
}
