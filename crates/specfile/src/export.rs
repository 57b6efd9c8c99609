use bitflags::bitflags;

/// Maximum number of arguments a single export may declare.
pub const MAX_ARGS: usize = 30;

/// Target architecture of a compilation.
///
/// Fixed for the whole run; determines pointer sizing, symbol decoration
/// rules and which `-arch=` tags admit a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    X86,
    Amd64,
    Arm,
    Arm64,
}

impl Arch {
    /// Parses a command line architecture spelling.
    pub fn parse(s: &str) -> Option<Arch> {
        if s.eq_ignore_ascii_case("i386") || s.eq_ignore_ascii_case("i686") {
            Some(Arch::X86)
        } else if s.eq_ignore_ascii_case("x86_64") || s.eq_ignore_ascii_case("amd64") {
            Some(Arch::Amd64)
        } else if s.eq_ignore_ascii_case("arm") || s.eq_ignore_ascii_case("armv7") {
            Some(Arch::Arm)
        } else if s.eq_ignore_ascii_case("aarch64") || s.eq_ignore_ascii_case("arm64") {
            Some(Arch::Arm64)
        } else {
            None
        }
    }

    /// Tags accepted by `-arch=` lists for this architecture.
    ///
    /// Both command line spellings plus the win32/win64 ABI alias.
    pub fn accepted_tags(self) -> &'static [&'static str] {
        match self {
            Arch::X86 => &["i386", "i686", "win32"],
            Arch::Amd64 => &["amd64", "x86_64", "win64"],
            Arch::Arm => &["arm", "armv7", "win32"],
            Arch::Arm64 => &["arm64", "aarch64", "win64"],
        }
    }

    /// Pointer width in bytes, used for stack byte accounting.
    pub fn pointer_size(self) -> u32 {
        match self {
            Arch::X86 | Arch::Arm => 4,
            Arch::Amd64 | Arch::Arm64 => 8,
        }
    }
}

/// Calling convention keyword of a spec line.
///
/// `varargs` parses as an alias for [`CallConv::Cdecl`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallConv {
    Stdcall,
    Cdecl,
    Fastcall,
    Thiscall,
    Extern,
    Stub,
}

/// Argument type tag from a parenthesized type list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgType {
    Long,
    Ptr,
    Str,
    Wstr,
    Double,
    Int64,
    Int128,
    Float,
}

impl ArgType {
    /// Bytes the argument occupies on the stack for the given architecture.
    pub fn stack_size(self, arch: Arch) -> u32 {
        match self {
            ArgType::Long | ArgType::Float => 4,
            ArgType::Double | ArgType::Int64 => 8,
            ArgType::Int128 => 16,
            ArgType::Ptr | ArgType::Str | ArgType::Wstr => arch.pointer_size(),
        }
    }

    /// C type name used in generated stub signatures.
    ///
    /// `int128` renders as `GUID`: `__int128` is unavailable on x86, and an
    /// int128 in spec files almost always carries a GUID.
    pub(crate) fn c_type(self) -> &'static str {
        match self {
            ArgType::Long => "long",
            ArgType::Ptr => "void*",
            ArgType::Str => "char*",
            ArgType::Wstr => "wchar_t*",
            ArgType::Double => "double",
            ArgType::Int64 => "__int64",
            ArgType::Int128 => "GUID",
            ArgType::Float => "float",
        }
    }

    /// printf conversion fragment used when tracing argument values.
    pub(crate) fn format_spec(self) -> &'static str {
        match self {
            ArgType::Long => "0x%lx",
            ArgType::Ptr => "0x%p",
            ArgType::Str => "'%s'",
            ArgType::Wstr => "'%ws'",
            ArgType::Double => "%f",
            ArgType::Int64 => "%\"PRIx64\"",
            ArgType::Int128 => "'%s'",
            ArgType::Float => "%f",
        }
    }
}

bitflags! {
    /// Per-export option flags.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ExportFlags: u32 {
        /// `-private`: export is not placed in the import library.
        const PRIVATE = 1;
        /// `-stub` or a reinterpreted `stub` line.
        const STUB = 2;
        /// `-noname` or an autoname export.
        const NONAME = 4;
        /// The line carries an explicit ordinal that must be honored.
        const ORDINAL = 8;
        /// `-norelay` or a forwarded export: never wrapped by relay tracing.
        const NORELAY = 16;
        /// `-ret64`: the function returns a 64-bit value.
        const RET64 = 32;
        /// `-register`: register calling usage, no return value.
        const REGISTER = 64;
    }
}

/// One resolved entry describing a single exported, forwarded or stubbed
/// symbol.
///
/// Name and target borrow from the source buffer; records never outlive the
/// text they were parsed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export<'a> {
    /// Symbol name as written, possibly the `@` autoname marker.
    pub name: &'a str,

    /// Forwarding destination (`dll.function` or another internal symbol).
    pub target: Option<&'a str>,

    /// Calling convention keyword.
    pub call_conv: CallConv,

    /// Export ordinal. `None` until assigned by the ordinal resolver.
    pub ordinal: Option<u16>,

    /// Total argument size in bytes. Zero for `extern` and `stub` lines.
    pub stack_bytes: u32,

    /// Ordered argument type tags, at most [`MAX_ARGS`] entries.
    pub args: Vec<ArgType>,

    /// Option flags.
    pub flags: ExportFlags,

    /// 1-based source line number, counting every line of the file.
    ///
    /// Used to name synthetic stubs for C++ mangled exports.
    pub line_number: u32,

    /// Last `-version=` sub-range parsed for the line, default the full
    /// 32-bit range.
    pub version_range: (u32, u32),

    /// `false` if a `-version=` filter excluded the record.
    ///
    /// Excluded records still participate in ordinal bookkeeping but are
    /// never rendered by either backend.
    pub included: bool,
}

/// Immutable per-compilation configuration threaded through the parser and
/// both backends.
#[derive(Debug, Clone)]
pub struct CompileConfig {
    /// Target architecture.
    pub arch: Arch,

    /// Default OS version used by `-version=` filtering.
    pub os_version: u32,

    /// Generate a module definition for an import library: every export is
    /// redirected through a `_stub_` alias and explicit ordinals are
    /// reassigned.
    pub import_lib: bool,

    /// Emit relay trace trampolines instead of plain redirects where
    /// possible.
    pub tracing: bool,

    /// Name of the dll, used in generated headers and trace messages.
    pub dll_name: String,

    /// Name of the generating tool, quoted in output file headers.
    pub tool_name: String,
}

impl CompileConfig {
    /// Creates a configuration with the default OS version (0x502) and all
    /// mode flags cleared.
    pub fn new(arch: Arch, dll_name: impl Into<String>) -> CompileConfig {
        CompileConfig {
            arch,
            os_version: 0x502,
            import_lib: false,
            tracing: false,
            dll_name: dll_name.into(),
            tool_name: "specc".into(),
        }
    }
}
