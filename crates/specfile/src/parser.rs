//! Line-oriented spec parser.
//!
//! Each non-blank, non-comment line yields at most one [`Export`] record.
//! Lines filtered out by `-arch=` produce no record at all; lines filtered
//! out by `-version=` produce a record with `included == false` so that any
//! explicit ordinal still occupies its slot.

use crate::{
    error::{ErrorKind, ParseError},
    export::{Arch, ArgType, CallConv, CompileConfig, Export, ExportFlags, MAX_ARGS},
    scan,
};

/// Parses the whole source buffer into export records.
pub(crate) fn parse_spec<'a>(
    source: &'a str,
    config: &CompileConfig,
) -> Result<Vec<Export<'a>>, ParseError> {
    let mut exports = Vec::new();

    let mut rest = source;
    let mut line_number = 0u32;
    while !rest.is_empty() {
        line_number += 1;

        let line_end = rest.find('\n').unwrap_or(rest.len());
        let line = &rest[..line_end];

        let parser = LineParser {
            line,
            line_number,
            config,
            pos: 0,
        };

        if let Some(export) = parser.parse()? {
            exports.push(export);
        }

        rest = &rest[scan::next_line(rest)..];
    }

    Ok(exports)
}

/// State machine over a single line.
struct LineParser<'a, 'c> {
    /// The line text, excluding the `\n` terminator (a `\r` may remain).
    line: &'a str,
    line_number: u32,
    config: &'c CompileConfig,
    pos: usize,
}

impl<'a> LineParser<'a, '_> {
    /// Remaining text from the current position.
    fn rest(&self) -> &'a str {
        &self.line[self.pos..]
    }

    /// Byte at the current position, `None` at end of line.
    fn byte(&self) -> Option<u8> {
        self.line.as_bytes().get(self.pos).copied()
    }

    fn byte_at(&self, pos: usize) -> Option<u8> {
        self.line.as_bytes().get(pos).copied()
    }

    /// Advances to the next token. Returns `false` when the line ends.
    fn next_token(&mut self) -> bool {
        match scan::next_token(self.rest()) {
            Some(offset) => {
                self.pos += offset;
                true
            }
            None => false,
        }
    }

    /// Advances to the next token, failing with "unexpected end of line".
    fn require_next_token(&mut self) -> Result<(), ParseError> {
        if self.next_token() {
            Ok(())
        } else {
            Err(self.error_at_eol(ErrorKind::UnexpectedEol))
        }
    }

    fn skip_blanks(&mut self) {
        while matches!(self.byte(), Some(b' ') | Some(b'\t')) {
            self.pos += 1;
        }
    }

    /// Builds an error pointing at `column`. A zero `span` underlines the
    /// token found there.
    fn error(&self, kind: ErrorKind, column: usize, span: usize) -> ParseError {
        let fragment = self.line.trim_end_matches('\r');
        let span = if span == 0 {
            scan::token_length(&self.line[column.min(self.line.len())..])
        } else {
            span
        };

        ParseError::new(self.line_number, column, fragment, span, kind)
    }

    /// Builds an error pointing at the last character of the line.
    fn error_at_eol(&self, kind: ErrorKind) -> ParseError {
        let fragment = self.line.trim_end_matches('\r');
        ParseError::new(
            self.line_number,
            fragment.len().saturating_sub(1),
            fragment,
            1,
            kind,
        )
    }

    /// Runs the per-line state machine.
    ///
    /// Returns `Ok(None)` for blank lines, comments, and lines excluded by
    /// the architecture filter.
    fn parse(mut self) -> Result<Option<Export<'a>>, ParseError> {
        self.skip_blanks();

        match self.byte() {
            None | Some(b'\r') | Some(b';') | Some(b'#') => return Ok(None),
            Some(_) => (),
        }

        let mut flags = ExportFlags::default();

        // Ordinal marker: '@' requests automatic assignment
        let ordinal = match self.byte() {
            Some(b'@') => None,
            Some(b'0'..=b'9') => Some(self.parse_ordinal(&mut flags)?),
            _ => return Err(self.error(ErrorKind::ExpectedOrdinal, self.pos, 0)),
        };

        self.require_next_token()?;

        let call_conv = self.parse_call_conv()?;

        self.require_next_token()?;

        let mut options = LineOptions::default();
        while self.byte() == Some(b'-') {
            self.parse_option(&mut flags, &mut options)?;
            self.require_next_token()?;
        }

        // A failed arch filter drops the line without touching the rest of it
        if !options.arch_included {
            return Ok(None);
        }

        let name_pos = self.pos;
        let mut name = scan::token(self.rest());
        if name == "@" {
            flags |= ExportFlags::ORDINAL | ExportFlags::NONAME;
        }

        let mut args = Vec::new();
        let mut stack_bytes = 0u32;
        if call_conv != CallConv::Extern && call_conv != CallConv::Stub {
            self.parse_arguments(&mut args, &mut stack_bytes)?;
        }

        let mut call_conv = call_conv;
        if call_conv == CallConv::Stub && !name.starts_with('?') {
            // A stdcall-decorated stub name carries its own stack size
            if let Some(at) = scan::scan_token(name, b'@') {
                if at == 0 {
                    return Err(self.error(ErrorKind::UnexpectedAt, name_pos, 1));
                }

                stack_bytes = scan_decimal(&name[at + 1..]).0;
                name = &name[..at];

                let arg_count = (stack_bytes / 4) as usize;
                if arg_count > MAX_ARGS {
                    return Err(self.error(ErrorKind::TooManyArgs, name_pos, 0));
                }

                args = vec![ArgType::Long; arg_count];
                call_conv = CallConv::Stdcall;
                flags |= ExportFlags::STUB;
            }
        }

        // Optional trailing forwarding target
        let mut target = None;
        if self.next_token() {
            target = Some(scan::token(self.rest()));

            if self.next_token() {
                return Err(self.error(ErrorKind::ExcessTokens, self.pos, 0));
            }

            // Forwarded exports are never relay traced
            flags |= ExportFlags::NORELAY;
        }

        if flags.contains(ExportFlags::ORDINAL) && ordinal.is_none() {
            return Err(self.error_at_eol(ErrorKind::MissingOrdinal));
        }

        Ok(Some(Export {
            name,
            target,
            call_conv,
            ordinal,
            stack_bytes,
            args,
            flags,
            line_number: self.line_number,
            version_range: options.version_range,
            included: options.version_included,
        }))
    }

    /// Parses an explicit decimal ordinal followed by whitespace.
    fn parse_ordinal(&mut self, flags: &mut ExportFlags) -> Result<u16, ParseError> {
        let start = self.pos;
        let digits: &str = {
            let len = self
                .rest()
                .bytes()
                .take_while(u8::is_ascii_digit)
                .count();
            &self.rest()[..len]
        };
        let end = start + digits.len();

        if !matches!(self.byte_at(end), Some(b' ') | Some(b'\t')) {
            return Err(self.error(ErrorKind::OrdinalTrailer, end, 0));
        }

        let number = match digits.parse::<u64>() {
            Ok(number) if number <= 0xFFFE => number as u16,
            _ => return Err(self.error(ErrorKind::OrdinalRange, start, 0)),
        };

        // Import libraries only honor ordinals requested with -ordinal
        if !self.config.import_lib {
            *flags |= ExportFlags::ORDINAL;
        }

        Ok(number)
    }

    fn parse_call_conv(&self) -> Result<CallConv, ParseError> {
        let rest = self.rest();

        if scan::matches_keyword(rest, "stdcall") {
            Ok(CallConv::Stdcall)
        } else if scan::matches_keyword(rest, "cdecl") || scan::matches_keyword(rest, "varargs") {
            Ok(CallConv::Cdecl)
        } else if scan::matches_keyword(rest, "fastcall") {
            Ok(CallConv::Fastcall)
        } else if scan::matches_keyword(rest, "thiscall") {
            Ok(CallConv::Thiscall)
        } else if scan::matches_keyword(rest, "extern") {
            Ok(CallConv::Extern)
        } else if scan::matches_keyword(rest, "stub") {
            Ok(CallConv::Stub)
        } else {
            Err(self.error(ErrorKind::InvalidCallConv, self.pos, 0))
        }
    }

    /// Parses one `-option` token at the current position.
    fn parse_option(
        &mut self,
        flags: &mut ExportFlags,
        options: &mut LineOptions,
    ) -> Result<(), ParseError> {
        let rest = self.rest();

        if scan::matches_keyword(rest, "-arch=") {
            self.parse_arch_list(options);
        } else if scan::matches_keyword(rest, "-i386") {
            if self.config.arch != Arch::X86 {
                options.arch_included = false;
            }
        } else if scan::matches_keyword(rest, "-version=") {
            self.parse_version_list(options)?;
        } else if scan::matches_keyword(rest, "-private") {
            *flags |= ExportFlags::PRIVATE;
        } else if scan::matches_keyword(rest, "-noname") {
            *flags |= ExportFlags::ORDINAL | ExportFlags::NONAME;
        } else if scan::matches_keyword(rest, "-ordinal") {
            *flags |= ExportFlags::ORDINAL;
        } else if scan::matches_keyword(rest, "-stub") {
            *flags |= ExportFlags::STUB;
        } else if scan::matches_keyword(rest, "-norelay") {
            *flags |= ExportFlags::NORELAY;
        } else if scan::matches_keyword(rest, "-ret64") {
            *flags |= ExportFlags::RET64;
        } else if scan::matches_keyword(rest, "-register") {
            *flags |= ExportFlags::REGISTER;
        } else {
            log::info!(
                "line {}: ignored option '{}'",
                self.line_number,
                scan::token(rest)
            );
        }

        Ok(())
    }

    /// Handles `-arch=<tag>[,<tag>...]`, updating the architecture filter.
    fn parse_arch_list(&mut self, options: &mut LineOptions) {
        options.arch_included = false;

        // First tag starts right after the '='
        let mut pos = self.pos + "-arch=".len();
        loop {
            let tag = &self.line[pos.min(self.line.len())..];
            if self
                .config
                .arch
                .accepted_tags()
                .iter()
                .any(|accepted| scan::matches_keyword(tag, accepted))
            {
                options.arch_included = true;
            }

            while self.byte_at(pos).is_some_and(|b| b > b',') {
                pos += 1;
            }

            if self.byte_at(pos) == Some(b',') {
                pos += 1;
            } else {
                break;
            }
        }

        self.pos = pos;
    }

    /// Handles `-version=<range>[,<range>...]`.
    ///
    /// A range is `V`, `V+` (capped at 0xFFF) or `V-W`, hex with an optional
    /// `0x` prefix. The record keeps the last range parsed; it is included
    /// if any range contains the default OS version.
    fn parse_version_list(&mut self, options: &mut LineOptions) -> Result<(), ParseError> {
        options.version_included = false;

        let start = self.pos + "-version=".len();
        let mut pos = start;
        loop {
            if self.line[pos.min(self.line.len())..].starts_with("0x") {
                pos += 2;
            }

            let (version, len) = scan_hex(&self.line[pos.min(self.line.len())..]);
            pos += len;

            let mut end_version = version;
            match self.byte_at(pos) {
                Some(b'+') => {
                    end_version = 0xFFF;
                    pos += 1;
                }
                Some(b'-') => {
                    pos += 1;
                    if self.line[pos.min(self.line.len())..].starts_with("0x") {
                        pos += 2;
                    }
                    let (value, len) = scan_hex(&self.line[pos.min(self.line.len())..]);
                    end_version = value;
                    pos += len;
                }
                _ => (),
            }

            if version > end_version {
                return Err(self.error(ErrorKind::InvalidVersionRange, start, pos - start));
            }

            options.version_range = (version, end_version);

            if self.config.os_version >= version && self.config.os_version <= end_version {
                options.version_included = true;
            }

            while self.byte_at(pos).is_some_and(|b| b > b',') {
                pos += 1;
            }

            if self.byte_at(pos) == Some(b',') {
                pos += 1;
            } else {
                break;
            }
        }

        self.pos = pos;

        Ok(())
    }

    /// Parses the parenthesized argument type list.
    fn parse_arguments(
        &mut self,
        args: &mut Vec<ArgType>,
        stack_bytes: &mut u32,
    ) -> Result<(), ParseError> {
        self.require_next_token()?;

        if self.byte() != Some(b'(') {
            return Err(self.error(ErrorKind::ExpectedOpenParen, self.pos, 0));
        }
        self.pos += 1;
        self.skip_blanks();

        loop {
            // Commas between types are accepted alongside whitespace
            while matches!(self.byte(), Some(b',') | Some(b' ') | Some(b'\t')) {
                self.pos += 1;
            }

            if !self.byte().is_some_and(|b| b >= b'0') {
                break;
            }

            let arg = self.parse_arg_type()?;

            if args.len() == MAX_ARGS {
                return Err(self.error(ErrorKind::TooManyArgs, self.pos, 0));
            }

            args.push(arg);
            *stack_bytes += arg.stack_size(self.config.arch);

            self.require_next_token()?;
        }

        if self.byte() != Some(b')') {
            return Err(self.error(ErrorKind::ExpectedCloseParen, self.pos, 0));
        }
        self.pos += 1;

        Ok(())
    }

    fn parse_arg_type(&self) -> Result<ArgType, ParseError> {
        let rest = self.rest();

        if scan::matches_keyword(rest, "long") {
            Ok(ArgType::Long)
        } else if scan::matches_keyword(rest, "double") {
            Ok(ArgType::Double)
        } else if scan::matches_keyword(rest, "ptr") {
            Ok(ArgType::Ptr)
        } else if scan::matches_keyword(rest, "str") {
            Ok(ArgType::Str)
        } else if scan::matches_keyword(rest, "wstr") {
            Ok(ArgType::Wstr)
        } else if scan::matches_keyword(rest, "int64") {
            Ok(ArgType::Int64)
        } else if scan::matches_keyword(rest, "int128") {
            Ok(ArgType::Int128)
        } else if scan::matches_keyword(rest, "float") {
            Ok(ArgType::Float)
        } else {
            Err(self.error(ErrorKind::UnknownArgType, self.pos, 0))
        }
    }
}

/// Filtering state accumulated while parsing a line's options.
struct LineOptions {
    arch_included: bool,
    version_included: bool,
    version_range: (u32, u32),
}

impl std::default::Default for LineOptions {
    fn default() -> Self {
        LineOptions {
            arch_included: true,
            version_included: true,
            version_range: (0, 0xFFFF_FFFF),
        }
    }
}

/// Scans a run of hex digits, saturating on overflow.
///
/// Returns the value and the number of bytes consumed; an empty run yields
/// zero.
fn scan_hex(s: &str) -> (u32, usize) {
    let mut value = 0u32;
    let mut len = 0;

    for byte in s.bytes() {
        let digit = match byte {
            b'0'..=b'9' => byte - b'0',
            b'a'..=b'f' => byte - b'a' + 10,
            b'A'..=b'F' => byte - b'A' + 10,
            _ => break,
        };

        value = value.saturating_mul(16).saturating_add(digit.into());
        len += 1;
    }

    (value, len)
}

/// Scans a run of decimal digits, saturating on overflow. Empty runs yield
/// zero.
fn scan_decimal(s: &str) -> (u32, usize) {
    let mut value = 0u32;
    let mut len = 0;

    for byte in s.bytes() {
        if !byte.is_ascii_digit() {
            break;
        }

        value = value
            .saturating_mul(10)
            .saturating_add(u32::from(byte - b'0'));
        len += 1;
    }

    (value, len)
}
