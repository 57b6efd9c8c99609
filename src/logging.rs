use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use log::Level;
use termcolor::{BufferWriter, Color, ColorChoice, ColorSpec, WriteColor};

use crate::cli::CliOptions;

struct CliLogger {
    stdout: BufferWriter,
    stderr: BufferWriter,
}

impl log::Log for CliLogger {
    #[inline]
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        if record.args().as_str().is_some_and(|args| args.is_empty()) {
            return;
        }

        let writer = if record.level() <= Level::Warn {
            &self.stderr
        } else {
            &self.stdout
        };

        let mut buffer = writer.buffer();
        write!(buffer, "{}: ", env!("CARGO_BIN_NAME")).unwrap();

        match record.level() {
            Level::Error => {
                let _ = buffer.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true));
                write!(buffer, "error:").unwrap();
            }
            Level::Warn => {
                let _ =
                    buffer.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true));
                write!(buffer, "warning:").unwrap();
            }
            Level::Info => {
                let _ =
                    buffer.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true));
                write!(buffer, "info:").unwrap();
            }
            Level::Debug => {
                let _ =
                    buffer.set_color(ColorSpec::new().set_fg(Some(Color::White)).set_bold(true));
                write!(buffer, "debug:").unwrap();
            }
            Level::Trace => {
                let _ = buffer.set_color(ColorSpec::new().set_fg(Some(Color::Blue)).set_bold(true));
                write!(buffer, "trace:").unwrap();
            }
        }

        buffer.reset().unwrap();
        writeln!(buffer, " {}", record.args()).unwrap();

        writer.print(&buffer).unwrap();
    }

    fn flush(&self) {}
}

/// Color options for diagnostic messages
#[derive(ValueEnum, Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorOption {
    /// Automatically use colors depending on the environment
    #[value(name = "auto")]
    #[default]
    Auto,

    /// Always use colors
    #[value(name = "always")]
    Always,

    /// Never use colors
    #[value(name = "never")]
    Never,
}

impl std::fmt::Display for ColorOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(v) = self.to_possible_value() {
            write!(f, "{}", v.get_name())?;
        }

        Ok(())
    }
}

impl ColorOption {
    /// Attempts to parse the specified string value into a ColorOption.
    pub fn parse(value: &str, ignore_case: bool) -> Option<ColorOption> {
        let optmap = [
            ("auto", ColorOption::Auto),
            ("always", ColorOption::Always),
            ("never", ColorOption::Never),
        ];

        optmap.iter().find_map(|(name, val)| {
            let matches = if ignore_case {
                value.eq_ignore_ascii_case(name)
            } else {
                value == *name
            };

            matches.then_some(*val)
        })
    }
}

impl From<ColorOption> for ColorChoice {
    fn from(value: ColorOption) -> ColorChoice {
        match value {
            ColorOption::Auto => ColorChoice::Auto,
            ColorOption::Always => ColorChoice::Always,
            ColorOption::Never => ColorChoice::Never,
        }
    }
}

/// Sets up logging for the cli
pub fn setup_logger(options: &CliOptions) -> anyhow::Result<()> {
    let color_choice = match options.color_diagnostics {
        ColorOption::Always => ColorChoice::Always,
        ColorOption::Never => ColorChoice::Never,
        ColorOption::Auto
            if std::env::var("TERM")
                .ok()
                .is_none_or(|term| !term.eq_ignore_ascii_case("dumb"))
                && std::env::var_os("NO_COLOR").is_none() =>
        {
            ColorChoice::Auto
        }
        ColorOption::Auto => ColorChoice::Never,
    };

    log::set_boxed_logger(Box::from(CliLogger {
        stdout: BufferWriter::stdout(
            if color_choice != ColorChoice::Never && std::io::stdout().is_terminal() {
                color_choice
            } else {
                ColorChoice::Never
            },
        ),
        stderr: BufferWriter::stderr(
            if color_choice != ColorChoice::Never && std::io::stderr().is_terminal() {
                color_choice
            } else {
                ColorChoice::Never
            },
        ),
    }))
    .map(|()| {
        if options.verbose >= 2 {
            log::set_max_level(log::LevelFilter::Trace);
        } else if options.verbose >= 1 {
            log::set_max_level(log::LevelFilter::Debug);
        } else {
            log::set_max_level(log::LevelFilter::Info);
        }
    })?;

    Ok(())
}
