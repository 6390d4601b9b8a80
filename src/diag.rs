//! Diagnostics sink and the process exit status it accumulates.

use std::fmt;

/// Severity of a recoverable problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Exit status 1, e.g. a file vanished between readdir and stat.
    Minor,
    /// Exit status 2, e.g. an inaccessible command-line argument.
    Serious,
}

/// Final exit status. Ordered so that `max` never downgrades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ExitStatus {
    #[default]
    Success,
    Minor,
    Serious,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::Minor => 1,
            ExitStatus::Serious => 2,
        }
    }
}

impl From<Severity> for ExitStatus {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Minor => ExitStatus::Minor,
            Severity::Serious => ExitStatus::Serious,
        }
    }
}

/// One reported problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

/// Collects diagnostics, optionally echoing them to stderr.
#[derive(Debug)]
pub struct Diagnostics {
    program: &'static str,
    echo: bool,
    keep: bool,
    recorded: Vec<Diagnostic>,
    status: ExitStatus,
}

impl Diagnostics {
    /// Sink that prints `lsgrid: message` lines to stderr.
    pub fn stderr() -> Self {
        Diagnostics {
            program: "lsgrid",
            echo: true,
            keep: false,
            recorded: Vec::new(),
            status: ExitStatus::Success,
        }
    }

    /// Sink that keeps every message in memory and prints nothing.
    pub fn capturing() -> Self {
        Diagnostics {
            program: "lsgrid",
            echo: false,
            keep: true,
            recorded: Vec::new(),
            status: ExitStatus::Success,
        }
    }

    pub fn report(&mut self, severity: Severity, message: fmt::Arguments<'_>) {
        self.status = self.status.max(severity.into());
        if self.echo {
            eprintln!("{}: {}", self.program, message);
        }
        if self.keep {
            self.recorded.push(Diagnostic {
                severity,
                message: message.to_string(),
            });
        }
    }

    /// Print a warning that does not affect the exit status.
    pub fn note(&mut self, message: fmt::Arguments<'_>) {
        if self.echo {
            eprintln!("{}: {}", self.program, message);
        }
    }

    /// Report a failure on `name`: serious for command-line arguments, minor otherwise.
    pub fn file_failure(
        &mut self,
        command_line_arg: bool,
        what: &str,
        name: &str,
        err: &std::io::Error,
    ) {
        let severity = if command_line_arg {
            Severity::Serious
        } else {
            Severity::Minor
        };
        self.report(
            severity,
            format_args!("{} {}: {}", what, quote_for_message(name), describe(err)),
        );
    }

    pub fn status(&self) -> ExitStatus {
        self.status
    }

    pub fn recorded(&self) -> &[Diagnostic] {
        &self.recorded
    }
}

/// Quote a file name for a diagnostic line.
pub fn quote_for_message(name: &str) -> String {
    if name.contains('\'') {
        format!("\"{}\"", name)
    } else {
        format!("'{}'", name)
    }
}

/// OS error text without the trailing "(os error N)" std adds.
pub fn describe(err: &std::io::Error) -> String {
    let text = err.to_string();
    match text.find(" (os error") {
        Some(idx) => text[..idx].to_string(),
        None => text,
    }
}
