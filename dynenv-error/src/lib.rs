//! Contains the common [`ErrorKind`] trait used by all errors to display user-facing error
//! messages, and the [`Error`] type that carries them.

use ariadne::{Color, Fmt, Report, ReportKind, Source};
use std::{any::Any, fmt::{self, Debug, Display}, io::{self, Write}, ops::Range};

/// Represents any kind of error that can occur while binding or resolving names.
///
/// Implementations are usually derived with `#[derive(ErrorKind)]` from the `dynenv-attrs`
/// crate.
pub trait ErrorKind: Debug + Send + Sync {
    /// Returns `self` as [`Any`], so that callers can recover the concrete error kind.
    fn as_any(&self) -> &dyn Any;

    /// The message displayed at the top of the error.
    fn message(&self) -> String;

    /// Optional help text describing what the caller can do to fix the error.
    fn help(&self) -> Option<String> {
        None
    }

    /// Optional note with additional context.
    fn note(&self) -> Option<String> {
        None
    }

    /// Builds the report header for this error.
    ///
    /// Dynamic binding errors are not tied to a region of source code, so the report carries no
    /// labels. `ariadne` only renders help and notes below a labelled source snippet, so they are
    /// written separately by [`Error::write_report`].
    fn build_report<'a>(&self, src_id: &'a str) -> Report<(&'a str, Range<usize>)> {
        Report::build(ReportKind::Error, src_id, 0)
            .with_message(self.message())
            .finish()
    }
}

/// An error raised by a dynamic environment.
#[derive(Debug)]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: Box<dyn ErrorKind>,
}

impl Error {
    /// Creates a new error with the given kind.
    pub fn new(kind: impl ErrorKind + 'static) -> Self {
        Self { kind: Box::new(kind) }
    }

    /// Returns true if the error is of the given kind.
    pub fn is<K: ErrorKind + 'static>(&self) -> bool {
        self.kind.as_any().is::<K>()
    }

    /// Returns the concrete error kind, if it is of the given type.
    pub fn downcast_ref<K: ErrorKind + 'static>(&self) -> Option<&K> {
        self.kind.as_any().downcast_ref::<K>()
    }

    /// Build a report from this error kind.
    pub fn build_report<'a>(&self, src_id: &'a str) -> Report<(&'a str, Range<usize>)> {
        self.kind.build_report(src_id)
    }

    /// Writes the full report for this error, including its help and note, to the given writer.
    pub fn write_report<W: Write>(&self, src_id: &str, mut w: W) -> io::Result<()> {
        self.build_report(src_id).write((src_id, Source::from("")), &mut w)?;
        if let Some(help) = self.kind.help() {
            writeln!(w, "{}: {}", "Help".fg(Color::Cyan), help)?;
        }
        if let Some(note) = self.kind.note() {
            writeln!(w, "{}: {}", "Note".fg(Color::Cyan), note)?;
        }
        Ok(())
    }

    /// Report this error to stderr.
    pub fn report_to_stderr(&self, src_id: &str) -> io::Result<()> {
        self.write_report(src_id, io::stderr().lock())
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind.message())?;
        if let Some(help) = self.kind.help() {
            write!(f, " (help: {})", help)?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {}
