//! Serialized line output shared by concurrent tasks.

use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::CliError;

/// A line-oriented output destination that can be cloned into many tasks.
///
/// Every call takes the sink lock for its whole duration, so lines written by
/// different tasks never interleave, and a batch written with
/// [`EventSink::lines`] stays contiguous.
#[derive(Clone)]
pub struct EventSink {
    writer: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl std::fmt::Debug for EventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSink").finish_non_exhaustive()
    }
}

impl EventSink {
    /// Wraps a writer.
    #[must_use]
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            writer: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Sink writing to standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Writes one line.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn line(&self, line: &str) -> Result<(), CliError> {
        self.lines([line])
    }

    /// Writes several lines without letting other writers in between.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn lines<I, S>(&self, lines: I) -> Result<(), CliError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut writer = self.writer.lock();
        for line in lines {
            writeln!(writer, "{}", line.as_ref())?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// In-memory capture of everything written to a sink.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub(crate) struct Captured(Arc<Mutex<Vec<u8>>>);

#[cfg(test)]
impl Captured {
    /// Creates a sink writing into a fresh capture buffer.
    pub(crate) fn sink() -> (EventSink, Self) {
        let captured = Self::default();
        (EventSink::new(captured.clone()), captured)
    }

    /// Returns everything written so far.
    pub(crate) fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

#[cfg(test)]
impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
