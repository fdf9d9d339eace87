//! Raw-output logging tee.
//!
//! When a log sink is attached, every byte handed to the emulator is
//! written to it before parsing. A write failure closes the sink and
//! disables logging for the window; the parse itself is unaffected.

use std::io::{self, Write};
use std::time::Instant;

use crate::config::LogTimestamps;

/// Per-window log sink with silence-based timestamp stamping.
pub struct LogSink {
    sink: Box<dyn Write + Send>,
    last_write: Option<Instant>,
}

impl std::fmt::Debug for LogSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogSink")
            .field("last_write", &self.last_write)
            .finish_non_exhaustive()
    }
}

impl LogSink {
    #[must_use]
    pub fn new(sink: Box<dyn Write + Send>) -> Self {
        LogSink {
            sink,
            last_write: None,
        }
    }

    /// Tee `buf` into the log.
    ///
    /// A timestamp stamp is prepended after a configured interval of
    /// silence. With `flush` set the sink is flushed after the write.
    ///
    /// # Errors
    ///
    /// Returns the I/O error of the failed write; the caller drops the
    /// sink in response.
    pub fn write(
        &mut self,
        buf: &[u8],
        timestamps: Option<&LogTimestamps>,
        flush: bool,
    ) -> io::Result<()> {
        if let Some(ts) = timestamps
            && self
                .last_write
                .is_some_and(|last| last.elapsed() >= ts.after)
        {
            self.sink.write_all(ts.stamp.as_bytes())?;
        }
        self.last_write = Some(Instant::now());
        self.sink.write_all(buf)?;
        if flush {
            self.sink.flush()?;
        }
        Ok(())
    }
}
