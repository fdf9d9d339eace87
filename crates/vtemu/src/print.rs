//! Media-copy (print-through) accumulation.
//!
//! `CSI 5 i` routes the stream into a bounded buffer until `ESC [ 4 i`;
//! the buffer flushes to a caller-provided sink (a pipe to a print
//! command) or, absent one, to the display's printer port via the layer
//! hook. A failed sink is closed and printing disabled for the window;
//! parsing carries on.

use std::io::{self, Write};

use crate::parser::MAXSTR;

/// Destination of print-through output.
pub enum PrintTarget {
    /// The display's printer-on/printer-off escapes, via
    /// [`crate::layer::Layer::print_through`].
    Display,
    /// A caller-owned sink, typically a pipe to an external command.
    Sink(Box<dyn Write + Send>),
    /// Printing failed earlier; output is discarded.
    Disabled,
}

impl std::fmt::Debug for PrintTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrintTarget::Display => f.write_str("Display"),
            PrintTarget::Sink(_) => f.write_str("Sink(..)"),
            PrintTarget::Disabled => f.write_str("Disabled"),
        }
    }
}

/// Print-through buffer and sink of one window.
#[derive(Debug)]
pub struct Printer {
    buf: Vec<u8>,
    pub target: PrintTarget,
}

impl Default for Printer {
    fn default() -> Self {
        Printer {
            buf: Vec::new(),
            target: PrintTarget::Display,
        }
    }
}

/// What `flush` needs from the caller.
pub enum FlushDisposition {
    /// Nothing buffered, or written to the sink successfully.
    Done,
    /// The sink failed and was disabled; surface `error` to the user.
    SinkFailed(io::Error),
    /// No sink: pass `data` to the display's printer port.
    ToDisplay(Vec<u8>),
}

impl Printer {
    /// Buffer one print-through byte, flushing when full.
    ///
    /// Returns a disposition when an implicit flush happened.
    pub fn push(&mut self, b: u8) -> Option<FlushDisposition> {
        let flushed = if self.buf.len() >= MAXSTR - 1 {
            Some(self.flush())
        } else {
            None
        };
        self.buf.push(b);
        flushed
    }

    /// Flush the buffer to the configured sink.
    #[must_use]
    pub fn flush(&mut self) -> FlushDisposition {
        if self.buf.is_empty() {
            return FlushDisposition::Done;
        }
        let data = std::mem::take(&mut self.buf);
        match &mut self.target {
            PrintTarget::Disabled => FlushDisposition::Done,
            PrintTarget::Display => FlushDisposition::ToDisplay(data),
            PrintTarget::Sink(sink) => match sink.write_all(&data).and_then(|()| sink.flush()) {
                Ok(()) => FlushDisposition::Done,
                Err(e) => {
                    self.target = PrintTarget::Disabled;
                    FlushDisposition::SinkFailed(e)
                }
            },
        }
    }

    /// Whether output is routed to the display's printer port.
    #[must_use]
    pub fn uses_display(&self) -> bool {
        matches!(self.target, PrintTarget::Display)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_implicit_flush_on_full_buffer() {
        let mut p = Printer::default();
        let mut flushes = 0;
        for _ in 0..MAXSTR + 10 {
            if p.push(b'x').is_some() {
                flushes += 1;
            }
        }
        assert_eq!(flushes, 1);
    }

    #[test]
    fn test_failed_sink_disables_printing() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::other("pipe gone"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }
        let mut p = Printer {
            buf: Vec::new(),
            target: PrintTarget::Sink(Box::new(Broken)),
        };
        p.push(b'x');
        assert!(matches!(p.flush(), FlushDisposition::SinkFailed(_)));
        assert!(matches!(p.target, PrintTarget::Disabled));
        // Subsequent output is discarded without error.
        p.push(b'y');
        assert!(matches!(p.flush(), FlushDisposition::Done));
    }
}
