use std::io::{self, Write};

use crossterm::terminal::{disable_raw_mode, enable_raw_mode};

/// Keeps the terminal in raw mode until dropped.
///
/// Restoring happens in `Drop` so it also runs when the interpreter bails out early.
#[derive(Debug)]
pub struct RawMode {
    _private: (),
}

impl RawMode {
    pub fn enable() -> io::Result<RawMode> {
        enable_raw_mode()?;
        tracing::debug!("terminal switched to raw mode");
        Ok(RawMode { _private: () })
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        if let Err(e) = disable_raw_mode() {
            tracing::warn!(error = %e, "failed to restore terminal mode");
        }
    }
}

/// Raw mode turns off output processing, so line feeds need their carriage return put back
#[derive(Debug)]
pub struct CrlfWriter<W> {
    inner: W,
}

impl<W: Write> CrlfWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }
}

impl<W: Write> Write for CrlfWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for (i, line) in buf.split(|&b| b == b'\n').enumerate() {
            if i > 0 {
                self.inner.write_all(b"\r\n")?;
            }
            self.inner.write_all(line)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
