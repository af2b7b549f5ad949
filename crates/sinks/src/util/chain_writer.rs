//! Writer chains for sink outputs
//!
//! A chain is the writer stack between rendered lines and the underlying
//! output. [`ChainWriter`] builds chains, so a rotating sink can open a fresh
//! chain at the same path on every rotation, and tests can slot in writers
//! that fail on demand.
//!
//! Chains do not buffer. The sink keeps accepted lines until a chain has
//! taken every byte of them, so a failing chain never strands data.
//!
//! # Example
//!
//! ```ignore
//! use accesslog_sinks::util::chain_writer::{ChainWriter, PlainTextWriter};
//!
//! let mut chain = PlainTextWriter.open(Path::new("access.log"))?;
//!
//! chain.write_all(b"127.0.0.1 - - ...\n")?;
//! chain.finish()?;
//! ```

use std::fs::{File, OpenOptions};
use std::io::{self, IoSlice, Write};
use std::path::Path;

/// Builds writer chains for a sink
pub trait ChainWriter: Send + Sync {
    /// Open a chain appending to `path`, creating the file if it is missing
    fn open(&self, path: &Path) -> io::Result<Box<dyn ChainWrite>>;

    /// Wrap a caller-supplied stream
    fn adopt(&self, stream: Box<dyn Write + Send>) -> Box<dyn ChainWrite>;
}

/// Write operations on one open chain
///
/// Object-safe, used as `Box<dyn ChainWrite>`.
pub trait ChainWrite: Write + Send {
    /// Push anything the underlying output holds back to the operating system
    fn flush_all(&mut self) -> io::Result<()>;

    /// Sync to stable storage where that applies, and close
    fn finish(self: Box<Self>) -> io::Result<()>;

    /// Bytes taken by this chain since it was opened
    fn bytes_written(&self) -> u64;
}

// ============================================================================
// PlainTextWriter
// ============================================================================

/// Plain text writer over append-mode files and caller streams
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextWriter;

impl PlainTextWriter {
    /// Wrap an already open file
    pub fn wrap(&self, file: File) -> Box<dyn ChainWrite> {
        Box::new(FileChain {
            file,
            bytes_written: 0,
        })
    }
}

impl ChainWriter for PlainTextWriter {
    fn open(&self, path: &Path) -> io::Result<Box<dyn ChainWrite>> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(self.wrap(file))
    }

    fn adopt(&self, stream: Box<dyn Write + Send>) -> Box<dyn ChainWrite> {
        Box::new(StreamChain {
            stream,
            bytes_written: 0,
        })
    }
}

/// Chain over an append-mode file
struct FileChain {
    file: File,
    bytes_written: u64,
}

impl Write for FileChain {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.file.write(buf)?;
        self.bytes_written += n as u64;
        Ok(n)
    }

    fn write_vectored(&mut self, bufs: &[IoSlice<'_>]) -> io::Result<usize> {
        let n = self.file.write_vectored(bufs)?;
        self.bytes_written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl ChainWrite for FileChain {
    fn flush_all(&mut self) -> io::Result<()> {
        self.file.flush()
    }

    fn finish(self: Box<Self>) -> io::Result<()> {
        self.file.sync_data()
    }

    fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}

/// Chain over a stream the sink does not own the lifecycle of
struct StreamChain {
    stream: Box<dyn Write + Send>,
    bytes_written: u64,
}

impl Write for StreamChain {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.stream.write(buf)?;
        self.bytes_written += n as u64;
        Ok(n)
    }

    fn write_vectored(&mut self, bufs: &[IoSlice<'_>]) -> io::Result<usize> {
        let n = self.stream.write_vectored(bufs)?;
        self.bytes_written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

impl ChainWrite for StreamChain {
    fn flush_all(&mut self) -> io::Result<()> {
        self.stream.flush()
    }

    fn finish(mut self: Box<Self>) -> io::Result<()> {
        self.stream.flush()
    }

    fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}

#[cfg(test)]
#[path = "chain_writer_test.rs"]
mod chain_writer_test;
