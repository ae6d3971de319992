// src/exec/streamer.rs

//! Incremental reader over a process output stream.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::warn;

/// Block size used when none is configured.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// One bounded read from the stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chunk {
    pub bytes: Vec<u8>,
    /// No further data will follow (end-of-data or a read error).
    pub done: bool,
}

impl Chunk {
    fn end() -> Self {
        Self {
            bytes: Vec::new(),
            done: true,
        }
    }
}

/// Lazy, finite, non-restartable sequence of output chunks.
///
/// A read error ends the sequence exactly like end-of-data does; the error
/// is only visible in the logs.
pub struct OutputStreamer<R> {
    reader: R,
    buf: Vec<u8>,
    finished: bool,
}

impl<R: AsyncRead + Unpin> OutputStreamer<R> {
    pub fn new(reader: R, chunk_size: usize) -> Self {
        Self {
            reader,
            buf: vec![0; chunk_size.max(1)],
            finished: false,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.buf.len()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Read the next chunk, suspending until data, end-of-data or an error.
    pub async fn next_chunk(&mut self) -> Chunk {
        if self.finished {
            return Chunk::end();
        }

        loop {
            match self.reader.read(&mut self.buf).await {
                Ok(0) => {
                    self.finished = true;
                    return Chunk::end();
                }
                Ok(n) => {
                    return Chunk {
                        bytes: self.buf[..n].to_vec(),
                        done: false,
                    };
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!(error = %e, "read error on output stream; treating as end of data");
                    self.finished = true;
                    return Chunk::end();
                }
            }
        }
    }
}
