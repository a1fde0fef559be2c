//! Byte source trait for upstream data

use std::path::Path;

use crate::Result;

/// A run of stream bytes as delivered upstream.
///
/// Chunk boundaries carry no meaning for the codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub data: Vec<u8>,

    /// Position of `data[0]` in the source, if the source tracks positions
    pub byte_offset: Option<u64>,

    /// Upstream timestamp in the external time scale, if any
    pub timestamp: Option<u64>,

    /// First chunk delivered since the source was opened or repositioned
    pub is_first: bool,

    /// The source has nothing after this chunk
    pub is_last: bool,
}

impl Chunk {
    /// Create a chunk with no position or timing information.
    pub fn new(data: Vec<u8>) -> Self {
        Self { data, byte_offset: None, timestamp: None, is_first: false, is_last: false }
    }

    pub fn with_byte_offset(mut self, offset: u64) -> Self {
        self.byte_offset = Some(offset);
        self
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Result of asking a source for its next chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourcePoll {
    Chunk(Chunk),
    /// Nothing available yet; ask again later
    Pending,
    EndOfStream,
}

/// Result of a reposition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reposition {
    Done,
    /// The source cannot seek (live pipes); it keeps delivering from where it is
    Unsupported,
}

/// Trait for upstream byte sources
///
/// Sources abstract over files, named pipes and in-memory buffers. They may
/// block inside `next_chunk` if they are configured to; the reframer itself
/// never waits.
pub trait ByteSource {
    /// Get the next chunk of stream bytes
    ///
    /// Returns:
    /// - `Ok(SourcePoll::Chunk(chunk))` - New bytes available
    /// - `Ok(SourcePoll::Pending)` - No bytes ready yet
    /// - `Ok(SourcePoll::EndOfStream)` - Stream ended (normal termination)
    /// - `Err(e)` - I/O failure; the stream is unusable afterwards
    fn next_chunk(&mut self) -> Result<SourcePoll>;

    /// Continue delivery from `byte_offset`.
    fn reposition(&mut self, byte_offset: u64) -> Result<Reposition>;

    /// Total length in bytes, when known.
    fn length(&self) -> Option<u64>;

    /// Stable path of a seekable, finite source.
    ///
    /// Only sources that return a path get a seek index.
    fn path(&self) -> Option<&Path> {
        None
    }

    /// External time scale of the timestamps attached to chunks.
    fn timescale(&self) -> Option<u32> {
        None
    }
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn next_chunk(&mut self) -> Result<SourcePoll> {
        (**self).next_chunk()
    }

    fn reposition(&mut self, byte_offset: u64) -> Result<Reposition> {
        (**self).reposition(byte_offset)
    }

    fn length(&self) -> Option<u64> {
        (**self).length()
    }

    fn path(&self) -> Option<&Path> {
        (**self).path()
    }

    fn timescale(&self) -> Option<u32> {
        (**self).timescale()
    }
}
