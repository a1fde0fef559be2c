//! In-memory source with a caller-chosen chunk pattern

use std::path::{Path, PathBuf};

use crate::Result;
use crate::source::{ByteSource, Chunk, Reposition, SourcePoll};

/// Serves a byte buffer in chunks whose sizes cycle through a pattern.
///
/// ```rust
/// use speechframe::sources::MemorySource;
/// use speechframe::{ByteSource, SourcePoll};
///
/// let mut source = MemorySource::new(b"abcdefg".to_vec()).with_chunk_sizes(&[2, 3]);
/// let mut sizes = Vec::new();
/// while let Ok(SourcePoll::Chunk(chunk)) = source.next_chunk() {
///     sizes.push(chunk.len());
/// }
/// assert_eq!(sizes, vec![2, 3, 2]);
/// ```
#[derive(Debug, Clone)]
pub struct MemorySource {
    data: Vec<u8>,
    position: usize,
    chunk_sizes: Vec<usize>,
    next_size: usize,
    path: Option<PathBuf>,
    timescale: Option<u32>,
    timestamps: Vec<u64>,
    delivered: usize,
    pending_every: Option<usize>,
    polls: usize,
    seekable: bool,
    is_first: bool,
}

impl MemorySource {
    /// Serve `data` as a single chunk.
    pub fn new(data: Vec<u8>) -> Self {
        let len = data.len().max(1);
        Self {
            data,
            position: 0,
            chunk_sizes: vec![len],
            next_size: 0,
            path: None,
            timescale: None,
            timestamps: Vec::new(),
            delivered: 0,
            pending_every: None,
            polls: 0,
            seekable: true,
            is_first: true,
        }
    }

    /// Cycle chunk sizes through `sizes` (zero sizes are treated as 1).
    pub fn with_chunk_sizes(mut self, sizes: &[usize]) -> Self {
        if !sizes.is_empty() {
            self.chunk_sizes = sizes.iter().map(|size| (*size).max(1)).collect();
        }
        self
    }

    /// Report `path` as the stable location of this stream.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Attach an external time scale and per-chunk timestamps (in delivery order).
    pub fn with_timestamps(mut self, timescale: u32, timestamps: Vec<u64>) -> Self {
        self.timescale = Some(timescale);
        self.timestamps = timestamps;
        self
    }

    /// Answer `Pending` on every `n`th poll.
    pub fn with_pending_every(mut self, n: usize) -> Self {
        self.pending_every = Some(n.max(1));
        self
    }

    /// Behave like a live source that cannot reposition.
    pub fn non_seekable(mut self) -> Self {
        self.seekable = false;
        self
    }

    pub fn position(&self) -> usize {
        self.position
    }
}

impl ByteSource for MemorySource {
    fn next_chunk(&mut self) -> Result<SourcePoll> {
        self.polls += 1;
        if let Some(n) = self.pending_every {
            if self.polls % n == 0 {
                return Ok(SourcePoll::Pending);
            }
        }
        if self.position >= self.data.len() {
            return Ok(SourcePoll::EndOfStream);
        }

        let size = self.chunk_sizes[self.next_size % self.chunk_sizes.len()];
        self.next_size += 1;
        let end = (self.position + size).min(self.data.len());
        let chunk = Chunk {
            data: self.data[self.position..end].to_vec(),
            byte_offset: Some(self.position as u64),
            timestamp: self.timestamps.get(self.delivered).copied(),
            is_first: self.is_first,
            is_last: end == self.data.len(),
        };
        self.position = end;
        self.delivered += 1;
        self.is_first = false;
        Ok(SourcePoll::Chunk(chunk))
    }

    fn reposition(&mut self, byte_offset: u64) -> Result<Reposition> {
        if !self.seekable {
            return Ok(Reposition::Unsupported);
        }
        self.position = (byte_offset as usize).min(self.data.len());
        self.is_first = true;
        Ok(Reposition::Done)
    }

    fn length(&self) -> Option<u64> {
        self.seekable.then_some(self.data.len() as u64)
    }

    fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn timescale(&self) -> Option<u32> {
        self.timescale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_polls_do_not_consume() {
        let mut source = MemorySource::new(vec![1, 2, 3]).with_chunk_sizes(&[1]).with_pending_every(2);
        let mut polls = Vec::new();
        for _ in 0..7 {
            polls.push(source.next_chunk().unwrap());
        }
        let bytes: Vec<u8> = polls
            .iter()
            .filter_map(|poll| match poll {
                SourcePoll::Chunk(chunk) => Some(chunk.data[0]),
                _ => None,
            })
            .collect();
        assert_eq!(bytes, vec![1, 2, 3]);
        assert_eq!(polls[1], SourcePoll::Pending);
        assert_eq!(polls[6], SourcePoll::EndOfStream);
    }

    #[test]
    fn non_seekable_refuses_reposition() {
        let mut source = MemorySource::new(vec![0; 10]).non_seekable();
        assert_eq!(source.reposition(4).unwrap(), Reposition::Unsupported);
        assert_eq!(source.length(), None);
    }

    #[test]
    fn timestamps_follow_delivery_order() {
        let mut source =
            MemorySource::new(vec![0; 4]).with_chunk_sizes(&[2]).with_timestamps(1000, vec![0, 40]);
        assert_eq!(source.timescale(), Some(1000));
        let stamps: Vec<Option<u64>> = (0..2)
            .map(|_| match source.next_chunk().unwrap() {
                SourcePoll::Chunk(chunk) => chunk.timestamp,
                _ => None,
            })
            .collect();
        assert_eq!(stamps, vec![Some(0), Some(40)]);
    }
}
