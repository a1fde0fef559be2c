//! Regular file source

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace};

use crate::config::FileConfig;
use crate::source::{ByteSource, Chunk, Reposition, SourcePoll};
use crate::{ReframeError, Result};

/// Reads a file in fixed-size blocks.
///
/// Files are seekable and finite, so they expose their path for seek indexing.
pub struct FileSource {
    file: File,
    path: PathBuf,
    length: u64,
    position: u64,
    block_size: usize,
    is_first: bool,
}

impl FileSource {
    /// Open a file with the default block size.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_config(path, &FileConfig::default())
    }

    pub fn with_config<P: AsRef<Path>>(path: P, config: &FileConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| ReframeError::source_error(path.clone(), e))?;
        let length = file
            .metadata()
            .map_err(|e| ReframeError::source_error(path.clone(), e))?
            .len();

        info!(path = %path.display(), length, "Opened file source");

        Ok(Self {
            file,
            path,
            length,
            position: 0,
            block_size: config.block_size.max(1),
            is_first: true,
        })
    }

    pub fn position(&self) -> u64 {
        self.position
    }
}

impl ByteSource for FileSource {
    fn next_chunk(&mut self) -> Result<SourcePoll> {
        if self.position >= self.length {
            return Ok(SourcePoll::EndOfStream);
        }

        let mut data = vec![0u8; self.block_size];
        let read = loop {
            match self.file.read(&mut data) {
                Ok(n) => break n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(ReframeError::source_error(self.path.clone(), e)),
            }
        };
        if read == 0 {
            // file shrank underneath us
            debug!(path = %self.path.display(), "File ended before its recorded length");
            self.length = self.position;
            return Ok(SourcePoll::EndOfStream);
        }
        data.truncate(read);

        let chunk = Chunk {
            data,
            byte_offset: Some(self.position),
            timestamp: None,
            is_first: self.is_first,
            is_last: self.position + read as u64 >= self.length,
        };
        self.position += read as u64;
        self.is_first = false;

        trace!(offset = ?chunk.byte_offset, len = read, "File chunk");
        Ok(SourcePoll::Chunk(chunk))
    }

    fn reposition(&mut self, byte_offset: u64) -> Result<Reposition> {
        self.file
            .seek(SeekFrom::Start(byte_offset))
            .map_err(|e| ReframeError::source_error(self.path.clone(), e))?;
        self.position = byte_offset;
        self.is_first = true;
        debug!(path = %self.path.display(), byte_offset, "File source repositioned");
        Ok(Reposition::Done)
    }

    fn length(&self) -> Option<u64> {
        Some(self.length)
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};

    fn write_fixture(bytes: &[u8]) -> Result<(tempfile::TempDir, PathBuf)> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("fixture.amr");
        std::fs::write(&path, bytes)?;
        Ok((dir, path))
    }

    #[test]
    fn reads_in_blocks_with_offsets() -> Result<()> {
        let bytes: Vec<u8> = (0..=255).collect();
        let (_dir, path) = write_fixture(&bytes)?;
        let mut source = FileSource::with_config(&path, &FileConfig { block_size: 100 })
            .context("opening fixture")?;

        assert_eq!(source.length(), Some(256));
        assert_eq!(source.path(), Some(path.as_path()));

        let mut offsets = Vec::new();
        let mut collected = Vec::new();
        let mut last_flags = Vec::new();
        while let SourcePoll::Chunk(chunk) = source.next_chunk()? {
            offsets.push(chunk.byte_offset);
            last_flags.push(chunk.is_last);
            collected.extend_from_slice(&chunk.data);
        }
        assert_eq!(offsets, vec![Some(0), Some(100), Some(200)]);
        assert_eq!(last_flags, vec![false, false, true]);
        assert_eq!(collected, bytes);
        assert_eq!(source.next_chunk()?, SourcePoll::EndOfStream);
        Ok(())
    }

    #[test]
    fn reposition_restarts_delivery() -> Result<()> {
        let bytes: Vec<u8> = (0..50).collect();
        let (_dir, path) = write_fixture(&bytes)?;
        let mut source = FileSource::with_config(&path, &FileConfig { block_size: 8 })?;

        let _ = source.next_chunk()?;
        assert_eq!(source.reposition(40)?, Reposition::Done);
        match source.next_chunk()? {
            SourcePoll::Chunk(chunk) => {
                assert_eq!(chunk.byte_offset, Some(40));
                assert!(chunk.is_first);
                assert_eq!(chunk.data, (40..48).collect::<Vec<u8>>());
            }
            other => anyhow::bail!("expected chunk, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn missing_file_is_source_error() {
        let err = FileSource::open("/definitely/not/here.amr").err().expect("open must fail");
        assert!(matches!(err, ReframeError::Source { .. }));
    }
}
