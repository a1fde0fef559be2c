//! Forward scan that builds a [`SeekIndex`]

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, info, warn};

use super::{IndexEntry, SeekIndex};
use crate::types::SpeechCodec;
use crate::{ReframeError, Result};

/// Builds a [`SeekIndex`] from an independent read cursor over the stream.
#[derive(Debug, Clone, Copy)]
pub struct SeekIndexBuilder {
    window: f64,
}

impl SeekIndexBuilder {
    /// `window` is the minimum spacing of entries in seconds.
    pub fn new(window: f64) -> Self {
        Self { window }
    }

    pub fn window(&self) -> f64 {
        self.window
    }

    /// Scan the file at `path`, starting at the first frame indicator.
    pub fn build_from_path<C>(&self, codec: &C, path: &Path, data_offset: u64) -> Result<SeekIndex>
    where
        C: SpeechCodec + ?Sized,
    {
        let file = File::open(path).map_err(|e| ReframeError::source_error(path.to_path_buf(), e))?;
        let index = self.build(codec, file, data_offset)?;
        info!(
            path = %path.display(),
            entries = index.len(),
            frames = index.total_frames(),
            duration_secs = index.total_duration().as_secs_f64(),
            "Built seek index"
        );
        Ok(index)
    }

    /// Scan `reader` from `data_offset` to its end.
    ///
    /// The scan stops early at an indicator with no frame size; a truncated
    /// final frame is not counted.
    pub fn build<C, R>(&self, codec: &C, reader: R, data_offset: u64) -> Result<SeekIndex>
    where
        C: SpeechCodec + ?Sized,
        R: Read + Seek,
    {
        let mut reader = BufReader::new(reader);
        let length = reader.seek(SeekFrom::End(0)).map_err(|e| ReframeError::io_error("index scan", e))?;
        reader
            .seek(SeekFrom::Start(data_offset))
            .map_err(|e| ReframeError::io_error("index scan", e))?;

        let sample_rate = codec.sample_rate();
        let samples_per_frame = codec.samples_per_frame() as u64;
        let window_samples = self.window * sample_rate as f64;

        let mut entries = Vec::new();
        let mut position = data_offset;
        let mut total_samples = 0u64;
        let mut total_frames = 0u64;
        let mut since_last = 0u64;
        let mut complete = true;
        let mut indicator = [0u8; 1];

        while position < length {
            match reader.read_exact(&mut indicator) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(ReframeError::io_error("index scan", e)),
            }

            let size = codec.frame_size(indicator[0]) as u64;
            if size == 0 {
                debug!(position, indicator = indicator[0], "Index scan stopped at invalid indicator");
                complete = false;
                break;
            }
            if position + 1 + size > length {
                warn!(position, size, remaining = length - position - 1, "Ignoring truncated final frame");
                break;
            }

            if since_last as f64 > window_samples {
                entries.push(IndexEntry {
                    byte_position: position,
                    cumulative_duration: total_samples as f64 / sample_rate as f64,
                    frame_number: total_frames,
                });
                since_last = 0;
            }

            total_samples += samples_per_frame;
            since_last += samples_per_frame;
            total_frames += 1;

            reader
                .seek_relative(size as i64)
                .map_err(|e| ReframeError::io_error("index scan", e))?;
            position += 1 + size;
        }

        Ok(SeekIndex { entries, total_samples, total_frames, sample_rate, data_offset, complete })
    }
}
