//! Stream synthesis helpers for tests and benchmarks
//!
//! Builds speech streams with known framing so tests can compare emitted
//! frames against the exact bytes that went in.

#![cfg(any(test, feature = "benchmark"))]

use crate::format::tables::{AMR_FRAME_SIZE, AMR_WB_FRAME_SIZE, rate_frame_size};
use crate::reframer::{ProcessStatus, Reframer};
use crate::sink::FrameSink;
use crate::source::ByteSource;
use crate::types::SpeechCodec;
use crate::{ReframeError, Result};

/// Synthetic codec with two frame sizes: indicator 0x00 starts a 10-byte
/// frame body and 0x08 a 20-byte one. Every other byte is invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestCodec;

impl TestCodec {
    pub const MARKER: &'static [u8] = b"#!TEST\n";

    /// Detector accepting [`TestCodec::MARKER`].
    pub fn detect(prefix: &[u8]) -> Result<(TestCodec, usize)> {
        if prefix.starts_with(Self::MARKER) {
            Ok((TestCodec, Self::MARKER.len()))
        } else {
            Err(ReframeError::unrecognized_format("missing #!TEST marker"))
        }
    }
}

impl SpeechCodec for TestCodec {
    fn name(&self) -> &'static str {
        "TEST"
    }

    fn frame_size(&self, indicator: u8) -> u32 {
        match indicator {
            0x00 => 10,
            0x08 => 20,
            _ => 0,
        }
    }

    fn sample_rate(&self) -> u32 {
        8000
    }

    fn samples_per_frame(&self) -> u32 {
        160
    }
}

/// Payload bytes that never read as a [`TestCodec`] indicator.
pub fn payload(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| 0x10 + ((seed as usize + i) % 0x60) as u8).collect()
}

/// One [`TestCodec`] frame: indicator plus body.
pub fn test_frame(indicator: u8) -> Vec<u8> {
    let size = TestCodec.frame_size(indicator) as usize;
    let mut frame = vec![indicator];
    frame.extend(payload(size, indicator));
    frame
}

/// Headerless [`TestCodec`] stream.
pub fn test_stream(indicators: &[u8]) -> Vec<u8> {
    indicators.iter().flat_map(|indicator| test_frame(*indicator)).collect()
}

/// AMR frame of the given frame type (0..=8 are valid).
pub fn amr_frame(frame_type: u8) -> Vec<u8> {
    let size = AMR_FRAME_SIZE[(frame_type & 0x0F) as usize] as usize;
    let mut frame = vec![(frame_type & 0x0F) << 3 | 0x04];
    frame.extend(payload(size, frame_type));
    frame
}

/// `#!AMR` stream holding one frame per entry of `frame_types`.
pub fn amr_stream(frame_types: &[u8]) -> Vec<u8> {
    let mut stream = b"#!AMR\n".to_vec();
    stream.extend(frame_types.iter().flat_map(|ft| amr_frame(*ft)));
    stream
}

/// `#!AMR-WB` stream holding one frame per entry of `frame_types`.
pub fn amr_wb_stream(frame_types: &[u8]) -> Vec<u8> {
    let mut stream = b"#!AMR-WB\n".to_vec();
    for ft in frame_types {
        let size = AMR_WB_FRAME_SIZE[(ft & 0x0F) as usize] as usize;
        stream.push((ft & 0x0F) << 3 | 0x04);
        stream.extend(payload(size, *ft));
    }
    stream
}

/// `#!EVRC` stream holding one frame per rate byte (1..=4 are valid).
pub fn evrc_stream(rates: &[u8]) -> Vec<u8> {
    let mut stream = b"#!EVRC\n".to_vec();
    for rate in rates {
        stream.push(*rate);
        stream.extend(payload(rate_frame_size(*rate) as usize, *rate));
    }
    stream
}

/// Split `data` into chunks whose sizes cycle through `sizes`.
pub fn split_cycling(data: &[u8], sizes: &[usize]) -> Vec<Vec<u8>> {
    let mut chunks = Vec::new();
    let mut pos = 0;
    let mut i = 0;
    while pos < data.len() {
        let size = sizes.get(i % sizes.len().max(1)).copied().unwrap_or(data.len()).max(1);
        let end = (pos + size).min(data.len());
        chunks.push(data[pos..end].to_vec());
        pos = end;
        i += 1;
    }
    chunks
}

/// Call `process` until end of stream, returning every status seen.
///
/// Fails if the reframer stops making progress (paused or stopped).
pub fn drain<C, S, K>(reframer: &mut Reframer<C>, source: &mut S, sink: &mut K) -> Result<Vec<ProcessStatus>>
where
    C: SpeechCodec,
    S: ByteSource + ?Sized,
    K: FrameSink + ?Sized,
{
    let mut statuses = Vec::new();
    loop {
        let status = reframer.process(source, sink)?;
        statuses.push(status);
        match status {
            ProcessStatus::EndOfStream => return Ok(statuses),
            ProcessStatus::Paused | ProcessStatus::Stopped => {
                return Err(ReframeError::invalid_state("drain", reframer.stream_state()));
            }
            _ => {}
        }
    }
}

/// Install a test subscriber honoring `RUST_LOG`.
#[cfg(test)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Write `bytes` to a file in a fresh temporary directory.
#[cfg(test)]
pub fn temp_stream_file(bytes: &[u8]) -> std::io::Result<(tempfile::TempDir, std::path::PathBuf)> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("stream.amr");
    std::fs::write(&path, bytes)?;
    Ok((dir, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesized_frames_have_table_sizes() {
        assert_eq!(test_frame(0x00).len(), 11);
        assert_eq!(test_frame(0x08).len(), 21);
        assert_eq!(amr_frame(7).len(), 32);
        assert_eq!(amr_stream(&[0, 8]).len(), 6 + 13 + 6);
        assert_eq!(evrc_stream(&[4]).len(), 7 + 23);
        assert_eq!(amr_wb_stream(&[8]).len(), 9 + 61);
    }

    #[test]
    fn payload_never_reads_as_indicator() {
        assert!(payload(500, 3).iter().all(|b| TestCodec.frame_size(*b) == 0));
    }

    #[test]
    fn split_covers_input() {
        let data: Vec<u8> = (0..100).collect();
        let chunks = split_cycling(&data, &[1, 5, 41]);
        assert_eq!(chunks.concat(), data);
        assert_eq!(chunks[..3].iter().map(Vec::len).collect::<Vec<_>>(), vec![1, 5, 41]);
    }
}
