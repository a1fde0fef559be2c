//! Frame size tables for the supported speech codecs.
//!
//! Sizes count the bytes that follow the indicator byte. A size of 0 marks an
//! indicator that cannot start a frame; callers resynchronize on it.

use crate::types::CodecVariant;

/// AMR narrowband sizes, indexed by the 4-bit frame type of the TOC byte.
pub const AMR_FRAME_SIZE: [u32; 16] = [12, 13, 15, 17, 19, 20, 26, 31, 5, 0, 0, 0, 0, 0, 0, 0];

/// AMR wideband sizes, indexed by the 4-bit frame type of the TOC byte.
pub const AMR_WB_FRAME_SIZE: [u32; 16] = [17, 23, 32, 36, 40, 46, 50, 58, 60, 5, 5, 0, 0, 0, 0, 0];

/// EVRC/SMV `(rate type, packet size including the rate byte)` pairs.
pub const SMV_EVRC_RATE_TO_SIZE: [(u8, u32); 6] = [(0, 1), (1, 3), (2, 6), (3, 11), (4, 23), (5, 1)];

/// Extract the AMR frame type: drop the padding bit, keep the next four.
#[inline]
pub fn toc_frame_type(indicator: u8) -> usize {
    ((indicator >> 3) & 0x0F) as usize
}

/// Table-driven lookup for the AMR family.
#[inline]
pub fn indexed_frame_size(table: &[u32; 16], indicator: u8) -> u32 {
    table[toc_frame_type(indicator)]
}

/// Linear search for the EVRC/SMV family, where the whole byte is the rate type.
pub fn rate_frame_size(indicator: u8) -> u32 {
    SMV_EVRC_RATE_TO_SIZE
        .iter()
        .find(|(rate, _)| *rate == indicator)
        // the rate byte itself is the indicator, it is not part of the payload
        .map(|(_, size)| size - 1)
        .unwrap_or(0)
}

/// Resolve the frame size for `indicator` under `variant`.
pub fn frame_size(variant: CodecVariant, indicator: u8) -> u32 {
    match variant {
        CodecVariant::Amr => indexed_frame_size(&AMR_FRAME_SIZE, indicator),
        CodecVariant::AmrWb => indexed_frame_size(&AMR_WB_FRAME_SIZE, indicator),
        CodecVariant::Evrc | CodecVariant::Smv => rate_frame_size(indicator),
    }
}

/// Largest size `frame_size` can return for `variant`.
pub fn max_frame_size(variant: CodecVariant) -> u32 {
    match variant {
        CodecVariant::Amr => AMR_FRAME_SIZE.iter().copied().max().unwrap_or(0),
        CodecVariant::AmrWb => AMR_WB_FRAME_SIZE.iter().copied().max().unwrap_or(0),
        CodecVariant::Evrc | CodecVariant::Smv => {
            SMV_EVRC_RATE_TO_SIZE.iter().map(|(_, size)| size - 1).max().unwrap_or(0)
        }
    }
}
