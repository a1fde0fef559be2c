//! Core types for speech stream reframing.
//!
//! ## Architecture
//!
//! - [`CodecVariant`] is the closed set of supported codecs, each bound to a
//!   frame size table, a sample rate and a frame length
//! - [`SpeechCodec`] is the one interface the reframer drives a codec through
//! - [`Frame`] is a complete access unit with zero-copy data sharing via Arc
//! - [`StreamProperties`] describes the stream to the downstream consumer
//! - [`ControlEvent`] carries play/stop/speed requests
//!
//! ## Usage Example
//!
//! ```rust
//! use speechframe::types::{CodecVariant, SpeechCodec};
//!
//! let codec = CodecVariant::Amr;
//! // 0x3C: AMR 12.2 kbit/s frame type
//! assert_eq!(codec.frame_size(0x3C), 31);
//! assert_eq!(codec.sample_rate(), 8000);
//! assert_eq!(codec.samples_per_frame(), 160);
//! ```

mod codec;
mod control;
mod frame;
mod properties;

pub use codec::{CodecVariant, SpeechCodec};
pub use control::ControlEvent;
pub use frame::Frame;
pub use properties::{StreamDuration, StreamProperties};
