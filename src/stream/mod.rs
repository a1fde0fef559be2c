//! Stream combinators for frame delivery

mod pace;

pub use pace::{MAX_SPEED, MIN_SPEED, PaceExt, Paced, clamp_speed};
