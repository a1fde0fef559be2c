//! Byte source implementations

pub mod file;
pub mod memory;
pub mod pipe;

pub use file::FileSource;
pub use memory::MemorySource;
pub use pipe::{PipeSource, pipe_path};
