pub mod frame;
pub mod io;
pub mod synthetic;

pub use frame::Frame;
pub use io::{FrameSink, FrameSource, MediaBackend, SourceGeometry};
pub use synthetic::{MemoryFrameSink, SyntheticBackend, SyntheticFrameSource};
