//! Low-level reader adaptors used by the detection and decode pipeline.

pub mod bounded;
pub mod peek;

pub use bounded::BoundedBufRead;
pub use peek::PeekReader;
