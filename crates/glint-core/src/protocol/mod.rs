//! Wire protocol: frame splitting and event decoding.

pub mod decode;
pub mod frame;

pub use decode::{PartKind, StreamEvent, decode_frame, decode_payload};
pub use frame::{Frame, FrameSplitter, Frames};
