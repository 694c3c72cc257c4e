//! Stream plumbing: opening the response, driving it, and network errors.

pub mod client;
pub mod driver;
pub mod error;

pub use client::{ByteStream, StreamClient, USER_AGENT};
pub use driver::{StreamOutcome, StreamReport, drive};
pub use error::{StreamError, StreamErrorKind, StreamResult};
