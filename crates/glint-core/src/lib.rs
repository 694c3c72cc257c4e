//! Core glint library: wire protocol, transcript reducer, stream driver and config.

pub mod config;
pub mod interrupt;
pub mod protocol;
pub mod stream;
pub mod transcript;
