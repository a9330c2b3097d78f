//! Database bootstrap and shared settings access

pub mod init;

pub use init::*;
