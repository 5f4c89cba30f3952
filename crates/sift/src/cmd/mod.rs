//! Command implementations for the sift CLI

pub mod capture;
pub mod export;
pub mod replay;
pub mod session;
#[cfg(unix)]
pub mod tail;
