//! Command entry points used by the binary

pub mod init;
pub mod watch;
