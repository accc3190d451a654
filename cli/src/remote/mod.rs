//! Remote execution over SSH
//!
//! Remote work is expressed as [`RemoteCommand`] values (program plus
//! argument list, quoted at the boundary) executed through an
//! [`SshSession`]. No stage builds raw remote shell scripts.

pub mod command;
pub mod session;

pub use command::{PlannedStep, RemoteCommand};
pub use session::SshSession;
