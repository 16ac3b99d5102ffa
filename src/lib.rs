//! scanlaunch prepares and launches the Detect scanner from a controller
//! machine onto a build node, which may be the same machine or a remote one
//! reached over SSH.
//!
//! The core of the crate is execution-strategy resolution: deciding whether
//! the scanner runs from a user-provided jar, an air-gapped jar, or the
//! downloaded bootstrap script, resolving the Java runtime to use, and
//! assembling the exact command line with OS-correct escaping of
//! user-supplied options.

pub mod args;
pub mod cancel;
pub mod cli;
pub mod config;
pub mod download;
pub mod environment;
pub mod error;
pub mod escape;
pub mod os;
pub mod remote;
pub mod runner;
pub mod strategy;
