//! Target operating-system family of the node that will run the scanner.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The two families the launcher distinguishes. Everything POSIX-like
/// (Linux, macOS, BSDs) behaves identically for our purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    #[default]
    Posix,
    Windows,
}

impl OsFamily {
    /// Family of the machine this process is running on.
    pub fn current() -> Self {
        if cfg!(windows) {
            OsFamily::Windows
        } else {
            OsFamily::Posix
        }
    }

    /// Name of the Java launcher binary on this family.
    pub fn java_executable(&self) -> &'static str {
        match self {
            OsFamily::Posix => "java",
            OsFamily::Windows => "java.exe",
        }
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OsFamily::Posix => write!(f, "posix"),
            OsFamily::Windows => write!(f, "windows"),
        }
    }
}
