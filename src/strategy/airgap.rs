//! Locating the scanner jar inside an air-gap installation directory.

use crate::error::{Error, Result};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

pub const JAR_PREFIX: &str = "detect-";
/// Pre-rename distributions used this prefix; accepted only when no jar
/// matches the current one.
pub const FALLBACK_JAR_PREFIX: &str = "synopsys-detect-";
pub const JAR_SUFFIX: &str = ".jar";

/// Finds exactly one scanner jar directly under `base_dir`.
///
/// The fallback prefix is consulted only when the primary prefix matches
/// nothing; multiple primary matches are always ambiguous.
pub fn locate_jar(base_dir: &Path) -> Result<PathBuf> {
    let primary = matching_jars(base_dir, JAR_PREFIX);
    match primary.len() {
        1 => single(primary),
        0 => {
            debug!(
                "No {JAR_PREFIX}*{JAR_SUFFIX} under {}, trying {FALLBACK_JAR_PREFIX} prefix",
                base_dir.display()
            );
            let fallback = matching_jars(base_dir, FALLBACK_JAR_PREFIX);
            match fallback.len() {
                1 => single(fallback),
                0 => Err(none_found(base_dir)),
                _ => Err(multiple_found(base_dir)),
            }
        }
        _ => Err(multiple_found(base_dir)),
    }
}

fn matching_jars(base_dir: &Path, prefix: &str) -> Vec<PathBuf> {
    let entries = match fs::read_dir(base_dir) {
        Ok(entries) => entries,
        // Unreadable or missing directory reports the same way as empty.
        Err(_) => return Vec::new(),
    };

    let mut jars: Vec<PathBuf> = entries
        .flatten()
        .filter(|entry| {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            name.starts_with(prefix)
                && name.ends_with(JAR_SUFFIX)
                && entry.file_type().map(|t| t.is_file()).unwrap_or(false)
        })
        .map(|entry| entry.path())
        .collect();
    jars.sort();
    jars
}

fn single(mut jars: Vec<PathBuf>) -> Result<PathBuf> {
    Ok(jars.remove(0))
}

fn none_found(base_dir: &Path) -> Error {
    Error::Configuration(format!(
        "Expected 1 jar from the air gap installation at <{}> and did not find any. \
         Check the air gap tool configuration.",
        base_dir.display()
    ))
}

fn multiple_found(base_dir: &Path) -> Error {
    Error::Configuration(format!(
        "Expected 1 jar from the air gap installation at <{}> and instead found multiple jars. \
         Check the air gap tool configuration.",
        base_dir.display()
    ))
}
