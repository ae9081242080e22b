//! Destination handling for generated output.
//!
//! Generation completes in memory before anything touches disk, so a fatal
//! error never leaves a partial output file behind.

use std::io;
use std::path::{Path, PathBuf};

/// The default destination for a given input path:
/// `<input-without-extension>_validate.<ext>`.
pub fn destination_for(src: &Path) -> PathBuf {
    let stem = src
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let file_name = match src.extension() {
        Some(ext) => format!("{}_validate.{}", stem, ext.to_string_lossy()),
        None => format!("{}_validate", stem),
    };

    src.with_file_name(file_name)
}

/// Writes generated source to the destination path in one shot.
pub fn write(text: &str, dest: &Path) -> io::Result<()> {
    std::fs::write(dest, text)
}
