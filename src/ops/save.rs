use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::types::error::{BoothError, BoothResult};
use crate::types::frame::Strip;

/// Download-style filename derived from the current time.
pub fn timestamped_filename() -> String {
    format!("retrosnaps-{}.png", Utc::now().timestamp_millis())
}

/// Write the strip next to its final location and persist atomically, so a
/// crash mid-write never leaves a truncated PNG behind.
pub fn write_strip(strip: &Strip, path: &Path) -> BoothResult<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(&strip.png)?;
    tmp.persist(path).map_err(|e| BoothError::Save(e.error))?;
    Ok(())
}

/// Primary delivery flow: a native save dialog pre-filled with the
/// timestamped name. `Ok(None)` means the user cancelled.
pub fn save_with_dialog(strip: &Strip) -> BoothResult<Option<PathBuf>> {
    let Some(path) = rfd::FileDialog::new()
        .set_file_name(timestamped_filename())
        .add_filter("PNG image", &["png"])
        .save_file()
    else {
        return Ok(None);
    };
    write_strip(strip, &path)?;
    tracing::info!(path = %path.display(), "strip saved");
    Ok(Some(path))
}

/// Fallback flow for platforms where the dialog is unavailable: write the
/// timestamped file straight into `dir`.
pub fn save_to_dir(strip: &Strip, dir: &Path) -> BoothResult<PathBuf> {
    let path = dir.join(timestamped_filename());
    write_strip(strip, &path)?;
    tracing::info!(path = %path.display(), "strip saved (fallback)");
    Ok(path)
}
