use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone};
use std::fs;
use std::path::{Path, PathBuf};

/// `newsletter_<YYYY-MM-DD_HH-MM-SS>.html` for the given instant.
pub fn digest_filename<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!("newsletter_{}.html", at.format("%Y-%m-%d_%H-%M-%S"))
}

/// Write the rendered digest under `output_dir`, creating the directory if needed.
pub fn save_digest<Tz>(html: &str, output_dir: &Path, at: &DateTime<Tz>) -> Result<PathBuf>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    fs::create_dir_all(output_dir).with_context(|| {
        format!("Failed to create output directory {}", output_dir.display())
    })?;

    let filepath = output_dir.join(digest_filename(at));
    fs::write(&filepath, html)
        .with_context(|| format!("Failed to write digest file {}", filepath.display()))?;

    Ok(filepath)
}

/// Hand the file to the platform's default browser.
pub fn open_in_viewer(path: &Path) -> Result<()> {
    let path = path
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", path.display()))?;

    webbrowser::open(&path.to_string_lossy())
        .with_context(|| format!("Failed to open {} in a browser", path.display()))?;

    Ok(())
}
