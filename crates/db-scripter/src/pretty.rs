//! Flatten a saved script bundle into a single SQL text file.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::info;

use crate::bundle::ScriptBundle;
use crate::error::Result;

/// Suffix appended to the bundle path to name the flat script.
pub const PRETTY_SUFFIX: &str = ".pretty";

/// `<json_path>.pretty`
pub fn pretty_path(json_path: &Path) -> PathBuf {
    let mut name = OsString::from(json_path.as_os_str());
    name.push(PRETTY_SUFFIX);
    PathBuf::from(name)
}

/// Load the bundle at `json_path` and write every entry, in category order
/// and without separators, to `<json_path>.pretty`. An existing file is
/// overwritten.
pub async fn write_pretty(json_path: &Path) -> Result<PathBuf> {
    let bundle = ScriptBundle::load(json_path).await?;
    let out_path = pretty_path(json_path);

    let file = tokio::fs::File::create(&out_path).await?;
    let mut writer = BufWriter::new(file);
    for entry in bundle.entries() {
        writer.write_all(entry.as_bytes()).await?;
    }
    writer.flush().await?;

    info!(
        "Wrote {} script entries to {:?}",
        bundle.len(),
        out_path
    );
    Ok(out_path)
}
