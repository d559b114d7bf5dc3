use std::fs;
use std::path::{Path, PathBuf};

use leap_core::{InkSession, OccupancyRasterizer, Snapshot, WireSnapshot, import_json};

use crate::error::Result;

/// Read and validate a snapshot file.
pub fn read_snapshot(path: &Path) -> Result<Snapshot> {
    let json = fs::read_to_string(path)?;
    let snapshot = import_json(&json)?;
    tracing::info!(
        "read snapshot {} ({} strokes)",
        path.display(),
        snapshot.strokes.len()
    );
    Ok(snapshot)
}

/// Write a snapshot, replacing any existing file in one rename so readers
/// never observe a half-written document.
pub fn write_snapshot(path: &Path, snapshot: &WireSnapshot) -> Result<()> {
    let json = serde_json::to_string_pretty(snapshot)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp = temp_path(path);
    fs::write(&tmp, json)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    tracing::info!(
        "wrote snapshot {} ({} strokes)",
        path.display(),
        snapshot.strokes.len()
    );
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "snapshot".into());
    name.push(".tmp");
    path.with_file_name(name)
}

/// Replace a session's state with a snapshot file. On error the session is
/// left as it was.
pub fn load_session<R: OccupancyRasterizer>(
    session: &mut InkSession<R>,
    path: &Path,
) -> Result<()> {
    let snapshot = read_snapshot(path)?;
    session.restore(snapshot);
    Ok(())
}

pub fn save_session<R: OccupancyRasterizer>(session: &InkSession<R>, path: &Path) -> Result<()> {
    write_snapshot(path, &session.snapshot())
}
