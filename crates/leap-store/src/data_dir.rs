use std::path::{Path, PathBuf};
use std::{env, fs};

use leap_core::{InkSession, OccupancyRasterizer};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::settings::Settings;
use crate::snapshot::{read_snapshot, save_session};

const SETTINGS_FILE: &str = "config.toml";
const CANVAS_FILE: &str = "canvas.json";
const CANVAS_META_FILE: &str = "canvas.toml";

/// Working-canvas state the snapshot document has no field for.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct CanvasMeta {
    max_virtual_time: f64,
}

/// Default base directory: `$LEAP_DATA_DIR`, else `~/.leap`.
pub fn default_base_dir() -> PathBuf {
    env::var("LEAP_DATA_DIR")
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| dirs_home().join(".leap"))
}

fn dirs_home() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// The on-disk home of one canvas.
///
/// Layout:
/// ```text
/// ~/.leap/
/// ├── config.toml   settings (engine tunables, last folder)
/// ├── canvas.json   working snapshot
/// └── canvas.toml   frontier of the working snapshot
/// ```
#[derive(Debug)]
pub struct DataDir {
    base: PathBuf,
    settings: Settings,
}

impl DataDir {
    /// Open the data directory, creating it and default settings as needed.
    /// `base_dir` overrides [`default_base_dir`].
    pub fn open(base_dir: Option<&Path>) -> Result<Self> {
        let base = base_dir.map(PathBuf::from).unwrap_or_else(default_base_dir);
        fs::create_dir_all(&base)?;
        let settings = Settings::load_or_create(&base.join(SETTINGS_FILE))?;
        Ok(Self { base, settings })
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_path(&self) -> PathBuf {
        self.base.join(SETTINGS_FILE)
    }

    pub fn canvas_path(&self) -> PathBuf {
        self.base.join(CANVAS_FILE)
    }

    pub fn canvas_meta_path(&self) -> PathBuf {
        self.base.join(CANVAS_META_FILE)
    }

    /// A session configured from settings, holding the working canvas if
    /// one has been saved.
    ///
    /// The frontier comes from the saved sidecar when there is one, so a
    /// forward scrub does not become "now" on reload. It is never below the
    /// newest stroke.
    pub fn load_session(&self) -> Result<InkSession> {
        let mut session = InkSession::new(self.settings.engine.clone());
        let canvas = self.canvas_path();
        if canvas.exists() {
            let mut snapshot = read_snapshot(&canvas)?;
            if let Some(meta) = self.read_canvas_meta() {
                let newest = snapshot
                    .strokes
                    .iter()
                    .map(|s| s.creation_time())
                    .fold(0.0, f64::max);
                snapshot.max_virtual_time = meta.max_virtual_time.max(newest);
            }
            session.restore(snapshot);
        }
        Ok(session)
    }

    pub fn save_session<R: OccupancyRasterizer>(&self, session: &InkSession<R>) -> Result<()> {
        save_session(session, &self.canvas_path())?;
        let meta = CanvasMeta {
            max_virtual_time: session.max_virtual_time(),
        };
        let content =
            toml::to_string_pretty(&meta).map_err(|e| StoreError::Config(e.to_string()))?;
        fs::write(self.canvas_meta_path(), content)?;
        Ok(())
    }

    /// A missing or unreadable sidecar falls back to the snapshot's own
    /// frontier.
    fn read_canvas_meta(&self) -> Option<CanvasMeta> {
        let path = self.canvas_meta_path();
        let content = fs::read_to_string(&path).ok()?;
        match toml::from_str::<CanvasMeta>(&content) {
            Ok(meta) if meta.max_virtual_time.is_finite() && meta.max_virtual_time >= 0.0 => {
                Some(meta)
            }
            Ok(meta) => {
                tracing::warn!(
                    "ignoring frontier {} in {}",
                    meta.max_virtual_time,
                    path.display()
                );
                None
            }
            Err(e) => {
                tracing::warn!("ignoring unreadable {}: {e}", path.display());
                None
            }
        }
    }

    /// Edit settings in place, then sanitize and persist them. Sessions
    /// loaded afterwards use the new values.
    pub fn update_settings(&mut self, edit: impl FnOnce(&mut Settings)) -> Result<&Settings> {
        edit(&mut self.settings);
        self.settings.engine = self.settings.engine.clone().sanitized();
        self.settings.save(&self.settings_path())?;
        Ok(&self.settings)
    }

    /// Record the folder of an imported or exported file and persist it.
    pub fn remember_folder(&mut self, file: &Path) -> Result<()> {
        if self.settings.remember_folder(file) {
            self.settings.save(&self.settings_path())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_creates_layout() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("leap");
        let data = DataDir::open(Some(&base)).unwrap();
        assert!(data.settings_path().exists());
        assert!(!data.canvas_path().exists());
        assert_eq!(data.base(), base.as_path());
    }

    #[test]
    fn test_fresh_session_is_empty() {
        let dir = TempDir::new().unwrap();
        let data = DataDir::open(Some(dir.path())).unwrap();
        let session = data.load_session().unwrap();
        assert!(session.store().is_empty());
        assert_eq!(session.virtual_time(), 0.0);
    }

    #[test]
    fn test_session_persists_between_opens() {
        let dir = TempDir::new().unwrap();
        {
            let data = DataDir::open(Some(dir.path())).unwrap();
            let mut session = data.load_session().unwrap();
            session.pointer_down(0.0, 0.0);
            session.pointer_move(50.0, 50.0);
            session.tick();
            session.pointer_up().unwrap();
            data.save_session(&session).unwrap();
        }
        let data = DataDir::open(Some(dir.path())).unwrap();
        assert_eq!(data.load_session().unwrap().store().len(), 1);
    }

    fn drawn(data: &DataDir) -> InkSession {
        let mut session = data.load_session().unwrap();
        session.pointer_down(0.0, 0.0);
        session.pointer_move(50.0, 50.0);
        session.tick();
        session.pointer_up().unwrap();
        session
    }

    #[test]
    fn test_forward_scrub_keeps_frontier() {
        let dir = TempDir::new().unwrap();
        let data = DataDir::open(Some(dir.path())).unwrap();
        let mut session = drawn(&data);
        let frontier = session.max_virtual_time();
        session.seek(120.0);
        data.save_session(&session).unwrap();
        assert!(data.canvas_meta_path().exists());

        let mut reloaded = data.load_session().unwrap();
        assert_eq!(reloaded.virtual_time(), 120.0);
        assert_eq!(reloaded.max_virtual_time(), frontier);
        assert!(reloaded.jump_to_now());
        assert_eq!(reloaded.virtual_time(), frontier);
    }

    #[test]
    fn test_frontier_never_below_newest_stroke() {
        let dir = TempDir::new().unwrap();
        let data = DataDir::open(Some(dir.path())).unwrap();
        let session = drawn(&data);
        let newest = session.store().strokes()[0].creation_time();
        data.save_session(&session).unwrap();
        fs::write(data.canvas_meta_path(), "max_virtual_time = 0.0\n").unwrap();

        assert_eq!(data.load_session().unwrap().max_virtual_time(), newest);
    }

    #[test]
    fn test_missing_or_bad_meta_uses_snapshot_rule() {
        let dir = TempDir::new().unwrap();
        let data = DataDir::open(Some(dir.path())).unwrap();
        let mut session = drawn(&data);
        session.seek(50.0);
        data.save_session(&session).unwrap();

        fs::write(data.canvas_meta_path(), "not = = toml").unwrap();
        assert_eq!(data.load_session().unwrap().max_virtual_time(), 50.0);

        fs::remove_file(data.canvas_meta_path()).unwrap();
        assert_eq!(data.load_session().unwrap().max_virtual_time(), 50.0);
    }

    #[test]
    fn test_settings_shape_session() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(SETTINGS_FILE),
            "[engine.pen]\nwidth = 2.5\ncolor = [255.0, 0.0, 0.0]\n",
        )
        .unwrap();
        let data = DataDir::open(Some(dir.path())).unwrap();
        let session = data.load_session().unwrap();
        assert_eq!(session.config().pen.width, 2.5);
        assert_eq!(session.store().pen().color, [255.0, 0.0, 0.0]);
    }

    #[test]
    fn test_update_settings_sanitizes_and_persists() {
        let dir = TempDir::new().unwrap();
        let mut data = DataDir::open(Some(dir.path())).unwrap();
        let s = data
            .update_settings(|s| s.engine.controller.target_density = 1.5)
            .unwrap();
        assert_eq!(s.engine.controller.target_density, 1.0);

        let reopened = DataDir::open(Some(dir.path())).unwrap();
        let session = reopened.load_session().unwrap();
        assert_eq!(session.controller().config().target_density, 1.0);
    }

    #[test]
    fn test_remember_folder_persists() {
        let dir = TempDir::new().unwrap();
        let mut data = DataDir::open(Some(dir.path())).unwrap();
        data.remember_folder(&dir.path().join("out").join("x.json"))
            .unwrap();

        let reopened = DataDir::open(Some(dir.path())).unwrap();
        assert_eq!(
            reopened.settings().last_folder.as_deref(),
            Some(dir.path().join("out").as_path())
        );
    }
}
