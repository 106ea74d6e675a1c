//! User settings that decide which pipeline branches run.
//!
//! Settings are stored as camelCase JSON. Older installs kept
//! `selectiveCopy` and `downloadImagesLocally` under an `experimental`
//! object; those are still read, but a top-level value always wins.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{EzyCopyError, Result};

const SETTINGS_DIR: &str = "ezycopy";
const SETTINGS_FILE: &str = "settings.json";

/// Output and extraction toggles.
///
/// ```rust
/// use ezycopy_core::Settings;
///
/// let settings: Settings = serde_json::from_str(r#"{"includeImages": false}"#).unwrap();
/// assert!(settings.copy_to_clipboard);
/// assert!(!settings.include_images);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredSettings")]
pub struct Settings {
    pub copy_to_clipboard: bool,
    pub download_markdown: bool,
    pub include_images: bool,
    /// Extract only the user's selection when there is one.
    pub selective_copy: bool,
    /// Download images next to the saved Markdown and rewrite their links.
    pub download_images_locally: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            copy_to_clipboard: true,
            download_markdown: false,
            include_images: true,
            selective_copy: false,
            download_images_locally: false,
        }
    }
}

/// On-disk shape, every field optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StoredSettings {
    copy_to_clipboard: Option<bool>,
    download_markdown: Option<bool>,
    include_images: Option<bool>,
    selective_copy: Option<bool>,
    download_images_locally: Option<bool>,
    experimental: Option<LegacyExperimental>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct LegacyExperimental {
    selective_copy: Option<bool>,
    download_images_locally: Option<bool>,
}

impl From<StoredSettings> for Settings {
    fn from(stored: StoredSettings) -> Self {
        let defaults = Settings::default();
        let legacy = stored.experimental.unwrap_or_default();

        Self {
            copy_to_clipboard: stored.copy_to_clipboard.unwrap_or(defaults.copy_to_clipboard),
            download_markdown: stored.download_markdown.unwrap_or(defaults.download_markdown),
            include_images: stored.include_images.unwrap_or(defaults.include_images),
            selective_copy: stored.selective_copy.or(legacy.selective_copy).unwrap_or(defaults.selective_copy),
            download_images_locally: stored
                .download_images_locally
                .or(legacy.download_images_locally)
                .unwrap_or(defaults.download_images_locally),
        }
    }
}

impl Settings {
    /// Re-enables the clipboard when both outputs are off.
    pub fn normalized(mut self) -> Self {
        if !self.copy_to_clipboard && !self.download_markdown {
            self.copy_to_clipboard = true;
        }
        self
    }

    /// `<config dir>/ezycopy/settings.json`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(SETTINGS_DIR).join(SETTINGS_FILE))
    }

    /// Reads settings from `path`; a missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns [`EzyCopyError::Settings`] when the file exists but cannot be
    /// read or is not valid JSON.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(raw) => {
                let settings: Settings = serde_json::from_str(&raw)?;
                debug!(path = %path.display(), ?settings, "loaded settings");
                Ok(settings.normalized())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(EzyCopyError::Settings(format!("{}: {err}", path.display()))),
        }
    }

    /// Loads from [`Settings::default_path`], or defaults when there is none.
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    /// Writes settings as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let persist = |source| EzyCopyError::Persistence { path: path.to_path_buf(), source };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(persist)?;
        }
        fs::write(path, json).map_err(persist)
    }
}
