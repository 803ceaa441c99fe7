use anyhow::{Context, Result, anyhow};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const THEME_KEY: &str = "theme";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    fn from_system(prefers_dark: bool) -> Self {
        if prefers_dark { Theme::Dark } else { Theme::Light }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(anyhow!("unknown theme {:?}", other)),
        }
    }
}

/// Local key-value settings backed by a small JSON file.
///
/// A missing file is an empty store, it is created on the first write.
pub struct SettingsStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
    theme: Theme,
}

impl SettingsStore {
    /// Open the store at `path` and resolve the active theme.
    ///
    /// A saved `light`/`dark` wins, then the system preference, then light.
    pub fn open(path: impl Into<PathBuf>, system_prefers_dark: Option<bool>) -> Result<Self> {
        let path = path.into();
        let values = load_values(&path)?;

        let theme = match values.get(THEME_KEY).map(|v| v.parse::<Theme>()) {
            Some(Ok(theme)) => theme,
            Some(Err(e)) => {
                warn!("ignoring saved theme in {}: {}", path.display(), e);
                Theme::from_system(system_prefers_dark.unwrap_or(false))
            }
            None => Theme::from_system(system_prefers_dark.unwrap_or(false)),
        };

        Ok(Self { path, values, theme })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn is_dark(&self) -> bool {
        self.theme == Theme::Dark
    }

    /// The explicitly saved theme, if there is a valid one.
    pub fn saved_theme(&self) -> Option<Theme> {
        self.values.get(THEME_KEY).and_then(|v| v.parse().ok())
    }

    /// Make `theme` active and persist it.
    pub fn set_theme(&mut self, theme: Theme) -> Result<()> {
        self.theme = theme;
        self.set(THEME_KEY, theme.as_str())
    }

    /// Follow a system preference change unless a theme was saved explicitly.
    pub fn system_preference_changed(&mut self, prefers_dark: bool) -> bool {
        if self.saved_theme().is_some() {
            return false;
        }
        let theme = Theme::from_system(prefers_dark);
        let changed = theme != self.theme;
        self.theme = theme;
        changed
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        self.save()
    }

    fn save(&self) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        let json = serde_json::to_string_pretty(&self.values)
            .map_err(|e| anyhow!("Failed to serialize settings to JSON: {}", e))?;
        fs::write(&self.path, json)
            .with_context(|| format!("failed to write settings to {}", self.path.display()))?;
        debug!("saved settings to {}", self.path.display());
        Ok(())
    }
}

fn load_values(path: &Path) -> Result<BTreeMap<String, String>> {
    match fs::read_to_string(path) {
        Ok(raw) => serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse settings in {}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
    }
}
