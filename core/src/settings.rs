//! User settings that outlive a session, like the last generator profile.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use failure::Fail;
use log::debug;
use serde_derive::{Deserialize, Serialize};

#[derive(Debug, Fail)]
pub enum SettingsError {
  #[fail(display = "Failed to access the settings at {}: {}", path, cause)]
  Io {
    path: String,
    #[cause]
    cause: io::Error,
  },

  #[fail(display = "Malformed settings: {}", cause)]
  Parse {
    #[cause]
    cause: toml::de::Error,
  },

  #[fail(display = "Failed to serialize the settings: {}", cause)]
  Serialize {
    #[cause]
    cause: toml::ser::Error,
  },
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Settings {
  pub config_folder: Option<PathBuf>,
  pub last_profile: Option<String>,
}

pub trait SettingsStore {
  fn load(&self) -> Result<Settings, SettingsError>;

  fn save(&mut self, settings: &Settings) -> Result<(), SettingsError>;
}

/// Settings kept in a TOML file, a missing file reads as the defaults.
pub struct TomlSettingsStore {
  path: PathBuf,
}

impl TomlSettingsStore {
  pub fn new<P>(path: P) -> TomlSettingsStore
  where
    P: Into<PathBuf>,
  {
    TomlSettingsStore { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    self.path.as_path()
  }

  fn io_error(&self, cause: io::Error) -> SettingsError {
    SettingsError::Io {
      path: self.path.display().to_string(),
      cause,
    }
  }
}

impl SettingsStore for TomlSettingsStore {
  fn load(&self) -> Result<Settings, SettingsError> {
    match fs::read_to_string(&self.path) {
      Ok(content) => toml::from_str(&content).map_err(|cause| SettingsError::Parse { cause }),
      Err(ref err) if err.kind() == io::ErrorKind::NotFound => {
        debug!("No settings at {}, using defaults", self.path.display());
        Ok(Settings::default())
      }
      Err(cause) => Err(self.io_error(cause)),
    }
  }

  fn save(&mut self, settings: &Settings) -> Result<(), SettingsError> {
    let content = toml::to_string(settings).map_err(|cause| SettingsError::Serialize { cause })?;
    if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
      fs::create_dir_all(parent).map_err(|cause| self.io_error(cause))?;
    }
    fs::write(&self.path, content).map_err(|cause| self.io_error(cause))
  }
}

#[derive(Debug, Clone, Default)]
pub struct MemorySettingsStore {
  settings: Settings,
}

impl MemorySettingsStore {
  pub fn new(settings: Settings) -> MemorySettingsStore {
    MemorySettingsStore { settings }
  }
}

impl SettingsStore for MemorySettingsStore {
  fn load(&self) -> Result<Settings, SettingsError> {
    Ok(self.settings.clone())
  }

  fn save(&mut self, settings: &Settings) -> Result<(), SettingsError> {
    self.settings = settings.clone();
    Ok(())
  }
}

#[cfg(test)]
mod test {

  use std::fs;
  use std::path::PathBuf;

  use super::{MemorySettingsStore, Settings, SettingsStore, TomlSettingsStore};

  #[test]
  pub fn toml_store_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = TomlSettingsStore::new(dir.path().join("settings.toml"));
    assert_eq!(store.load().unwrap(), Settings::default());
  }

  #[test]
  pub fn toml_store_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = TomlSettingsStore::new(dir.path().join("user").join("settings.toml"));
    let settings = Settings {
      config_folder: Some(PathBuf::from("/charts/configs")),
      last_profile: Some("female vocals".to_string()),
    };
    store.save(&settings).unwrap();
    assert_eq!(store.load().unwrap(), settings);

    store.save(&Settings::default()).unwrap();
    assert_eq!(store.load().unwrap(), Settings::default());
  }

  #[test]
  pub fn toml_store_malformed_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.toml");
    fs::write(&path, "last_profile = [").unwrap();
    assert!(TomlSettingsStore::new(path).load().is_err());
  }

  #[test]
  pub fn memory_store() {
    let mut store = MemorySettingsStore::default();
    let settings = Settings {
      config_folder: None,
      last_profile: Some("default".to_string()),
    };
    store.save(&settings).unwrap();
    assert_eq!(store.load().unwrap(), settings);
  }
}
