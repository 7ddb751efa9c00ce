use failure::Error;

use serde_derive::{Deserialize, Serialize};

use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use crate::time::Seconds;

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Editor {
  pub default_note_duration: Seconds,
  pub min_note_duration: Seconds,
}

impl Default for Editor {
  fn default() -> Editor {
    Editor {
      default_note_duration: 0.5,
      min_note_duration: 0.5,
    }
  }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Generator {
  pub command: String,
  pub config_folder: PathBuf,
}

impl Default for Generator {
  fn default() -> Generator {
    Generator {
      command: "notechart".to_string(),
      config_folder: PathBuf::from("configs"),
    }
  }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Transcoder {
  pub command: String,
  pub quality: u8,
}

impl Default for Transcoder {
  fn default() -> Transcoder {
    Transcoder {
      command: "ffmpeg".to_string(),
      quality: 6,
    }
  }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Watch {
  pub debounce_ms: u64,
}

impl Default for Watch {
  fn default() -> Watch {
    Watch { debounce_ms: 200 }
  }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
  pub editor: Editor,
  pub generator: Generator,
  pub transcoder: Transcoder,
  pub watch: Watch,
}

impl Config {
  pub fn from_file<'a, T>(path: T) -> Result<Config, Error>
  where
    T: Into<&'a str>,
  {
    let mut content = String::new();
    let path_str = path.into();
    let mut file = File::open(path_str)?;
    file.read_to_string(&mut content)?;
    let config: Config = toml::from_str(&content)?;
    Ok(config)
  }

  pub fn from_str<'a, T>(content: T) -> Result<Config, Error>
  where
    T: Into<&'a str>,
  {
    let config: Config = toml::from_str(content.into())?;
    Ok(config)
  }
}
