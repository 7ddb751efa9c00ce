//! Generator profiles, one JSON file per profile in the config folder.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde_derive::{Deserialize, Serialize};

use crate::generator::GeneratorError;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GeneratorSettings {
  pub profile: String,

  pub window_size: u32,
  pub hop_size: u32,
  pub min_freq: f64,
  pub max_freq: f64,

  pub smooth_frames: u32,
  pub stability_frames: u32,
  pub hold_tolerance: f64,

  pub min_note_duration: f64,
  pub merge_gap: f64,
  pub note_merge_tolerance: f64,

  pub phrase_gap: f64,
  pub phrase_pitch_tolerance: f64,
  pub stretch_factor: f64,

  pub final_merge_gap: f64,

  pub lane_range: u32,
}

impl Default for GeneratorSettings {
  fn default() -> GeneratorSettings {
    GeneratorSettings {
      profile: String::new(),

      window_size: 2048,
      hop_size: 512,
      min_freq: 70.0,
      max_freq: 1100.0,

      smooth_frames: 5,
      stability_frames: 6,
      hold_tolerance: 0.75,

      min_note_duration: 0.12,
      merge_gap: 0.05,
      note_merge_tolerance: 0.5,

      phrase_gap: 0.45,
      phrase_pitch_tolerance: 1.75,
      stretch_factor: 1.25,

      final_merge_gap: 0.15,

      lane_range: 4,
    }
  }
}

impl GeneratorSettings {
  /// Command line flags understood by the generator.
  pub fn arguments(&self) -> Vec<String> {
    let flags: [(&str, String); 15] = [
      ("--window-size", self.window_size.to_string()),
      ("--hop-size", self.hop_size.to_string()),
      ("--min-freq", self.min_freq.to_string()),
      ("--max-freq", self.max_freq.to_string()),
      ("--smooth-frames", self.smooth_frames.to_string()),
      ("--stability-frames", self.stability_frames.to_string()),
      ("--hold-tolerance", self.hold_tolerance.to_string()),
      ("--min-note-duration", self.min_note_duration.to_string()),
      ("--merge-gap", self.merge_gap.to_string()),
      ("--note-pitch-tolerance", self.note_merge_tolerance.to_string()),
      ("--phrase-gap", self.phrase_gap.to_string()),
      ("--phrase-pitch-tolerance", self.phrase_pitch_tolerance.to_string()),
      ("--stretch-factor", self.stretch_factor.to_string()),
      ("--final-merge-gap", self.final_merge_gap.to_string()),
      ("--lane-range", self.lane_range.to_string()),
    ];

    flags
      .iter()
      .flat_map(|(flag, value)| vec![flag.to_string(), value.clone()])
      .collect()
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
  path: PathBuf,
  settings: GeneratorSettings,
}

impl Profile {
  pub fn new<P>(path: P, settings: GeneratorSettings) -> Profile
  where
    P: Into<PathBuf>,
  {
    Profile {
      path: path.into(),
      settings,
    }
  }

  pub fn load<P>(path: P) -> Result<Profile, GeneratorError>
  where
    P: AsRef<Path>,
  {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|cause| GeneratorError::ProfileIo {
      path: path.display().to_string(),
      cause,
    })?;
    let settings = serde_json::from_str(&content).map_err(|cause| GeneratorError::ProfileParse {
      path: path.display().to_string(),
      cause,
    })?;
    Ok(Profile::new(path, settings))
  }

  /// The profile name, or the file name when the profile has none.
  pub fn name(&self) -> &str {
    if self.settings.profile.is_empty() {
      self
        .path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or_default()
    } else {
      self.settings.profile.as_str()
    }
  }

  pub fn path(&self) -> &Path {
    self.path.as_path()
  }

  pub fn settings(&self) -> &GeneratorSettings {
    &self.settings
  }

  pub fn settings_mut(&mut self) -> &mut GeneratorSettings {
    &mut self.settings
  }

  pub fn save(&self) -> Result<(), GeneratorError> {
    write_settings(&self.path, &self.settings)
  }

  /// Writes a copy of the profile to another file.
  pub fn save_as<P>(&self, path: P) -> Result<Profile, GeneratorError>
  where
    P: Into<PathBuf>,
  {
    let profile = Profile::new(path, self.settings.clone());
    profile.save()?;
    Ok(profile)
  }

  pub fn delete(self) -> Result<(), GeneratorError> {
    fs::remove_file(&self.path).map_err(|cause| GeneratorError::ProfileIo {
      path: self.path.display().to_string(),
      cause,
    })
  }
}

fn write_settings(path: &Path, settings: &GeneratorSettings) -> Result<(), GeneratorError> {
  let content = serde_json::to_string_pretty(settings).map_err(|cause| GeneratorError::ProfileParse {
    path: path.display().to_string(),
    cause,
  })?;
  fs::write(path, content).map_err(|cause| GeneratorError::ProfileIo {
    path: path.display().to_string(),
    cause,
  })
}

/// Profiles found in a folder, along with the files that could not be read.
#[derive(Debug, Default)]
pub struct ProfileSet {
  pub profiles: Vec<Profile>,
  pub errors: Vec<GeneratorError>,
}

impl ProfileSet {
  /// The last used profile if it is still there, the first one otherwise.
  pub fn select(&self, last_profile: Option<&str>) -> Option<&Profile> {
    last_profile
      .and_then(|name| self.profiles.iter().find(|profile| profile.name() == name))
      .or_else(|| self.profiles.first())
  }

  pub fn find(&self, name: &str) -> Option<&Profile> {
    self.profiles.iter().find(|profile| profile.name() == name)
  }
}

pub fn load_profiles<P>(folder: P) -> ProfileSet
where
  P: AsRef<Path>,
{
  let folder = folder.as_ref();
  let mut set = ProfileSet::default();

  let entries = match fs::read_dir(folder) {
    Ok(entries) => entries,
    Err(cause) => {
      warn!("Cannot read the profiles at {}: {}", folder.display(), cause);
      set.errors.push(GeneratorError::ProfileIo {
        path: folder.display().to_string(),
        cause,
      });
      return set;
    }
  };

  let mut paths: Vec<PathBuf> = entries
    .filter_map(|entry| entry.ok().map(|entry| entry.path()))
    .filter(|path| path.is_file() && is_json(path))
    .collect();
  paths.sort();

  for path in paths {
    match Profile::load(&path) {
      Ok(profile) => {
        debug!("Loaded profile {} from {}", profile.name(), path.display());
        set.profiles.push(profile);
      }
      Err(err) => {
        warn!("{}", err);
        set.errors.push(err);
      }
    }
  }

  set
}

fn is_json(path: &Path) -> bool {
  path
    .extension()
    .and_then(|ext| ext.to_str())
    .map_or(false, |ext| ext.eq_ignore_ascii_case("json"))
}
