//! Charts generated by the external pitch tracker.

pub mod process;
pub mod profile;

use std::io;

use failure::Fail;

pub use self::process::{ChartGenerator, GenerationOutcome, GenerationTicket};
pub use self::profile::{load_profiles, GeneratorSettings, Profile, ProfileSet};

#[derive(Debug, Fail)]
pub enum GeneratorError {
  #[fail(display = "No audio file provided")]
  NoAudio,

  #[fail(display = "Audio file not found: {}", path)]
  AudioNotFound { path: String },

  #[fail(display = "Failed to start {}: {}", program, cause)]
  Spawn {
    program: String,
    #[cause]
    cause: io::Error,
  },

  #[fail(display = "Chart generation failed: {}", stderr)]
  Failed { code: Option<i32>, stderr: String },

  #[fail(display = "Output file not found: {}", path)]
  MissingOutput { path: String },

  #[fail(display = "Failed to access the profile {}: {}", path, cause)]
  ProfileIo {
    path: String,
    #[cause]
    cause: io::Error,
  },

  #[fail(display = "Malformed profile {}: {}", path, cause)]
  ProfileParse {
    path: String,
    #[cause]
    cause: serde_json::Error,
  },
}
