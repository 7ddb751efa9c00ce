//! Project export: the song transcoded to Ogg Vorbis, the chart and its
//! metadata staged together in a directory, ready to be packaged.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use chrono::{DateTime, Utc};
use failure::Fail;
use log::{debug, info};
use serde_derive::{Deserialize, Serialize};

use crate::chart::io::{timeline_to_string, ChartIoError};
use crate::chart::{Lane, Timeline};
use crate::config::Transcoder as TranscoderConfig;
use crate::time::Seconds;

pub const AUDIO_FILE: &str = "song.ogg";
pub const CHART_FILE: &str = "notechart.json";
pub const METADATA_FILE: &str = "metadata.json";
pub const METADATA_VERSION: &str = "1.0";

#[derive(Debug, Fail)]
pub enum ExportError {
  #[fail(display = "No notes to export.")]
  NoNotes,

  #[fail(display = "Raw audio file not found: {}", path)]
  AudioNotFound { path: String },

  #[fail(display = "The transcoder {} is not installed or not found in PATH", program)]
  TranscoderUnavailable { program: String },

  #[fail(display = "Transcoding failed with exit code {:?}: {}", code, stderr)]
  Transcode { code: Option<i32>, stderr: String },

  #[fail(display = "Failed to write {}: {}", path, cause)]
  Io {
    path: String,
    #[cause]
    cause: io::Error,
  },

  #[fail(display = "{}", cause)]
  Chart {
    #[cause]
    cause: ChartIoError,
  },

  #[fail(display = "Failed to serialize the metadata: {}", cause)]
  Metadata {
    #[cause]
    cause: serde_json::Error,
  },
}

impl From<ChartIoError> for ExportError {
  fn from(cause: ChartIoError) -> ExportError {
    ExportError::Chart { cause }
  }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMetadata {
  pub version: String,
  pub export_date: DateTime<Utc>,
  pub song_name: String,
  pub note_count: usize,
  pub lanes: Lane,
  pub duration: Seconds,
}

impl ProjectMetadata {
  pub fn new(timeline: &Timeline, export_date: DateTime<Utc>) -> ProjectMetadata {
    ProjectMetadata {
      version: METADATA_VERSION.to_string(),
      export_date,
      song_name: timeline.name().to_string(),
      note_count: timeline.notes().len(),
      lanes: timeline.lanes(),
      duration: timeline.width(),
    }
  }
}

/// External audio transcoder with an ffmpeg compatible command line.
#[derive(Debug, Clone)]
pub struct Transcoder {
  program: String,
  quality: u8,
}

impl Transcoder {
  pub fn new(config: &TranscoderConfig) -> Transcoder {
    Transcoder {
      program: config.command.clone(),
      quality: config.quality,
    }
  }

  pub fn program(&self) -> &str {
    self.program.as_str()
  }

  pub fn is_available(&self) -> bool {
    Command::new(&self.program)
      .arg("-version")
      .stdout(Stdio::null())
      .stderr(Stdio::null())
      .status()
      .map(|status| status.success())
      .unwrap_or(false)
  }

  pub fn arguments(&self, input: &Path, output: &Path) -> Vec<String> {
    vec![
      "-i".to_string(),
      input.display().to_string(),
      "-c:a".to_string(),
      "libvorbis".to_string(),
      "-q:a".to_string(),
      self.quality.to_string(),
      "-y".to_string(),
      output.display().to_string(),
    ]
  }

  pub fn transcode(&self, input: &Path, output: &Path) -> Result<(), ExportError> {
    debug!("{} {}", self.program, self.arguments(input, output).join(" "));
    let result = Command::new(&self.program)
      .args(self.arguments(input, output))
      .output()
      .map_err(|_| ExportError::TranscoderUnavailable {
        program: self.program.clone(),
      })?;

    if result.status.success() && output.is_file() {
      Ok(())
    } else {
      Err(ExportError::Transcode {
        code: result.status.code(),
        stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
      })
    }
  }
}

/// Files written by an export.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedProject {
  pub dir: PathBuf,
  pub audio: PathBuf,
  pub chart: PathBuf,
  pub metadata: PathBuf,
}

pub struct ProjectExporter {
  transcoder: Transcoder,
}

impl ProjectExporter {
  pub fn new(transcoder: Transcoder) -> ProjectExporter {
    ProjectExporter { transcoder }
  }

  pub fn transcoder(&self) -> &Transcoder {
    &self.transcoder
  }

  pub fn validate(&self, timeline: &Timeline, raw_audio: &Path) -> Result<(), ExportError> {
    if timeline.notes().is_empty() {
      return Err(ExportError::NoNotes);
    }
    if !raw_audio.is_file() {
      return Err(ExportError::AudioNotFound {
        path: raw_audio.display().to_string(),
      });
    }
    if !self.transcoder.is_available() {
      return Err(ExportError::TranscoderUnavailable {
        program: self.transcoder.program.clone(),
      });
    }
    Ok(())
  }

  /// Stages the project into `dir`, creating it when missing.
  pub fn export(&self, timeline: &Timeline, raw_audio: &Path, dir: &Path) -> Result<StagedProject, ExportError> {
    self.validate(timeline, raw_audio)?;
    info!("Exporting {} to {} ...", timeline.name(), dir.display());

    fs::create_dir_all(dir).map_err(|cause| io_error(dir, cause))?;
    let staged = StagedProject {
      dir: dir.to_path_buf(),
      audio: dir.join(AUDIO_FILE),
      chart: dir.join(CHART_FILE),
      metadata: dir.join(METADATA_FILE),
    };

    self.transcoder.transcode(raw_audio, &staged.audio)?;

    let chart = timeline_to_string(timeline)?;
    fs::write(&staged.chart, chart).map_err(|cause| io_error(&staged.chart, cause))?;

    let metadata = ProjectMetadata::new(timeline, Utc::now());
    let metadata = serde_json::to_string_pretty(&metadata).map_err(|cause| ExportError::Metadata { cause })?;
    fs::write(&staged.metadata, metadata).map_err(|cause| io_error(&staged.metadata, cause))?;

    info!("Export staged at {}", dir.display());
    Ok(staged)
  }
}

fn io_error(path: &Path, cause: io::Error) -> ExportError {
  ExportError::Io {
    path: path.display().to_string(),
    cause,
  }
}

#[cfg(test)]
mod test {

  use std::fs;
  use std::path::Path;

  use chrono::{TimeZone, Utc};

  use super::{ExportError, ProjectExporter, ProjectMetadata, Transcoder};
  use crate::chart::io::read_timeline;
  use crate::chart::{Note, NoteType, Timeline};
  use crate::config::Transcoder as TranscoderConfig;

  fn transcoder(command: &str) -> Transcoder {
    Transcoder::new(&TranscoderConfig {
      command: command.to_string(),
      quality: 6,
    })
  }

  fn timeline() -> Timeline {
    Timeline::new("Song", 42.0, 4, vec![Note::new(1.0, 0.5, 2, NoteType::Normal)])
  }

  #[test]
  pub fn transcoder_arguments() {
    let args = transcoder("ffmpeg").arguments(Path::new("in.wav"), Path::new("out/song.ogg"));
    assert_eq!(
      args,
      vec!["-i", "in.wav", "-c:a", "libvorbis", "-q:a", "6", "-y", "out/song.ogg"]
    );
  }

  #[test]
  pub fn metadata_names() {
    let date = Utc.ymd(2024, 3, 1).and_hms(12, 0, 0);
    let metadata = ProjectMetadata::new(&timeline(), date);
    let json = serde_json::to_value(&metadata).unwrap();
    assert_eq!(json["version"], "1.0");
    assert_eq!(json["songName"], "Song");
    assert_eq!(json["noteCount"], 1);
    assert_eq!(json["lanes"], 4);
    assert_eq!(json["duration"], 42.0);
    assert_eq!(json["exportDate"], "2024-03-01T12:00:00Z");
  }

  #[test]
  pub fn validate_requires_notes_and_audio() {
    let exporter = ProjectExporter::new(transcoder("chart-studio-no-such-transcoder"));
    let empty = Timeline::new("Song", 42.0, 4, vec![]);
    match exporter.validate(&empty, Path::new("song.wav")) {
      Err(ExportError::NoNotes) => {}
      other => panic!("unexpected {:?}", other),
    }
    match exporter.validate(&timeline(), Path::new("/nonexistent/song.wav")) {
      Err(ExportError::AudioNotFound { .. }) => {}
      other => panic!("unexpected {:?}", other),
    }

    let dir = tempfile::tempdir().unwrap();
    let audio = dir.path().join("song.wav");
    fs::write(&audio, b"RIFF").unwrap();
    match exporter.validate(&timeline(), &audio) {
      Err(ExportError::TranscoderUnavailable { .. }) => {}
      other => panic!("unexpected {:?}", other),
    }
  }

  #[cfg(unix)]
  #[test]
  pub fn export_stages_project() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("transcoder.sh");
    fs::write(&script, "#!/bin/sh\n[ \"$1\" = \"-version\" ] && exit 0\ncp \"$2\" \"$8\"\n").unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

    let audio = dir.path().join("song.wav");
    fs::write(&audio, b"RIFF").unwrap();

    let exporter = ProjectExporter::new(transcoder(&script.to_string_lossy()));
    let staged = exporter
      .export(&timeline(), &audio, &dir.path().join("export"))
      .unwrap();

    assert_eq!(fs::read(&staged.audio).unwrap(), b"RIFF");
    assert_eq!(read_timeline(&staged.chart).unwrap().notes().len(), 1);
    let metadata: ProjectMetadata = serde_json::from_str(&fs::read_to_string(&staged.metadata).unwrap()).unwrap();
    assert_eq!(metadata.song_name, "Song");
    assert_eq!(metadata.note_count, 1);
  }
}
