use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread;

use crossbeam_channel::Receiver;
use log::{debug, info};

use crate::generator::{GeneratorError, GeneratorSettings};

/// Identifies the session state a generation was requested from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationTicket(u64);

impl GenerationTicket {
  pub fn new(epoch: u64) -> GenerationTicket {
    GenerationTicket(epoch)
  }

  pub fn epoch(&self) -> u64 {
    self.0
  }
}

#[derive(Debug)]
pub struct GenerationOutcome {
  pub ticket: GenerationTicket,
  pub audio: PathBuf,
  pub result: Result<PathBuf, GeneratorError>,
}

#[derive(Debug, Clone)]
pub struct ChartGenerator {
  program: String,
}

impl ChartGenerator {
  pub fn new<T>(program: T) -> ChartGenerator
  where
    T: Into<String>,
  {
    ChartGenerator {
      program: program.into(),
    }
  }

  pub fn program(&self) -> &str {
    self.program.as_str()
  }

  /// Where the generator leaves the chart for an audio file.
  pub fn output_path(audio: &Path) -> PathBuf {
    let stem = audio.file_stem().map(|stem| stem.to_string_lossy()).unwrap_or_default();
    audio.with_file_name(format!("{}_chart.json", stem))
  }

  /// Runs the generator to completion, returning the path of the chart.
  pub fn generate(&self, audio: &Path, settings: &GeneratorSettings) -> Result<PathBuf, GeneratorError> {
    if audio.as_os_str().is_empty() {
      return Err(GeneratorError::NoAudio);
    }
    if !audio.is_file() {
      return Err(GeneratorError::AudioNotFound {
        path: audio.display().to_string(),
      });
    }

    info!("Generating chart for {} ...", audio.display());
    let arguments = settings.arguments();
    debug!("{} {} {}", self.program, audio.display(), arguments.join(" "));

    let output = Command::new(&self.program)
      .arg(audio)
      .args(&arguments)
      .output()
      .map_err(|cause| GeneratorError::Spawn {
        program: self.program.clone(),
        cause,
      })?;

    if !output.status.success() {
      return Err(GeneratorError::Failed {
        code: output.status.code(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
      });
    }

    let chart = Self::output_path(audio);
    if chart.is_file() {
      info!("Chart generated at {}", chart.display());
      Ok(chart)
    } else {
      Err(GeneratorError::MissingOutput {
        path: chart.display().to_string(),
      })
    }
  }

  /// Runs the generator on its own thread. The outcome is sent once the
  /// process finishes.
  pub fn spawn(
    &self,
    audio: PathBuf,
    settings: GeneratorSettings,
    ticket: GenerationTicket,
  ) -> Result<Receiver<GenerationOutcome>, GeneratorError> {
    let (outcome_tx, outcome_rx) = crossbeam_channel::bounded(1);
    let generator = self.clone();

    thread::Builder::new()
      .name("chart-generator".into())
      .spawn(move || {
        let result = generator.generate(&audio, &settings);
        drop(outcome_tx.send(GenerationOutcome { ticket, audio, result }));
      })
      .map_err(|cause| GeneratorError::Spawn {
        program: self.program.clone(),
        cause,
      })?;

    Ok(outcome_rx)
  }
}

#[cfg(test)]
mod test {

  use std::path::{Path, PathBuf};

  use super::{ChartGenerator, GenerationTicket};
  use crate::generator::{GeneratorError, GeneratorSettings};

  #[test]
  pub fn output_path_beside_audio() {
    assert_eq!(
      ChartGenerator::output_path(Path::new("/songs/take one.wav")),
      PathBuf::from("/songs/take one_chart.json")
    );
  }

  #[test]
  pub fn generate_without_audio() {
    let generator = ChartGenerator::new("notechart");
    let settings = GeneratorSettings::default();
    match generator.generate(Path::new(""), &settings) {
      Err(GeneratorError::NoAudio) => {}
      other => panic!("unexpected {:?}", other),
    }
    match generator.generate(Path::new("/nonexistent/song.wav"), &settings) {
      Err(GeneratorError::AudioNotFound { .. }) => {}
      other => panic!("unexpected {:?}", other),
    }
  }

  #[test]
  pub fn generate_with_unknown_program() {
    let dir = tempfile::tempdir().unwrap();
    let audio = dir.path().join("song.wav");
    std::fs::write(&audio, b"RIFF").unwrap();
    let generator = ChartGenerator::new("chart-studio-no-such-program");
    match generator.generate(&audio, &GeneratorSettings::default()) {
      Err(GeneratorError::Spawn { .. }) => {}
      other => panic!("unexpected {:?}", other),
    }
  }

  #[cfg(unix)]
  fn script(dir: &Path, body: &str) -> String {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("generator.sh");
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path.to_string_lossy().to_string()
  }

  #[cfg(unix)]
  #[test]
  pub fn generate_reports_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let audio = dir.path().join("song.wav");
    std::fs::write(&audio, b"RIFF").unwrap();
    let generator = ChartGenerator::new(script(dir.path(), "echo 'no pitch found' >&2\nexit 3"));
    match generator.generate(&audio, &GeneratorSettings::default()) {
      Err(GeneratorError::Failed { code, stderr }) => {
        assert_eq!(code, Some(3));
        assert_eq!(stderr, "no pitch found");
      }
      other => panic!("unexpected {:?}", other),
    }
  }

  #[cfg(unix)]
  #[test]
  pub fn generate_requires_output() {
    let dir = tempfile::tempdir().unwrap();
    let audio = dir.path().join("song.wav");
    std::fs::write(&audio, b"RIFF").unwrap();
    let generator = ChartGenerator::new(script(dir.path(), "exit 0"));
    match generator.generate(&audio, &GeneratorSettings::default()) {
      Err(GeneratorError::MissingOutput { .. }) => {}
      other => panic!("unexpected {:?}", other),
    }
  }

  #[cfg(unix)]
  #[test]
  pub fn spawn_sends_outcome() {
    let dir = tempfile::tempdir().unwrap();
    let audio = dir.path().join("song.wav");
    std::fs::write(&audio, b"RIFF").unwrap();
    let generator = ChartGenerator::new(script(
      dir.path(),
      "[ \"$2\" = \"--window-size\" ] || exit 1\necho '{\"lanes\": 4}' > \"${1%.*}_chart.json\"",
    ));

    let outcome_rx = generator
      .spawn(audio.clone(), GeneratorSettings::default(), GenerationTicket::new(7))
      .unwrap();
    let outcome = outcome_rx.recv().unwrap();
    assert_eq!(outcome.ticket, GenerationTicket::new(7));
    assert_eq!(outcome.audio, audio);
    assert_eq!(outcome.result.unwrap(), dir.path().join("song_chart.json"));
  }
}
