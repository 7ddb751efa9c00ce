//! Chart JSON files.
//!
//! Field names are matched ignoring case when reading, and missing fields
//! take their defaults. Files are always written with lowercase names.

use std::fs;
use std::io;
use std::path::Path;

use failure::Fail;
use log::warn;
use serde_derive::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::chart::note::{Lane, Note, NoteType};
use crate::chart::pitch::{hz_to_midi, PitchSample};
use crate::chart::{Lyric, Timeline};

#[derive(Debug, Fail)]
pub enum ChartIoError {
  #[fail(display = "Failed to access {}: {}", path, cause)]
  Io {
    path: String,
    #[cause]
    cause: io::Error,
  },

  #[fail(display = "Malformed chart data: {}", cause)]
  Parse {
    #[cause]
    cause: serde_json::Error,
  },
}

impl From<serde_json::Error> for ChartIoError {
  fn from(cause: serde_json::Error) -> ChartIoError {
    ChartIoError::Parse { cause }
  }
}

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(default)]
struct ChartFile {
  name: String,
  length: f64,
  lanes: Lane,
  notes: Vec<NoteRecord>,
  pitches: Vec<PitchRecord>,
  lyrics: Vec<LyricRecord>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(default)]
struct NoteRecord {
  start: f64,
  duration: f64,
  lane: Lane,
  #[serde(rename = "type")]
  note_type: String,
}

impl Default for NoteRecord {
  fn default() -> NoteRecord {
    NoteRecord {
      start: 0.0,
      duration: 0.0,
      lane: 0,
      note_type: NoteType::Normal.name().to_string(),
    }
  }
}

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(default)]
struct PitchRecord {
  time: f64,
  pitch: f64,
  midi: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(default)]
struct LyricRecord {
  start: f64,
  end: f64,
  text: String,
}

impl From<LyricRecord> for Lyric {
  fn from(record: LyricRecord) -> Lyric {
    Lyric {
      start: record.start,
      end: record.end,
      text: record.text,
    }
  }
}

pub fn read_timeline<P>(path: P) -> Result<Timeline, ChartIoError>
where
  P: AsRef<Path>,
{
  timeline_from_str(&read_file(path.as_ref())?)
}

pub fn timeline_from_str(content: &str) -> Result<Timeline, ChartIoError> {
  let value = lowercase_keys(serde_json::from_str(content)?);
  let file: ChartFile = serde_json::from_value(value)?;

  let notes = file
    .notes
    .into_iter()
    .filter_map(|record| {
      if record.duration > 0.0 && record.start >= 0.0 {
        Some(Note::new(
          record.start,
          record.duration,
          record.lane,
          NoteType::from_name(&record.note_type),
        ))
      } else {
        warn!(
          "Skipping note with start {}s and duration {}s",
          record.start, record.duration
        );
        None
      }
    })
    .collect();

  let pitches = file
    .pitches
    .into_iter()
    .map(|record| {
      let midi = record.midi.unwrap_or_else(|| hz_to_midi(record.pitch));
      PitchSample::new(record.time, record.pitch, midi)
    })
    .collect();

  let lyrics = file.lyrics.into_iter().map(Lyric::from).collect();

  Ok(
    Timeline::new(file.name, file.length, file.lanes, notes)
      .with_pitches(pitches)
      .with_lyrics(lyrics),
  )
}

pub fn timeline_to_string(timeline: &Timeline) -> Result<String, ChartIoError> {
  let file = ChartFile {
    name: timeline.name().to_string(),
    length: timeline.length(),
    lanes: timeline.lanes(),
    notes: timeline
      .notes()
      .iter()
      .map(|note| NoteRecord {
        start: note.start(),
        duration: note.duration(),
        lane: note.lane(),
        note_type: note.note_type().name().to_string(),
      })
      .collect(),
    pitches: timeline
      .pitches()
      .iter()
      .map(|sample| PitchRecord {
        time: sample.time,
        pitch: sample.pitch_hz,
        midi: Some(sample.midi),
      })
      .collect(),
    lyrics: timeline
      .lyrics()
      .iter()
      .map(|lyric| LyricRecord {
        start: lyric.start,
        end: lyric.end,
        text: lyric.text.clone(),
      })
      .collect(),
  };
  Ok(serde_json::to_string_pretty(&file)?)
}

pub fn write_timeline<P>(path: P, timeline: &Timeline) -> Result<(), ChartIoError>
where
  P: AsRef<Path>,
{
  let path = path.as_ref();
  let content = timeline_to_string(timeline)?;
  fs::write(path, content).map_err(|cause| ChartIoError::Io {
    path: path.display().to_string(),
    cause,
  })
}

/// Reads a lyrics file, a JSON array of `{start, end, text}` phrases.
pub fn read_lyrics<P>(path: P) -> Result<Vec<Lyric>, ChartIoError>
where
  P: AsRef<Path>,
{
  lyrics_from_str(&read_file(path.as_ref())?)
}

pub fn lyrics_from_str(content: &str) -> Result<Vec<Lyric>, ChartIoError> {
  let value = lowercase_keys(serde_json::from_str(content)?);
  let records: Vec<LyricRecord> = serde_json::from_value(value)?;
  Ok(records.into_iter().map(Lyric::from).collect())
}

fn read_file(path: &Path) -> Result<String, ChartIoError> {
  fs::read_to_string(path).map_err(|cause| ChartIoError::Io {
    path: path.display().to_string(),
    cause,
  })
}

fn lowercase_keys(value: Value) -> Value {
  match value {
    Value::Object(map) => Value::Object(
      map
        .into_iter()
        .map(|(key, value)| (key.to_lowercase(), lowercase_keys(value)))
        .collect::<Map<String, Value>>(),
    ),
    Value::Array(items) => Value::Array(items.into_iter().map(lowercase_keys).collect()),
    other => other,
  }
}
