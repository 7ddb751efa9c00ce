use uuid::Uuid;

use crate::time::Seconds;

pub type Lane = u32;

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct NoteId(Uuid);

impl NoteId {
  pub fn new() -> NoteId {
    NoteId(Uuid::new_v4())
  }
}

impl Default for NoteId {
  fn default() -> Self {
    NoteId::new()
  }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum NoteType {
  Normal,
  Hold,
  Vibrato,
  Other,
}

impl NoteType {
  /// Unknown names are kept as `Other` so that a chart written by a newer
  /// generator still loads.
  pub fn from_name(name: &str) -> NoteType {
    match name.trim().to_lowercase().as_str() {
      "" | "normal" => NoteType::Normal,
      "hold" => NoteType::Hold,
      "vibrato" => NoteType::Vibrato,
      _ => NoteType::Other,
    }
  }

  pub fn name(self) -> &'static str {
    match self {
      NoteType::Normal => "normal",
      NoteType::Hold => "hold",
      NoteType::Vibrato => "vibrato",
      NoteType::Other => "other",
    }
  }
}

impl Default for NoteType {
  fn default() -> Self {
    NoteType::Normal
  }
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Note {
  id: NoteId,
  start: Seconds,
  duration: Seconds,
  lane: Lane,
  note_type: NoteType,
}

impl Note {
  pub fn new(start: Seconds, duration: Seconds, lane: Lane, note_type: NoteType) -> Note {
    Note {
      id: NoteId::new(),
      start,
      duration,
      lane,
      note_type,
    }
  }

  pub fn id(&self) -> NoteId {
    self.id
  }

  pub fn start(&self) -> Seconds {
    self.start
  }

  pub fn duration(&self) -> Seconds {
    self.duration
  }

  pub fn end(&self) -> Seconds {
    self.start + self.duration
  }

  pub fn center(&self) -> Seconds {
    self.start + self.duration / 2.0
  }

  pub fn lane(&self) -> Lane {
    self.lane
  }

  pub fn note_type(&self) -> NoteType {
    self.note_type
  }

  pub(crate) fn set_start(&mut self, start: Seconds) {
    self.start = start;
  }

  pub(crate) fn set_duration(&mut self, duration: Seconds) {
    self.duration = duration;
  }

  pub(crate) fn set_lane(&mut self, lane: Lane) {
    self.lane = lane;
  }

  /// A note with the same lane and type but its own identity.
  pub(crate) fn sibling(&self, start: Seconds, duration: Seconds) -> Note {
    Note::new(start, duration, self.lane, self.note_type)
  }
}
