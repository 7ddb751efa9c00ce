pub mod edit;
pub mod io;
pub mod note;
pub mod pitch;
pub mod placement;
pub mod store;

use crate::time::Seconds;

pub use self::edit::{EditError, MoveDrag, NoteEditor};
pub use self::note::{Lane, Note, NoteId, NoteType};
pub use self::pitch::PitchSample;
pub use self::store::NoteStore;

/// Width used when neither the audio nor the chart tell how long the song is.
pub const DEFAULT_WIDTH: Seconds = 10.0;

#[derive(Debug, PartialEq, Clone)]
pub struct Lyric {
  pub start: Seconds,
  pub end: Seconds,
  pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct Timeline {
  name: String,
  length: Seconds,
  lanes: Lane,
  notes: NoteStore,
  pitches: Vec<PitchSample>,
  lyrics: Vec<Lyric>,
  audio_length: Option<Seconds>,
}

impl Timeline {
  pub fn new<T>(name: T, length: Seconds, lanes: Lane, notes: Vec<Note>) -> Timeline
  where
    T: Into<String>,
  {
    Timeline {
      name: name.into(),
      length,
      lanes,
      notes: NoteStore::from_notes(notes),
      pitches: Vec::new(),
      lyrics: Vec::new(),
      audio_length: None,
    }
  }

  pub fn with_pitches(mut self, pitches: Vec<PitchSample>) -> Timeline {
    self.pitches = pitches;
    self
  }

  pub fn with_lyrics(mut self, lyrics: Vec<Lyric>) -> Timeline {
    self.lyrics = lyrics;
    self
  }

  pub fn name(&self) -> &str {
    self.name.as_str()
  }

  pub fn set_name<T>(&mut self, name: T)
  where
    T: Into<String>,
  {
    self.name = name.into();
  }

  pub fn length(&self) -> Seconds {
    self.length
  }

  pub fn lanes(&self) -> Lane {
    self.lanes
  }

  pub fn notes(&self) -> &NoteStore {
    &self.notes
  }

  pub fn notes_mut(&mut self) -> &mut NoteStore {
    &mut self.notes
  }

  pub fn pitches(&self) -> &[PitchSample] {
    self.pitches.as_slice()
  }

  pub fn lyrics(&self) -> &[Lyric] {
    self.lyrics.as_slice()
  }

  pub fn set_lyrics(&mut self, lyrics: Vec<Lyric>) {
    self.lyrics = lyrics;
  }

  /// Length of the loaded audio, which takes precedence over the chart length.
  pub fn set_audio_length(&mut self, audio_length: Option<Seconds>) {
    self.audio_length = audio_length;
  }

  pub fn audio_length(&self) -> Option<Seconds> {
    self.audio_length
  }

  /// Extent of the editable timeline.
  pub fn width(&self) -> Seconds {
    match self.audio_length {
      Some(length) if length > 0.0 => length,
      _ if self.length > 0.0 => self.length,
      _ => DEFAULT_WIDTH,
    }
  }
}
