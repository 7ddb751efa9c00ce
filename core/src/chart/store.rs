use std::cmp::Ordering;

use crate::chart::note::{Lane, Note, NoteId};
use crate::time::Seconds;

/// Notes of a chart, kept sorted by start after every `commit`.
#[derive(Debug, Clone, Default)]
pub struct NoteStore {
  notes: Vec<Note>,
}

impl NoteStore {
  pub fn new() -> NoteStore {
    NoteStore::default()
  }

  pub fn from_notes(notes: Vec<Note>) -> NoteStore {
    let mut store = NoteStore { notes };
    store.commit();
    store
  }

  pub fn len(&self) -> usize {
    self.notes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.notes.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &Note> {
    self.notes.iter()
  }

  pub fn get(&self, id: NoteId) -> Option<&Note> {
    self.notes.iter().find(|note| note.id() == id)
  }

  pub(crate) fn get_mut(&mut self, id: NoteId) -> Option<&mut Note> {
    self.notes.iter_mut().find(|note| note.id() == id)
  }

  /// The note at `index` in start order.
  pub fn nth(&self, index: usize) -> Option<&Note> {
    self.notes.get(index)
  }

  pub(crate) fn insert(&mut self, note: Note) -> NoteId {
    let id = note.id();
    self.notes.push(note);
    id
  }

  pub(crate) fn remove(&mut self, id: NoteId) -> Option<Note> {
    self
      .notes
      .iter()
      .position(|note| note.id() == id)
      .map(|index| self.notes.remove(index))
  }

  pub fn notes_in_lane<'a>(&'a self, lane: Lane) -> impl Iterator<Item = &'a Note> + 'a {
    self.notes.iter().filter(move |note| note.lane() == lane)
  }

  pub fn overlaps(a: &Note, b: &Note) -> bool {
    a.lane() == b.lane() && a.start() < b.end() && b.start() < a.end()
  }

  /// Whether placing `note` at the candidate interval would collide with any
  /// other note of its lane.
  pub fn is_overlapping(&self, note: &Note, start: Seconds, duration: Seconds) -> bool {
    self.notes_in_lane(note.lane()).any(|other| {
      other.id() != note.id() && other.start() < start + duration && start < other.end()
    })
  }

  /// Notes of the anchor's lane that collide with it, in start order.
  pub fn overlapping(&self, anchor: &Note) -> Vec<NoteId> {
    let mut overlapping: Vec<&Note> = self
      .notes_in_lane(anchor.lane())
      .filter(|note| note.id() != anchor.id() && Self::overlaps(anchor, note))
      .collect();
    overlapping.sort_by(|a, b| Self::by_start(a, b));
    overlapping.into_iter().map(|note| note.id()).collect()
  }

  pub fn previous_in_lane(&self, id: NoteId) -> Option<&Note> {
    let lane_notes = self.lane_notes_of(id)?;
    let index = lane_notes.iter().position(|note| note.id() == id)?;
    index.checked_sub(1).map(|prev| lane_notes[prev])
  }

  pub fn next_in_lane(&self, id: NoteId) -> Option<&Note> {
    let lane_notes = self.lane_notes_of(id)?;
    let index = lane_notes.iter().position(|note| note.id() == id)?;
    lane_notes.get(index + 1).copied()
  }

  /// First pair of notes breaking the per lane no-overlap invariant.
  pub fn find_overlap(&self) -> Option<(NoteId, NoteId)> {
    self.notes.iter().enumerate().find_map(|(index, a)| {
      self.notes[index + 1..]
        .iter()
        .find(|b| Self::overlaps(a, b))
        .map(|b| (a.id(), b.id()))
    })
  }

  pub fn commit(&mut self) {
    self.notes.sort_by(Self::by_start);
  }

  fn lane_notes_of(&self, id: NoteId) -> Option<Vec<&Note>> {
    let lane = self.get(id)?.lane();
    Some(self.notes_in_lane(lane).collect())
  }

  fn by_start(a: &Note, b: &Note) -> Ordering {
    a.start().partial_cmp(&b.start()).unwrap_or(Ordering::Equal)
  }
}
