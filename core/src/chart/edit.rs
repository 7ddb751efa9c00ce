use failure::Fail;
use log::debug;

use crate::chart::note::{Lane, Note, NoteId, NoteType};
use crate::chart::placement::try_snap_to_timeline;
use crate::chart::Timeline;
use crate::config::Editor as EditorConfig;
use crate::time::Seconds;

#[derive(Debug, Fail, PartialEq)]
pub enum EditError {
  #[fail(display = "Cannot place note: no free space.")]
  NoFreeSpace,

  #[fail(display = "Lane {} is outside of the {} available lanes", lane, lanes)]
  LaneOutOfBounds { lane: Lane, lanes: Lane },

  #[fail(display = "A note at {:.2}s doesn't fit in the timeline [0, {:.2}s]", time, width)]
  TimeOutOfBounds { time: Seconds, width: Seconds },

  #[fail(display = "Note not found")]
  UnknownNote,

  #[fail(display = "Split time {:.2}s is not inside the note [{:.2}s, {:.2}s)", time, start, end)]
  SplitOutOfRange {
    time: Seconds,
    start: Seconds,
    end: Seconds,
  },

  #[fail(display = "No room to resize the note")]
  NoRoomToResize,
}

/// Edit commands over a timeline. Every command leaves the notes sorted and
/// free of overlaps in each lane when it succeeds.
#[derive(Debug, Clone)]
pub struct NoteEditor {
  config: EditorConfig,
}

impl NoteEditor {
  pub fn new(config: EditorConfig) -> NoteEditor {
    NoteEditor { config }
  }

  pub fn config(&self) -> &EditorConfig {
    &self.config
  }

  pub fn add_note(&self, timeline: &mut Timeline, lane: Lane, time: Seconds) -> Result<NoteId, EditError> {
    let lanes = timeline.lanes();
    if lane >= lanes {
      return Err(EditError::LaneOutOfBounds { lane, lanes });
    }

    let width = timeline.width();
    let duration = self.config.default_note_duration;
    if time < 0.0 || time + duration > width {
      return Err(EditError::TimeOutOfBounds { time, width });
    }

    let before = timeline.notes().clone();
    let note = Note::new(time, duration, lane, NoteType::Normal);
    let id = timeline.notes_mut().insert(note);
    if try_snap_to_timeline(timeline.notes_mut(), id, width) {
      debug!("Added note at {:.2}s, lane {}", time, lane);
      Ok(id)
    } else {
      *timeline.notes_mut() = before;
      Err(EditError::NoFreeSpace)
    }
  }

  pub fn remove_note(&self, timeline: &mut Timeline, id: NoteId) -> Result<Note, EditError> {
    timeline.notes_mut().remove(id).ok_or(EditError::UnknownNote)
  }

  /// Starts an interactive move, remembering where the note was.
  pub fn begin_move(&self, timeline: &Timeline, id: NoteId) -> Result<MoveDrag, EditError> {
    timeline
      .notes()
      .get(id)
      .map(|note| MoveDrag {
        id,
        start: note.start(),
        duration: note.duration(),
        lane: note.lane(),
      })
      .ok_or(EditError::UnknownNote)
  }

  /// Moves a note in one go, as a drag released at the target position.
  pub fn move_note(
    &self,
    timeline: &mut Timeline,
    id: NoteId,
    start: Seconds,
    lane: Lane,
  ) -> Result<(), EditError> {
    let drag = self.begin_move(timeline, id)?;
    drag.drag_to(timeline, start, lane)?;
    drag.release(timeline)
  }

  /// Moves the left edge, keeping the end. The edge stays between the end of
  /// the previous note of the lane and the minimum duration.
  pub fn resize_left(&self, timeline: &mut Timeline, id: NoteId, new_start: Seconds) -> Result<Seconds, EditError> {
    let notes = timeline.notes();
    let note = *notes.get(id).ok_or(EditError::UnknownNote)?;

    let lower = notes.previous_in_lane(id).map_or(0.0, |prev| prev.end());
    let upper = note.end() - self.config.min_note_duration;
    if upper < lower {
      return Err(EditError::NoRoomToResize);
    }

    let start = new_start.max(lower).min(upper);
    if let Some(note_mut) = timeline.notes_mut().get_mut(id) {
      note_mut.set_start(start);
      note_mut.set_duration(note.end() - start);
    }
    timeline.notes_mut().commit();
    Ok(start)
  }

  /// Moves the right edge, keeping the start. The edge stays between the
  /// minimum duration and the start of the next note of the lane.
  pub fn resize_right(&self, timeline: &mut Timeline, id: NoteId, new_end: Seconds) -> Result<Seconds, EditError> {
    let width = timeline.width();
    let notes = timeline.notes();
    let note = *notes.get(id).ok_or(EditError::UnknownNote)?;

    let lower = note.start() + self.config.min_note_duration;
    let upper = notes.next_in_lane(id).map_or(width, |next| next.start());
    if upper < lower {
      return Err(EditError::NoRoomToResize);
    }

    let end = new_end.max(lower).min(upper);
    if let Some(note_mut) = timeline.notes_mut().get_mut(id) {
      note_mut.set_duration(end - note.start());
    }
    timeline.notes_mut().commit();
    Ok(end)
  }

  pub fn split_note(&self, timeline: &mut Timeline, id: NoteId, time: Seconds) -> Result<(NoteId, NoteId), EditError> {
    let note = *timeline.notes().get(id).ok_or(EditError::UnknownNote)?;
    if !(note.start() < time && time < note.end()) {
      return Err(EditError::SplitOutOfRange {
        time,
        start: note.start(),
        end: note.end(),
      });
    }

    let left_duration = time - note.start();
    let left = note.sibling(note.start(), left_duration);
    let right = note.sibling(time, note.duration() - left_duration);

    let notes = timeline.notes_mut();
    notes.remove(id);
    let left_id = notes.insert(left);
    let right_id = notes.insert(right);
    notes.commit();
    Ok((left_id, right_id))
  }
}

/// Snapshot of a note taken when a drag starts.
#[derive(Debug, Clone, Copy)]
pub struct MoveDrag {
  id: NoteId,
  start: Seconds,
  duration: Seconds,
  lane: Lane,
}

impl MoveDrag {
  pub fn id(&self) -> NoteId {
    self.id
  }

  /// Applies the drag position right away, the lane may overlap until the
  /// drag is released.
  pub fn drag_to(&self, timeline: &mut Timeline, start: Seconds, lane: Lane) -> Result<(), EditError> {
    let max_start = (timeline.width() - self.duration).max(0.0);
    let max_lane = timeline.lanes().saturating_sub(1);
    let note = timeline.notes_mut().get_mut(self.id).ok_or(EditError::UnknownNote)?;
    note.set_start(start.max(0.0).min(max_start));
    note.set_lane(lane.min(max_lane));
    Ok(())
  }

  /// Commits the drag, bumping neighbours out of the way, or puts the note
  /// back where the drag started.
  ///
  /// Neighbours bumped before the placement failed are put back as well, as
  /// they may now sit where the note started.
  pub fn release(self, timeline: &mut Timeline) -> Result<(), EditError> {
    let width = timeline.width();
    let before = timeline.notes().clone();
    if try_snap_to_timeline(timeline.notes_mut(), self.id, width) {
      return Ok(());
    }

    *timeline.notes_mut() = before;
    self.revert(timeline)?;
    Err(EditError::NoFreeSpace)
  }

  pub fn cancel(self, timeline: &mut Timeline) -> Result<(), EditError> {
    self.revert(timeline)
  }

  fn revert(&self, timeline: &mut Timeline) -> Result<(), EditError> {
    let notes = timeline.notes_mut();
    let note = notes.get_mut(self.id).ok_or(EditError::UnknownNote)?;
    note.set_start(self.start);
    note.set_duration(self.duration);
    note.set_lane(self.lane);
    notes.commit();
    Ok(())
  }
}

#[cfg(test)]
mod test {

  use approx::assert_abs_diff_eq;

  use super::{EditError, NoteEditor};
  use crate::chart::note::{Note, NoteType};
  use crate::chart::Timeline;
  use crate::config::Editor as EditorConfig;

  fn editor() -> NoteEditor {
    NoteEditor::new(EditorConfig::default())
  }

  fn timeline(notes: Vec<Note>) -> Timeline {
    Timeline::new("song", 10.0, 4, notes)
  }

  fn note(start: f64, duration: f64, lane: u32) -> Note {
    Note::new(start, duration, lane, NoteType::Normal)
  }

  fn assert_no_overlaps(timeline: &Timeline) {
    assert!(timeline.notes().find_overlap().is_none());
  }

  #[test]
  pub fn add_note_in_free_space() {
    let mut timeline = timeline(vec![note(2.0, 1.0, 0)]);
    let id = editor().add_note(&mut timeline, 0, 0.5).unwrap();
    let added = timeline.notes().get(id).unwrap();
    assert_eq!(added.start(), 0.5);
    assert_eq!(added.duration(), 0.5);
    assert_eq!(added.note_type(), NoteType::Normal);
    assert_eq!(timeline.notes().nth(0).map(|n| n.id()), Some(id));
  }

  #[test]
  pub fn add_note_bumps_neighbour() {
    let existing = note(1.0, 1.0, 1);
    let mut timeline = timeline(vec![existing]);
    let id = editor().add_note(&mut timeline, 1, 0.75).unwrap();
    assert_eq!(timeline.notes().get(existing.id()).map(|n| n.start()), Some(1.25));
    assert!(timeline.notes().get(id).is_some());
    assert_no_overlaps(&timeline);
  }

  #[test]
  pub fn add_note_without_free_space() {
    let mut timeline = timeline(vec![note(0.0, 1.0, 0), note(1.0, 1.0, 0)]);
    let result = editor().add_note(&mut timeline, 0, 0.25);
    assert_eq!(result, Err(EditError::NoFreeSpace));
    assert_eq!(timeline.notes().len(), 2);
    assert_no_overlaps(&timeline);
  }

  #[test]
  pub fn add_note_out_of_bounds() {
    let mut timeline = timeline(vec![]);
    assert_eq!(
      editor().add_note(&mut timeline, 4, 1.0),
      Err(EditError::LaneOutOfBounds { lane: 4, lanes: 4 })
    );
    assert_eq!(
      editor().add_note(&mut timeline, 0, 10.5),
      Err(EditError::TimeOutOfBounds { time: 10.5, width: 10.0 })
    );
    assert_eq!(
      editor().add_note(&mut timeline, 0, -0.1),
      Err(EditError::TimeOutOfBounds { time: -0.1, width: 10.0 })
    );
    // the default duration would run past the end
    assert_eq!(
      editor().add_note(&mut timeline, 0, 9.75),
      Err(EditError::TimeOutOfBounds { time: 9.75, width: 10.0 })
    );
    assert!(timeline.notes().is_empty());

    let last = editor().add_note(&mut timeline, 0, 9.5).unwrap();
    assert_eq!(timeline.notes().get(last).map(|n| n.end()), Some(10.0));
  }

  #[test]
  /// A note added before an existing one is sorted into place, so resizing
  /// it stops at the real neighbour
  pub fn add_note_keeps_order_for_resize() {
    let later = note(3.0, 1.0, 0);
    let mut timeline = timeline(vec![later]);
    let editor = editor();
    let id = editor.add_note(&mut timeline, 0, 0.5).unwrap();

    let starts: Vec<f64> = timeline.notes().iter().map(|n| n.start()).collect();
    assert_eq!(starts, vec![0.5, 3.0]);
    assert_eq!(editor.resize_right(&mut timeline, id, 5.0), Ok(3.0));
    assert_eq!(timeline.notes().get(later.id()).map(|n| n.start()), Some(3.0));
    assert_no_overlaps(&timeline);
  }

  #[test]
  /// Equal centres push the existing note to the right
  pub fn add_note_tie_pushes_right() {
    let existing = note(2.0, 1.0, 0);
    let mut timeline = timeline(vec![existing]);
    editor().add_note(&mut timeline, 0, 2.25).unwrap();
    assert_eq!(timeline.notes().get(existing.id()).map(|n| n.start()), Some(2.75));
    assert_no_overlaps(&timeline);
  }

  #[test]
  /// Neighbours bumped before the placement failed are put back
  pub fn add_note_failure_restores_neighbours() {
    let short = note(0.9, 0.2, 0);
    let long = note(1.2, 5.0, 0);
    let last = note(6.3, 1.0, 0);
    let mut timeline = timeline(vec![short, long, last]);
    let editor = NoteEditor::new(EditorConfig {
      default_note_duration: 1.5,
      ..EditorConfig::default()
    });

    assert_eq!(editor.add_note(&mut timeline, 0, 1.0), Err(EditError::NoFreeSpace));
    assert_eq!(timeline.notes().len(), 3);
    assert_eq!(*timeline.notes().get(short.id()).unwrap(), short);
    assert_eq!(*timeline.notes().get(long.id()).unwrap(), long);
    assert_eq!(*timeline.notes().get(last.id()).unwrap(), last);
  }

  #[test]
  pub fn move_note_bumps_neighbour() {
    let moving = note(5.0, 1.0, 2);
    let resting = note(1.0, 1.0, 0);
    let mut timeline = timeline(vec![moving, resting]);
    editor().move_note(&mut timeline, moving.id(), 1.5, 0).unwrap();
    let moved = timeline.notes().get(moving.id()).unwrap();
    assert_eq!((moved.start(), moved.lane()), (1.5, 0));
    assert_eq!(timeline.notes().get(resting.id()).map(|n| n.start()), Some(0.5));
    assert_no_overlaps(&timeline);
  }

  #[test]
  /// A rejected drop puts the note back to its pre-drag snapshot
  pub fn move_note_reverts_on_conflict() {
    let moving = note(5.0, 1.0, 2);
    let mut timeline = timeline(vec![note(0.0, 1.0, 0), note(2.0, 1.0, 0), moving]);
    let editor = editor();

    let drag = editor.begin_move(&timeline, moving.id()).unwrap();
    drag.drag_to(&mut timeline, 0.5, 0).unwrap();
    drag.drag_to(&mut timeline, 0.25, 0).unwrap();
    assert!(timeline.notes().find_overlap().is_some());

    assert_eq!(drag.release(&mut timeline), Err(EditError::NoFreeSpace));
    let reverted = timeline.notes().get(moving.id()).unwrap();
    assert_eq!(*reverted, moving);
    assert_no_overlaps(&timeline);
  }

  #[test]
  pub fn drag_clamps_to_timeline() {
    let moving = note(5.0, 1.0, 2);
    let mut timeline = timeline(vec![moving]);
    let drag = editor().begin_move(&timeline, moving.id()).unwrap();
    drag.drag_to(&mut timeline, 12.0, 9).unwrap();
    let dragged = *timeline.notes().get(moving.id()).unwrap();
    assert_eq!((dragged.start(), dragged.lane()), (9.0, 3));
    drag.cancel(&mut timeline).unwrap();
    assert_eq!(*timeline.notes().get(moving.id()).unwrap(), moving);
  }

  #[test]
  pub fn resize_left_within_gap() {
    let prev = note(0.0, 1.0, 0);
    let resized = note(2.0, 2.0, 0);
    let mut timeline = timeline(vec![prev, resized]);
    let editor = editor();

    assert_eq!(editor.resize_left(&mut timeline, resized.id(), 1.5), Ok(1.5));
    // clamped to the end of the previous note
    assert_eq!(editor.resize_left(&mut timeline, resized.id(), 0.2), Ok(1.0));
    // clamped to the minimum duration
    assert_eq!(editor.resize_left(&mut timeline, resized.id(), 3.9), Ok(3.5));
    let note = timeline.notes().get(resized.id()).unwrap();
    assert_abs_diff_eq!(note.duration(), 0.5);
    assert_abs_diff_eq!(note.end(), 4.0);
  }

  #[test]
  pub fn resize_right_within_gap() {
    let resized = note(1.0, 1.0, 1);
    let next = note(3.0, 1.0, 1);
    let mut timeline = timeline(vec![resized, next, note(2.0, 1.0, 0)]);
    let editor = editor();

    assert_eq!(editor.resize_right(&mut timeline, resized.id(), 2.5), Ok(2.5));
    assert_eq!(editor.resize_right(&mut timeline, resized.id(), 5.0), Ok(3.0));
    assert_eq!(editor.resize_right(&mut timeline, resized.id(), 1.1), Ok(1.5));
    assert_abs_diff_eq!(timeline.notes().get(resized.id()).unwrap().duration(), 0.5);
    assert_eq!(timeline.notes().get(next.id()).map(|n| n.start()), Some(3.0));

    assert_eq!(editor.resize_right(&mut timeline, next.id(), 20.0), Ok(10.0));
    assert_no_overlaps(&timeline);
  }

  #[test]
  pub fn resize_without_room() {
    let prev = note(0.0, 1.0, 0);
    let short = note(1.0, 0.25, 0);
    let mut timeline = timeline(vec![prev, short]);
    assert_eq!(
      editor().resize_left(&mut timeline, short.id(), 0.5),
      Err(EditError::NoRoomToResize)
    );
    assert_eq!(*timeline.notes().get(short.id()).unwrap(), short);
  }

  #[test]
  pub fn split_note_preserves_duration() {
    let original = note(1.0, 1.5, 2);
    let mut timeline = timeline(vec![note(0.0, 1.0, 2), original]);
    let (left, right) = editor().split_note(&mut timeline, original.id(), 1.7).unwrap();

    assert!(timeline.notes().get(original.id()).is_none());
    let left = *timeline.notes().get(left).unwrap();
    let right = *timeline.notes().get(right).unwrap();
    assert_abs_diff_eq!(left.duration() + right.duration(), original.duration(), epsilon = 1e-12);
    assert_eq!(left.start(), 1.0);
    assert_eq!(right.start(), 1.7);
    assert_eq!((left.lane(), right.lane()), (2, 2));
    assert_eq!(left.note_type(), original.note_type());
    assert_eq!(timeline.notes().len(), 3);
    assert_no_overlaps(&timeline);
  }

  #[test]
  pub fn split_note_outside_of_note() {
    let original = note(1.0, 1.0, 0);
    let mut timeline = timeline(vec![original]);
    let editor = editor();
    assert!(editor.split_note(&mut timeline, original.id(), 1.0).is_err());
    assert!(editor.split_note(&mut timeline, original.id(), 2.0).is_err());
    assert_eq!(timeline.notes().len(), 1);
  }

  #[test]
  pub fn remove_note() {
    let removed = note(1.0, 1.0, 0);
    let mut timeline = timeline(vec![removed]);
    let editor = editor();
    assert_eq!(editor.remove_note(&mut timeline, removed.id()), Ok(removed));
    assert_eq!(editor.remove_note(&mut timeline, removed.id()), Err(EditError::UnknownNote));
  }

  #[test]
  /// A scripted editing session never leaves overlaps behind
  pub fn edit_sequence_keeps_lanes_free_of_overlaps() {
    let mut timeline = timeline(vec![]);
    let editor = editor();
    let mut ids = Vec::new();
    for step in 0..40u32 {
      let lane = step % 3;
      let time = f64::from((step * 7) % 19) * 0.45;
      if let Ok(id) = editor.add_note(&mut timeline, lane, time) {
        ids.push(id);
      }
      assert_no_overlaps(&timeline);
    }

    let min_duration = editor.config().min_note_duration;
    for (index, id) in ids.iter().enumerate() {
      let target = f64::from((index as u32 * 5) % 17) * 0.5;
      let _ = editor.move_note(&mut timeline, *id, target, (index as u32) % 4);
      assert_no_overlaps(&timeline);
      if editor.resize_right(&mut timeline, *id, target + 2.0).is_ok() {
        assert!(timeline.notes().get(*id).unwrap().duration() >= min_duration - 1e-9);
      }
      assert_no_overlaps(&timeline);
      if editor.resize_left(&mut timeline, *id, target - 1.0).is_ok() {
        assert!(timeline.notes().get(*id).unwrap().duration() >= min_duration - 1e-9);
      }
      assert_no_overlaps(&timeline);
      if let Some(note) = timeline.notes().get(*id).copied() {
        let _ = editor.split_note(&mut timeline, *id, note.center());
      }
      assert_no_overlaps(&timeline);
    }

    let starts: Vec<f64> = timeline.notes().iter().map(|n| n.start()).collect();
    assert!(starts.windows(2).all(|pair| pair[0] <= pair[1]));
    assert!(timeline.notes().iter().all(|n| n.duration() > 0.0));
  }
}
