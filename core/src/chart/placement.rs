//! Collision resolution for notes being inserted or dropped on a lane.
//!
//! The anchor note wins its place and every note it lands on is bumped out
//! of its way, either after its end or before its start. Bumps are single
//! hop: a neighbour that would land on a third note makes the whole
//! placement fail instead of cascading. Displacements applied to earlier
//! neighbours are kept when a later one fails.

use log::debug;

use crate::chart::note::{Note, NoteId};
use crate::chart::store::NoteStore;
use crate::time::Seconds;

#[derive(Debug, PartialEq, Clone, Copy)]
enum Direction {
  Right,
  Left,
}

impl Direction {
  fn preferred(anchor: &Note, neighbour: &Note) -> Direction {
    if anchor.center() <= neighbour.center() {
      Direction::Right
    } else {
      Direction::Left
    }
  }

  fn opposite(self) -> Direction {
    match self {
      Direction::Right => Direction::Left,
      Direction::Left => Direction::Right,
    }
  }
}

/// Resolve the collisions of `anchor` against its lane. The anchor must
/// already be part of the store, so that bumped neighbours are checked
/// against it too.
pub fn try_snap_to_timeline(store: &mut NoteStore, anchor: NoteId, width: Seconds) -> bool {
  let anchor = match store.get(anchor) {
    Some(note) => *note,
    None => return false,
  };

  let overlapping = store.overlapping(&anchor);
  if overlapping.is_empty() {
    store.commit();
    return true;
  }

  for id in overlapping {
    let neighbour = match store.get(id) {
      Some(note) => *note,
      None => continue,
    };

    let preferred = Direction::preferred(&anchor, &neighbour);
    let new_start = displaced_start(store, &anchor, &neighbour, preferred, width)
      .or_else(|| displaced_start(store, &anchor, &neighbour, preferred.opposite(), width));

    match new_start {
      Some(start) => {
        debug!(
          "Bumped note from {:.3}s to {:.3}s in lane {}",
          neighbour.start(),
          start,
          neighbour.lane()
        );
        if let Some(note) = store.get_mut(id) {
          note.set_start(start);
        }
      }
      None => {
        debug!(
          "No room to bump note at {:.3}s in lane {}",
          neighbour.start(),
          neighbour.lane()
        );
        return false;
      }
    }
  }

  store.commit();
  true
}

fn displaced_start(
  store: &NoteStore,
  anchor: &Note,
  neighbour: &Note,
  direction: Direction,
  width: Seconds,
) -> Option<Seconds> {
  let start = match direction {
    Direction::Right => anchor.end(),
    Direction::Left => anchor.start() - neighbour.duration(),
  };

  let in_bounds = match direction {
    Direction::Right => start + neighbour.duration() <= width,
    Direction::Left => start >= 0.0,
  };

  Some(start).filter(|start| in_bounds && !store.is_overlapping(neighbour, *start, neighbour.duration()))
}
