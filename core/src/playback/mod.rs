pub mod clock;

pub use self::clock::PlaybackClock;

use crate::time::Seconds;

/// The audio engine as seen by the playhead. Its position is only
/// refreshed every few render ticks.
pub trait Transport {
  fn position(&self) -> Seconds;

  fn duration(&self) -> Seconds;

  fn is_playing(&self) -> bool;

  fn play(&mut self);

  fn pause(&mut self);

  fn seek(&mut self, position: Seconds);
}
