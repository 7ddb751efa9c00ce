use log::debug;

use crate::playback::Transport;
use crate::time::{format_playhead, Seconds, Stopwatch};

/// Smooths the coarse transport position into the playhead time.
///
/// Between two position updates the time is extrapolated with the
/// stopwatch from the last position seen (the anchor). While playing the
/// visual time never goes backwards, even if the transport reports a
/// position behind the extrapolated one.
pub struct PlaybackClock<T, S> {
  transport: T,
  stopwatch: S,

  anchor: Seconds,
  visual_time: Seconds,

  loop_enabled: bool,
  loop_start: Seconds,
  loop_end: Seconds,
}

impl<T, S> PlaybackClock<T, S>
where
  T: Transport,
  S: Stopwatch,
{
  pub fn new(transport: T, stopwatch: S) -> PlaybackClock<T, S> {
    let position = transport.position();
    PlaybackClock {
      transport,
      stopwatch,

      anchor: position,
      visual_time: position,

      loop_enabled: false,
      loop_start: 0.0,
      loop_end: 0.0,
    }
  }

  pub fn transport(&self) -> &T {
    &self.transport
  }

  pub fn transport_mut(&mut self) -> &mut T {
    &mut self.transport
  }

  pub fn stopwatch_mut(&mut self) -> &mut S {
    &mut self.stopwatch
  }

  pub fn is_playing(&self) -> bool {
    self.transport.is_playing()
  }

  pub fn visual_time(&self) -> Seconds {
    self.visual_time
  }

  pub fn playhead_label(&self) -> String {
    format_playhead(self.visual_time)
  }

  pub fn play(&mut self) {
    self.transport.play();
    self.anchor = self.transport.position();
    self.visual_time = self.anchor;
    self.stopwatch.restart();
  }

  pub fn pause(&mut self) {
    self.transport.pause();
    self.stopwatch.stop();
    self.visual_time = self.transport.position();
  }

  pub fn toggle(&mut self) {
    if self.is_playing() {
      self.pause()
    } else {
      self.play()
    }
  }

  /// Advances the visual time, once per render tick.
  pub fn tick(&mut self) -> Seconds {
    if !self.transport.is_playing() {
      self.visual_time = self.transport.position();
      return self.visual_time;
    }

    let real = self.transport.position();
    let candidate = if real > self.anchor {
      self.anchor = real;
      self.stopwatch.restart();
      real
    } else {
      self.anchor + self.stopwatch.elapsed()
    };

    let prev_time = self.visual_time;
    let mut next_time = candidate.max(prev_time);
    let duration = self.transport.duration();
    if duration > 0.0 {
      next_time = next_time.min(duration.max(prev_time));
    }
    self.visual_time = next_time;

    if self.crossing_loop_end(prev_time, next_time) {
      debug!("Looping back to {:.3}s", self.loop_start);
      self.seek(self.loop_start);
    }

    self.visual_time
  }

  /// Moves the playhead, clamped to the length of the audio.
  pub fn seek(&mut self, time: Seconds) {
    let time = self.clamp(time);
    self.transport.seek(time);
    self.anchor = time;
    self.visual_time = time;
    if self.transport.is_playing() {
      self.stopwatch.restart();
    }
  }

  pub fn reset(&mut self) {
    self.seek(0.0)
  }

  pub fn set_loop_enabled(&mut self, enabled: bool) {
    self.loop_enabled = enabled;
  }

  pub fn is_loop_enabled(&self) -> bool {
    self.loop_enabled
  }

  /// Sets the loop region, ignored unless `start < end` once clamped.
  pub fn set_loop(&mut self, start: Seconds, end: Seconds) -> bool {
    let (start, end) = (self.clamp(start), self.clamp(end));
    if start < end {
      self.loop_start = start;
      self.loop_end = end;
      self.loop_enabled = true;
      true
    } else {
      false
    }
  }

  pub fn get_loop(&self) -> (Seconds, Seconds) {
    (self.loop_start, self.loop_end)
  }

  fn clamp(&self, time: Seconds) -> Seconds {
    let duration = self.transport.duration().max(0.0);
    time.max(0.0).min(duration)
  }

  fn crossing_loop_end(&self, prev_time: Seconds, next_time: Seconds) -> bool {
    self.loop_enabled && prev_time < self.loop_end && self.loop_end <= next_time
  }
}
