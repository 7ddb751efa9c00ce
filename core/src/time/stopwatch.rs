use std::time::Instant;

use super::Seconds;

/// Source of elapsed time between two transport polls.
pub trait Stopwatch {
  /// Time since the last restart, frozen while stopped.
  fn elapsed(&self) -> Seconds;

  /// Resets the elapsed time to zero and starts running.
  fn restart(&mut self);

  fn stop(&mut self);

  fn is_running(&self) -> bool;
}

#[derive(Debug, Clone)]
pub struct MonotonicStopwatch {
  started: Option<Instant>,
  frozen: Seconds,
}

impl MonotonicStopwatch {
  pub fn new() -> MonotonicStopwatch {
    MonotonicStopwatch {
      started: None,
      frozen: 0.0,
    }
  }
}

impl Default for MonotonicStopwatch {
  fn default() -> MonotonicStopwatch {
    MonotonicStopwatch::new()
  }
}

impl Stopwatch for MonotonicStopwatch {
  fn elapsed(&self) -> Seconds {
    self
      .started
      .map_or(self.frozen, |started| started.elapsed().as_secs_f64())
  }

  fn restart(&mut self) {
    self.frozen = 0.0;
    self.started = Some(Instant::now());
  }

  fn stop(&mut self) {
    self.frozen = self.elapsed();
    self.started = None;
  }

  fn is_running(&self) -> bool {
    self.started.is_some()
  }
}

///! Stopwatch driven by hand, for offline rendering and tests
#[derive(Debug, Clone)]
pub struct ManualStopwatch {
  now: Seconds,
  started_at: Seconds,
  stopped_at: Option<Seconds>,
}

impl ManualStopwatch {
  pub fn new() -> ManualStopwatch {
    ManualStopwatch {
      now: 0.0,
      started_at: 0.0,
      stopped_at: Some(0.0),
    }
  }

  pub fn advance(&mut self, delta: Seconds) {
    self.now += delta.max(0.0);
  }
}

impl Default for ManualStopwatch {
  fn default() -> ManualStopwatch {
    ManualStopwatch::new()
  }
}

impl Stopwatch for ManualStopwatch {
  fn elapsed(&self) -> Seconds {
    self.stopped_at.unwrap_or(self.now) - self.started_at
  }

  fn restart(&mut self) {
    self.started_at = self.now;
    self.stopped_at = None;
  }

  fn stop(&mut self) {
    if self.stopped_at.is_none() {
      self.stopped_at = Some(self.now);
    }
  }

  fn is_running(&self) -> bool {
    self.stopped_at.is_none()
  }
}

#[cfg(test)]
mod test {

  use approx::assert_abs_diff_eq;

  use super::{ManualStopwatch, MonotonicStopwatch, Stopwatch};

  #[test]
  pub fn manual_stopwatch() {
    let mut stopwatch = ManualStopwatch::new();
    stopwatch.advance(1.0);
    assert_eq!(stopwatch.elapsed(), 0.0);
    assert!(!stopwatch.is_running());

    stopwatch.restart();
    stopwatch.advance(0.25);
    stopwatch.advance(0.25);
    assert_abs_diff_eq!(stopwatch.elapsed(), 0.5);

    stopwatch.stop();
    stopwatch.advance(1.0);
    assert_abs_diff_eq!(stopwatch.elapsed(), 0.5);

    stopwatch.restart();
    assert_eq!(stopwatch.elapsed(), 0.0);
  }

  #[test]
  pub fn manual_stopwatch_default_is_stopped() {
    let mut stopwatch = ManualStopwatch::default();
    assert!(!stopwatch.is_running());
    stopwatch.advance(1.0);
    assert_eq!(stopwatch.elapsed(), 0.0);
  }

  #[test]
  pub fn monotonic_stopwatch() {
    let mut stopwatch = MonotonicStopwatch::new();
    assert_eq!(stopwatch.elapsed(), 0.0);
    stopwatch.restart();
    assert!(stopwatch.is_running());
    let first = stopwatch.elapsed();
    assert!(stopwatch.elapsed() >= first);
    stopwatch.stop();
    let frozen = stopwatch.elapsed();
    assert_eq!(stopwatch.elapsed(), frozen);
    assert!(!stopwatch.is_running());
  }
}
