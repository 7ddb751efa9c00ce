//! Pitch trace samples and their grouping into continuous runs.

use crate::time::Seconds;

/// Largest gap between two samples of the same run.
pub const MAX_TIME_GAP: Seconds = 0.03;

/// Fastest pitch glide, in semitones per second, still drawn as one run.
pub const MAX_PITCH_VELOCITY: f64 = 25.0;

/// Jumps up to this many semitones never break a run.
pub const SOFT_MIDI_JUMP: f64 = 0.35;

/// Jumps of at least this many semitones always break a run.
pub const HARD_MIDI_JUMP: f64 = 0.75;

#[derive(Debug, PartialEq, Clone, Copy, Default)]
pub struct PitchSample {
  pub time: Seconds,
  pub pitch_hz: f64,
  pub midi: f64,
}

impl PitchSample {
  pub fn new(time: Seconds, pitch_hz: f64, midi: f64) -> PitchSample {
    PitchSample {
      time,
      pitch_hz,
      midi,
    }
  }

  pub fn is_voiced(&self) -> bool {
    self.midi > 0.0
  }
}

pub fn hz_to_midi(hz: f64) -> f64 {
  if hz > 0.0 {
    69.0 + 12.0 * (hz / 440.0).log2()
  } else {
    0.0
  }
}

pub fn is_continuous(prev: &PitchSample, curr: &PitchSample) -> bool {
  if !prev.is_voiced() || !curr.is_voiced() {
    return false;
  }

  let dt = curr.time - prev.time;
  if dt <= 0.0 || dt > MAX_TIME_GAP {
    return false;
  }

  // Samples closer than half the gap are one analysis hop apart, their
  // slope is too noisy to be a glide rate.
  let dm = (curr.midi - prev.midi).abs();
  if dt >= MAX_TIME_GAP / 2.0 && dm / dt > MAX_PITCH_VELOCITY {
    return false;
  }

  if dm <= SOFT_MIDI_JUMP {
    true
  } else if dm >= HARD_MIDI_JUMP {
    false
  } else {
    dt < MAX_TIME_GAP / 2.0
  }
}

/// Splits a trace into its continuous runs of voiced samples.
pub fn continuity_runs(samples: &[PitchSample]) -> ContinuityRuns {
  ContinuityRuns { samples, next: 0 }
}

pub struct ContinuityRuns<'a> {
  samples: &'a [PitchSample],
  next: usize,
}

impl<'a> Iterator for ContinuityRuns<'a> {
  type Item = &'a [PitchSample];

  fn next(&mut self) -> Option<Self::Item> {
    let samples = self.samples;
    let start = self.next + samples[self.next..].iter().position(PitchSample::is_voiced)?;

    let mut end = start + 1;
    while end < samples.len() && is_continuous(&samples[end - 1], &samples[end]) {
      end += 1;
    }

    self.next = end;
    Some(&samples[start..end])
  }
}
