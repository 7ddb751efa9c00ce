pub mod stopwatch;

pub use self::stopwatch::{ManualStopwatch, MonotonicStopwatch, Stopwatch};

pub type Seconds = f64;

const SECONDS_PER_MINUTE: u64 = 60;
const HUNDREDTHS_PER_SECOND: u64 = 100;

///! Formats a time as `mm:ss.ff`, negative times are shown as zero
pub fn format_playhead(time: Seconds) -> String {
  let hundredths = (time.max(0.0) * HUNDREDTHS_PER_SECOND as f64).floor() as u64;
  let seconds = hundredths / HUNDREDTHS_PER_SECOND;
  format!(
    "{:02}:{:02}.{:02}",
    seconds / SECONDS_PER_MINUTE,
    seconds % SECONDS_PER_MINUTE,
    hundredths % HUNDREDTHS_PER_SECOND
  )
}
