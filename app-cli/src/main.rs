use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use log::{debug, info, LevelFilter};

use failure;
use failure::{Error, Fail};

use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Config as LogConfig, Root};
use log4rs::encode::pattern::PatternEncoder;

use chart_studio_core::chart::pitch::continuity_runs;
use chart_studio_core::chart::{Lane, NoteId};
use chart_studio_core::config::Config;
use chart_studio_core::session::Session;
use chart_studio_core::settings::TomlSettingsStore;
use chart_studio_core::time::{format_playhead, Seconds};

mod watcher;
use crate::watcher::ConfigWatcher;

const CHART_STUDIO_CONFIG: &str = "CHART_STUDIO_CONFIG";
const DEFAULT_CHART_STUDIO_CONFIG: &str = "studio.toml";

const CHART_STUDIO_LOG_CONFIG: &str = "CHART_STUDIO_LOG_CONFIG";
const DEFAULT_CHART_STUDIO_LOG_CONFIG: &str = "log4rs.yaml";

const CHART_STUDIO_SETTINGS: &str = "CHART_STUDIO_SETTINGS";
const DEFAULT_CHART_STUDIO_SETTINGS: &str = "settings.toml";

#[derive(Debug, Fail)]
enum MainError {
  #[fail(display = "Failed to init logging: {}", cause)]
  LoggingInit { cause: String },

  #[fail(display = "There is no note #{} in the chart", index)]
  NoteIndex { index: usize },

  #[fail(display = "{}", message)]
  Command { message: String },
}

#[derive(Parser)]
#[command(name = "chart-studio", about = "Edit note charts aligned to a vocal pitch trace")]
struct Cli {
  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Summarise a chart and verify that no lane has overlapping notes
  Check { chart: PathBuf },

  /// Add a note, bumping its neighbours out of the way
  Add {
    chart: PathBuf,
    #[arg(short, long)]
    lane: Lane,
    #[arg(short, long)]
    time: Seconds,
    /// Where to save the result, the input chart by default
    #[arg(short, long)]
    out: Option<PathBuf>,
  },

  /// Split the n-th note (in start order) in two at the given time
  Split {
    chart: PathBuf,
    #[arg(short, long)]
    index: usize,
    #[arg(short, long)]
    time: Seconds,
    #[arg(short, long)]
    out: Option<PathBuf>,
  },

  /// Remove the n-th note (in start order)
  Remove {
    chart: PathBuf,
    #[arg(short, long)]
    index: usize,
    #[arg(short, long)]
    out: Option<PathBuf>,
  },

  /// List the generator profiles, optionally selecting one
  Profiles {
    #[arg(short, long)]
    select: Option<String>,
  },

  /// Generate a chart from a vocal track with the external generator
  Generate {
    audio: PathBuf,
    #[arg(short, long)]
    profile: Option<String>,
    /// Copy the generated chart to this path
    #[arg(short, long)]
    out: Option<PathBuf>,
  },

  /// Stage a project directory with the transcoded song, chart and metadata
  Export {
    chart: PathBuf,
    #[arg(short, long)]
    audio: PathBuf,
    #[arg(short, long)]
    dir: PathBuf,
  },

  /// Watch the profiles folder and reload on changes
  Watch,
}

fn main() -> Result<(), Error> {
  let cli = Cli::parse();

  init_logging()?;

  let config = init_config()?;

  let mut session = init_session(config);

  let result = match cli.command {
    Commands::Check { chart } => check(&mut session, &chart),
    Commands::Add { chart, lane, time, out } => add(&mut session, &chart, lane, time, out),
    Commands::Split {
      chart,
      index,
      time,
      out,
    } => split(&mut session, &chart, index, time, out),
    Commands::Remove { chart, index, out } => remove(&mut session, &chart, index, out),
    Commands::Profiles { select } => profiles(&mut session, select),
    Commands::Generate { audio, profile, out } => generate(&mut session, audio, profile, out),
    Commands::Export { chart, audio, dir } => export(&mut session, &chart, audio, &dir),
    Commands::Watch => watch(&mut session),
  };

  for line in session.status().lines() {
    eprintln!("{}", line);
  }

  result
}

fn init_logging() -> Result<(), Error> {
  let log_config_path =
    std::env::var(CHART_STUDIO_LOG_CONFIG).unwrap_or_else(|_| DEFAULT_CHART_STUDIO_LOG_CONFIG.to_string());

  if Path::new(&log_config_path).exists() {
    log4rs::init_file(log_config_path.as_str(), Default::default()).map_err(|err| MainError::LoggingInit {
      cause: err.to_string(),
    })?;
  } else {
    let stderr = ConsoleAppender::builder()
      .target(Target::Stderr)
      .encoder(Box::new(PatternEncoder::new("{d(%H:%M:%S)} {h({l})} {t} - {m}{n}")))
      .build();
    let log_config = LogConfig::builder()
      .appender(Appender::builder().build("stderr", Box::new(stderr)))
      .build(Root::builder().appender("stderr").build(LevelFilter::Warn))
      .map_err(|err| MainError::LoggingInit {
        cause: err.to_string(),
      })?;
    log4rs::init_config(log_config).map_err(|err| MainError::LoggingInit {
      cause: err.to_string(),
    })?;
  }

  Ok(())
}

fn init_config() -> Result<Config, Error> {
  let config_path =
    std::env::var(CHART_STUDIO_CONFIG).unwrap_or_else(|_| DEFAULT_CHART_STUDIO_CONFIG.to_string());

  if !Path::new(&config_path).exists() {
    info!("No configuration at {}, using defaults", config_path);
    return Ok(Config::default());
  }

  info!("Loading configuration from {} ...", config_path);
  let config = Config::from_file(config_path.as_str())?;
  debug!("{:#?}", config);

  Ok(config)
}

fn init_session(config: Config) -> Session {
  let settings_path =
    std::env::var(CHART_STUDIO_SETTINGS).unwrap_or_else(|_| DEFAULT_CHART_STUDIO_SETTINGS.to_string());
  debug!("User settings at {}", settings_path);

  Session::new(config, Box::new(TomlSettingsStore::new(settings_path)))
}

fn check(session: &mut Session, chart: &Path) -> Result<(), Error> {
  session.import_chart(chart)?;
  let timeline = session.timeline();

  println!("name:    {}", timeline.name());
  println!("length:  {}", format_playhead(timeline.width()));
  println!("lanes:   {}", timeline.lanes());
  println!("notes:   {}", timeline.notes().len());
  for lane in 0..timeline.lanes() {
    println!("  lane {}: {}", lane, timeline.notes().notes_in_lane(lane).count());
  }
  println!("pitches: {} samples, {} runs", timeline.pitches().len(), continuity_runs(timeline.pitches()).count());
  println!("lyrics:  {}", timeline.lyrics().len());

  match timeline.notes().find_overlap() {
    Some((a, b)) => {
      let (a, b) = (timeline.notes().get(a), timeline.notes().get(b));
      if let (Some(a), Some(b)) = (a, b) {
        println!(
          "overlap: lane {} at {:.2}s and {:.2}s",
          a.lane(),
          a.start(),
          b.start()
        );
      }
      Err(
        MainError::Command {
          message: "The chart has overlapping notes".to_string(),
        }
        .into(),
      )
    }
    None => Ok(()),
  }
}

fn note_at(session: &Session, index: usize) -> Result<NoteId, Error> {
  session
    .timeline()
    .notes()
    .nth(index)
    .map(|note| note.id())
    .ok_or_else(|| MainError::NoteIndex { index }.into())
}

fn save(session: &mut Session, chart: &Path, out: Option<PathBuf>) -> Result<(), Error> {
  let path = out.unwrap_or_else(|| chart.to_path_buf());
  session.save_chart(&path)?;
  Ok(())
}

fn add(session: &mut Session, chart: &Path, lane: Lane, time: Seconds, out: Option<PathBuf>) -> Result<(), Error> {
  session.import_chart(chart)?;
  session.add_note(lane, time)?;
  save(session, chart, out)
}

fn split(session: &mut Session, chart: &Path, index: usize, time: Seconds, out: Option<PathBuf>) -> Result<(), Error> {
  session.import_chart(chart)?;
  let id = note_at(session, index)?;
  session.split_note(id, time)?;
  save(session, chart, out)
}

fn remove(session: &mut Session, chart: &Path, index: usize, out: Option<PathBuf>) -> Result<(), Error> {
  session.import_chart(chart)?;
  let id = note_at(session, index)?;
  session.remove_note(id)?;
  save(session, chart, out)
}

fn profiles(session: &mut Session, select: Option<String>) -> Result<(), Error> {
  session.reload_profiles();
  if let Some(name) = select {
    if !session.select_profile(&name) {
      return Err(
        MainError::Command {
          message: format!("Unknown profile {}", name),
        }
        .into(),
      );
    }
  }

  let selected = session.profile().map(|profile| profile.path().to_path_buf());
  for profile in session.profiles().profiles.iter() {
    let mark = if Some(profile.path()) == selected.as_ref().map(PathBuf::as_path) {
      "*"
    } else {
      " "
    };
    println!("{} {:<24} {}", mark, profile.name(), profile.path().display());
  }
  Ok(())
}

fn generate(
  session: &mut Session,
  audio: PathBuf,
  profile: Option<String>,
  out: Option<PathBuf>,
) -> Result<(), Error> {
  session.reload_profiles();
  if let Some(name) = profile {
    session.select_profile(&name);
  }

  session.set_audio(audio, None);
  let outcome_rx = session.request_generation()?;
  let outcome = outcome_rx.recv().map_err(|_| MainError::Command {
    message: "The generator thread stopped without a result".to_string(),
  })?;

  if !session.complete_generation(outcome) {
    return Err(
      MainError::Command {
        message: "Chart generation failed".to_string(),
      }
      .into(),
    );
  }

  println!("{} notes generated", session.timeline().notes().len());
  match out {
    Some(path) => {
      session.save_chart(&path)?;
      Ok(())
    }
    None => Ok(()),
  }
}

fn export(session: &mut Session, chart: &Path, audio: PathBuf, dir: &Path) -> Result<(), Error> {
  session.import_chart(chart)?;
  session.set_audio(audio, None);
  let staged = session.export(dir)?;
  println!("{}", staged.audio.display());
  println!("{}", staged.chart.display());
  println!("{}", staged.metadata.display());
  Ok(())
}

fn watch(session: &mut Session) -> Result<(), Error> {
  let folder = session.config_folder();
  let debounce = Duration::from_millis(session.config().watch.debounce_ms);
  let watcher = ConfigWatcher::start(&folder, debounce)?;
  let changes = watcher.subscribe();
  session.reload_profiles();

  println!("Watching {} for profile changes", folder.display());
  for change in changes.iter() {
    debug!("{:?}", change);
    session.reload_profiles();
    let names: Vec<&str> = session.profiles().profiles.iter().map(|profile| profile.name()).collect();
    println!("profiles: {}", names.join(", "));
    if let Some(line) = session.status().lines().last() {
      println!("{}", line);
    }
  }

  watcher.stop()?;
  Ok(())
}
