use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use crossbeam_channel::Receiver;
use log::{info, warn};

use crate::chart::io::{read_lyrics, read_timeline, write_timeline, ChartIoError};
use crate::chart::{EditError, Lane, MoveDrag, Note, NoteEditor, NoteId, Timeline};
use crate::config::Config;
use crate::export::{ExportError, ProjectExporter, StagedProject, Transcoder};
use crate::generator::{
  load_profiles, ChartGenerator, GenerationOutcome, GenerationTicket, GeneratorError, Profile, ProfileSet,
};
use crate::settings::{Settings, SettingsStore};
use crate::time::Seconds;

pub const DEFAULT_LANES: Lane = 4;
pub const UNTITLED: &str = "untitled";

#[derive(Debug, Clone)]
pub struct StatusEntry {
  pub time: DateTime<Local>,
  pub message: String,
}

impl StatusEntry {
  pub fn line(&self) -> String {
    format!("[{}]: {}", self.time.format("%H:%M"), self.message)
  }
}

#[derive(Debug, Clone, Default)]
pub struct StatusLog {
  entries: Vec<StatusEntry>,
}

impl StatusLog {
  pub fn post<T>(&mut self, message: T)
  where
    T: Into<String>,
  {
    let message = message.into();
    if message.is_empty() {
      return;
    }
    info!("{}", message);
    self.entries.push(StatusEntry {
      time: Local::now(),
      message,
    });
  }

  pub fn entries(&self) -> &[StatusEntry] {
    self.entries.as_slice()
  }

  pub fn last(&self) -> Option<&str> {
    self.entries.last().map(|entry| entry.message.as_str())
  }

  pub fn lines(&self) -> Vec<String> {
    self.entries.iter().map(StatusEntry::line).collect()
  }
}

/// The state of one editing session: the chart being edited, the loaded
/// audio, the generator profiles and the status log shown to the user.
///
/// Every replacement of the timeline starts a new epoch. Generated charts
/// requested in an older epoch are discarded when they arrive.
pub struct Session {
  config: Config,
  settings: Box<dyn SettingsStore>,

  timeline: Timeline,
  editor: NoteEditor,
  audio_path: Option<PathBuf>,

  generator: ChartGenerator,
  exporter: ProjectExporter,
  profiles: ProfileSet,
  profile: Option<usize>,

  status: StatusLog,
  epoch: u64,
}

impl Session {
  pub fn new(config: Config, settings: Box<dyn SettingsStore>) -> Session {
    let editor = NoteEditor::new(config.editor.clone());
    let generator = ChartGenerator::new(config.generator.command.clone());
    let exporter = ProjectExporter::new(Transcoder::new(&config.transcoder));
    Session {
      config,
      settings,

      timeline: Timeline::new(UNTITLED, 0.0, DEFAULT_LANES, vec![]),
      editor,
      audio_path: None,

      generator,
      exporter,
      profiles: ProfileSet::default(),
      profile: None,

      status: StatusLog::default(),
      epoch: 0,
    }
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  pub fn timeline(&self) -> &Timeline {
    &self.timeline
  }

  pub fn editor(&self) -> &NoteEditor {
    &self.editor
  }

  pub fn status(&self) -> &StatusLog {
    &self.status
  }

  pub fn epoch(&self) -> u64 {
    self.epoch
  }

  pub fn audio_path(&self) -> Option<&Path> {
    self.audio_path.as_ref().map(PathBuf::as_path)
  }

  /// Registers the raw audio of the song, its length widens the timeline.
  pub fn set_audio<P>(&mut self, path: P, length: Option<Seconds>)
  where
    P: Into<PathBuf>,
  {
    let path = path.into();
    self.status.post(format!("Loaded Raw Audio: {}", file_name(&path)));
    self.timeline.set_audio_length(length);
    self.audio_path = Some(path);
  }

  fn replace_timeline(&mut self, mut timeline: Timeline) {
    timeline.set_audio_length(self.timeline.audio_length());
    self.timeline = timeline;
    self.epoch += 1;
  }

  pub fn import_chart<P>(&mut self, path: P) -> Result<(), ChartIoError>
  where
    P: AsRef<Path>,
  {
    let path = path.as_ref();
    match read_timeline(path) {
      Ok(timeline) => {
        self.replace_timeline(timeline);
        self.status.post(format!("Imported Notes: {}", file_name(path)));
        Ok(())
      }
      Err(err) => {
        warn!("Failed to import {}: {}", path.display(), err);
        self.status.post("Failed to load timeline from selected file");
        Err(err)
      }
    }
  }

  pub fn load_lyrics<P>(&mut self, path: P) -> Result<usize, ChartIoError>
  where
    P: AsRef<Path>,
  {
    let path = path.as_ref();
    match read_lyrics(path) {
      Ok(lyrics) => {
        let count = lyrics.len();
        self.timeline.set_lyrics(lyrics);
        self.status.post(format!("Loaded {} lyric phrases.", count));
        Ok(count)
      }
      Err(err) => {
        warn!("Failed to load lyrics from {}: {}", path.display(), err);
        self.status.post("Failed to load lyrics from selected file");
        Err(err)
      }
    }
  }

  /// Saves the chart, returns whether there was anything to save.
  pub fn save_chart<P>(&mut self, path: P) -> Result<bool, ChartIoError>
  where
    P: AsRef<Path>,
  {
    let path = path.as_ref();
    if self.timeline.notes().is_empty() {
      self.status.post("Nothing to save, the chart has no notes.");
      return Ok(false);
    }
    match write_timeline(path, &self.timeline) {
      Ok(()) => {
        self.status.post(format!("Saved timeline to: {}", file_name(path)));
        Ok(true)
      }
      Err(err) => {
        warn!("{}", err);
        self.status.post(format!("Failed to save timeline: {}", err));
        Err(err)
      }
    }
  }

  pub fn clear(&mut self) {
    let lanes = self.timeline.lanes();
    self.replace_timeline(Timeline::new(UNTITLED, 0.0, lanes, vec![]));
    self.status.post("Cleared the timeline.");
  }

  pub fn add_note(&mut self, lane: Lane, time: Seconds) -> Result<NoteId, EditError> {
    let result = self.editor.add_note(&mut self.timeline, lane, time);
    self.report(&result);
    result
  }

  pub fn remove_note(&mut self, id: NoteId) -> Result<Note, EditError> {
    let result = self.editor.remove_note(&mut self.timeline, id);
    match result {
      Ok(ref note) => self
        .status
        .post(format!("Removed note at {:.2}s, lane {}", note.start(), note.lane())),
      Err(ref err) => self.report_error(err),
    }
    result
  }

  pub fn begin_move(&self, id: NoteId) -> Result<MoveDrag, EditError> {
    self.editor.begin_move(&self.timeline, id)
  }

  pub fn drag_to(&mut self, drag: &MoveDrag, start: Seconds, lane: Lane) -> Result<(), EditError> {
    drag.drag_to(&mut self.timeline, start, lane)
  }

  pub fn release(&mut self, drag: MoveDrag) -> Result<(), EditError> {
    let result = drag.release(&mut self.timeline);
    self.report(&result);
    result
  }

  pub fn move_note(&mut self, id: NoteId, start: Seconds, lane: Lane) -> Result<(), EditError> {
    let result = self.editor.move_note(&mut self.timeline, id, start, lane);
    self.report(&result);
    result
  }

  pub fn resize_left(&mut self, id: NoteId, start: Seconds) -> Result<Seconds, EditError> {
    let result = self.editor.resize_left(&mut self.timeline, id, start);
    self.report(&result);
    result
  }

  pub fn resize_right(&mut self, id: NoteId, end: Seconds) -> Result<Seconds, EditError> {
    let result = self.editor.resize_right(&mut self.timeline, id, end);
    self.report(&result);
    result
  }

  pub fn split_note(&mut self, id: NoteId, time: Seconds) -> Result<(NoteId, NoteId), EditError> {
    let result = self.editor.split_note(&mut self.timeline, id, time);
    self.report(&result);
    result
  }

  fn report<T>(&mut self, result: &Result<T, EditError>) {
    if let Err(err) = result {
      self.report_error(err);
    }
  }

  fn report_error(&mut self, err: &EditError) {
    warn!("{}", err);
    self.status.post(err.to_string());
  }

  /// The folder chosen by the user, else the configured one.
  pub fn config_folder(&mut self) -> PathBuf {
    let settings = self.load_settings();
    self.folder_from(&settings)
  }

  fn folder_from(&self, settings: &Settings) -> PathBuf {
    settings
      .config_folder
      .clone()
      .unwrap_or_else(|| self.config.generator.config_folder.clone())
  }

  pub fn profiles(&self) -> &ProfileSet {
    &self.profiles
  }

  pub fn profile(&self) -> Option<&Profile> {
    self.profile.and_then(|index| self.profiles.profiles.get(index))
  }

  pub fn profile_mut(&mut self) -> Option<&mut Profile> {
    let index = self.profile?;
    self.profiles.profiles.get_mut(index)
  }

  /// Reloads the profiles and reselects the last used one.
  pub fn reload_profiles(&mut self) {
    let settings = self.load_settings();
    let folder = self.folder_from(&settings);
    self
      .status
      .post(format!("Loading configurations: {}", folder.display()));

    self.profiles = load_profiles(&folder);
    for err in self.profiles.errors.iter() {
      self.status.post(format!("Error loading config: {}", err));
    }

    let last = settings.last_profile;
    let selected = self
      .profiles
      .select(last.as_deref())
      .map(|profile| profile.path().to_path_buf());
    self.profile = selected.and_then(|path| {
      self
        .profiles
        .profiles
        .iter()
        .position(|profile| profile.path() == path.as_path())
    });
  }

  pub fn select_profile(&mut self, name: &str) -> bool {
    match self.profiles.profiles.iter().position(|profile| profile.name() == name) {
      Some(index) => {
        self.profile = Some(index);
        let mut settings = self.load_settings();
        settings.last_profile = Some(name.to_string());
        self.store_settings(&settings);
        self.status.post(format!("Loaded configuration: {}.json", name));
        true
      }
      None => {
        self.status.post(format!("Configuration not found: {}", name));
        false
      }
    }
  }

  pub fn save_profile(&mut self) -> Result<(), GeneratorError> {
    let result = match self.profile() {
      Some(profile) => profile.save().map(|()| profile.name().to_string()),
      None => return Ok(()),
    };
    match result {
      Ok(name) => {
        self.status.post(format!("Saved configuration: {}", name));
        Ok(())
      }
      Err(err) => self.profile_error("Error saving config", err),
    }
  }

  pub fn save_profile_as<P>(&mut self, path: P) -> Result<(), GeneratorError>
  where
    P: Into<PathBuf>,
  {
    let path = path.into();
    let result = match self.profile() {
      Some(profile) => profile.save_as(path.clone()),
      None => return Ok(()),
    };
    match result {
      Ok(_) => {
        self
          .status
          .post(format!("Saved new configuration: {}", file_name(&path)));
        self.reload_profiles();
        Ok(())
      }
      Err(err) => self.profile_error("Error saving config", err),
    }
  }

  pub fn delete_profile(&mut self) -> Result<(), GeneratorError> {
    let profile = match self.profile().cloned() {
      Some(profile) => profile,
      None => return Ok(()),
    };
    let name = profile.name().to_string();
    match profile.delete() {
      Ok(()) => {
        self.status.post(format!("Deleted configuration: {}", name));
        self.reload_profiles();
        Ok(())
      }
      Err(err) => self.profile_error("Error deleting config", err),
    }
  }

  fn profile_error(&mut self, context: &str, err: GeneratorError) -> Result<(), GeneratorError> {
    warn!("{}: {}", context, err);
    self.status.post(format!("{}: {}", context, err));
    Err(err)
  }

  fn load_settings(&mut self) -> Settings {
    match self.settings.load() {
      Ok(settings) => settings,
      Err(err) => {
        warn!("{}", err);
        self.status.post(format!("Failed to load settings: {}", err));
        Settings::default()
      }
    }
  }

  fn store_settings(&mut self, settings: &Settings) {
    if let Err(err) = self.settings.save(settings) {
      warn!("{}", err);
      self.status.post(format!("Failed to save settings: {}", err));
    }
  }

  /// Starts generating a chart for the loaded audio with the selected
  /// profile. Pending generations from earlier requests become stale.
  pub fn request_generation(&mut self) -> Result<Receiver<GenerationOutcome>, GeneratorError> {
    let audio = match self.audio_path.clone() {
      Some(audio) => audio,
      None => {
        self.status.post("No audio loaded.");
        return Err(GeneratorError::NoAudio);
      }
    };
    let settings = self
      .profile()
      .map(|profile| profile.settings().clone())
      .unwrap_or_default();

    self.epoch += 1;
    let ticket = GenerationTicket::new(self.epoch);
    self.status.post("Starting pitch extraction.");
    self.generator.spawn(audio, settings, ticket).map_err(|err| {
      warn!("{}", err);
      self.status.post(err.to_string());
      err
    })
  }

  /// Adopts a generated chart unless the session moved on since it was
  /// requested. Returns whether the timeline was replaced.
  pub fn complete_generation(&mut self, outcome: GenerationOutcome) -> bool {
    if outcome.ticket.epoch() != self.epoch {
      info!(
        "Discarding chart for {} from epoch {}, current is {}",
        outcome.audio.display(),
        outcome.ticket.epoch(),
        self.epoch
      );
      self.status.post("Discarded an outdated chart generation.");
      return false;
    }

    match outcome.result {
      Ok(chart) => {
        self.status.post("Pitch extraction finished.");
        self.import_chart(chart).is_ok()
      }
      Err(err) => {
        warn!("{}", err);
        self.status.post("Chart generation failed.");
        self.status.post(err.to_string());
        false
      }
    }
  }

  pub fn export(&mut self, dir: &Path) -> Result<StagedProject, ExportError> {
    let result = match self.audio_path {
      Some(ref audio) => self.exporter.export(&self.timeline, audio, dir),
      None => Err(ExportError::AudioNotFound { path: String::new() }),
    };
    match result {
      Ok(ref staged) => self
        .status
        .post(format!("Export completed: {}", staged.dir.display())),
      Err(ref err) => {
        warn!("{}", err);
        self.status.post(format!("Export failed: {}", err));
      }
    }
    result
  }
}

fn file_name(path: &Path) -> String {
  path
    .file_name()
    .map(|name| name.to_string_lossy().to_string())
    .unwrap_or_else(|| path.display().to_string())
}
