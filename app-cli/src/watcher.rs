use std::path::{Path, PathBuf};
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use failure::Fail;
use log::{debug, info, warn};
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

#[derive(Debug, Fail)]
pub enum WatcherError {
  #[fail(display = "The config folder {} doesn't exist", path)]
  MissingFolder { path: String },

  #[fail(display = "Failed to watch {}: {}", path, cause)]
  Watch { path: String, cause: String },

  #[fail(display = "Failed to create the watcher thread: {}", cause)]
  Start { cause: String },

  #[fail(display = "Failed to join the watcher thread")]
  Stop,
}

/// Sent to subscribers once per burst of changes in the config folder.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigsChanged {
  pub paths: Vec<PathBuf>,
}

pub enum Protocol {
  Stop,

  Subscribe(Sender<ConfigsChanged>),

  Changed(Vec<PathBuf>),
}

/// Profiles are added, removed or renamed, content edits are ignored.
pub fn is_config_change(event: &Event) -> bool {
  let relevant_kind = match event.kind {
    EventKind::Create(_) | EventKind::Remove(_) => true,
    EventKind::Modify(ModifyKind::Name(_)) => true,
    _ => false,
  };
  relevant_kind && event.paths.iter().any(|path| is_json(path))
}

fn is_json(path: &Path) -> bool {
  path
    .extension()
    .and_then(|ext| ext.to_str())
    .map_or(false, |ext| ext.eq_ignore_ascii_case("json"))
}

struct WatcherThread {
  debounce: Duration,
  subscribers: Vec<Sender<ConfigsChanged>>,
  changed: bool,
  pending: Vec<PathBuf>,
}

impl WatcherThread {
  fn new(debounce: Duration) -> WatcherThread {
    WatcherThread {
      debounce,
      subscribers: Vec::new(),
      changed: false,
      pending: Vec::new(),
    }
  }

  pub fn handle_messages(&mut self, protocol_rx: Receiver<Protocol>) {
    loop {
      let msg = if !self.changed {
        match protocol_rx.recv() {
          Ok(msg) => msg,
          Err(_) => break,
        }
      } else {
        match protocol_rx.recv_timeout(self.debounce) {
          Ok(msg) => msg,
          Err(RecvTimeoutError::Timeout) => {
            self.publish();
            continue;
          }
          Err(RecvTimeoutError::Disconnected) => break,
        }
      };

      match msg {
        Protocol::Stop => break,

        Protocol::Subscribe(subscriber) => self.subscribers.push(subscriber),

        Protocol::Changed(paths) => {
          debug!("Config change: {:?}", paths);
          self.changed = true;
          for path in paths {
            if !self.pending.contains(&path) {
              self.pending.push(path);
            }
          }
        }
      }
    }
  }

  fn publish(&mut self) {
    self.changed = false;
    let notification = ConfigsChanged {
      paths: self.pending.drain(..).collect(),
    };
    info!("Configurations changed");
    self
      .subscribers
      .retain(|subscriber| subscriber.send(notification.clone()).is_ok());
  }
}

/// Watches the config folder, notifying subscribers after changes settle.
pub struct ConfigWatcher {
  handler: JoinHandle<()>,
  protocol_tx: Sender<Protocol>,
  _watcher: RecommendedWatcher,
}

impl ConfigWatcher {
  pub fn new_channel() -> (Sender<Protocol>, Receiver<Protocol>) {
    crossbeam_channel::unbounded::<Protocol>()
  }

  pub fn start(folder: &Path, debounce: Duration) -> Result<ConfigWatcher, WatcherError> {
    info!("Watching configurations at {} ...", folder.display());

    if !folder.is_dir() {
      return Err(WatcherError::MissingFolder {
        path: folder.display().to_string(),
      });
    }

    let (protocol_tx, protocol_rx) = Self::new_channel();
    let handler = spawn_debouncer(debounce, protocol_rx)?;

    let events_tx = protocol_tx.clone();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
      Ok(event) => {
        if is_config_change(&event) {
          drop(events_tx.send(Protocol::Changed(event.paths)));
        }
      }
      Err(err) => warn!("Watch error: {}", err),
    })
    .map_err(|err| WatcherError::Watch {
      path: folder.display().to_string(),
      cause: err.to_string(),
    })?;

    watcher
      .watch(folder, RecursiveMode::NonRecursive)
      .map_err(|err| WatcherError::Watch {
        path: folder.display().to_string(),
        cause: err.to_string(),
      })?;

    Ok(ConfigWatcher {
      handler,
      protocol_tx,
      _watcher: watcher,
    })
  }

  pub fn subscribe(&self) -> Receiver<ConfigsChanged> {
    let (changes_tx, changes_rx) = crossbeam_channel::unbounded();
    drop(self.protocol_tx.send(Protocol::Subscribe(changes_tx)));
    changes_rx
  }

  /// Forces a reload notification, as when the config folder is switched.
  pub fn raise_changed(&self) {
    drop(self.protocol_tx.send(Protocol::Changed(Vec::new())));
  }

  pub fn stop(self) -> Result<(), WatcherError> {
    info!("Stopping the config watcher ...");

    let ConfigWatcher {
      handler,
      protocol_tx,
      _watcher,
    } = self;
    drop(_watcher);

    protocol_tx
      .send(Protocol::Stop)
      .map_err(|_| WatcherError::Stop)
      .and_then(|()| handler.join().map_err(|_| WatcherError::Stop))
  }
}

fn spawn_debouncer(debounce: Duration, protocol_rx: Receiver<Protocol>) -> Result<JoinHandle<()>, WatcherError> {
  thread::Builder::new()
    .name("config-watcher".into())
    .spawn(move || WatcherThread::new(debounce).handle_messages(protocol_rx))
    .map_err(|err| WatcherError::Start {
      cause: err.to_string(),
    })
}
