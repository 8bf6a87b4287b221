/// Preference persistence
///
/// This module handles:
/// - The `PreferenceStore` seam (local JSON file or backend endpoint)
/// - Locked, atomic writes of the local preference file
/// - Fire-and-forget publishing of preference changes on a worker thread

use crate::api::ApiClient;
use crate::types::{PreferenceUpdate, StoredPreferences};
use fs2::FileExt;
use log::{debug, warn};
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

/// Somewhere durable view preferences live
pub trait PreferenceStore: Send + Sync {
    /// Stored preferences, or None when nothing was saved yet
    fn get(&self) -> Result<Option<StoredPreferences>, String>;

    /// Merge a partial update into the stored preferences
    fn update(&self, update: &PreferenceUpdate) -> Result<(), String>;

    /// Short label for log lines
    fn describe(&self) -> String;
}

/// Default location of the local preference file
pub fn default_preferences_path() -> PathBuf {
    dirs::config_dir()
        .map(|p| p.join("chemdata"))
        .unwrap_or_else(|| PathBuf::from(".chemdata"))
        .join("preferences.json")
}

/// Preferences kept in a JSON file on this machine
pub struct LocalPreferenceStore {
    path: PathBuf,
}

impl LocalPreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read(&self) -> Result<Option<StoredPreferences>, String> {
        if !self.path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&self.path)
            .map_err(|e| format!("Failed to read preferences from {}: {}", self.path.display(), e))?;
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| format!("Invalid preference file {}: {}", self.path.display(), e))
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_else(|| "preferences.json".into());
        name.push(suffix);
        self.path.with_file_name(name)
    }
}

impl PreferenceStore for LocalPreferenceStore {
    fn get(&self) -> Result<Option<StoredPreferences>, String> {
        self.read()
    }

    fn update(&self, update: &PreferenceUpdate) -> Result<(), String> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| format!("Failed to create {}: {}", parent.display(), e))?;
        }

        // Serialize writers across processes; released when the file drops
        let lock_path = self.sibling(".lock");
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|e| format!("Failed to open {}: {}", lock_path.display(), e))?;
        lock_file.lock_exclusive().map_err(|e| format!("Failed to lock {}: {}", lock_path.display(), e))?;

        let mut prefs = self.read()?.unwrap_or_default();
        prefs.apply(update);

        let json =
            serde_json::to_string_pretty(&prefs).map_err(|e| format!("Failed to encode preferences: {}", e))?;
        let tmp_path = self.sibling(".tmp");
        fs::write(&tmp_path, json).map_err(|e| format!("Failed to write {}: {}", tmp_path.display(), e))?;
        fs::rename(&tmp_path, &self.path)
            .map_err(|e| format!("Failed to replace {}: {}", self.path.display(), e))?;

        debug!("saved preferences to {}", self.path.display());
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Preferences kept on the backend for the logged-in user
pub struct RemotePreferenceStore {
    client: Arc<ApiClient>,
}

impl RemotePreferenceStore {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

impl PreferenceStore for RemotePreferenceStore {
    fn get(&self) -> Result<Option<StoredPreferences>, String> {
        self.client.preferences().map(Some)
    }

    fn update(&self, update: &PreferenceUpdate) -> Result<(), String> {
        self.client.update_preferences(update).map(|_| ())
    }

    fn describe(&self) -> String {
        format!("{} (user {})", self.client.session().base_url(), self.client.session().user().username)
    }
}

/// Outcome of all publishes made through one publisher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PublishSummary {
    pub applied: usize,
    pub failed: usize,
}

/// Sends preference updates to a store without blocking the caller
///
/// Updates are applied on a worker thread in the order they were published.
/// Failures are logged and counted; the caller never waits on them and its
/// local state is never rolled back.
pub struct PreferencePublisher {
    sender: Option<Sender<PreferenceUpdate>>,
    worker: Option<JoinHandle<PublishSummary>>,
}

impl PreferencePublisher {
    pub fn spawn(store: Arc<dyn PreferenceStore>) -> Self {
        let (sender, receiver) = mpsc::channel::<PreferenceUpdate>();
        let worker = thread::spawn(move || {
            let mut summary = PublishSummary::default();
            for update in receiver {
                match store.update(&update) {
                    Ok(()) => {
                        debug!("published {:?} to {}", update, store.describe());
                        summary.applied += 1;
                    }
                    Err(e) => {
                        warn!("Failed to save preferences to {}: {}", store.describe(), e);
                        summary.failed += 1;
                    }
                }
            }
            summary
        });
        Self { sender: Some(sender), worker: Some(worker) }
    }

    /// A publisher that drops every update
    pub fn disabled() -> Self {
        Self { sender: None, worker: None }
    }

    /// Queue an update and return immediately
    pub fn publish(&self, update: PreferenceUpdate) {
        if update.is_empty() {
            return;
        }
        if let Some(ref sender) = self.sender
            && sender.send(update).is_err()
        {
            warn!("Preference worker has stopped; update dropped");
        }
    }

    /// Wait for queued updates to be applied
    pub fn finish(mut self) -> PublishSummary {
        self.shutdown()
    }

    fn shutdown(&mut self) -> PublishSummary {
        drop(self.sender.take());
        match self.worker.take() {
            Some(worker) => worker.join().unwrap_or_else(|_| {
                warn!("Preference worker panicked");
                PublishSummary::default()
            }),
            None => PublishSummary::default(),
        }
    }
}

impl Drop for PreferencePublisher {
    fn drop(&mut self) {
        self.shutdown();
    }
}
