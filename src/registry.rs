//! Registry of constructed apps keyed by credential and name.
//!
//! The registry is an ordinary value owned by the caller. Lookups of the same
//! (credential, name) pair hand out the same shared [`App`], so state set
//! through one handle is visible through every other.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::{debug, info};

use crate::adapters::live::{LiveFileSystem, LiveLlmClient};
use crate::adapters::recording::RecordingLlmClient;
use crate::adapters::replaying::ReplayingLlmClient;
use crate::app::{App, AppOptions};
use crate::cassette::recorder::CassetteRecorder;
use crate::config::{Settings, ENV_FILE_NAME};
use crate::ports::filesystem::FileSystem;
use crate::ports::llm::LlmClient;

/// Name used for apps looked up without one.
pub const DEFAULT_APP_NAME: &str = "default";

/// Shared handle to a registered app.
pub type SharedApp = Rc<RefCell<App>>;

/// Builds the LLM client for a new app from its settings and name.
pub type LlmFactory = Box<
    dyn Fn(&Settings, &str) -> Result<Box<dyn LlmClient>, Box<dyn std::error::Error + Send + Sync>>,
>;

/// Registry key: both parts must match for a lookup to hit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientKey {
    /// API credential.
    pub api_key: String,
    /// Application name, if one was given.
    pub name: Option<String>,
}

/// Constructs each (credential, name) app once and reuses it afterwards.
pub struct ClientRegistry {
    workdir: PathBuf,
    env_file_name: String,
    fs: Rc<dyn FileSystem>,
    llm_factory: LlmFactory,
    apps: HashMap<ClientKey, SharedApp>,
}

impl ClientRegistry {
    /// Creates a registry rooted at `workdir` using live adapters.
    ///
    /// Completions go to the network unless the settings name a replay
    /// cassette; a record directory wraps the live client in a recorder.
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        let workdir = workdir.into();
        Self {
            llm_factory: default_llm_factory(workdir.clone()),
            workdir,
            env_file_name: ENV_FILE_NAME.to_string(),
            fs: Rc::new(LiveFileSystem),
            apps: HashMap::new(),
        }
    }

    /// Creates a registry rooted at the process working directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the current directory cannot be determined.
    pub fn from_current_dir() -> std::io::Result<Self> {
        Ok(Self::new(std::env::current_dir()?))
    }

    /// Replaces the filesystem used by apps created from now on.
    #[must_use]
    pub fn with_fs(mut self, fs: Rc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    /// Searches for `file_name` instead of `.env` when [`ClientRegistry::ai`]
    /// loads settings.
    #[must_use]
    pub fn with_env_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.env_file_name = file_name.into();
        self
    }

    /// Replaces how LLM clients are built for apps created from now on.
    #[must_use]
    pub fn with_llm_factory(mut self, factory: LlmFactory) -> Self {
        self.llm_factory = factory;
        self
    }

    /// Directory apps resolve templates and results against.
    #[must_use]
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Locates `.env` (or the name given to
    /// [`ClientRegistry::with_env_file_name`]) above the working directory,
    /// loads its settings and
    /// returns the app for its credential and `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if no `.env` is found, the credential is missing, or
    /// the app cannot be constructed.
    pub fn ai(
        &mut self,
        name: Option<&str>,
    ) -> Result<SharedApp, Box<dyn std::error::Error + Send + Sync>> {
        let settings = Settings::discover_named(&self.workdir, &self.env_file_name)?;
        self.get_or_create(&settings, name)
    }

    /// Returns the app registered for `settings.api_key` and `name`, building
    /// and registering it first if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the LLM client or the app cannot be constructed.
    pub fn get_or_create(
        &mut self,
        settings: &Settings,
        name: Option<&str>,
    ) -> Result<SharedApp, Box<dyn std::error::Error + Send + Sync>> {
        let key = ClientKey { api_key: settings.api_key.clone(), name: name.map(str::to_string) };
        if let Some(app) = self.apps.get(&key) {
            debug!(name = ?key.name, "reusing registered app");
            return Ok(Rc::clone(app));
        }

        let app_name = name.unwrap_or(DEFAULT_APP_NAME);
        let llm = (self.llm_factory)(settings, app_name)?;
        let options = AppOptions {
            file_ref_threshold: settings.file_ref_threshold,
            ..AppOptions::new(&self.workdir)
        };
        let app = Rc::new(RefCell::new(App::new(app_name, options, Rc::clone(&self.fs), llm)?));
        info!(name = app_name, "registered app");
        self.apps.insert(key, Rc::clone(&app));
        Ok(app)
    }

    /// Number of registered apps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.apps.len()
    }

    /// Returns `true` if no app has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }
}

/// Default client construction: replay, record, or plain live.
///
/// Relative cassette paths are resolved against `workdir`.
#[must_use]
pub fn default_llm_factory(workdir: PathBuf) -> LlmFactory {
    Box::new(move |settings: &Settings, app_name: &str| -> Result<Box<dyn LlmClient>, Box<dyn std::error::Error + Send + Sync>> {
        if let Some(cassette) = &settings.replay_cassette {
            let path = workdir.join(cassette);
            info!(path = %path.display(), "replaying completions from cassette");
            return Ok(Box::new(ReplayingLlmClient::from_path(&path)?) as Box<dyn LlmClient>);
        }

        let live = Box::new(LiveLlmClient::new(&settings.api_key, settings.base_url.clone()));
        match &settings.record_dir {
            Some(dir) => {
                let basename = Path::new(app_name)
                    .file_name()
                    .map_or_else(|| app_name.to_string(), |f| f.to_string_lossy().into_owned());
                let stamp = Utc::now().format("%Y-%m-%dT%H-%M-%S");
                let path = workdir.join(dir).join(format!("{stamp}-{basename}.cassette.yaml"));
                info!(path = %path.display(), "recording completions to cassette");
                let recorder = Arc::new(Mutex::new(CassetteRecorder::new(path, app_name)));
                Ok(Box::new(RecordingLlmClient::new(live, recorder)) as Box<dyn LlmClient>)
            }
            None => Ok(live as Box<dyn LlmClient>),
        }
    })
}
