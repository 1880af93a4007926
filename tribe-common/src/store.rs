//! Application-state store
//!
//! Single source of truth for the small amount of client state that outlives
//! a page: onboarding progress and the selected background. Values are read
//! from memory; every write is persisted as JSON before it returns.

use crate::theme::{Background, ThemeState};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, warn};

/// File name of the persisted state inside the data directory
pub const STATE_FILE_NAME: &str = "app_state.json";

/// Onboarding steps the user can dismiss
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStep {
    Welcome,
    ProfileSetup,
    StoriesIntro,
    MessagingIntro,
    CertificationsIntro,
}

/// Persisted application state
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AppState {
    #[serde(default)]
    pub completed_onboarding: BTreeSet<OnboardingStep>,
    #[serde(default)]
    pub background: Background,
}

/// Thread-safe store backed by an optional JSON file
pub struct AppStore {
    path: Option<PathBuf>,
    state: RwLock<AppState>,
}

impl AppStore {
    /// Open the store in `data_dir`, loading existing state if present
    ///
    /// A missing file yields default state. An unreadable or corrupt file is
    /// logged and replaced by defaults on the next write.
    pub fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let path = data_dir.join(STATE_FILE_NAME);

        let state = if path.exists() {
            let text = std::fs::read_to_string(&path)?;
            match serde_json::from_str::<AppState>(&text) {
                Ok(state) => state,
                Err(e) => {
                    warn!("Discarding corrupt app state at {:?}: {}", path, e);
                    AppState::default()
                }
            }
        } else {
            AppState::default()
        };

        debug!("Opened app store at {:?}", path);
        Ok(Self {
            path: Some(path),
            state: RwLock::new(state),
        })
    }

    /// Store that never touches disk
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: RwLock::new(AppState::default()),
        }
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> Result<AppState> {
        self.state
            .read()
            .map(|s| s.clone())
            .map_err(|_| Error::Internal("App state lock poisoned".to_string()))
    }

    pub fn is_onboarding_complete(&self, step: OnboardingStep) -> Result<bool> {
        Ok(self.snapshot()?.completed_onboarding.contains(&step))
    }

    /// Mark an onboarding step as done
    pub fn complete_onboarding(&self, step: OnboardingStep) -> Result<()> {
        self.update(|state| {
            state.completed_onboarding.insert(step);
        })
    }

    /// Forget all onboarding progress
    pub fn reset_onboarding(&self) -> Result<()> {
        self.update(|state| state.completed_onboarding.clear())
    }

    pub fn background(&self) -> Result<Background> {
        Ok(self.snapshot()?.background)
    }

    pub fn set_background(&self, background: Background) -> Result<()> {
        self.update(|state| state.background = background)
    }

    /// Theme derived from the stored background
    pub fn theme(&self) -> Result<ThemeState> {
        Ok(ThemeState::from(self.background()?))
    }

    fn update(&self, mutate: impl FnOnce(&mut AppState)) -> Result<()> {
        let mut state = self
            .state
            .write()
            .map_err(|_| Error::Internal("App state lock poisoned".to_string()))?;
        let mut next = state.clone();
        mutate(&mut next);
        if let Some(path) = &self.path {
            persist(path, &next)?;
        }
        *state = next;
        Ok(())
    }
}

/// Write via a temp file so a crash never leaves a half-written state file
fn persist(path: &Path, state: &AppState) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, serde_json::to_vec_pretty(state)?)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
