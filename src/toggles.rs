//! Runtime switches shared by the control surface and the speaker.
//!
//! Both are read at dispatch time, so a change applies to the very next
//! announcement.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tracing::info;

use crate::config::TogglesConfig;

const DISCORD_APP_NAME: &str = "Discord";

#[derive(Debug, Default)]
pub struct RuntimeToggles {
    mute_all: AtomicBool,
    ignored_apps: Mutex<HashSet<String>>,
}

impl RuntimeToggles {
    pub fn new(mute_all: bool, ignored_apps: impl IntoIterator<Item = String>) -> Self {
        Self {
            mute_all: AtomicBool::new(mute_all),
            ignored_apps: Mutex::new(ignored_apps.into_iter().collect()),
        }
    }

    pub fn from_config(config: &TogglesConfig) -> Self {
        let toggles = Self::new(config.mute, config.ignored_apps.iter().cloned());
        toggles.set_ignore_discord(!config.read_discord);
        toggles
    }

    pub fn is_muted(&self) -> bool {
        self.mute_all.load(Ordering::Relaxed)
    }

    pub fn set_mute(&self, enabled: bool) {
        self.mute_all.store(enabled, Ordering::Relaxed);
        info!("Mute all: {enabled}");
    }

    pub fn is_ignored(&self, app_name: &str) -> bool {
        self.lock_apps().contains(app_name)
    }

    /// Add (`enabled`) or remove an app from the ignore list.
    pub fn set_ignore_app(&self, name: &str, enabled: bool) {
        let mut apps = self.lock_apps();
        if enabled {
            apps.insert(name.to_string());
        } else {
            apps.remove(name);
        }
        info!("Ignore {name}: {enabled}");
    }

    pub fn set_ignore_discord(&self, enabled: bool) {
        self.set_ignore_app(DISCORD_APP_NAME, enabled);
    }

    /// Sorted copy of the ignore list, for display.
    pub fn ignored_apps(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock_apps().iter().cloned().collect();
        names.sort();
        names
    }

    // A poisoned lock only means a writer panicked mid-insert; the set is still usable.
    fn lock_apps(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.ignored_apps
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
