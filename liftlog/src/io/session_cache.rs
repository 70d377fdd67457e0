//! Durable local mirror of the in-progress routine snapshot.
//!
//! The [`SessionCache`] trait decouples the session controller from where the
//! snapshot lives. [`FileSessionCache`] keeps one JSON document under a fixed
//! path; tests use an in-memory cache.
//!
//! The cache has a single slot. Each entry records the user that owns it, and
//! a load for any other user sees an empty cache.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::json_file::{read_json, write_json};
use crate::core::invariants::validate_snapshot;
use crate::routine::RoutineSnapshot;

/// Storage for at most one in-progress snapshot.
pub trait SessionCache {
    /// Store `snapshot` as `user_id`'s session, replacing any previous one.
    fn save(&self, user_id: &str, snapshot: &RoutineSnapshot) -> Result<()>;

    /// The last snapshot saved for `user_id`, or `None` when there is none,
    /// it belongs to another user, or it cannot be read. Read failures are
    /// logged, never returned.
    fn load(&self, user_id: &str) -> Option<RoutineSnapshot>;

    /// Remove the stored snapshot. Clearing an empty cache succeeds.
    fn clear(&self) -> Result<()>;
}

/// On-disk form of the cache slot.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CachedSession {
    user_id: String,
    snapshot: RoutineSnapshot,
}

/// Session cache backed by a single JSON file (`.liftlog/state/session.json`).
#[derive(Debug, Clone)]
pub struct FileSessionCache {
    path: PathBuf,
}

impl FileSessionCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionCache for FileSessionCache {
    fn save(&self, user_id: &str, snapshot: &RoutineSnapshot) -> Result<()> {
        debug!(path = %self.path.display(), user_id, routine = %snapshot.name, "saving session snapshot");
        let cached = CachedSession {
            user_id: user_id.to_string(),
            snapshot: snapshot.clone(),
        };
        write_json(&self.path, &cached)
    }

    fn load(&self, user_id: &str) -> Option<RoutineSnapshot> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no cached session");
            return None;
        }
        let cached: CachedSession = match read_json(&self.path) {
            Ok(cached) => cached,
            Err(err) => {
                let error = format!("{err:#}");
                warn!(path = %self.path.display(), error = %error, "ignoring unreadable cached session");
                return None;
            }
        };
        if cached.user_id != user_id {
            warn!(
                path = %self.path.display(),
                owner = %cached.user_id,
                user_id,
                "ignoring cached session owned by another user"
            );
            return None;
        }
        let snapshot = cached.snapshot;
        let errors = validate_snapshot(&snapshot);
        if !errors.is_empty() {
            let errors = errors.join("; ");
            warn!(path = %self.path.display(), errors = %errors, "ignoring invalid cached session");
            return None;
        }
        debug!(routine = %snapshot.name, "cached session loaded");
        Some(snapshot)
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "cached session cleared");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => {
                Err(err).with_context(|| format!("remove cached session {}", self.path.display()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::leg_day;

    fn cache_in(dir: &Path) -> FileSessionCache {
        FileSessionCache::new(dir.join("state").join("session.json"))
    }

    /// Verifies save → load yields a deep-equal snapshot.
    #[test]
    fn save_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cache = cache_in(temp.path());
        let mut snapshot = leg_day();
        snapshot.exercises[0].sets[0].sets = 1;
        snapshot.exercises[0].sets[0].kgs = 102.5;

        cache.save("ana", &snapshot).expect("save");

        assert_eq!(cache.load("ana"), Some(snapshot));
    }

    #[test]
    fn save_overwrites_previous_snapshot() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cache = cache_in(temp.path());
        let first = leg_day();
        let mut second = leg_day();
        second.name = "Push".to_string();

        cache.save("ana", &first).expect("save");
        cache.save("ana", &second).expect("save");

        assert_eq!(cache.load("ana").map(|snapshot| snapshot.name), Some("Push".to_string()));
    }

    #[test]
    fn session_of_another_user_is_not_loaded() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cache = cache_in(temp.path());
        cache.save("ana", &leg_day()).expect("save");

        assert_eq!(cache.load("bob"), None);
        assert!(cache.path().exists());
        assert_eq!(cache.load("ana"), Some(leg_day()));
    }

    #[test]
    fn load_without_file_is_none() {
        let temp = tempfile::tempdir().expect("tempdir");
        assert_eq!(cache_in(temp.path()).load("ana"), None);
    }

    #[test]
    fn corrupt_or_invalid_cache_is_treated_as_absent() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cache = cache_in(temp.path());
        fs::create_dir_all(temp.path().join("state")).expect("mkdir");

        fs::write(cache.path(), "{\"userId\": ").expect("write");
        assert_eq!(cache.load("ana"), None);

        fs::write(
            cache.path(),
            r#"{"userId":"ana","snapshot":{"name":"","exercises":[]}}"#,
        )
        .expect("write");
        assert_eq!(cache.load("ana"), None);

        // A bare snapshot without an owner is not a session.
        fs::write(cache.path(), r#"{"name":"Leg Day","exercises":[]}"#).expect("write");
        assert_eq!(cache.load("ana"), None);
    }

    #[test]
    fn clear_removes_snapshot_and_tolerates_missing_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cache = cache_in(temp.path());
        cache.save("ana", &leg_day()).expect("save");

        cache.clear().expect("clear");
        assert_eq!(cache.load("ana"), None);
        cache.clear().expect("clear again");
    }
}
