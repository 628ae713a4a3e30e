use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CacheMiss, PersistenceError};
use crate::models::CompanyRecord;

/// The last scraped collection, as written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cache {
    pub startups: Vec<CompanyRecord>,
    pub last_updated: DateTime<Utc>,
}

impl Cache {
    pub fn age(&self, now: DateTime<Utc>) -> TimeDelta {
        now - self.last_updated
    }

    pub fn is_fresh(&self, now: DateTime<Utc>, window: TimeDelta) -> bool {
        is_fresh(self.last_updated, now, window)
    }
}

/// A snapshot is fresh while its age is strictly below the window.
pub fn is_fresh(last_updated: DateTime<Utc>, now: DateTime<Utc>, window: TimeDelta) -> bool {
    now - last_updated < window
}

/// JSON snapshot file. Load and save only; freshness is the caller's decision.
pub struct CacheStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Cache, CacheMiss> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CacheMiss::Absent {
                    path: self.path.clone(),
                });
            }
            Err(source) => {
                return Err(CacheMiss::Unreadable {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let cache: Cache = serde_json::from_slice(&data).map_err(|source| CacheMiss::Malformed {
            path: self.path.clone(),
            source,
        })?;

        validate_slugs(&cache.startups).map_err(|reason| CacheMiss::Invalid {
            path: self.path.clone(),
            reason,
        })?;

        Ok(cache)
    }

    /// Overwrite the snapshot with `records`, stamped with the current time.
    pub fn save(&self, records: &[CompanyRecord]) -> Result<DateTime<Utc>, PersistenceError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());

        let cache = Cache {
            startups: records.to_vec(),
            last_updated: Utc::now(),
        };
        let data = serde_json::to_vec_pretty(&cache)?;

        self.write_atomically(&data)?;
        Ok(cache.last_updated)
    }

    fn write_atomically(&self, data: &[u8]) -> Result<(), PersistenceError> {
        let to_write_error = |source: std::io::Error| PersistenceError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(to_write_error)?;
        }

        // rename is atomic within a directory, so readers never see a partial file
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, data).map_err(to_write_error)?;
        fs::rename(&tmp, &self.path).map_err(to_write_error)
    }
}

fn validate_slugs(records: &[CompanyRecord]) -> Result<(), String> {
    let mut seen = HashSet::new();
    for record in records {
        if record.slug.is_empty() {
            return Err(format!("record '{}' has an empty slug", record.name));
        }
        if !seen.insert(record.slug.as_str()) {
            return Err(format!("slug '{}' appears more than once", record.slug));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(slug: &str) -> CompanyRecord {
        CompanyRecord {
            name: format!("{} Inc", slug),
            slug: slug.to_string(),
            tagline: "Widgets".to_string(),
            team_size: "11-50".to_string(),
            funding_announcement: Some("Raised $2M Seed on Jan 2024".to_string()),
            last_fetched: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            fully_scraped: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("nested").join("startups_cache.json"));
        let records = vec![record("acme"), record("globex")];

        let saved_at = store.save(&records).unwrap();
        let cache = store.load().unwrap();

        assert_eq!(cache.startups, records);
        assert_eq!(cache.last_updated, saved_at);
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[test]
    fn test_save_overwrites_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("cache.json"));

        store.save(&[record("acme"), record("globex")]).unwrap();
        store.save(&[record("initech")]).unwrap();

        let slugs: Vec<String> = store.load().unwrap().startups.into_iter().map(|r| r.slug).collect();
        assert_eq!(slugs, vec!["initech"]);
    }

    #[test]
    fn test_load_missing_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("missing.json"));
        assert!(matches!(store.load(), Err(CacheMiss::Absent { .. })));
    }

    #[test]
    fn test_load_corrupt_file_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, b"{ not json").unwrap();
        let store = CacheStore::new(&path);
        assert!(matches!(store.load(), Err(CacheMiss::Malformed { .. })));
    }

    #[test]
    fn test_load_incompatible_structure_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, br#"{"companies": [], "updated": 5}"#).unwrap();
        let store = CacheStore::new(&path);
        assert!(matches!(store.load(), Err(CacheMiss::Malformed { .. })));
    }

    #[test]
    fn test_load_duplicate_slugs_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let cache = Cache {
            startups: vec![record("acme"), record("acme")],
            last_updated: Utc::now(),
        };
        fs::write(&path, serde_json::to_vec(&cache).unwrap()).unwrap();
        let store = CacheStore::new(&path);
        assert!(matches!(store.load(), Err(CacheMiss::Invalid { .. })));
    }

    #[test]
    fn test_load_accepts_offset_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let json = r#"{
            "startups": [{"name": "Acme", "slug": "acme", "last_fetched": "2024-03-01T13:00:00+01:00"}],
            "last_updated": "2024-03-01T13:00:00+01:00"
        }"#;
        fs::write(&path, json).unwrap();

        let cache = CacheStore::new(&path).load().unwrap();
        assert_eq!(
            cache.last_updated,
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
        );
        assert_eq!(cache.startups[0].tagline, "");
        assert!(!cache.startups[0].fully_scraped);
    }

    #[test]
    fn test_is_fresh_boundary() {
        let now = Utc.with_ymd_and_hms(2024, 3, 2, 12, 0, 0).unwrap();
        let window = TimeDelta::hours(24);

        let recent = now - TimeDelta::hours(23) - TimeDelta::minutes(59);
        let exactly = now - window;
        let stale = now - window - TimeDelta::seconds(1);

        assert!(is_fresh(recent, now, window));
        assert!(!is_fresh(exactly, now, window));
        assert!(!is_fresh(stale, now, window));
    }
}
