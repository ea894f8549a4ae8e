//! Restriction (mute) persistence.
//!
//! The expiry scheduler only needs the filtered read ([`RestrictionStore::expired`])
//! and the batch clear ([`RestrictionStore::clear_expired`]); the rest is used by
//! moderation commands.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{domain::Subject, errors::Error, Result};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestrictionRecord {
    pub subject: Subject,
    pub restricted: bool,
    /// `None` while restricted means the mute is permanent.
    pub restricted_until: Option<DateTime<Utc>>,
}

impl RestrictionRecord {
    pub fn is_permanent(&self) -> bool {
        self.restricted && self.restricted_until.is_none()
    }

    /// Whether the restriction is still in force at `now`.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.restricted && self.restricted_until.map(|u| u > now).unwrap_or(true)
    }

    /// Timed restriction whose expiry has passed. Permanent ones never match.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.restricted && matches!(self.restricted_until, Some(u) if u <= now)
    }
}

#[async_trait]
pub trait RestrictionStore: Send + Sync {
    /// Restrict `subject`, until `until` or permanently when `None`.
    async fn restrict(&self, subject: Subject, until: Option<DateTime<Utc>>) -> Result<()>;

    /// Explicitly clear a restriction. Returns whether one was in force.
    async fn lift(&self, subject: Subject) -> Result<bool>;

    async fn get(&self, subject: Subject) -> Result<Option<RestrictionRecord>>;

    /// Subjects with `restricted AND restricted_until IS NOT NULL AND restricted_until <= now`.
    async fn expired(&self, now: DateTime<Utc>) -> Result<Vec<Subject>>;

    /// Clear `restricted` and `restricted_until` for `subjects` as one batch.
    ///
    /// Subjects whose record no longer matches the expiry predicate at commit
    /// (lifted, or re-muted with a later expiry) are left untouched. Returns
    /// the number of records cleared.
    async fn clear_expired(&self, subjects: &[Subject], now: DateTime<Utc>) -> Result<usize>;
}

type Records = BTreeMap<Subject, RestrictionRecord>;

fn apply_restrict(records: &mut Records, subject: Subject, until: Option<DateTime<Utc>>) {
    records.insert(
        subject,
        RestrictionRecord {
            subject,
            restricted: true,
            restricted_until: until,
        },
    );
}

fn apply_lift(records: &mut Records, subject: Subject) -> bool {
    match records.get_mut(&subject) {
        Some(rec) if rec.restricted => {
            rec.restricted = false;
            rec.restricted_until = None;
            true
        }
        _ => false,
    }
}

fn select_expired(records: &Records, now: DateTime<Utc>) -> Vec<Subject> {
    records
        .values()
        .filter(|r| r.is_expired_at(now))
        .map(|r| r.subject)
        .collect()
}

fn apply_clear(records: &mut Records, subjects: &[Subject], now: DateTime<Utc>) -> usize {
    let mut cleared = 0;
    for subject in subjects {
        if let Some(rec) = records.get_mut(subject) {
            if rec.is_expired_at(now) {
                rec.restricted = false;
                rec.restricted_until = None;
                cleared += 1;
            }
        }
    }
    cleared
}

/// Process-local store. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryRestrictionStore {
    records: Mutex<Records>,
}

impl MemoryRestrictionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RestrictionStore for MemoryRestrictionStore {
    async fn restrict(&self, subject: Subject, until: Option<DateTime<Utc>>) -> Result<()> {
        apply_restrict(&mut *self.records.lock().await, subject, until);
        Ok(())
    }

    async fn lift(&self, subject: Subject) -> Result<bool> {
        Ok(apply_lift(&mut *self.records.lock().await, subject))
    }

    async fn get(&self, subject: Subject) -> Result<Option<RestrictionRecord>> {
        Ok(self.records.lock().await.get(&subject).cloned())
    }

    async fn expired(&self, now: DateTime<Utc>) -> Result<Vec<Subject>> {
        Ok(select_expired(&*self.records.lock().await, now))
    }

    async fn clear_expired(&self, subjects: &[Subject], now: DateTime<Utc>) -> Result<usize> {
        Ok(apply_clear(&mut *self.records.lock().await, subjects, now))
    }
}

/// Store backed by a JSON file.
///
/// Every mutation is applied to a copy, written to `<path>.tmp` and renamed
/// over `path`; the in-memory view only changes once the file is committed.
pub struct JsonFileRestrictionStore {
    path: PathBuf,
    records: Mutex<Records>,
}

impl JsonFileRestrictionStore {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let records = load_records(&path).await?;
        tracing::info!(path = %path.display(), records = records.len(), "restriction store loaded");
        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    async fn commit<T>(&self, mutate: impl FnOnce(&mut Records) -> T) -> Result<T> {
        let mut guard = self.records.lock().await;
        let mut next = guard.clone();
        let out = mutate(&mut next);
        save_records(&self.path, &next).await?;
        *guard = next;
        Ok(out)
    }
}

#[async_trait]
impl RestrictionStore for JsonFileRestrictionStore {
    async fn restrict(&self, subject: Subject, until: Option<DateTime<Utc>>) -> Result<()> {
        self.commit(|r| apply_restrict(r, subject, until)).await
    }

    async fn lift(&self, subject: Subject) -> Result<bool> {
        self.commit(|r| apply_lift(r, subject)).await
    }

    async fn get(&self, subject: Subject) -> Result<Option<RestrictionRecord>> {
        Ok(self.records.lock().await.get(&subject).cloned())
    }

    async fn expired(&self, now: DateTime<Utc>) -> Result<Vec<Subject>> {
        Ok(select_expired(&*self.records.lock().await, now))
    }

    async fn clear_expired(&self, subjects: &[Subject], now: DateTime<Utc>) -> Result<usize> {
        if subjects.is_empty() {
            return Ok(0);
        }
        self.commit(|r| apply_clear(r, subjects, now)).await
    }
}

async fn load_records(path: &Path) -> Result<Records> {
    let txt = match tokio::fs::read_to_string(path).await {
        Ok(t) => t,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Records::new()),
        Err(e) => return Err(Error::Io(e)),
    };
    if txt.trim().is_empty() {
        return Ok(Records::new());
    }
    let list: Vec<RestrictionRecord> = serde_json::from_str(&txt)?;
    Ok(list.into_iter().map(|r| (r.subject, r)).collect())
}

async fn save_records(path: &Path, records: &Records) -> Result<()> {
    let list: Vec<&RestrictionRecord> = records.values().collect();
    let txt = serde_json::to_string_pretty(&list)?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, txt)
        .await
        .map_err(|e| Error::Store(format!("write {}: {e}", tmp.display())))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| Error::Store(format!("rename onto {}: {e}", path.display())))?;
    Ok(())
}
