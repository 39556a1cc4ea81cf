//! In-process stores with the same transition guards and transactional
//! semantics as the Postgres ones. Used by the test suite and for running the
//! pipeline without a database.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{JobStore, PersonBatchWriter, PersonStore, StoreError};
use crate::models::job::{truncate_error_message, ImportJob, ImportJobStatus, NewImportJob};
use crate::models::person::PersonRecord;

#[derive(Default, Clone)]
pub struct MemoryJobStore {
    jobs: Arc<Mutex<HashMap<Uuid, ImportJob>>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every job, oldest first.
    pub fn all(&self) -> Vec<ImportJob> {
        let mut jobs: Vec<_> = self.jobs.lock().values().cloned().collect();
        jobs.sort_by_key(|job| job.created_at);
        jobs
    }

    fn transition(
        &self,
        id: Uuid,
        to: ImportJobStatus,
        apply: impl FnOnce(&mut ImportJob),
    ) -> Result<(), StoreError> {
        let mut jobs = self.jobs.lock();
        let job = jobs.get_mut(&id).ok_or(StoreError::JobNotFound(id))?;
        if !job.status.can_transition_to(to) {
            return Err(StoreError::IllegalTransition {
                id,
                from: job.status,
                to,
            });
        }
        job.status = to;
        apply(job);
        Ok(())
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, new_job: NewImportJob) -> Result<ImportJob, StoreError> {
        let job = ImportJob::new(new_job);
        self.jobs.lock().insert(job.id, job.clone());
        Ok(job)
    }

    async fn find(&self, id: Uuid) -> Result<Option<ImportJob>, StoreError> {
        Ok(self.jobs.lock().get(&id).cloned())
    }

    async fn mark_in_progress(&self, id: Uuid) -> Result<(), StoreError> {
        self.transition(id, ImportJobStatus::InProgress, |job| {
            job.started_at = Some(Utc::now());
            job.finished_at = None;
            job.error_message = None;
            job.processed_records = None;
            job.total_records = None;
        })
    }

    async fn mark_completed(&self, id: Uuid, records: i32) -> Result<(), StoreError> {
        self.transition(id, ImportJobStatus::Completed, |job| {
            job.finished_at = Some(Utc::now());
            job.processed_records = Some(records);
            job.total_records = Some(records);
            job.error_message = None;
        })
    }

    async fn mark_failed(&self, id: Uuid, message: &str) -> Result<(), StoreError> {
        self.transition(id, ImportJobStatus::Failed, |job| {
            job.finished_at = Some(Utc::now());
            job.processed_records = None;
            job.total_records = None;
            job.error_message = Some(truncate_error_message(message));
        })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Committed persons, unique by pesel.
#[derive(Default, Clone)]
pub struct MemoryPersonStore {
    persons: Arc<Mutex<Vec<PersonRecord>>>,
}

impl MemoryPersonStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything committed so far.
    pub fn all(&self) -> Vec<PersonRecord> {
        self.persons.lock().clone()
    }

    pub fn find_by_pesel(&self, pesel: &str) -> Option<PersonRecord> {
        self.persons.lock().iter().find(|p| p.pesel == pesel).cloned()
    }
}

#[async_trait]
impl PersonStore for MemoryPersonStore {
    async fn begin(&self) -> Result<Box<dyn PersonBatchWriter>, StoreError> {
        Ok(Box::new(MemoryBatchWriter {
            committed: Arc::clone(&self.persons),
            staged: Vec::new(),
            staged_pesels: HashSet::new(),
        }))
    }

    async fn count(&self) -> Result<i64, StoreError> {
        Ok(self.persons.lock().len() as i64)
    }
}

/// Stages rows privately until commit.
pub struct MemoryBatchWriter {
    committed: Arc<Mutex<Vec<PersonRecord>>>,
    staged: Vec<PersonRecord>,
    staged_pesels: HashSet<String>,
}

#[async_trait]
impl PersonBatchWriter for MemoryBatchWriter {
    async fn insert_batch(&mut self, batch: &[PersonRecord]) -> Result<(), StoreError> {
        let committed = self.committed.lock();
        for person in batch {
            let taken = committed.iter().any(|p| p.pesel == person.pesel);
            if taken || !self.staged_pesels.insert(person.pesel.clone()) {
                return Err(StoreError::Conflict(format!(
                    "pesel {} already exists",
                    person.pesel
                )));
            }
            self.staged.push(person.clone());
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryBatchWriter {
            committed, staged, ..
        } = *self;
        let mut committed = committed.lock();
        if let Some(dup) = staged
            .iter()
            .find(|s| committed.iter().any(|p| p.pesel == s.pesel))
        {
            return Err(StoreError::Conflict(format!(
                "pesel {} already exists",
                dup.pesel
            )));
        }
        committed.extend(staged);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}
