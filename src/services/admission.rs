use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Bounds how many import jobs may be processing at once.
///
/// A limit of zero disables admission control entirely: every
/// [`try_acquire`](Self::try_acquire) succeeds and releasing is a no-op.
#[derive(Clone)]
pub struct AdmissionController {
    semaphore: Option<Arc<Semaphore>>,
    limit: usize,
}

impl AdmissionController {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            semaphore: (max_concurrent > 0).then(|| Arc::new(Semaphore::new(max_concurrent))),
            limit: max_concurrent,
        }
    }

    /// Configured limit, `None` when unbounded.
    pub fn limit(&self) -> Option<usize> {
        self.semaphore.as_ref().map(|_| self.limit)
    }

    /// Take a permit without waiting. `None` means capacity is exhausted.
    pub fn try_acquire(&self) -> Option<AdmissionPermit> {
        match &self.semaphore {
            None => Some(AdmissionPermit { _inner: None }),
            Some(semaphore) => Arc::clone(semaphore)
                .try_acquire_owned()
                .ok()
                .map(|permit| AdmissionPermit {
                    _inner: Some(permit),
                }),
        }
    }
}

/// Right to run one import job. Moves with the job; capacity returns to the
/// pool exactly once, when the permit is released or dropped.
#[must_use = "dropping a permit releases it immediately"]
#[derive(Debug)]
pub struct AdmissionPermit {
    _inner: Option<OwnedSemaphorePermit>,
}

impl AdmissionPermit {
    pub fn release(self) {
        drop(self);
    }
}
