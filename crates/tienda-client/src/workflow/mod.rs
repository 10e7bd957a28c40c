//! # Composition Workflows
//!
//! Async drivers around the core drafts: they own a draft, run the
//! network steps of a submission and guard against double submits.
//!
//! ## Shared Pieces
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Workflow Building Blocks                        │
//! │                                                                         │
//! │  DraftState<D>     Arc<Mutex<D>>; edits go through with_draft_mut      │
//! │                    and are refused with Busy while a submit runs       │
//! │                                                                         │
//! │  SingleFlight      one submission at a time per composer               │
//! │                                                                         │
//! │    submit() ──► try_begin() ── busy? ──yes──► ClientError::Busy        │
//! │                      │                                                  │
//! │                      no                                                 │
//! │                      ▼                                                  │
//! │                 FlightGuard held for the whole submission,             │
//! │                 released on drop (success, error or cancellation)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::api::ApiClient;
use crate::error::{ClientError, ClientResult};

pub mod purchase;
pub mod sale;

pub use purchase::{OrderSubmitted, PurchaseOrderComposer};
pub use sale::{SaleComposer, SaleSubmitted};

// =============================================================================
// Draft State
// =============================================================================

/// A draft shared between the composer and whoever renders it.
#[derive(Debug)]
pub struct DraftState<D> {
    draft: Arc<Mutex<D>>,
}

impl<D> Clone for DraftState<D> {
    fn clone(&self) -> Self {
        DraftState {
            draft: Arc::clone(&self.draft),
        }
    }
}

impl<D> DraftState<D> {
    pub fn new(draft: D) -> Self {
        DraftState {
            draft: Arc::new(Mutex::new(draft)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, D> {
        self.draft.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Executes a function with read access to the draft.
    pub fn with_draft<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&D) -> R,
    {
        f(&self.lock())
    }

    /// Executes a function with write access to the draft.
    pub fn with_draft_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut D) -> R,
    {
        f(&mut self.lock())
    }

    /// Like [`with_draft_mut`](Self::with_draft_mut), but refuses with
    /// [`ClientError::Busy`] while `flight` is held.
    ///
    /// The flag is read under the draft lock and submissions take their
    /// snapshot under the same lock after raising it, so an accepted edit
    /// is always part of the next snapshot.
    pub fn edit_unless_busy<F, R>(&self, flight: &SingleFlight, f: F) -> ClientResult<R>
    where
        F: FnOnce(&mut D) -> R,
    {
        let mut draft = self.lock();
        if flight.is_busy() {
            return Err(ClientError::Busy);
        }
        Ok(f(&mut draft))
    }

    /// Swaps in `draft`, returning the previous one.
    pub fn replace(&self, draft: D) -> D {
        std::mem::replace(&mut *self.lock(), draft)
    }
}

impl<D: Clone> DraftState<D> {
    pub fn snapshot(&self) -> D {
        self.lock().clone()
    }
}

/// Submissions need a signed-in session; the server would answer 401.
pub(crate) fn require_session(api: &ApiClient) -> ClientResult<()> {
    if api.session().is_authenticated() {
        Ok(())
    } else {
        Err(ClientError::NotAuthenticated)
    }
}

// =============================================================================
// Single Flight
// =============================================================================

/// At most one in-flight submission.
#[derive(Debug, Clone, Default)]
pub struct SingleFlight {
    busy: Arc<AtomicBool>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails fast with [`ClientError::Busy`] while another guard is alive.
    pub fn try_begin(&self) -> ClientResult<FlightGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ClientError::Busy)?;
        Ok(FlightGuard {
            busy: Arc::clone(&self.busy),
        })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Releases the [`SingleFlight`] on drop.
#[derive(Debug)]
pub struct FlightGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}
