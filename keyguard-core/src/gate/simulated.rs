//! Scripted gate for tests and headless hosts.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use super::{AuthorizationGate, AuthorizationOutcome, GateAvailability, PromptInfo};
use crate::keystore::{KeystoreOperation, SoftwareKeystore};

/// Gate that replays queued outcomes, succeeding once the queue is empty.
///
/// A success approves the operation's handle in the paired
/// [`SoftwareKeystore`], the same binding a platform prompt performs on a
/// hardware keystore.
pub struct SimulatedGate {
    keystore: Arc<SoftwareKeystore>,
    outcomes: Mutex<VecDeque<AuthorizationOutcome>>,
    availability: Mutex<GateAvailability>,
    prompts: AtomicUsize,
}

impl std::fmt::Debug for SimulatedGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedGate")
            .field("prompts", &self.prompts())
            .finish_non_exhaustive()
    }
}

impl SimulatedGate {
    /// Creates an available gate that approves operations of `keystore`.
    #[must_use]
    pub fn new(keystore: Arc<SoftwareKeystore>) -> Self {
        Self {
            keystore,
            outcomes: Mutex::new(VecDeque::new()),
            availability: Mutex::new(GateAvailability::Available),
            prompts: AtomicUsize::new(0),
        }
    }

    /// Queues the outcome of a future prompt.
    pub fn push_outcome(&self, outcome: AuthorizationOutcome) {
        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(outcome);
    }

    /// Sets what [`AuthorizationGate::availability`] reports.
    pub fn set_availability(&self, availability: GateAvailability) {
        *self
            .availability
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = availability;
    }

    /// Number of prompts shown so far.
    #[must_use]
    pub fn prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl AuthorizationGate for SimulatedGate {
    fn availability(&self) -> GateAvailability {
        *self
            .availability
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    async fn authenticate(
        &self,
        _prompt: PromptInfo,
        operation: Arc<dyn KeystoreOperation>,
    ) -> AuthorizationOutcome {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        let outcome = self
            .outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or(AuthorizationOutcome::Succeeded);
        if outcome == AuthorizationOutcome::Succeeded {
            self.keystore.approve(operation.operation_handle());
        }
        outcome
    }
}
