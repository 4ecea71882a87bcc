//! Shared, lock-protected wizard state.
//!
//! All mutation goes through [`UploadStore::update_state`] (or the
//! closure-based variants built on the same write lock). The lock is never
//! held across an `.await`.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use tubeflow_models::WizardContent;

use crate::error::{WizardError, WizardResult};
use crate::field::{Field, Operation};
use crate::state::{UploadState, UploadStatePatch};

#[derive(Debug, Clone, Default)]
pub struct UploadStore {
    state: Arc<RwLock<UploadState>>,
}

impl UploadStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: UploadState) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> UploadState {
        self.state.read().clone()
    }

    /// Read a projection of the state without cloning all of it.
    pub fn read<R>(&self, f: impl FnOnce(&UploadState) -> R) -> R {
        f(&self.state.read())
    }

    /// Shallow-merge `patch` into the state.
    pub fn update_state(&self, patch: UploadStatePatch) {
        if patch.is_empty() {
            return;
        }
        self.state.write().apply(patch);
    }

    /// Compute a patch from the current state and merge it atomically.
    pub fn update_with(&self, f: impl FnOnce(&UploadState) -> UploadStatePatch) {
        let mut state = self.state.write();
        let patch = f(&state);
        state.apply(patch);
    }

    /// Replace `content` with the value `f` builds from the current one.
    ///
    /// ```ignore
    /// store.update_content(|c| WizardContent { description: text, ..c.clone() });
    /// ```
    pub fn update_content(&self, f: impl FnOnce(&WizardContent) -> WizardContent) {
        self.update_with(|state| UploadStatePatch::content(f(&state.content)));
    }

    pub fn set_error(&self, field: Field, message: impl Into<String>) {
        let message = message.into();
        debug!(field = %field, error = %message, "Recording field error");
        self.update_with(|state| UploadStatePatch::errors(state.errors.with(field, message)));
    }

    pub fn clear_error(&self, field: Field) {
        self.update_with(|state| {
            if state.errors.get(field).is_none() {
                return UploadStatePatch::default();
            }
            UploadStatePatch::errors(state.errors.without(field))
        });
    }

    /// Mark `op` as in flight.
    ///
    /// Fails with [`WizardError::Busy`] when the same operation is already
    /// running. The flag is cleared when the returned guard drops.
    pub fn begin(&self, op: Operation) -> WizardResult<InFlight> {
        let mut state = self.state.write();
        if state.loading.is_loading(op) {
            return Err(WizardError::Busy(op));
        }
        let loading = state.loading.with(op);
        state.apply(UploadStatePatch {
            loading: Some(loading),
            ..Default::default()
        });
        Ok(InFlight {
            store: self.clone(),
            op,
        })
    }
}

/// Loading flag for one running operation; cleared on drop.
#[derive(Debug)]
pub struct InFlight {
    store: UploadStore,
    op: Operation,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let op = self.op;
        self.store.update_with(|state| UploadStatePatch {
            loading: Some(state.loading.without(op)),
            ..Default::default()
        });
    }
}
