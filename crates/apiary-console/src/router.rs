//! View router
//!
//! A state machine over the configured view set. Navigation is gated
//! by the capability set, activates the target view and its title
//! binding synchronously, and hands the caller a ticket stamped with a
//! fresh epoch. When the loader result comes back, the ticket's epoch
//! is compared against the current one: results of superseded
//! navigations are discarded, never applied. Without this guard a
//! slow response from a previously active view would overwrite the
//! now-active view with wrong data.

use crate::views::{self, ViewData, ViewId};
use apiary_core::{ApiError, CapabilitySet};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Content slot of one view
#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    /// A loader is in flight for the current epoch
    Loading,
    /// The most recent navigation's data
    Ready(ViewData),
    /// The most recent navigation's loader failed; the view stays
    /// mounted with this inline indicator
    Failed(String),
}

/// Proof of one admitted navigation; consumed by [`ViewRouter::finish`]
#[derive(Debug)]
#[must_use = "a navigation without finish() leaves its view loading forever"]
pub struct NavigationTicket {
    target: ViewId,
    epoch: u64,
}

impl NavigationTicket {
    /// The view this ticket loads
    #[inline]
    #[must_use]
    pub fn target(&self) -> ViewId {
        self.target
    }

    /// The epoch stamped at issue time
    #[inline]
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

/// Outcome of completing a navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// The result was applied to the view
    Applied(ViewId),
    /// A newer navigation superseded this one; the result was dropped
    Superseded(ViewId),
}

/// Rejected navigations
#[derive(Debug, Clone, thiserror::Error)]
pub enum NavigateError {
    /// The capability set does not cover the view's gate; the router
    /// state is untouched
    #[error("navigation to {view} denied: requires {required}")]
    PermissionDenied {
        view: &'static str,
        required: &'static str,
    },

    /// The session has ended; no further navigation is possible
    #[error("session has ended")]
    SessionEnded,
}

#[derive(Debug)]
struct RouterState {
    active: ViewId,
    title: &'static str,
    epoch: u64,
    content: HashMap<ViewId, LoadState>,
}

/// The navigation state machine
#[derive(Debug)]
pub struct ViewRouter {
    state: Mutex<RouterState>,
}

impl ViewRouter {
    /// Router starting on the dashboard
    #[must_use]
    pub fn new() -> Self {
        let initial = views::spec(ViewId::Dashboard);
        Self {
            state: Mutex::new(RouterState {
                active: initial.id,
                title: initial.title,
                epoch: 0,
                content: HashMap::new(),
            }),
        }
    }

    /// The currently active view
    #[inline]
    #[must_use]
    pub fn active(&self) -> ViewId {
        self.state.lock().active
    }

    /// The active view's title binding
    #[inline]
    #[must_use]
    pub fn title(&self) -> &'static str {
        self.state.lock().title
    }

    /// The current navigation epoch
    #[inline]
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.state.lock().epoch
    }

    /// Copy of a view's content slot
    #[inline]
    #[must_use]
    pub fn content(&self, view: ViewId) -> Option<LoadState> {
        self.state.lock().content.get(&view).cloned()
    }

    /// Admit a navigation.
    ///
    /// On success the target view is active (title included) before
    /// any data arrives, and the returned ticket carries the epoch the
    /// eventual result will be checked against.
    ///
    /// # Errors
    /// - `NavigateError::PermissionDenied` when the gate fails; the
    ///   router remains in its current state
    pub fn begin(
        &self,
        target: ViewId,
        caps: &CapabilitySet,
    ) -> Result<NavigationTicket, NavigateError> {
        let spec = views::spec(target);
        if !caps.allows(spec.required_permission) {
            tracing::debug!(view = %target, "navigation denied");
            return Err(NavigateError::PermissionDenied {
                view: spec.id.slug(),
                required: spec.required_permission.unwrap_or("(none)"),
            });
        }

        let mut state = self.state.lock();
        state.epoch += 1;
        state.active = spec.id;
        state.title = spec.title;
        state.content.insert(spec.id, LoadState::Loading);
        tracing::debug!(view = %target, epoch = state.epoch, "navigation begun");
        Ok(NavigationTicket {
            target: spec.id,
            epoch: state.epoch,
        })
    }

    /// Complete a navigation with its loader result.
    ///
    /// Applies the result only when the ticket's epoch is still
    /// current; otherwise the result is discarded silently and the
    /// outcome reports the supersession. Loader failures are recorded
    /// as an inline failure state, leaving the view mounted.
    pub fn finish(&self, ticket: NavigationTicket, result: Result<ViewData, ApiError>) -> Navigation {
        let mut state = self.state.lock();
        if state.epoch != ticket.epoch {
            tracing::trace!(
                view = %ticket.target,
                stale_epoch = ticket.epoch,
                current_epoch = state.epoch,
                "discarding superseded load result"
            );
            return Navigation::Superseded(ticket.target);
        }
        let slot = match result {
            Ok(data) => LoadState::Ready(data),
            Err(err) => LoadState::Failed(err.to_string()),
        };
        state.content.insert(ticket.target, slot);
        Navigation::Applied(ticket.target)
    }
}

impl Default for ViewRouter {
    fn default() -> Self {
        Self::new()
    }
}
