use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use shared::{domain::WatchedProfile, error::LookupError};
use thiserror::Error;
use tokio::sync::broadcast;

use crate::directory::ProfileDirectory;

const STATUS_CHANNEL_CAPACITY: usize = 64;
const ABANDONED_MESSAGE: &str = "lookup abandoned before it completed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolverStatus {
    Idle,
    Loading { query: String },
    Success(WatchedProfile),
    Error(String),
}

impl ResolverStatus {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading { .. })
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error(message) => Some(message),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("a profile lookup is already in flight")]
    Busy,
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error("{0}")]
    Apply(String),
}

/// Receives a resolved profile exactly once per successful lookup.
///
/// `apply` is the whole success effect. It either applies every change or returns an
/// error having applied none of them.
#[async_trait]
pub trait ResolutionSink: Send + Sync {
    async fn apply(&self, profile: &WatchedProfile) -> anyhow::Result<()>;
}

/// Manually triggered, single-flight profile lookup.
pub struct ProfileResolver {
    directory: Arc<dyn ProfileDirectory>,
    status: Mutex<ResolverStatus>,
    transitions: broadcast::Sender<ResolverStatus>,
}

impl ProfileResolver {
    pub fn new(directory: Arc<dyn ProfileDirectory>) -> Self {
        let (transitions, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);
        Self {
            directory,
            status: Mutex::new(ResolverStatus::Idle),
            transitions,
        }
    }

    pub fn status(&self) -> ResolverStatus {
        self.lock_status().clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ResolverStatus> {
        self.transitions.subscribe()
    }

    /// Looks `query` up once and hands a success to `sink`.
    ///
    /// The query is not validated here; callers filter blank input. A trigger issued while
    /// another lookup is loading is rejected with [`ResolveError::Busy`] and performs no
    /// lookup. Dropping the returned future mid-lookup settles the resolver in `Error`.
    pub async fn trigger(
        &self,
        query: &str,
        sink: &dyn ResolutionSink,
    ) -> Result<WatchedProfile, ResolveError> {
        let mut guard = {
            let mut status = self.lock_status();
            if status.is_loading() {
                tracing::debug!(query, "rejecting trigger while a lookup is loading");
                return Err(ResolveError::Busy);
            }
            self.transition(
                &mut status,
                ResolverStatus::Loading {
                    query: query.to_string(),
                },
            );
            LoadingGuard {
                resolver: self,
                armed: true,
            }
        };

        let outcome = match self.directory.lookup_profile(query).await {
            Ok(profile) => match sink.apply(&profile).await {
                Ok(()) => Ok(profile),
                Err(err) => Err(ResolveError::Apply(format!("{err:#}"))),
            },
            Err(err) => Err(ResolveError::Lookup(err)),
        };

        guard.armed = false;
        let mut status = self.lock_status();
        match &outcome {
            Ok(profile) => {
                tracing::debug!(query, id = %profile.id, "profile resolved");
                self.transition(&mut status, ResolverStatus::Success(profile.clone()));
            }
            Err(err) => {
                tracing::warn!(query, error = %err, "profile lookup failed");
                self.transition(&mut status, ResolverStatus::Error(err.to_string()));
            }
        }
        outcome
    }

    /// Re-arms a settled resolver. Does nothing while a lookup is loading.
    pub fn reset(&self) {
        let mut status = self.lock_status();
        if !status.is_loading() && *status != ResolverStatus::Idle {
            self.transition(&mut status, ResolverStatus::Idle);
        }
    }

    // Never held across an await, so a plain mutex is enough and usable from `Drop`.
    fn lock_status(&self) -> MutexGuard<'_, ResolverStatus> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transition(&self, status: &mut ResolverStatus, next: ResolverStatus) {
        *status = next.clone();
        let _ = self.transitions.send(next);
    }
}

/// Leaves `Loading` when a trigger future is dropped before its lookup settled.
struct LoadingGuard<'a> {
    resolver: &'a ProfileResolver,
    armed: bool,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut status = self.resolver.lock_status();
        if status.is_loading() {
            tracing::warn!("profile lookup dropped while loading");
            self.resolver
                .transition(&mut status, ResolverStatus::Error(ABANDONED_MESSAGE.to_string()));
        }
    }
}

#[cfg(test)]
#[path = "tests/resolver_tests.rs"]
mod tests;
