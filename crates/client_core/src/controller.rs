use std::sync::Arc;

use async_trait::async_trait;
use shared::domain::{
    DesignPreferences, ProfileId, WatchedProfile, DESIGN_PREFERENCES_KEY, WATCHED_PROFILES_KEY,
};
use storage::KeyValueStore;
use tokio::sync::{broadcast, Mutex};

use crate::{
    directory::ProfileDirectory,
    error::{SettingsError, StoreError},
    persisted::PersistedState,
    resolver::{ProfileResolver, ResolutionSink, ResolveError},
    view::SettingsView,
};

const EVENT_CHANNEL_CAPACITY: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// Blank query; nothing happened.
    Ignored,
    /// Another lookup was loading; the submission was dropped.
    Dropped,
    Added(WatchedProfile),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsEvent {
    ProfileAdded(WatchedProfile),
    ProfileRemoved {
        index: usize,
        profile: WatchedProfile,
    },
    LookupFailed(String),
    /// The lookup succeeded but the updated list could not be persisted.
    SaveFailed(String),
    PreferencesChanged(DesignPreferences),
}

#[derive(Debug, Default)]
struct FormState {
    query: String,
}

/// Owns the watch-list, the design preferences and the add-by-username flow.
pub struct SettingsController {
    resolver: ProfileResolver,
    watched: PersistedState<Vec<WatchedProfile>>,
    design: PersistedState<DesignPreferences>,
    form: Mutex<FormState>,
    events: broadcast::Sender<SettingsEvent>,
}

/// Success effect of a lookup: append the profile and clear the query, under the form
/// lock so no view observes one without the other.
struct AppendAndClear<'a> {
    watched: &'a PersistedState<Vec<WatchedProfile>>,
    form: &'a Mutex<FormState>,
}

#[async_trait]
impl ResolutionSink for AppendAndClear<'_> {
    async fn apply(&self, profile: &WatchedProfile) -> anyhow::Result<()> {
        let mut form = self.form.lock().await;
        let profile = profile.clone();
        self.watched
            .update(move |profiles| {
                profiles.push(profile);
                Ok::<_, StoreError>(())
            })
            .await?;
        form.query.clear();
        Ok(())
    }
}

impl SettingsController {
    pub fn new(store: Arc<dyn KeyValueStore>, directory: Arc<dyn ProfileDirectory>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            resolver: ProfileResolver::new(directory),
            watched: PersistedState::new(store.clone(), WATCHED_PROFILES_KEY, Vec::new()),
            design: PersistedState::new(store, DESIGN_PREFERENCES_KEY, DesignPreferences::default()),
            form: Mutex::new(FormState::default()),
            events,
        }
    }

    pub fn resolver(&self) -> &ProfileResolver {
        &self.resolver
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SettingsEvent> {
        self.events.subscribe()
    }

    pub async fn set_query(&self, text: impl Into<String>) {
        self.form.lock().await.query = text.into();
    }

    pub async fn query(&self) -> String {
        self.form.lock().await.query.clone()
    }

    /// Adds whatever the query field currently holds.
    pub async fn submit(&self) -> Result<AddOutcome, SettingsError> {
        let query = self.query().await;
        self.add_from_query(&query).await
    }

    /// Resolves `query` and appends the profile on success.
    ///
    /// Blank input is ignored without touching any state. A lookup failure leaves the list
    /// as it was and becomes the current inline error until the next attempt starts.
    pub async fn add_from_query(&self, query: &str) -> Result<AddOutcome, SettingsError> {
        if query.trim().is_empty() {
            tracing::debug!("ignoring blank query");
            return Ok(AddOutcome::Ignored);
        }

        let sink = AppendAndClear {
            watched: &self.watched,
            form: &self.form,
        };

        match self.resolver.trigger(query, &sink).await {
            Ok(profile) => {
                tracing::info!(id = %profile.id, username = %profile.username, "added watched profile");
                self.publish(SettingsEvent::ProfileAdded(profile.clone()));
                Ok(AddOutcome::Added(profile))
            }
            Err(ResolveError::Busy) => {
                tracing::debug!(query, "dropping submission while a lookup is loading");
                Ok(AddOutcome::Dropped)
            }
            Err(ResolveError::Lookup(err)) => {
                self.publish(SettingsEvent::LookupFailed(err.message.clone()));
                Err(SettingsError::Lookup(err))
            }
            Err(ResolveError::Apply(message)) => {
                self.publish(SettingsEvent::SaveFailed(message.clone()));
                Err(SettingsError::Apply(message))
            }
        }
    }

    /// Removes the entry at `index`, keeping the order of the rest.
    ///
    /// An out-of-range index is a caller bug: it is rejected before anything is written.
    pub async fn delete_at(&self, index: usize) -> Result<WatchedProfile, SettingsError> {
        let removed = self
            .watched
            .update(|profiles| {
                if index >= profiles.len() {
                    return Err(SettingsError::IndexOutOfRange {
                        index,
                        len: profiles.len(),
                    });
                }
                Ok(profiles.remove(index))
            })
            .await;

        match removed {
            Ok(profile) => {
                tracing::info!(index, id = %profile.id, "removed watched profile");
                self.publish(SettingsEvent::ProfileRemoved {
                    index,
                    profile: profile.clone(),
                });
                Ok(profile)
            }
            Err(err) => {
                if let SettingsError::IndexOutOfRange { index, len } = &err {
                    tracing::error!(index, len, "delete requested for a row that does not exist");
                }
                Err(err)
            }
        }
    }

    /// Removes the first entry carrying `id`.
    pub async fn delete_by_id(&self, id: &ProfileId) -> Result<WatchedProfile, SettingsError> {
        let (index, profile) = self
            .watched
            .update(|profiles| {
                let index = profiles
                    .iter()
                    .position(|profile| &profile.id == id)
                    .ok_or_else(|| SettingsError::UnknownProfile(id.clone()))?;
                Ok::<_, SettingsError>((index, profiles.remove(index)))
            })
            .await?;

        tracing::info!(index, id = %profile.id, "removed watched profile");
        self.publish(SettingsEvent::ProfileRemoved {
            index,
            profile: profile.clone(),
        });
        Ok(profile)
    }

    /// Sets one display flag, keeping every other flag as stored.
    pub async fn set_preference(
        &self,
        flag: &str,
        value: bool,
    ) -> Result<DesignPreferences, SettingsError> {
        let updated = self
            .design
            .update(|preferences| {
                *preferences = preferences.merged(flag, value);
                Ok::<_, SettingsError>(preferences.clone())
            })
            .await?;

        tracing::info!(flag, value, "design preference updated");
        self.publish(SettingsEvent::PreferencesChanged(updated.clone()));
        Ok(updated)
    }

    pub async fn watched_profiles(&self) -> Result<Vec<WatchedProfile>, SettingsError> {
        Ok(self.watched.read().await?)
    }

    pub async fn preferences(&self) -> Result<DesignPreferences, SettingsError> {
        Ok(self.design.read().await?)
    }

    /// Consistent snapshot for rendering.
    pub async fn view(&self) -> Result<SettingsView, SettingsError> {
        let form = self.form.lock().await;
        let status = self.resolver.status();
        let profiles = self.watched.read().await?;
        let preferences = self.design.read().await?;
        Ok(SettingsView::build(
            &form.query,
            &status,
            &profiles,
            &preferences,
        ))
    }

    fn publish(&self, event: SettingsEvent) {
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
