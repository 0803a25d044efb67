//! Presentation contract for the settings panel.
//!
//! Front-ends render a [`SettingsView`] and call back into the controller; they never
//! hold the watch-list or preferences themselves.

use shared::domain::{DesignPreferences, ProfileId, WatchedProfile};
use url::Url;

use crate::resolver::ResolverStatus;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryView {
    pub index: usize,
    /// Stable per-row key; ids are not unique across entries, so the position is part of it.
    pub key: String,
    pub id: ProfileId,
    pub username: String,
    pub picture: Option<Url>,
    pub delete_label: String,
}

impl EntryView {
    fn from_profile(index: usize, profile: &WatchedProfile) -> Self {
        Self {
            index,
            key: format!("names-list-{}-{index}", profile.id),
            id: profile.id.clone(),
            username: profile.username.clone(),
            picture: profile.picture.clone(),
            delete_label: format!("Delete {}", profile.username),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsView {
    pub query: String,
    pub submit_enabled: bool,
    pub loading: bool,
    /// Message of the last attempt, only while that attempt is in the error state.
    pub error: Option<String>,
    pub entries: Vec<EntryView>,
    pub minimal: bool,
    pub preferences: DesignPreferences,
}

impl SettingsView {
    pub fn build(
        query: &str,
        status: &ResolverStatus,
        profiles: &[WatchedProfile],
        preferences: &DesignPreferences,
    ) -> Self {
        let loading = status.is_loading();
        Self {
            query: query.to_string(),
            submit_enabled: !loading,
            loading,
            error: status.error_message().map(str::to_string),
            entries: profiles
                .iter()
                .enumerate()
                .map(|(index, profile)| EntryView::from_profile(index, profile))
                .collect(),
            minimal: preferences.minimal(),
            preferences: preferences.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_carry_position_in_key_and_username_in_delete_label() {
        let profiles = vec![
            WatchedProfile::new("7", "alice"),
            WatchedProfile::new("7", "alice"),
        ];
        let view = SettingsView::build(
            "",
            &ResolverStatus::Idle,
            &profiles,
            &DesignPreferences::default(),
        );

        assert_eq!(view.entries[0].key, "names-list-7-0");
        assert_eq!(view.entries[1].key, "names-list-7-1");
        assert_eq!(view.entries[1].delete_label, "Delete alice");
    }

    #[test]
    fn loading_disables_submit_and_hides_error() {
        let view = SettingsView::build(
            "bob",
            &ResolverStatus::Loading {
                query: "bob".to_string(),
            },
            &[],
            &DesignPreferences::default(),
        );
        assert!(view.loading);
        assert!(!view.submit_enabled);
        assert_eq!(view.error, None);
    }

    #[test]
    fn error_status_surfaces_message() {
        let view = SettingsView::build(
            "bob",
            &ResolverStatus::Error("user not found".to_string()),
            &[],
            &DesignPreferences::default().merged("minimal", true),
        );
        assert_eq!(view.error.as_deref(), Some("user not found"));
        assert!(view.submit_enabled);
        assert!(view.minimal);
    }
}
