use serde::{Deserialize, Serialize};
use url::Url;

use crate::domain::{blank_url_as_none, ProfileId, WatchedProfile};

/// Profile payload served by the directory for a username lookup.
///
/// The directory may attach more fields (display name, bio, ...); only the ones the
/// watch-list keeps are decoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub id: ProfileId,
    #[serde(default, deserialize_with = "blank_url_as_none")]
    pub picture: Option<Url>,
    pub username: String,
}

impl From<ProfileRecord> for WatchedProfile {
    fn from(value: ProfileRecord) -> Self {
        Self {
            id: value.id,
            picture: value.picture,
            username: value.username,
        }
    }
}
