use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

/// Durable storage key holding the ordered watch-list.
pub const WATCHED_PROFILES_KEY: &str = "watched-profiles";
/// Durable storage key holding the display flags.
pub const DESIGN_PREFERENCES_KEY: &str = "design-preferences";

pub const MINIMAL_FLAG: &str = "minimal";

/// Opaque identifier assigned by the profile directory.
///
/// Directories are inconsistent about sending ids as JSON strings or numbers, so both
/// decode into the same textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ProfileId(pub String);

impl ProfileId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ProfileId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Signed(i64),
            Unsigned(u64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(text) => Self(text),
            RawId::Signed(n) => Self(n.to_string()),
            RawId::Unsigned(n) => Self(n.to_string()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchedProfile {
    pub id: ProfileId,
    #[serde(default, deserialize_with = "blank_url_as_none")]
    pub picture: Option<Url>,
    pub username: String,
}

impl WatchedProfile {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: ProfileId::new(id),
            picture: None,
            username: username.into(),
        }
    }

    pub fn with_picture(mut self, picture: Url) -> Self {
        self.picture = Some(picture);
        self
    }
}

/// Treats a missing, `null`, or empty-string avatar as "no picture".
pub fn blank_url_as_none<'de, D>(deserializer: D) -> Result<Option<Url>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => Url::parse(text)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Boolean display flags keyed by name.
///
/// Stored as a flat JSON object. Flags this build does not know about are kept as-is so
/// that newer writers sharing the same storage do not lose settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DesignPreferences(BTreeMap<String, bool>);

impl Default for DesignPreferences {
    fn default() -> Self {
        Self(BTreeMap::from([(MINIMAL_FLAG.to_string(), false)]))
    }
}

impl DesignPreferences {
    pub fn flag(&self, name: &str) -> bool {
        self.0.get(name).copied().unwrap_or(false)
    }

    pub fn minimal(&self) -> bool {
        self.flag(MINIMAL_FLAG)
    }

    /// Returns a copy with `name` set to `value`; every other flag is carried over.
    pub fn merged(&self, name: &str, value: bool) -> Self {
        let mut flags = self.0.clone();
        flags.insert(name.to_string(), value);
        Self(flags)
    }

    pub fn flags(&self) -> impl Iterator<Item = (&str, bool)> {
        self.0.iter().map(|(name, value)| (name.as_str(), *value))
    }
}
