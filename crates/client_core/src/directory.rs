use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use shared::{
    domain::WatchedProfile,
    error::{ApiError, LookupError},
    protocol::ProfileRecord,
};
use url::Url;

/// External username → profile lookup.
///
/// Implementations make exactly one attempt per call; retries and timeouts belong to the
/// caller.
#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    async fn lookup_profile(&self, username: &str) -> Result<WatchedProfile, LookupError>;
}

pub struct MissingProfileDirectory;

#[async_trait]
impl ProfileDirectory for MissingProfileDirectory {
    async fn lookup_profile(&self, _username: &str) -> Result<WatchedProfile, LookupError> {
        Err(LookupError::new("profile directory is unavailable"))
    }
}

/// Directory reached over HTTP: `GET {base_url}/profiles/{username}`.
pub struct HttpProfileDirectory {
    http: Client,
    base_url: Url,
}

impl HttpProfileDirectory {
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
        }
    }

    fn profile_url(&self, username: &str) -> Result<Url, LookupError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                LookupError::new(format!(
                    "directory url '{}' cannot carry a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .push("profiles")
            .push(username);
        Ok(url)
    }
}

#[async_trait]
impl ProfileDirectory for HttpProfileDirectory {
    async fn lookup_profile(&self, username: &str) -> Result<WatchedProfile, LookupError> {
        let url = self.profile_url(username)?;
        tracing::debug!(%url, "looking up profile");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| LookupError::new(format!("failed to reach profile directory: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error_from_response(status, username, &body));
        }

        let record: ProfileRecord = response
            .json()
            .await
            .map_err(|err| LookupError::new(format!("invalid profile payload: {err}")))?;
        Ok(record.into())
    }
}

fn error_from_response(status: StatusCode, username: &str, body: &str) -> LookupError {
    if let Ok(api_error) = serde_json::from_str::<ApiError>(body) {
        if !api_error.message.trim().is_empty() {
            return api_error.into();
        }
    }

    if status == StatusCode::NOT_FOUND {
        LookupError::new(format!("no profile found for '{username}'"))
    } else {
        LookupError::new(format!("profile directory returned {status}"))
    }
}

#[cfg(test)]
#[path = "tests/directory_tests.rs"]
mod tests;
