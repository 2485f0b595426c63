//! Object store access over HTTP.
//!
//! Objects live at `<endpoint>/<key>`. Existence is probed with `HEAD`;
//! uploads use `PUT` with the `x-amz-acl: public-read` header understood by
//! S3-compatible buckets. An optional bearer token is sent with every request.

use super::{ObjectStore, StoreError};
use crate::config::StoreSection;
use std::sync::OnceLock;
use std::time::Duration;

/// Network timeout for a single store request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// HTTP-backed object store using `ureq`.
#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    endpoint: String,
    token: Option<String>,
}

impl HttpObjectStore {
    /// Create a store rooted at `endpoint`.
    #[must_use]
    pub fn new(endpoint: &str, token: Option<String>) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_owned(),
            token,
        }
    }

    /// Create a store from configuration, reading the token from the
    /// configured environment variable. Returns `None` without an endpoint.
    #[must_use]
    pub fn from_settings(settings: &StoreSection) -> Option<Self> {
        let endpoint = settings.endpoint.as_deref()?;
        let token = std::env::var(&settings.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty());
        if token.is_none() {
            log::debug!("{} not set; store requests are anonymous", settings.token_env);
        }
        Some(Self::new(endpoint, token))
    }

    /// The URL of the object at `key`.
    ///
    /// # Examples
    ///
    /// ```
    /// use leveldb_release::store::HttpObjectStore;
    ///
    /// let store = HttpObjectStore::new("https://bucket.example/", None);
    /// assert_eq!(
    ///     store.object_url("/software/LevelDB-1.2-rev-1.zip"),
    ///     "https://bucket.example/software/LevelDB-1.2-rev-1.zip"
    /// );
    /// ```
    #[must_use]
    pub fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.endpoint, key.trim_start_matches('/'))
    }

    fn authorization(&self) -> Option<String> {
        self.token.as_ref().map(|token| format!("Bearer {token}"))
    }
}

impl ObjectStore for HttpObjectStore {
    fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let url = self.object_url(key);
        let mut request = http_agent().head(&url);
        if let Some(auth) = self.authorization() {
            request = request.header("Authorization", auth);
        }

        match request.call() {
            Ok(_) => Ok(true),
            Err(ureq::Error::StatusCode(404)) => Ok(false),
            Err(err) => Err(map_ureq_error(&url, &err)),
        }
    }

    fn put_public(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let url = self.object_url(key);
        log::info!("uploading {} byte(s) to {url}", bytes.len());

        let mut request = http_agent()
            .put(&url)
            .header("x-amz-acl", "public-read")
            .header("Content-Type", content_type(key));
        if let Some(auth) = self.authorization() {
            request = request.header("Authorization", auth);
        }

        request
            .send(bytes)
            .map_err(|err| map_ureq_error(&url, &err))?;
        Ok(())
    }
}

/// Content type for an object key, derived from its extension.
fn content_type(key: &str) -> &'static str {
    let extension = key.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("zip") => "application/zip",
        Some("json") => "application/json",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Shared `ureq` agent with request timeout configuration.
fn http_agent() -> &'static ureq::Agent {
    static AGENT: OnceLock<ureq::Agent> = OnceLock::new();
    AGENT.get_or_init(|| {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build();
        ureq::Agent::new_with_config(config)
    })
}

/// Map a ureq error to a [`StoreError`].
fn map_ureq_error(url: &str, err: &ureq::Error) -> StoreError {
    match err {
        ureq::Error::StatusCode(status) => StoreError::Status {
            url: url.to_owned(),
            status: *status,
        },
        other => StoreError::Http {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn object_url_joins_endpoint_and_key() {
        let store = HttpObjectStore::new("https://kjkpub.s3.amazonaws.com/", None);
        assert_eq!(
            store.object_url("software/leveldb/rel/LevelDB-1.2-rev-1.zip"),
            "https://kjkpub.s3.amazonaws.com/software/leveldb/rel/LevelDB-1.2-rev-1.zip"
        );
    }

    #[rstest]
    #[case::zip("a/LevelDB-1.2-rev-1.zip", "application/zip")]
    #[case::json("a/LevelDB-1.2-rev-1-notes.json", "application/json")]
    #[case::upper("A.ZIP", "application/zip")]
    #[case::none("a/blob", "application/octet-stream")]
    fn content_type_follows_extension(#[case] key: &str, #[case] expected: &str) {
        assert_eq!(content_type(key), expected);
    }

    #[test]
    fn status_errors_keep_the_code() {
        let mapped = map_ureq_error("https://store.test/k", &ureq::Error::StatusCode(403));
        assert!(matches!(mapped, StoreError::Status { status: 403, .. }));
    }

    #[test]
    fn other_errors_become_http_errors() {
        let mapped = map_ureq_error("https://store.test/k", &ureq::Error::ConnectionFailed);
        assert!(matches!(mapped, StoreError::Http { .. }));
    }

    #[test]
    fn from_settings_requires_endpoint() {
        assert!(HttpObjectStore::from_settings(&StoreSection::default()).is_none());

        let settings = StoreSection {
            endpoint: Some("https://bucket.example".to_owned()),
            token_env: "LEVELDB_RELEASE_TEST_UNSET_TOKEN".to_owned(),
        };
        let store = HttpObjectStore::from_settings(&settings).expect("store configured");
        assert!(store.authorization().is_none());
    }

    #[test]
    fn from_settings_reads_token_from_environment() {
        let settings = StoreSection {
            endpoint: Some("https://bucket.example/".to_owned()),
            token_env: "LEVELDB_RELEASE_TEST_TOKEN".to_owned(),
        };
        temp_env::with_var("LEVELDB_RELEASE_TEST_TOKEN", Some("s3cr3t"), || {
            let store = HttpObjectStore::from_settings(&settings).expect("store configured");
            assert_eq!(store.authorization().as_deref(), Some("Bearer s3cr3t"));
            assert_eq!(store.object_url("k"), "https://bucket.example/k");
        });
        temp_env::with_var("LEVELDB_RELEASE_TEST_TOKEN", Some("  "), || {
            let store = HttpObjectStore::from_settings(&settings).expect("store configured");
            assert!(store.authorization().is_none(), "blank token is ignored");
        });
    }

    #[test]
    fn authorization_uses_bearer_token() {
        let store = HttpObjectStore::new("https://bucket.example", Some("s3cr3t".to_owned()));
        assert_eq!(store.authorization().as_deref(), Some("Bearer s3cr3t"));
    }
}
