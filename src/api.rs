use crate::signature::{auth_token, sign};
use crate::types::TrackPair;
use crate::{Result, ScrobbleError};
use async_trait::async_trait;
use http_client::{HttpClient, Request};
use http_types::{Method, Url};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// Endpoint for every call of the Last.fm web service.
pub const API_ROOT: &str = "https://ws.audioscrobbler.com/2.0/";

const METHOD_MOBILE_SESSION: &str = "auth.getMobileSession";
const METHOD_SCROBBLE: &str = "track.scrobble";

// =============================================================================
// ScrobbleApi trait and implementation
// =============================================================================

/// The two authenticated Last.fm operations the scrobbler needs.
///
/// # Mocking Support
///
/// When the `mock` feature is enabled, this crate provides `MockScrobbleApi`
/// that implements this trait using the `mockall` library.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait(?Send)]
pub trait ScrobbleApi {
    /// Exchange username and password for a session key.
    ///
    /// Fails with [`ScrobbleError::Auth`] when Last.fm answers with an error.
    async fn get_mobile_session(&self, username: &str, password: &str) -> Result<String>;

    /// Submit one scrobble played at `timestamp` (Unix seconds).
    ///
    /// Fails with [`ScrobbleError::Submission`] when Last.fm answers with an
    /// error. On success the raw response payload is returned.
    async fn scrobble(&self, session_key: &str, pair: &TrackPair, timestamp: i64)
        -> Result<Value>;
}

/// [`ScrobbleApi`] backed by a real HTTP client.
///
/// Every call is signed with the API secret and sent as a form-encoded POST.
///
/// # Examples
///
/// ```rust,no_run
/// use csv_scrobbler::{LastFmApiClientImpl, ScrobbleApi, TrackPair};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let http_client = http_client::native::NativeClient::new();
/// let api = LastFmApiClientImpl::new(Box::new(http_client), "api-key", "api-secret");
///
/// let session_key = api.get_mobile_session("username", "password").await?;
/// api.scrobble(&session_key, &TrackPair::new("Radiohead", "Creep"), 1700000000)
///     .await?;
/// # Ok::<(), csv_scrobbler::ScrobbleError>(())
/// # });
/// ```
#[derive(Clone)]
pub struct LastFmApiClientImpl {
    client: Arc<dyn HttpClient + Send + Sync>,
    api_key: String,
    api_secret: String,
    base_url: String,
}

impl LastFmApiClientImpl {
    pub fn new(
        client: Box<dyn HttpClient + Send + Sync>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self::with_base_url(client, api_key, api_secret, API_ROOT)
    }

    /// Create a client talking to a different endpoint.
    ///
    /// This is useful for testing against a stub server.
    pub fn with_base_url(
        client: Box<dyn HttpClient + Send + Sync>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client: Arc::from(client),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            base_url: base_url.into(),
        }
    }

    /// Sign `params`, POST them and decode the JSON answer.
    ///
    /// Error payloads are returned as `Ok`; callers decide which error
    /// variant they map to.
    async fn signed_post(&self, params: &[(&str, &str)]) -> Result<Value> {
        let api_sig = sign(params, &self.api_secret);

        let form_string: String = params
            .iter()
            .copied()
            .chain([("api_sig", api_sig.as_str()), ("format", "json")])
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let url = self
            .base_url
            .parse::<Url>()
            .map_err(|e| ScrobbleError::Http(format!("Invalid API URL {}: {e}", self.base_url)))?;

        let method_name = params
            .iter()
            .find(|(k, _)| *k == "method")
            .map(|(_, v)| *v)
            .unwrap_or("unknown");

        let mut request = Request::new(Method::Post, url);
        let _ = request.insert_header("Content-Type", "application/x-www-form-urlencoded");
        let _ = request.insert_header("Accept", "application/json");
        request.set_body(form_string);

        let request_start = std::time::Instant::now();
        let mut response = self
            .client
            .send(request)
            .await
            .map_err(|e| ScrobbleError::Http(e.to_string()))?;

        let status = response.status();
        log::debug!(
            "POST {} method={} -> {} in {}ms",
            self.base_url,
            method_name,
            status,
            request_start.elapsed().as_millis()
        );

        let body = response
            .body_string()
            .await
            .map_err(|e| ScrobbleError::Http(e.to_string()))?;

        serde_json::from_str(&body).map_err(|e| {
            if status.is_success() {
                ScrobbleError::InvalidResponse(e.to_string())
            } else {
                ScrobbleError::Http(format!("{status} from {}", self.base_url))
            }
        })
    }
}

#[async_trait(?Send)]
impl ScrobbleApi for LastFmApiClientImpl {
    async fn get_mobile_session(&self, username: &str, password: &str) -> Result<String> {
        let token = auth_token(username, password);
        let params = [
            ("api_key", self.api_key.as_str()),
            ("method", METHOD_MOBILE_SESSION),
            ("username", username),
            ("authToken", token.as_str()),
        ];

        log::debug!("Requesting mobile session for {username}");
        let payload = self.signed_post(&params).await?;

        if let Some((code, message)) = api_error(&payload) {
            return Err(ScrobbleError::Auth {
                code,
                message,
                payload,
            });
        }

        parse_session_key(&payload)
    }

    async fn scrobble(
        &self,
        session_key: &str,
        pair: &TrackPair,
        timestamp: i64,
    ) -> Result<Value> {
        let timestamp = timestamp.to_string();
        let params = [
            ("method", METHOD_SCROBBLE),
            ("api_key", self.api_key.as_str()),
            ("sk", session_key),
            ("artist", pair.artist.as_str()),
            ("track", pair.track.as_str()),
            ("timestamp", timestamp.as_str()),
        ];

        let payload = self.signed_post(&params).await?;

        if let Some((code, message)) = api_error(&payload) {
            return Err(ScrobbleError::Submission {
                code,
                message,
                payload,
            });
        }

        if let Some(reason) = ignored_message(&payload) {
            log::warn!("Last.fm ignored scrobble of {pair}: {reason}");
        }

        Ok(payload)
    }
}

// =============================================================================
// Response decoding
// =============================================================================

#[derive(Deserialize)]
pub struct ApiSessionResponse {
    pub session: ApiSession,
}

#[derive(Deserialize)]
pub struct ApiSession {
    pub name: Option<String>,
    pub key: String,
}

/// `(code, message)` when the payload is a Last.fm error response.
pub fn api_error(payload: &Value) -> Option<(i64, String)> {
    let error = payload.get("error")?;
    let code = error
        .as_i64()
        .or_else(|| error.as_str().and_then(|s| s.parse().ok()))
        .unwrap_or(0);
    let message = payload
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("Unknown error")
        .to_string();
    Some((code, message))
}

/// Extract `session.key` from a successful `auth.getMobileSession` payload.
pub fn parse_session_key(payload: &Value) -> Result<String> {
    let response: ApiSessionResponse = serde_json::from_value(payload.clone())
        .map_err(|e| ScrobbleError::InvalidResponse(format!("missing session key: {e}")))?;

    if let Some(name) = &response.session.name {
        log::debug!("Session established for {name}");
    }

    Ok(response.session.key)
}

/// Reason Last.fm gives when it accepted the request but dropped the scrobble.
pub fn ignored_message(payload: &Value) -> Option<String> {
    let scrobbles = payload.get("scrobbles")?;
    let ignored = scrobbles
        .pointer("/@attr/ignored")
        .and_then(|v| v.as_u64().or_else(|| v.as_str()?.parse().ok()))
        .unwrap_or(0);
    if ignored == 0 {
        return None;
    }

    let reason = scrobbles
        .pointer("/scrobble/ignoredMessage/#text")
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .unwrap_or("no reason given");
    Some(reason.to_string())
}
