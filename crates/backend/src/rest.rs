//! REST implementations of [`IdAllocator`] and [`AccountStore`].
//!
//! Both clients wrap a shared `reqwest::Client` per collaborator and
//! translate each trait method into one HTTP call.  Calls are never
//! retried: a failed call is reported to the caller as-is.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use cg_domain::config::{MasterConfig, StoreConfig};
use cg_domain::error::{Error, Result};
use cg_domain::trace::TraceEvent;

use crate::provider::{AccountStore, IdAllocator};
use crate::types::{
    AddFriendRequest, AddFriendResponse, AuthenticateRequest, CreateGroupRequest, ErrorBody,
    IdResponse, RegisterUserRequest, UpdateUserInfoRequest, UserInfo,
};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Transport
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone)]
struct RestTransport {
    service: &'static str,
    http: Client,
    base_url: Url,
    api_key: Option<String>,
    timeout: Duration,
}

impl RestTransport {
    fn new(
        service: &'static str,
        base_url: &str,
        api_key: Option<String>,
        timeout_ms: u64,
    ) -> Result<Self> {
        let timeout = Duration::from_millis(timeout_ms);
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| Error::Config(format!("{service}.base_url: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "{service}.base_url: {base_url} cannot be used as a base URL"
            )));
        }

        Ok(Self {
            service,
            http,
            base_url,
            api_key,
            timeout,
        })
    }

    // ── request helpers ──────────────────────────────────────────────

    /// Decorate a `RequestBuilder` with the standard chatgate headers.
    fn decorate(&self, rb: RequestBuilder) -> RequestBuilder {
        let trace_id = Uuid::new_v4().to_string();
        let mut rb = rb
            .header("X-Client-Type", "chatgate")
            .header("X-Trace-Id", &trace_id);

        if let Some(ref key) = self.api_key {
            rb = rb.header("X-Api-Key", key);
        }
        rb
    }

    /// Build the full URL from path segments; each segment is
    /// percent-encoded, so user names may contain `/` or spaces.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("{}: invalid base URL", self.service)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send one request, emit a `BackendCall` event, and map non-2xx
    /// responses into domain errors.
    async fn execute(&self, endpoint: &str, rb: RequestBuilder) -> Result<Response> {
        let start = Instant::now();
        let result = self.decorate(rb).send().await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let resp = match result {
            Ok(resp) => resp,
            Err(e) => {
                TraceEvent::BackendCall {
                    service: self.service.to_owned(),
                    endpoint: endpoint.to_owned(),
                    status: e.status().map(|s| s.as_u16()).unwrap_or(0),
                    duration_ms,
                }
                .emit();
                return Err(from_reqwest(e));
            }
        };

        let status = resp.status();
        TraceEvent::BackendCall {
            service: self.service.to_owned(),
            endpoint: endpoint.to_owned(),
            status: status.as_u16(),
            duration_ms,
        }
        .emit();

        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        let message = error_message(&body)
            .unwrap_or_else(|| format!("{endpoint} returned {}", status.as_u16()));

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Error::Auth(format!(
                "{} rejected credentials ({}): {message}",
                self.service,
                status.as_u16()
            )));
        }
        Err(Error::backend(self.service, message))
    }

    async fn parse<T: DeserializeOwned>(&self, endpoint: &str, resp: Response) -> Result<T> {
        let body = resp.text().await.map_err(from_reqwest)?;
        serde_json::from_str(&body).map_err(|e| {
            Error::backend(
                self.service,
                format!("failed to parse {endpoint} response: {e}: {body}"),
            )
        })
    }

    async fn health(&self) -> Result<serde_json::Value> {
        let url = self.url(&["health"])?;
        let resp = self.execute("GET /health", self.http.get(url)).await?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(from_reqwest)?;
        if body.trim().is_empty() {
            return Ok(serde_json::json!({ "status": status }));
        }
        serde_json::from_str(&body).or_else(|_| Ok(serde_json::json!({ "status": body })))
    }
}

/// Pull a human-readable message out of an error body.
fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<ErrorBody>(trimmed) {
        Ok(parsed) => Some(parsed.error),
        Err(_) => Some(trimmed.to_owned()),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ID allocator client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// REST client for the ID allocator ("master").
#[derive(Debug, Clone)]
pub struct RestIdAllocator {
    transport: RestTransport,
}

impl RestIdAllocator {
    pub fn new(cfg: &MasterConfig) -> Result<Self> {
        Ok(Self {
            transport: RestTransport::new(
                "master",
                &cfg.base_url,
                cfg.api_key.clone(),
                cfg.timeout_ms,
            )?,
        })
    }

    /// The configured request timeout.
    pub fn timeout(&self) -> Duration {
        self.transport.timeout
    }
}

#[async_trait]
impl IdAllocator for RestIdAllocator {
    async fn allocate_id(&self) -> Result<i64> {
        let t = &self.transport;
        let url = t.url(&["api", "ids"])?;
        let resp = t.execute("POST /api/ids", t.http.post(url)).await?;
        let body: IdResponse = t.parse("POST /api/ids", resp).await?;
        Ok(body.id)
    }

    async fn health(&self) -> Result<serde_json::Value> {
        self.transport.health().await
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Account store client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// REST client for the persistent account store.
#[derive(Debug, Clone)]
pub struct RestAccountStore {
    transport: RestTransport,
}

impl RestAccountStore {
    pub fn new(cfg: &StoreConfig) -> Result<Self> {
        Ok(Self {
            transport: RestTransport::new(
                "store",
                &cfg.base_url,
                cfg.api_key.clone(),
                cfg.timeout_ms,
            )?,
        })
    }

    /// The configured request timeout.
    pub fn timeout(&self) -> Duration {
        self.transport.timeout
    }
}

#[async_trait]
impl AccountStore for RestAccountStore {
    async fn register(&self, user: &str, password: &str, id: i64) -> Result<()> {
        let t = &self.transport;
        let url = t.url(&["api", "users"])?;
        let req = RegisterUserRequest {
            user: user.to_owned(),
            password: password.to_owned(),
            id,
        };
        t.execute("POST /api/users", t.http.post(url).json(&req))
            .await?;
        Ok(())
    }

    async fn update_user_info(&self, user: &str, nick_name: &str, avatar: &[u8]) -> Result<i64> {
        let t = &self.transport;
        let url = t.url(&["api", "users", user])?;
        let req = UpdateUserInfoRequest {
            nick_name: nick_name.to_owned(),
            avatar: avatar.to_vec(),
        };
        let resp = t
            .execute("PUT /api/users/{user}", t.http.put(url).json(&req))
            .await?;
        let body: IdResponse = t.parse("PUT /api/users/{user}", resp).await?;
        Ok(body.id)
    }

    async fn get_user_info(&self, user: &str) -> Result<UserInfo> {
        let t = &self.transport;
        let url = t.url(&["api", "users", user])?;
        let resp = t.execute("GET /api/users/{user}", t.http.get(url)).await?;
        t.parse("GET /api/users/{user}", resp).await
    }

    async fn authenticate(&self, user: &str, password: &str) -> Result<i64> {
        let t = &self.transport;
        let url = t.url(&["api", "auth"])?;
        let req = AuthenticateRequest {
            user: user.to_owned(),
            password: password.to_owned(),
        };
        let resp = t
            .execute("POST /api/auth", t.http.post(url).json(&req))
            .await?;
        let body: IdResponse = t.parse("POST /api/auth", resp).await?;
        Ok(body.id)
    }

    async fn add_friend(&self, from_id: i64, to_id: i64, confirm: bool) -> Result<bool> {
        let t = &self.transport;
        let url = t.url(&["api", "friends"])?;
        let req = AddFriendRequest {
            from_id,
            to_id,
            confirm,
        };
        let resp = t
            .execute("POST /api/friends", t.http.post(url).json(&req))
            .await?;
        let body: AddFriendResponse = t.parse("POST /api/friends", resp).await?;
        Ok(body.confirm)
    }

    async fn find_user(&self, user: &str) -> Result<i64> {
        let t = &self.transport;
        let url = t.url(&["api", "users", user, "id"])?;
        let resp = t
            .execute("GET /api/users/{user}/id", t.http.get(url))
            .await?;
        let body: IdResponse = t.parse("GET /api/users/{user}/id", resp).await?;
        Ok(body.id)
    }

    async fn create_group(&self, owner_id: i64, group_id: i64) -> Result<()> {
        let t = &self.transport;
        let url = t.url(&["api", "groups"])?;
        let req = CreateGroupRequest { owner_id, group_id };
        t.execute("POST /api/groups", t.http.post(url).json(&req))
            .await?;
        Ok(())
    }

    async fn health(&self) -> Result<serde_json::Value> {
        self.transport.health().await
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Error conversion helper
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Convert a `reqwest::Error` into a domain `Error`.
///
/// Timeout errors become `Error::Timeout`; everything else becomes
/// `Error::Http`.
pub fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(base: &str) -> RestTransport {
        RestTransport::new("store", base, None, 1000).unwrap()
    }

    #[test]
    fn url_appends_encoded_segments() {
        let t = store("http://localhost:9002/");
        let url = t.url(&["api", "users", "bob smith"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:9002/api/users/bob%20smith");
    }

    #[test]
    fn url_keeps_base_path_prefix() {
        let t = store("http://gw.internal/store");
        let url = t.url(&["api", "auth"]).unwrap();
        assert_eq!(url.as_str(), "http://gw.internal/store/api/auth");
    }

    #[test]
    fn invalid_base_url_is_config_error() {
        let err = RestTransport::new("master", "not a url", None, 1000).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn error_message_prefers_json_error_field() {
        assert_eq!(
            error_message(r#"{"error":"wrong password"}"#).as_deref(),
            Some("wrong password")
        );
        assert_eq!(error_message("plain text").as_deref(), Some("plain text"));
        assert_eq!(error_message("  "), None);
    }
}
