use crate::error::{PrachtError, Result};
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value, json};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

/// Header carrying the auth key on every authenticated request
pub const AUTH_HEADER: &str = "AuthKey";
/// Default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) const LOGIN_PATH: &str = "/api/v1/login";

/// Decoded response body
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    /// Body that did not parse as JSON; kept for diagnostics only
    Text(String),
}

impl ResponseBody {
    /// Require a JSON object, as every typed endpoint does
    pub fn into_object(self, path: &str) -> Result<Map<String, Value>> {
        match self {
            ResponseBody::Json(Value::Object(map)) => Ok(map),
            _ => Err(PrachtError::protocol(format!(
                "Unexpected response from {}",
                path
            ))),
        }
    }
}

/// HTTP client for a single Pracht Alpha wallbox
///
/// Owns the session state: the auth key returned by login and the password
/// retained for automatic re-login. A 403 on an authenticated call triggers
/// exactly one re-login followed by exactly one retry.
pub struct WallboxClient {
    host: String,
    base_url: String,
    http: reqwest::Client,
    auth_key: RwLock<Option<String>>,
    password: RwLock<Option<SecretString>>,
    /// Serializes auth-key replacement
    login_lock: Mutex<()>,
    logger: StructuredLogger,
}

impl std::fmt::Debug for WallboxClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WallboxClient")
            .field("host", &self.host)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// `http://{host}` unless the host already carries a scheme
pub fn base_url_for(host: &str) -> String {
    let trimmed = host.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

impl WallboxClient {
    /// Create a client with the default request timeout
    pub fn new(host: &str) -> Result<Self> {
        Self::with_timeout(host, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a client with an explicit per-request timeout
    pub fn with_timeout(host: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| PrachtError::generic(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self::with_http_client(http, host))
    }

    /// Create a client around a pre-built `reqwest::Client`
    pub fn with_http_client(http: reqwest::Client, host: &str) -> Self {
        let logger = get_logger_with_context(LogContext::new("wallbox").with_host(host));
        Self {
            host: host.to_string(),
            base_url: base_url_for(host),
            http,
            auth_key: RwLock::new(None),
            password: RwLock::new(None),
            login_lock: Mutex::new(()),
            logger,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether a login has produced an auth key
    pub async fn is_authenticated(&self) -> bool {
        self.auth_key.read().await.is_some()
    }

    /// Log in and store the key; the password is kept for automatic
    /// re-login only once the device accepted it
    pub(crate) async fn authenticate(&self, password: &str) -> Result<String> {
        let _guard = self.login_lock.lock().await;
        let key = self.do_login(password).await?;
        *self.password.write().await = Some(SecretString::from(password.to_owned()));
        Ok(key)
    }

    /// Perform a JSON request, re-authenticating once on 403
    pub(crate) async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<ResponseBody> {
        let sent_key = self.auth_key.read().await.clone();
        let resp = self
            .send(method.clone(), path, body, sent_key.as_deref())
            .await?;

        if resp.status() != StatusCode::FORBIDDEN {
            return self.finish(path, resp).await;
        }

        if self.password.read().await.is_none() {
            self.logger
                .debug(&format!("{} rejected and no password on file", path));
            return Err(PrachtError::auth("Authentication failed"));
        }

        self.relogin(sent_key.as_deref()).await?;

        let retry_key = self.auth_key.read().await.clone();
        let resp = self.send(method, path, body, retry_key.as_deref()).await?;
        if resp.status() == StatusCode::FORBIDDEN {
            self.logger
                .warn(&format!("{} still rejected after re-login", path));
            return Err(PrachtError::auth("Authentication failed"));
        }
        self.finish(path, resp).await
    }

    /// Replace the auth key after a 403, unless a concurrent caller already did
    async fn relogin(&self, stale_key: Option<&str>) -> Result<()> {
        let _guard = self.login_lock.lock().await;

        let current = self.auth_key.read().await.clone();
        if current.is_some() && current.as_deref() != stale_key {
            self.logger
                .debug("Auth key already refreshed by a concurrent request");
            return Ok(());
        }

        let password = self.password.read().await;
        let Some(password) = password.as_ref() else {
            return Err(PrachtError::auth("Authentication failed"));
        };
        self.logger.info("Auth key rejected, logging in again");
        self.do_login(password.expose_secret()).await.map(|_| ())
    }

    /// Login call; never re-authenticates
    async fn do_login(&self, password: &str) -> Result<String> {
        let body = json!({ "Password": password });
        let resp = self.send(Method::POST, LOGIN_PATH, Some(&body), None).await?;
        if resp.status() == StatusCode::FORBIDDEN {
            return Err(PrachtError::auth("Authentication failed"));
        }

        let key = match self.finish(LOGIN_PATH, resp).await? {
            ResponseBody::Json(Value::Object(map)) => match map.get(AUTH_HEADER) {
                Some(Value::String(key)) => key.clone(),
                _ => return Err(PrachtError::auth("Login failed: no AuthKey in response")),
            },
            _ => return Err(PrachtError::auth("Login failed: no AuthKey in response")),
        };

        *self.auth_key.write().await = Some(key.clone());
        self.logger.debug("Login succeeded, auth key stored");
        Ok(key)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        auth_key: Option<&str>,
    ) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        self.logger.trace(&format!("{} {}", method, url));

        let mut builder = self.http.request(method, &url);
        if let Some(key) = auth_key {
            builder = builder.header(AUTH_HEADER, key);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        builder.send().await.map_err(|e| {
            PrachtError::connection(format!("Cannot connect to {}: {}", self.host, e))
        })
    }

    /// Map status codes and decode the body
    async fn finish(&self, path: &str, resp: reqwest::Response) -> Result<ResponseBody> {
        let status = resp.status();
        if status == StatusCode::FORBIDDEN {
            return Err(PrachtError::auth("Authentication failed"));
        }
        if status != StatusCode::OK {
            let text = resp.text().await.unwrap_or_default();
            self.logger
                .debug(&format!("{} answered {}", path, status.as_u16()));
            return Err(PrachtError::protocol_status(status.as_u16(), text));
        }

        let text = resp.text().await.map_err(|e| {
            PrachtError::connection(format!("Cannot read response from {}: {}", self.host, e))
        })?;
        Ok(match serde_json::from_str::<Value>(&text) {
            Ok(value) => ResponseBody::Json(value),
            Err(_) => ResponseBody::Text(text),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_adds_scheme_only_when_missing() {
        assert_eq!(base_url_for("192.168.1.20"), "http://192.168.1.20");
        assert_eq!(base_url_for("http://127.0.0.1:8080/"), "http://127.0.0.1:8080");
        assert_eq!(base_url_for("https://wallbox.local"), "https://wallbox.local");
    }

    #[test]
    fn into_object_rejects_non_objects() {
        let err = ResponseBody::Text("<html>".into())
            .into_object("/api/v1/all")
            .unwrap_err();
        assert!(err.is_protocol());

        let err = ResponseBody::Json(serde_json::json!([1, 2]))
            .into_object("/api/v1/all")
            .unwrap_err();
        assert!(err.is_protocol());

        let map = ResponseBody::Json(serde_json::json!({"a": 1}))
            .into_object("/api/v1/all")
            .unwrap();
        assert_eq!(map.len(), 1);
    }

    #[tokio::test]
    async fn debug_output_omits_secrets() {
        let client = WallboxClient::new("10.0.0.2").unwrap();
        *client.password.write().await = Some(SecretString::from("hunter2".to_string()));
        *client.auth_key.write().await = Some("key-123".to_string());
        let rendered = format!("{:?}", client);
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("key-123"));
        assert!(client.is_authenticated().await);
    }
}
