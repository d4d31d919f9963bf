// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;
use userdocs_app::{
    AuthToken, Credentials, Record, RecordFields, RecordId, RecordService, RemoteError,
};

pub const DEFAULT_BASE_URL: &str = "https://test.v5.pryaniky.com";
pub const DEFAULT_API_PREFIX: &str = "/ru/data/v3/testmethods/docs";
pub const AUTH_HEADER: &str = "x-auth";

/// Blocking HTTP client for the documents service.
#[derive(Debug, Clone)]
pub struct Client {
    root: Url,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, api_prefix: &str, timeout: Duration) -> Result<Self> {
        let root = join_root(base_url, api_prefix)?;
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;
        Ok(Self {
            root,
            timeout,
            http,
        })
    }

    /// Base URL with the API prefix applied.
    pub fn base_url(&self) -> &str {
        self.root.as_str().trim_end_matches('/')
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn login(&self, credentials: &Credentials) -> Result<AuthToken> {
        credentials.validate()?;
        let url = self.endpoint(&["login"]).map_err(anyhow::Error::new)?;
        debug!(username = %credentials.username, "logging in");

        let response = self
            .http
            .post(url)
            .json(&LoginRequest {
                username: &credentials.username,
                password: &credentials.password,
            })
            .send()
            .map_err(|error| anyhow!(connection_message(self.base_url(), &error)))?;

        let status = response.status();
        let body = response.text().context("read login response")?;
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            bail!(
                "login rejected for {} ({}) -- check username and password",
                credentials.username,
                status.as_u16()
            );
        }
        if !status.is_success() {
            bail!(
                "login failed ({}): {}",
                status.as_u16(),
                error_detail(status, &body)
            );
        }

        let envelope = decode_envelope(&body).map_err(anyhow::Error::new)?;
        if envelope.error_code != 0 {
            bail!(
                "login rejected for {}: {} -- check username and password",
                credentials.username,
                envelope.message()
            );
        }
        let data: LoginData = serde_json::from_value(envelope.data)
            .context("decode login response; expected data.token")?;
        if data.token.trim().is_empty() {
            bail!("login response carried an empty token -- retry");
        }
        Ok(AuthToken::new(data.token))
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, RemoteError> {
        let mut url = self.root.clone();
        url.path_segments_mut()
            .map_err(|()| RemoteError::Protocol(format!("{} cannot carry a path", self.root)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn send(
        &self,
        request: RequestBuilder,
        token: &AuthToken,
        target: Option<&RecordId>,
    ) -> Result<Option<Envelope>, RemoteError> {
        let response = request
            .header(AUTH_HEADER, token.expose())
            .send()
            .map_err(|error| RemoteError::Network(connection_message(self.base_url(), &error)))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|error| RemoteError::Network(format!("read response body: {error}")))?;
        if !status.is_success() {
            let error = classify_status(status, &body, target);
            warn!(status = status.as_u16(), %error, "request failed");
            return Err(error);
        }
        if body.trim().is_empty() {
            return Ok(None);
        }

        let envelope = decode_envelope(&body)?;
        if envelope.error_code != 0 {
            return Err(RemoteError::Application {
                code: envelope.error_code,
                message: envelope.message(),
            });
        }
        Ok(Some(envelope))
    }

    fn send_required(
        &self,
        request: RequestBuilder,
        token: &AuthToken,
        target: Option<&RecordId>,
    ) -> Result<Envelope, RemoteError> {
        self.send(request, token, target)?
            .ok_or_else(|| RemoteError::Protocol("empty response body".to_owned()))
    }
}

impl RecordService for Client {
    fn list(&self, token: &AuthToken) -> Result<Vec<Record>, RemoteError> {
        let url = self.endpoint(&["userdocs", "get"])?;
        debug!(%url, "listing records");
        let envelope = self.send_required(self.http.get(url), token, None)?;
        serde_json::from_value(envelope.data)
            .map_err(|error| RemoteError::Protocol(format!("decode record list: {error}")))
    }

    fn create(&self, token: &AuthToken, fields: &RecordFields) -> Result<(), RemoteError> {
        let url = self.endpoint(&["userdocs", "create"])?;
        debug!(%url, "creating record");
        self.send_required(self.http.post(url).json(fields), token, None)?;
        Ok(())
    }

    fn update(
        &self,
        token: &AuthToken,
        id: &RecordId,
        fields: &RecordFields,
    ) -> Result<(), RemoteError> {
        let url = self.endpoint(&["userdocs", "set", id.as_str()])?;
        debug!(%url, "updating record");
        self.send_required(self.http.post(url).json(fields), token, Some(id))?;
        Ok(())
    }

    fn delete(&self, token: &AuthToken, id: &RecordId) -> Result<(), RemoteError> {
        let url = self.endpoint(&["userdocs", "delete", id.as_str()])?;
        debug!(%url, "deleting record");
        self.send(self.http.post(url), token, Some(id))?;
        Ok(())
    }
}

fn join_root(base_url: &str, api_prefix: &str) -> Result<Url> {
    let base_url = base_url.trim().trim_end_matches('/');
    if base_url.is_empty() {
        bail!("server.base_url must not be empty");
    }
    let mut root = Url::parse(base_url)
        .with_context(|| format!("server.base_url {base_url:?} is not a valid URL"))?;
    if !matches!(root.scheme(), "http" | "https") {
        bail!(
            "server.base_url must use http or https, got {:?}",
            root.scheme()
        );
    }
    let prefix = api_prefix
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>();
    root.path_segments_mut()
        .map_err(|()| anyhow!("server.base_url {base_url:?} cannot carry a path"))?
        .pop_if_empty()
        .extend(prefix);
    Ok(root)
}

fn connection_message(base_url: &str, error: &reqwest::Error) -> String {
    if error.is_timeout() {
        return format!("{base_url} timed out -- retry");
    }
    format!("cannot reach {base_url} -- check the network and server.base_url ({error})")
}

/// Maps a non-2xx response onto the remote error taxonomy.
fn classify_status(status: StatusCode, body: &str, target: Option<&RecordId>) -> RemoteError {
    let code = status.as_u16();
    match code {
        401 | 403 => RemoteError::Auth { status: code },
        404 => match target {
            Some(id) => RemoteError::NotFound { id: id.to_string() },
            None => RemoteError::Protocol(format!("endpoint not found ({code})")),
        },
        400..=499 => RemoteError::Validation {
            status: code,
            message: error_detail(status, body),
        },
        _ => RemoteError::Network(format!(
            "server returned {code}: {}",
            error_detail(status, body)
        )),
    }
}

fn error_detail(status: StatusCode, body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<Envelope>(body) {
        let message = envelope.message();
        if !message.is_empty() {
            return message;
        }
    }
    let trimmed = body.trim();
    if !trimmed.is_empty() && trimmed.len() < 100 && !trimmed.contains('{') {
        return trimmed.to_owned();
    }
    status
        .canonical_reason()
        .unwrap_or("unexpected status")
        .to_owned()
}

fn decode_envelope(body: &str) -> Result<Envelope, RemoteError> {
    serde_json::from_str(body)
        .map_err(|error| RemoteError::Protocol(format!("decode response envelope: {error}")))
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    error_code: i64,
    #[serde(default)]
    error_text: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    data: serde_json::Value,
}

impl Envelope {
    fn message(&self) -> String {
        [&self.error_text, &self.error_message]
            .into_iter()
            .flatten()
            .map(|text| text.trim())
            .find(|text| !text.is_empty())
            .unwrap_or_default()
            .to_owned()
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginData {
    token: String,
}
