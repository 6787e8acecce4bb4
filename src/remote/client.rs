// src/remote/client.rs

//! Reqwest-based client for a Compiler Explorer compatible service.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::RemoteSection;
use crate::errors::{ExecError, Result};
use crate::remote::envelope::RemoteResponseEnvelope;
use crate::remote::payload::{CompileJob, CompileRequest, ShortenerRequest};
use crate::types::ExecutionResult;

/// Outcome of a shortener call: a url, or an empty url and a message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShortLinkResult {
    pub url: String,
    pub error: Option<String>,
}

impl ShortLinkResult {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            url: String::new(),
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ShortenerResponse {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RemoteExecutionClient {
    http: Client,
    base_url: String,
}

impl RemoteExecutionClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { http, base_url })
    }

    pub fn from_config(cfg: &RemoteSection) -> Result<Self> {
        Self::new(cfg.base_url.clone(), cfg.timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Compile (and run) `job`. Never fails: every error ends up in
    /// `error_message`.
    pub async fn compile_and_run(&self, job: &CompileJob) -> ExecutionResult {
        info!(
            compiler = %job.compiler_id,
            language = %job.language_id,
            want_assembly = job.want_assembly,
            "sending remote compile request"
        );

        match self.post_compile(job).await {
            Ok(envelope) => {
                debug!(compiler = %job.compiler_id, ?envelope, "remote response classified");
                envelope.into_result()
            }
            Err(err) => {
                warn!(compiler = %job.compiler_id, error = %err, "remote compile failed");
                ExecutionResult::failure(err.to_string())
            }
        }
    }

    async fn post_compile(&self, job: &CompileJob) -> Result<RemoteResponseEnvelope> {
        let url = format!("{}/api/compiler/{}/compile", self.base_url, job.compiler_id);
        let resp = self
            .http
            .post(&url)
            .json(&CompileRequest::from_job(job))
            .send()
            .await?;

        let body = read_success_body(resp).await?;
        RemoteResponseEnvelope::parse(&body)
    }

    /// Create a short link for a single-compiler session.
    ///
    /// Inputs are checked in the order language, source, compiler id; the
    /// first blank one is named in the error.
    pub async fn compile_and_shorten(
        &self,
        language_id: &str,
        source: &str,
        compiler_id: &str,
        flags: &str,
    ) -> ShortLinkResult {
        if let Err(err) = validate_share(language_id, source, compiler_id) {
            return ShortLinkResult::failure(err.to_string());
        }

        match self.post_shortener(language_id, source, compiler_id, flags).await {
            Ok(url) => {
                info!(compiler = %compiler_id, %url, "short link created");
                ShortLinkResult { url, error: None }
            }
            Err(err) => {
                warn!(compiler = %compiler_id, error = %err, "short link request failed");
                ShortLinkResult::failure(err.to_string())
            }
        }
    }

    async fn post_shortener(
        &self,
        language_id: &str,
        source: &str,
        compiler_id: &str,
        flags: &str,
    ) -> Result<String> {
        let url = format!("{}/api/shortener", self.base_url);
        let resp = self
            .http
            .post(&url)
            .json(&ShortenerRequest::single(language_id, source, compiler_id, flags))
            .send()
            .await?;

        let body = read_success_body(resp).await?;
        if body.trim().is_empty() {
            return Err(ExecError::RemoteProtocol(
                "remote service returned an empty response".to_string(),
            ));
        }

        let parsed: Option<ShortenerResponse> = serde_json::from_str(&body).map_err(|e| {
            ExecError::RemoteProtocol(format!("failed to parse shortener response: {e}"))
        })?;

        parsed
            .and_then(|r| r.url)
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| {
                ExecError::RemoteProtocol("shortener response did not contain a url".to_string())
            })
    }
}

/// Return the body of a 2xx response, or the raw body as a protocol error.
async fn read_success_body(resp: reqwest::Response) -> Result<String> {
    let status = resp.status();
    let body = resp.text().await?;

    if status.is_success() {
        return Ok(body);
    }

    debug!(%status, "remote service returned an error status");
    if body.trim().is_empty() {
        Err(ExecError::RemoteProtocol(format!(
            "remote service returned HTTP {}",
            status_label(status)
        )))
    } else {
        Err(ExecError::RemoteProtocol(body))
    }
}

fn status_label(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {}", status.as_u16(), reason),
        None => status.as_u16().to_string(),
    }
}

fn validate_share(language_id: &str, source: &str, compiler_id: &str) -> Result<()> {
    for (name, value) in [
        ("language", language_id),
        ("source", source),
        ("compilerId", compiler_id),
    ] {
        if value.trim().is_empty() {
            return Err(ExecError::Validation(name));
        }
    }
    Ok(())
}
