//! HTTP driver — policy-checked network requests with a hard deadline.

use std::time::Instant;

use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use super::allowlist::is_allowed;
use super::{DriverContext, DriverError, HttpInput, HttpOutcome};

/// HTTP driver: validates the target URL, enforces the allowlist, and
/// applies the context timeout as the request deadline.
#[derive(Debug, Clone, Default)]
pub struct HttpDriver {
    client: Client,
}

impl HttpDriver {
    /// Create a driver with a default client.
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Create a driver with a caller-configured client.
    ///
    /// This is the injection point for proxies, TLS settings, or clients
    /// pointed at local test servers.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Execute `input` under `ctx`'s policy and limits.
    ///
    /// # Errors
    ///
    /// Rejects with [`DriverError::Configuration`] for a missing or
    /// unparseable URL or method and with [`DriverError::PolicyViolation`]
    /// when the URL fails the allowlist (no request is sent). Remote errors
    /// and deadline expiry resolve as an [`HttpOutcome`] value.
    pub async fn execute(
        &self,
        input: &HttpInput,
        ctx: &DriverContext,
    ) -> Result<HttpOutcome, DriverError> {
        let target = input.url.trim();
        if target.is_empty() {
            return Err(DriverError::Configuration(
                "http input requires a target url".to_owned(),
            ));
        }
        let parsed = Url::parse(target)
            .map_err(|err| DriverError::Configuration(format!("invalid url '{target}': {err}")))?;
        if !is_allowed(target, &ctx.allowlist) {
            warn!(url = %target, "http request rejected by allowlist");
            return Err(DriverError::PolicyViolation {
                target: target.to_owned(),
            });
        }
        let method = reqwest::Method::from_bytes(input.method.as_bytes()).map_err(|_| {
            DriverError::Configuration(format!("invalid http method '{}'", input.method))
        })?;

        let timeout = ctx.limits.timeout();
        debug!(
            driver = ctx.driver_name.as_deref().unwrap_or("http"),
            url = %target,
            method = %method,
            timeout_ms = timeout.as_millis(),
            "http request started"
        );

        let mut request = self.client.request(method, parsed).timeout(timeout);
        for (name, value) in &input.headers {
            request = request.header(name, value);
        }
        if let Some(body) = &input.body {
            request = request.body(body.clone());
        }

        let started = Instant::now();
        let outcome = match request.send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                match response.text().await {
                    Ok(body) => HttpOutcome {
                        url: target.to_owned(),
                        status: Some(status),
                        body,
                        error: None,
                        timed_out: false,
                        duration_ms: elapsed_ms(started),
                    },
                    Err(err) => HttpOutcome {
                        url: target.to_owned(),
                        status: Some(status),
                        body: String::new(),
                        error: Some(format!("failed to read response body: {err}")),
                        timed_out: err.is_timeout(),
                        duration_ms: elapsed_ms(started),
                    },
                }
            }
            Err(err) => HttpOutcome {
                url: target.to_owned(),
                status: None,
                body: String::new(),
                error: Some(err.to_string()),
                timed_out: err.is_timeout(),
                duration_ms: elapsed_ms(started),
            },
        };

        debug!(
            url = %target,
            status = outcome.status,
            timed_out = outcome.timed_out,
            duration_ms = outcome.duration_ms,
            "http request finished"
        );
        Ok(outcome)
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
