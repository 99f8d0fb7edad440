//! Local model inference.
//!
//! [`InferenceClient`] owns the call policy (liveness probe, retry bound,
//! timeout, response validation) and talks to the service through a
//! [`CompletionTransport`]. [`OllamaTransport`] is the HTTP implementation;
//! tests plug in fakes.
//!
//! Failures are values ([`InferenceResult::Failed`]), never errors: the run
//! always goes on to write a document.

use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use newsdigest_shared::{AppConfig, DigestError, InferenceSettings, Result};

use crate::prompt::InferencePrompt;

/// User-Agent string for requests to the inference service.
const USER_AGENT: &str = concat!("newsdigest/", env!("CARGO_PKG_VERSION"));

/// Longest slice of an error body quoted in a failure detail.
const MAX_ERROR_BODY: usize = 200;

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Why the AI step produced no text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    ServiceUnreachable,
    Timeout,
    EmptyResponse,
    MalformedResponse,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ServiceUnreachable => "inference unreachable",
            Self::Timeout => "inference timed out",
            Self::EmptyResponse => "empty response",
            Self::MalformedResponse => "malformed response",
        })
    }
}

/// Generated text plus how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub model: String,
    /// Generation requests sent, including the successful one.
    pub attempts: u32,
    /// Time spent on generation requests and backoff.
    pub elapsed: Duration,
}

/// A failed AI step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceFailure {
    pub kind: FailureKind,
    /// Human-readable specifics (status code, timeout, parse error).
    pub detail: String,
    /// Generation requests sent; 0 when the probe failed.
    pub attempts: u32,
}

/// Outcome of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InferenceResult {
    Ok(Completion),
    Failed(InferenceFailure),
}

impl InferenceResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    /// Generation requests sent.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Ok(c) => c.attempts,
            Self::Failed(f) => f.attempts,
        }
    }

    /// One-line status for headers and the CLI summary.
    pub fn status_line(&self) -> String {
        match self {
            Self::Ok(_) => "succeeded".to_string(),
            Self::Failed(f) => format!("failed ({})", f.kind),
        }
    }
}

/// Result plus notices gathered on the way (e.g. an unlisted model).
#[derive(Debug, Clone)]
pub struct InferenceOutcome {
    pub result: InferenceResult,
    pub notices: Vec<String>,
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Sampling options forwarded to the model.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct GenerateOptions {
    pub temperature: f32,
    pub top_p: f32,
}

/// Body of a generation request.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub stream: bool,
    pub options: GenerateOptions,
}

/// Low-level failure reported by a transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Connection refused, reset, or DNS failure.
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out")]
    Timeout,

    /// Non-2xx status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body could not be read or decoded.
    #[error("failed to read response: {0}")]
    Body(String),
}

impl TransportError {
    /// Worth another attempt: connection trouble or a server-side error.
    fn is_transient(&self) -> bool {
        match self {
            Self::Connect(_) | Self::Body(_) => true,
            Self::Status { status, .. } => *status >= 500,
            Self::Timeout => false,
        }
    }
}

/// The three calls the inference policy needs from a service.
pub trait CompletionTransport: Send + Sync {
    /// Lightweight liveness check; returns the service version.
    fn probe(&self) -> impl Future<Output = std::result::Result<String, TransportError>> + Send;

    /// Names of the models the service can run.
    fn list_models(
        &self,
    ) -> impl Future<Output = std::result::Result<Vec<String>, TransportError>> + Send;

    /// Send one generation request; returns the raw response body.
    fn generate(
        &self,
        request: &GenerateRequest<'_>,
    ) -> impl Future<Output = std::result::Result<String, TransportError>> + Send;
}

/// HTTP transport for an Ollama-compatible service.
#[derive(Debug, Clone)]
pub struct OllamaTransport {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct VersionResponse {
    #[serde(default)]
    version: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagsModel>,
}

#[derive(Deserialize)]
struct TagsModel {
    name: String,
}

impl OllamaTransport {
    /// Build a transport for `settings.base_url`.
    ///
    /// Only the connect phase is bounded here; the per-call deadlines are
    /// applied by [`InferenceClient`].
    pub fn new(settings: &InferenceSettings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(settings.probe_timeout)
            .build()
            .map_err(|e| DigestError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: settings.base_url.as_str().trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn read_success(
        response: reqwest::Response,
    ) -> std::result::Result<String, TransportError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }
        response.text().await.map_err(classify)
    }
}

fn classify(e: reqwest::Error) -> TransportError {
    if e.is_connect() {
        TransportError::Connect(e.to_string())
    } else if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_body() || e.is_decode() {
        TransportError::Body(e.to_string())
    } else {
        TransportError::Connect(e.to_string())
    }
}

impl CompletionTransport for OllamaTransport {
    async fn probe(&self) -> std::result::Result<String, TransportError> {
        let response = self
            .client
            .get(self.endpoint("/api/version"))
            .send()
            .await
            .map_err(classify)?;
        let body = Self::read_success(response).await?;
        let parsed: VersionResponse =
            serde_json::from_str(&body).map_err(|e| TransportError::Body(e.to_string()))?;
        Ok(parsed.version)
    }

    async fn list_models(&self) -> std::result::Result<Vec<String>, TransportError> {
        let response = self
            .client
            .get(self.endpoint("/api/tags"))
            .send()
            .await
            .map_err(classify)?;
        let body = Self::read_success(response).await?;
        let parsed: TagsResponse =
            serde_json::from_str(&body).map_err(|e| TransportError::Body(e.to_string()))?;
        Ok(parsed.models.into_iter().map(|m| m.name).collect())
    }

    async fn generate(
        &self,
        request: &GenerateRequest<'_>,
    ) -> std::result::Result<String, TransportError> {
        let response = self
            .client
            .post(self.endpoint("/api/generate"))
            .json(request)
            .send()
            .await
            .map_err(classify)?;
        Self::read_success(response).await
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Applies the probe/retry/timeout policy on top of a transport.
pub struct InferenceClient<T> {
    transport: T,
    settings: InferenceSettings,
}

impl InferenceClient<OllamaTransport> {
    /// Client for the configured Ollama service.
    pub fn ollama(settings: InferenceSettings) -> Result<Self> {
        let transport = OllamaTransport::new(&settings)?;
        Ok(Self::new(transport, settings))
    }
}

impl<T: CompletionTransport> InferenceClient<T> {
    pub fn new(transport: T, settings: InferenceSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    /// Model identifier sent with generation requests.
    pub fn model(&self) -> &str {
        &self.settings.model
    }

    /// Probe the service, check the model list, then generate.
    ///
    /// Connection failures and 5xx statuses are retried up to
    /// `max_retries` times with a fixed backoff. A timeout is reported at
    /// once and never retried.
    #[instrument(skip_all, fields(model = %self.settings.model, base_url = %self.settings.base_url))]
    pub async fn invoke(&self, prompt: &InferencePrompt) -> InferenceOutcome {
        let mut notices = Vec::new();

        if let Err(detail) = self.probe().await {
            warn!(%detail, "inference service unreachable, skipping generation");
            return InferenceOutcome {
                result: InferenceResult::Failed(InferenceFailure {
                    kind: FailureKind::ServiceUnreachable,
                    detail,
                    attempts: 0,
                }),
                notices,
            };
        }

        if let Some(notice) = self.check_model().await {
            notices.push(notice);
        }

        let result = self.generate(prompt).await;
        InferenceOutcome { result, notices }
    }

    async fn probe(&self) -> std::result::Result<(), String> {
        match tokio::time::timeout(self.settings.probe_timeout, self.transport.probe()).await {
            Ok(Ok(version)) => {
                debug!(%version, "inference service is up");
                Ok(())
            }
            Ok(Err(e)) => Err(format!(
                "liveness probe to {} failed: {e}",
                self.settings.base_url
            )),
            Err(_) => Err(format!(
                "liveness probe to {} got no answer within {}s",
                self.settings.base_url,
                self.settings.probe_timeout.as_secs_f32()
            )),
        }
    }

    /// Returns a notice when the configured model is not installed.
    async fn check_model(&self) -> Option<String> {
        let listed =
            match tokio::time::timeout(self.settings.probe_timeout, self.transport.list_models())
                .await
            {
                Ok(Ok(models)) => models,
                Ok(Err(e)) => {
                    debug!(error = %e, "could not list models");
                    return None;
                }
                Err(_) => {
                    debug!("model listing timed out");
                    return None;
                }
            };

        let model = &self.settings.model;
        let found = listed.iter().any(|name| {
            name == model || name.strip_suffix(":latest") == Some(model.as_str())
        });
        if found {
            return None;
        }

        warn!(%model, available = listed.len(), "configured model is not listed by the service");
        let available = if listed.is_empty() {
            "none".to_string()
        } else {
            listed.join(", ")
        };
        Some(format!(
            "Model '{model}' is not listed by the inference service (available: {available}). \
             Install it with `ollama pull {model}`."
        ))
    }

    async fn generate(&self, prompt: &InferencePrompt) -> InferenceResult {
        let request = GenerateRequest {
            model: &self.settings.model,
            prompt: &prompt.text,
            stream: false,
            options: GenerateOptions {
                temperature: self.settings.temperature,
                top_p: self.settings.top_p,
            },
        };
        let max_attempts = self.settings.max_retries.saturating_add(1);
        let start = Instant::now();
        let mut attempt = 0;

        loop {
            attempt += 1;
            info!(attempt, max_attempts, "sending generation request");

            let sent =
                tokio::time::timeout(self.settings.timeout, self.transport.generate(&request))
                    .await
                    .unwrap_or(Err(TransportError::Timeout));

            let error = match sent {
                Ok(body) => {
                    return match parse_generation(&body) {
                        Ok(text) => {
                            info!(attempt, chars = text.chars().count(), "generation complete");
                            InferenceResult::Ok(Completion {
                                text,
                                model: self.settings.model.clone(),
                                attempts: attempt,
                                elapsed: start.elapsed(),
                            })
                        }
                        Err((kind, detail)) => {
                            warn!(attempt, %kind, %detail, "unusable generation response");
                            failed(kind, detail, attempt)
                        }
                    };
                }
                Err(e) => e,
            };

            match error {
                TransportError::Timeout => {
                    warn!(attempt, "generation timed out, not retrying");
                    return failed(
                        FailureKind::Timeout,
                        format!(
                            "no response within the configured timeout of {}s",
                            self.settings.timeout.as_secs_f32()
                        ),
                        attempt,
                    );
                }
                e if !e.is_transient() => {
                    warn!(attempt, error = %e, "inference service rejected the request");
                    return failed(
                        FailureKind::ServiceUnreachable,
                        format!("service rejected the request: {e}"),
                        attempt,
                    );
                }
                e if attempt >= max_attempts => {
                    warn!(attempt, error = %e, "giving up after transient failures");
                    return failed(
                        FailureKind::ServiceUnreachable,
                        format!("{e} (gave up after {attempt} attempts)"),
                        attempt,
                    );
                }
                e => {
                    warn!(attempt, error = %e, "transient inference failure, retrying");
                    tokio::time::sleep(self.settings.retry_backoff).await;
                }
            }
        }
    }
}

fn failed(kind: FailureKind, detail: String, attempts: u32) -> InferenceResult {
    InferenceResult::Failed(InferenceFailure {
        kind,
        detail,
        attempts,
    })
}

/// Extract the `response` text from a generation body.
fn parse_generation(body: &str) -> std::result::Result<String, (FailureKind, String)> {
    if body.trim().is_empty() {
        return Err((
            FailureKind::EmptyResponse,
            "service returned an empty body".into(),
        ));
    }

    let value: serde_json::Value = serde_json::from_str(body).map_err(|e| {
        (
            FailureKind::MalformedResponse,
            format!("response is not JSON: {e}"),
        )
    })?;

    match value.get("response") {
        Some(serde_json::Value::String(text)) if text.trim().is_empty() => Err((
            FailureKind::EmptyResponse,
            "`response` field is empty".into(),
        )),
        Some(serde_json::Value::String(text)) => Ok(text.trim().to_string()),
        Some(_) => Err((
            FailureKind::MalformedResponse,
            "`response` field is not text".into(),
        )),
        None => {
            let detail = match value.get("error").and_then(|e| e.as_str()) {
                Some(error) => format!("no `response` field; service error: {error}"),
                None => "no `response` field".to_string(),
            };
            Err((FailureKind::MalformedResponse, detail))
        }
    }
}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

/// What a run asks for its summary.
///
/// A configuration that cannot produce a client is kept as a value, so the
/// run still writes a document and reports the failure in it.
pub enum InferenceBackend<T> {
    Ready(InferenceClient<T>),
    Misconfigured { model: String, reason: String },
}

impl InferenceBackend<OllamaTransport> {
    /// Build the Ollama client from resolved application config.
    pub fn from_config(config: &AppConfig) -> Self {
        match InferenceSettings::try_from(config).and_then(InferenceClient::ollama) {
            Ok(client) => Self::Ready(client),
            Err(e) => {
                warn!(error = %e, "inference configuration unusable, generation will be skipped");
                Self::Misconfigured {
                    model: config.inference.model.clone(),
                    reason: e.to_string(),
                }
            }
        }
    }
}

impl<T> From<InferenceClient<T>> for InferenceBackend<T> {
    fn from(client: InferenceClient<T>) -> Self {
        Self::Ready(client)
    }
}

impl<T: CompletionTransport> InferenceBackend<T> {
    pub fn model(&self) -> &str {
        match self {
            Self::Ready(client) => client.model(),
            Self::Misconfigured { model, .. } => model,
        }
    }

    /// Invoke the client, or report the configuration error as an
    /// unreachable service without any request.
    pub async fn invoke(&self, prompt: &InferencePrompt) -> InferenceOutcome {
        match self {
            Self::Ready(client) => client.invoke(prompt).await,
            Self::Misconfigured { reason, .. } => InferenceOutcome {
                result: InferenceResult::Failed(InferenceFailure {
                    kind: FailureKind::ServiceUnreachable,
                    detail: reason.clone(),
                    attempts: 0,
                }),
                notices: Vec::new(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::ENGLISH;
    use crate::prompt::compose;
    use newsdigest_shared::Corpus;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use url::Url;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(base_url: &str) -> InferenceSettings {
        InferenceSettings {
            base_url: Url::parse(base_url).unwrap(),
            model: "llama3.1:8b".into(),
            timeout: Duration::from_secs(5),
            probe_timeout: Duration::from_secs(2),
            max_retries: 2,
            retry_backoff: Duration::from_millis(10),
            temperature: 0.7,
            top_p: 0.9,
        }
    }

    fn prompt() -> InferencePrompt {
        compose(&Corpus::default(), &ENGLISH, 6_000)
    }

    /// Scripted transport that counts calls.
    struct FakeTransport {
        probe_ok: bool,
        models: Vec<String>,
        replies: Mutex<VecDeque<std::result::Result<String, TransportError>>>,
        generate_calls: AtomicU32,
    }

    impl FakeTransport {
        fn new(replies: Vec<std::result::Result<String, TransportError>>) -> Self {
            Self {
                probe_ok: true,
                models: vec!["llama3.1:8b".into()],
                replies: Mutex::new(replies.into()),
                generate_calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.generate_calls.load(Ordering::SeqCst)
        }
    }

    impl CompletionTransport for FakeTransport {
        async fn probe(&self) -> std::result::Result<String, TransportError> {
            if self.probe_ok {
                Ok("0.0.0-test".into())
            } else {
                Err(TransportError::Connect("connection refused".into()))
            }
        }

        async fn list_models(&self) -> std::result::Result<Vec<String>, TransportError> {
            Ok(self.models.clone())
        }

        async fn generate(
            &self,
            _request: &GenerateRequest<'_>,
        ) -> std::result::Result<String, TransportError> {
            self.generate_calls.fetch_add(1, Ordering::SeqCst);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::Connect("connection refused".into())))
        }
    }

    fn refused() -> std::result::Result<String, TransportError> {
        Err(TransportError::Connect("connection refused".into()))
    }

    fn unwrap_failure(result: &InferenceResult) -> &InferenceFailure {
        match result {
            InferenceResult::Failed(f) => f,
            InferenceResult::Ok(c) => panic!("expected failure, got {c:?}"),
        }
    }

    // -- policy, against the fake transport --

    #[tokio::test]
    async fn connection_refusal_retries_up_to_bound() {
        let client = InferenceClient::new(FakeTransport::new(vec![]), settings("http://fake"));

        let outcome = client.invoke(&prompt()).await;

        let failure = unwrap_failure(&outcome.result);
        assert_eq!(failure.kind, FailureKind::ServiceUnreachable);
        assert_eq!(failure.attempts, 3);
        assert_eq!(client.transport.calls(), 3);
    }

    #[tokio::test]
    async fn failed_probe_skips_generation() {
        let mut transport = FakeTransport::new(vec![Ok(r#"{"response":"hi"}"#.into())]);
        transport.probe_ok = false;
        let client = InferenceClient::new(transport, settings("http://fake"));

        let outcome = client.invoke(&prompt()).await;

        let failure = unwrap_failure(&outcome.result);
        assert_eq!(failure.kind, FailureKind::ServiceUnreachable);
        assert_eq!(failure.attempts, 0);
        assert_eq!(client.transport.calls(), 0);
    }

    #[tokio::test]
    async fn recovers_after_transient_failure() {
        let transport = FakeTransport::new(vec![
            refused(),
            Err(TransportError::Status {
                status: 503,
                body: "loading model".into(),
            }),
            Ok(r#"{"response":"  Summary text  "}"#.into()),
        ]);
        let client = InferenceClient::new(transport, settings("http://fake"));

        let outcome = client.invoke(&prompt()).await;

        match outcome.result {
            InferenceResult::Ok(completion) => {
                assert_eq!(completion.text, "Summary text");
                assert_eq!(completion.attempts, 3);
                assert_eq!(completion.model, "llama3.1:8b");
            }
            other => panic!("expected Ok, got {other:?}"),
        }
        assert!(outcome.notices.is_empty());
    }

    #[tokio::test]
    async fn zero_retries_means_one_attempt() {
        let mut s = settings("http://fake");
        s.max_retries = 0;
        let client = InferenceClient::new(FakeTransport::new(vec![]), s);

        let outcome = client.invoke(&prompt()).await;

        assert_eq!(outcome.result.attempts(), 1);
        assert_eq!(client.transport.calls(), 1);
    }

    #[tokio::test]
    async fn transport_timeout_is_not_retried() {
        let transport = FakeTransport::new(vec![Err(TransportError::Timeout)]);
        let client = InferenceClient::new(transport, settings("http://fake"));

        let outcome = client.invoke(&prompt()).await;

        let failure = unwrap_failure(&outcome.result);
        assert_eq!(failure.kind, FailureKind::Timeout);
        assert_eq!(client.transport.calls(), 1);
    }

    #[tokio::test]
    async fn unlisted_model_adds_notice() {
        let mut transport = FakeTransport::new(vec![Ok(r#"{"response":"ok"}"#.into())]);
        transport.models = vec!["mistral:latest".into()];
        let client = InferenceClient::new(transport, settings("http://fake"));

        let outcome = client.invoke(&prompt()).await;

        assert!(outcome.result.is_ok());
        assert_eq!(outcome.notices.len(), 1);
        assert!(outcome.notices[0].contains("llama3.1:8b"));
        assert!(outcome.notices[0].contains("mistral:latest"));
    }

    #[test]
    fn response_validation() {
        assert_eq!(
            parse_generation(r#"{"response":"text","done":true}"#),
            Ok("text".to_string())
        );
        assert_eq!(parse_generation("").unwrap_err().0, FailureKind::EmptyResponse);
        assert_eq!(
            parse_generation(r#"{"response":"   "}"#).unwrap_err().0,
            FailureKind::EmptyResponse
        );
        assert_eq!(
            parse_generation("<html>").unwrap_err().0,
            FailureKind::MalformedResponse
        );
        assert_eq!(
            parse_generation(r#"{"response":42}"#).unwrap_err().0,
            FailureKind::MalformedResponse
        );
        let (kind, detail) = parse_generation(r#"{"error":"model not found"}"#).unwrap_err();
        assert_eq!(kind, FailureKind::MalformedResponse);
        assert!(detail.contains("model not found"));
    }

    // -- HTTP, against wiremock --

    async fn mount_probe(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/api/version"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"version":"0.3.0"}"#))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"models":[{"name":"llama3.1:8b"}]}"#),
            )
            .mount(server)
            .await;
    }

    fn ollama(
        server: &MockServer,
        tweak: impl FnOnce(&mut InferenceSettings),
    ) -> InferenceClient<OllamaTransport> {
        let mut settings = settings(&server.uri());
        tweak(&mut settings);
        InferenceClient::ollama(settings).unwrap()
    }

    #[tokio::test]
    async fn bad_base_url_becomes_unreachable_failure() {
        let mut config = AppConfig::default();
        config.inference.base_url = "not a url".into();
        let backend = InferenceBackend::from_config(&config);

        assert!(matches!(backend, InferenceBackend::Misconfigured { .. }));
        assert_eq!(backend.model(), config.inference.model);

        let outcome = backend.invoke(&prompt()).await;
        match outcome.result {
            InferenceResult::Failed(f) => {
                assert_eq!(f.kind, FailureKind::ServiceUnreachable);
                assert_eq!(f.attempts, 0);
                assert!(f.detail.contains("not a url"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn zero_timeout_becomes_unreachable_failure() {
        let mut config = AppConfig::default();
        config.inference.timeout_secs = 0;
        let backend = InferenceBackend::from_config(&config);

        let outcome = backend.invoke(&prompt()).await;
        match outcome.result {
            InferenceResult::Failed(f) => assert!(f.detail.contains("timeout_secs")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn default_config_builds_ready_backend() {
        let backend = InferenceBackend::from_config(&AppConfig::default());
        assert!(matches!(backend, InferenceBackend::Ready(_)));
    }

    #[tokio::test]
    async fn http_success() {
        let server = MockServer::start().await;
        mount_probe(&server).await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(wiremock::matchers::body_partial_json(serde_json::json!({
                "model": "llama3.1:8b",
                "stream": false,
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"model":"llama3.1:8b","response":"Digest body","done":true}"#),
            )
            .expect(1)
            .mount(&server)
            .await;

        let outcome = ollama(&server, |_| {}).invoke(&prompt()).await;

        match outcome.result {
            InferenceResult::Ok(c) => assert_eq!(c.text, "Digest body"),
            other => panic!("expected Ok, got {other:?}"),
        }
        assert!(outcome.notices.is_empty());
    }

    #[tokio::test]
    async fn http_empty_response_field() {
        let server = MockServer::start().await;
        mount_probe(&server).await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"response":""}"#))
            .mount(&server)
            .await;

        let outcome = ollama(&server, |_| {}).invoke(&prompt()).await;

        assert_eq!(
            unwrap_failure(&outcome.result).kind,
            FailureKind::EmptyResponse
        );
    }

    #[tokio::test]
    async fn http_server_errors_are_retried_to_bound() {
        let server = MockServer::start().await;
        mount_probe(&server).await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(3)
            .mount(&server)
            .await;

        let outcome = ollama(&server, |_| {}).invoke(&prompt()).await;

        let failure = unwrap_failure(&outcome.result);
        assert_eq!(failure.kind, FailureKind::ServiceUnreachable);
        assert_eq!(failure.attempts, 3);
        assert!(failure.detail.contains("500"));
    }

    #[tokio::test]
    async fn http_client_error_is_not_retried() {
        let server = MockServer::start().await;
        mount_probe(&server).await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(404).set_body_string("model not found"))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = ollama(&server, |_| {}).invoke(&prompt()).await;

        let failure = unwrap_failure(&outcome.result);
        assert_eq!(failure.kind, FailureKind::ServiceUnreachable);
        assert!(failure.detail.contains("404"));
    }

    #[tokio::test]
    async fn http_slow_generation_times_out_once() {
        let server = MockServer::start().await;
        mount_probe(&server).await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"response":"late"}"#)
                    .set_delay(Duration::from_millis(800)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let outcome = ollama(&server, |s| s.timeout = Duration::from_millis(100))
            .invoke(&prompt())
            .await;

        let failure = unwrap_failure(&outcome.result);
        assert_eq!(failure.kind, FailureKind::Timeout);
        assert_eq!(failure.attempts, 1);
    }

    #[tokio::test]
    async fn http_refused_connection_is_unreachable() {
        // Nothing listens on port 9 of the loopback interface.
        let client = InferenceClient::ollama(settings("http://127.0.0.1:9")).unwrap();

        let outcome = client.invoke(&prompt()).await;

        let failure = unwrap_failure(&outcome.result);
        assert_eq!(failure.kind, FailureKind::ServiceUnreachable);
        assert_eq!(failure.attempts, 0);
    }
}
