//! Job submission and polling.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::config::QConfig;
use crate::error::{QError, QResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const CANCEL_TIMEOUT: Duration = Duration::from_secs(5);

/// One chat turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Per-call overrides.
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    /// Overrides [`QConfig::timeout_ms`] for this call.
    pub timeout_ms: Option<u64>,
    pub trace_id: Option<String>,
}

#[derive(Serialize)]
struct JobRequest<'a> {
    op: &'static str,
    args: ChatArgs<'a>,
    timeout_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    trace_id: Option<&'a str>,
}

#[derive(Serialize)]
struct ChatArgs<'a> {
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "str::is_empty")]
    model: &'a str,
}

#[derive(Deserialize)]
struct SubmitResponse {
    id: Option<String>,
}

#[derive(Deserialize)]
struct JobStatus {
    state: Option<String>,
    result: Option<JobResult>,
    error: Option<JobFailure>,
}

#[derive(Deserialize)]
struct JobResult {
    text: Option<String>,
}

#[derive(Deserialize)]
struct JobFailure {
    code: Option<String>,
    message: Option<String>,
}

/// Minimal chat client for the Q job service.
#[derive(Debug, Clone)]
pub struct QChat {
    cfg: QConfig,
}

impl QChat {
    pub fn new(cfg: QConfig) -> QResult<Self> {
        Ok(Self {
            cfg: cfg.normalized()?,
        })
    }

    pub fn config(&self) -> &QConfig {
        &self.cfg
    }

    /// Submit `messages` as an `llm.chat` job and wait for the assistant text.
    ///
    /// The job is cancelled (best effort) when the deadline passes or when
    /// polling fails.
    #[instrument(skip_all, fields(model = %self.cfg.model))]
    pub async fn chat(&self, messages: &[ChatMessage], options: &ChatOptions) -> QResult<String> {
        let timeout_ms = options.timeout_ms.unwrap_or(self.cfg.timeout_ms);
        let payload = JobRequest {
            op: "llm.chat",
            args: ChatArgs {
                messages,
                model: &self.cfg.model,
            },
            timeout_ms,
            trace_id: options.trace_id.as_deref(),
        };
        let deadline = (timeout_ms > 0).then(|| Instant::now() + Duration::from_millis(timeout_ms));

        // The connection pool must belong to the runtime driving this call.
        let http = reqwest::Client::builder()
            .build()
            .map_err(|err| QError::Config(err.to_string()))?;

        let job_id = self.submit(&http, &payload).await?;
        debug!(job_id = %job_id, "job submitted");

        match self.wait_for_text(&http, &job_id, deadline).await {
            Ok(text) => Ok(text),
            Err(err) => {
                warn!(job_id = %job_id, err = %err, "chat failed, cancelling job");
                self.cancel_silent(&http, &job_id).await;
                Err(err)
            }
        }
    }

    /// Run [`QChat::chat`] on a private current-thread runtime.
    ///
    /// Must not be called from inside an async context.
    pub fn chat_blocking(&self, messages: &[ChatMessage], options: &ChatOptions) -> QResult<String> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| QError::Runtime(err.to_string()))?;
        runtime.block_on(self.chat(messages, options))
    }

    async fn submit(&self, http: &reqwest::Client, payload: &JobRequest<'_>) -> QResult<String> {
        let response = http
            .post(self.url("/v1/jobs"))
            .timeout(REQUEST_TIMEOUT)
            .json(payload)
            .send()
            .await
            .map_err(|err| QError::Submit(err.to_string()))?;

        let status = response.status();
        if status.as_u16() != 200 && status.as_u16() != 201 {
            let body = response.text().await.unwrap_or_default();
            return Err(QError::Submit(format!("HTTP {} :: {}", status.as_u16(), body)));
        }

        let data: SubmitResponse = response
            .json()
            .await
            .map_err(|err| QError::Submit(err.to_string()))?;
        match data.id {
            Some(id) if !id.is_empty() => Ok(id),
            _ => Err(QError::Submit("missing job id".to_string())),
        }
    }

    async fn wait_for_text(
        &self,
        http: &reqwest::Client,
        job_id: &str,
        deadline: Option<Instant>,
    ) -> QResult<String> {
        let poll_interval = Duration::from_millis(self.cfg.poll_interval_ms);
        loop {
            let status = self.get_status(http, job_id).await?;
            match status.state.as_deref() {
                Some("ok") => {
                    return status
                        .result
                        .and_then(|result| result.text)
                        .ok_or_else(|| QError::Malformed("result.text missing".to_string()));
                }
                Some("fail" | "timeout" | "cancelled") => {
                    let failure = status.error.unwrap_or(JobFailure {
                        code: None,
                        message: None,
                    });
                    return Err(QError::Job {
                        code: failure.code.unwrap_or_else(|| "ERROR".to_string()),
                        message: failure.message.unwrap_or_else(|| "unknown error".to_string()),
                    });
                }
                // queued / running / unknown states keep polling
                _ => {}
            }

            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return Err(QError::Timeout);
            }
            if poll_interval.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(poll_interval).await;
            }
        }
    }

    async fn get_status(&self, http: &reqwest::Client, job_id: &str) -> QResult<JobStatus> {
        let response = http
            .get(self.url(&format!("/v1/jobs/{job_id}")))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|err| QError::Poll(err.to_string()))?;

        let status = response.status();
        if status.as_u16() != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(QError::Poll(format!("HTTP {} :: {}", status.as_u16(), body)));
        }

        response
            .json::<JobStatus>()
            .await
            .map_err(|err| QError::Poll(format!("non-object json: {err}")))
    }

    async fn cancel_silent(&self, http: &reqwest::Client, job_id: &str) {
        let result = http
            .post(self.url(&format!("/v1/jobs/{job_id}/cancel")))
            .timeout(CANCEL_TIMEOUT)
            .send()
            .await;
        if let Err(err) = result {
            debug!(job_id, err = %err, "cancel request failed");
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.cfg.base_url, path)
    }
}
