//! The model seam: turn one prompt into one release-notes draft.
//!
//! `Drafter` hides the rig agent so the pipeline can run against a scripted
//! double in tests. Upstream failures are retried only when they look
//! transient; everything else surfaces unchanged.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use rig::completion::{Prompt, PromptError};
use tracing::{info, warn};

use crate::agents::OaiAgent;

/// Errors from the drafting step.
#[derive(Debug, thiserror::Error)]
pub enum DraftError {
    /// The model call itself failed (rate limit, network, provider error).
    /// Carries the provider's message unchanged.
    #[error("{0}")]
    Upstream(String),

    /// No answer within the configured wall-clock budget.
    #[error("model did not answer within {seconds}s")]
    Timeout { seconds: u64 },

    /// The model answered but there was nothing usable in the answer.
    #[error("model returned an empty draft")]
    EmptyOutput,
}

/// Anything that can answer a drafting prompt.
#[async_trait]
pub trait Drafter: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    async fn draft(&self, prompt: &str) -> Result<String, DraftError>;
}

/// [`Drafter`] backed by a rig agent (with or without tools).
pub struct AgentDrafter {
    name: String,
    agent: OaiAgent,
    max_retries: u32,
}

impl AgentDrafter {
    pub fn new(name: impl Into<String>, agent: OaiAgent, max_retries: u32) -> Self {
        Self {
            name: name.into(),
            agent,
            max_retries,
        }
    }
}

#[async_trait]
impl Drafter for AgentDrafter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn draft(&self, prompt: &str) -> Result<String, DraftError> {
        info!(agent = %self.name, prompt_chars = prompt.len(), "Prompting model");
        with_transient_retry(self.max_retries, || async move { self.agent.prompt(prompt).await })
            .await
            .map_err(|e: PromptError| DraftError::Upstream(e.to_string()))
    }
}

/// Run `op`, retrying with exponential backoff (2s, 4s, 8s, ...) while the
/// error looks transient and attempts remain.
pub async fn with_transient_retry<T, E, F, Fut>(max_retries: u32, mut op: F) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                let err_str = e.to_string();
                if !is_transient_error(&err_str) || attempt >= max_retries {
                    return Err(e);
                }
                drop(e);

                let backoff = Duration::from_secs(2u64.pow(attempt + 1));
                warn!(
                    attempt = attempt + 1,
                    max_retries,
                    backoff_secs = backoff.as_secs(),
                    error = %err_str,
                    "Transient error, retrying"
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
        }
    }
}

/// Heuristic match on the rendered error: rate limits, gateway errors and
/// connection-level failures.
pub fn is_transient_error(err_str: &str) -> bool {
    let err_lower = err_str.to_ascii_lowercase();
    err_str.contains("502")
        || err_str.contains("503")
        || err_str.contains("429")
        || err_lower.contains("rate limit")
        || err_lower.contains("overloaded")
        || err_lower.contains("connection")
        || err_lower.contains("timed out")
        || err_lower.contains("timeout")
        || err_lower.contains("error sending request")
        || err_lower.contains("broken pipe")
        || err_lower.contains("reset by peer")
}

/// Model output after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseNotesDraft {
    pub content: String,
}

impl ReleaseNotesDraft {
    /// Trim, unwrap one surrounding markdown code fence, reject empty text.
    pub fn from_model_output(raw: &str) -> Result<Self, DraftError> {
        let trimmed = raw.trim();
        let content = strip_code_fence(trimmed).trim();
        if content.is_empty() {
            return Err(DraftError::EmptyOutput);
        }
        Ok(Self {
            content: content.to_string(),
        })
    }

    /// Whether the draft has the minimal release-notes shape: a markdown
    /// heading and at least one list item.
    pub fn has_heading_and_list(&self) -> bool {
        let mut heading = false;
        let mut bullet = false;
        for line in self.content.lines().map(str::trim_start) {
            heading |= line.starts_with('#');
            bullet |= line.starts_with("- ") || line.starts_with("* ");
        }
        heading && bullet
    }
}

fn strip_code_fence(text: &str) -> &str {
    if !(text.starts_with("```") && text.ends_with("```")) || text.len() < 6 {
        return text;
    }
    let inner = &text[..text.len() - 3];
    match inner.split_once('\n') {
        // Opening fence line may carry a language tag (```markdown).
        Some((_, body)) => body,
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_draft_strips_markdown_fence() {
        let raw = "```markdown\n## v2.1\n\nSmall release.\n\n- Fixed login\n```\n";
        let draft = ReleaseNotesDraft::from_model_output(raw).unwrap();
        assert_eq!(draft.content, "## v2.1\n\nSmall release.\n\n- Fixed login");
        assert!(draft.has_heading_and_list());
    }

    #[test]
    fn test_draft_keeps_unfenced_text() {
        let raw = "  ## v2.1\n- Added export  ";
        let draft = ReleaseNotesDraft::from_model_output(raw).unwrap();
        assert_eq!(draft.content, "## v2.1\n- Added export");
    }

    #[test]
    fn test_draft_rejects_empty() {
        assert!(matches!(
            ReleaseNotesDraft::from_model_output("  \n "),
            Err(DraftError::EmptyOutput)
        ));
        assert!(matches!(
            ReleaseNotesDraft::from_model_output("```\n```"),
            Err(DraftError::EmptyOutput)
        ));
    }

    #[test]
    fn test_has_heading_and_list_requires_both() {
        let draft = ReleaseNotesDraft::from_model_output("Just a sentence.\n- item").unwrap();
        assert!(!draft.has_heading_and_list());
    }

    #[test]
    fn test_transient_classification() {
        assert!(is_transient_error("HttpError: status 429 Too Many Requests"));
        assert!(is_transient_error("error sending request for url"));
        assert!(is_transient_error("Connection reset by peer"));
        assert!(!is_transient_error("ProviderError: invalid api key"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_recovers_from_transient_error() {
        let calls = AtomicU32::new(0);
        let result: Result<&str, String> = with_transient_retry(2, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err("503 Service Unavailable".to_string())
                } else {
                    Ok("draft")
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "draft");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_gives_up_after_budget() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = with_transient_retry(1, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("429 rate limited".to_string()) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_does_not_retry_permanent_error() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = with_transient_retry(3, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("invalid api key".to_string()) }
        })
        .await;
        assert_eq!(result.unwrap_err(), "invalid api key");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
