//! Provider trait for the language model behind the recommendation service.
//!
//! A provider only turns a prompt into response text. Prompt construction and
//! response validation live in [`super::recommendations`], so any backend
//! (Gemini, a local model, a test double) gets the same strict checks.

use crate::error::Result;

/// A text-completion backend.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so one provider can serve several
/// sessions.
///
/// # Errors
///
/// Transport failures, timeouts and empty answers should be reported as
/// [`crate::EngineError::RecommendationService`].
pub trait RecommendationProvider: Send + Sync {
    /// Send `prompt` and return the raw response text.
    fn complete(&self, prompt: &str) -> Result<String>;

    /// Provider name for logging.
    fn name(&self) -> &str;

    /// Model used by this provider, if it exposes one.
    fn model(&self) -> Option<&str> {
        None
    }
}
