//! Recommendation service backed by a language model.
//!
//! The [`RecommendationProvider`] trait and the prompt/validation logic are
//! always available. The Gemini client needs the `ai` feature:
//!
//! ```toml
//! # Enable the Gemini client (default)
//! eda-engine = { version = "0.1", features = ["ai"] }
//!
//! # Without HTTP support
//! eda-engine = { version = "0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use eda_engine::ai::{GeminiProvider, RecommendationService};
//! use std::sync::Arc;
//!
//! let service = RecommendationService::new(Arc::new(GeminiProvider::new(api_key)?));
//! let recommendations = service.recommend(&bundle)?;
//! ```

mod provider;
mod recommendations;

pub use provider::RecommendationProvider;
pub use recommendations::{
    REQUIRED_KEYS, RecommendationService, Recommendations, build_prompt, parse_recommendations,
};

#[cfg(feature = "ai")]
mod gemini;

#[cfg(feature = "ai")]
pub use gemini::{GeminiConfig, GeminiConfigBuilder, GeminiProvider};
