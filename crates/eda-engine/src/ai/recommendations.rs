//! Cleaning recommendations from a language model.
//!
//! The statistics bundle is rendered into a prompt, the provider's answer is
//! cut down to its outermost JSON object, and that object must carry every
//! key in [`REQUIRED_KEYS`]. Anything else is a
//! [`EngineError::RecommendationService`] error; the statistics themselves
//! stay valid either way.

use super::RecommendationProvider;
use crate::bundle::StatisticsBundle;
use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{info, warn};

/// Keys every recommendation object must contain.
pub const REQUIRED_KEYS: [&str; 5] = [
    "summary",
    "critical_issues",
    "cleaning_steps",
    "data_quality_score",
    "next_steps",
];

/// A validated recommendation object.
///
/// The required fields are kept as raw JSON: models disagree on whether a
/// score is `"85"` or `85`, and callers render them as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendations {
    pub summary: Value,
    pub critical_issues: Value,
    pub cleaning_steps: Value,
    pub data_quality_score: Value,
    pub next_steps: Value,
    /// Any extra keys the model added.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Render the prompt sent to the model.
pub fn build_prompt(payload: &Value) -> Result<String> {
    let stats = serde_json::to_string_pretty(payload)?;
    Ok(format!(
        r#"You are a data science expert specializing in data cleaning and preprocessing.
Analyze the following dataset statistics and provide specific, actionable recommendations for data cleaning.

Dataset Statistics:
{stats}

Please provide recommendations in the following JSON format:
{{
    "summary": "Brief summary of main data quality issues",
    "critical_issues": [
        {{
            "issue": "Description of the issue",
            "severity": "high/medium/low",
            "impact": "How this affects analysis",
            "recommendation": "Specific action to take"
        }}
    ],
    "cleaning_steps": [
        {{
            "step": "Step number",
            "action": "One of: drop_missing, fill_missing_mean, fill_missing_median, fill_missing_mode, drop_duplicates, remove_outliers",
            "columns": ["column1", "column2"],
            "method": "How to perform this action",
            "priority": "high/medium/low",
            "expected_outcome": "What this will improve"
        }}
    ],
    "data_quality_score": "percentage (0-100)",
    "next_steps": "What to do after cleaning"
}}

Focus on:
1. Missing value handling
2. Outlier detection and treatment
3. Data type conversions
4. Duplicate removal
5. Data consistency issues
6. Statistical anomalies

Respond with the JSON object only.
"#
    ))
}

/// Extract and validate the recommendation object from raw model output.
pub fn parse_recommendations(response: &str) -> Result<Recommendations> {
    let (Some(start), Some(end)) = (response.find('{'), response.rfind('}')) else {
        return Err(EngineError::RecommendationService(
            "no JSON object in response".to_string(),
        ));
    };
    if end < start {
        return Err(EngineError::RecommendationService(
            "no JSON object in response".to_string(),
        ));
    }

    let value: Value = serde_json::from_str(&response[start..=end]).map_err(|e| {
        EngineError::RecommendationService(format!("response is not valid JSON: {e}"))
    })?;
    let Value::Object(object) = value else {
        return Err(EngineError::RecommendationService(
            "response is not a JSON object".to_string(),
        ));
    };

    let missing: Vec<&str> = REQUIRED_KEYS
        .iter()
        .copied()
        .filter(|key| !object.contains_key(*key))
        .collect();
    if !missing.is_empty() {
        return Err(EngineError::RecommendationService(format!(
            "response is missing required keys: {}",
            missing.join(", ")
        )));
    }

    Ok(serde_json::from_value(Value::Object(object))?)
}

/// Asks a provider for cleaning recommendations.
pub struct RecommendationService {
    provider: Arc<dyn RecommendationProvider>,
}

impl RecommendationService {
    pub fn new(provider: Arc<dyn RecommendationProvider>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &dyn RecommendationProvider {
        self.provider.as_ref()
    }

    pub fn recommend(&self, bundle: &StatisticsBundle) -> Result<Recommendations> {
        let prompt = build_prompt(&bundle.recommendation_payload()?)?;
        info!(
            "Requesting recommendations from {} ({})",
            self.provider.name(),
            self.provider.model().unwrap_or("default model")
        );

        let response = self.provider.complete(&prompt)?;
        parse_recommendations(&response).inspect_err(|e| {
            warn!("Rejected recommendation response: {}", e);
        })
    }
}
