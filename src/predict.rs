use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::models::{Prediction, RiskScores, SurveyAnswers};

pub const FALLBACK_RISK_THRESHOLD: f64 = 50.0;
pub const FALLBACK_CONFIDENCE: f64 = 0.75;

pub const STATUS_HEALTHY: &str = "Healthy";
pub const STATUS_NEEDS_IMPROVEMENT: &str = "Needs Improvement";

/// Ordinal code for the shared screen-time bands (total, social media,
/// entertainment, work). Unknown strings code as 0.
pub fn hours_band_code(value: &str) -> f64 {
    match value {
        "Less than 1 hour" => 0.0,
        "1–2 hours" => 1.0,
        "3–4 hours" => 2.0,
        "5–6 hours" => 3.0,
        "More than 6 hours" => 4.0,
        _ => 0.0,
    }
}

pub fn sleep_band_code(value: &str) -> f64 {
    match value {
        "Less than 5" => 0.0,
        "5–6" => 1.0,
        "6–7" => 2.0,
        "7–8" => 3.0,
        "More than 8" => 4.0,
        _ => 0.0,
    }
}

pub fn frequency_code(value: &str) -> f64 {
    match value {
        "Never" => 0.0,
        "Rarely" => 1.0,
        "Sometimes" => 2.0,
        "Often" => 3.0,
        "Always" => 4.0,
        _ => 0.0,
    }
}

pub fn exercise_code(value: &str) -> f64 {
    match value {
        "Never" => 0.0,
        "1–2 days per week" => 1.0,
        "3–4 days per week" => 2.0,
        "Daily" => 3.0,
        _ => 0.0,
    }
}

pub fn addiction_code(value: &str) -> f64 {
    match value {
        "No" => 0.0,
        "Not sure" => 1.0,
        "Maybe" => 2.0,
        "Yes" => 3.0,
        _ => 0.0,
    }
}

/// Coded answers keyed by the feature names the training pipeline used.
/// Artifact features absent from this map contribute 0.
pub fn feature_map(answers: &SurveyAnswers) -> BTreeMap<String, f64> {
    let mut features = BTreeMap::new();
    features.insert(
        "Average total screen time per day".to_string(),
        hours_band_code(&answers.total_screen_time),
    );
    features.insert(
        "Social Media (hours)".to_string(),
        hours_band_code(&answers.social_media),
    );
    features.insert(
        "Entertainment (hours)".to_string(),
        hours_band_code(&answers.entertainment),
    );
    features.insert(
        "Work (hours)".to_string(),
        hours_band_code(&answers.work_time),
    );
    features.insert(
        "Average sleep duration (hours)".to_string(),
        sleep_band_code(&answers.sleep_duration),
    );
    features.insert(
        "Sleep quality (1–5)".to_string(),
        answers.sleep_quality as f64,
    );
    features.insert(
        "Use screen before sleep".to_string(),
        frequency_code(&answers.screen_before_sleep),
    );
    features.insert(
        "Exercise frequency".to_string(),
        exercise_code(&answers.exercise),
    );
    features.insert(
        "Feel addicted to devices".to_string(),
        addiction_code(&answers.addicted),
    );
    features.insert(
        "Stress due to screen usage".to_string(),
        answers.stress as f64,
    );
    features.insert("Anxious without device".to_string(), answers.anxious as f64);
    features.insert(
        "Eye strain or headache".to_string(),
        answers.eye_strain as f64,
    );
    features
}

/// Rule-based risk breakdown over the coded answers.
pub fn risk_scores(answers: &SurveyAnswers) -> RiskScores {
    let screen_time_score = hours_band_code(&answers.total_screen_time) * 5.0
        + hours_band_code(&answers.social_media) * 3.0
        + hours_band_code(&answers.entertainment) * 2.0;

    let sleep_risk = (4.0 - sleep_band_code(&answers.sleep_duration)) * 3.0
        + (5.0 - answers.sleep_quality as f64) * 2.0
        + frequency_code(&answers.screen_before_sleep) * 2.0;

    let behavioral_risk = answers.stress as f64 * 2.0
        + answers.anxious as f64 * 2.0
        + answers.eye_strain as f64
        + addiction_code(&answers.addicted) * 2.0;

    let exercise_benefit = (3.0 - exercise_code(&answers.exercise)) * 2.0;

    let total_risk = screen_time_score + sleep_risk + behavioral_risk + exercise_benefit;

    RiskScores {
        total_risk,
        screen_time_score,
        sleep_risk,
        behavioral_risk,
        screen_index: (total_risk * 1.5).min(100.0),
        sleep_health: (100.0 - sleep_risk * 3.0).max(0.0),
        wellbeing_score: (100.0 - behavioral_risk * 2.5).max(0.0),
    }
}

/// Pre-trained logistic classifier exported as JSON: standardization
/// means/scales and weights, all aligned with `feature_names`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub model_name: String,
    pub feature_names: Vec<String>,
    pub means: Vec<f64>,
    pub scales: Vec<f64>,
    pub weights: Vec<f64>,
    pub bias: f64,
}

impl ModelArtifact {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read model artifact {}", path.display()))?;
        let artifact: ModelArtifact = serde_json::from_str(&raw)
            .with_context(|| format!("malformed model artifact {}", path.display()))?;
        let n = artifact.feature_names.len();
        if artifact.means.len() != n || artifact.scales.len() != n || artifact.weights.len() != n {
            anyhow::bail!(
                "model artifact {} has inconsistent feature dimensions",
                path.display()
            );
        }
        Ok(artifact)
    }

    /// Probability of the "healthy" class. Features are standardized by
    /// name; a zero scale is treated as 1 to avoid division by zero.
    pub fn probability_healthy(&self, features: &BTreeMap<String, f64>) -> f64 {
        let mut z = self.bias;
        for (i, name) in self.feature_names.iter().enumerate() {
            let raw = features.get(name).copied().unwrap_or(0.0);
            let scale = if self.scales[i] == 0.0 {
                1.0
            } else {
                self.scales[i]
            };
            z += self.weights[i] * ((raw - self.means[i]) / scale);
        }
        1.0 / (1.0 + (-z).exp())
    }
}

/// Classifier front door. Holds the loaded artifact when one is available
/// and falls back to the risk-threshold rule otherwise.
#[derive(Debug)]
pub struct Predictor {
    artifact: Option<ModelArtifact>,
}

impl Predictor {
    /// Load the artifact at `path`, falling back to the heuristic when the
    /// file is missing or malformed.
    pub fn load(path: &Path) -> Self {
        match ModelArtifact::load(path) {
            Ok(artifact) => {
                tracing::info!(model = %artifact.model_name, "model artifact loaded");
                Self {
                    artifact: Some(artifact),
                }
            }
            Err(err) => {
                tracing::warn!("model artifact unavailable, using heuristic fallback: {err:#}");
                Self { artifact: None }
            }
        }
    }

    pub fn heuristic() -> Self {
        Self { artifact: None }
    }

    pub fn with_artifact(artifact: ModelArtifact) -> Self {
        Self {
            artifact: Some(artifact),
        }
    }

    pub fn model_loaded(&self) -> bool {
        self.artifact.is_some()
    }

    pub fn model_name(&self) -> Option<&str> {
        self.artifact
            .as_ref()
            .map(|artifact| artifact.model_name.as_str())
    }

    pub fn evaluate(&self, answers: &SurveyAnswers) -> (Prediction, RiskScores) {
        let scores = risk_scores(answers);
        let (is_healthy, confidence) = match &self.artifact {
            Some(artifact) => {
                let p = artifact.probability_healthy(&feature_map(answers));
                (p >= 0.5, p.max(1.0 - p))
            }
            None => (
                scores.total_risk < FALLBACK_RISK_THRESHOLD,
                FALLBACK_CONFIDENCE,
            ),
        };
        let status = if is_healthy {
            STATUS_HEALTHY
        } else {
            STATUS_NEEDS_IMPROVEMENT
        };
        let prediction = Prediction {
            is_healthy,
            confidence,
            status: status.to_string(),
        };
        (prediction, scores)
    }
}
