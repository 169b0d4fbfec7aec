//! Probability-gated checks.
//!
//! A check branches between two target scenes based on a quality value and
//! a difficulty model. The same probability computation backs both the
//! actual roll and the risk label shown on choices leading into the check.

use crate::rng::StoryRng;

/// How a check converts a quality value into a success probability.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckModel {
    /// Success scales with the ratio of quality to difficulty:
    /// `scaler * quality / difficulty`, clamped to [0, 1].
    Broad {
        /// The difficulty the quality is measured against.
        difficulty: f64,
        /// Ratio multiplier; defaults to 0.6, values above 1 read as
        /// percentages.
        scaler: Option<f64>,
    },
    /// Success scales with the margin between quality and difficulty:
    /// `(quality - difficulty) * increment + 0.5`, clamped to
    /// [increment, 1].
    Narrow {
        /// The difficulty the quality is measured against.
        difficulty: f64,
        /// Per-point margin step; defaults to 0.1, values above 1 read as
        /// percentages.
        increment: Option<f64>,
    },
}

/// A fully specified check on a scene.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneCheck {
    /// The quality rolled against.
    pub quality: String,
    /// The difficulty model.
    pub model: CheckModel,
    /// Scene entered on success.
    pub on_success: String,
    /// Scene entered on failure.
    pub on_failure: String,
}

impl SceneCheck {
    /// A broad-difficulty check with the default scaler.
    pub fn broad(
        quality: impl Into<String>,
        difficulty: f64,
        on_success: impl Into<String>,
        on_failure: impl Into<String>,
    ) -> Self {
        Self {
            quality: quality.into(),
            model: CheckModel::Broad {
                difficulty,
                scaler: None,
            },
            on_success: on_success.into(),
            on_failure: on_failure.into(),
        }
    }

    /// A narrow-difficulty check with the default increment.
    pub fn narrow(
        quality: impl Into<String>,
        difficulty: f64,
        on_success: impl Into<String>,
        on_failure: impl Into<String>,
    ) -> Self {
        Self {
            quality: quality.into(),
            model: CheckModel::Narrow {
                difficulty,
                increment: None,
            },
            on_success: on_success.into(),
            on_failure: on_failure.into(),
        }
    }

    /// The success probability for a given quality value.
    pub fn success_probability(&self, quality_value: f64) -> f64 {
        match &self.model {
            CheckModel::Broad { difficulty, scaler } => {
                broad_probability(quality_value, *difficulty, *scaler)
            }
            CheckModel::Narrow {
                difficulty,
                increment,
            } => narrow_probability(quality_value, *difficulty, *increment),
        }
    }
}

/// Broad-difficulty success probability, clamped to [0, 1].
pub fn broad_probability(quality: f64, difficulty: f64, scaler: Option<f64>) -> f64 {
    let mut scaler = scaler.filter(|s| *s != 0.0).unwrap_or(0.6);
    if scaler > 1.0 {
        scaler /= 100.0;
    }
    let probability = scaler * (quality / difficulty);
    if probability.is_nan() {
        0.0
    } else {
        probability.clamp(0.0, 1.0)
    }
}

/// Narrow-difficulty success probability, clamped to [increment, 1].
pub fn narrow_probability(quality: f64, difficulty: f64, increment: Option<f64>) -> f64 {
    let mut increment = increment.filter(|i| *i != 0.0).unwrap_or(0.1);
    if increment > 1.0 {
        increment /= 100.0;
    }
    ((quality - difficulty) * increment + 0.5).clamp(increment, 1.0)
}

/// The human-readable risk word for a success probability.
pub fn difficulty_label(probability: f64) -> &'static str {
    if probability <= 0.1 {
        "almost impossible"
    } else if probability <= 0.3 {
        "high-risk"
    } else if probability <= 0.4 {
        "tough"
    } else if probability <= 0.5 {
        "very chancy"
    } else if probability <= 0.6 {
        "chancy"
    } else if probability <= 0.7 {
        "modest"
    } else if probability <= 0.8 {
        "very modest"
    } else if probability <= 0.9 {
        "low risk"
    } else {
        "straightforward"
    }
}

/// Roll against a success probability using the engine's generator.
pub fn roll_success(probability: f64, rng: &mut StoryRng) -> bool {
    rng.random() < probability
}
