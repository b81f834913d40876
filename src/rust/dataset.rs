use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::Thresholds;
use crate::error::PipelineError;

/// A raw review as supplied by the data source: free text plus a star rating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub text: String,
    pub stars: i64,
}

impl Review {
    pub fn new(text: impl Into<String>, stars: i64) -> Self {
        Self {
            text: text.into(),
            stars,
        }
    }
}

/// Binary sentiment target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Label {
    Negative = 0,
    Positive = 1,
}

impl Label {
    /// Both labels in report order
    pub const ALL: [Label; 2] = [Label::Negative, Label::Positive];

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Derives a label from a rating, or `None` for the neutral band.
    pub fn from_rating(rating: i64, thresholds: &Thresholds) -> Option<Label> {
        if rating >= thresholds.high {
            Some(Label::Positive)
        } else if rating <= thresholds.low {
            Some(Label::Negative)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledExample {
    pub text: String,
    pub label: Label,
}

impl LabeledExample {
    pub fn new(text: impl Into<String>, label: Label) -> Self {
        Self {
            text: text.into(),
            label,
        }
    }
}

/// Ordered collection of labeled examples.
///
/// Every example carries a definite binary label; neutral reviews never
/// make it in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    examples: Vec<LabeledExample>,
}

impl Dataset {
    pub fn from_examples(examples: Vec<LabeledExample>) -> Self {
        Self { examples }
    }

    pub fn examples(&self) -> &[LabeledExample] {
        &self.examples
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub fn texts(&self) -> Vec<&str> {
        self.examples.iter().map(|e| e.text.as_str()).collect()
    }

    pub fn labels(&self) -> Vec<Label> {
        self.examples.iter().map(|e| e.label).collect()
    }

    /// Returns `(negative, positive)` counts
    pub fn class_counts(&self) -> (usize, usize) {
        let positive = self.examples.iter().filter(|e| e.label == Label::Positive).count();
        (self.examples.len() - positive, positive)
    }
}

/// Turns raw reviews into a labeled dataset by thresholding their ratings.
///
/// Order is preserved. Reviews in the neutral band are dropped, not imputed.
///
/// # Errors
/// - `InvalidThresholdsError` if `low >= high`
/// - `EmptyDatasetError` if no review survives filtering
pub fn build(reviews: &[Review], thresholds: &Thresholds) -> Result<Dataset, PipelineError> {
    if thresholds.low >= thresholds.high {
        return Err(PipelineError::InvalidThresholdsError {
            low: thresholds.low,
            high: thresholds.high,
        });
    }

    let examples: Vec<LabeledExample> = reviews
        .iter()
        .filter_map(|review| {
            Label::from_rating(review.stars, thresholds)
                .map(|label| LabeledExample::new(review.text.clone(), label))
        })
        .collect();

    let dropped = reviews.len() - examples.len();
    if examples.is_empty() {
        return Err(PipelineError::EmptyDatasetError(format!(
            "none of {} reviews fell outside the neutral band ({}, {})",
            reviews.len(),
            thresholds.low,
            thresholds.high
        )));
    }

    let dataset = Dataset::from_examples(examples);
    let (negative, positive) = dataset.class_counts();
    info!(
        "Built dataset: {} examples kept, {} neutral dropped",
        dataset.len(),
        dropped
    );
    debug!("Class balance: {} negative, {} positive", negative, positive);

    Ok(dataset)
}
