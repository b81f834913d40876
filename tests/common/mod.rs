#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use ndarray::Array1;
use reviewsense::{EmbeddingVector, PipelineError, Review, TextEmbedder};

const POSITIVE: [&str; 6] = ["great", "fantastic", "love", "delicious", "friendly", "amazing"];
const NEGATIVE: [&str; 6] = ["bad", "awful", "terrible", "rude", "cold", "slow"];

/// Deterministic stand-in for a pretrained encoder: counts sentiment words
/// and adds a couple of neutral features.
pub struct LexiconEmbedder {
    pub calls: AtomicUsize,
    fail_on: Option<String>,
}

impl LexiconEmbedder {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_on: None,
        }
    }

    /// Fails to encode any text containing `needle`
    pub fn failing_on(needle: &str) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_on: Some(needle.to_string()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextEmbedder for LexiconEmbedder {
    fn embed(&self, text: &str) -> Result<EmbeddingVector, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(needle) = &self.fail_on {
            if text.contains(needle.as_str()) {
                return Err(PipelineError::EncodingError(format!("cannot encode '{}'", text)));
            }
        }

        let lower = text.to_lowercase();
        let words: Vec<&str> = lower.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()).collect();
        let count = |lexicon: &[&str]| words.iter().filter(|w| lexicon.contains(*w)).count() as f32;

        Ok(Array1::from(vec![
            count(&POSITIVE),
            count(&NEGATIVE),
            words.len() as f32 / 10.0,
            (text.len() % 7) as f32 / 7.0,
        ]))
    }

    fn dimension(&self) -> usize {
        4
    }
}

/// A balanced corpus where sentiment words line up with the rating
pub fn corpus() -> Vec<Review> {
    let mut reviews = Vec::new();
    for i in 0..30 {
        let pos = POSITIVE[i % POSITIVE.len()];
        let neg = NEGATIVE[i % NEGATIVE.len()];
        reviews.push(Review::new(format!("The food was {} and the staff {} #{}", pos, POSITIVE[(i + 1) % 6], i), 5 - (i % 2) as i64));
        reviews.push(Review::new(format!("Service was {} and the room {} #{}", neg, NEGATIVE[(i + 2) % 6], i), 1 + (i % 2) as i64));
        if i % 3 == 0 {
            reviews.push(Review::new(format!("It was okay I guess #{}", i), 3));
        }
    }
    reviews
}
