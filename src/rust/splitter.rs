use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::dataset::Dataset;
use crate::error::PipelineError;

/// Partitions `dataset` into `(train, test)` with a seeded shuffle.
///
/// The test side receives `ceil(len * test_fraction)` examples, the train side
/// the rest. The same dataset, fraction and seed always produce the same
/// partition. The split is not stratified, so class balance may differ
/// between the two sides.
///
/// # Errors
/// - `InvalidSplitError` if `test_fraction` is not inside (0, 1)
/// - `InvalidSplitError` if the dataset has fewer than 2 examples
/// - `InvalidSplitError` if the fraction would leave either side empty
pub fn split(
    dataset: &Dataset,
    test_fraction: f64,
    seed: u64,
) -> Result<(Dataset, Dataset), PipelineError> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(PipelineError::InvalidSplitError(format!(
            "test fraction must be inside (0, 1), got {}",
            test_fraction
        )));
    }

    let total = dataset.len();
    if total < 2 {
        return Err(PipelineError::InvalidSplitError(format!(
            "need at least 2 examples to split, got {}",
            total
        )));
    }

    let test_len = (total as f64 * test_fraction).ceil() as usize;
    let train_len = total.saturating_sub(test_len);
    if train_len == 0 || test_len == 0 {
        return Err(PipelineError::InvalidSplitError(format!(
            "test fraction {} leaves an empty side for {} examples",
            test_fraction, total
        )));
    }

    let mut indices: Vec<usize> = (0..total).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let examples = dataset.examples();
    let pick = |idx: &[usize]| {
        Dataset::from_examples(idx.iter().map(|&i| examples[i].clone()).collect())
    };
    let (test_idx, train_idx) = indices.split_at(test_len);
    let (train, test) = (pick(train_idx), pick(test_idx));

    debug!(
        "Dataset split: {} training, {} test (seed {})",
        train.len(),
        test.len(),
        seed
    );

    Ok((train, test))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Label, LabeledExample};
    use std::collections::HashSet;

    fn numbered(n: usize) -> Dataset {
        Dataset::from_examples(
            (0..n)
                .map(|i| {
                    let label = if i % 2 == 0 { Label::Positive } else { Label::Negative };
                    LabeledExample::new(format!("review {}", i), label)
                })
                .collect(),
        )
    }

    #[test]
    fn test_correct_split_sizes() -> Result<(), PipelineError> {
        let (train, test) = split(&numbered(100), 0.2, 42)?;
        assert_eq!(train.len(), 80);
        assert_eq!(test.len(), 20);
        Ok(())
    }

    #[test]
    fn test_test_side_rounds_up() -> Result<(), PipelineError> {
        let (train, test) = split(&numbered(11), 0.2, 42)?;
        assert_eq!(test.len(), 3);
        assert_eq!(train.len(), 8);
        Ok(())
    }

    #[test]
    fn test_disjoint_and_complete() -> Result<(), PipelineError> {
        let dataset = numbered(57);
        let (train, test) = split(&dataset, 0.3, 7)?;

        let train_texts: HashSet<&str> = train.texts().into_iter().collect();
        let test_texts: HashSet<&str> = test.texts().into_iter().collect();
        assert!(train_texts.is_disjoint(&test_texts));
        assert_eq!(train_texts.len() + test_texts.len(), dataset.len());
        Ok(())
    }

    #[test]
    fn test_same_seed_same_partition() -> Result<(), PipelineError> {
        let dataset = numbered(40);
        let first = split(&dataset, 0.25, 1234)?;
        let second = split(&dataset, 0.25, 1234)?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn test_different_seed_shuffles_differently() -> Result<(), PipelineError> {
        let dataset = numbered(40);
        let (_, a) = split(&dataset, 0.25, 1)?;
        let (_, b) = split(&dataset, 0.25, 2)?;
        assert_ne!(a, b);
        Ok(())
    }

    #[test]
    fn test_invalid_fractions() {
        let dataset = numbered(10);
        for fraction in [0.0, 1.0, -0.5, 1.5, f64::NAN] {
            assert!(matches!(
                split(&dataset, fraction, 42),
                Err(PipelineError::InvalidSplitError(_))
            ));
        }
    }

    #[test]
    fn test_too_small_dataset() {
        assert!(matches!(
            split(&numbered(1), 0.5, 42),
            Err(PipelineError::InvalidSplitError(_))
        ));
    }

    #[test]
    fn test_fraction_leaving_no_training_rejected() {
        // ceil(2 * 0.9) = 2 test examples, nothing left to train on
        assert!(matches!(
            split(&numbered(2), 0.9, 42),
            Err(PipelineError::InvalidSplitError(_))
        ));
    }
}
