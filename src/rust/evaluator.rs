use std::fmt;

use serde::Serialize;

use crate::dataset::Label;
use crate::error::PipelineError;

/// Precision, recall and F1 for one class
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Number of true examples of this class
    pub support: usize,
}

/// Counts of the four outcomes, with Positive as the positive class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ConfusionMatrix {
    pub true_negative: usize,
    pub false_positive: usize,
    pub false_negative: usize,
    pub true_positive: usize,
}

impl ConfusionMatrix {
    fn record(&mut self, truth: Label, predicted: Label) {
        match (truth, predicted) {
            (Label::Negative, Label::Negative) => self.true_negative += 1,
            (Label::Negative, Label::Positive) => self.false_positive += 1,
            (Label::Positive, Label::Negative) => self.false_negative += 1,
            (Label::Positive, Label::Positive) => self.true_positive += 1,
        }
    }

    /// `(tp, fp, fn)` counts taking `label` as the positive class
    fn counts_for(&self, label: Label) -> (usize, usize, usize) {
        match label {
            Label::Positive => (self.true_positive, self.false_positive, self.false_negative),
            Label::Negative => (self.true_negative, self.false_negative, self.false_positive),
        }
    }

    pub fn total(&self) -> usize {
        self.true_negative + self.false_positive + self.false_negative + self.true_positive
    }
}

/// Held-out quality of a trained classifier
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub negative: ClassMetrics,
    pub positive: ClassMetrics,
    pub accuracy: f64,
    /// Unweighted mean over classes seen in either label sequence
    pub macro_avg: ClassMetrics,
    /// Support-weighted mean over both classes
    pub weighted_avg: ClassMetrics,
    pub confusion: ConfusionMatrix,
}

impl EvaluationReport {
    pub fn class(&self, label: Label) -> &ClassMetrics {
        match label {
            Label::Negative => &self.negative,
            Label::Positive => &self.positive,
        }
    }

    pub fn total(&self) -> usize {
        self.confusion.total()
    }

    /// Whether `label` occurs among the true or the predicted labels
    pub fn is_represented(&self, label: Label) -> bool {
        let (tp, fp, fn_) = self.confusion.counts_for(label);
        tp + fp + fn_ > 0
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn harmonic_mean(a: f64, b: f64) -> f64 {
    if a + b == 0.0 {
        0.0
    } else {
        2.0 * a * b / (a + b)
    }
}

fn class_metrics(confusion: &ConfusionMatrix, label: Label) -> ClassMetrics {
    let (tp, fp, fn_) = confusion.counts_for(label);
    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_);
    ClassMetrics {
        precision,
        recall,
        f1: harmonic_mean(precision, recall),
        support: tp + fn_,
    }
}

/// Compares predicted against true labels.
///
/// Any 0/0 ratio is reported as 0 rather than NaN.
///
/// # Errors
/// - `ReportComputationError` if the sequences are empty or differ in length
pub fn evaluate(truth: &[Label], predicted: &[Label]) -> Result<EvaluationReport, PipelineError> {
    if truth.len() != predicted.len() {
        return Err(PipelineError::ReportComputationError(format!(
            "{} true labels but {} predictions",
            truth.len(),
            predicted.len()
        )));
    }
    if truth.is_empty() {
        return Err(PipelineError::ReportComputationError(
            "cannot evaluate an empty label sequence".into(),
        ));
    }

    let mut confusion = ConfusionMatrix::default();
    for (&t, &p) in truth.iter().zip(predicted) {
        confusion.record(t, p);
    }

    let negative = class_metrics(&confusion, Label::Negative);
    let positive = class_metrics(&confusion, Label::Positive);
    let total = confusion.total();
    let accuracy = ratio(confusion.true_negative + confusion.true_positive, total);

    let represented: Vec<ClassMetrics> = Label::ALL
        .iter()
        .filter(|&&l| {
            let (tp, fp, fn_) = confusion.counts_for(l);
            tp + fp + fn_ > 0
        })
        .map(|&l| if l == Label::Positive { positive } else { negative })
        .collect();
    let count = represented.len().max(1) as f64;
    let macro_avg = ClassMetrics {
        precision: represented.iter().map(|m| m.precision).sum::<f64>() / count,
        recall: represented.iter().map(|m| m.recall).sum::<f64>() / count,
        f1: represented.iter().map(|m| m.f1).sum::<f64>() / count,
        support: total,
    };

    let weighted = |f: fn(&ClassMetrics) -> f64| {
        (f(&negative) * negative.support as f64 + f(&positive) * positive.support as f64) / total as f64
    };
    let weighted_avg = ClassMetrics {
        precision: weighted(|m| m.precision),
        recall: weighted(|m| m.recall),
        f1: weighted(|m| m.f1),
        support: total,
    };

    Ok(EvaluationReport {
        negative,
        positive,
        accuracy,
        macro_avg,
        weighted_avg,
        confusion,
    })
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let row = |f: &mut fmt::Formatter<'_>, name: &str, m: &ClassMetrics| {
            writeln!(
                f,
                "{:>12} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, m.precision, m.recall, m.f1, m.support
            )
        };

        writeln!(f, "{:>12} {:>9} {:>9} {:>9} {:>9}", "", "precision", "recall", "f1-score", "support")?;
        writeln!(f)?;
        for label in Label::ALL {
            if self.is_represented(label) {
                row(f, &label.to_string(), self.class(label))?;
            }
        }
        writeln!(f)?;
        writeln!(f, "{:>12} {:>9} {:>9} {:>9.2} {:>9}", "accuracy", "", "", self.accuracy, self.total())?;
        row(f, "macro avg", &self.macro_avg)?;
        row(f, "weighted avg", &self.weighted_avg)
    }
}
