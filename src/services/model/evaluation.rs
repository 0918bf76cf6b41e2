use std::{collections::BTreeSet, fmt::Display};

use ndarray::{Array2, Axis};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Held-out rows whose true label is this class
    pub support: usize,
}

/// Held-out accuracy and per-class scores, diagnostic only
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub accuracy: f64,
    pub test_size: usize,
    pub classes: Vec<ClassMetrics>,
}

impl EvaluationReport {
    /// Scores predictions against truth; labels are the sorted union of both
    pub fn from_predictions(truth: &[String], predicted: &[String]) -> Self {
        let labels: Vec<&String> = truth
            .iter()
            .chain(predicted)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let matrix = confusion_matrix(&labels, truth, predicted);

        let total = matrix.sum();
        let accuracy = ratio(matrix.diag().sum(), total);
        let supports = matrix.sum_axis(Axis(1));
        let predicted_counts = matrix.sum_axis(Axis(0));

        let classes = labels
            .iter()
            .enumerate()
            .map(|(i, label)| {
                let tp = matrix[[i, i]];
                let precision = ratio(tp, predicted_counts[i]);
                let recall = ratio(tp, supports[i]);
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };

                ClassMetrics {
                    label: (*label).clone(),
                    precision,
                    recall,
                    f1,
                    support: supports[i] as usize,
                }
            })
            .collect();

        Self {
            accuracy,
            test_size: truth.len(),
            classes,
        }
    }
}

/// Counts indexed by (true label, predicted label)
fn confusion_matrix(labels: &[&String], truth: &[String], predicted: &[String]) -> Array2<f64> {
    let index = |label: &String| labels.binary_search(&label).ok();
    let mut matrix = Array2::zeros((labels.len(), labels.len()));
    for (t, p) in truth.iter().zip(predicted) {
        if let (Some(i), Some(j)) = (index(t), index(p)) {
            matrix[[i, j]] += 1.0;
        }
    }
    matrix
}

fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

impl Display for EvaluationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let width = self
            .classes
            .iter()
            .map(|c| c.label.len())
            .max()
            .unwrap_or(0)
            .max("accuracy".len());

        writeln!(
            f,
            "{:>width$}  {:>9}  {:>6}  {:>8}  {:>7}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        for c in &self.classes {
            writeln!(
                f,
                "{:>width$}  {:>9.2}  {:>6.2}  {:>8.2}  {:>7}",
                c.label, c.precision, c.recall, c.f1, c.support
            )?;
        }
        write!(
            f,
            "{:>width$}  {:>9}  {:>6}  {:>8.2}  {:>7}",
            "accuracy", "", "", self.accuracy, self.test_size
        )
    }
}
