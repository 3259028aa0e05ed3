// This module renders a per-class classification report keyed by class name.
// Predictions come from the classifier evaluated on the validation split; the report
// only needs target and predicted label indices plus the ordered class names.
// An empty evaluation set is valid and yields an all-zero report.

use burn::tensor::{backend::Backend, Int, Tensor};
use std::fmt;

/// Precision/recall/F1 for one class
#[derive(Clone, Debug, PartialEq)]
pub struct ClassMetrics {
    pub name: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub total: usize,
}

fn ratio(num: usize, den: usize) -> f64 {
    // Zero division reports zero
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

impl ClassificationReport {
    /// Build a report; labels outside `class_names` count as wrong predictions only.
    /// `targets` and `predictions` must be the same length.
    pub fn from_predictions(targets: &[usize], predictions: &[usize], class_names: &[String]) -> Self {
        debug_assert_eq!(
            targets.len(),
            predictions.len(),
            "every target needs exactly one prediction"
        );
        let n = class_names.len();
        let mut true_pos = vec![0usize; n];
        let mut predicted = vec![0usize; n];
        let mut support = vec![0usize; n];
        let mut correct = 0;

        for (&target, &prediction) in targets.iter().zip(predictions) {
            if target < n {
                support[target] += 1;
            }
            if prediction < n {
                predicted[prediction] += 1;
            }
            if target == prediction {
                correct += 1;
                if target < n {
                    true_pos[target] += 1;
                }
            }
        }

        let classes = class_names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let precision = ratio(true_pos[i], predicted[i]);
                let recall = ratio(true_pos[i], support[i]);
                let f1 = if precision + recall == 0.0 {
                    0.0
                } else {
                    2.0 * precision * recall / (precision + recall)
                };
                ClassMetrics {
                    name: name.clone(),
                    precision,
                    recall,
                    f1,
                    support: support[i],
                }
            })
            .collect();

        let total = targets.len().min(predictions.len());
        Self {
            classes,
            accuracy: ratio(correct, total),
            total,
        }
    }

    /// Unweighted mean of (precision, recall, f1) over classes
    pub fn macro_avg(&self) -> (f64, f64, f64) {
        if self.classes.is_empty() {
            return (0.0, 0.0, 0.0);
        }
        let n = self.classes.len() as f64;
        let sum = self.classes.iter().fold((0.0, 0.0, 0.0), |acc, c| {
            (acc.0 + c.precision, acc.1 + c.recall, acc.2 + c.f1)
        });
        (sum.0 / n, sum.1 / n, sum.2 / n)
    }

    /// Support-weighted mean of (precision, recall, f1)
    pub fn weighted_avg(&self) -> (f64, f64, f64) {
        let support: usize = self.classes.iter().map(|c| c.support).sum();
        if support == 0 {
            return (0.0, 0.0, 0.0);
        }
        let w = support as f64;
        let sum = self.classes.iter().fold((0.0, 0.0, 0.0), |acc, c| {
            let s = c.support as f64;
            (acc.0 + c.precision * s, acc.1 + c.recall * s, acc.2 + c.f1 * s)
        });
        (sum.0 / w, sum.1 / w, sum.2 / w)
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .classes
            .iter()
            .map(|c| c.name.len())
            .chain(["weighted avg".len()])
            .max()
            .unwrap_or(0);

        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for c in &self.classes {
            writeln!(
                f,
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                c.name, c.precision, c.recall, c.f1, c.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.total
        )?;
        for (name, (p, r, f1)) in [("macro avg", self.macro_avg()), ("weighted avg", self.weighted_avg())] {
            writeln!(
                f,
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, p, r, f1, self.total
            )?;
        }
        Ok(())
    }
}

/// Class index with the highest value for every row of classifier output
pub fn argmax_labels<B: Backend>(output: Tensor<B, 2>) -> Vec<usize> {
    int_labels(output.argmax(1).flatten::<1>(0, 1))
}

/// Label tensor of a batch as plain indices
pub fn int_labels<B: Backend>(labels: Tensor<B, 1, Int>) -> Vec<usize> {
    labels
        .into_data()
        .convert::<i64>()
        .value
        .into_iter()
        .map(|v| v as usize)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> Vec<String> {
        vec!["phidippus".into(), "not_a_jumping_spider".into()]
    }

    #[test]
    fn metrics_per_class() {
        let targets = [0, 0, 0, 1, 1];
        let predictions = [0, 0, 1, 1, 0];
        let report = ClassificationReport::from_predictions(&targets, &predictions, &names());

        let a = &report.classes[0];
        assert!((a.precision - 2.0 / 3.0).abs() < 1e-9);
        assert!((a.recall - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(a.support, 3);
        let b = &report.classes[1];
        assert!((b.precision - 0.5).abs() < 1e-9);
        assert!((b.recall - 0.5).abs() < 1e-9);
        assert!((report.accuracy - 0.6).abs() < 1e-9);
    }

    #[test]
    fn empty_evaluation_set_is_all_zero() {
        let report = ClassificationReport::from_predictions(&[], &[], &names());
        assert_eq!(report.total, 0);
        assert_eq!(report.accuracy, 0.0);
        assert!(report.classes.iter().all(|c| c.f1 == 0.0 && c.support == 0));
        assert_eq!(report.macro_avg(), (0.0, 0.0, 0.0));

        let text = report.to_string();
        assert!(text.contains("not_a_jumping_spider"));
        assert!(text.contains("accuracy"));
    }

    #[test]
    fn argmax_picks_highest_column() {
        use burn::backend::{ndarray::NdArrayDevice, NdArray};
        use burn::tensor::{Data, Shape};

        let output = Tensor::<NdArray, 2>::from_data(
            Data::new(vec![0.1f32, 0.9, 0.8, 0.2], Shape::new([2, 2])),
            &NdArrayDevice::Cpu,
        );
        assert_eq!(argmax_labels(output), vec![1, 0]);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "every target needs exactly one prediction")]
    fn mismatched_lengths_are_rejected() {
        ClassificationReport::from_predictions(&[0, 1, 1], &[0, 1], &names());
    }

    #[test]
    fn int_labels_reads_targets() {
        use burn::backend::{ndarray::NdArrayDevice, NdArray};
        use burn::tensor::{Data, Shape};

        let targets = Tensor::<NdArray, 1, Int>::from_data(
            Data::new(vec![1i64, 0, 1], Shape::new([3])).convert(),
            &NdArrayDevice::Cpu,
        );
        assert_eq!(int_labels(targets), vec![1, 0, 1]);
    }
}
