//! Classification metrics

use crate::error::PipelineError;
use std::collections::{BTreeMap, BTreeSet};

/// Macro-averaged F1 on a 0-100 scale.
///
/// Classes are the union of true and predicted labels; a class with no true
/// and no predicted instances cannot occur, and an undefined precision or
/// recall counts as zero. A `None` prediction is always wrong: it is a false
/// negative for the true class and adds no class of its own.
pub fn macro_f1<L: Ord + Clone>(truth: &[L], predicted: &[Option<L>]) -> Result<f64, PipelineError> {
    if truth.len() != predicted.len() {
        return Err(PipelineError::ShapeMismatch(format!(
            "{} true labels but {} predictions",
            truth.len(),
            predicted.len()
        )));
    }
    if truth.is_empty() {
        return Err(PipelineError::EmptyInput(
            "cannot score an empty prediction set".to_string(),
        ));
    }

    let mut classes: BTreeSet<&L> = truth.iter().collect();
    classes.extend(predicted.iter().flatten());

    // (true positives, false positives, false negatives)
    let mut tallies: BTreeMap<&L, (usize, usize, usize)> =
        classes.into_iter().map(|c| (c, (0, 0, 0))).collect();

    for (actual, guess) in truth.iter().zip(predicted) {
        match guess {
            Some(guess) if guess == actual => {
                if let Some(t) = tallies.get_mut(actual) {
                    t.0 += 1;
                }
            }
            Some(guess) => {
                if let Some(t) = tallies.get_mut(guess) {
                    t.1 += 1;
                }
                if let Some(t) = tallies.get_mut(actual) {
                    t.2 += 1;
                }
            }
            None => {
                if let Some(t) = tallies.get_mut(actual) {
                    t.2 += 1;
                }
            }
        }
    }

    let total: f64 = tallies
        .values()
        .map(|&(tp, fp, fneg)| {
            let denominator = 2 * tp + fp + fneg;
            if denominator == 0 {
                0.0
            } else {
                (2 * tp) as f64 / denominator as f64
            }
        })
        .sum();

    Ok(total / tallies.len() as f64 * 100.0)
}

/// Macro-F1 for predictions that always carry a label
pub fn macro_f1_labels<L: Ord + Clone>(truth: &[L], predicted: &[L]) -> Result<f64, PipelineError> {
    let wrapped: Vec<Option<L>> = predicted.iter().cloned().map(Some).collect();
    macro_f1(truth, &wrapped)
}
