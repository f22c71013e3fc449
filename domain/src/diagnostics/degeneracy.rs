//! Degenerate routing detection results.
//!
//! A layer is degenerate when the condition number of its
//! (experts × hidden) gate matrix exceeds a threshold: the expert vectors
//! are close to linearly dependent and the router cannot tell them apart.

use serde::Serialize;

/// Condition number measured for one layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LayerCondition {
    pub layer: usize,
    /// Largest over smallest singular value; infinite for singular matrices
    pub condition_number: f64,
}

/// Outcome of a degeneracy scan over every layer of a gate tensor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DegeneracyReport {
    pub threshold: f64,
    pub num_layers: usize,
    pub conditions: Vec<LayerCondition>,
    pub degenerate_layers: Vec<usize>,
}

impl DegeneracyReport {
    /// Build a report from per-layer condition numbers (index = layer).
    ///
    /// NaN never exceeds the threshold, so it is not flagged.
    pub fn from_condition_numbers(threshold: f64, condition_numbers: &[f64]) -> Self {
        let conditions: Vec<LayerCondition> = condition_numbers
            .iter()
            .enumerate()
            .map(|(layer, &condition_number)| LayerCondition {
                layer,
                condition_number,
            })
            .collect();
        let degenerate_layers = conditions
            .iter()
            .filter(|c| c.condition_number > threshold)
            .map(|c| c.layer)
            .collect();

        Self {
            threshold,
            num_layers: condition_numbers.len(),
            conditions,
            degenerate_layers,
        }
    }

    /// Report with no measurements, used when the tensor could not be read
    pub fn empty(threshold: f64) -> Self {
        Self {
            threshold,
            num_layers: 0,
            conditions: Vec::new(),
            degenerate_layers: Vec::new(),
        }
    }

    pub fn is_degenerate(&self) -> bool {
        !self.degenerate_layers.is_empty()
    }

    /// Human-readable subject and verb, e.g. `("layers 1 and 4", "have")`
    pub fn layer_phrase(&self) -> Option<(String, &'static str)> {
        let layers = &self.degenerate_layers;
        match layers.len() {
            0 => None,
            1 => Some((format!("layer {}", layers[0]), "has")),
            2 => Some((format!("layers {} and {}", layers[0], layers[1]), "have")),
            n if n >= self.num_layers => Some(("ALL layers".to_string(), "have")),
            n => {
                let head = layers[..n - 1]
                    .iter()
                    .map(|l| l.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                Some((format!("layers {}, and {}", head, layers[n - 1]), "have"))
            }
        }
    }

    /// The warnings to emit, in order. Empty when nothing is degenerate.
    pub fn warning_messages(&self) -> Vec<String> {
        match self.layer_phrase() {
            Some((subject, verb)) => vec![
                format!(
                    "{} {} degenerate routing parameters - your prompts may be too similar.",
                    subject, verb
                ),
                "One or more experts will be underutilized in your model.".to_string(),
            ],
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_degenerate_layers() {
        let report = DegeneracyReport::from_condition_numbers(5.0, &[1.0, 2.5, 4.9]);
        assert!(!report.is_degenerate());
        assert!(report.warning_messages().is_empty());
        assert_eq!(report.conditions.len(), 3);
    }

    #[test]
    fn test_single_layer_phrase() {
        let report = DegeneracyReport::from_condition_numbers(5.0, &[1.0, 9.0, 1.0, 1.0]);
        assert_eq!(report.degenerate_layers, vec![1]);
        let messages = report.warning_messages();
        assert_eq!(
            messages[0],
            "layer 1 has degenerate routing parameters - your prompts may be too similar."
        );
        assert_eq!(
            messages[1],
            "One or more experts will be underutilized in your model."
        );
    }

    #[test]
    fn test_two_layer_phrase() {
        let report = DegeneracyReport::from_condition_numbers(5.0, &[6.0, 1.0, 7.0, 1.0]);
        let (subject, verb) = report.layer_phrase().unwrap();
        assert_eq!(subject, "layers 0 and 2");
        assert_eq!(verb, "have");
    }

    #[test]
    fn test_many_layer_phrase() {
        let report =
            DegeneracyReport::from_condition_numbers(5.0, &[6.0, 1.0, 7.0, 1.0, f64::INFINITY]);
        let (subject, _) = report.layer_phrase().unwrap();
        assert_eq!(subject, "layers 0, 2, and 4");
    }

    #[test]
    fn test_all_layers_phrase() {
        let report = DegeneracyReport::from_condition_numbers(5.0, &[6.0, 7.0, 8.0]);
        let (subject, verb) = report.layer_phrase().unwrap();
        assert_eq!(subject, "ALL layers");
        assert_eq!(verb, "have");
    }

    #[test]
    fn test_two_of_two_layers_uses_pair_phrase() {
        let report = DegeneracyReport::from_condition_numbers(5.0, &[6.0, 7.0]);
        let (subject, _) = report.layer_phrase().unwrap();
        assert_eq!(subject, "layers 0 and 1");
    }

    #[test]
    fn test_nan_not_flagged() {
        let report = DegeneracyReport::from_condition_numbers(5.0, &[f64::NAN]);
        assert!(!report.is_degenerate());
    }

    #[test]
    fn test_empty_report() {
        let report = DegeneracyReport::empty(5.0);
        assert_eq!(report.num_layers, 0);
        assert!(report.layer_phrase().is_none());
    }
}
