//! Degenerate gate detection
//!
//! Advisory only: the diagnostic logs warnings and returns a report, it
//! never fails and never blocks delivery of the gate tensor.

use candle_core::{DType, Tensor};
use moegate_domain::DegeneracyReport;
use nalgebra::DMatrix;
use tracing::{debug, warn};

/// Scan every layer of a `(layers, experts, hidden)` gate tensor and warn
/// about layers whose condition number exceeds `threshold`.
pub fn check_gate_degeneracy(gate: &Tensor, threshold: f64) -> DegeneracyReport {
    let condition_numbers = match layer_condition_numbers(gate) {
        Ok(values) => values,
        Err(e) => {
            warn!("Skipping gate degeneracy check: {}", e);
            return DegeneracyReport::empty(threshold);
        }
    };

    for (layer, c) in condition_numbers.iter().enumerate() {
        debug!("layer {} condition number {:.3}", layer, c);
    }

    let report = DegeneracyReport::from_condition_numbers(threshold, &condition_numbers);
    for message in report.warning_messages() {
        warn!("{}", message);
    }
    report
}

/// Condition number of each layer's (experts × hidden) slice, computed in f64
pub fn layer_condition_numbers(gate: &Tensor) -> candle_core::Result<Vec<f64>> {
    let (layers, experts, hidden) = gate.dims3()?;
    let data: Vec<f64> = gate.to_dtype(DType::F64)?.flatten_all()?.to_vec1()?;
    let stride = experts * hidden;

    Ok((0..layers)
        .map(|layer| {
            let slice = &data[layer * stride..(layer + 1) * stride];
            if slice.iter().any(|v| !v.is_finite()) {
                warn!("layer {} has non-finite gate values", layer);
                return f64::INFINITY;
            }
            condition_number(experts, hidden, slice)
        })
        .collect())
}

/// Ratio of largest to smallest singular value of a row-major matrix.
///
/// Singular matrices and matrices with non-finite entries yield
/// `f64::INFINITY`; empty ones yield NaN.
pub fn condition_number(rows: usize, cols: usize, data: &[f64]) -> f64 {
    if rows == 0 || cols == 0 {
        return f64::NAN;
    }
    if data.iter().any(|v| !v.is_finite()) {
        return f64::INFINITY;
    }
    let singular_values = DMatrix::from_row_slice(rows, cols, data).singular_values();
    let largest = singular_values.max();
    let smallest = singular_values.min();
    if smallest > 0.0 {
        largest / smallest
    } else {
        f64::INFINITY
    }
}
