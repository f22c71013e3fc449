//! Output formatter trait

use super::summary::GateSummary;
use moegate_domain::OutputFormat;

/// Trait for formatting gate reports
pub trait OutputFormatter {
    /// Human-readable report
    fn format(&self, summary: &GateSummary) -> String;

    /// Format as JSON
    fn format_json(&self, summary: &GateSummary) -> String;

    /// Dispatch on the requested format
    fn render(&self, summary: &GateSummary, format: OutputFormat) -> String {
        match format {
            OutputFormat::Summary => self.format(summary),
            OutputFormat::Json => self.format_json(summary),
        }
    }
}
