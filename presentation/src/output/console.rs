//! Console output formatter for gate reports

use crate::output::formatter::OutputFormatter;
use crate::output::summary::GateSummary;
use colored::Colorize;
use moegate_application::GateTensorKind;

/// Formats gate reports for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format the complete report
    pub fn format(summary: &GateSummary) -> String {
        let mut output = String::new();

        output.push_str(&Self::header("Gate Tensor"));
        output.push('\n');

        output.push_str(&format!("{} {}\n", "Model:".cyan().bold(), summary.model));
        output.push_str(&format!(
            "{} {} ({})\n",
            "Mode:".cyan().bold(),
            summary.mode,
            Self::kind_label(summary.kind)
        ));
        output.push_str(&format!(
            "{} {} layers x {} experts x {} hidden\n",
            "Shape:".cyan().bold(),
            summary.num_layers,
            summary.num_experts,
            summary.hidden_size
        ));

        output.push_str(&Self::section_header("Experts"));
        for (index, expert) in summary.experts.iter().enumerate() {
            let norm = expert
                .mean_norm
                .map(|n| format!("{:.4}", n))
                .unwrap_or_else(|| "-".to_string());
            output.push_str(&format!(
                "  {:>2} {:<20} {} positive, {} negative, mean norm {}\n",
                index,
                expert.name.yellow(),
                expert.positive_prompts,
                expert.negative_prompts,
                norm
            ));
        }

        output.push_str(&Self::section_header(&format!(
            "Layer conditioning (threshold {})",
            summary.degeneracy.threshold
        )));
        if summary.degeneracy.conditions.is_empty() {
            output.push_str(&format!("  {}\n", "not available".dimmed()));
        }
        for condition in &summary.degeneracy.conditions {
            let value = format!("{:>12.3}", condition.condition_number);
            if summary.degeneracy.degenerate_layers.contains(&condition.layer) {
                output.push_str(&format!(
                    "  layer {:>3} {} {}\n",
                    condition.layer,
                    value.red(),
                    "degenerate".red().bold()
                ));
            } else {
                output.push_str(&format!("  layer {:>3} {}\n", condition.layer, value.green()));
            }
        }

        if !summary.warnings.is_empty() {
            output.push_str(&format!("\n{}\n", "Warnings:".yellow().bold()));
            for warning in &summary.warnings {
                output.push_str(&format!("  * {}\n", warning));
            }
        }

        output.push_str(&Self::footer());
        output
    }

    /// Format as JSON
    pub fn format_json(summary: &GateSummary) -> String {
        serde_json::to_string_pretty(summary).unwrap_or_else(|_| "{}".to_string())
    }

    fn kind_label(kind: GateTensorKind) -> &'static str {
        match kind {
            GateTensorKind::Embeddings => "normalized embeddings",
            GateTensorKind::RoutingWeights => "routing weights",
        }
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format(&self, summary: &GateSummary) -> String {
        Self::format(summary)
    }

    fn format_json(&self, summary: &GateSummary) -> String {
        Self::format_json(summary)
    }
}
