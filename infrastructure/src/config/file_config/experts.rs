//! Expert definitions from TOML (`[[experts]]` array)

use moegate_domain::{ConfigIssue, ConfigIssueCode, Expert};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Raw expert entry from TOML
///
/// # Example
///
/// ```toml
/// [[experts]]
/// name = "code"
/// positive_prompts = ["Write a function that", "Fix the bug in"]
/// negative_prompts = ["Once upon a time"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileExpertConfig {
    pub name: String,
    pub positive_prompts: Vec<String>,
    pub negative_prompts: Vec<String>,
}

/// Convert raw expert entries, collecting every issue.
pub fn parse_experts(entries: &[FileExpertConfig]) -> (Vec<Expert>, Vec<ConfigIssue>) {
    let mut issues = Vec::new();
    let mut experts = Vec::with_capacity(entries.len());

    if entries.is_empty() {
        issues.push(ConfigIssue::error(
            ConfigIssueCode::NoExperts,
            "experts: at least one [[experts]] entry is required",
        ));
        return (experts, issues);
    }

    let mut seen = HashSet::new();
    for (index, entry) in entries.iter().enumerate() {
        if entry.name.trim().is_empty() {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::EmptyExpertName { index },
                format!("experts[{}]: name cannot be empty", index),
            ));
            continue;
        }
        if !seen.insert(entry.name.as_str()) {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::DuplicateExpertName {
                    name: entry.name.clone(),
                },
                format!("experts[{}]: duplicate expert name '{}'", index, entry.name),
            ));
        }
        if entry.positive_prompts.is_empty() {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::MissingPositivePrompts {
                    expert: entry.name.clone(),
                },
                format!("experts[{}]: '{}' has no positive_prompts", index, entry.name),
            ));
            continue;
        }

        // Validation above mirrors Expert::new, so this only fails on a new rule
        match Expert::new(
            entry.name.clone(),
            entry.positive_prompts.clone(),
            entry.negative_prompts.clone(),
        ) {
            Ok(expert) => experts.push(expert),
            Err(e) => issues.push(ConfigIssue::error(
                ConfigIssueCode::MissingPositivePrompts {
                    expert: entry.name.clone(),
                },
                format!("experts[{}]: {}", index, e),
            )),
        }
    }

    (experts, issues)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, positive: &[&str]) -> FileExpertConfig {
        FileExpertConfig {
            name: name.to_string(),
            positive_prompts: positive.iter().map(|s| s.to_string()).collect(),
            negative_prompts: Vec::new(),
        }
    }

    #[test]
    fn test_valid_experts_keep_order() {
        let (experts, issues) = parse_experts(&[entry("code", &["fn"]), entry("math", &["sum"])]);
        assert!(issues.is_empty());
        let names: Vec<&str> = experts.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["code", "math"]);
    }

    #[test]
    fn test_empty_list() {
        let (experts, issues) = parse_experts(&[]);
        assert!(experts.is_empty());
        assert_eq!(issues[0].code, ConfigIssueCode::NoExperts);
    }

    #[test]
    fn test_collects_all_issues() {
        let (experts, issues) = parse_experts(&[
            entry("", &["x"]),
            entry("chat", &[]),
            entry("code", &["fn"]),
            entry("code", &["impl"]),
        ]);
        assert_eq!(experts.len(), 2);
        assert_eq!(issues.len(), 3);
        assert_eq!(issues[0].code, ConfigIssueCode::EmptyExpertName { index: 0 });
        assert!(!issues[2].is_error());
    }
}
