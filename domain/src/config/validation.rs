//! Structured configuration issues.
//!
//! Configuration sources report every problem they find as a
//! [`ConfigIssue`] instead of failing on the first one, so the user can fix
//! a config file in a single pass.

/// Severity level of a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Fatal: gate computation cannot start with this configuration.
    Error,
    /// Non-fatal: computation proceeds but may not behave as expected.
    Warning,
}

/// Identifies a specific configuration issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigIssueCode {
    /// No `[[experts]]` entries
    NoExperts,
    /// Expert at this position has a blank name
    EmptyExpertName { index: usize },
    /// Two experts share a name
    DuplicateExpertName { name: String },
    /// Expert has no positive prompts
    MissingPositivePrompts { expert: String },
    /// A string field holds a value outside its accepted set
    InvalidEnumValue {
        field: String,
        value: String,
        valid_values: Vec<String>,
    },
    /// Both 4-bit and 8-bit loading requested
    ConflictingQuantization,
    /// `[model].path` is not set
    MissingModelPath,
}

/// A detected issue in the configuration.
#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub code: ConfigIssueCode,
    pub message: String,
}

impl ConfigIssue {
    pub fn error(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
        }
    }

    pub fn warning(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}
