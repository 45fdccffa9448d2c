use serde::{Deserialize, Serialize};

/// Severity of a single rule outcome.
///
/// `Timeout` marks a rule that exceeded its execution budget; the rule is
/// reported as failed but the surrounding validation run continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Timeout,
}

/// Outcome of running one validation rule against one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleResult {
    pub rule_id: String,
    pub is_valid: bool,
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affected_column: Option<String>,
}

impl RuleResult {
    pub fn valid(rule_id: impl Into<String>) -> Self {
        Self {
            rule_id: rule_id.into(),
            is_valid: true,
            severity: Severity::Info,
            message: String::new(),
            affected_column: None,
        }
    }

    pub fn invalid(
        rule_id: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            is_valid: false,
            severity,
            message: message.into(),
            affected_column: None,
        }
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.affected_column = Some(column.into());
        self
    }
}
