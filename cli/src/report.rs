//! Printable results for `check` and `introspect`.

#[cfg(test)]
#[path = "report_test.rs"]
mod report_test;

use serde::Serialize;
use session_gate::{Decision, Policy, ValidationOutcome};

/// Label used for paths rendered without the gate.
pub const PUBLIC_POLICY: &str = "public";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    pub path: String,
    pub policy: &'static str,
    pub decision: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    /// Set when the gate cleared the session: whether the store is now empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_cleared: Option<bool>,
}

impl CheckReport {
    pub fn public(path: &str) -> Self {
        Self { path: path.to_owned(), policy: PUBLIC_POLICY, decision: "grant", redirect: None, session_cleared: None }
    }

    pub fn decided(path: &str, policy: &Policy, decision: &Decision) -> Self {
        let label = match decision {
            Decision::Pending => "pending",
            Decision::Grant => "grant",
            Decision::RedirectLogin | Decision::RedirectDashboard { .. } => "redirect",
        };
        Self {
            path: path.to_owned(),
            policy: policy.name,
            decision: label,
            redirect: decision.target_path(),
            session_cleared: None,
        }
    }

    pub fn render_text(&self) -> String {
        let line = match &self.redirect {
            Some(target) => format!("{} -> {target} [{}]", self.path, self.policy),
            None => format!("{} {} [{}]", self.path, self.decision, self.policy),
        };
        if self.session_cleared == Some(false) {
            format!("{line} (session NOT cleared)")
        } else {
            line
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IntrospectReport {
    Valid { role: String },
    Invalid { status: u16 },
    NetworkError { reason: String },
}

impl From<&ValidationOutcome> for IntrospectReport {
    fn from(outcome: &ValidationOutcome) -> Self {
        match outcome {
            ValidationOutcome::Valid { role } => Self::Valid { role: role.as_str().to_owned() },
            ValidationOutcome::Invalid { status } => Self::Invalid { status: *status },
            ValidationOutcome::NetworkError { reason } => Self::NetworkError { reason: reason.clone() },
        }
    }
}

impl IntrospectReport {
    pub fn render_text(&self) -> String {
        match self {
            Self::Valid { role } => format!("valid (role: {role})"),
            Self::Invalid { status } => format!("invalid (HTTP {status})"),
            Self::NetworkError { reason } => format!("unreachable: {reason}"),
        }
    }
}
