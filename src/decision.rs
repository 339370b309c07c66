use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Rejection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Onside,
    Offside,
}

impl Decision {
    pub fn flip(self) -> Decision {
        match self {
            Decision::Onside => Decision::Offside,
            Decision::Offside => Decision::Onside,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Decision::Onside => "Onside",
            Decision::Offside => "Offside",
        }
    }

    pub fn parse(raw: &str) -> Option<Decision> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "onside" => Some(Decision::Onside),
            "offside" => Some(Decision::Offside),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DecisionRecord {
    pub algorithm_decision: Decision,
    pub final_decision: Decision,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionAction {
    Confirm,
    Override,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreResponse {
    #[serde(default)]
    pub decision_id: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveStatus {
    Pending,
    Saved { decision_id: Option<Value> },
    Failed,
}

/// Confirm-or-override review of the algorithmic verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionController {
    pub algorithm_decision: Decision,
    pub final_decision: Option<Decision>,
    pub controls_visible: bool,
    pub save_status: Option<SaveStatus>,
}

impl DecisionController {
    pub fn new(algorithm_decision: Decision) -> Self {
        Self {
            algorithm_decision,
            final_decision: None,
            controls_visible: true,
            save_status: None,
        }
    }

    /// Settles the final decision. Only the first action of a session
    /// produces a record.
    pub fn act(&mut self, action: DecisionAction) -> Result<DecisionRecord, Rejection> {
        if self.final_decision.is_some() {
            return Err(Rejection::DecisionAlreadyRecorded);
        }
        let final_decision = match action {
            DecisionAction::Confirm => self.algorithm_decision,
            DecisionAction::Override => self.algorithm_decision.flip(),
        };
        self.final_decision = Some(final_decision);
        self.controls_visible = false;
        self.save_status = Some(SaveStatus::Pending);
        Ok(DecisionRecord {
            algorithm_decision: self.algorithm_decision,
            final_decision,
        })
    }

    pub fn final_text(&self) -> Option<String> {
        self.final_decision
            .map(|decision| format!("Final decision: {}", decision.label()))
    }
}

/// Pulls the algorithmic decision out of the results page.
///
/// The page hands the verdict to its script either as
/// `algorithmDecision = "Offside"` or as a `data-algorithm-decision`
/// attribute.
pub fn extract_algorithm_decision(html: &str) -> Option<Decision> {
    const MARKERS: [&str; 3] = [
        "algorithmDecision",
        "data-algorithm-decision",
        "algorithm_decision",
    ];
    for marker in MARKERS {
        let mut rest = html;
        while let Some(pos) = rest.find(marker) {
            rest = &rest[pos + marker.len()..];
            if let Some(decision) = quoted_value_after_assignment(rest).and_then(Decision::parse)
            {
                return Some(decision);
            }
        }
    }
    None
}

fn quoted_value_after_assignment(rest: &str) -> Option<&str> {
    let trimmed = rest.trim_start_matches(|c: char| c == '"' || c == '\'' || c.is_whitespace());
    let after_op = trimmed
        .strip_prefix('=')
        .or_else(|| trimmed.strip_prefix(':'))?
        .trim_start();
    let quote = after_op.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let body = &after_op[quote.len_utf8()..];
    let end = body.find(quote)?;
    Some(&body[..end])
}
