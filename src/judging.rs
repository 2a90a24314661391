//! Judging details: folds the platform's duplicate families into the issue arena

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{AnalyzerError, Result};
use crate::model::{deserialize_id, null_as_default, IssueMap, Severity};

/// Judging flags for one report inside a family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyMember {
    #[serde(alias = "issue_id", deserialize_with = "deserialize_id")]
    pub issue: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub was_submitted_by_user: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub has_escalation_comment: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub escalation_resolved: bool,
}

impl FamilyMember {
    pub fn new(issue: impl Into<String>) -> Self {
        Self {
            issue: issue.into(),
            was_submitted_by_user: false,
            has_escalation_comment: false,
            escalation_resolved: false,
        }
    }
}

/// A main report and the duplicates judged together with it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Family {
    pub main: FamilyMember,
    #[serde(default)]
    pub primary_severity: Severity,
    #[serde(default, deserialize_with = "null_as_default")]
    pub duplicates: Vec<FamilyMember>,
    /// Reports in the family as counted by the platform, including ones
    /// hidden from the caller. `None` when every duplicate is listed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submissions_count: Option<usize>,
}

/// Pulls the family list out of a judging document.
///
/// Platforms send either `{"families": [...]}` or a list whose first entry
/// carrying a `families` array holds them. Other shapes have no families.
pub fn extract_families(payload: Value) -> std::result::Result<Vec<Family>, serde_json::Error> {
    let families = match payload {
        Value::Object(mut map) => map.remove("families"),
        Value::Array(items) => items.into_iter().find_map(|item| match item {
            Value::Object(mut map) if map.get("families").is_some_and(Value::is_array) => {
                map.remove("families")
            }
            _ => None,
        }),
        _ => None,
    };

    match families {
        Some(v @ Value::Array(_)) => serde_json::from_value(v),
        _ => Ok(Vec::new()),
    }
}

/// Applies judging details to freshly built issues in place.
///
/// A missing main issue fails the whole call since the titles and judging
/// fetches disagree. Missing duplicates are skipped.
pub fn apply_judging_details(issues: &mut IssueMap, families: &[Family]) -> Result<()> {
    for family in families {
        let main_id = family.main.issue.as_str();
        let severity = family.primary_severity;

        {
            let main = issues
                .get_mut(main_id)
                .ok_or_else(|| AnalyzerError::DataIntegrity {
                    issue_id: main_id.to_string(),
                })?;
            main.is_main = true;
            main.severity = severity;
            main.reported_submissions = family.submissions_count;
            main.is_submitted_by_user = family.main.was_submitted_by_user;
            main.escalation.escalated = family.main.has_escalation_comment;
            main.escalation.resolved = family.main.escalation_resolved;
        }

        let mut linked = Vec::with_capacity(family.duplicates.len());
        for details in &family.duplicates {
            if details.issue == main_id {
                continue;
            }
            let Some(dup) = issues.get_mut(&details.issue) else {
                debug!(
                    "Skipping duplicate {} of {}: not in issue titles",
                    details.issue, main_id
                );
                continue;
            };
            dup.is_submitted_by_user = details.was_submitted_by_user;
            dup.duplicate_of = Some(main_id.to_string());
            dup.severity = severity;
            dup.escalation.escalated = details.has_escalation_comment;
            dup.escalation.resolved = details.escalation_resolved;
            linked.push(details.issue.as_str());
        }

        if let Some(main) = issues.get_mut(main_id) {
            for id in linked {
                main.add_duplicate(id);
            }
        }
    }

    Ok(())
}
