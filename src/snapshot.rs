//! Change detection between poll cycles
//!
//! A snapshot keeps only what affects the rendered report or the
//! notification, with collections sorted and floats rounded so that two
//! cycles over unchanged data compare equal.

use crate::model::{Issue, Severity};
use crate::report::{JudgingProgress, Report};

/// Decimal places kept for every float in a snapshot
pub const SNAPSHOT_PRECISION: i32 = 8;

/// Fixed-point representation of `value` at [`SNAPSHOT_PRECISION`] decimals
pub fn round_fixed(value: f64) -> i64 {
    (value * 10f64.powi(SNAPSHOT_PRECISION)).round() as i64
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IssueSnapshot {
    pub id: String,
    pub number: u32,
    pub title: String,
    pub severity: Severity,
    pub is_main: bool,
    pub duplicate_of: Option<String>,
    pub duplicate_ids: Vec<String>,
    pub submissions: usize,
    pub is_submitted_by_user: bool,
    pub points: i64,
    pub reward: i64,
    pub escalated: bool,
    pub resolved: bool,
    pub lead_judge_comment_ids: Vec<String>,
}

impl IssueSnapshot {
    pub fn of(issue: &Issue) -> Self {
        let mut duplicate_ids = issue.duplicate_ids.clone();
        duplicate_ids.sort();
        let mut lead_judge_comment_ids: Vec<String> =
            issue.lead_judge_comments().map(|c| c.id.clone()).collect();
        lead_judge_comment_ids.sort();

        Self {
            id: issue.id.clone(),
            number: issue.number,
            title: issue.title.clone(),
            severity: issue.severity,
            is_main: issue.is_main,
            duplicate_of: issue.duplicate_of.clone(),
            duplicate_ids,
            submissions: issue.submissions_count(),
            is_submitted_by_user: issue.is_submitted_by_user,
            points: round_fixed(issue.points),
            reward: round_fixed(issue.reward),
            escalated: issue.escalation.escalated,
            resolved: issue.escalation.resolved,
            lead_judge_comment_ids,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSnapshot {
    /// Sorted by issue id
    pub issues: Vec<(String, IssueSnapshot)>,
    pub prize_pool: i64,
    pub total_points: i64,
    pub my_total_issues: usize,
    pub my_valid_issues: usize,
    pub my_total_reward: i64,
    pub total_escalated: usize,
    pub total_resolved: usize,
    pub judging: Option<JudgingProgress>,
}

impl ReportSnapshot {
    /// Ids whose snapshot differs from `previous`, including added and removed issues
    pub fn changed_issue_ids<'a>(&'a self, previous: &'a ReportSnapshot) -> Vec<&'a str> {
        let mut changed: Vec<&str> = self
            .issues
            .iter()
            .filter(|(id, snap)| {
                previous
                    .issues
                    .binary_search_by(|(other, _)| other.as_str().cmp(id.as_str()))
                    .map_or(true, |idx| previous.issues[idx].1 != *snap)
            })
            .map(|(id, _)| id.as_str())
            .collect();

        changed.extend(
            previous
                .issues
                .iter()
                .filter(|(id, _)| {
                    self.issues
                        .binary_search_by(|(other, _)| other.as_str().cmp(id.as_str()))
                        .is_err()
                })
                .map(|(id, _)| id.as_str()),
        );
        changed.sort_unstable();
        changed
    }
}

/// Canonical, order-independent fingerprint of a report
pub fn compute_fingerprint(report: &Report) -> ReportSnapshot {
    let mut issues: Vec<(String, IssueSnapshot)> = report
        .issues
        .iter()
        .map(|(id, issue)| (id.clone(), IssueSnapshot::of(issue)))
        .collect();
    issues.sort_by(|a, b| a.0.cmp(&b.0));

    ReportSnapshot {
        issues,
        prize_pool: round_fixed(report.prize_pool),
        total_points: round_fixed(report.total_points),
        my_total_issues: report.my_total_issues,
        my_valid_issues: report.my_valid_issues,
        my_total_reward: round_fixed(report.my_total_reward),
        total_escalated: report.total_escalated,
        total_resolved: report.total_resolved,
        judging: report.judging.clone(),
    }
}
