//! Contest-wide aggregate handed to the presentation layer

use serde::Serialize;

use crate::model::{Finding, Issue, IssueMap, Severity};

/// Fully scored state of one contest for one poll cycle
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub platform: String,
    pub contest_id: String,
    pub prize_pool: f64,
    /// Points across every report of every valid family
    pub total_points: f64,
    pub issues: IssueMap,
    /// One entry per family, in main issue id order
    pub findings: Vec<Finding>,
    pub total_issues: usize,
    pub total_valid_issues: usize,
    pub total_invalid_issues: usize,
    pub my_total_issues: usize,
    pub my_valid_issues: usize,
    pub my_total_reward: f64,
    pub total_escalated: usize,
    pub total_resolved: usize,
    /// Only for platforms that expose raw submissions
    pub judging: Option<JudgingProgress>,
}

/// How far judging has progressed over the raw submissions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JudgingProgress {
    pub total_submissions: usize,
    pub total_primary: usize,
    pub total_judged: usize,
    pub my_total_submissions: usize,
    pub my_primary_submissions: usize,
    /// Handle the `my_*` counters refer to
    pub handle: Option<String>,
}

/// Lead judge comment statistics, only populated when comments were fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeadJudgeActivity {
    /// Invalid issues with at least one lead judge comment
    pub commented_invalid: usize,
    /// Issue number and timestamp of the most recent lead judge comment
    pub latest: Option<(u32, i64)>,
}

impl Report {
    pub fn build(
        platform: impl Into<String>,
        contest_id: impl Into<String>,
        issues: IssueMap,
        prize_pool: f64,
        total_points: f64,
    ) -> Self {
        let findings: Vec<Finding> = issues
            .values()
            .filter(|i| i.is_main)
            .map(|main| Finding::from_main(main, &issues))
            .collect();

        let total_valid_issues = issues.values().filter(|i| i.is_valid()).count();
        let total_invalid_issues = issues
            .values()
            .filter(|i| i.severity == Severity::Invalid)
            .count();
        let mine: Vec<&Issue> = issues.values().filter(|i| i.is_submitted_by_user).collect();
        let my_valid_issues = mine.iter().filter(|i| i.is_valid()).count();
        let my_total_reward = mine.iter().map(|i| i.reward).sum();
        let total_escalated = issues.values().filter(|i| i.escalation.escalated).count();
        let total_resolved = issues
            .values()
            .filter(|i| i.escalation.is_resolved())
            .count();

        Self {
            platform: platform.into(),
            contest_id: contest_id.into(),
            prize_pool,
            total_points,
            total_issues: issues.len(),
            total_valid_issues,
            total_invalid_issues,
            my_total_issues: mine.len(),
            my_valid_issues,
            my_total_reward,
            total_escalated,
            total_resolved,
            judging: None,
            findings,
            issues,
        }
    }

    pub fn with_judging(mut self, judging: Option<JudgingProgress>) -> Self {
        self.judging = judging;
        self
    }

    /// Reports in the family `issue` belongs to, whether main or duplicate
    pub fn family_size(&self, issue: &Issue) -> usize {
        issue
            .duplicate_of
            .as_ref()
            .and_then(|main| self.issues.get(main))
            .unwrap_or(issue)
            .submissions_count()
    }

    pub fn valid_findings(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.is_valid())
    }

    /// Families judged invalid that are being disputed
    pub fn invalid_escalated_issues(&self) -> Vec<&Issue> {
        self.issues
            .values()
            .filter(|i| i.severity == Severity::Invalid && i.escalation.escalated)
            .collect()
    }

    pub fn pending_escalations(&self) -> usize {
        self.total_escalated.saturating_sub(self.total_resolved)
    }

    pub fn lead_judge_activity(&self) -> LeadJudgeActivity {
        let commented_invalid = self
            .issues
            .values()
            .filter(|i| i.severity == Severity::Invalid && i.lead_judge_comments().next().is_some())
            .count();

        let latest = self
            .issues
            .values()
            .flat_map(|i| i.lead_judge_comments().map(move |c| (i.number, c.created_at)))
            .max_by_key(|(_, ts)| *ts);

        LeadJudgeActivity {
            commented_invalid,
            latest,
        }
    }

    /// One-line notification text
    pub fn summary(&self) -> String {
        if let Some(judging) = &self.judging {
            return self.judging_summary(judging);
        }
        format!(
            "{} {}: Reward: {:.2} | Valid issues: {}/{} | Escalations resolved: {}/{}",
            self.platform,
            self.contest_id,
            self.my_total_reward,
            self.my_valid_issues,
            self.my_total_issues,
            self.total_resolved,
            self.total_escalated
        )
    }

    fn judging_summary(&self, judging: &JudgingProgress) -> String {
        let mut line = format!(
            "{} {}: {}/{} valid primaries | judged {}/{}",
            self.platform,
            self.contest_id,
            self.valid_findings().count(),
            judging.total_primary,
            judging.total_judged,
            judging.total_submissions
        );
        let has_pool = self.prize_pool > 0.0;
        if has_pool {
            line.push_str(&format!(
                " | pool ${} | pts {:.2}",
                format_amount(self.prize_pool, 0),
                self.total_points
            ));
        }
        match &judging.handle {
            Some(handle) => {
                let my_valid = self.valid_findings().filter(|f| f.mine).count();
                line.push_str(&format!(" | {}: {} valid", handle, my_valid));
                if has_pool {
                    line.push_str(&format!(", est ${}", format_amount(self.my_total_reward, 2)));
                }
            }
            None if has_pool && self.my_total_reward > 0.0 => {
                line.push_str(&format!(
                    " | My est reward: ${}",
                    format_amount(self.my_total_reward, 2)
                ));
            }
            None => {}
        }
        line
    }
}

/// `amount` with `decimals` places and thousands separators: `12,345.60`
pub fn format_amount(amount: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, amount.abs());
    let (whole, fraction) = match fixed.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (fixed.as_str(), None),
    };

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0.0 && fixed.chars().any(|c| c != '0' && c != '.') {
        "-"
    } else {
        ""
    };
    match fraction {
        Some(fraction) => format!("{}{}.{}", sign, grouped, fraction),
        None => format!("{}{}", sign, grouped),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Comment, Escalation};

    fn lead_comment(id: &str, ts: i64) -> Comment {
        Comment {
            id: id.to_string(),
            created_at: ts,
            is_lead_judge: true,
            extra: Default::default(),
        }
    }

    fn sample() -> IssueMap {
        let mut issues = IssueMap::new();

        let mut main = Issue::new("1", 1, "Reentrancy");
        main.is_main = true;
        main.severity = Severity::High;
        main.is_submitted_by_user = true;
        main.points = 2.25;
        main.reward = 500.0;
        main.add_duplicate("2");
        issues.insert("1".into(), main);

        let mut dup = Issue::new("2", 2, "Reentrancy dup");
        dup.severity = Severity::High;
        dup.duplicate_of = Some("1".into());
        dup.points = 2.25;
        dup.reward = 500.0;
        dup.escalation = Escalation {
            escalated: true,
            resolved: true,
        };
        issues.insert("2".into(), dup);

        let mut invalid = Issue::new("3", 3, "Gas");
        invalid.is_main = true;
        invalid.severity = Severity::Invalid;
        invalid.is_submitted_by_user = true;
        invalid.escalation.escalated = true;
        invalid.attach_comments(vec![lead_comment("c1", 100)]);
        issues.insert("3".into(), invalid);

        let mut unjudged = Issue::new("4", 4, "Pending");
        unjudged.attach_comments(vec![lead_comment("c2", 200)]);
        issues.insert("4".into(), unjudged);

        issues
    }

    #[test]
    fn test_counters() {
        let report = Report::build("Sherlock", "42", sample(), 1000.0, 4.5);
        assert_eq!(report.total_issues, 4);
        assert_eq!(report.total_valid_issues, 2);
        assert_eq!(report.total_invalid_issues, 1);
        assert_eq!(report.my_total_issues, 2);
        assert_eq!(report.my_valid_issues, 1);
        assert_eq!(report.my_total_reward, 500.0);
        assert_eq!(report.total_escalated, 2);
        assert_eq!(report.total_resolved, 1);
        assert_eq!(report.pending_escalations(), 1);
    }

    #[test]
    fn test_findings() {
        let report = Report::build("Sherlock", "42", sample(), 1000.0, 4.5);
        assert_eq!(report.findings.len(), 2);
        let valid: Vec<&Finding> = report.valid_findings().collect();
        assert_eq!(valid.len(), 1);
        assert_eq!(valid[0].main_id, "1");
        assert!(valid[0].mine);
        assert_eq!(valid[0].total_reward(), 1000.0);
    }

    #[test]
    fn test_invalid_escalated_issues() {
        let report = Report::build("Sherlock", "42", sample(), 1000.0, 4.5);
        let ids: Vec<&str> = report
            .invalid_escalated_issues()
            .iter()
            .map(|i| i.id.as_str())
            .collect();
        assert_eq!(ids, vec!["3"]);
    }

    #[test]
    fn test_lead_judge_activity() {
        let report = Report::build("Sherlock", "42", sample(), 1000.0, 4.5);
        let activity = report.lead_judge_activity();
        assert_eq!(activity.commented_invalid, 1);
        assert_eq!(activity.latest, Some((4, 200)));
    }

    #[test]
    fn test_family_size_of_duplicate_is_main_family() {
        let report = Report::build("Sherlock", "42", sample(), 1000.0, 4.5);
        assert_eq!(report.family_size(&report.issues["2"]), 2);
        assert_eq!(report.family_size(&report.issues["1"]), 2);
        assert_eq!(report.family_size(&report.issues["3"]), 1);
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0.0, 2), "0.00");
        assert_eq!(format_amount(999.999, 2), "1,000.00");
        assert_eq!(format_amount(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_amount(50000.0, 0), "50,000");
        assert_eq!(format_amount(-42.5, 2), "-42.50");
    }

    fn progress(handle: Option<&str>) -> JudgingProgress {
        JudgingProgress {
            total_submissions: 10,
            total_primary: 4,
            total_judged: 7,
            my_total_submissions: 2,
            my_primary_submissions: 1,
            handle: handle.map(str::to_string),
        }
    }

    #[test]
    fn test_judging_summary_without_pool() {
        let report = Report::build("Code4rena", "2024-01-x", sample(), 0.0, 4.5)
            .with_judging(Some(progress(None)));
        assert_eq!(
            report.summary(),
            "Code4rena 2024-01-x: 1/4 valid primaries | judged 7/10"
        );
    }

    #[test]
    fn test_judging_summary_with_pool_and_handle() {
        let report = Report::build("Code4rena", "2024-01-x", sample(), 50000.0, 4.5)
            .with_judging(Some(progress(Some("alice"))));
        assert_eq!(
            report.summary(),
            "Code4rena 2024-01-x: 1/4 valid primaries | judged 7/10 | pool $50,000 | pts 4.50 \
             | alice: 1 valid, est $500.00"
        );
    }

    #[test]
    fn test_judging_summary_reward_without_handle() {
        let report = Report::build("Code4rena", "2024-01-x", sample(), 1000.0, 4.5)
            .with_judging(Some(progress(None)));
        assert!(report.summary().ends_with(" | pts 4.50 | My est reward: $500.00"));
    }

    #[test]
    fn test_summary() {
        let report = Report::build("Sherlock", "42", sample(), 1000.0, 4.5);
        assert_eq!(
            report.summary(),
            "Sherlock 42: Reward: 500.00 | Valid issues: 1/2 | Escalations resolved: 1/2"
        );
    }
}
