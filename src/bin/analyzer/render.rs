//! Terminal report tables

use chrono::{DateTime, Local};
use contest_analyzer::model::{Finding, Issue};
use contest_analyzer::report::Report;
use contest_analyzer::ReportRenderer;

use crate::style::*;

/// What the table shows, set from the command-line flags
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    /// Escalation columns and the escalated-invalid table
    pub escalations: bool,
    /// Lead judge comment statistics
    pub comments: bool,
    /// Also list findings that earn nothing
    pub include_invalid: bool,
    pub highlight_mine: bool,
    pub title_width: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            escalations: false,
            comments: false,
            include_invalid: false,
            highlight_mine: false,
            title_width: 70,
        }
    }
}

pub struct TableRenderer {
    options: RenderOptions,
    highlight: bool,
}

impl TableRenderer {
    pub fn new(options: RenderOptions) -> Self {
        Self {
            highlight: options.highlight_mine && stdout_supports_color(),
            options,
        }
    }

    fn title_width(&self) -> usize {
        self.options.title_width.max(20)
    }

    fn print_totals(&self, report: &Report) {
        println!(
            "Total issues: {} (valid: {}, invalid: {})",
            report.total_issues, report.total_valid_issues, report.total_invalid_issues
        );
        println!("Total points: {:.4}", report.total_points);
        if report.prize_pool > 0.0 {
            println!("Prize pool: ${}", format_usd(report.prize_pool));
        }
        println!(
            "My issues: {} (valid: {}, invalid: {})",
            report.my_total_issues,
            report.my_valid_issues,
            report.my_total_issues - report.my_valid_issues
        );
        println!("My expected reward: ${}", format_usd(report.my_total_reward));

        if let Some(judging) = &report.judging {
            println!(
                "Submissions: {} (primary: {}) | Judged: {}",
                judging.total_submissions, judging.total_primary, judging.total_judged
            );
            if let Some(handle) = &judging.handle {
                println!(
                    "{} submissions: {} ({} primary)",
                    handle, judging.my_total_submissions, judging.my_primary_submissions
                );
            }
        }

        if self.options.escalations {
            println!(
                "Escalations: {} escalated | {} resolved | {} pending",
                report.total_escalated,
                report.total_resolved,
                report.pending_escalations()
            );
        }
    }

    fn print_lead_judge_activity(&self, report: &Report) {
        let activity = report.lead_judge_activity();
        println!("LJ commented on {} invalid issues", activity.commented_invalid);
        if let Some((number, ts)) = activity.latest {
            if let Some(at) = DateTime::from_timestamp(ts, 0) {
                println!(
                    "LJ last commented at {} on issue {}",
                    at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
                    number
                );
            }
        }
    }

    fn visible_findings<'a>(&self, report: &'a Report) -> Vec<&'a Finding> {
        let mut findings: Vec<&Finding> = report
            .findings
            .iter()
            .filter(|f| f.is_valid() || self.options.include_invalid)
            .collect();
        findings.sort_by(|a, b| {
            b.reward
                .total_cmp(&a.reward)
                .then(b.points.total_cmp(&a.points))
                .then_with(|| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
        });
        findings
    }

    fn header(&self) -> String {
        let mut header = format!(
            "{:<5} {:<w$} {:<7} {:>4} {:>10} {:>12} {:>5}",
            "#",
            "Title",
            "Sev",
            "Subs",
            "Points",
            "Reward",
            "Mine",
            w = self.title_width()
        );
        if self.options.escalations {
            header.push_str(&format!(" {:>5} {:>5}", "Esc", "Res"));
        }
        header
    }

    fn row(&self, finding: &Finding) -> String {
        let mut row = format!(
            "{:<5} {:<w$} {:<7} {:>4} {:>10.4} {:>12} {:>5}",
            finding.number,
            truncate(&finding.title, self.title_width()),
            finding.severity.label(),
            finding.submissions_count(),
            finding.points,
            format_usd(finding.reward),
            yesno(finding.mine),
            w = self.title_width()
        );
        if self.options.escalations {
            row.push_str(&format!(
                " {:>5} {:>5}",
                yesno(finding.escalated),
                yesno(finding.resolved)
            ));
        }
        if self.highlight && finding.mine {
            style_highlight(&row)
        } else {
            row
        }
    }

    fn invalid_escalations_header(&self) -> String {
        format!(
            "{:<5} {:<w$} {:>4} {:>5} {:>5} {:>5}",
            "#",
            "Title",
            "Subs",
            "Mine",
            "Esc",
            "Res",
            w = self.title_width()
        )
    }

    fn invalid_escalation_row(&self, report: &Report, issue: &Issue) -> String {
        format!(
            "{:<5} {:<w$} {:>4} {:>5} {:>5} {:>5}",
            issue.number,
            truncate(&issue.title, self.title_width()),
            report.family_size(issue),
            yesno(issue.is_submitted_by_user),
            yesno(issue.escalation.escalated),
            yesno(issue.escalation.resolved),
            w = self.title_width()
        )
    }

    fn print_invalid_escalations(&self, report: &Report) {
        let mut issues: Vec<&Issue> = report.invalid_escalated_issues();
        if issues.is_empty() {
            return;
        }
        issues.sort_by_key(|i| !i.escalation.resolved);

        print_header("Invalid issues (escalated)");
        let header = self.invalid_escalations_header();
        let divider = "-".repeat(header.len());
        println!("{}", header);
        println!("{}", divider);
        for issue in issues {
            println!("{}", self.invalid_escalation_row(report, issue));
        }
        println!("{}", divider);
    }
}

impl ReportRenderer for TableRenderer {
    fn render(&self, report: &Report) {
        println!();
        println!(
            "{}",
            style_dim(&Local::now().format("%d/%m/%Y - %H:%M:%S").to_string())
        );
        print_header(&format!(
            "{} {} - Findings",
            report.platform, report.contest_id
        ));

        self.print_totals(report);
        if self.options.comments {
            self.print_lead_judge_activity(report);
        }
        println!();

        let findings = self.visible_findings(report);
        if findings.is_empty() {
            print_info("No findings available to display.");
        } else {
            let header = self.header();
            let divider = "-".repeat(header.len());
            println!("{}", header);
            println!("{}", divider);
            for finding in findings {
                println!("{}", self.row(finding));
            }
            println!("{}", divider);
        }

        if self.options.escalations {
            self.print_invalid_escalations(report);
        }
    }
}
