//! Points and reward allocation
//!
//! Each report of a valid family earns `base * decay^(n - 1) / n` points,
//! where `n` is the number of reports in the family. The prize pool is then
//! split proportionally to points across every report.

use serde::{Deserialize, Serialize};

use crate::model::{IssueMap, Severity};

pub const SHERLOCK_HIGH_BASE: f64 = 5.0;
pub const SHERLOCK_MEDIUM_BASE: f64 = 1.0;
pub const SHERLOCK_DECAY: f64 = 0.9;

pub const CODE4RENA_HIGH_BASE: f64 = 10.0;
pub const CODE4RENA_MEDIUM_BASE: f64 = 3.0;
pub const CODE4RENA_DECAY: f64 = 0.85;

/// Platform constants for the shared points formula
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringParams {
    pub high_base: f64,
    pub medium_base: f64,
    /// Shrinks a family's total value per extra duplicate
    pub decay: f64,
}

impl ScoringParams {
    pub const fn sherlock() -> Self {
        Self {
            high_base: SHERLOCK_HIGH_BASE,
            medium_base: SHERLOCK_MEDIUM_BASE,
            decay: SHERLOCK_DECAY,
        }
    }

    pub const fn code4rena() -> Self {
        Self {
            high_base: CODE4RENA_HIGH_BASE,
            medium_base: CODE4RENA_MEDIUM_BASE,
            decay: CODE4RENA_DECAY,
        }
    }

    pub fn base_points(&self, severity: Severity) -> f64 {
        match severity {
            Severity::High => self.high_base,
            Severity::Medium => self.medium_base,
            Severity::Invalid | Severity::Unknown => 0.0,
        }
    }

    /// Points earned by each of `submissions_count` reports of a family
    pub fn calculate_points(&self, submissions_count: usize, severity: Severity) -> f64 {
        if submissions_count == 0 {
            return 0.0;
        }
        let base = self.base_points(severity);
        base * self.decay.powi(submissions_count as i32 - 1) / submissions_count as f64
    }
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self::sherlock()
    }
}

/// Sherlock points for one report
pub fn calculate_points(submissions_count: usize, severity: Severity) -> f64 {
    ScoringParams::sherlock().calculate_points(submissions_count, severity)
}

/// Assigns per-report points to every valid family and returns the total
/// awarded points, counting each report of a family.
pub fn assign_points(issues: &mut IssueMap, params: &ScoringParams) -> f64 {
    for issue in issues.values_mut() {
        issue.points = 0.0;
    }

    let families: Vec<(String, Vec<String>, usize, f64)> = issues
        .values()
        .filter(|i| i.is_main && i.is_valid())
        .map(|main| {
            let n = main.submissions_count();
            let points = params.calculate_points(n, main.severity);
            (main.id.clone(), main.duplicate_ids.clone(), n, points)
        })
        .collect();

    let mut total_points = 0.0;
    for (main_id, duplicate_ids, n, points) in families {
        if let Some(main) = issues.get_mut(&main_id) {
            main.points = points;
        }
        for id in &duplicate_ids {
            if let Some(dup) = issues.get_mut(id) {
                dup.points = points;
            }
        }
        // Unlisted duplicates still share the pool
        total_points += points * n as f64;
    }

    total_points
}

/// Splits the prize pool proportionally to points. Nothing is awarded when
/// there are no points or no pool.
pub fn assign_rewards(issues: &mut IssueMap, total_points: f64, prize_pool: f64) {
    let payable = total_points > 0.0 && prize_pool > 0.0;
    for issue in issues.values_mut() {
        issue.reward = if payable && issue.points > 0.0 {
            issue.points / total_points * prize_pool
        } else {
            0.0
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Issue;

    const EPS: f64 = 1e-9;

    fn family(issues: &mut IssueMap, main: &str, severity: Severity, dups: &[&str]) {
        let mut m = Issue::new(main, 0, main);
        m.is_main = true;
        m.severity = severity;
        for d in dups {
            m.add_duplicate(d);
            let mut dup = Issue::new(*d, 0, *d);
            dup.severity = severity;
            dup.duplicate_of = Some(main.to_string());
            issues.insert(d.to_string(), dup);
        }
        issues.insert(main.to_string(), m);
    }

    #[test]
    fn test_invalid_and_unknown_never_score() {
        for n in 1..10 {
            assert_eq!(calculate_points(n, Severity::Invalid), 0.0);
            assert_eq!(calculate_points(n, Severity::Unknown), 0.0);
        }
    }

    #[test]
    fn test_single_report_has_no_decay() {
        assert_eq!(calculate_points(1, Severity::High), 5.0);
        assert_eq!(calculate_points(1, Severity::Medium), 1.0);
    }

    #[test]
    fn test_zero_submissions_scores_zero() {
        assert_eq!(calculate_points(0, Severity::High), 0.0);
    }

    #[test]
    fn test_high_formula_and_monotonic_decrease() {
        let mut previous = f64::MAX;
        for n in 1..20usize {
            let expected = 5.0 * 0.9f64.powi(n as i32 - 1) / n as f64;
            let points = calculate_points(n, Severity::High);
            assert!((points - expected).abs() < EPS);
            if n >= 2 {
                assert!(points < previous);
            }
            previous = points;
        }
    }

    #[test]
    fn test_code4rena_params() {
        let params = ScoringParams::code4rena();
        assert_eq!(params.calculate_points(1, Severity::High), 10.0);
        let expected = 3.0 * 0.85 * 0.85 / 3.0;
        assert!((params.calculate_points(3, Severity::Medium) - expected).abs() < EPS);
    }

    #[test]
    fn test_assign_points_shares_value_across_family() {
        let mut issues = IssueMap::new();
        family(&mut issues, "1", Severity::High, &["2", "3"]);
        family(&mut issues, "4", Severity::Medium, &[]);
        family(&mut issues, "5", Severity::Invalid, &["6"]);

        let total = assign_points(&mut issues, &ScoringParams::sherlock());

        let high = 5.0 * 0.81 / 3.0;
        for id in ["1", "2", "3"] {
            assert!((issues[id].points - high).abs() < EPS);
        }
        assert_eq!(issues["4"].points, 1.0);
        assert_eq!(issues["5"].points, 0.0);
        assert_eq!(issues["6"].points, 0.0);
        assert!((total - (high * 3.0 + 1.0)).abs() < EPS);
    }

    #[test]
    fn test_zero_total_points_pays_nothing() {
        let mut issues = IssueMap::new();
        family(&mut issues, "1", Severity::Invalid, &["2"]);
        let total = assign_points(&mut issues, &ScoringParams::sherlock());
        assert_eq!(total, 0.0);
        assign_rewards(&mut issues, total, 10_000.0);
        assert!(issues.values().all(|i| i.reward == 0.0));
    }

    #[test]
    fn test_non_positive_pool_pays_nothing() {
        let mut issues = IssueMap::new();
        family(&mut issues, "1", Severity::High, &[]);
        let total = assign_points(&mut issues, &ScoringParams::sherlock());
        assign_rewards(&mut issues, total, 0.0);
        assert_eq!(issues["1"].reward, 0.0);
        assign_rewards(&mut issues, total, -5.0);
        assert_eq!(issues["1"].reward, 0.0);
    }

    #[test]
    fn test_rewards_conserve_prize_pool() {
        let mut issues = IssueMap::new();
        family(&mut issues, "1", Severity::High, &["2", "3", "4"]);
        family(&mut issues, "5", Severity::Medium, &["6"]);
        family(&mut issues, "7", Severity::High, &[]);
        family(&mut issues, "8", Severity::Invalid, &[]);

        let pool = 123_456.78;
        let total = assign_points(&mut issues, &ScoringParams::sherlock());
        assign_rewards(&mut issues, total, pool);

        let per_report_points: f64 = issues.values().map(|i| i.points).sum();
        assert!((per_report_points - total).abs() < EPS);

        let paid: f64 = issues.values().filter(|i| i.points > 0.0).map(|i| i.reward).sum();
        assert!((paid - pool).abs() < 1e-6);
    }
}
