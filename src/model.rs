//! Issue and finding records shared by every platform integration

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Judged severity of an issue family
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Severity {
    High,
    Medium,
    Invalid,
    #[default]
    Unknown,
}

impl Severity {
    /// Numeric platform codes: 1 = high, 2 = medium, 3 = invalid
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Severity::High,
            2 => Severity::Medium,
            3 => Severity::Invalid,
            _ => Severity::Unknown,
        }
    }

    /// Textual platform labels. Anything judged but not high/medium is invalid.
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        if label.is_empty() {
            return Severity::Unknown;
        }
        if let Ok(code) = label.parse::<i64>() {
            return Self::from_code(code);
        }
        match label.to_lowercase().as_str() {
            "high" => Severity::High,
            "medium" => Severity::Medium,
            _ => Severity::Invalid,
        }
    }

    pub fn is_valid(self) -> bool {
        matches!(self, Severity::High | Severity::Medium)
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Invalid => "Invalid",
            Severity::Unknown => "-",
        }
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::Number(n)) => n.as_i64().map_or(Severity::Unknown, Severity::from_code),
            Some(Value::String(s)) => Severity::from_label(&s),
            _ => Severity::Unknown,
        })
    }
}

/// Accepts ids sent either as JSON strings or integers
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Str(String),
        Int(i64),
        UInt(u64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Str(s) => s,
        RawId::Int(i) => i.to_string(),
        RawId::UInt(u) => u.to_string(),
    })
}

/// Treats an explicit `null` like a missing field
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Number and title of an issue as listed by the platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueTitle {
    #[serde(default, deserialize_with = "null_as_default")]
    pub number: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
}

pub type IssueTitles = BTreeMap<String, IssueTitle>;

/// A discussion comment. Fields beyond the ones the analyzer reads are kept as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub created_at: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_lead_judge: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

fn deserialize_optional_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Escalation {
    pub escalated: bool,
    /// Only meaningful when `escalated` is set
    pub resolved: bool,
}

impl Escalation {
    pub fn is_resolved(&self) -> bool {
        self.escalated && self.resolved
    }
}

/// One platform-reported vulnerability submission
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    pub id: String,
    pub number: u32,
    pub title: String,
    pub severity: Severity,
    pub is_main: bool,
    /// Id of the family's main issue when this is a duplicate
    pub duplicate_of: Option<String>,
    /// Ids of the duplicates grouped under this issue, in judging order
    pub duplicate_ids: Vec<String>,
    pub is_submitted_by_user: bool,
    pub escalation: Escalation,
    /// Family size reported by the platform when some duplicates are not listed
    pub reported_submissions: Option<usize>,
    pub points: f64,
    pub reward: f64,
    /// Ordered by ascending `created_at`
    pub comments: Vec<Comment>,
}

impl Issue {
    pub fn new(id: impl Into<String>, number: u32, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            number,
            title: title.into(),
            severity: Severity::Unknown,
            is_main: false,
            duplicate_of: None,
            duplicate_ids: Vec::new(),
            is_submitted_by_user: false,
            escalation: Escalation::default(),
            reported_submissions: None,
            points: 0.0,
            reward: 0.0,
            comments: Vec::new(),
        }
    }

    /// The main issue counts itself. Never less than the platform's own count.
    pub fn submissions_count(&self) -> usize {
        (1 + self.duplicate_ids.len()).max(self.reported_submissions.unwrap_or(0))
    }

    pub fn is_valid(&self) -> bool {
        self.severity.is_valid()
    }

    /// Records a duplicate id once. Returns false when it was already linked.
    pub fn add_duplicate(&mut self, id: &str) -> bool {
        if self.duplicate_ids.iter().any(|d| d == id) {
            return false;
        }
        self.duplicate_ids.push(id.to_string());
        true
    }

    pub fn attach_comments(&mut self, mut comments: Vec<Comment>) {
        comments.sort_by_key(|c| c.created_at);
        self.comments = comments;
    }

    pub fn lead_judge_comments(&self) -> impl Iterator<Item = &Comment> {
        self.comments.iter().filter(|c| c.is_lead_judge)
    }
}

/// Issues of one poll cycle, indexed by id
pub type IssueMap = BTreeMap<String, Issue>;

/// Builds a fresh generation of issues with every judging field at its default
pub fn issues_from_titles(titles: IssueTitles) -> IssueMap {
    titles
        .into_iter()
        .map(|(id, t)| {
            let issue = Issue::new(id.clone(), t.number, t.title);
            (id, issue)
        })
        .collect()
}

/// A duplicate family: the unit a prize is awarded to
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    pub main_id: String,
    pub number: u32,
    pub title: String,
    pub severity: Severity,
    pub duplicate_ids: Vec<String>,
    /// Reports in the family, including unlisted ones
    pub submissions: usize,
    /// Points earned by each report of the family
    pub points: f64,
    /// Reward earned by each report of the family
    pub reward: f64,
    pub mine: bool,
    pub escalated: bool,
    pub resolved: bool,
}

impl Finding {
    pub fn from_main(main: &Issue, issues: &IssueMap) -> Self {
        let members: Vec<&Issue> = std::iter::once(main)
            .chain(main.duplicate_ids.iter().filter_map(|id| issues.get(id)))
            .collect();

        let mine = members.iter().any(|i| i.is_submitted_by_user);
        let escalated = members.iter().any(|i| i.escalation.escalated);
        let resolved = escalated
            && members
                .iter()
                .filter(|i| i.escalation.escalated)
                .all(|i| i.escalation.resolved);

        Self {
            main_id: main.id.clone(),
            number: main.number,
            title: main.title.clone(),
            severity: main.severity,
            duplicate_ids: main.duplicate_ids.clone(),
            submissions: main.submissions_count(),
            points: main.points,
            reward: main.reward,
            mine,
            escalated,
            resolved,
        }
    }

    pub fn submissions_count(&self) -> usize {
        self.submissions
    }

    pub fn is_valid(&self) -> bool {
        self.severity.is_valid()
    }

    /// Combined reward of every report in the family
    pub fn total_reward(&self) -> f64 {
        self.reward * self.submissions_count() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_codes() {
        assert_eq!(Severity::from_code(1), Severity::High);
        assert_eq!(Severity::from_code(2), Severity::Medium);
        assert_eq!(Severity::from_code(3), Severity::Invalid);
        assert_eq!(Severity::from_code(0), Severity::Unknown);
        assert_eq!(Severity::from_code(7), Severity::Unknown);
    }

    #[test]
    fn test_severity_labels() {
        assert_eq!(Severity::from_label("high"), Severity::High);
        assert_eq!(Severity::from_label(" Medium "), Severity::Medium);
        assert_eq!(Severity::from_label("qa"), Severity::Invalid);
        assert_eq!(Severity::from_label(""), Severity::Unknown);
        assert_eq!(Severity::from_label("2"), Severity::Medium);
    }

    #[test]
    fn test_severity_deserialize_mixed_shapes() -> Result<(), serde_json::Error> {
        let parsed: Vec<Severity> = serde_json::from_str(r#"[1, "medium", 3, null, "low", 9]"#)?;
        assert_eq!(
            parsed,
            vec![
                Severity::High,
                Severity::Medium,
                Severity::Invalid,
                Severity::Unknown,
                Severity::Invalid,
                Severity::Unknown,
            ]
        );
        Ok(())
    }

    #[test]
    fn test_comment_keeps_unknown_fields() -> Result<(), serde_json::Error> {
        let json = r#"{"id": 17, "created_at": 1700000000, "is_lead_judge": true, "body": "Valid"}"#;
        let comment: Comment = serde_json::from_str(json)?;
        assert_eq!(comment.id, "17");
        assert!(comment.is_lead_judge);
        assert_eq!(comment.extra.get("body"), Some(&Value::from("Valid")));
        Ok(())
    }

    #[test]
    fn test_comment_null_fields_default() -> Result<(), serde_json::Error> {
        let comment: Comment =
            serde_json::from_str(r#"{"id": "a", "created_at": null, "is_lead_judge": null}"#)?;
        assert_eq!(comment.created_at, 0);
        assert!(!comment.is_lead_judge);
        Ok(())
    }

    #[test]
    fn test_attach_comments_sorts_by_creation() {
        let mut issue = Issue::new("1", 1, "Bug");
        let comment = |id: &str, ts: i64| Comment {
            id: id.to_string(),
            created_at: ts,
            is_lead_judge: false,
            extra: Default::default(),
        };
        issue.attach_comments(vec![comment("b", 20), comment("a", 10), comment("c", 30)]);
        let ids: Vec<&str> = issue.comments.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_add_duplicate_is_idempotent() {
        let mut issue = Issue::new("1", 1, "Bug");
        assert!(issue.add_duplicate("2"));
        assert!(!issue.add_duplicate("2"));
        assert_eq!(issue.submissions_count(), 2);
    }

    #[test]
    fn test_finding_resolution_requires_every_escalation_resolved() {
        let mut issues = IssueMap::new();
        let mut main = Issue::new("1", 1, "Bug");
        main.is_main = true;
        main.escalation = Escalation {
            escalated: true,
            resolved: true,
        };
        main.add_duplicate("2");
        main.add_duplicate("3");
        let mut dup = Issue::new("2", 2, "Bug dup");
        dup.escalation = Escalation {
            escalated: true,
            resolved: false,
        };
        let quiet = Issue::new("3", 3, "Bug dup 2");
        issues.insert("2".into(), dup);
        issues.insert("3".into(), quiet);

        let finding = Finding::from_main(&main, &issues);
        assert!(finding.escalated);
        assert!(!finding.resolved);

        issues.get_mut("2").unwrap().escalation.resolved = true;
        let finding = Finding::from_main(&main, &issues);
        assert!(finding.resolved);
    }

    #[test]
    fn test_finding_without_escalation_is_not_resolved() {
        let mut main = Issue::new("1", 1, "Bug");
        main.escalation.resolved = true;
        let finding = Finding::from_main(&main, &IssueMap::new());
        assert!(!finding.escalated);
        assert!(!finding.resolved);
    }

    #[test]
    fn test_finding_mine_from_duplicate() {
        let mut main = Issue::new("1", 1, "Bug");
        main.add_duplicate("2");
        let mut dup = Issue::new("2", 2, "Bug dup");
        dup.is_submitted_by_user = true;
        let mut issues = IssueMap::new();
        issues.insert("2".into(), dup);
        assert!(Finding::from_main(&main, &issues).mine);
    }
}
