//! Code4rena API client
//!
//! Code4rena lists submissions rather than judged families. Submissions
//! sharing a finding are grouped into one family whose main issue is the
//! primary submission, so both platforms feed the same scoring engine.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::{HttpConfig, PlatformConfig};
use crate::error::{ConfigError, Result};
use crate::http::JsonClient;
use crate::judging::{Family, FamilyMember};
use crate::model::{null_as_default, Comment, IssueTitle, IssueTitles, Severity};
use crate::report::JudgingProgress;
use crate::source::ContestSource;

pub const PLATFORM: &str = "Code4rena";

/// Largest page size the submissions endpoint accepts
const PER_PAGE: u32 = 100;
const MAX_PAGES: u32 = 200;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmissionUser {
    #[serde(default)]
    pub handle: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmissionFinding {
    #[serde(default)]
    pub uid: Option<String>,
    /// Reports grouped under the finding, including ones hidden from the caller
    #[serde(default)]
    pub duplicates: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestEvaluations {
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub validity: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub uid: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub number: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    /// Severity claimed by the warden
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub deleted_at: Option<String>,
    #[serde(default)]
    pub user: Option<SubmissionUser>,
    #[serde(default)]
    pub finding: Option<SubmissionFinding>,
    #[serde(default)]
    pub latest_evaluations: Option<LatestEvaluations>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub evaluations: Vec<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_primary: bool,
}

impl Submission {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Submissions without a finding stand alone
    pub fn finding_key(&self) -> &str {
        self.finding
            .as_ref()
            .and_then(|f| f.uid.as_deref())
            .unwrap_or(&self.uid)
    }

    /// Family size reported by the platform, when known
    pub fn finding_duplicates(&self) -> Option<usize> {
        self.finding
            .as_ref()
            .and_then(|f| f.duplicates)
            .filter(|n| *n > 0)
    }

    pub fn is_judged(&self) -> bool {
        !self.evaluations.is_empty() || self.judged_severity() != Severity::Unknown
    }

    pub fn is_by(&self, handle: &str) -> bool {
        self.user
            .as_ref()
            .and_then(|u| u.handle.as_deref())
            .is_some_and(|h| h.trim().eq_ignore_ascii_case(handle.trim()))
    }

    /// Judged severity: unjudged is unknown, anything not validated is invalid
    pub fn judged_severity(&self) -> Severity {
        let Some(latest) = &self.latest_evaluations else {
            return Severity::Unknown;
        };
        let validity = latest
            .validity
            .as_deref()
            .map(|v| v.trim().to_lowercase())
            .unwrap_or_default();

        match validity.as_str() {
            "" => Severity::Unknown,
            "valid" => {
                let label = latest
                    .severity
                    .as_deref()
                    .filter(|s| !s.trim().is_empty())
                    .or(self.severity.as_deref())
                    .unwrap_or_default();
                Severity::from_label(label)
            }
            _ => Severity::Invalid,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SubmissionsData {
    #[serde(default, deserialize_with = "null_as_default")]
    submissions: Vec<Submission>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Pagination {
    #[serde(default)]
    next_page: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct SubmissionsPage {
    #[serde(default, deserialize_with = "null_as_default")]
    data: SubmissionsData,
    #[serde(default, deserialize_with = "null_as_default")]
    pagination: Pagination,
}

impl SubmissionsPage {
    fn has_next(&self) -> bool {
        !matches!(
            self.pagination.next_page,
            None | Some(Value::Null) | Some(Value::Bool(false))
        )
    }
}

pub fn titles_from_submissions(submissions: &[Submission]) -> IssueTitles {
    submissions
        .iter()
        .filter(|s| !s.is_deleted())
        .map(|s| {
            (
                s.uid.clone(),
                IssueTitle {
                    number: s.number,
                    title: s.title.clone(),
                },
            )
        })
        .collect()
}

/// Groups submissions by finding. Groups without a visible primary are dropped.
pub fn families_from_submissions(submissions: &[Submission], handle: Option<&str>) -> Vec<Family> {
    let mut groups: BTreeMap<&str, Vec<&Submission>> = BTreeMap::new();
    for sub in submissions.iter().filter(|s| !s.is_deleted()) {
        groups.entry(sub.finding_key()).or_default().push(sub);
    }

    let member = |sub: &Submission| FamilyMember {
        was_submitted_by_user: handle.is_some_and(|h| sub.is_by(h)),
        ..FamilyMember::new(sub.uid.clone())
    };

    groups
        .into_iter()
        .filter_map(|(key, subs)| {
            let Some(primary) = subs.iter().find(|s| s.is_primary) else {
                debug!("Finding {} has no primary submission, skipping", key);
                return None;
            };
            Some(Family {
                main: member(*primary),
                primary_severity: primary.judged_severity(),
                duplicates: subs
                    .iter()
                    .filter(|s| s.uid != primary.uid)
                    .map(|s| member(*s))
                    .collect(),
                submissions_count: primary.finding_duplicates(),
            })
        })
        .collect()
}

/// Submission and judging counters over every non-deleted submission
pub fn judging_progress(submissions: &[Submission], handle: Option<&str>) -> JudgingProgress {
    let visible: Vec<&Submission> = submissions.iter().filter(|s| !s.is_deleted()).collect();
    let mine: Vec<&&Submission> = match handle {
        Some(h) => visible.iter().filter(|s| s.is_by(h)).collect(),
        None => Vec::new(),
    };

    JudgingProgress {
        total_submissions: visible.len(),
        total_primary: visible.iter().filter(|s| s.is_primary).count(),
        total_judged: visible.iter().filter(|s| s.is_judged()).count(),
        my_total_submissions: mine.len(),
        my_primary_submissions: mine.iter().filter(|s| s.is_primary).count(),
        handle: handle.map(str::to_string),
    }
}

pub struct Code4renaClient {
    http: JsonClient,
    base_url: String,
    contest_id: String,
    handle: Option<String>,
    /// Submissions fetched for the titles view, reused by the judging view of the same cycle
    cached: Mutex<Option<Vec<Submission>>>,
    progress: Mutex<Option<JudgingProgress>>,
}

impl Code4renaClient {
    pub fn new(
        contest_id: impl Into<String>,
        session: &str,
        handle: Option<String>,
        platform: &PlatformConfig,
        http: &HttpConfig,
    ) -> std::result::Result<Self, ConfigError> {
        let cookie = format!("C4AUTH-LOGIN={};", session);
        Ok(Self {
            http: JsonClient::new(http, Some(&cookie))?,
            base_url: platform.base_url.trim_end_matches('/').to_string(),
            contest_id: contest_id.into(),
            handle: handle.filter(|h| !h.trim().is_empty()),
            cached: Mutex::new(None),
            progress: Mutex::new(None),
        })
    }

    pub fn handle(&self) -> Option<&str> {
        self.handle.as_deref()
    }

    fn submissions_url(&self, page: u32) -> String {
        format!(
            "{}/audits/{}/submissions?perPage={}&page={}",
            self.base_url,
            urlencoding::encode(&self.contest_id),
            PER_PAGE,
            page
        )
    }

    pub async fn fetch_submissions(&self) -> Result<Vec<Submission>> {
        let mut all = Vec::new();
        for page in 1..=MAX_PAGES {
            let resp: SubmissionsPage = self.http.get_json(&self.submissions_url(page)).await?;
            let has_next = resp.has_next();
            debug!("Page {}: fetched {} submissions", page, resp.data.submissions.len());
            all.extend(resp.data.submissions);
            if !has_next {
                info!("Fetched {} submissions", all.len());
                return Ok(all);
            }
        }
        warn!("Stopped after {} submission pages", MAX_PAGES);
        Ok(all)
    }
}

#[async_trait]
impl ContestSource for Code4renaClient {
    fn platform(&self) -> &str {
        PLATFORM
    }

    fn contest_id(&self) -> &str {
        &self.contest_id
    }

    async fn fetch_issue_titles(&self) -> Result<IssueTitles> {
        let submissions = self.fetch_submissions().await?;
        let titles = titles_from_submissions(&submissions);
        *self.cached.lock() = Some(submissions);
        Ok(titles)
    }

    async fn fetch_judging(&self) -> Result<Vec<Family>> {
        let cached = self.cached.lock().take();
        let submissions = match cached {
            Some(subs) => subs,
            None => self.fetch_submissions().await?,
        };
        *self.progress.lock() = Some(judging_progress(&submissions, self.handle()));
        Ok(families_from_submissions(&submissions, self.handle()))
    }

    fn judging_progress(&self) -> Option<JudgingProgress> {
        self.progress.lock().clone()
    }

    /// Code4rena does not publish the HM pool; it is supplied on the command line
    async fn fetch_prize_pool(&self) -> Result<f64> {
        Ok(0.0)
    }

    async fn fetch_comments(&self, _issue_id: &str) -> Result<Vec<Comment>> {
        Ok(Vec::new())
    }
}
