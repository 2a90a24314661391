//! Sherlock API client
//!
//! Authenticates with the `session` cookie copied from a logged-in browser
//! (SESSION_SHERLOCK).

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::{HttpConfig, PlatformConfig};
use crate::error::{AnalyzerError, ConfigError, FetchError, Result};
use crate::http::JsonClient;
use crate::judging::{extract_families, Family};
use crate::model::{null_as_default, Comment, IssueTitles};
use crate::source::ContestSource;

pub const PLATFORM: &str = "Sherlock";

#[derive(Debug, Deserialize)]
struct Discussion {
    #[serde(default, deserialize_with = "null_as_default")]
    comments: Vec<Comment>,
}

#[derive(Debug, Deserialize)]
struct Contest {
    #[serde(default, deserialize_with = "null_as_default")]
    prize_pool: f64,
}

pub struct SherlockClient {
    http: JsonClient,
    base_url: String,
    contest_id: String,
}

impl SherlockClient {
    pub fn new(
        contest_id: impl Into<String>,
        session: &str,
        platform: &PlatformConfig,
        http: &HttpConfig,
    ) -> std::result::Result<Self, ConfigError> {
        let cookie = format!("session={};", session);
        Ok(Self {
            http: JsonClient::new(http, Some(&cookie))?,
            base_url: platform.base_url.trim_end_matches('/').to_string(),
            contest_id: contest_id.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn titles_url(&self) -> String {
        self.url(&format!("contest/{}/issue_titles", self.contest_id))
    }

    fn judge_url(&self) -> String {
        self.url(&format!("judge/{}", self.contest_id))
    }

    fn discussion_url(&self, issue_id: &str) -> String {
        self.url(&format!("issue/{}/discussion", urlencoding::encode(issue_id)))
    }

    fn contest_url(&self) -> String {
        self.url(&format!("contests/{}", self.contest_id))
    }
}

#[async_trait]
impl ContestSource for SherlockClient {
    fn platform(&self) -> &str {
        PLATFORM
    }

    fn contest_id(&self) -> &str {
        &self.contest_id
    }

    async fn fetch_issue_titles(&self) -> Result<IssueTitles> {
        let titles: IssueTitles = self.http.get_json(&self.titles_url()).await?;
        debug!("Fetched {} issue titles", titles.len());
        Ok(titles)
    }

    async fn fetch_judging(&self) -> Result<Vec<Family>> {
        let url = self.judge_url();
        let payload: Value = self.http.get_json(&url).await?;
        let families = extract_families(payload)
            .map_err(|source| AnalyzerError::from(FetchError::Decode { url, source }))?;
        info!("Fetched {} judged families", families.len());
        Ok(families)
    }

    async fn fetch_prize_pool(&self) -> Result<f64> {
        let contest: Contest = self.http.get_json(&self.contest_url()).await?;
        Ok(contest.prize_pool.max(0.0))
    }

    async fn fetch_comments(&self, issue_id: &str) -> Result<Vec<Comment>> {
        let discussion: Discussion = self.http.get_json(&self.discussion_url(issue_id)).await?;
        Ok(discussion.comments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> SherlockClient {
        let platform = PlatformConfig {
            base_url: base_url.to_string(),
            ..PlatformConfig::sherlock()
        };
        SherlockClient::new("123", "abc", &platform, &HttpConfig::default()).unwrap()
    }

    #[test]
    fn test_urls() {
        let c = client("https://audits.sherlock.xyz/api/");
        assert_eq!(
            c.titles_url(),
            "https://audits.sherlock.xyz/api/contest/123/issue_titles"
        );
        assert_eq!(c.judge_url(), "https://audits.sherlock.xyz/api/judge/123");
        assert_eq!(
            c.discussion_url("77"),
            "https://audits.sherlock.xyz/api/issue/77/discussion"
        );
        assert_eq!(c.contest_url(), "https://audits.sherlock.xyz/api/contests/123");
    }

    #[test]
    fn test_parse_titles() {
        let json = r#"{"101": {"number": 1, "title": "Reentrancy"}, "102": {"number": 2, "title": null}}"#;
        let titles: IssueTitles = serde_json::from_str(json).unwrap();
        assert_eq!(titles["101"].number, 1);
        assert_eq!(titles["101"].title, "Reentrancy");
        assert_eq!(titles["102"].title, "");
    }

    #[test]
    fn test_parse_discussion() {
        let json = r#"{"comments": [
            {"id": 5, "created_at": 1700000100, "is_lead_judge": true, "body": "Valid"},
            {"id": 4, "created_at": 1700000000, "is_lead_judge": false}
        ]}"#;
        let discussion: Discussion = serde_json::from_str(json).unwrap();
        assert_eq!(discussion.comments.len(), 2);
        assert!(discussion.comments[0].is_lead_judge);
    }

    #[test]
    fn test_parse_contest_without_pool() {
        let contest: Contest = serde_json::from_str(r#"{"prize_pool": null}"#).unwrap();
        assert_eq!(contest.prize_pool, 0.0);
        let contest: Contest = serde_json::from_str(r#"{"prize_pool": 50000}"#).unwrap();
        assert_eq!(contest.prize_pool, 50000.0);
    }
}
