//! Seams between the refresh loop and its collaborators

use async_trait::async_trait;

use crate::error::Result;
use crate::judging::Family;
use crate::model::{Comment, Issue, IssueTitles};
use crate::report::{JudgingProgress, Report};

/// A contest platform the analyzer can poll
#[async_trait]
pub trait ContestSource: Send + Sync {
    /// Label used in logs and notifications, e.g. "Sherlock"
    fn platform(&self) -> &str;

    fn contest_id(&self) -> &str;

    async fn fetch_issue_titles(&self) -> Result<IssueTitles>;

    async fn fetch_judging(&self) -> Result<Vec<Family>>;

    async fn fetch_prize_pool(&self) -> Result<f64>;

    async fn fetch_comments(&self, issue_id: &str) -> Result<Vec<Comment>>;

    /// Submission counters from the last `fetch_judging`, if the platform has them
    fn judging_progress(&self) -> Option<JudgingProgress> {
        None
    }
}

/// Receives the one-line summary of a changed report
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Best effort: failures are handled by the implementation
    async fn notify(&self, text: &str);
}

/// Turns a report into user-facing output
pub trait ReportRenderer: Send + Sync {
    fn render(&self, report: &Report);
}

/// Progress of the per-issue comment fetch
pub trait ProgressObserver: Send + Sync {
    /// Called after comments for `issue` were fetched; `done` counts from 1
    fn on_comments_fetched(&self, issue: &Issue, done: usize, total: usize);

    fn on_comments_finished(&self, _total: usize) {}
}

/// Observer for callers that don't display progress
pub struct SilentProgress;

impl ProgressObserver for SilentProgress {
    fn on_comments_fetched(&self, _issue: &Issue, _done: usize, _total: usize) {}
}
