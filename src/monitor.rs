//! Refresh loop
//!
//! A cycle fetches titles and judging, applies judging details, optionally
//! attaches comments, scores, and builds a [`Report`]. The [`Monitor`]
//! compares each report's fingerprint with the previous one and only
//! renders and notifies on change. Failed cycles are retried up to
//! `max_retries` consecutive times.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::error::{error_chain, AnalyzerError, Result};
use crate::judging::apply_judging_details;
use crate::model::{issues_from_titles, IssueMap};
use crate::report::Report;
use crate::scoring::{assign_points, assign_rewards, ScoringParams};
use crate::snapshot::{compute_fingerprint, ReportSnapshot};
use crate::source::{ContestSource, Notifier, ProgressObserver, ReportRenderer, SilentProgress};

/// What a single cycle fetches
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CycleOptions {
    /// One request per issue, sequentially
    pub include_comments: bool,
    /// Used instead of the platform's prize pool when set
    pub prize_pool_override: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            retry_delay: Duration::from_secs(5),
        }
    }
}

/// Fetches, applies, and scores one generation of issues
pub async fn run_one_cycle(
    source: &dyn ContestSource,
    scoring: &ScoringParams,
    options: &CycleOptions,
    progress: &dyn ProgressObserver,
) -> Result<Report> {
    let titles = source.fetch_issue_titles().await?;
    let mut issues = issues_from_titles(titles);

    let families = source.fetch_judging().await?;
    apply_judging_details(&mut issues, &families)?;
    let judging = source.judging_progress();

    if options.include_comments {
        attach_comments(source, &mut issues, progress).await?;
    }

    let prize_pool = match options.prize_pool_override {
        Some(pool) => pool.max(0.0),
        None => source.fetch_prize_pool().await?,
    };

    let total_points = assign_points(&mut issues, scoring);
    assign_rewards(&mut issues, total_points, prize_pool);

    Ok(Report::build(
        source.platform(),
        source.contest_id(),
        issues,
        prize_pool,
        total_points,
    )
    .with_judging(judging))
}

async fn attach_comments(
    source: &dyn ContestSource,
    issues: &mut IssueMap,
    progress: &dyn ProgressObserver,
) -> Result<()> {
    let total = issues.len();
    for (idx, issue) in issues.values_mut().enumerate() {
        let comments = source.fetch_comments(&issue.id).await?;
        issue.attach_comments(comments);
        progress.on_comments_fetched(issue, idx + 1, total);
    }
    progress.on_comments_finished(total);
    Ok(())
}

/// Drives cycles and gates rendering and notification on change
pub struct Monitor {
    source: Arc<dyn ContestSource>,
    renderer: Arc<dyn ReportRenderer>,
    notifier: Arc<dyn Notifier>,
    progress: Arc<dyn ProgressObserver>,
    scoring: ScoringParams,
    options: CycleOptions,
    policy: RetryPolicy,
    /// Sleep between successful cycles; `None` runs a single cycle
    interval: Option<Duration>,
    last_snapshot: Option<ReportSnapshot>,
    error_count: u32,
}

impl Monitor {
    pub fn new(
        source: Arc<dyn ContestSource>,
        renderer: Arc<dyn ReportRenderer>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            source,
            renderer,
            notifier,
            progress: Arc::new(SilentProgress),
            scoring: ScoringParams::default(),
            options: CycleOptions::default(),
            policy: RetryPolicy::default(),
            interval: None,
            last_snapshot: None,
            error_count: 0,
        }
    }

    pub fn with_scoring(mut self, scoring: ScoringParams) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn with_options(mut self, options: CycleOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_interval(mut self, interval: Option<Duration>) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressObserver>) -> Self {
        self.progress = progress;
        self
    }

    pub fn last_snapshot(&self) -> Option<&ReportSnapshot> {
        self.last_snapshot.as_ref()
    }

    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    /// Runs one cycle and renders/notifies if the report changed.
    /// Returns whether it did.
    pub async fn poll(&mut self) -> Result<bool> {
        let report = run_one_cycle(
            self.source.as_ref(),
            &self.scoring,
            &self.options,
            self.progress.as_ref(),
        )
        .await?;
        let snapshot = compute_fingerprint(&report);

        if self.last_snapshot.as_ref() == Some(&snapshot) {
            debug!("No changes since last refresh");
            return Ok(false);
        }

        if let Some(previous) = &self.last_snapshot {
            info!("Changed issues: {:?}", snapshot.changed_issue_ids(previous));
        }

        self.renderer.render(&report);
        self.notifier.notify(&report.summary()).await;
        self.last_snapshot = Some(snapshot);
        Ok(true)
    }

    /// Polls until done: once without an interval, forever otherwise.
    /// Gives up after `max_retries` consecutive failed cycles.
    pub async fn run(&mut self) -> Result<()> {
        let prefix = self.source.platform().to_lowercase();
        loop {
            match self.poll().await {
                Ok(_) => {
                    self.error_count = 0;
                    let Some(interval) = self.interval else {
                        return Ok(());
                    };
                    tokio::time::sleep(interval).await;
                }
                Err(e) => {
                    self.error_count += 1;
                    error!(
                        "[{}] error while refreshing data ({}/{}): {}",
                        prefix,
                        self.error_count,
                        self.policy.max_retries,
                        error_chain(&e)
                    );
                    if self.error_count >= self.policy.max_retries {
                        return Err(AnalyzerError::RetriesExhausted {
                            attempts: self.error_count,
                            last: Box::new(e),
                        });
                    }
                    tokio::time::sleep(self.policy.retry_delay).await;
                }
            }
        }
    }
}
