//! Contest Analyzer - Track judged audit-contest findings and estimate rewards
//!
//! Polls an audit-contest platform (Sherlock or Code4rena) for judged
//! submissions, splits the prize pool across them and reports whenever the
//! estimate changes.
//!
//! # How it works
//!
//! 1. Issue titles are fetched and a fresh issue per submission is created
//! 2. Judging families (a main issue plus its duplicates) are applied: severity,
//!    ownership, escalation state and duplicate links
//! 3. Each report of a valid family earns `base * decay^(n-1) / n` points
//! 4. The prize pool is split proportionally to points
//! 5. The report's fingerprint is compared with the previous poll; only a
//!    change is rendered and pushed as a notification
//!
//! # Scoring
//!
//! - Sherlock: high = 5, medium = 1, decay 0.9
//! - Code4rena: high = 10, medium = 3, decay 0.85
//! - Invalid and unjudged issues never earn points

pub mod code4rena;
pub mod config;
pub mod error;
pub mod http;
pub mod judging;
pub mod model;
pub mod monitor;
pub mod report;
pub mod scoring;
pub mod sherlock;
pub mod snapshot;
pub mod source;
pub mod telegram;

pub use code4rena::Code4renaClient;
pub use config::{Config, Environment};
pub use error::{error_chain, AnalyzerError, ConfigError, FetchError, Result};
pub use judging::{apply_judging_details, extract_families, Family, FamilyMember};
pub use model::{Comment, Escalation, Finding, Issue, IssueMap, IssueTitle, IssueTitles, Severity};
pub use monitor::{run_one_cycle, CycleOptions, Monitor, RetryPolicy};
pub use report::{format_amount, JudgingProgress, Report};
pub use scoring::{assign_points, assign_rewards, calculate_points, ScoringParams};
pub use sherlock::SherlockClient;
pub use snapshot::{compute_fingerprint, ReportSnapshot};
pub use source::{ContestSource, Notifier, ProgressObserver, ReportRenderer};
pub use telegram::TelegramNotifier;
