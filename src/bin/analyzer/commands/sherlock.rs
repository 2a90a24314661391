//! Sherlock command

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use contest_analyzer::{CycleOptions, Environment, Monitor, ProgressObserver, SherlockClient};

use super::{load_config, poll_interval, retry_policy, telegram};
use crate::progress::CommentProgress;
use crate::render::{RenderOptions, TableRenderer};
use crate::style::*;

pub struct SherlockArgs {
    pub contest_id: u64,
    pub escalations: bool,
    pub comments: bool,
    pub timeout: Option<u64>,
    pub prize_pool: Option<f64>,
    pub highlight_mine: bool,
}

pub async fn run(
    env: &Environment,
    config_path: Option<&Path>,
    args: SherlockArgs,
) -> Result<()> {
    let config = load_config(config_path)?;
    let session = env
        .sherlock_session()
        .context("A Sherlock session cookie is required")?;

    let contest_id = args.contest_id.to_string();
    let client = SherlockClient::new(&contest_id, session, &config.sherlock, &config.http)
        .context("Failed to create Sherlock client")?;

    let interval = poll_interval(args.timeout);
    print_info(&format!(
        "Analyzing Sherlock contest {} ({})",
        contest_id,
        match interval {
            Some(i) => format!("refreshing every {}s", i.as_secs()),
            None => "single run".to_string(),
        }
    ));

    let renderer = TableRenderer::new(RenderOptions {
        escalations: args.escalations,
        comments: args.comments,
        highlight_mine: args.highlight_mine,
        title_width: 73,
        ..Default::default()
    });
    let progress: Arc<dyn ProgressObserver> = Arc::new(CommentProgress::default());

    let mut monitor = Monitor::new(Arc::new(client), Arc::new(renderer), Arc::new(telegram(env)))
        .with_scoring(config.sherlock.scoring())
        .with_options(CycleOptions {
            include_comments: args.comments,
            prize_pool_override: args.prize_pool,
        })
        .with_policy(retry_policy(&config, &config.sherlock, interval))
        .with_interval(interval)
        .with_progress(progress);

    monitor
        .run()
        .await
        .with_context(|| format!("Sherlock contest {} monitoring stopped", contest_id))
}
