//! Code4rena command

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use contest_analyzer::{Code4renaClient, CycleOptions, Environment, Monitor};

use super::{load_config, poll_interval, retry_policy, telegram};
use crate::render::{RenderOptions, TableRenderer};
use crate::style::*;

pub struct Code4renaArgs {
    pub contest_id: String,
    pub prize_pool: Option<f64>,
    pub user: Option<String>,
    pub timeout: Option<u64>,
    pub include_invalid: bool,
    pub max_title: usize,
    pub highlight_mine: bool,
}

pub async fn run(
    env: &Environment,
    config_path: Option<&Path>,
    args: Code4renaArgs,
) -> Result<()> {
    let config = load_config(config_path)?;
    let session = env
        .code4rena_session()
        .context("A Code4rena session cookie is required")?;

    let handle = args.user.or_else(|| env.code4rena_handle.clone());
    if handle.is_none() {
        print_warning("No Code4rena handle given (--user or CODE4RENA_HANDLE), ownership is unknown");
    }
    if args.prize_pool.is_none() {
        print_warning("No --prize-pool given, rewards are reported as $0");
    }

    let client = Code4renaClient::new(
        &args.contest_id,
        session,
        handle,
        &config.code4rena,
        &config.http,
    )
    .context("Failed to create Code4rena client")?;

    let interval = poll_interval(args.timeout);
    print_info(&format!(
        "Analyzing Code4rena contest {}{}",
        args.contest_id,
        client
            .handle()
            .map(|h| format!(" as {}", h))
            .unwrap_or_default()
    ));

    let renderer = TableRenderer::new(RenderOptions {
        include_invalid: args.include_invalid,
        highlight_mine: args.highlight_mine,
        title_width: args.max_title,
        ..Default::default()
    });

    let mut monitor = Monitor::new(Arc::new(client), Arc::new(renderer), Arc::new(telegram(env)))
        .with_scoring(config.code4rena.scoring())
        .with_options(CycleOptions {
            include_comments: false,
            prize_pool_override: Some(args.prize_pool.unwrap_or(0.0)),
        })
        .with_policy(retry_policy(&config, &config.code4rena, interval))
        .with_interval(interval);

    monitor
        .run()
        .await
        .with_context(|| format!("Code4rena contest {} monitoring stopped", args.contest_id))
}
