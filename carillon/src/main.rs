/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};

use carillon::config::{BuiltTimer, TimerConfig};
use carillon::display::RenderSink;
use carillon::timer::{runner, RotateTimer};

// ── CLI argument definition ───────────────────────────────────────────────────

/// Carillon rotation-timer driver.
///
/// Example:
///   carillon --config carillon/demos/timers.yaml
#[derive(Debug, Parser)]
#[command(
    name = "carillon",
    about = "Carillon – dual-calendar rotation timers",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML timer-definition file.
    #[arg(short = 'c', long = "config")]
    config: PathBuf,

    /// Validate the configuration and exit without running any timer.
    #[arg(long = "check", default_value_t = false)]
    check: bool,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    info!(config = %cli.config.display(), check = cli.check, "carillon starting");

    // ── Load and validate timer definitions ───────────────────────────────────
    let config = match TimerConfig::load_from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("failed to load timer configuration: {:#}", e);
            process::exit(1);
        }
    };
    if config.is_empty() {
        error!("configuration defines no timers");
        process::exit(1);
    }

    let built = match config.build_all() {
        Ok(built) => built,
        Err((name, err)) => {
            error!(timer = %name, %err, "invalid timer definition");
            process::exit(1);
        }
    };
    info!(timers = built.len(), "all timer definitions valid");

    if cli.check {
        return;
    }

    // ── Spawn a runner per timer and attach its displays ──────────────────────
    let mut tasks = Vec::with_capacity(built.len());
    let mut sinks = Vec::new();
    for timer in built {
        let BuiltTimer {
            name,
            plan,
            displays,
            sink,
        } = timer;
        let (handle, task) = runner::spawn(RotateTimer::new(plan));
        for display in displays {
            handle.attach(display);
        }
        info!(timer = %name, "timer running");
        sinks.push((name, sink));
        tasks.push((handle, task));
    }

    // Echo sink-backed renderings as they change, until ctrl-c.
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
        }
        () = echo_sinks(sinks) => {}
    }

    // Dropping the handles lets each task end once it goes dormant; the
    // displays stay attached, so just stop waiting and exit.
    drop(tasks);
}

/// Log every sink's rendering whenever it changes.  Runs forever.
async fn echo_sinks(sinks: Vec<(String, RenderSink)>) {
    let mut last: Vec<Vec<String>> = vec![Vec::new(); sinks.len()];
    let mut tick = tokio::time::interval(Duration::from_millis(500));
    loop {
        tick.tick().await;
        for (i, (name, sink)) in sinks.iter().enumerate() {
            let lines = match sink.lock() {
                Ok(lines) => lines.clone(),
                Err(_) => continue,
            };
            if lines != last[i] {
                for line in &lines {
                    info!(timer = %name, "{line}");
                }
                last[i] = lines;
            }
        }
    }
}
