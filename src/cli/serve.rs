//! Long-running mode: events in on stdin, job reports out on stdout.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use helmsman::bus::{InboundEvent, MessageBus};
use helmsman::config::Config;
use helmsman::jobs::{Dispatcher, JobSettings};
use helmsman::store::RemoteStore;

use super::common::build_controller;

pub(crate) async fn cmd_serve() -> Result<()> {
    let config = Config::load().with_context(|| "Failed to load configuration")?;

    let problems = config.validate();
    if !problems.is_empty() {
        for problem in &problems {
            eprintln!("[ERROR] {}", problem);
        }
        bail!("Configuration is incomplete, run `helmsman config check`");
    }

    let (Some(base_url), Some(internal_key)) =
        (config.store.base_url.as_deref(), config.store.internal_key())
    else {
        bail!("store.base_url and store.internal_key are required");
    };
    let store = Arc::new(RemoteStore::new(base_url, internal_key)?);

    let controller = build_controller(
        &config,
        JobSettings::from_config(&config),
        store.clone(),
        store,
    )?;
    let bus = Arc::new(MessageBus::with_buffer_size(config.dispatcher.buffer_size));
    let dispatcher = Arc::new(Dispatcher::new(Arc::new(controller), Arc::clone(&bus)));

    let runner = {
        let dispatcher = Arc::clone(&dispatcher);
        tokio::spawn(async move { dispatcher.start().await })
    };
    let printer = {
        let bus = Arc::clone(&bus);
        tokio::spawn(async move {
            while let Some(report) = bus.consume_outbound().await {
                print_report(&report);
            }
        })
    };
    let reader = tokio::spawn(read_events(bus.inbound_sender()));

    info!("Serving, reading events from stdin");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
        _ = reader => info!("Event input closed"),
    }

    // Events already read are still dispatched before the runner returns.
    dispatcher.stop();
    runner.await.context("Dispatcher task failed")??;

    printer.abort();
    while let Ok(Some(report)) =
        tokio::time::timeout(Duration::from_millis(10), bus.consume_outbound()).await
    {
        print_report(&report);
    }

    Ok(())
}

/// Forward newline-delimited JSON events from stdin until EOF.
async fn read_events(sender: tokio::sync::mpsc::Sender<InboundEvent>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match InboundEvent::from_json(line) {
                    Ok(event) => {
                        if sender.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!(error = %e, "Ignoring malformed event"),
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Failed to read stdin");
                break;
            }
        }
    }
}

fn print_report(report: &helmsman::bus::JobReport) {
    match serde_json::to_string(report) {
        Ok(line) => println!("{}", line),
        Err(e) => warn!(error = %e, "Failed to encode job report"),
    }
}
