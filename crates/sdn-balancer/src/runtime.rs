// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Async driver for the controller.
//!
//! A single task owns the [`Controller`] and serializes every input through it:
//! transport events from a channel, the stats poll deadline, snapshot requests
//! and shutdown. Outputs are forwarded in order on an mpsc channel.

use crate::config::ConfigError;
use crate::controller::{Controller, ControllerSnapshot};
use crate::event::{ControllerEvent, Output};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, trace};

const EVENT_QUEUE_DEPTH: usize = 1024;

/// Runtime errors.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Controller not running")]
    NotRunning,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

struct SnapshotRequest {
    reply: oneshot::Sender<ControllerSnapshot>,
}

/// Handle to a running controller task.
#[derive(Clone)]
pub struct ControllerHandle {
    running: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    events: mpsc::Sender<ControllerEvent>,
    snapshots: mpsc::Sender<SnapshotRequest>,
}

impl ControllerHandle {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Ask the controller task to stop after the current event.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
        self.shutdown.notify_one();
    }

    /// Queue an event for the controller.
    pub async fn send(&self, event: ControllerEvent) -> Result<(), ControllerError> {
        self.events
            .send(event)
            .await
            .map_err(|_| ControllerError::NotRunning)
    }

    /// Current controller snapshot.
    pub async fn snapshot(&self) -> Result<ControllerSnapshot, ControllerError> {
        let (reply, rx) = oneshot::channel();
        self.snapshots
            .send(SnapshotRequest { reply })
            .await
            .map_err(|_| ControllerError::NotRunning)?;
        rx.await.map_err(|_| ControllerError::NotRunning)
    }
}

/// Spawn the controller task.
///
/// Returns a handle for feeding events and the join handle, which yields the
/// controller back once the task stops.
pub fn spawn(
    controller: Controller,
    outputs: mpsc::Sender<Output>,
) -> (ControllerHandle, JoinHandle<Controller>) {
    let running = Arc::new(AtomicBool::new(true));
    let shutdown = Arc::new(Notify::new());
    let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
    let (snapshots_tx, snapshots_rx) = mpsc::channel(8);

    info!(
        "Controller '{}' started (poll every {}s, threshold {:.0}%)",
        controller.config().name,
        controller.config().monitoring_interval_secs,
        controller.config().congestion_threshold * 100.0
    );

    let task = tokio::spawn(run_loop(
        controller,
        events_rx,
        snapshots_rx,
        outputs,
        Arc::clone(&shutdown),
        Arc::clone(&running),
    ));

    let handle = ControllerHandle {
        running,
        shutdown,
        events: events_tx,
        snapshots: snapshots_tx,
    };

    (handle, task)
}

async fn run_loop(
    mut controller: Controller,
    mut events: mpsc::Receiver<ControllerEvent>,
    mut snapshots: mpsc::Receiver<SnapshotRequest>,
    outputs: mpsc::Sender<Output>,
    shutdown: Arc<Notify>,
    running: Arc<AtomicBool>,
) -> Controller {
    loop {
        let deadline = controller.next_poll();

        let event = tokio::select! {
            biased;
            _ = shutdown.notified() => break,
            Some(req) = snapshots.recv() => {
                let _ = req.reply.send(controller.snapshot());
                continue;
            }
            _ = sleep_until(deadline) => ControllerEvent::PollTimerFired,
            event = events.recv() => match event {
                Some(event) => event,
                None => {
                    debug!("Event channel closed");
                    break;
                }
            },
        };

        if !dispatch(&mut controller, event, &outputs).await {
            debug!("Output channel closed");
            break;
        }
    }

    running.store(false, Ordering::Relaxed);
    info!("Controller '{}' stopped", controller.config().name);
    controller
}

async fn dispatch(
    controller: &mut Controller,
    event: ControllerEvent,
    outputs: &mpsc::Sender<Output>,
) -> bool {
    let name = event.name();
    let outcome = controller.handle(event, Instant::now().into_std());
    trace!(
        "{}: {} commands, {} alerts",
        name,
        outcome.commands.len(),
        outcome.alerts.len()
    );

    for output in outcome.into_outputs() {
        if outputs.send(output).await.is_err() {
            return false;
        }
    }
    true
}

async fn sleep_until(deadline: Option<std::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}
