// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Deterministic trace replay.
//!
//! Traces are JSON lines of the form `{"at_ms": N, "event": {...}}`. Time is
//! synthetic: each event is handled at `base + at_ms`, and poll deadlines that fall
//! between two events fire at their exact deadline. Outputs are written as JSON
//! lines tagged with the millisecond they were produced at.

use crate::controller::Controller;
use crate::event::{ControllerEvent, Output};
use crate::runtime::ControllerError;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};
use std::time::{Duration, Instant};
use tracing::warn;

/// One line of a replay trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub at_ms: u64,
    pub event: ControllerEvent,
}

/// One line of replay output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceOutput {
    pub at_ms: u64,
    #[serde(flatten)]
    pub output: Output,
}

/// Counts from one replay run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub events: usize,
    pub skipped_lines: usize,
    pub outputs: usize,
}

/// Replay `input` through `controller`, writing outputs to `out`.
///
/// Blank lines and `#` comments are ignored; undecodable lines are logged and
/// skipped.
pub fn replay<R: BufRead, W: Write>(
    controller: &mut Controller,
    input: R,
    out: &mut W,
) -> Result<ReplaySummary, ControllerError> {
    let base = Instant::now();
    let mut summary = ReplaySummary::default();

    for (lineno, line) in input.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let trace: TraceEvent = match serde_json::from_str(line) {
            Ok(trace) => trace,
            Err(e) => {
                warn!("line {}: skipping: {}", lineno + 1, e);
                summary.skipped_lines += 1;
                continue;
            }
        };
        let now = base + Duration::from_millis(trace.at_ms);

        // Polls that came due up to this event
        while let Some(deadline) = controller.next_poll().filter(|d| *d <= now) {
            let at_ms = deadline.duration_since(base).as_millis() as u64;
            let outcome = controller.handle(ControllerEvent::PollTimerFired, deadline);
            for output in outcome.into_outputs() {
                emit(out, at_ms, output)?;
                summary.outputs += 1;
            }
        }

        let outcome = controller.handle(trace.event, now);
        summary.events += 1;
        for output in outcome.into_outputs() {
            emit(out, trace.at_ms, output)?;
            summary.outputs += 1;
        }
    }

    out.flush()?;
    Ok(summary)
}

fn emit<W: Write>(out: &mut W, at_ms: u64, output: Output) -> Result<(), ControllerError> {
    serde_json::to_writer(&mut *out, &TraceOutput { at_ms, output })?;
    out.write_all(b"\n")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ControllerConfig;

    fn run(trace: &str) -> (ReplaySummary, Vec<serde_json::Value>) {
        let mut controller = Controller::new(ControllerConfig::default()).expect("controller");
        let mut out = Vec::new();
        let summary = replay(&mut controller, trace.as_bytes(), &mut out).expect("replay");
        let lines = String::from_utf8(out)
            .expect("utf8")
            .lines()
            .map(|l| serde_json::from_str(l).expect("json"))
            .collect();
        (summary, lines)
    }

    #[test]
    fn test_polls_fire_between_events() {
        let trace = r#"
            # connect, then stay quiet past two poll deadlines
            {"at_ms":0,"event":{"connection_up":{"dpid":"s1"}}}
            {"at_ms":12000,"event":"poll_timer_fired"}
        "#;
        let (summary, lines) = run(trace);

        assert_eq!(summary.events, 2);
        let polls: Vec<u64> = lines
            .iter()
            .filter(|l| l["command"]["request_port_stats"].is_object())
            .map(|l| l["at_ms"].as_u64().expect("at_ms"))
            .collect();
        // Immediate request, then at 5 s and 10 s; the explicit 12 s timer is early
        assert_eq!(polls, vec![0, 5000, 10000]);
    }

    #[test]
    fn test_alert_lines() {
        let trace = r#"
            {"at_ms":0,"event":{"connection_up":{"dpid":"s2"}}}
            {"at_ms":0,"event":{"port_stats_received":{"dpid":"s2","stats":[{"port_no":4,"rx_bytes":0,"tx_bytes":0}]}}}
            {"at_ms":5000,"event":{"port_stats_received":{"dpid":"s2","stats":[{"port_no":4,"rx_bytes":60000000,"tx_bytes":0}]}}}
        "#;
        let (_, lines) = run(trace);

        let alerts: Vec<&serde_json::Value> =
            lines.iter().filter(|l| l["alert"].is_object()).collect();
        assert_eq!(alerts.len(), 1);
        let alert = &alerts[0]["alert"];
        assert_eq!(alerts[0]["at_ms"], 5000);
        assert_eq!(alert["dpid"], "s2");
        assert_eq!(alert["port"], 4);
        assert_eq!(alert["transition"]["state"], "raised");
    }

    #[test]
    fn test_bad_lines_skipped() {
        let trace = "not json\n{\"at_ms\":1,\"event\":{\"connection_up\":{\"dpid\":\"s1\"}}}\n";
        let (summary, lines) = run(trace);
        assert_eq!(summary.skipped_lines, 1);
        assert_eq!(summary.events, 1);
        assert_eq!(lines.len(), 2);
    }
}
