// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Replays the bundled demo trace and checks the emitted timeline.

use sdn_balancer::{replay, Controller, ControllerConfig};
use std::fs::File;
use std::io::BufReader;

const DEMO_TRACE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../demos/congestion.jsonl");

#[test]
fn test_demo_trace_timeline() {
    let mut controller = Controller::new(ControllerConfig::default()).expect("controller");
    let input = BufReader::new(File::open(DEMO_TRACE).expect("demo trace"));
    let mut out = Vec::new();

    let summary = replay(&mut controller, input, &mut out).expect("replay");
    assert_eq!(summary.events, 7);
    assert_eq!(summary.skipped_lines, 0);

    let lines: Vec<serde_json::Value> = String::from_utf8(out)
        .expect("utf8")
        .lines()
        .map(|l| serde_json::from_str(l).expect("json"))
        .collect();
    assert_eq!(lines.len(), summary.outputs);

    let kinds: Vec<(u64, String)> = lines
        .iter()
        .map(|l| {
            let at = l["at_ms"].as_u64().expect("at_ms");
            let kind = match (l.get("command"), l.get("alert")) {
                (Some(cmd), _) => cmd
                    .as_object()
                    .and_then(|o| o.keys().next().cloned())
                    .expect("command name"),
                (None, Some(alert)) => alert["transition"]["state"]
                    .as_str()
                    .expect("state")
                    .to_string(),
                _ => panic!("unexpected line {}", l),
            };
            (at, kind)
        })
        .collect();

    let expected = [
        (0, "install_flow"),
        (0, "request_port_stats"),
        (100, "flood_packet"),
        (200, "install_flow"),
        (200, "send_packet"),
        (5000, "request_port_stats"),
        (5000, "raised"),
        (10000, "request_port_stats"),
        (10000, "cleared"),
    ];
    let expected: Vec<(u64, String)> = expected
        .iter()
        .map(|(at, k)| (*at, k.to_string()))
        .collect();
    assert_eq!(kinds, expected);

    // Disconnect at the end evicted the switch
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.switches, 0);
    assert!(snapshot.congested_ports.is_empty());
    assert_eq!(snapshot.metrics.congestion_raised, 1);
}
