// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SDN Load-Balancer Controller CLI
//!
//! Drives the controller over a JSON-lines transport or replays recorded traces.
//!
//! # Usage
//!
//! ```bash
//! # Live: events on stdin, commands and alerts on stdout, logs on stderr
//! sdn-balancer run
//!
//! # Replay a trace of {"at_ms": N, "event": {...}} lines with synthetic time
//! sdn-balancer replay --input trace.jsonl
//!
//! # Using configuration file
//! sdn-balancer --config controller.toml run
//!
//! # Inspect a lab topology
//! sdn-balancer topology projecttopo
//! ```

use clap::{Parser, Subcommand};
use sdn_balancer::topology::NodeKind;
use sdn_balancer::{
    runtime, Controller, ControllerConfig, ControllerEvent, ControllerSnapshot, Output, Topology,
};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

/// SDN Load-Balancer Controller
#[derive(Parser, Debug)]
#[command(name = "sdn-balancer")]
#[command(about = "SDN Load-Balancer Controller - L2 learning with congestion monitoring")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the controller on a JSON-lines stdin/stdout transport
    Run,

    /// Replay a recorded event trace with synthetic time
    Replay {
        /// Trace file path
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Generate example configuration file
    GenConfig {
        /// Output file path
        #[arg(short, long, default_value = "controller.toml")]
        output: PathBuf,
    },

    /// Validate the configuration file given with --config
    Validate,

    /// Describe a lab topology (loopfree, projecttopo)
    Topology {
        /// Topology name
        name: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // `validate` reports load errors itself
    let config = match (&args.command, &args.config) {
        (Commands::Validate, _) | (_, None) => ControllerConfig::default(),
        (_, Some(path)) => ControllerConfig::from_file(path)?,
    };

    // Initialize logging
    let level = args.log_level.as_deref().unwrap_or(&config.log_level);
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match args.command {
        Commands::Run => cmd_run(config).await,
        Commands::Replay { input } => cmd_replay(config, input),
        Commands::GenConfig { output } => cmd_gen_config(output),
        Commands::Validate => match args.config {
            Some(path) => cmd_validate(path),
            None => Err("validate requires --config FILE".into()),
        },
        Commands::Topology { name, json } => cmd_topology(&name, json),
    }
}

async fn cmd_run(config: ControllerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let controller = Controller::new(config)?;
    let (out_tx, mut out_rx) = mpsc::channel::<Output>(1024);
    let (handle, task) = runtime::spawn(controller, out_tx);

    // Output writer
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(output) = out_rx.recv().await {
            let mut line = serde_json::to_vec(&output)?;
            line.push(b'\n');
            stdout.write_all(&line).await?;
            stdout.flush().await?;
        }
        Ok::<(), Box<dyn std::error::Error + Send + Sync>>(())
    });

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    tracing::info!("Input closed");
                    break;
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<ControllerEvent>(line) {
                    Ok(event) => handle.send(event).await?,
                    Err(e) => tracing::warn!("Ignoring undecodable event: {}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                eprintln!("\nShutting down...");
                handle.stop();
                break;
            }
        }
    }

    // Closing the event channel lets the task drain what is queued
    drop(handle);
    let controller = task.await?;
    let snapshot = controller.snapshot();
    drop(controller);
    if let Err(e) = writer.await? {
        tracing::warn!("Output writer failed: {}", e);
    }

    eprintln!("\nFinal Statistics:");
    print_snapshot(&snapshot);
    Ok(())
}

fn cmd_replay(config: ControllerConfig, input: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let mut controller = Controller::new(config)?;
    let file = std::io::BufReader::new(std::fs::File::open(&input)?);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let summary = sdn_balancer::replay(&mut controller, file, &mut out)?;
    tracing::info!(
        "Replayed {} events from {} ({} outputs, {} lines skipped)",
        summary.events,
        input.display(),
        summary.outputs,
        summary.skipped_lines
    );

    eprintln!("\nFinal Statistics:");
    print_snapshot(&controller.snapshot());
    Ok(())
}

fn cmd_gen_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = ControllerConfig {
        name: "lab-controller".into(),
        ..Default::default()
    };

    let toml_str = toml::to_string_pretty(&config)?;

    let content = format!(
        r#"# SDN Load-Balancer Controller Configuration
# Generated by sdn-balancer gen-config
#
# link_capacity_mbps uses 1 Mbit = 1024 * 1024 bits.

{}
"#,
        toml_str
    );

    std::fs::write(&output, content)?;
    println!("Generated configuration file: {}", output.display());
    Ok(())
}

fn cmd_validate(config_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    match ControllerConfig::from_file(&config_path) {
        Ok(config) => {
            println!("Configuration valid!");
            println!();
            println!("Controller: {}", config.name);
            println!("Poll interval: {}s", config.monitoring_interval_secs);
            println!(
                "Congestion threshold: {:.1}% of {} Mbit/s ({} B/s)",
                config.congestion_threshold * 100.0,
                config.link_capacity_mbps,
                config.link_capacity_bytes_per_sec()
            );
            println!(
                "Flow timeouts: idle {}s, hard {}s",
                config.flow_idle_timeout_secs, config.flow_hard_timeout_secs
            );
            println!(
                "On disconnect: {}",
                if config.evict_on_disconnect {
                    "evict switch state"
                } else {
                    "keep switch state"
                }
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("Configuration invalid: {}", e);
            std::process::exit(1);
        }
    }
}

fn cmd_topology(name: &str, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let topo = Topology::by_name(name)?;
    topo.validate()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&topo)?);
        return Ok(());
    }

    println!("Topology: {}", topo.name);
    println!("=====================================");
    for node in topo.nodes() {
        match node.kind {
            NodeKind::Switch => {
                println!("  {} (switch, ports {:?})", node.name, topo.ports(&node.name))
            }
            NodeKind::Host { ip, mac } => {
                let at = topo
                    .attachment(&node.name)
                    .map(|e| format!("{} port {}", e.node, e.port))
                    .unwrap_or_else(|| "unattached".into());
                println!("  {} (host {} {}) on {}", node.name, ip, mac, at);
            }
        }
    }
    println!();
    for link in topo.links() {
        println!(
            "  {}:{} <-> {}:{}",
            link.a.node, link.a.port, link.b.node, link.b.port
        );
    }
    println!();
    println!(
        "Switch graph: {}",
        if topo.has_switch_cycle() {
            "contains loops (flooding will not terminate without loop prevention)"
        } else {
            "loop-free"
        }
    );
    Ok(())
}

fn print_snapshot(snapshot: &ControllerSnapshot) {
    let m = &snapshot.metrics;
    eprintln!("--- Controller '{}' ---", snapshot.name);
    eprintln!(
        "  Switches: {} known, {} connected; {} learned addresses",
        snapshot.switches, snapshot.connected_switches, snapshot.learned_addresses
    );
    eprintln!(
        "  Packets in: {} ({} unicast, {} flooded, {} dropped, {} malformed)",
        m.packets_in, m.unicasts, m.floods, m.drops, m.malformed_packets
    );
    eprintln!(
        "  Flows installed: {}; stats requests: {}, replies: {}, polls: {}",
        m.flows_installed, m.stats_requests, m.stats_replies, m.polls
    );
    eprintln!(
        "  Congestion: {} raised, {} cleared; congested now: {}",
        m.congestion_raised,
        m.congestion_cleared,
        if snapshot.congested_ports.is_empty() {
            "none".to_string()
        } else {
            snapshot.congested_ports.join(", ")
        }
    );
}
