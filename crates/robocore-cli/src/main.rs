//! `robocore-cli` – Robocore Command Line Interface
//!
//! This binary is the primary entry point ("ignition switch") for the
//! robocore stack. It:
//!
//! 1. Checks for `~/.robocore/config.toml`; runs a **First-Run Wizard** when
//!    the file is absent.
//! 2. Binds the hub's two bus endpoints and starts the orchestrator, motor
//!    bridge, and supervision HTTP server as cooperating tasks in one
//!    process — the "exactly one process binds both bus endpoints"
//!    topology (spec §4.1).
//! 3. Intercepts **Ctrl-C** to drive a coordinated graceful shutdown: stop
//!    accepting new work, give in-flight tasks a bounded grace period to
//!    drain, then exit.

mod config;

use std::time::Duration;

use colored::Colorize;
use tokio::sync::watch;
use tracing::warn;

use robocore_bus::Hub;
use robocore_orchestrator::Orchestrator;
use robocore_remote::RemoteServer;

/// How long shutdown waits for the orchestrator and remote server to drain
/// before moving on regardless (spec §5 "drain bounded channels with a
/// short deadline").
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Structured logging ────────────────────────────────────────────────
    // Held for the entire process lifetime; dropping it flushes pending
    // OTel spans. Must run before the Tokio runtime is built (see
    // `telemetry::init_tracing`'s doc comment on the simple exporter).
    let _telemetry_guard = robocore_orchestrator::telemetry::init_tracing("robocore-cli");

    print_banner();

    // ── First-Run Wizard ──────────────────────────────────────────────────
    let cfg = match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => run_first_run_wizard()?,
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            config::Config::default()
        }
    };

    println!();
    println!(
        "  Bus endpoints: upstream {}, downstream {}",
        cfg.ipc.upstream.dimmed(),
        cfg.ipc.downstream.dimmed()
    );
    println!(
        "  Supervision HTTP on {}:{}\n",
        cfg.remote_interface.host.dimmed(),
        cfg.remote_interface.port
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(cfg))
}

/// Wires the hub, orchestrator, motor bridge, and supervision server
/// together and runs until a shutdown signal arrives.
async fn run(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let hub = Hub::new();
    let upstream = hub.upstream().clone();
    let downstream = hub.downstream().clone();

    let hub_handles = hub
        .listen(&cfg.ipc.upstream, &cfg.ipc.downstream)
        .await
        .map_err(|e| format!("failed to bind bus endpoints: {e}"))?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!(
            "{}",
            "⚠  Ctrl-C received – initiating graceful shutdown …"
                .yellow()
                .bold()
        );
        let _ = shutdown_tx.send(true);
    }) {
        warn!(error = %e, "failed to install Ctrl-C handler; graceful shutdown on Ctrl-C will not be available");
    }

    let orchestrator = Orchestrator::new(upstream.clone(), downstream.clone(), cfg.orchestrator_config());
    let orchestrator_task = {
        let shutdown_rx = shutdown_rx.clone();
        tokio::spawn(async move { orchestrator.run(shutdown_rx).await })
    };

    let motor_task = {
        let upstream = upstream.clone();
        let downstream = downstream.clone();
        let bridge_config = cfg.bridge_config();
        tokio::spawn(async move { robocore_motor::run(bridge_config, upstream, downstream).await })
    };

    let remote_server = RemoteServer::new(upstream, downstream, cfg.remote_config());
    let remote_task = {
        let shutdown_rx = shutdown_rx.clone();
        tokio::spawn(async move { remote_server.run(shutdown_rx).await })
    };

    println!(
        "  Type {} to stop.\n",
        "Ctrl-C".bold().cyan()
    );

    let mut shutdown_rx = shutdown_rx;
    while !*shutdown_rx.borrow() {
        if shutdown_rx.changed().await.is_err() {
            break;
        }
    }

    tracing::info!("shutdown signal received, draining tasks");

    // The motor bridge's `run` has no internal shutdown awareness (it
    // reconnects forever by design); aborting it is the only way to stop it,
    // which also closes its half of the serial port.
    motor_task.abort();
    hub_handles.upstream_task.abort();
    hub_handles.downstream_task.abort();

    let _ = tokio::time::timeout(SHUTDOWN_GRACE, orchestrator_task).await;
    match tokio::time::timeout(SHUTDOWN_GRACE, remote_task).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => warn!(error = %e, "remote server exited with an error"),
        Ok(Err(e)) => warn!(error = %e, "remote server task panicked"),
        Err(_) => warn!("remote server did not drain within the shutdown grace period"),
    }

    println!("{}", "  ✓ Exiting robocore.".green());
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// First-Run Wizard
// ─────────────────────────────────────────────────────────────────────────────

fn run_first_run_wizard() -> Result<config::Config, Box<dyn std::error::Error>> {
    println!();
    println!("{}", "  ╔══════════════════════════════════════╗".bold().cyan());
    println!("{}", "  ║      Robocore First-Run Wizard        ║".bold().cyan());
    println!("{}", "  ╚══════════════════════════════════════╝".bold().cyan());
    println!();
    println!("  No configuration found. Let's set up robocore.\n");

    let mut cfg = config::Config::default();

    let device = prompt_line(
        &format!("  UART device for the motor peripheral [{}]: ", cfg.nav.uart_device),
        &cfg.nav.uart_device,
    );
    cfg.nav.uart_device = device;

    let port_str = prompt_line(
        &format!("  Supervision HTTP port [{}]: ", cfg.remote_interface.port),
        &cfg.remote_interface.port.to_string(),
    );
    if let Ok(p) = port_str.trim().parse::<u16>() {
        cfg.remote_interface.port = p;
    }

    match config::save(&cfg) {
        Ok(()) => println!(
            "\n  {} Config saved to {}\n",
            "✓".green().bold(),
            config::config_path().display().to_string().bold()
        ),
        Err(e) => println!("{}: {}", "Error saving config".red(), e),
    }

    Ok(cfg)
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"   ___      _                     "#.bold().cyan());
    println!("{}", r#"  / _ \___ | |__   ___   ___ ___  _ __ ___ "#.bold().cyan());
    println!("{}", r#" / /_)/ _ \| '_ \ / _ \ / __/ _ \| '__/ _ \"#.bold().cyan());
    println!("{}", r#"/ ___/ (_) | |_) | (_) | (_| (_) | | |  __/"#.bold().cyan());
    println!("{}", r#"\/    \___/|_.__/ \___/ \___\___/|_|  \___|"#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "Robocore".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Voice-driven mobile robot coordination core");
    println!();
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn prompt_line(msg: &str, default: &str) -> String {
    use std::io::{BufRead, Write};
    print!("{}", msg);
    std::io::stdout().flush().ok();
    let mut line = String::new();
    match std::io::stdin().lock().read_line(&mut line) {
        Ok(_) => {
            let t = line.trim().to_string();
            if t.is_empty() {
                default.to_string()
            } else {
                t
            }
        }
        Err(_) => default.to_string(),
    }
}
