//! sp - shellplay CLI
//!
//! Plays workflow documents against a headless surface and exposes the
//! remote control endpoint. JSON goes to stdout, logs to stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use shellplay::error::Error;
use shellplay::events::Subscription;
use shellplay::prelude::*;
use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sp")]
#[command(about = "shellplay - humanlike playback of recorded UI workflows")]
#[command(version)]
struct Cli {
    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a workflow (path or imported name)
    Play {
        workflow: String,
        /// Playback speed (1.0 = realtime, 2.0 = 2x)
        #[arg(short, long, default_value = "1.0")]
        speed: f64,
        /// Start over after the last action
        #[arg(long = "loop")]
        looping: bool,
        /// Nominal timings, straight-ish paths
        #[arg(long)]
        no_humanize: bool,
        /// Seed the jitter source for a reproducible run
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long, default_value = "9876")]
        port: u16,
        /// Skip the remote control endpoint
        #[arg(long)]
        no_remote: bool,
        #[arg(long, default_value = "0")]
        offset_x: f64,
        #[arg(long, default_value = "0")]
        offset_y: f64,
    },
    /// Serve remote control only; start playback via POST /playback/start
    Serve {
        workflow: String,
        #[arg(long, default_value = "9876")]
        port: u16,
        #[arg(short, long, default_value = "1.0")]
        speed: f64,
    },
    /// Show workflow info
    Show {
        workflow: String,
        /// List every action
        #[arg(long)]
        all: bool,
    },
    /// Copy a workflow file into storage
    Import {
        file: String,
    },
    /// List imported workflows
    List,
    /// Delete an imported workflow
    Delete {
        name: String,
    },
}

#[derive(Serialize)]
struct Output<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<Error>,
}

impl<T: Serialize> Output<T> {
    fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }
    fn err(e: Error) -> Output<()> {
        Output { success: false, data: None, error: Some(e) }
    }
}

fn print_json<T: Serialize>(output: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(output)?);
    Ok(())
}

/// One compact line per event, flushed so pipes see it immediately
fn print_line<T: Serialize>(value: &T) -> Result<()> {
    let mut out = io::stdout().lock();
    serde_json::to_writer(&mut out, value)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Play {
            workflow,
            speed,
            looping,
            no_humanize,
            seed,
            port,
            no_remote,
            offset_x,
            offset_y,
        } => {
            let mut config = EngineConfig::default()
                .speed(speed)
                .looping(looping)
                .humanize(!no_humanize)
                .offset(offset_x, offset_y);
            config.seed = seed;
            let remote = (!no_remote).then(|| RemoteConfig::default().port(port));
            play(&workflow, config, remote, true)
        }
        Commands::Serve { workflow, port, speed } => play(
            &workflow,
            EngineConfig::default().speed(speed),
            Some(RemoteConfig::default().port(port)),
            false,
        ),
        Commands::Show { workflow, all } => show(&workflow, all),
        Commands::Import { file } => import(&file),
        Commands::List => list(),
        Commands::Delete { name } => delete(&name),
    };

    if let Err(e) = result {
        if let Some(err) = e.downcast_ref::<Error>() {
            let _ = print_json(&Output::<()>::err(err.clone()));
        }
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// A readable file path, else an imported workflow name
fn load_workflow(workflow: &str) -> Result<WorkflowDocument> {
    if Path::new(workflow).is_file() {
        return Ok(WorkflowDocument::from_file(workflow)?);
    }
    let storage = WorkflowStorage::new()?;
    Ok(storage.load(workflow)?)
}

fn play(
    workflow: &str,
    config: EngineConfig,
    remote: Option<RemoteConfig>,
    autostart: bool,
) -> Result<()> {
    let doc = load_workflow(workflow)?;
    let window = remote.as_ref().map(|r| r.window).unwrap_or_default();
    let surface = shellplay::share(HeadlessSurface::new(&doc).with_window(window));

    info!(workflow = %doc.name, screens = doc.screens.len(), actions = doc.actions.len(), "loaded workflow");
    let mut engine = WorkflowEngine::new(Arc::new(doc), surface.clone(), config);
    let events = engine.subscribe();
    let player = Player::spawn(engine).context("Failed to start player")?;

    let server = match remote {
        Some(remote) => Some(RemoteServer::start(remote, surface, player.commands())?),
        None => None,
    };
    if let Some(server) = &server {
        print_line(&serde_json::json!({ "event": "listening", "addr": server.addr().to_string() }))?;
    }

    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = interrupted.clone();
    let commands = player.commands();
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
        let _ = commands.stop();
    })?;

    if autostart {
        player.start();
    }
    stream_events(&events, &interrupted, autostart)?;

    drop(server);
    if let Some(engine) = player.shutdown() {
        print_json(&Output::ok(serde_json::json!({
            "status": engine.status(),
            "stats": engine.stats(),
        })))?;
    }
    Ok(())
}

/// Print events until playback completes (when `until_complete`) or Ctrl+C
fn stream_events(events: &Subscription, interrupted: &AtomicBool, until_complete: bool) -> Result<()> {
    loop {
        match events.recv_timeout(Duration::from_millis(100)) {
            Some(event) => {
                print_line(&event)?;
                let done = match event {
                    PlaybackEvent::Completed { .. } => until_complete,
                    PlaybackEvent::Stopped { .. } => interrupted.load(Ordering::SeqCst),
                    _ => false,
                };
                if done {
                    return Ok(());
                }
            }
            None => {
                if interrupted.load(Ordering::SeqCst) {
                    return Ok(());
                }
            }
        }
    }
}

fn show(workflow: &str, all: bool) -> Result<()> {
    let doc = load_workflow(workflow)?;

    let mut kinds = std::collections::BTreeMap::new();
    for action in &doc.actions {
        *kinds.entry(format!("{:?}", action.kind)).or_insert(0usize) += 1;
    }
    let screens: Vec<_> = doc
        .screens
        .iter()
        .map(|s| serde_json::json!({ "id": s.id, "name": s.name, "elements": s.elements.len() }))
        .collect();

    let mut info = serde_json::json!({
        "id": doc.id,
        "name": doc.name,
        "startScreen": doc.start_screen().map(|s| s.id.clone()),
        "screens": screens,
        "actions": doc.actions.len(),
        "actionTypes": kinds,
    });
    if all {
        info["actionList"] = serde_json::to_value(&doc.actions)?;
    }
    print_json(&Output::ok(info))
}

fn import(file: &str) -> Result<()> {
    let doc = WorkflowDocument::from_file(file)?;
    let storage = WorkflowStorage::new()?;
    let path = storage.save(&doc)?;
    print_json(&Output::ok(serde_json::json!({
        "name": doc.name,
        "path": path.display().to_string(),
    })))
}

fn list() -> Result<()> {
    let storage = WorkflowStorage::new()?;
    print_json(&Output::ok(storage.list()?))
}

fn delete(name: &str) -> Result<()> {
    let storage = WorkflowStorage::new()?;
    storage.delete(name)?;
    print_json(&Output::ok(serde_json::json!({ "deleted": name })))
}
