#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that hosts a Spinwheel session in the terminal.
//!
//! The adapter reads the item source, owns the virtual-time timer queue and
//! translates typed commands into world commands. Sound requests are resolved
//! next to the item source and handed to a logging audio sink.

mod config;
mod console;
mod session;
mod sound;

use std::{
    fs,
    io::{self, BufRead},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use spinwheel_core::{Command, Event, SourceEntry};
use spinwheel_modifiers::parse_source;
use spinwheel_world::{query, World};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::{
    config::Overrides,
    console::{Input, HELP},
    session::Session,
    sound::{AudioSink, LogSink, SoundBank, CLICK_SOUND, HEARTBEAT_SOUND},
};

#[derive(Parser, Debug)]
#[command(name = "spinwheel")]
#[command(about = "Spin a wheel of annotated items in the terminal")]
struct Args {
    /// Item source file, one item per line
    source: PathBuf,

    /// TOML file with session configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed for spin randomness
    #[arg(long)]
    seed: Option<u64>,

    /// Start with automatic spinning enabled
    #[arg(long)]
    auto_spin: bool,

    /// Disable heartbeat pulses
    #[arg(long)]
    no_heartbeat: bool,

    /// Print the parsed items as JSON and exit
    #[arg(long)]
    dump_items: bool,
}

#[derive(Serialize)]
struct ItemDump<'a> {
    source: String,
    entries: &'a [SourceEntry],
}

/// Entry point for the Spinwheel command-line interface.
fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let source = fs::read_to_string(&args.source)
        .with_context(|| format!("failed to read item source {}", args.source.display()))?;

    if args.dump_items {
        let entries = parse_source(&source)
            .with_context(|| format!("invalid item source {}", args.source.display()))?;
        let dump = ItemDump {
            source: args.source.display().to_string(),
            entries: &entries,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&dump).context("failed to encode items as json")?
        );
        return Ok(());
    }

    let config = config::load(
        args.config.as_deref(),
        Overrides {
            seed: args.seed,
            no_heartbeat: args.no_heartbeat,
        },
    )?;
    let world = World::new(source, config)
        .with_context(|| format!("cannot start a session from {}", args.source.display()))?;
    info!(source = %args.source.display(), "session ready");

    let base_dir = args
        .source
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let mut sounds = SoundBank::new(base_dir, LogSink);
    let (mut session, events) = Session::start(world);
    report(&events, &mut sounds);

    println!("{}", query::welcome_banner(session.world()));
    print_wheel(session.world());
    println!("{}", query::status(session.world()));
    println!("{HELP}");

    if args.auto_spin {
        let events = session.submit(Command::SetAutoSpin { enabled: true });
        report(&events, &mut sounds);
    }

    for line in io::stdin().lock().lines() {
        let line = line.context("failed to read command from stdin")?;
        let input = match console::parse(&line) {
            Ok(Some(input)) => input,
            Ok(None) => continue,
            Err(error) => {
                println!("{error:#}");
                continue;
            }
        };

        let events = match input {
            Input::Spin => session.spin(),
            Input::Wait(duration) => session.advance(duration),
            Input::Auto(enabled) => session.submit(Command::SetAutoSpin { enabled }),
            Input::Heartbeat(enabled) => session.submit(Command::SetHeartbeat { enabled }),
            Input::Restart => session.submit(Command::Restart),
            Input::Status => {
                print_status(session.world());
                continue;
            }
            Input::Wheel => {
                print_wheel(session.world());
                continue;
            }
            Input::Help => {
                println!("{HELP}");
                continue;
            }
            Input::Quit => break,
        };
        report(&events, &mut sounds);
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("SPINWHEEL_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("spinwheel=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn report<S: AudioSink>(events: &[Event], sounds: &mut SoundBank<S>) {
    for event in events {
        let warning = match event {
            Event::StatusChanged { message } => {
                println!("{message}");
                None
            }
            Event::RateChanged { bps } => {
                info!(bps, "rate changed");
                None
            }
            Event::ItemAdded {
                base_name,
                placement,
            } => {
                info!(item = %base_name, ?placement, "item added");
                None
            }
            Event::ItemRemoved { base_name, reason } => {
                info!(item = %base_name, ?reason, "item removed");
                None
            }
            Event::NameBlocked { base_name } => {
                info!(item = %base_name, "name blocked");
                None
            }
            Event::SoundRequested { file } => sounds.play(file),
            Event::PointerMoved { .. } => sounds.play(CLICK_SOUND),
            Event::HeartbeatPulsed => sounds.play(HEARTBEAT_SOUND),
            Event::WarningRaised { warning } => Some(warning.clone()),
            Event::ConfigurationRejected { error } => {
                error!(%error, "restart failed");
                None
            }
            _ => None,
        };
        if let Some(warning) = warning {
            warn!(?warning, "runtime warning");
        }
    }
}

fn print_status(world: &World) {
    println!("phase: {:?}", query::phase(world));
    println!("status: {}", query::status(world));
    println!("{}", query::rate_label(world));
    println!("elapsed: {:.1}s", query::elapsed(world).as_secs_f64());
    println!("pending multiplier: {}x", query::pending_multiplier(world));
    println!(
        "auto spin: {}, heartbeat: {} (every {} ms)",
        on_off(query::auto_spin_enabled(world)),
        on_off(query::heartbeat_enabled(world)),
        query::heartbeat_interval(world).as_millis()
    );
    if let Some(remaining) = query::pause_remaining(world) {
        println!("relax: {} seconds remaining", remaining.as_secs_f64().ceil());
    }
    let blocked = query::blocked_names(world);
    if !blocked.is_empty() {
        println!("blocked: {}", blocked.join(", "));
    }
}

fn print_wheel(world: &World) {
    let pointer = query::pointer_index(world);
    println!("rotation: {:.1} degrees", query::angle_offset(world));
    for (index, sector) in query::sectors(world).iter().enumerate() {
        let marker = if pointer == Some(index) { '>' } else { ' ' };
        println!("{marker} {index:>2} {} {}", sector.color(), sector.label());
    }
    let hidden = query::hidden_items(world);
    if !hidden.is_empty() {
        let labels: Vec<String> = hidden
            .iter()
            .map(|item| query::display_label(world, item))
            .collect();
        println!("  hidden: {}", labels.join(", "));
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}
