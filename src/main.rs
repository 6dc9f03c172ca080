//! Deskling main entry point.
//!
//! Animated desktop characters rendered in borderless, always-on-top
//! overlay windows, built on:
//! - **sdl2** for windowing, rendering, and the event stream
//! - **image** for decoding character frames
//! - **crossbeam** channels and atomics for cross-thread signaling
//!
//! # Project Structure
//!
//! - [`deskling::animation`] – frame playback and character discovery
//! - [`deskling::window`] – per-window threads, registry, event watcher
//! - [`deskling::manager`] – spawn/destroy/scale lifecycle and the reaper
//! - [`deskling::config`] – frames directory configuration
//!
//! # Startup Order
//!
//! 1. Initialize logging and load the configuration
//! 2. Initialize SDL and install the global event watcher (this must happen
//!    before any character window exists, so drags never freeze a window)
//! 3. Build the window manager and spawn the requested characters
//! 4. Block until every window is closed, then shut everything down
//!
//! # Running
//!
//! ```sh
//! cargo run --release -- --spawn bocchi
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use deskling::config::AppConfig;
use deskling::manager::WindowManager;
use deskling::window::registry::RenderContextRegistry;
use deskling::window::watcher;

/// Animated desktop characters in transparent overlay windows.
#[derive(Parser)]
#[command(version, about = "Animated desktop characters in transparent overlay windows")]
struct Cli {
    /// Override the frames base directory for this run.
    #[arg(long, value_name = "PATH")]
    frames_dir: Option<PathBuf>,

    /// List available characters and exit.
    #[arg(long)]
    list: bool,

    /// List available characters as JSON and exit.
    #[arg(long)]
    list_json: bool,

    /// Spawn a window for this character (repeatable).
    #[arg(long = "spawn", value_name = "NAME")]
    spawn: Vec<String>,

    /// Initial scale for the spawned windows.
    #[arg(long, value_name = "FACTOR")]
    scale: Option<f64>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = AppConfig::new();
    if let Err(e) = config.load_from_file() {
        log::warn!("{e}, using defaults");
    }
    if let Some(dir) = cli.frames_dir {
        config.frames_path = dir;
    }
    if let Err(e) = config.ensure_frames_dir() {
        log::error!("{e}");
    }
    log::info!("Frames path: {}", config.frames_path.display());

    // Early-exit: print the character list and quit (no windows needed)
    if cli.list || cli.list_json {
        match deskling::animation::characters::scan_characters(&config.frames_path) {
            Ok(characters) if cli.list_json => match serde_json::to_string_pretty(&characters) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    eprintln!("Error: {e}");
                    std::process::exit(1);
                }
            },
            Ok(characters) => {
                for character in characters {
                    println!("{} ({} frames)", character.name, character.frame_count);
                }
            }
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    let sdl = match sdl2::init() {
        Ok(sdl) => sdl,
        Err(e) => {
            log::error!("SDL init failed: {e}");
            std::process::exit(1);
        }
    };
    let events = match sdl.event() {
        Ok(events) => events,
        Err(e) => {
            log::error!("SDL event subsystem failed: {e}");
            std::process::exit(1);
        }
    };

    // The watcher must be in place before the first window, and the guard
    // must outlive every window.
    let registry = Arc::new(RenderContextRegistry::new());
    let _watch = watcher::install(&events, Arc::clone(&registry));

    let manager = WindowManager::new(config.frames_path.clone(), registry);

    if cli.spawn.is_empty() {
        println!("No characters requested. Available:");
        for character in manager.characters() {
            println!("  {} ({} frames)", character.name, character.frame_count);
        }
        println!("Spawn one with: deskling --spawn <NAME>");
        return;
    }

    for name in &cli.spawn {
        match manager.spawn(name) {
            Ok(info) => {
                if let Some(scale) = cli.scale {
                    manager.set_scale(&info.id, scale);
                }
                log::info!(
                    "Spawned '{}' as {} (scale {:.2})",
                    info.character_name,
                    info.id,
                    info.scale
                );
            }
            Err(e) => log::error!("{e}"),
        }
    }

    // Block until the user closes every window, then release everything.
    manager.wait_all();
    manager.shutdown_all();
}
