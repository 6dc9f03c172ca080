//! Window manager: spawn, track, and tear down character windows.
//!
//! The manager owns the registry of active [`CharacterWindow`]s keyed by an
//! opaque id. Status queries take the read lock and may run concurrently;
//! structural changes take the write lock. A background reaper thread wakes
//! every 500 ms and removes entries whose window thread has exited on its
//! own (user pressed Escape, creation failed late), so the registry stays
//! consistent with window state within one tick even if nobody queries it.
//!
//! Per-window failures never propagate across windows: a failed spawn is
//! reported to the caller and leaves everything else untouched.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use log::{debug, error, info};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::animation::characters::{self, CharacterInfo};
use crate::window::character::CharacterWindow;
use crate::window::registry::RenderContextRegistry;

/// How often the reaper removes stopped windows from the registry.
const REAPER_INTERVAL: Duration = Duration::from_millis(500);
/// Bounded wait for a spawned window to either reach running or fail.
const SPAWN_POLL_INTERVAL: Duration = Duration::from_millis(5);
const SPAWN_POLL_LIMIT: u32 = 100;

/// Errors surfaced to the caller of [`WindowManager::spawn`].
#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("character '{0}' not found")]
    CharacterNotFound(String),
    #[error("window for character '{name}' failed to start")]
    WindowFailed { name: String },
}

/// Snapshot of one managed window, shaped for UI consumption.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterWindowInfo {
    pub id: String,
    pub character_name: String,
    pub is_running: bool,
    pub scale: f64,
}

type WindowMap = FxHashMap<String, Arc<CharacterWindow>>;

pub struct WindowManager {
    windows: Arc<RwLock<WindowMap>>,
    render_contexts: Arc<RenderContextRegistry>,
    frames_path: PathBuf,
    reaper: Option<Reaper>,
}

struct Reaper {
    shutdown_tx: Sender<()>,
    handle: JoinHandle<()>,
}

impl WindowManager {
    /// Create a manager over the given frames base directory and spawn the
    /// reaper thread. The render context registry is injected so the caller
    /// can share it with the installed event watcher.
    pub fn new(
        frames_path: impl Into<PathBuf>,
        render_contexts: Arc<RenderContextRegistry>,
    ) -> Self {
        let windows: Arc<RwLock<WindowMap>> = Arc::new(RwLock::new(FxHashMap::default()));
        let (shutdown_tx, shutdown_rx) = bounded(1);
        let handle = thread::spawn({
            let windows = Arc::clone(&windows);
            move || reaper_loop(&windows, &shutdown_rx)
        });
        Self {
            windows,
            render_contexts,
            frames_path: frames_path.into(),
            reaper: Some(Reaper {
                shutdown_tx,
                handle,
            }),
        }
    }

    pub fn frames_path(&self) -> &PathBuf {
        &self.frames_path
    }

    /// Discover the characters available for spawning. Scan errors are
    /// logged and reported as an empty list so the UI stays usable.
    pub fn characters(&self) -> Vec<CharacterInfo> {
        match characters::scan_characters(&self.frames_path) {
            Ok(characters) => characters,
            Err(e) => {
                error!("Error scanning characters: {e}");
                Vec::new()
            }
        }
    }

    /// Spawn a new window for the named character and wait (bounded) until
    /// it reaches running or fails, then report the observed state.
    pub fn spawn(&self, character_name: &str) -> Result<CharacterWindowInfo, SpawnError> {
        let frames_path = characters::character_frames_path(&self.frames_path, character_name);
        if !frames_path.is_dir() {
            return Err(SpawnError::CharacterNotFound(character_name.to_string()));
        }

        let id = format!("{:08x}", fastrand::u32(..));
        let window = Arc::new(CharacterWindow::new(
            &id,
            character_name,
            frames_path,
            Arc::clone(&self.render_contexts),
        ));
        self.windows.write().insert(id.clone(), Arc::clone(&window));
        window.start();

        for _ in 0..SPAWN_POLL_LIMIT {
            if window.is_running() || window.has_stopped() {
                break;
            }
            thread::sleep(SPAWN_POLL_INTERVAL);
        }
        if window.has_stopped() {
            // Creation failed before the window ever ran; the cause is in the
            // window thread's log.
            self.windows.write().remove(&id);
            return Err(SpawnError::WindowFailed {
                name: character_name.to_string(),
            });
        }

        info!("[{id}] spawned character '{character_name}'");
        Ok(window_info(&window))
    }

    /// Close and forget the window with the given id. Returns false for an
    /// unknown id.
    pub fn destroy(&self, id: &str) -> bool {
        let window = self.windows.read().get(id).cloned();
        let Some(window) = window else {
            return false;
        };
        window.close();
        self.windows.write().remove(id);
        true
    }

    /// Snapshot of all windows currently running, eventually consistent with
    /// window state within one reaper interval.
    pub fn list_active(&self) -> Vec<CharacterWindowInfo> {
        self.windows
            .read()
            .values()
            .filter(|window| window.is_running())
            .map(|window| window_info(window))
            .collect()
    }

    /// Forward a scale change to the window with the given id. Returns false
    /// for an unknown id; values below the floor are clamped, not rejected.
    pub fn set_scale(&self, id: &str, scale: f64) -> bool {
        let window = self.windows.read().get(id).cloned();
        match window {
            Some(window) => {
                window.set_scale(scale);
                true
            }
            None => false,
        }
    }

    /// Block until every window the manager still tracks has exited, without
    /// closing them. New windows spawned after the snapshot are not waited on.
    pub fn wait_all(&self) {
        let windows: Vec<Arc<CharacterWindow>> = self.windows.read().values().cloned().collect();
        for window in windows {
            window.wait();
        }
    }

    /// Close every active window and block until all of them have stopped,
    /// so no native resources leak on shutdown.
    pub fn shutdown_all(&self) {
        let windows: Vec<Arc<CharacterWindow>> = {
            let mut map = self.windows.write();
            map.drain().map(|(_, window)| window).collect()
        };
        if windows.is_empty() {
            return;
        }
        info!("Closing {} character window(s)", windows.len());
        for window in &windows {
            window.close();
        }
        for window in &windows {
            window.wait();
        }
    }
}

impl Drop for WindowManager {
    fn drop(&mut self) {
        self.shutdown_all();
        if let Some(reaper) = self.reaper.take() {
            let _ = reaper.shutdown_tx.send(());
            let _ = reaper.handle.join();
        }
    }
}

fn window_info(window: &CharacterWindow) -> CharacterWindowInfo {
    CharacterWindowInfo {
        id: window.id().to_string(),
        character_name: window.character_name().to_string(),
        is_running: window.is_running(),
        scale: window.scale(),
    }
}

/// Reaper body: wake every interval, drop windows whose thread has exited.
/// A shutdown message (or the manager going away) ends the loop.
fn reaper_loop(windows: &RwLock<WindowMap>, shutdown_rx: &Receiver<()>) {
    loop {
        match shutdown_rx.recv_timeout(REAPER_INTERVAL) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
            Err(RecvTimeoutError::Timeout) => {}
        }
        let mut windows = windows.write();
        windows.retain(|id, window| {
            if window.has_stopped() {
                debug!("[{id}] reaped stopped window");
                false
            } else {
                true
            }
        });
    }
}
