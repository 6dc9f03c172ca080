//! Character overlay windows.
//!
//! Each [`CharacterWindow`] owns one borderless, always-on-top overlay
//! window displaying a looping character animation. SDL requires that a
//! window and its renderer are only touched from the thread that created
//! them, so every window runs a dedicated OS thread for its whole life:
//! creation, the polling/render loop, and teardown all happen there. The
//! rest of the process talks to the window exclusively through signals:
//!
//! - close: an atomic latch, idempotent and safe from any thread
//! - scale: a one-slot channel where the latest sent value wins
//! - `running` / `current_scale`: atomic cells readable from any thread
//! - completion: observed by [`CharacterWindow::wait`]
//!
//! The loop never blocks on the signals; it polls them each tick so it can
//! also service platform events and render at a steady cadence. The render
//! cadence (~60 Hz) is deliberately decoupled from the animation's own
//! frame interval.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TryRecvError, bounded};
use crossbeam_utils::atomic::AtomicCell;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use sdl2::pixels::Color;
use sdl2::render::{BlendMode, WindowCanvas};
use sdl2::sys;
use thiserror::Error;

use crate::animation::player::{AnimationPlayer, DEFAULT_SCALE, FrameLoadError};
use crate::window::events::{self, WindowInput};
use crate::window::registry::{RenderContext, RenderContextRegistry};

/// Cadence of the window loop (~60 Hz), independent of the animation rate.
const LOOP_INTERVAL: Duration = Duration::from_millis(16);
/// Initial window size before the first render resizes to the frame extent.
const INITIAL_WINDOW_SIZE: u32 = 400;

#[derive(Debug, Error)]
enum WindowError {
    #[error("window/renderer creation failed: {0}")]
    ResourceCreation(String),
    #[error(transparent)]
    FrameLoad(#[from] FrameLoadError),
}

/// One character window and its control signals. All methods are safe to
/// call from any thread; the window itself lives on its dedicated thread
/// between [`CharacterWindow::start`] and the completion signal.
pub struct CharacterWindow {
    id: String,
    character_name: String,
    frames_path: PathBuf,
    registry: Arc<RenderContextRegistry>,
    running: Arc<AtomicBool>,
    close_requested: Arc<AtomicBool>,
    current_scale: Arc<AtomicCell<f64>>,
    scale_tx: Sender<f64>,
    scale_rx: Receiver<f64>,
    done_tx: Mutex<Option<Sender<()>>>,
    done_rx: Receiver<()>,
}

impl CharacterWindow {
    pub fn new(
        id: impl Into<String>,
        character_name: impl Into<String>,
        frames_path: impl Into<PathBuf>,
        registry: Arc<RenderContextRegistry>,
    ) -> Self {
        let (scale_tx, scale_rx) = bounded(1);
        let (done_tx, done_rx) = bounded(0);
        Self {
            id: id.into(),
            character_name: character_name.into(),
            frames_path: frames_path.into(),
            registry,
            running: Arc::new(AtomicBool::new(false)),
            close_requested: Arc::new(AtomicBool::new(false)),
            current_scale: Arc::new(AtomicCell::new(DEFAULT_SCALE)),
            scale_tx,
            scale_rx,
            done_tx: Mutex::new(Some(done_tx)),
            done_rx,
        }
    }

    /// Launch the dedicated window thread. Calling this more than once is a
    /// caller error and is not guarded against.
    pub fn start(&self) {
        let worker = WindowWorker {
            id: self.id.clone(),
            character_name: self.character_name.clone(),
            frames_path: self.frames_path.clone(),
            registry: Arc::clone(&self.registry),
            running: Arc::clone(&self.running),
            close_requested: Arc::clone(&self.close_requested),
            current_scale: Arc::clone(&self.current_scale),
            scale_rx: self.scale_rx.clone(),
            _done_tx: self.done_tx.lock().take(),
        };
        let spawned = thread::Builder::new()
            .name(format!("window-{}", self.id))
            .spawn(move || worker.run());
        if let Err(e) = spawned {
            error!("[{}] failed to spawn window thread: {}", self.id, e);
        }
    }

    /// Signal the window to close. Idempotent: any number of calls from any
    /// threads results in at most one close, and none of them block.
    pub fn close(&self) {
        if !self.close_requested.swap(true, Ordering::SeqCst) {
            debug!("[{}] close requested", self.id);
        }
    }

    /// Best-effort delivery of a new scale factor. Never blocks; if the
    /// window is slower than the caller, intermediate values are dropped and
    /// the latest one wins.
    pub fn set_scale(&self, scale: f64) {
        if self.scale_tx.try_send(scale).is_err() {
            let _ = self.scale_rx.try_recv();
            let _ = self.scale_tx.try_send(scale);
        }
    }

    /// Last scale the window applied, or the default before the first apply.
    pub fn scale(&self) -> f64 {
        self.current_scale.load()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Whether the window thread has exited (or never managed to start).
    /// Distinct from `!is_running()`, which is also true while the window is
    /// still starting up.
    pub fn has_stopped(&self) -> bool {
        matches!(self.done_rx.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Block until the window thread exits. Returns immediately if it
    /// already has.
    pub fn wait(&self) {
        let _ = self.done_rx.recv();
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn character_name(&self) -> &str {
        &self.character_name
    }

    pub fn frames_path(&self) -> &Path {
        &self.frames_path
    }
}

/// Everything the window thread owns. Dropping the worker (normal return or
/// unwind) releases `_done_tx`, which is what fires the completion signal.
struct WindowWorker {
    id: String,
    character_name: String,
    frames_path: PathBuf,
    registry: Arc<RenderContextRegistry>,
    running: Arc<AtomicBool>,
    close_requested: Arc<AtomicBool>,
    current_scale: Arc<AtomicCell<f64>>,
    scale_rx: Receiver<f64>,
    _done_tx: Option<Sender<()>>,
}

impl WindowWorker {
    fn run(self) {
        debug!("[{}] window thread starting", self.id);
        match self.create_and_run() {
            Ok(()) => info!("[{}] character window closed", self.id),
            Err(e) => error!("[{}] {}", self.id, e),
        }
    }

    /// Create the window, renderer, and animation on this thread, then run
    /// the loop. Resources are released on every exit path, in reverse
    /// creation order, before the completion signal fires.
    fn create_and_run(&self) -> Result<(), WindowError> {
        let sdl = sdl2::init().map_err(WindowError::ResourceCreation)?;
        let video = sdl.video().map_err(WindowError::ResourceCreation)?;

        let title = format!("Deskling - {}", self.character_name);
        let window = video
            .window(&title, INITIAL_WINDOW_SIZE, INITIAL_WINDOW_SIZE)
            .set_window_flags(sys::SDL_WindowFlags::SDL_WINDOW_ALWAYS_ON_TOP as u32)
            .borderless()
            .build()
            .map_err(|e| WindowError::ResourceCreation(e.to_string()))?;
        events::make_window_draggable(&window);

        let mut canvas = window
            .into_canvas()
            .build()
            .map_err(|e| WindowError::ResourceCreation(e.to_string()))?;
        canvas.set_blend_mode(BlendMode::Blend);
        let texture_creator = canvas.texture_creator();

        let mut player = AnimationPlayer::new(&self.frames_path);
        player.set_scale(self.current_scale.load());
        player.load_frames(&texture_creator)?;
        self.current_scale.store(player.scale());
        let player = Arc::new(Mutex::new(player));

        let window_id = canvas.window().id();
        self.registry
            .register(RenderContext::new(&canvas, Arc::clone(&player)));
        self.running.store(true, Ordering::SeqCst);
        info!(
            "[{}] character window running (Up/Down = scale, Escape = close)",
            self.id
        );

        self.event_loop(&mut canvas, &player, window_id);
        self.running.store(false, Ordering::SeqCst);

        self.registry.unregister(window_id);
        player.lock().cleanup();
        Ok(())
    }

    fn event_loop(
        &self,
        canvas: &mut WindowCanvas,
        player: &Arc<Mutex<AnimationPlayer>>,
        window_id: u32,
    ) {
        loop {
            if self.close_requested.load(Ordering::SeqCst) {
                info!("[{}] received close signal", self.id);
                return;
            }

            if let Some(scale) = self.scale_rx.try_iter().last() {
                let mut player = player.lock();
                player.set_scale(scale);
                self.current_scale.store(player.scale());
                info!("[{}] scale set to {:.2}", self.id, player.scale());
            }

            for input in events::drain_events(window_id) {
                match input {
                    WindowInput::Quit | WindowInput::Close => {
                        info!("[{}] closing on user input", self.id);
                        return;
                    }
                    WindowInput::ScaleUp => {
                        let mut player = player.lock();
                        player.scale_up();
                        self.current_scale.store(player.scale());
                    }
                    WindowInput::ScaleDown => {
                        let mut player = player.lock();
                        player.scale_down();
                        self.current_scale.store(player.scale());
                    }
                }
            }

            {
                let mut player = player.lock();
                player.update();
                canvas.set_draw_color(Color::RGBA(0, 0, 0, 0));
                canvas.clear();
                if let Err(e) = player.render(canvas) {
                    warn!("[{}] render failed: {}", self.id, e);
                    return;
                }
                canvas.present();
            }

            thread::sleep(LOOP_INTERVAL);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::player::MIN_SCALE;
    use crate::testutil;
    use serial_test::serial;
    use std::time::Instant;
    use tempfile::tempdir;

    fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        condition()
    }

    fn spawn_window(frames: &Path) -> (Arc<RenderContextRegistry>, CharacterWindow) {
        // Window threads inherit the dummy video driver set here.
        unsafe { std::env::set_var("SDL_VIDEODRIVER", "dummy") };
        let registry = Arc::new(RenderContextRegistry::new());
        let window = CharacterWindow::new("w1", "tester", frames, Arc::clone(&registry));
        (registry, window)
    }

    #[test]
    fn scale_defaults_before_start() {
        let registry = Arc::new(RenderContextRegistry::new());
        let window = CharacterWindow::new("w0", "tester", "unused", registry);
        assert_eq!(window.scale(), DEFAULT_SCALE);
        assert!(!window.is_running());
        assert!(!window.has_stopped());
    }

    #[test]
    fn set_scale_never_blocks_without_a_consumer() {
        let registry = Arc::new(RenderContextRegistry::new());
        let window = CharacterWindow::new("w0", "tester", "unused", registry);
        for i in 0..100 {
            window.set_scale(0.2 + f64::from(i) * 0.01);
        }
        // Only the most recent value is left in the slot.
        assert_eq!(window.scale_rx.try_iter().last(), Some(0.2 + 99.0 * 0.01));
    }

    #[test]
    #[serial]
    fn window_runs_applies_scale_and_closes() {
        let dir = tempdir().expect("tempdir");
        testutil::write_frames(dir.path(), &["a.png", "b.png"]);
        let (registry, window) = spawn_window(dir.path());

        window.start();
        assert!(
            wait_until(Duration::from_secs(5), || window.is_running()),
            "window never reached running"
        );
        assert_eq!(registry.len(), 1);

        window.set_scale(1.5);
        assert!(
            wait_until(Duration::from_secs(5), || window.scale() == 1.5),
            "scale update never applied"
        );

        // Below-floor values are clamped by the player, not rejected.
        window.set_scale(0.01);
        assert!(
            wait_until(Duration::from_secs(5), || window.scale() == MIN_SCALE),
            "clamped scale never applied"
        );

        window.close();
        window.wait();
        assert!(!window.is_running());
        assert!(window.has_stopped());
        assert!(registry.is_empty(), "context must be unregistered on close");
    }

    #[test]
    #[serial]
    fn close_is_idempotent_under_concurrency() {
        let dir = tempdir().expect("tempdir");
        testutil::write_frames(dir.path(), &["a.png"]);
        let (_registry, window) = spawn_window(dir.path());

        window.start();
        assert!(wait_until(Duration::from_secs(5), || window.is_running()));

        let window = Arc::new(window);
        let closers: Vec<_> = (0..8)
            .map(|_| {
                let window = Arc::clone(&window);
                thread::spawn(move || {
                    for _ in 0..10 {
                        window.close();
                    }
                })
            })
            .collect();
        for closer in closers {
            closer.join().expect("closer thread");
        }

        window.wait();
        window.close();
        assert!(!window.is_running());
    }

    #[test]
    #[serial]
    fn missing_frames_directory_never_reaches_running() {
        let dir = tempdir().expect("tempdir");
        let missing = dir.path().join("gone");
        let (registry, window) = spawn_window(&missing);

        window.start();
        window.wait();
        assert!(!window.is_running());
        assert!(window.has_stopped());
        assert!(registry.is_empty());
    }
}
