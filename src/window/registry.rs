//! Render context registry for cross-thread forced renders.
//!
//! Every call touching a window or its renderer must normally come from the
//! thread that created them. The one sanctioned exception is the event
//! watcher's forced render during an interactive drag, and this registry is
//! its only route to a specific window's resources: a thread-safe map from
//! SDL window id to the raw handles plus the shared animation player.
//!
//! The registry is an explicit, injectable object rather than a process
//! global, so tests can run isolated instances side by side.

use std::sync::Arc;

use log::trace;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use sdl2::render::WindowCanvas;
use sdl2::sys;

use crate::animation::player::AnimationPlayer;

/// Resources needed to force one draw pass for a window from outside its
/// owning thread.
pub struct RenderContext {
    renderer: *mut sys::SDL_Renderer,
    window: *mut sys::SDL_Window,
    player: Arc<Mutex<AnimationPlayer>>,
    window_id: u32,
}

// SAFETY: the raw handles stay valid for as long as the context is
// registered; the owning thread unregisters (write lock) before destroying
// them, and the forced render holds the read lock for the whole draw, so the
// two cannot interleave. The forced path performs draw calls only.
unsafe impl Send for RenderContext {}
unsafe impl Sync for RenderContext {}

impl RenderContext {
    /// Capture the raw handles of a live canvas. The caller must unregister
    /// the context before the canvas is dropped.
    pub fn new(canvas: &WindowCanvas, player: Arc<Mutex<AnimationPlayer>>) -> Self {
        Self {
            renderer: canvas.raw(),
            window: canvas.window().raw(),
            window_id: canvas.window().id(),
            player,
        }
    }

    pub fn window_id(&self) -> u32 {
        self.window_id
    }
}

/// Thread-safe map from window id to [`RenderContext`].
///
/// Registration and removal come from each window's own thread; lookups come
/// from the watcher callback, which may run on any thread that pumps or
/// pushes events.
#[derive(Default)]
pub struct RenderContextRegistry {
    contexts: RwLock<FxHashMap<u32, RenderContext>>,
}

impl RenderContextRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, ctx: RenderContext) {
        trace!("registering render context for window {}", ctx.window_id);
        self.contexts.write().insert(ctx.window_id, ctx);
    }

    pub fn unregister(&self, window_id: u32) {
        if self.contexts.write().remove(&window_id).is_some() {
            trace!("unregistered render context for window {window_id}");
        }
    }

    pub fn contains(&self, window_id: u32) -> bool {
        self.contexts.read().contains_key(&window_id)
    }

    pub fn len(&self) -> usize {
        self.contexts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.read().is_empty()
    }

    /// Run one update + clear + render + present cycle for the window, if it
    /// is registered. Returns whether a context was found; an unknown id is
    /// a no-op so the watcher can race window teardown safely.
    ///
    /// This is the draw-only cross-thread path: it sizes the window to the
    /// current frame and draws, but never creates or destroys resources.
    pub fn forced_render(&self, window_id: u32) -> bool {
        let contexts = self.contexts.read();
        let Some(ctx) = contexts.get(&window_id) else {
            return false;
        };

        let mut player = ctx.player.lock();
        player.update();
        let Some((texture, width, height)) = player.current_frame_raw() else {
            return true;
        };

        unsafe {
            sys::SDL_SetRenderDrawColor(ctx.renderer, 0, 0, 0, 0);
            sys::SDL_RenderClear(ctx.renderer);
            sys::SDL_SetWindowSize(ctx.window, width as i32, height as i32);
            let dst = sys::SDL_FRect {
                x: 0.0,
                y: 0.0,
                w: width as f32,
                h: height as f32,
            };
            sys::SDL_RenderCopyF(ctx.renderer, texture, std::ptr::null(), &dst);
            sys::SDL_RenderPresent(ctx.renderer);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;
    use serial_test::serial;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn forced_render_on_unknown_window_is_noop() {
        let registry = RenderContextRegistry::new();
        assert!(!registry.forced_render(42));
        registry.unregister(42);
        assert!(registry.is_empty());
    }

    #[test]
    #[serial]
    fn register_and_unregister_track_the_window() {
        let dir = tempdir().expect("tempdir");
        testutil::write_frames(dir.path(), &["a.png"]);
        let (_sdl, canvas) = testutil::sdl_canvas();
        let texture_creator = canvas.texture_creator();

        let mut player = AnimationPlayer::new(dir.path());
        player.load_frames(&texture_creator).expect("load");
        let player = Arc::new(Mutex::new(player));

        let registry = RenderContextRegistry::new();
        let window_id = canvas.window().id();
        registry.register(RenderContext::new(&canvas, Arc::clone(&player)));
        assert!(registry.contains(window_id));
        assert_eq!(registry.len(), 1);

        registry.unregister(window_id);
        assert!(!registry.contains(window_id));
        assert!(!registry.forced_render(window_id));

        player.lock().cleanup();
    }

    #[test]
    #[serial]
    fn forced_render_advances_like_the_owning_loop() {
        let dir = tempdir().expect("tempdir");
        testutil::write_frames(dir.path(), &["a.png", "b.png", "c.png"]);
        let (_sdl, canvas) = testutil::sdl_canvas();
        let texture_creator = canvas.texture_creator();

        let mut player = AnimationPlayer::new(dir.path());
        player.load_frames(&texture_creator).expect("load");
        // A zero interval makes every update advance exactly one frame, so
        // the forced path and a plain update() must stay in lockstep.
        player.set_frame_interval(Duration::ZERO);
        let player = Arc::new(Mutex::new(player));

        let registry = RenderContextRegistry::new();
        let window_id = canvas.window().id();
        registry.register(RenderContext::new(&canvas, Arc::clone(&player)));

        assert!(registry.forced_render(window_id));
        assert_eq!(player.lock().current_frame(), 1);
        assert!(registry.forced_render(window_id));
        assert_eq!(player.lock().current_frame(), 2);

        player.lock().update();
        assert_eq!(player.lock().current_frame(), 0, "both paths share the same advance");

        registry.unregister(window_id);
        player.lock().cleanup();
    }
}
