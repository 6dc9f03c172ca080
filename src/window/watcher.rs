//! Global event watcher keeping animations alive during window drags.
//!
//! On some platforms an interactive move or resize runs inside an OS modal
//! loop that suspends the dragged window's own event polling, which would
//! freeze the animation for the whole drag. The watcher is installed once on
//! the process event stream, before any window exists; whenever a moved,
//! resized, or exposed event carries the id of a registered window it drives
//! one forced render through the [`RenderContextRegistry`], synchronously,
//! on whatever thread delivered the event. The event itself is never
//! consumed, and an unregistered id is a no-op.

use std::sync::Arc;

use log::trace;
use sdl2::EventSubsystem;
use sdl2::event::{Event, EventWatch, WindowEvent};

use crate::window::registry::RenderContextRegistry;

fn wants_forced_render(win_event: &WindowEvent) -> bool {
    matches!(
        win_event,
        WindowEvent::Moved(..) | WindowEvent::Resized(..) | WindowEvent::Exposed
    )
}

/// Install the watcher. The returned guard removes it when dropped, so keep
/// it alive for the lifetime of the process.
pub fn install(
    events: &EventSubsystem,
    registry: Arc<RenderContextRegistry>,
) -> EventWatch<'_, impl FnMut(Event)> {
    events.add_event_watch(move |event: Event| {
        if let Event::Window {
            window_id,
            win_event,
            ..
        } = event
        {
            if wants_forced_render(&win_event) && registry.forced_render(window_id) {
                trace!("forced render for window {window_id} ({win_event:?})");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::player::AnimationPlayer;
    use crate::testutil;
    use crate::window::registry::RenderContext;
    use parking_lot::Mutex;
    use serial_test::serial;
    use std::time::Duration;
    use tempfile::tempdir;

    fn moved_event(window_id: u32) -> Event {
        Event::Window {
            timestamp: 0,
            window_id,
            win_event: WindowEvent::Moved(10, 10),
        }
    }

    #[test]
    #[serial]
    fn watcher_renders_registered_windows_on_move() {
        let dir = tempdir().expect("tempdir");
        testutil::write_frames(dir.path(), &["a.png", "b.png"]);
        let (sdl, canvas) = testutil::sdl_canvas();
        let events = sdl.event().expect("event subsystem");
        let texture_creator = canvas.texture_creator();

        let mut player = AnimationPlayer::new(dir.path());
        player.load_frames(&texture_creator).expect("load");
        player.set_frame_interval(Duration::ZERO);
        let player = Arc::new(Mutex::new(player));

        let registry = Arc::new(RenderContextRegistry::new());
        let _watch = install(&events, Arc::clone(&registry));

        let window_id = canvas.window().id();
        registry.register(RenderContext::new(&canvas, Arc::clone(&player)));

        // Watch callbacks run synchronously while the event is pushed.
        events.push_event(moved_event(window_id)).expect("push");
        assert_eq!(player.lock().current_frame(), 1);

        events.push_event(moved_event(window_id)).expect("push");
        assert_eq!(player.lock().current_frame(), 0, "wraps like the owning loop");

        registry.unregister(window_id);
        player.lock().cleanup();
    }

    #[test]
    #[serial]
    fn watcher_ignores_unknown_and_unregistered_windows() {
        let dir = tempdir().expect("tempdir");
        testutil::write_frames(dir.path(), &["a.png", "b.png"]);
        let (sdl, canvas) = testutil::sdl_canvas();
        let events = sdl.event().expect("event subsystem");
        let texture_creator = canvas.texture_creator();

        let mut player = AnimationPlayer::new(dir.path());
        player.load_frames(&texture_creator).expect("load");
        player.set_frame_interval(Duration::ZERO);
        let player = Arc::new(Mutex::new(player));

        let registry = Arc::new(RenderContextRegistry::new());
        let _watch = install(&events, Arc::clone(&registry));

        // Never-registered id: nothing happens.
        events.push_event(moved_event(9999)).expect("push");
        assert_eq!(player.lock().current_frame(), 0);

        // Registered, then concurrently unregistered: also a no-op.
        let window_id = canvas.window().id();
        registry.register(RenderContext::new(&canvas, Arc::clone(&player)));
        registry.unregister(window_id);
        events.push_event(moved_event(window_id)).expect("push");
        assert_eq!(player.lock().current_frame(), 0);

        player.lock().cleanup();
    }
}
