//! Per-thread platform event handling for character windows.
//!
//! SDL keeps a single process-global event queue, and the safe binding
//! allows only one `EventPump` in the whole process, while every character
//! window runs its own polling loop on its own thread. Window threads
//! therefore drain the queue through the raw API (the queue itself is
//! internally locked) and translate the few events they care about into
//! [`WindowInput`] values, filtered by the target window id carried on
//! keyboard events.

use std::mem::MaybeUninit;
use std::os::raw::c_void;

use log::warn;
use sdl2::event::EventType;
use sdl2::keyboard::Keycode;
use sdl2::sys;
use sdl2::video::Window;

/// Inputs a character window's loop reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowInput {
    /// Application-level quit request.
    Quit,
    /// Close key (Escape) pressed in this window.
    Close,
    ScaleUp,
    ScaleDown,
}

/// Drain all pending events, returning the inputs addressed to this window.
/// Keyboard events for other windows are ignored; the loop never blocks.
pub fn drain_events(window_id: u32) -> Vec<WindowInput> {
    let mut inputs = Vec::new();
    let mut raw = MaybeUninit::<sys::SDL_Event>::uninit();
    while unsafe { sys::SDL_PollEvent(raw.as_mut_ptr()) } == 1 {
        let event = unsafe { raw.assume_init() };
        let kind = unsafe { event.type_ };
        if kind == EventType::Quit as u32 {
            inputs.push(WindowInput::Quit);
        } else if kind == EventType::KeyDown as u32 {
            let key = unsafe { event.key };
            if key.windowID != window_id {
                continue;
            }
            match Keycode::from_i32(key.keysym.sym) {
                Some(Keycode::Escape) => inputs.push(WindowInput::Close),
                Some(Keycode::Up) => inputs.push(WindowInput::ScaleUp),
                Some(Keycode::Down) => inputs.push(WindowInput::ScaleDown),
                _ => {}
            }
        }
    }
    inputs
}

unsafe extern "C" fn hit_test_draggable(
    _window: *mut sys::SDL_Window,
    _area: *const sys::SDL_Point,
    _data: *mut c_void,
) -> sys::SDL_HitTestResult {
    sys::SDL_HitTestResult::SDL_HITTEST_DRAGGABLE
}

/// Report the whole window surface as draggable, so the borderless overlay
/// can be moved by grabbing it anywhere.
pub fn make_window_draggable(window: &Window) {
    let rc = unsafe {
        sys::SDL_SetWindowHitTest(window.raw(), Some(hit_test_draggable), std::ptr::null_mut())
    };
    if rc != 0 {
        warn!(
            "could not set hit test for window {}: {}",
            window.id(),
            sdl2::get_error()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;
    use sdl2::event::Event;
    use sdl2::keyboard::Mod;
    use serial_test::serial;

    fn key_event(window_id: u32, keycode: Keycode) -> Event {
        Event::KeyDown {
            timestamp: 0,
            window_id,
            keycode: Some(keycode),
            scancode: None,
            keymod: Mod::empty(),
            repeat: false,
        }
    }

    #[test]
    #[serial]
    fn drains_own_key_events_and_ignores_others() {
        let (sdl, canvas) = testutil::sdl_canvas();
        let events = sdl.event().expect("event subsystem");
        let window_id = canvas.window().id();

        events.push_event(key_event(window_id, Keycode::Up)).expect("push");
        events
            .push_event(key_event(window_id + 1, Keycode::Down))
            .expect("push");
        events
            .push_event(key_event(window_id, Keycode::Escape))
            .expect("push");
        events.push_event(Event::Quit { timestamp: 0 }).expect("push");

        let inputs = drain_events(window_id);
        assert_eq!(
            inputs,
            [WindowInput::ScaleUp, WindowInput::Close, WindowInput::Quit]
        );

        // Queue fully drained.
        assert!(drain_events(window_id).is_empty());
    }

    #[test]
    #[serial]
    fn hit_test_installs_on_a_real_window() {
        let (_sdl, canvas) = testutil::sdl_canvas();
        // Whether or not the dummy driver supports hit tests, this must not
        // panic; an unsupported driver only logs a warning.
        make_window_draggable(canvas.window());
    }
}
