use std::collections::HashSet;

use sdl2::keyboard::Keycode;

use crate::abs::Viewport;

/// A window-system event the render loop cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// The window's close button was pressed.
    Quit,
    KeyDown(Keycode),
    KeyUp(Keycode),
    /// The framebuffer changed size, in pixels.
    FramebufferResized { width: u32, height: u32 },
}

/// The current state of the keyboard.
#[derive(Default)]
pub struct KeyboardState {
    pub down: HashSet<Keycode>,
    pub pressed: HashSet<Keycode>,
}

impl KeyboardState {
    pub fn is_down(&self, keycode: Keycode) -> bool {
        self.down.contains(&keycode)
    }
}

/// Keyboard state plus the window requests made by input.
#[derive(Default)]
pub struct InputState {
    pub keyboard: KeyboardState,
    should_close: bool,
    pending_viewport: Option<Viewport>,
}

impl InputState {
    /// Forgets the keys pressed during the previous frame.
    pub fn begin_frame(&mut self) {
        self.keyboard.pressed.clear();
    }

    pub fn handle_event(&mut self, event: &InputEvent) {
        match *event {
            InputEvent::Quit => self.should_close = true,
            InputEvent::KeyDown(keycode) => {
                if self.keyboard.down.insert(keycode) {
                    self.keyboard.pressed.insert(keycode);
                }
            }
            InputEvent::KeyUp(keycode) => {
                self.keyboard.down.remove(&keycode);
            }
            InputEvent::FramebufferResized { width, height } => {
                log::debug!("framebuffer resized to {width}x{height}");
                self.pending_viewport = Some(Viewport::from_framebuffer(width, height));
            }
        }
    }

    /// Requests the window to close if Escape is held or was pressed this frame.
    pub fn process_input(&mut self) {
        if self.keyboard.is_down(Keycode::Escape) || self.keyboard.pressed.contains(&Keycode::Escape) {
            self.should_close = true;
        }
    }

    pub fn should_close(&self) -> bool {
        self.should_close
    }

    /// Returns the viewport for the latest resize, once.
    pub fn take_viewport(&mut self) -> Option<Viewport> {
        self.pending_viewport.take()
    }
}
