//! Keyboard decoding
//!
//! Compiles the keymap the compositor hands us, tracks modifier state and
//! turns raw evdev key codes into keysyms, characters and modifier flags.
//! Key repeat is scheduled here but fired by the run loop.

mod repeat;

use std::fs::File;
use std::os::fd::OwnedFd;
use std::time::Instant;

use log::{debug, trace};
use memmap2::MmapOptions;
use wayland_client::protocol::wl_keyboard::KeymapFormat;
use xkbcommon::xkb;

use crate::error::KeymapError;

pub use repeat::KeyRepeat;

/// Offset between evdev key codes and XKB keycodes.
const EVDEV_OFFSET: u32 = 8;

/// One decoded key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symbol {
    /// Raw evdev code from `wl_keyboard.key`.
    pub key: u32,
    /// XKB keycode, `key + 8`.
    pub keycode: u32,
    pub keysym: xkb::Keysym,
    /// Unicode code point, 0 if the key produces none.
    pub utf32: u32,
}

impl Symbol {
    /// `None` if the evdev code has no XKB keycode.
    fn decode(state: &xkb::State, key: u32) -> Option<Self> {
        let keycode = key.checked_add(EVDEV_OFFSET)?;
        let code = xkb::Keycode::new(keycode);
        Some(Self {
            key,
            keycode,
            keysym: state.key_get_one_sym(code),
            utf32: state.key_get_utf32(code),
        })
    }

    pub fn as_char(&self) -> Option<char> {
        char::from_u32(self.utf32).filter(|c| *c != '\0')
    }
}

/// A key press delivered to the input consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Input {
    pub symbol: Symbol,
    pub mod_ctrl: bool,
    pub mod_alt: bool,
    pub mod_super: bool,
}

/// Consumer of decoded key presses.
pub trait InputHandler {
    fn on_key_press(&mut self, input: &Input);

    /// Whether the handler wants the session to end.
    fn should_quit(&self) -> bool {
        false
    }
}

pub struct Keyboard {
    context: xkb::Context,
    keymap: Option<xkb::Keymap>,
    state: Option<xkb::State>,
    pub repeat: KeyRepeat,
}

impl Default for Keyboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Keyboard {
    pub fn new() -> Self {
        Self {
            context: xkb::Context::new(xkb::CONTEXT_NO_FLAGS),
            keymap: None,
            state: None,
            repeat: KeyRepeat::default(),
        }
    }

    pub fn has_keymap(&self) -> bool {
        self.state.is_some()
    }

    /// Replace the keymap with the one in `fd`. The descriptor is consumed.
    pub fn load_keymap(
        &mut self,
        format: KeymapFormat,
        fd: OwnedFd,
        size: u32,
    ) -> Result<(), KeymapError> {
        let file = File::from(fd);
        if format != KeymapFormat::XkbV1 {
            return Err(KeymapError::UnsupportedFormat);
        }

        // SAFETY: the compositor never modifies a keymap file after sending
        // it, and the private mapping is dropped before returning.
        let map = unsafe {
            MmapOptions::new()
                .len(size as usize)
                .map_copy_read_only(&file)
        }
        .map_err(KeymapError::Map)?;

        let end = map.iter().position(|&b| b == 0).unwrap_or(map.len());
        let text = std::str::from_utf8(&map[..end])?;
        self.load_keymap_str(text)?;

        drop(map);
        drop(file);
        Ok(())
    }

    /// Compile `text` and replace the current keymap and state with it.
    pub fn load_keymap_str(&mut self, text: &str) -> Result<(), KeymapError> {
        let keymap = xkb::Keymap::new_from_string(
            &self.context,
            text.to_owned(),
            xkb::KEYMAP_FORMAT_TEXT_V1,
            xkb::KEYMAP_COMPILE_NO_FLAGS,
        )
        .ok_or(KeymapError::Compile)?;
        let state = xkb::State::new(&keymap);
        self.keymap = Some(keymap);
        self.state = Some(state);
        debug!("Keymap loaded");
        Ok(())
    }

    /// Handle a key release.
    pub fn key_release(&mut self, key: u32, now: Instant) {
        trace!("Key {} released", key);
        match key.checked_add(EVDEV_OFFSET) {
            Some(keycode) => self.repeat.release(keycode, now),
            None => debug!("Dropping release of out-of-range key {}", key),
        }
    }

    /// Handle a key press. Returns the decoded input, or `None` if no keymap
    /// has arrived yet or the key code is out of range.
    pub fn key_press(&mut self, key: u32, now: Instant) -> Option<Input> {
        let (Some(keymap), Some(state)) = (self.keymap.as_ref(), self.state.as_ref()) else {
            debug!("Dropping key {} received before a keymap", key);
            return None;
        };

        let Some(symbol) = Symbol::decode(state, key) else {
            debug!("Dropping out-of-range key {}", key);
            return None;
        };
        let input = Input {
            symbol,
            mod_ctrl: state.mod_name_is_active(xkb::MOD_NAME_CTRL, xkb::STATE_MODS_EFFECTIVE),
            mod_alt: state.mod_name_is_active(xkb::MOD_NAME_ALT, xkb::STATE_MODS_EFFECTIVE),
            mod_super: state.mod_name_is_active(xkb::MOD_NAME_LOGO, xkb::STATE_MODS_EFFECTIVE),
        };

        if keymap.key_repeats(xkb::Keycode::new(symbol.keycode)) && self.repeat.rate != 0 {
            self.repeat.arm(symbol.keycode, now);
        }

        trace!(
            "Key {} pressed: keysym {:#x}, utf32 {:#x}",
            key,
            symbol.keysym.raw(),
            symbol.utf32
        );
        Some(input)
    }

    /// Fire the pending repeat if it is due.
    pub fn fire_repeat(&mut self, now: Instant) -> Option<Input> {
        let keycode = self.repeat.due(now)?;
        let input = self.key_press(keycode - EVDEV_OFFSET, now);
        self.repeat.fired(now);
        input
    }

    pub fn update_modifiers(&mut self, depressed: u32, latched: u32, locked: u32, group: u32) {
        let Some(state) = self.state.as_mut() else {
            debug!("Ignoring modifiers received before a keymap");
            return;
        };
        state.update_mask(depressed, latched, locked, 0, 0, group);
    }

    pub fn set_repeat_info(&mut self, rate: i32, delay: i32) {
        debug!("Key repeat rate {}/s, delay {} ms", rate, delay);
        self.repeat.set_info(rate, delay);
    }
}

#[cfg(test)]
mod tests;
