//! Unit tests for keyboard decoding
//!
//! Uses a small self-contained keymap so no system XKB data is needed.

use super::*;
use std::io::Write;
use std::time::Duration;
use xkbcommon::xkb::keysyms;

const TEST_KEYMAP: &str = include_str!("../../tests/fixtures/keymap.xkb");

const KEY_ESC: u32 = 1;
const KEY_A: u32 = 30;
const KEY_LEFTSHIFT: u32 = 42;

const MASK_SHIFT: u32 = 1 << 0;
const MASK_CONTROL: u32 = 1 << 2;
const MASK_MOD1: u32 = 1 << 3;

fn keymap_fd(text: &str) -> (OwnedFd, u32) {
    let mut file = tempfile::tempfile().expect("tempfile");
    file.write_all(text.as_bytes()).unwrap();
    file.write_all(&[0]).unwrap();
    let size = text.len() as u32 + 1;
    (OwnedFd::from(file), size)
}

fn keyboard() -> Keyboard {
    let mut keyboard = Keyboard::new();
    let (fd, size) = keymap_fd(TEST_KEYMAP);
    keyboard
        .load_keymap(KeymapFormat::XkbV1, fd, size)
        .expect("test keymap compiles");
    keyboard.set_repeat_info(25, 600);
    keyboard
}

#[test]
fn test_load_keymap_from_fd() {
    let keyboard = keyboard();
    assert!(keyboard.has_keymap());
}

#[test]
fn test_reject_unknown_format() {
    let mut keyboard = Keyboard::new();
    let (fd, size) = keymap_fd(TEST_KEYMAP);
    let err = keyboard
        .load_keymap(KeymapFormat::NoKeymap, fd, size)
        .unwrap_err();
    assert!(matches!(err, KeymapError::UnsupportedFormat));
    assert!(!keyboard.has_keymap());
}

#[test]
fn test_reject_garbage_keymap_keeps_previous() {
    let mut keyboard = keyboard();
    let (fd, size) = keymap_fd("this is not a keymap");
    assert!(matches!(
        keyboard.load_keymap(KeymapFormat::XkbV1, fd, size),
        Err(KeymapError::Compile)
    ));
    assert!(keyboard.has_keymap());
}

#[test]
fn test_press_before_keymap_is_dropped() {
    let mut keyboard = Keyboard::new();
    keyboard.set_repeat_info(25, 600);
    assert_eq!(keyboard.key_press(KEY_A, Instant::now()), None);
    assert!(!keyboard.repeat.active);
}

#[test]
fn test_modifiers_before_keymap_are_ignored() {
    let mut keyboard = Keyboard::new();
    keyboard.update_modifiers(MASK_CONTROL, 0, 0, 0);
    assert!(!keyboard.has_keymap());
}

#[test]
fn test_decode_plain_key() {
    let mut keyboard = keyboard();
    let input = keyboard.key_press(KEY_A, Instant::now()).unwrap();
    assert_eq!(input.symbol.key, KEY_A);
    assert_eq!(input.symbol.keycode, KEY_A + 8);
    assert_eq!(input.symbol.keysym.raw(), keysyms::KEY_a);
    assert_eq!(input.symbol.as_char(), Some('a'));
    assert!(!input.mod_ctrl);
    assert!(!input.mod_alt);
    assert!(!input.mod_super);
}

#[test]
fn test_decode_with_shift() {
    let mut keyboard = keyboard();
    keyboard.update_modifiers(MASK_SHIFT, 0, 0, 0);
    let input = keyboard.key_press(KEY_A, Instant::now()).unwrap();
    assert_eq!(input.symbol.keysym.raw(), keysyms::KEY_A);
    assert_eq!(input.symbol.as_char(), Some('A'));
}

#[test]
fn test_decode_ctrl_and_alt() {
    let mut keyboard = keyboard();
    keyboard.update_modifiers(MASK_CONTROL | MASK_MOD1, 0, 0, 0);
    let input = keyboard.key_press(KEY_A, Instant::now()).unwrap();
    assert!(input.mod_ctrl);
    assert!(input.mod_alt);

    keyboard.update_modifiers(0, 0, 0, 0);
    let input = keyboard.key_press(KEY_A, Instant::now()).unwrap();
    assert!(!input.mod_ctrl);
}

#[test]
fn test_press_arms_repeat() {
    let mut keyboard = keyboard();
    let now = Instant::now();
    keyboard.key_press(KEY_A, now).unwrap();
    assert!(keyboard.repeat.active);
    assert_eq!(keyboard.repeat.keycode, KEY_A + 8);
    assert_eq!(keyboard.repeat.next, Some(now + Duration::from_millis(600)));
}

#[test]
fn test_non_repeating_key_does_not_arm() {
    let mut keyboard = keyboard();
    keyboard.key_press(KEY_LEFTSHIFT, Instant::now()).unwrap();
    assert!(!keyboard.repeat.active);
}

#[test]
fn test_zero_rate_disables_repeat() {
    let mut keyboard = keyboard();
    keyboard.set_repeat_info(0, 600);
    keyboard.key_press(KEY_A, Instant::now()).unwrap();
    assert!(!keyboard.repeat.active);
}

#[test]
fn test_release_disarms_only_matching_key() {
    let mut keyboard = keyboard();
    let start = Instant::now();
    keyboard.key_press(KEY_A, start).unwrap();

    let later = start + Duration::from_millis(100);
    keyboard.key_release(KEY_ESC, later);
    assert!(keyboard.repeat.active);
    assert_eq!(keyboard.repeat.next, Some(later + Duration::from_millis(600)));

    keyboard.key_release(KEY_A, later);
    assert!(!keyboard.repeat.active);
}

#[test]
fn test_repeat_info_does_not_touch_armed_repeat() {
    let mut keyboard = keyboard();
    let now = Instant::now();
    keyboard.key_press(KEY_A, now).unwrap();
    keyboard.set_repeat_info(50, 200);
    assert_eq!(keyboard.repeat.next, Some(now + Duration::from_millis(600)));
}

#[test]
fn test_fire_repeat_replays_press() {
    let mut keyboard = keyboard();
    let start = Instant::now();
    keyboard.key_press(KEY_A, start).unwrap();

    assert_eq!(keyboard.fire_repeat(start), None);
    let at = start + Duration::from_millis(600);
    let input = keyboard.fire_repeat(at).expect("repeat is due");
    assert_eq!(input.symbol.keysym.raw(), keysyms::KEY_a);
    assert_eq!(keyboard.repeat.next, Some(at + Duration::from_millis(40)));
}

#[test]
fn test_out_of_range_key_is_dropped() {
    let mut keyboard = keyboard();
    let now = Instant::now();
    keyboard.key_press(KEY_A, now).unwrap();

    assert_eq!(keyboard.key_press(u32::MAX, now), None);
    keyboard.key_release(u32::MAX, now);
    assert!(keyboard.repeat.active);
    assert_eq!(keyboard.repeat.keycode, KEY_A + 8);
    assert_eq!(keyboard.repeat.next, Some(now + Duration::from_millis(600)));
}
