//! Memory-mapped keyboard device (spec.md §4.3).

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use crate::device::IoDevice;

const CAPACITY: usize = 32;

const OFFSET_FIRST_CHAR: u32 = 0;
const OFFSET_BUFFER_READY: u32 = 4;
const OFFSET_CURRENT_CHAR: u32 = 8;
const OFFSET_CONTROL: u32 = 12;

const CMD_CONSUME_OLDEST: u32 = 1;
const CMD_CLEAR: u32 = 2;
const CMD_RESET: u32 = 3;

/// A host-originated key event, generic enough not to depend on any
/// particular windowing crate (the key-capture itself is an excluded
/// collaborator; this is the translation contract it targets).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    Enter,
    Backspace,
    Tab,
    Space,
    /// Any other key, carrying its textual representation (e.g. "a", "3").
    Text(char),
}

/// Maps a host key event to the ASCII code Neptune enqueues, per spec.md
/// §4.3: "Enter→0x0A, Backspace→0x08, Tab→0x09, Space→0x20, otherwise the
/// first character of the event's textual representation; no character ⇒
/// no enqueue."
#[must_use]
pub fn keyevent_to_ascii(event: KeyEvent) -> Option<u8> {
    match event {
        KeyEvent::Enter => Some(0x0A),
        KeyEvent::Backspace => Some(0x08),
        KeyEvent::Tab => Some(0x09),
        KeyEvent::Space => Some(0x20),
        KeyEvent::Text(c) => u8::try_from(c as u32).ok(),
    }
}

struct Buffer {
    queue: VecDeque<u8>,
    /// Most recently enqueued character, independent of whether it is still
    /// buffered (it survives oldest-dropped eviction).
    current: u8,
}

impl Buffer {
    fn new() -> Self {
        Self { queue: VecDeque::with_capacity(CAPACITY), current: 0 }
    }

    fn enqueue(&mut self, ch: u8) {
        if self.queue.len() == CAPACITY {
            self.queue.pop_front();
        }
        self.queue.push_back(ch);
        self.current = ch;
    }

    fn first(&self) -> u8 {
        self.queue.front().copied().unwrap_or(0)
    }

    fn buffer_ready(&self) -> bool {
        self.queue.len() >= 2
    }

    fn current_char(&self) -> u8 {
        if self.queue.is_empty() {
            0
        } else {
            self.current
        }
    }

    fn consume_oldest(&mut self) {
        self.queue.pop_front();
        if self.queue.is_empty() {
            self.current = 0;
        }
    }

    fn clear(&mut self) {
        self.queue.clear();
        self.current = 0;
    }
}

/// Handle used by the host input thread to feed key events into the
/// keyboard device without holding a reference to the whole VM.
#[derive(Clone)]
pub struct KeyboardHandle {
    buffer: Arc<Mutex<Buffer>>,
}

impl KeyboardHandle {
    pub fn enqueue(&self, ch: u8) {
        self.lock().enqueue(ch);
    }

    pub fn enqueue_event(&self, event: KeyEvent) {
        if let Some(ch) = keyevent_to_ascii(event) {
            self.enqueue(ch);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Buffer> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A 32-character ring-buffer keyboard with oldest-dropped overflow policy.
///
/// Buffer state lives behind a mutex shared with `KeyboardHandle` so the
/// host input thread can enqueue characters while the execution thread
/// reads registers; every register read and CONTROL command acquires the
/// same lock (spec.md §5).
pub struct Keyboard {
    base: u32,
    buffer: Arc<Mutex<Buffer>>,
}

impl Keyboard {
    #[must_use]
    pub fn new() -> Self {
        Self { base: 0, buffer: Arc::new(Mutex::new(Buffer::new())) }
    }

    #[must_use]
    pub fn handle(&self) -> KeyboardHandle {
        KeyboardHandle { buffer: Arc::clone(&self.buffer) }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Buffer> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Keyboard {
    fn default() -> Self {
        Self::new()
    }
}

impl IoDevice for Keyboard {
    fn base(&self) -> u32 {
        self.base
    }

    fn set_base(&mut self, base: u32) {
        self.base = base;
    }

    fn size(&self) -> u32 {
        16
    }

    fn offset_names(&self) -> &'static [(u32, &'static str)] {
        &[
            (OFFSET_FIRST_CHAR, "FIRST_CHAR"),
            (OFFSET_BUFFER_READY, "BUFFER_READY"),
            (OFFSET_CURRENT_CHAR, "CURRENT_CHAR"),
            (OFFSET_CONTROL, "CONTROL"),
        ]
    }

    fn read_register_word(&mut self, address: u32) -> u32 {
        let offset = address - self.base;
        let buf = self.lock();
        match offset {
            OFFSET_FIRST_CHAR => u32::from(buf.first()),
            OFFSET_BUFFER_READY => u32::from(buf.buffer_ready()),
            OFFSET_CURRENT_CHAR => u32::from(buf.current_char()),
            _ => 0, // CONTROL is write-only.
        }
    }

    fn write_register_word(&mut self, address: u32, value: u32) {
        let offset = address - self.base;
        if offset != OFFSET_CONTROL {
            return;
        }
        let mut buf = self.lock();
        match value {
            CMD_CONSUME_OLDEST => buf.consume_oldest(),
            CMD_CLEAR | CMD_RESET => buf.clear(),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyboard_at(base: u32) -> Keyboard {
        let mut kb = Keyboard::new();
        kb.set_base(base);
        kb
    }

    #[test]
    fn overflow_drops_oldest() {
        let mut kb = keyboard_at(0);
        let handle = kb.handle();
        for i in 0..40u8 {
            handle.enqueue(i);
        }
        assert_eq!(kb.read_register_word(OFFSET_FIRST_CHAR), 8);
        assert_eq!(kb.read_register_word(OFFSET_CURRENT_CHAR), 39);
    }

    #[test]
    fn three_char_scenario_matches_spec() {
        let mut kb = keyboard_at(0);
        let handle = kb.handle();
        handle.enqueue(b'A');
        handle.enqueue(b'B');
        handle.enqueue(b'C');

        assert_eq!(kb.read_register_word(OFFSET_FIRST_CHAR), 0x41);
        assert_eq!(kb.read_register_word(OFFSET_BUFFER_READY), 1);
        assert_eq!(kb.read_register_word(OFFSET_CURRENT_CHAR), 0x43);

        kb.write_register_word(OFFSET_CONTROL, CMD_CONSUME_OLDEST);
        assert_eq!(kb.read_register_word(OFFSET_FIRST_CHAR), 0x42);
        assert_eq!(kb.read_register_word(OFFSET_BUFFER_READY), 1);

        kb.write_register_word(OFFSET_CONTROL, CMD_CONSUME_OLDEST);
        kb.write_register_word(OFFSET_CONTROL, CMD_CONSUME_OLDEST);
        assert_eq!(kb.read_register_word(OFFSET_FIRST_CHAR), 0);
        assert_eq!(kb.read_register_word(OFFSET_BUFFER_READY), 0);
        assert_eq!(kb.read_register_word(OFFSET_CURRENT_CHAR), 0);
    }

    #[test]
    fn keyevent_mapping() {
        assert_eq!(keyevent_to_ascii(KeyEvent::Enter), Some(0x0A));
        assert_eq!(keyevent_to_ascii(KeyEvent::Backspace), Some(0x08));
        assert_eq!(keyevent_to_ascii(KeyEvent::Tab), Some(0x09));
        assert_eq!(keyevent_to_ascii(KeyEvent::Space), Some(0x20));
        assert_eq!(keyevent_to_ascii(KeyEvent::Text('q')), Some(b'q'));
    }

    #[test]
    fn unaligned_byte_read_of_first_char() {
        let mut kb = keyboard_at(0x100);
        kb.handle().enqueue(b'Z');
        assert_eq!(IoDevice::read_byte(&mut kb, 0x100), b'Z');
    }
}
