//! Byte-addressable memory with 3-byte word helpers.
//!
//! A word is 3 bytes, big-endian, covering byte addresses `[3w, 3w + 3)`.
//! Word accessors take *word indices*, byte accessors take *byte addresses*;
//! callers must not mix the two units.

use crate::errors::HaltReason;

/// Default capacity in words. 131072 words * 3 bytes = 384 KiB.
pub const MEMORY_WORDS: usize = 131072;

#[derive(Debug, Clone)]
pub struct Memory {
    bytes: Vec<u8>,
}

impl Memory {
    /// Allocates a zeroed memory of the default capacity.
    pub fn new() -> Self {
        Self::with_words(MEMORY_WORDS)
    }

    pub fn with_words(words: usize) -> Self {
        Self { bytes: vec![0; words * 3] }
    }

    pub fn len_bytes(&self) -> usize {
        self.bytes.len()
    }

    /// Reads the word at `word_index`, combining 3 bytes big-endian.
    pub fn read_word(&self, word_index: usize) -> Result<u32, HaltReason> {
        let addr = word_index * 3;
        if addr + 2 >= self.bytes.len() {
            return Err(HaltReason::OutOfBounds(addr));
        }
        let b1 = self.bytes[addr] as u32;
        let b2 = self.bytes[addr + 1] as u32;
        let b3 = self.bytes[addr + 2] as u32;
        Ok((b1 << 16) | (b2 << 8) | b3)
    }

    /// Writes `value` truncated to 24 bits at `word_index`, big-endian.
    pub fn write_word(&mut self, word_index: usize, value: i32) -> Result<(), HaltReason> {
        let addr = word_index * 3;
        if addr + 2 >= self.bytes.len() {
            return Err(HaltReason::OutOfBounds(addr));
        }
        self.bytes[addr] = ((value >> 16) & 0xFF) as u8;
        self.bytes[addr + 1] = ((value >> 8) & 0xFF) as u8;
        self.bytes[addr + 2] = (value & 0xFF) as u8;
        Ok(())
    }

    /// Reads one byte. Out-of-range reads return 0; the loader and the
    /// character load opcode rely on this lenient policy.
    pub fn get_byte(&self, byte_addr: usize) -> u8 {
        self.bytes.get(byte_addr).copied().unwrap_or(0)
    }

    /// Writes one byte. Out-of-range writes are silently dropped; the
    /// loader's sequential fill relies on this.
    pub fn set_byte(&mut self, byte_addr: usize, value: u8) {
        if let Some(slot) = self.bytes.get_mut(byte_addr) {
            *slot = value;
        }
    }

    /// Zeroes the whole store.
    pub fn clear(&mut self) {
        self.bytes.fill(0);
    }

    /// The raw byte sequence, for display.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}
