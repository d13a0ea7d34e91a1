//! Compact character alphabet for the double array.
//!
//! Only characters that occur in the dictionary get a code, numbered from 1 in
//! order of first appearance. Code 0 is reserved for the end-of-key marker.
//! Keeping the codes dense keeps sibling sets narrow, which is what lets the
//! packer fit them into small free regions of `base/check`.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// The end-of-key code (terminal leaf transition).
pub(crate) const END_OF_KEY: u32 = 0;

const ASCII_LEN: usize = 128;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Alphabet {
    /// Direct table for ASCII; 0 means "not in the dictionary".
    ascii: Vec<u32>,
    other: AHashMap<char, u32>,
    size: u32,
}

impl Default for Alphabet {
    fn default() -> Self {
        Self {
            ascii: vec![0; ASCII_LEN],
            other: AHashMap::new(),
            size: 0,
        }
    }
}

impl Alphabet {
    /// Code of `ch`, assigning the next free one on first sight.
    pub(crate) fn intern(&mut self, ch: char) -> u32 {
        if let Some(code) = self.code(ch) {
            return code;
        }
        self.size += 1;
        let code = self.size;
        if ch.is_ascii() {
            self.ascii[ch as usize] = code;
        } else {
            self.other.insert(ch, code);
        }
        code
    }

    /// Code of `ch`, or `None` when no dictionary key contains it.
    #[inline]
    pub(crate) fn code(&self, ch: char) -> Option<u32> {
        let code = if ch.is_ascii() {
            self.ascii.get(ch as usize).copied().unwrap_or(0)
        } else {
            self.other.get(&ch).copied().unwrap_or(0)
        };
        (code != END_OF_KEY).then_some(code)
    }

    pub(crate) fn len(&self) -> usize {
        self.size as usize
    }
}
