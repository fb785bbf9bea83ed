use std::time::Duration;

use anyhow::{bail, Result};

/// Round-robin over API keys with backoff once the whole pool has failed.
///
/// State is the current key, the count of consecutive retryable failures,
/// and whether the index has wrapped around the pool at least once.
#[derive(Debug)]
pub struct KeyRotation {
    keys: Vec<String>,
    index: usize,
    consecutive_failures: u32,
    cycled: bool,
    pauses: u32,
    base: Duration,
    max: Duration,
}

impl KeyRotation {
    pub fn new(keys: Vec<String>, base: Duration, max: Duration) -> Result<Self> {
        let keys: Vec<String> = keys
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        if keys.is_empty() {
            bail!("No API keys configured (set HADITH_TRANSLATION__API_KEYS)");
        }
        Ok(KeyRotation {
            keys,
            index: 0,
            consecutive_failures: 0,
            cycled: false,
            pauses: 0,
            base,
            max,
        })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn current(&self) -> &str {
        &self.keys[self.index]
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn on_success(&mut self) {
        self.consecutive_failures = 0;
        self.pauses = 0;
    }

    /// Move to the next key. Returns how long to wait before trying it.
    pub fn on_retryable_failure(&mut self) -> Option<Duration> {
        self.consecutive_failures += 1;
        self.index = (self.index + 1) % self.keys.len();
        if self.index == 0 {
            self.cycled = true;
        }

        if !self.cycled || self.consecutive_failures < 2 {
            return None;
        }
        let pause = self
            .base
            .saturating_mul(2u32.saturating_pow(self.pauses))
            .min(self.max);
        self.pauses += 1;
        Some(pause)
    }
}
