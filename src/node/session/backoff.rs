use std::time::Duration;

use crate::node::constants::{BACKOFF_BASE_MS, BACKOFF_MAX_EXPONENT};

pub(crate) struct Backoff {
    attempt: u32,
    max_attempts: Option<u32>,
}

impl Backoff {
    pub(crate) fn new(max_attempts: Option<u32>) -> Self {
        Self {
            attempt: 0,
            max_attempts,
        }
    }

    pub(crate) fn next(&mut self) -> Duration {
        self.attempt += 1;
        let delay = BACKOFF_BASE_MS * 2u64.pow((self.attempt - 1).min(BACKOFF_MAX_EXPONENT));
        Duration::from_millis(delay)
    }

    pub(crate) fn is_exhausted(&self) -> bool {
        self.max_attempts
            .map(|max| self.attempt >= max)
            .unwrap_or(false)
    }

    pub(crate) fn reset(&mut self) {
        self.attempt = 0;
    }
}
