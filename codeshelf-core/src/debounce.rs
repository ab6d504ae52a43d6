//! Scan debouncing.
//!
//! The camera reports the same code many times per second while it stays in
//! frame. [`ScanDebouncer`] remembers only the most recently accepted payload,
//! so alternating codes (A, B, A) are each accepted again.

/// Result of offering a payload to the debouncer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// First sighting since a different payload; process it.
    New,
    /// Same as the last accepted payload; drop it.
    Duplicate,
}

/// Single-slot recency filter for one scanning session.
#[derive(Debug, Clone, Default)]
pub struct ScanDebouncer {
    last_accepted: String,
}

impl ScanDebouncer {
    /// Creates a debouncer with an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Offers a decoded payload.
    pub fn observe(&mut self, candidate: &str) -> Observation {
        if candidate == self.last_accepted {
            return Observation::Duplicate;
        }
        candidate.clone_into(&mut self.last_accepted);
        Observation::New
    }

    /// Returns the last accepted payload (empty before the first one).
    pub fn last_accepted(&self) -> &str {
        &self.last_accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeat_is_duplicate() {
        let mut debouncer = ScanDebouncer::new();
        assert_eq!(debouncer.observe("A"), Observation::New);
        assert_eq!(debouncer.observe("A"), Observation::Duplicate);
        assert_eq!(debouncer.observe("A"), Observation::Duplicate);
    }

    #[test]
    fn test_alternation_is_not_deduplicated() {
        let mut debouncer = ScanDebouncer::new();
        assert_eq!(debouncer.observe("A"), Observation::New);
        assert_eq!(debouncer.observe("A"), Observation::Duplicate);
        assert_eq!(debouncer.observe("B"), Observation::New);
        assert_eq!(debouncer.observe("A"), Observation::New);
        assert_eq!(debouncer.last_accepted(), "A");
    }

    #[test]
    fn test_empty_payload_matches_initial_state() {
        let mut debouncer = ScanDebouncer::new();
        assert_eq!(debouncer.observe(""), Observation::Duplicate);
    }
}
