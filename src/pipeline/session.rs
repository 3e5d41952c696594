//! Per-run plate deduplication.

use std::collections::HashSet;

/// Tracks which plate texts have already been reported in the current run.
///
/// One state lives for exactly one processing session (one image, one stream
/// connection, one video). It never persists across runs, so a plate seen in
/// yesterday's video is reported again today.
#[derive(Debug, Default)]
pub struct SessionState {
    seen_text: HashSet<String>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true the first time `text` is seen this session, false after.
    pub fn admit(&mut self, text: &str) -> bool {
        self.seen_text.insert(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_each_text_once() {
        let mut session = SessionState::new();
        assert!(session.admit("KA01AB1234"));
        assert!(!session.admit("KA01AB1234"));
        assert!(session.admit("MH12XY9876"));
        assert!(!session.admit("KA01AB1234"));
    }

    #[test]
    fn fresh_session_forgets_prior_plates() {
        let mut first = SessionState::new();
        assert!(first.admit("KA01AB1234"));

        let mut second = SessionState::new();
        assert!(second.admit("KA01AB1234"));
    }
}
