//! Window/clock providers supplying (since, until) for a run

use chrono::{Duration, Utc};

use crate::scrape_engine::TimeWindow;

pub trait WindowClock: Send + Sync {
    /// The window a run starting now should collect within
    fn current(&self) -> TimeWindow;
}

/// `[now + lookahead - span, now + lookahead]` in UTC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollingWindow {
    span: Duration,
    lookahead: Duration,
}

impl RollingWindow {
    #[must_use]
    pub const fn new(span: Duration, lookahead: Duration) -> Self {
        Self { span, lookahead }
    }

    #[must_use]
    pub fn span(&self) -> Duration {
        self.span
    }
}

impl WindowClock for RollingWindow {
    fn current(&self) -> TimeWindow {
        let until = Utc::now() + self.lookahead;
        TimeWindow::new(until - self.span, until)
    }
}

/// Always the same window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedWindow(pub TimeWindow);

impl WindowClock for FixedWindow {
    fn current(&self) -> TimeWindow {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rolling_window_spans_and_leads_now() {
        let clock = RollingWindow::new(Duration::hours(24), Duration::minutes(10));
        let before = Utc::now();
        let window = clock.current();
        let after = Utc::now();

        assert_eq!(window.until - window.since, Duration::hours(24));
        assert!(window.until >= before + Duration::minutes(10));
        assert!(window.until <= after + Duration::minutes(10));
        assert!(window.contains(before));
    }
}
