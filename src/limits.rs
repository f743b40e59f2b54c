use chrono::{DateTime, Duration, Utc};

/// Free-tier allowances per feature. Only consulted while the
/// `enforce_usage_limits` configuration flag is on.
pub const FREE_MIC_LIMIT: u32 = 3;
pub const FREE_SCREENSHOT_LIMIT: u32 = 3;
pub const FREE_UPLOAD_LIMIT: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    Mic,
    Screenshots,
    Upload,
}

/// In-memory per-feature counters with a daily reset window.
#[derive(Debug)]
pub struct UsageCounters {
    mic: u32,
    screenshots: u32,
    uploads: u32,
    window_start: DateTime<Utc>,
}

impl Default for UsageCounters {
    fn default() -> Self {
        Self::new()
    }
}

impl UsageCounters {
    pub fn new() -> Self {
        Self {
            mic: 0,
            screenshots: 0,
            uploads: 0,
            window_start: Utc::now(),
        }
    }

    /// Count one use of `feature`. Returns `false` when the allowance is
    /// already exhausted for the current window.
    pub fn try_consume(&mut self, feature: Feature) -> bool {
        self.roll_window();
        let (count, limit) = match feature {
            Feature::Mic => (&mut self.mic, FREE_MIC_LIMIT),
            Feature::Screenshots => (&mut self.screenshots, FREE_SCREENSHOT_LIMIT),
            Feature::Upload => (&mut self.uploads, FREE_UPLOAD_LIMIT),
        };
        if *count >= limit {
            return false;
        }
        *count += 1;
        true
    }

    fn roll_window(&mut self) {
        if Utc::now() - self.window_start >= Duration::hours(24) {
            self.mic = 0;
            self.screenshots = 0;
            self.uploads = 0;
            self.window_start = Utc::now();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowance_exhausts_after_three_uses() {
        let mut usage = UsageCounters::new();
        assert!(usage.try_consume(Feature::Mic));
        assert!(usage.try_consume(Feature::Mic));
        assert!(usage.try_consume(Feature::Mic));
        assert!(!usage.try_consume(Feature::Mic));

        // Other features count independently.
        assert!(usage.try_consume(Feature::Screenshots));
        assert!(usage.try_consume(Feature::Upload));
    }

    #[test]
    fn window_resets_after_a_day() {
        let mut usage = UsageCounters::new();
        for _ in 0..3 {
            assert!(usage.try_consume(Feature::Upload));
        }
        assert!(!usage.try_consume(Feature::Upload));

        usage.window_start = Utc::now() - Duration::hours(25);
        assert!(usage.try_consume(Feature::Upload));
    }
}
