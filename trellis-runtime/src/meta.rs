use std::time::Duration;

/// Bookkeeping of the inflation passes run by a [`ReactiveInflator`](crate::ReactiveInflator).
#[derive(Debug, Default, Clone)]
pub struct Meta {
    /// Number of passes, including failed ones
    pub passes: usize,
    pub failures: usize,
    pub timings: Timings,
}

impl Meta {
    pub(super) fn record(&mut self, elapsed: Duration, failed: bool) {
        self.passes += 1;
        if failed {
            self.failures += 1;
        }
        self.timings.last = elapsed;
        self.timings.total += elapsed;
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Timings {
    pub last: Duration,
    pub total: Duration,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn records_passes() {
        let mut meta = Meta::default();
        meta.record(Duration::from_millis(2), false);
        meta.record(Duration::from_millis(3), true);
        assert_eq!(meta.passes, 2);
        assert_eq!(meta.failures, 1);
        assert_eq!(meta.timings.last, Duration::from_millis(3));
        assert_eq!(meta.timings.total, Duration::from_millis(5));
    }
}
