/// Fixed-period trigger on a wrapping millisecond clock.
#[derive(Debug, Clone, Copy)]
pub struct Periodic {
    period_ms: u32,
    last_ms: u32,
}

impl Periodic {
    pub const fn new(period_ms: u32, now_ms: u32) -> Self {
        Self { period_ms, last_ms: now_ms }
    }

    /// True once more than `period_ms` has elapsed; re-arms from `now_ms`.
    pub fn due(&mut self, now_ms: u32) -> bool {
        if now_ms.wrapping_sub(self.last_ms) > self.period_ms {
            self.last_ms = now_ms;
            true
        } else {
            false
        }
    }

    /// Restart the period from `now_ms` without firing.
    pub fn reset(&mut self, now_ms: u32) {
        self.last_ms = now_ms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_after_period_and_rearms() {
        let mut p = Periodic::new(100, 0);
        assert!(!p.due(50));
        assert!(!p.due(100));
        assert!(p.due(101));
        assert!(!p.due(150));
        assert!(p.due(202));
    }

    #[test]
    fn survives_clock_wrap() {
        let mut p = Periodic::new(100, u32::MAX - 20);
        assert!(!p.due(10));
        assert!(p.due(90));
    }

    #[test]
    fn reset_postpones() {
        let mut p = Periodic::new(100, 0);
        p.reset(90);
        assert!(!p.due(150));
        assert!(p.due(191));
    }
}
