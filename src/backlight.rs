//! Self-calibrating backlight driven by an LDR.
//!
//! The controller learns the sensor's working span on-line (with a slow decay
//! so stale extremes fade), maps each sample into the duty range, smooths the
//! result with an EMA and drives the PWM output. A sensor that sits on a rail
//! for too long is latched as faulty and the panel is held at a fixed safe
//! brightness until reboot.

use log::{info, warn};

use crate::hal::PwmOutput;

/// Consecutive extreme samples tolerated before the sensor is latched faulty.
pub const FAULT_STREAK_THRESHOLD: u8 = 20;

const DIAG_INTERVAL_MS: u32 = 2_000;
const EMA_KEEP: f32 = 0.85;
const EMA_TAKE: f32 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BacklightConfig {
    /// Full-scale ADC reading (4095 for the 12-bit ESP32 ADC).
    pub sensor_max: u16,
    /// Samples within this distance of either rail count as extreme.
    pub guard_band: u16,
    pub duty_min: u8,
    pub duty_max: u8,
    /// Duty held once the sensor is latched faulty.
    pub fallback_duty: u8,
    /// Brighter room gives a dimmer panel when set.
    pub invert: bool,
    /// Bounds used until a real span has been learned.
    pub seed_lo: u16,
    pub seed_hi: u16,
    /// Narrowest span the mapping will divide by.
    pub min_span: u16,
    /// False pins the panel at `duty_max` and ignores the sensor.
    pub sensor_enabled: bool,
}

impl Default for BacklightConfig {
    fn default() -> Self {
        Self {
            sensor_max: 4095,
            guard_band: 5,
            duty_min: 24,
            duty_max: 255,
            fallback_duty: 200,
            invert: false,
            seed_lo: 20,
            seed_hi: 200,
            min_span: 40,
            sensor_enabled: true,
        }
    }
}

/// Everything the controller remembers between ticks.
#[derive(Debug, Clone, PartialEq)]
pub struct AmbientLightState {
    pub learned_min: u16,
    pub learned_max: u16,
    pub bad_streak: u8,
    pub sensor_faulty: bool,
    pub smoothed_duty: f32,
}

impl AmbientLightState {
    pub fn new(cfg: &BacklightConfig) -> Self {
        Self {
            learned_min: cfg.sensor_max,
            learned_max: 0,
            bad_streak: 0,
            sensor_faulty: false,
            smoothed_duty: cfg.duty_max as f32,
        }
    }
}

/// Result of one controller step, mostly for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub raw: u16,
    pub lo: u16,
    pub hi: u16,
    /// Pre-smoothing target; `None` when the sensor is faulty or disabled.
    pub target: Option<u8>,
    /// Duty actually written to the PWM output.
    pub duty: u8,
}

pub struct BacklightController {
    cfg: BacklightConfig,
    state: AmbientLightState,
    last_diag_ms: u32,
}

impl BacklightController {
    pub fn new(cfg: BacklightConfig) -> Self {
        Self {
            state: AmbientLightState::new(&cfg),
            cfg,
            last_diag_ms: 0,
        }
    }

    pub fn config(&self) -> &BacklightConfig {
        &self.cfg
    }

    pub fn state(&self) -> &AmbientLightState {
        &self.state
    }

    pub fn is_faulty(&self) -> bool {
        self.state.sensor_faulty
    }

    /// Initial duty applied at boot, before the first sample.
    pub fn startup_duty(&self) -> u8 {
        self.cfg.duty_max
    }

    /// Fold one raw sample into the learned state and drive `pwm`.
    pub fn tick(&mut self, raw: u16, now_ms: u32, pwm: &mut impl PwmOutput) -> TickReport {
        if !self.cfg.sensor_enabled {
            let duty = self.cfg.duty_max;
            pwm.set_duty(duty);
            return TickReport { raw, lo: 0, hi: 0, target: None, duty };
        }

        let extreme = self.is_extreme(raw);
        self.track_streak(extreme);
        if !extreme {
            self.learn(raw);
        }
        let (lo, hi) = self.working_bounds();

        if self.state.sensor_faulty {
            let duty = self.clamp_duty(self.cfg.fallback_duty as f32);
            pwm.set_duty(duty);
            if self.diag_due(now_ms) {
                warn!("LDR invalid -> fixed BL={} (raw={})", duty, raw);
            }
            return TickReport { raw, lo, hi, target: None, duty };
        }

        let target = self.target_for(raw, lo, hi);
        let blended = EMA_KEEP * self.state.smoothed_duty + EMA_TAKE * target as f32;
        self.state.smoothed_duty = blended.clamp(self.cfg.duty_min as f32, self.cfg.duty_max as f32);
        let duty = self.clamp_duty(self.state.smoothed_duty);
        pwm.set_duty(duty);

        if self.diag_due(now_ms) {
            info!("LDR={} map[{}..{}] -> BL={}", raw, lo, hi, duty);
        }
        TickReport { raw, lo, hi, target: Some(target), duty }
    }

    /// Pre-smoothing duty target for `raw` against the bounds `[lo, hi]`.
    pub fn target_for(&self, raw: u16, lo: u16, hi: u16) -> u8 {
        let span = (hi as f32 - lo as f32).max(1.0);
        let norm = ((raw as f32 - lo as f32) / span).clamp(0.0, 1.0);
        let level = if self.cfg.invert { 1.0 - norm } else { norm };
        let range = (self.cfg.duty_max as f32 - self.cfg.duty_min as f32).max(0.0);
        // Truncation matches the integer PWM register.
        (self.cfg.duty_min as f32 + level * range) as u8
    }

    /// Bounds the current sample is normalized against.
    pub fn working_bounds(&self) -> (u16, u16) {
        let lo = if self.state.learned_min == self.cfg.sensor_max {
            self.cfg.seed_lo
        } else {
            self.state.learned_min
        };
        let hi = if self.state.learned_max == 0 {
            self.cfg.seed_hi
        } else {
            self.state.learned_max
        };

        if (hi as i32) - (lo as i32) < self.cfg.min_span as i32 {
            let lo = lo.saturating_sub(10);
            return (lo, lo.saturating_add(self.cfg.min_span));
        }
        (lo, hi)
    }

    fn is_extreme(&self, raw: u16) -> bool {
        raw <= self.cfg.guard_band || raw >= self.cfg.sensor_max.saturating_sub(self.cfg.guard_band)
    }

    fn track_streak(&mut self, extreme: bool) {
        self.state.bad_streak = if extreme {
            self.state.bad_streak.saturating_add(1)
        } else {
            0
        };
        if self.state.bad_streak > FAULT_STREAK_THRESHOLD && !self.state.sensor_faulty {
            self.state.sensor_faulty = true;
            warn!(
                "LDR railed for {} samples, holding backlight at {}",
                self.state.bad_streak, self.cfg.fallback_duty
            );
        }
    }

    fn learn(&mut self, raw: u16) {
        let min = self.state.learned_min.min(raw) as u32;
        let max = self.state.learned_max.max(raw) as u32;
        let raw = raw as u32;
        self.state.learned_min = ((min * 9 + raw) / 10) as u16;
        self.state.learned_max = ((max * 9 + raw) / 10) as u16;
    }

    fn clamp_duty(&self, duty: f32) -> u8 {
        duty.clamp(self.cfg.duty_min as f32, self.cfg.duty_max as f32) as u8
    }

    fn diag_due(&mut self, now_ms: u32) -> bool {
        if now_ms.wrapping_sub(self.last_diag_ms) > DIAG_INTERVAL_MS {
            self.last_diag_ms = now_ms;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakePwm {
        writes: Vec<u8>,
    }

    impl PwmOutput for FakePwm {
        fn set_duty(&mut self, duty: u8) {
            self.writes.push(duty);
        }
    }

    fn learned(cfg: BacklightConfig) -> BacklightController {
        let mut ctl = BacklightController::new(cfg);
        let mut pwm = FakePwm::default();
        for (i, raw) in [300u16, 2500, 300, 2500, 1200].iter().enumerate() {
            ctl.tick(*raw, i as u32 * 100, &mut pwm);
        }
        ctl
    }

    #[test]
    fn seeds_bounds_until_something_is_learned() {
        let ctl = BacklightController::new(BacklightConfig::default());
        assert_eq!(ctl.working_bounds(), (20, 200));
        assert_eq!(ctl.state().smoothed_duty, 255.0);
    }

    #[test]
    fn learning_decays_toward_sample() {
        let mut ctl = BacklightController::new(BacklightConfig::default());
        let mut pwm = FakePwm::default();
        ctl.tick(1000, 0, &mut pwm);
        // min(4095, 1000) = 1000 -> (9000 + 1000) / 10; max(0, 1000) likewise.
        assert_eq!(ctl.state().learned_min, 1000);
        assert_eq!(ctl.state().learned_max, 1000);

        ctl.tick(2000, 100, &mut pwm);
        assert_eq!(ctl.state().learned_min, (1000 * 9 + 2000) / 10);
        assert_eq!(ctl.state().learned_max, (2000 * 9 + 2000) / 10);
    }

    #[test]
    fn narrow_span_is_spread_below_lower_bound() {
        let mut ctl = BacklightController::new(BacklightConfig::default());
        let mut pwm = FakePwm::default();
        ctl.tick(1000, 0, &mut pwm);
        assert_eq!(ctl.working_bounds(), (990, 1030));
    }

    #[test]
    fn narrow_span_near_zero_does_not_underflow() {
        let mut ctl = BacklightController::new(BacklightConfig::default());
        let mut pwm = FakePwm::default();
        ctl.tick(8, 0, &mut pwm);
        assert_eq!(ctl.working_bounds(), (0, 40));
    }

    #[test]
    fn targets_are_monotonic_over_a_fixed_span() {
        let ctl = learned(BacklightConfig::default());
        let (lo, hi) = ctl.working_bounds();
        let mut prev = 0u8;
        for raw in (lo..=hi).step_by(7) {
            let t = ctl.target_for(raw, lo, hi);
            assert!(t >= prev, "target({}) = {} < {}", raw, t, prev);
            prev = t;
        }
        assert_eq!(ctl.target_for(lo, lo, hi), 24);
        assert_eq!(ctl.target_for(hi, lo, hi), 255);
    }

    #[test]
    fn inverted_polarity_reverses_targets() {
        let cfg = BacklightConfig { invert: true, ..BacklightConfig::default() };
        let ctl = learned(cfg);
        let (lo, hi) = ctl.working_bounds();
        let a = ctl.target_for(lo + 10, lo, hi);
        let b = ctl.target_for(hi - 10, lo, hi);
        assert!(a >= b);
        assert_eq!(ctl.target_for(lo, lo, hi), 255);
    }

    #[test]
    fn duty_never_leaves_bounds() {
        let cfg = BacklightConfig::default();
        let mut ctl = BacklightController::new(cfg);
        let mut pwm = FakePwm::default();
        let samples = [0u16, 4095, 6, 4089, 2048, 1, 4094, 100, 3000, 7, 4088];
        for round in 0..40u32 {
            for (i, raw) in samples.iter().enumerate() {
                ctl.tick(*raw, round * 1000 + i as u32, &mut pwm);
                let s = ctl.state().smoothed_duty;
                assert!(s >= cfg.duty_min as f32 && s <= cfg.duty_max as f32);
            }
        }
        assert!(pwm
            .writes
            .iter()
            .all(|d| (cfg.duty_min..=cfg.duty_max).contains(d)));
    }

    #[test]
    fn twenty_extremes_do_not_latch() {
        let mut ctl = BacklightController::new(BacklightConfig::default());
        let mut pwm = FakePwm::default();
        for i in 0..20 {
            ctl.tick(0, i, &mut pwm);
        }
        assert!(!ctl.is_faulty());
        assert_eq!(ctl.state().bad_streak, 20);
    }

    #[test]
    fn twenty_one_extremes_latch_forever() {
        let mut ctl = BacklightController::new(BacklightConfig::default());
        let mut pwm = FakePwm::default();
        for i in 0..21 {
            ctl.tick(4095, i, &mut pwm);
        }
        assert!(ctl.is_faulty());

        for i in 0..100 {
            let report = ctl.tick(1500, 100 + i, &mut pwm);
            assert_eq!(report.duty, 200);
            assert_eq!(report.target, None);
        }
        assert!(ctl.is_faulty());
        assert_eq!(ctl.state().bad_streak, 0);
    }

    #[test]
    fn normal_sample_resets_streak() {
        let mut ctl = BacklightController::new(BacklightConfig::default());
        let mut pwm = FakePwm::default();
        for i in 0..15 {
            ctl.tick(2, i, &mut pwm);
        }
        ctl.tick(900, 20, &mut pwm);
        for i in 0..15 {
            ctl.tick(2, 30 + i, &mut pwm);
        }
        assert!(!ctl.is_faulty());
    }

    #[test]
    fn streak_saturates() {
        let mut ctl = BacklightController::new(BacklightConfig::default());
        let mut pwm = FakePwm::default();
        for i in 0..400 {
            ctl.tick(0, i, &mut pwm);
        }
        assert_eq!(ctl.state().bad_streak, u8::MAX);
    }

    #[test]
    fn extremes_are_not_learned() {
        let mut ctl = BacklightController::new(BacklightConfig::default());
        let mut pwm = FakePwm::default();
        ctl.tick(5, 0, &mut pwm);
        ctl.tick(4090, 1, &mut pwm);
        assert_eq!(ctl.state().learned_min, 4095);
        assert_eq!(ctl.state().learned_max, 0);
    }

    #[test]
    fn smoothing_moves_gradually() {
        let mut ctl = BacklightController::new(BacklightConfig::default());
        let mut pwm = FakePwm::default();
        // First sample sits at the bottom of its spread span -> target 24.
        let report = ctl.tick(1000, 0, &mut pwm);
        assert_eq!(report.target, Some(ctl.target_for(1000, 990, 1030)));
        let expected = 0.85 * 255.0 + 0.15 * report.target.unwrap() as f32;
        assert!((ctl.state().smoothed_duty - expected).abs() < 1e-3);
        assert_eq!(report.duty, expected as u8);
    }

    #[test]
    fn disabled_sensor_pins_max_duty() {
        let cfg = BacklightConfig { sensor_enabled: false, ..BacklightConfig::default() };
        let mut ctl = BacklightController::new(cfg);
        let mut pwm = FakePwm::default();
        for i in 0..30 {
            assert_eq!(ctl.tick(0, i, &mut pwm).duty, 255);
        }
        assert!(!ctl.is_faulty());
    }

    #[test]
    fn diagnostics_are_throttled() {
        let mut ctl = BacklightController::new(BacklightConfig::default());
        assert!(!ctl.diag_due(1_000));
        assert!(ctl.diag_due(2_001));
        assert!(!ctl.diag_due(3_000));
        assert!(ctl.diag_due(4_002));
    }
}
