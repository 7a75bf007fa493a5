//! Per-board data: pin maps, timing and feature presence for the three
//! ESP32-2432S028 ("Cheap Yellow Display") builds.

use crate::backlight::BacklightConfig;
use crate::touch::{Calibration, TouchTransform};

// ── Timing shared by every board ────────────────────────────────────
pub const BACKLIGHT_TICK_MS: u32 = 100;
pub const LOOP_IDLE_MS: u32 = 5;
pub const HTTP_TIMEOUT_MS: u32 = 6_000;
pub const SETTINGS_TIMEOUT_MS: u32 = 20_000;

// ── Panel (ILI9341, landscape) ──────────────────────────────────────
pub const DISPLAY_WIDTH: u32 = 320;
pub const DISPLAY_HEIGHT: u32 = 240;
pub const SPI_FREQ_HZ: u32 = 40_000_000;
pub const TOUCH_SPI_FREQ_HZ: u32 = 2_000_000;
pub const BACKLIGHT_PWM_HZ: u32 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardVariant {
    /// Quote display only, LDR on GPIO39.
    Basic,
    /// XPT2046 touch, settings screen and persisted preferences.
    TouchSetup,
    /// Quote display only, LDR on GPIO34.
    Ldr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayPins {
    pub sclk: i32,
    pub mosi: i32,
    pub miso: i32,
    pub cs: i32,
    pub dc: i32,
    pub rst: i32,
    pub backlight: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TouchPins {
    pub sclk: i32,
    pub mosi: i32,
    pub miso: i32,
    pub cs: i32,
    pub irq: i32,
}

/// LDR input: GPIO number plus its ADC1 channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightSensorPin {
    pub gpio: i32,
    pub adc1_channel: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoardConfig {
    pub variant: BoardVariant,
    pub name: &'static str,
    pub display: DisplayPins,
    pub ldr: LightSensorPin,
    pub touch: Option<TouchPins>,
    pub touch_calibration: Calibration,
    pub touch_transform: TouchTransform,
    pub refresh_ms: u32,
    pub persist_prefs: bool,
    pub backlight: BacklightConfig,
}

const CYD_DISPLAY: DisplayPins = DisplayPins {
    sclk: 14,
    mosi: 13,
    miso: 12,
    cs: 15,
    dc: 2,
    rst: 4,
    backlight: 21,
};

const CYD_TOUCH: TouchPins = TouchPins {
    sclk: 25,
    mosi: 32,
    miso: 39,
    cs: 33,
    irq: 36,
};

const LDR_GPIO39: LightSensorPin = LightSensorPin { gpio: 39, adc1_channel: 3 };
const LDR_GPIO34: LightSensorPin = LightSensorPin { gpio: 34, adc1_channel: 6 };

impl BoardConfig {
    pub fn for_variant(variant: BoardVariant) -> Self {
        let base = BoardConfig {
            variant,
            name: "cyd-basic",
            display: CYD_DISPLAY,
            ldr: LDR_GPIO39,
            touch: None,
            touch_calibration: Calibration::CYD,
            touch_transform: TouchTransform::landscape(DISPLAY_WIDTH as i32, DISPLAY_HEIGHT as i32),
            refresh_ms: 60 * 1000,
            persist_prefs: false,
            backlight: BacklightConfig::default(),
        };
        match variant {
            BoardVariant::Basic => base,
            BoardVariant::Ldr => BoardConfig {
                name: "cyd-ldr",
                ldr: LDR_GPIO34,
                ..base
            },
            BoardVariant::TouchSetup => BoardConfig {
                name: "cyd-touch",
                ldr: LDR_GPIO34,
                touch: Some(CYD_TOUCH),
                refresh_ms: 30 * 60 * 1000,
                persist_prefs: true,
                ..base
            },
        }
    }

    /// Board selected by Cargo features; touch wins over LDR.
    pub fn active() -> Self {
        let variant = if cfg!(feature = "variant-touch") {
            BoardVariant::TouchSetup
        } else if cfg!(feature = "variant-ldr") {
            BoardVariant::Ldr
        } else {
            BoardVariant::Basic
        };
        Self::for_variant(variant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [BoardVariant; 3] = [BoardVariant::Basic, BoardVariant::TouchSetup, BoardVariant::Ldr];

    #[test]
    fn only_touch_board_has_settings() {
        for v in ALL {
            let b = BoardConfig::for_variant(v);
            assert_eq!(b.touch.is_some(), v == BoardVariant::TouchSetup);
            assert_eq!(b.persist_prefs, v == BoardVariant::TouchSetup);
        }
    }

    #[test]
    fn refresh_periods() {
        assert_eq!(BoardConfig::for_variant(BoardVariant::Basic).refresh_ms, 60_000);
        assert_eq!(BoardConfig::for_variant(BoardVariant::Ldr).refresh_ms, 60_000);
        assert_eq!(BoardConfig::for_variant(BoardVariant::TouchSetup).refresh_ms, 1_800_000);
    }

    #[test]
    fn ldr_never_shares_a_touch_pin() {
        for v in ALL {
            let b = BoardConfig::for_variant(v);
            if let Some(t) = b.touch {
                let used = [t.sclk, t.mosi, t.miso, t.cs, t.irq];
                assert!(!used.contains(&b.ldr.gpio), "{:?}", v);
            }
        }
    }

    #[test]
    fn every_board_uses_the_standard_backlight_curve() {
        for v in ALL {
            let bl = BoardConfig::for_variant(v).backlight;
            assert_eq!(bl.guard_band, 5);
            assert_eq!((bl.duty_min, bl.duty_max, bl.fallback_duty), (24, 255, 200));
        }
    }
}
