use embedded_graphics::pixelcolor::raw::RawU16;
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;

/// Convert 8-bit RGB to Rgb565.
pub const fn rgb(r: u8, g: u8, b: u8) -> Rgb565 {
    Rgb565::new(r >> 3, g >> 2, b >> 3)
}

// ── Fixed palette offered by the settings screen ────────────────────

pub struct Swatch {
    pub name: &'static str,
    pub color: Rgb565,
}

pub const PALETTE: [Swatch; 10] = [
    Swatch { name: "Black", color: rgb(0, 0, 0) },
    Swatch { name: "White", color: rgb(255, 255, 255) },
    Swatch { name: "Yellow", color: rgb(255, 255, 0) },
    Swatch { name: "Orange", color: rgb(255, 165, 0) },
    Swatch { name: "Cyan", color: rgb(0, 255, 255) },
    Swatch { name: "Green", color: rgb(0, 255, 0) },
    Swatch { name: "Navy", color: rgb(0, 0, 128) },
    Swatch { name: "Maroon", color: rgb(128, 0, 0) },
    Swatch { name: "Dark grey", color: rgb(64, 64, 64) },
    Swatch { name: "Light grey", color: rgb(192, 192, 192) },
];

pub const BLACK: Rgb565 = PALETTE[0].color;
pub const WHITE: Rgb565 = PALETTE[1].color;

// ── Settings screen chrome ──────────────────────────────────────────

pub const SETTINGS_BG: Rgb565 = rgb(20, 24, 32);
pub const SETTINGS_LABEL: Rgb565 = rgb(222, 225, 230);
pub const SETTINGS_VALUE: Rgb565 = rgb(188, 196, 208);
pub const BUTTON_FILL: Rgb565 = rgb(40, 48, 62);
pub const BUTTON_BORDER: Rgb565 = rgb(66, 86, 108);
pub const BUTTON_TEXT: Rgb565 = rgb(232, 235, 240);
pub const HINT_TEXT: Rgb565 = rgb(140, 148, 160);

pub fn to_raw(color: Rgb565) -> u16 {
    RawU16::from(color).into_inner()
}

pub fn from_raw(raw: u16) -> Rgb565 {
    Rgb565::from(RawU16::new(raw))
}

/// Palette slot holding `color`, if any.
pub fn index_of(color: Rgb565) -> Option<usize> {
    PALETTE.iter().position(|s| s.color == color)
}

pub fn name_of(color: Rgb565) -> &'static str {
    index_of(color).map(|i| PALETTE[i].name).unwrap_or("Custom")
}

/// Step through the palette; colors outside it restart at slot 0.
pub fn cycle(color: Rgb565, forward: bool) -> Rgb565 {
    let n = PALETTE.len();
    let next = match index_of(color) {
        Some(i) if forward => (i + 1) % n,
        Some(i) => (i + n - 1) % n,
        None => 0,
    };
    PALETTE[next].color
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_round_trips_through_rgb565() {
        for swatch in PALETTE.iter() {
            assert_eq!(from_raw(to_raw(swatch.color)), swatch.color);
        }
        assert_eq!(to_raw(WHITE), 0xFFFF);
        assert_eq!(to_raw(BLACK), 0x0000);
    }

    #[test]
    fn cycle_wraps_both_ways() {
        assert_eq!(cycle(BLACK, true), WHITE);
        assert_eq!(cycle(BLACK, false), PALETTE[PALETTE.len() - 1].color);
        assert_eq!(cycle(PALETTE[PALETTE.len() - 1].color, true), BLACK);
    }

    #[test]
    fn unknown_color_restarts_cycle() {
        let odd = rgb(12, 34, 56);
        assert_eq!(name_of(odd), "Custom");
        assert_eq!(cycle(odd, true), BLACK);
    }
}
