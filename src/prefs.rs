use embedded_graphics::pixelcolor::Rgb565;

use crate::palette;
use crate::typeface::{FontId, Typeface, MAX_SIZE, MIN_SIZE};

/// NVS namespace and keys for the touch board's display preferences.
pub const NAMESPACE: &str = "ui_prefs";
pub const KEY_BG: &str = "bg";
pub const KEY_FG: &str = "fg";
pub const KEY_FONT: &str = "font";
pub const KEY_SIZE: &str = "size";

/// How the quote screen is drawn. Colors are raw RGB565 so the struct maps
/// one-to-one onto the stored keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiPreferences {
    pub background_color: u16,
    pub foreground_color: u16,
    pub font_id: u8,
    pub size_multiplier: u8,
}

impl Default for UiPreferences {
    fn default() -> Self {
        Self {
            background_color: palette::to_raw(palette::BLACK),
            foreground_color: palette::to_raw(palette::WHITE),
            font_id: FontId::Glcd as u8,
            size_multiplier: 2,
        }
    }
}

impl UiPreferences {
    /// Build from whatever the store returned; missing keys take defaults,
    /// unknown fonts fall back to GLCD and the size is clamped.
    pub fn from_stored(bg: Option<u16>, fg: Option<u16>, font: Option<u8>, size: Option<u8>) -> Self {
        let d = Self::default();
        Self {
            background_color: bg.unwrap_or(d.background_color),
            foreground_color: fg.unwrap_or(d.foreground_color),
            font_id: font.unwrap_or(d.font_id),
            size_multiplier: size.unwrap_or(d.size_multiplier),
        }
        .sanitized()
    }

    pub fn sanitized(self) -> Self {
        Self {
            font_id: self.font().font as u8,
            size_multiplier: self.size_multiplier.clamp(MIN_SIZE, MAX_SIZE),
            ..self
        }
    }

    pub fn background(&self) -> Rgb565 {
        palette::from_raw(self.background_color)
    }

    pub fn foreground(&self) -> Rgb565 {
        palette::from_raw(self.foreground_color)
    }

    pub fn font(&self) -> Typeface {
        let font = FontId::from_u8(self.font_id).unwrap_or(FontId::Glcd);
        Typeface::new(font, self.size_multiplier)
    }

    pub fn cycle_background(&mut self, forward: bool) {
        self.background_color = palette::to_raw(palette::cycle(self.background(), forward));
    }

    pub fn cycle_foreground(&mut self, forward: bool) {
        self.foreground_color = palette::to_raw(palette::cycle(self.foreground(), forward));
    }

    pub fn cycle_font(&mut self, forward: bool) {
        self.font_id = self.font().font.cycle(forward) as u8;
    }

    /// Step the size multiplier, wrapping inside `MIN_SIZE..=MAX_SIZE`.
    pub fn cycle_size(&mut self, forward: bool) {
        let s = self.size_multiplier.clamp(MIN_SIZE, MAX_SIZE);
        self.size_multiplier = match (forward, s) {
            (true, MAX_SIZE) => MIN_SIZE,
            (true, s) => s + 1,
            (false, MIN_SIZE) => MAX_SIZE,
            (false, s) => s - 1,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_white_on_black_glcd_2x() {
        let p = UiPreferences::default();
        assert_eq!(p.background(), palette::BLACK);
        assert_eq!(p.foreground(), palette::WHITE);
        let t = p.font();
        assert_eq!(t.font, FontId::Glcd);
        assert_eq!(t.char_width(), 12);
    }

    #[test]
    fn stored_values_are_validated() {
        let p = UiPreferences::from_stored(Some(0x001F), None, Some(7), Some(9));
        assert_eq!(p.background_color, 0x001F);
        assert_eq!(p.foreground_color, 0xFFFF);
        assert_eq!(p.font_id, FontId::Glcd as u8);
        assert_eq!(p.size_multiplier, 3);

        let p = UiPreferences::from_stored(None, None, Some(4), Some(0));
        assert_eq!(p.font_id, 4);
        assert_eq!(p.size_multiplier, 1);
    }

    #[test]
    fn size_wraps_within_range() {
        let mut p = UiPreferences::default();
        p.cycle_size(true);
        assert_eq!(p.size_multiplier, 3);
        p.cycle_size(true);
        assert_eq!(p.size_multiplier, 1);
        p.cycle_size(false);
        assert_eq!(p.size_multiplier, 3);
    }

    #[test]
    fn color_and_font_cycling() {
        let mut p = UiPreferences::default();
        p.cycle_background(true);
        assert_eq!(p.background(), palette::WHITE);
        p.cycle_foreground(false);
        assert_eq!(p.foreground(), palette::BLACK);
        p.cycle_font(true);
        assert_eq!(p.font_id, FontId::ProFont as u8);
    }
}
