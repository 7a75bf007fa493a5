//! Fonts selectable on the device and how each one is measured and drawn.
//!
//! Font ids follow the TFT_eSPI numbering the settings were first stored
//! with: 1 is the 6x8 GLCD cell font, 2 and 4 are the larger faces. The GLCD
//! face wraps on character cells; the ProFont faces wrap on measured width.

use embedded_graphics::{
    mono_font::{ascii::FONT_6X10, MonoFont, MonoTextStyleBuilder},
    pixelcolor::Rgb565,
    prelude::*,
    primitives::Rectangle,
    text::{renderer::TextRenderer, Baseline, Text},
};
use profont::{PROFONT_12_POINT, PROFONT_18_POINT};

use crate::wrap::{CellMetrics, Measure};

pub const MIN_SIZE: u8 = 1;
pub const MAX_SIZE: u8 = 3;

/// GLCD cell geometry before scaling.
const GLCD_CELL_W: u32 = 6;
const GLCD_CELL_H: u32 = 8;
/// Extra pixels between lines, independent of size.
const LINE_GAP: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FontId {
    Glcd = 1,
    ProFont = 2,
    ProFontLarge = 4,
}

impl FontId {
    pub const ALL: [FontId; 3] = [FontId::Glcd, FontId::ProFont, FontId::ProFontLarge];

    pub fn from_u8(id: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| *f as u8 == id)
    }

    pub fn name(self) -> &'static str {
        match self {
            FontId::Glcd => "GLCD",
            FontId::ProFont => "ProFont",
            FontId::ProFontLarge => "ProFont L",
        }
    }

    pub fn cycle(self, forward: bool) -> Self {
        let n = Self::ALL.len();
        let i = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        let next = if forward { (i + 1) % n } else { (i + n - 1) % n };
        Self::ALL[next]
    }

    fn mono(self) -> &'static MonoFont<'static> {
        match self {
            FontId::Glcd => &FONT_6X10,
            FontId::ProFont => &PROFONT_12_POINT,
            FontId::ProFontLarge => &PROFONT_18_POINT,
        }
    }
}

/// A font plus its integer size multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Typeface {
    pub font: FontId,
    pub size: u8,
}

impl Typeface {
    pub fn new(font: FontId, size: u8) -> Self {
        Self { font, size: size.clamp(MIN_SIZE, MAX_SIZE) }
    }

    fn scale(&self) -> u32 {
        self.size.clamp(MIN_SIZE, MAX_SIZE) as u32
    }

    /// Width of one character cell (exact for GLCD, nominal otherwise).
    pub fn char_width(&self) -> u32 {
        match self.font {
            FontId::Glcd => GLCD_CELL_W * self.scale(),
            f => f.mono().character_size.width * self.scale(),
        }
    }

    pub fn line_height(&self) -> i32 {
        let glyph_h = match self.font {
            FontId::Glcd => GLCD_CELL_H,
            f => f.mono().character_size.height,
        };
        (glyph_h * self.scale() + LINE_GAP) as i32
    }

    /// Draw one line of text with its top-left corner at `top_left`.
    pub fn draw<D>(&self, target: &mut D, text: &str, top_left: Point, fg: Rgb565, bg: Rgb565) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        let style = MonoTextStyleBuilder::new()
            .font(self.font.mono())
            .text_color(fg)
            .background_color(bg)
            .build();
        let printable = glyph_fallback(text);
        let mut scaled = ScaledTarget::new(target, top_left, self.scale());
        Text::with_baseline(&printable, Point::zero(), style, Baseline::Top).draw(&mut scaled)?;
        Ok(())
    }

    fn measured_width(&self, text: &str) -> u32 {
        let style = MonoTextStyleBuilder::new()
            .font(self.font.mono())
            .text_color(Rgb565::WHITE)
            .build();
        let metrics = style.measure_string(&glyph_fallback(text), Point::zero(), Baseline::Top);
        metrics.bounding_box.size.width * self.scale()
    }
}

impl Measure for Typeface {
    fn width(&self, text: &str) -> u32 {
        match self.font {
            FontId::Glcd => CellMetrics::new(self.char_width()).width(text),
            _ => self.measured_width(text),
        }
    }
}

/// Replace typographic punctuation the mono fonts lack with ASCII look-alikes.
/// Each replacement is a single character so cell counts are unchanged.
pub fn glyph_fallback(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' | '\u{201E}' => '"',
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{2013}' | '\u{2014}' => '-',
            '\u{00A0}' => ' ',
            other => other,
        })
        .collect()
}

/// Draw target adapter that magnifies every pixel into a `scale` x `scale`
/// block, placed relative to `origin`.
pub struct ScaledTarget<'a, D> {
    inner: &'a mut D,
    origin: Point,
    scale: u32,
}

impl<'a, D: DrawTarget> ScaledTarget<'a, D> {
    pub fn new(inner: &'a mut D, origin: Point, scale: u32) -> Self {
        Self { inner, origin, scale: scale.max(1) }
    }
}

impl<D: DrawTarget> Dimensions for ScaledTarget<'_, D> {
    fn bounding_box(&self) -> Rectangle {
        let outer = self.inner.bounding_box();
        let s = self.scale as i32;
        let top_left = Point::new(
            (outer.top_left.x - self.origin.x).div_euclid(s),
            (outer.top_left.y - self.origin.y).div_euclid(s),
        );
        Rectangle::new(top_left, outer.size / self.scale + Size::new(1, 1))
    }
}

impl<D: DrawTarget> DrawTarget for ScaledTarget<'_, D> {
    type Color = D::Color;
    type Error = D::Error;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let s = self.scale as i32;
        if s == 1 {
            let origin = self.origin;
            return self
                .inner
                .draw_iter(pixels.into_iter().map(|Pixel(p, c)| Pixel(p + origin, c)));
        }
        for Pixel(p, color) in pixels {
            let block = Rectangle::new(
                self.origin + Point::new(p.x * s, p.y * s),
                Size::new(self.scale, self.scale),
            );
            self.inner.fill_solid(&block, color)?;
        }
        Ok(())
    }
}
