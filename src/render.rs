//! Quote and error screens.
//!
//! Both screens keep `PAD` pixels around the text, leave one blank line at
//! the top and one character column free on the right.

use embedded_graphics::{pixelcolor::Rgb565, prelude::*};

use crate::prefs::UiPreferences;
use crate::quote::QuoteRecord;
use crate::typeface::Typeface;
use crate::wrap;

pub const PAD: i32 = 10;

/// A laid-out line ready to draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub text: String,
    pub at: Point,
}

/// Text origin plus the wrap budget for one screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextFrame {
    pub origin: Point,
    pub max_width: u32,
}

impl TextFrame {
    pub fn for_screen(screen_width: u32, face: &Typeface) -> Self {
        let used = 2 * PAD as u32 + face.char_width();
        Self {
            origin: Point::new(PAD, PAD + face.line_height()),
            max_width: screen_width.saturating_sub(used).max(1),
        }
    }
}

fn lay_out(text: &str, origin: Point, max_width: u32, face: &Typeface, lines: &mut Vec<Line>) -> i32 {
    wrap::layout(text, origin, max_width, face.line_height(), face, |line, at| {
        lines.push(Line { text: line.to_string(), at })
    })
}

/// Quote in curly quotes, one blank line, then `- author`.
pub fn compose_quote(record: &QuoteRecord, frame: TextFrame, face: &Typeface) -> Vec<Line> {
    let mut lines = Vec::new();
    let quoted = format!("\u{201C}{}\u{201D}", record.quote_text);
    let mut y = lay_out(&quoted, frame.origin, frame.max_width, face, &mut lines);
    y += face.line_height();
    let byline = format!("- {}", record.author_name);
    lay_out(&byline, Point::new(frame.origin.x, y), frame.max_width, face, &mut lines);
    lines
}

pub fn compose_error(reason: &str, frame: TextFrame, face: &Typeface) -> Vec<Line> {
    let mut lines = Vec::new();
    lay_out(&format!("Error: {}", reason), frame.origin, frame.max_width, face, &mut lines);
    lines
}

pub fn draw_lines<D>(target: &mut D, lines: &[Line], face: &Typeface, fg: Rgb565, bg: Rgb565) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    for line in lines {
        face.draw(target, &line.text, line.at, fg, bg)?;
    }
    Ok(())
}

pub fn show_quote<D>(target: &mut D, prefs: &UiPreferences, record: &QuoteRecord) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    let face = prefs.font();
    let frame = TextFrame::for_screen(target.bounding_box().size.width, &face);
    let lines = compose_quote(record, frame, &face);
    target.clear(prefs.background())?;
    draw_lines(target, &lines, &face, prefs.foreground(), prefs.background())
}

pub fn show_error<D>(target: &mut D, prefs: &UiPreferences, reason: &str) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    let face = prefs.font();
    let frame = TextFrame::for_screen(target.bounding_box().size.width, &face);
    let lines = compose_error(reason, frame, &face);
    target.clear(prefs.background())?;
    draw_lines(target, &lines, &face, prefs.foreground(), prefs.background())
}
