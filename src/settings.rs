//! On-device settings screen (touch board only).
//!
//! Four rows (background, text color, font, size) each with `<` / `>`
//! buttons, a live preview and a Done button. The screen closes on Done or
//! after `SETTINGS_TIMEOUT_MS`, and writes the preferences back only when
//! they changed.

use anyhow::{anyhow, Result};
use embedded_graphics::{
    mono_font::MonoTextStyle,
    pixelcolor::Rgb565,
    prelude::*,
    primitives::{PrimitiveStyleBuilder, Rectangle, RoundedRectangle},
    text::{Alignment, Baseline, Text, TextStyleBuilder},
};
use log::{info, warn};
use profont::{PROFONT_12_POINT, PROFONT_14_POINT};

use crate::board::SETTINGS_TIMEOUT_MS;
use crate::hal::{Clock, PrefsStore, TouchInput};
use crate::palette::{self, BUTTON_BORDER, BUTTON_FILL, BUTTON_TEXT, HINT_TEXT, SETTINGS_BG, SETTINGS_LABEL, SETTINGS_VALUE};
use crate::prefs::UiPreferences;
use crate::touch::TapTracker;

const POLL_MS: u32 = 20;

// ── Layout (landscape 320x240) ──────────────────────────────────────
const ROW_TOP: i32 = 34;
const ROW_STRIDE: i32 = 36;
const ROW_H: u32 = 28;
const LABEL_X: i32 = 10;
const PREV_X: i32 = 132;
const NEXT_X: i32 = 274;
const ARROW_W: u32 = 36;
const VALUE_X: i32 = PREV_X + ARROW_W as i32 + 4;
const PREVIEW: Rectangle = Rectangle::new(Point::new(10, 180), Size::new(200, 52));
const DONE: Rectangle = Rectangle::new(Point::new(230, 186), Size::new(80, 40));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Background,
    Foreground,
    Font,
    Size,
}

impl Field {
    pub const ALL: [Field; 4] = [Field::Background, Field::Foreground, Field::Font, Field::Size];

    fn label(self) -> &'static str {
        match self {
            Field::Background => "Background",
            Field::Foreground => "Text",
            Field::Font => "Font",
            Field::Size => "Size",
        }
    }

    fn value(self, prefs: &UiPreferences) -> String {
        match self {
            Field::Background => palette::name_of(prefs.background()).to_string(),
            Field::Foreground => palette::name_of(prefs.foreground()).to_string(),
            Field::Font => prefs.font().font.name().to_string(),
            Field::Size => format!("x{}", prefs.size_multiplier),
        }
    }

    fn row_top(self) -> i32 {
        let i = Self::ALL.iter().position(|f| *f == self).unwrap_or(0) as i32;
        ROW_TOP + i * ROW_STRIDE
    }

    fn prev_button(self) -> Rectangle {
        Rectangle::new(Point::new(PREV_X, self.row_top()), Size::new(ARROW_W, ROW_H))
    }

    fn next_button(self) -> Rectangle {
        Rectangle::new(Point::new(NEXT_X, self.row_top()), Size::new(ARROW_W, ROW_H))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Step { field: Field, forward: bool },
    Done,
}

/// Map a tap in display coordinates to a button.
pub fn hit_test(p: Point) -> Option<Action> {
    if DONE.contains(p) {
        return Some(Action::Done);
    }
    Field::ALL.iter().find_map(|&field| {
        if field.prev_button().contains(p) {
            Some(Action::Step { field, forward: false })
        } else if field.next_button().contains(p) {
            Some(Action::Step { field, forward: true })
        } else {
            None
        }
    })
}

/// Apply a step to `prefs`; returns false for `Done`.
pub fn apply(prefs: &mut UiPreferences, action: Action) -> bool {
    let Action::Step { field, forward } = action else {
        return false;
    };
    match field {
        Field::Background => prefs.cycle_background(forward),
        Field::Foreground => prefs.cycle_foreground(forward),
        Field::Font => prefs.cycle_font(forward),
        Field::Size => prefs.cycle_size(forward),
    }
    true
}

// ── Drawing ─────────────────────────────────────────────────────────

fn draw_button<D>(target: &mut D, rect: Rectangle, caption: &str) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    let style = PrimitiveStyleBuilder::new()
        .fill_color(BUTTON_FILL)
        .stroke_color(BUTTON_BORDER)
        .stroke_width(1)
        .build();
    RoundedRectangle::with_equal_corners(rect, Size::new(6, 6))
        .into_styled(style)
        .draw(target)?;
    let text_style = TextStyleBuilder::new()
        .alignment(Alignment::Center)
        .baseline(Baseline::Middle)
        .build();
    Text::with_text_style(
        caption,
        rect.center(),
        MonoTextStyle::new(&PROFONT_14_POINT, BUTTON_TEXT),
        text_style,
    )
    .draw(target)?;
    Ok(())
}

fn draw_row<D>(target: &mut D, field: Field, prefs: &UiPreferences) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    let top = field.row_top();
    let mid = top + ROW_H as i32 / 2;
    let label = MonoTextStyle::new(&PROFONT_14_POINT, SETTINGS_LABEL);
    Text::with_baseline(field.label(), Point::new(LABEL_X, mid), label, Baseline::Middle).draw(target)?;

    draw_button(target, field.prev_button(), "<")?;
    draw_button(target, field.next_button(), ">")?;

    // value cell, repainted on every change
    let cell = Rectangle::new(
        Point::new(VALUE_X, top),
        Size::new((NEXT_X - 4 - VALUE_X) as u32, ROW_H),
    );
    cell.into_styled(PrimitiveStyleBuilder::new().fill_color(SETTINGS_BG).build())
        .draw(target)?;

    let value = MonoTextStyle::new(&PROFONT_12_POINT, SETTINGS_VALUE);
    let value_pos = Point::new(VALUE_X + 4, mid);
    match field {
        Field::Background | Field::Foreground => {
            let color = if field == Field::Background { prefs.background() } else { prefs.foreground() };
            let swatch = Rectangle::new(Point::new(VALUE_X + 4, mid - 6), Size::new(12, 12));
            swatch
                .into_styled(
                    PrimitiveStyleBuilder::new()
                        .fill_color(color)
                        .stroke_color(BUTTON_BORDER)
                        .stroke_width(1)
                        .build(),
                )
                .draw(target)?;
            Text::with_baseline(&field.value(prefs), value_pos + Point::new(16, 0), value, Baseline::Middle)
                .draw(target)?;
        }
        Field::Font | Field::Size => {
            Text::with_baseline(&field.value(prefs), value_pos, value, Baseline::Middle).draw(target)?;
        }
    }
    Ok(())
}

fn draw_preview<D>(target: &mut D, prefs: &UiPreferences) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    PREVIEW
        .into_styled(
            PrimitiveStyleBuilder::new()
                .fill_color(prefs.background())
                .stroke_color(BUTTON_BORDER)
                .stroke_width(1)
                .build(),
        )
        .draw(target)?;
    let inner = PREVIEW.offset(-2);
    let face = prefs.font();
    let mut clipped = target.clipped(&inner);
    face.draw(
        &mut clipped,
        "Aa Quote",
        inner.top_left + Point::new(4, 4),
        prefs.foreground(),
        prefs.background(),
    )
}

pub fn draw_screen<D>(target: &mut D, prefs: &UiPreferences) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    target.clear(SETTINGS_BG)?;
    let title = MonoTextStyle::new(&PROFONT_14_POINT, SETTINGS_LABEL);
    Text::with_baseline("Settings", Point::new(LABEL_X, 8), title, Baseline::Top).draw(target)?;
    let hint = MonoTextStyle::new(&PROFONT_12_POINT, HINT_TEXT);
    Text::with_alignment("closes in 20 s", Point::new(310, 20), hint, Alignment::Right).draw(target)?;

    for field in Field::ALL {
        draw_row(target, field, prefs)?;
    }
    draw_preview(target, prefs)?;
    draw_button(target, DONE, "Done")
}

// ── Modal loop ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Done,
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub prefs: UiPreferences,
    pub changed: bool,
    pub exit: Exit,
}

/// Run the settings screen until Done or the deadline, then persist.
pub fn run<D, T, C, S>(
    target: &mut D,
    touch: &mut T,
    clock: &mut C,
    store: &mut S,
    initial: UiPreferences,
) -> Result<Outcome>
where
    D: DrawTarget<Color = Rgb565>,
    D::Error: core::fmt::Debug,
    T: TouchInput + ?Sized,
    C: Clock + ?Sized,
    S: PrefsStore + ?Sized,
{
    info!("Settings screen open");
    let mut prefs = initial;
    let mut taps = TapTracker::new();
    let started = clock.now_ms();
    draw_screen(target, &prefs).map_err(|e| anyhow!("settings draw failed: {:?}", e))?;

    let exit = loop {
        if clock.now_ms().wrapping_sub(started) >= SETTINGS_TIMEOUT_MS {
            info!("Settings timed out");
            break Exit::Timeout;
        }
        if let Some(tap) = taps.update(touch.poll_point()) {
            match hit_test(tap) {
                Some(Action::Done) => break Exit::Done,
                Some(action @ Action::Step { field, .. }) => {
                    apply(&mut prefs, action);
                    draw_row(target, field, &prefs)
                        .and_then(|_| draw_preview(target, &prefs))
                        .map_err(|e| anyhow!("settings draw failed: {:?}", e))?;
                }
                None => {}
            }
        }
        clock.sleep_ms(POLL_MS);
    };

    let changed = prefs != initial;
    if changed {
        match store.save(&prefs) {
            Ok(()) => info!("Settings saved: {:?}", prefs),
            Err(e) => warn!("Settings save failed: {}", e),
        }
    }
    Ok(Outcome { prefs, changed, exit })
}
