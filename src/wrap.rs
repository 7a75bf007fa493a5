//! Greedy word wrap into fixed-width lines.
//!
//! The wrapping algorithm is independent of how text is measured: a
//! [`Measure`] either counts fixed-width character cells or asks a font for
//! the pixel width of the candidate line. Finished lines are handed to an
//! `emit` callback together with their top-left position.

use embedded_graphics::prelude::Point;

/// Width of a candidate line in the same unit as the layout budget.
pub trait Measure {
    fn width(&self, text: &str) -> u32;
}

/// Fixed-width model: every character occupies one `char_width` cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellMetrics {
    pub char_width: u32,
}

impl CellMetrics {
    pub const fn new(char_width: u32) -> Self {
        Self { char_width }
    }

    /// Whole characters that fit in `max_width` (never less than one).
    pub fn capacity(&self, max_width: u32) -> u32 {
        (max_width / self.char_width.max(1)).max(1)
    }
}

impl Measure for CellMetrics {
    fn width(&self, text: &str) -> u32 {
        text.chars().count() as u32 * self.char_width
    }
}

/// Variable-width model backed by a font-metrics function.
pub struct MeasuredWidth<F>(pub F);

impl<F: Fn(&str) -> u32> Measure for MeasuredWidth<F> {
    fn width(&self, text: &str) -> u32 {
        (self.0)(text)
    }
}

impl<M: Measure + ?Sized> Measure for &M {
    fn width(&self, text: &str) -> u32 {
        (**self).width(text)
    }
}

/// In-progress state of one layout call.
pub struct LayoutCursor<'m, M: ?Sized> {
    x: i32,
    y: i32,
    line_height: i32,
    max_width: u32,
    measure: &'m M,
    line: String,
}

impl<'m, M: Measure + ?Sized> LayoutCursor<'m, M> {
    pub fn new(origin: Point, max_width: u32, line_height: i32, measure: &'m M) -> Self {
        Self {
            x: origin.x,
            y: origin.y,
            line_height,
            max_width,
            measure,
            line: String::new(),
        }
    }

    pub fn y(&self) -> i32 {
        self.y
    }

    /// Emit the pending line (if any) and move down one line.
    pub fn flush_line(&mut self, emit: &mut impl FnMut(&str, Point)) {
        if !self.line.is_empty() {
            emit(&self.line, Point::new(self.x, self.y));
            self.line.clear();
        }
        self.y += self.line_height;
    }

    /// Emit the pending line only when it holds something.
    pub fn flush_pending(&mut self, emit: &mut impl FnMut(&str, Point)) {
        if !self.line.is_empty() {
            self.flush_line(emit);
        }
    }

    /// Place one whitespace-free token.
    pub fn push_word(&mut self, word: &str, emit: &mut impl FnMut(&str, Point)) {
        if word.is_empty() {
            return;
        }

        if self.measure.width(word) > self.max_width {
            self.flush_pending(emit);
            self.hard_split(word, emit);
            return;
        }

        if self.line.is_empty() {
            self.line.push_str(word);
            return;
        }

        let mut candidate = String::with_capacity(self.line.len() + 1 + word.len());
        candidate.push_str(&self.line);
        candidate.push(' ');
        candidate.push_str(word);
        if self.measure.width(&candidate) <= self.max_width {
            self.line = candidate;
        } else {
            self.flush_line(emit);
            self.line.push_str(word);
        }
    }

    /// Break an oversized token into maximal chunks, one per line.
    fn hard_split(&mut self, word: &str, emit: &mut impl FnMut(&str, Point)) {
        let mut chunk = String::new();
        for c in word.chars() {
            chunk.push(c);
            if chunk.chars().count() > 1 && self.measure.width(&chunk) > self.max_width {
                chunk.pop();
                emit(&chunk, Point::new(self.x, self.y));
                self.y += self.line_height;
                chunk.clear();
                chunk.push(c);
            }
        }
        if !chunk.is_empty() {
            emit(&chunk, Point::new(self.x, self.y));
            self.y += self.line_height;
        }
    }

    /// Flush whatever is left; returns the `y` for the next block.
    pub fn finish(mut self, emit: &mut impl FnMut(&str, Point)) -> i32 {
        self.flush_pending(emit);
        self.y
    }
}

/// Lay out `text` starting at `origin` and return the `y` below the last line.
pub fn layout<M, E>(
    text: &str,
    origin: Point,
    max_width: u32,
    line_height: i32,
    measure: &M,
    mut emit: E,
) -> i32
where
    M: Measure + ?Sized,
    E: FnMut(&str, Point),
{
    let mut cursor = LayoutCursor::new(origin, max_width, line_height, measure);
    let mut word = String::new();

    for c in text.chars() {
        match c {
            '\n' => {
                cursor.push_word(&word, &mut emit);
                word.clear();
                cursor.flush_line(&mut emit);
            }
            ' ' | '\t' | '\r' => {
                cursor.push_word(&word, &mut emit);
                word.clear();
            }
            _ => word.push(c),
        }
    }
    cursor.push_word(&word, &mut emit);
    cursor.finish(&mut emit)
}

/// Convenience wrapper collecting the lines instead of drawing them.
pub fn wrap_lines<M: Measure + ?Sized>(text: &str, max_width: u32, measure: &M) -> Vec<String> {
    let mut lines = Vec::new();
    layout(text, Point::zero(), max_width, 1, measure, |line, _| {
        lines.push(line.to_string())
    });
    lines
}
