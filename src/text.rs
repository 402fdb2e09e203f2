//! Line breaking and rendering of shaped text.
//!
//! A [Text] owns a string and the font it is set in. The string is reshaped whenever anything
//! that affects shaping changes, and every measuring or rendering call works from that cached
//! shaping.
//!
//! Lines are broken greedily in logical order. Rendering walks each line in visual order from
//! its right edge towards its left, which is the natural pen direction for right-to-left runs
//! and lets cursive chains settle their vertical offsets before anything is emitted.

use std::ops::Range;
use std::sync::Arc;

use log::warn;

use crate::bidi::{self, WritingDirection};
use crate::font::{DecodedTables, Font, FontEngine};
use crate::string_record::{AnchorType, GlyphRecord, PositionRecord, StringRecord};

/// Where each line sits horizontally within the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlignment {
    #[default]
    Right,
    Center,
    Left,
}

/// A position in pixels, `y` increasing downwards.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Point {
        Point { x, y }
    }
}

/// A string set in a font, ready to be measured and rendered.
pub struct Text<E: FontEngine> {
    text: String,
    opt_font: Option<Font<E>>,
    alignment: TextAlignment,
    direction: WritingDirection,
    opt_record: Option<Arc<StringRecord>>,
}

impl<E: FontEngine> Text<E> {
    pub fn new(text: impl Into<String>, opt_font: Option<Font<E>>) -> Text<E> {
        let mut text = Text {
            text: text.into(),
            opt_font,
            alignment: TextAlignment::default(),
            direction: WritingDirection::Auto,
            opt_record: None,
        };
        text.reshape();
        text
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn font(&self) -> Option<&Font<E>> {
        self.opt_font.as_ref()
    }

    pub fn alignment(&self) -> TextAlignment {
        self.alignment
    }

    pub fn writing_direction(&self) -> WritingDirection {
        self.direction
    }

    /// The shaping of the current string, `None` when there is no font or the string is empty.
    pub fn record(&self) -> Option<Arc<StringRecord>> {
        self.opt_record.clone()
    }

    pub fn set_string(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.reshape();
    }

    pub fn set_font(&mut self, font: Font<E>) {
        self.opt_font = Some(font);
        self.reshape();
    }

    pub fn set_alignment(&mut self, alignment: TextAlignment) {
        self.alignment = alignment;
    }

    pub fn set_writing_direction(&mut self, direction: WritingDirection) {
        if self.direction != direction {
            self.direction = direction;
            self.reshape();
        }
    }

    fn reshape(&mut self) {
        self.opt_record = self
            .opt_font
            .as_ref()
            .and_then(|font| font.shape(&self.text, self.direction))
            .map(Arc::new);
    }

    fn shaped(&self, operation: &str) -> Option<(&Font<E>, Arc<StringRecord>)> {
        let Some(font) = &self.opt_font else {
            warn!("{}: no font has been set", operation);
            return None;
        };
        let Some(record) = self.record() else {
            warn!("{}: text is empty", operation);
            return None;
        };
        Some((font, record))
    }

    /// Number of lines the whole string occupies in a frame `frame_width` pixels wide.
    pub fn measure_lines(&self, frame_width: f32) -> usize {
        let Some((font, record)) = self.shaped("measure lines") else {
            return 0;
        };
        let scale = font.size_by_em();
        let mut lines = 0;
        let mut opt_start = Some(0);
        while let Some(line) =
            opt_start.and_then(|start| measure_line(&record, scale, frame_width, start))
        {
            lines += 1;
            opt_start = line.next;
        }
        lines
    }

    /// Height in pixels of the whole string in a frame `frame_width` pixels wide.
    pub fn measure_height(&self, frame_width: f32) -> f32 {
        match &self.opt_font {
            Some(font) => self.measure_lines(frame_width) as f32 * font.leading(),
            None => {
                warn!("measure height: no font has been set");
                0.0
            }
        }
    }

    /// Skip at most `max_lines` lines starting at character `from`.
    ///
    /// Returns the index of the first character of the next line, `None` once the string is
    /// exhausted, along with the number of lines skipped.
    pub fn next_line_char_index(
        &self,
        frame_width: f32,
        from: usize,
        max_lines: usize,
    ) -> (Option<usize>, usize) {
        let Some((font, record)) = self.shaped("next line") else {
            return (None, 0);
        };
        let scale = font.size_by_em();
        let mut lines = 0;
        let mut opt_start = Some(from);
        while let Some(start) = opt_start {
            if lines == max_lines {
                break;
            }
            opt_start = measure_line(&record, scale, frame_width, start).and_then(|line| {
                lines += 1;
                line.next
            });
        }
        (opt_start, lines)
    }

    /// Render at most `max_lines` lines starting at character `from`.
    ///
    /// `position` is the top-left corner of the frame's first baseline. `render` is called
    /// with each glyph and the pixel position of its origin, left to right within a line.
    /// Returns the same as [`Text::next_line_char_index`].
    pub fn show_string(
        &self,
        frame_width: f32,
        position: Point,
        from: usize,
        max_lines: usize,
        mut render: impl FnMut(u16, f32, f32),
    ) -> (Option<usize>, usize) {
        let Some((font, record)) = self.shaped("show string") else {
            return (None, 0);
        };
        let tables = font.tables();
        let scale = font.size_by_em();
        let leading = font.leading();

        let mut baseline = position.y;
        let mut lines = 0;
        let mut opt_start = Some(from);
        while let Some(start) = opt_start {
            if lines == max_lines {
                break;
            }
            let Some(line) = measure_line(&record, scale, frame_width, start) else {
                opt_start = None;
                break;
            };
            let right = position.x
                + match self.alignment {
                    TextAlignment::Right => frame_width,
                    TextAlignment::Center => line.width + (frame_width - line.width) / 2.0,
                    TextAlignment::Left => line.width,
                };
            let pen = Point::new(right, baseline);
            let glyphs = render_line(&record, &tables, scale, line.chars, pen);
            for (glyph, x, y) in glyphs.into_iter().rev() {
                render(glyph, x, y);
            }
            baseline += leading;
            lines += 1;
            opt_start = line.next;
        }
        (opt_start, lines)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct MeasuredLine {
    /// Characters drawn on the line, without the space or newline it was broken at
    chars: Range<usize>,
    /// Width in pixels, excluding the whitespace the line was broken at
    width: f32,
    /// First character of the following line
    next: Option<usize>,
}

impl MeasuredLine {
    fn new(record: &StringRecord, start: usize, next: usize, width: f32) -> MeasuredLine {
        let mut end = next;
        if end > start && matches!(record.chars().get(end - 1), Some(' ' | '\n')) {
            end -= 1;
        }
        MeasuredLine {
            chars: start..end,
            width,
            next: (next < record.char_count()).then_some(next),
        }
    }
}

fn glyph_advance(glyph: &GlyphRecord) -> i32 {
    let position = &glyph.position;
    position.advance.x + glyph.advance - position.placement.x
}

/// Measure the line starting at character `start`.
///
/// Lines break after a space, after a newline or at the end of the string. A line that
/// has no such opportunity before it overflows is broken before the overflowing character,
/// keeping at least one character on the line.
fn measure_line(
    record: &StringRecord,
    scale: f32,
    frame_width: f32,
    start: usize,
) -> Option<MeasuredLine> {
    let chars = record.chars();
    if start >= chars.len() {
        return None;
    }
    let limit = frame_width.floor();
    let mut width = 0.0;
    let mut opt_break: Option<(usize, f32)> = None;

    for (char_index, &ch) in chars.iter().enumerate().skip(start) {
        let char_start_width = width;
        if ch == ' ' || ch == '\n' {
            opt_break = Some((char_index + 1, width));
            if ch == '\n' {
                return Some(MeasuredLine::new(record, start, char_index + 1, width));
            }
        }

        let rtl = record.level(char_index) & 1 == 1;
        for glyph in record.glyphs(char_index) {
            if glyph.is_deleted() {
                continue;
            }
            let position = &glyph.position;
            if position.anchor_type.contains(AnchorType::MARK) {
                // attached marks take no room
            } else if rtl && position.anchor_type.contains(AnchorType::ENTRY) {
                width -= position.anchor.x as f32 * scale;
            } else {
                width += glyph_advance(glyph) as f32 * scale;
            }

            if width.ceil() >= limit {
                let (next, width) = match opt_break {
                    Some(candidate) => candidate,
                    None if char_index > start => (char_index, char_start_width),
                    None => (start + 1, width),
                };
                return Some(MeasuredLine::new(record, start, next, width));
            }
        }
    }

    Some(MeasuredLine {
        chars: start..chars.len(),
        width,
        next: None,
    })
}

/// Compute the pixel position of every glyph in the characters `chars`.
///
/// `pen` is the right edge of the line on its baseline. Glyphs are returned right to left.
fn render_line(
    record: &StringRecord,
    tables: &DecodedTables,
    scale: f32,
    chars: Range<usize>,
    pen: Point,
) -> Vec<(u16, f32, f32)> {
    let visual = bidi::reorder_line(
        record.classes(),
        record.levels(),
        record.base_level(),
        chars.clone(),
    );
    let mirrored = bidi::mirrored_chars(record.chars(), record.levels(), chars);

    let mut renderer = LineRenderer::new(scale, pen);
    for &(char_index, level) in visual.iter().rev() {
        let glyphs = record.glyphs(char_index);
        let opt_mirror = mirrored
            .iter()
            .find(|&&(index, _)| index == char_index)
            .map(|&(_, ch)| tables.glyph_for_char(ch))
            .filter(|&glyph| glyph != 0);

        if level & 1 == 1 {
            for (glyph_index, glyph) in glyphs.iter().enumerate() {
                let id = match opt_mirror {
                    Some(mirror) if glyph_index == 0 => mirror,
                    _ => glyph.glyph,
                };
                renderer.rtl_glyph(id, glyph);
            }
        } else {
            for glyph in glyphs.iter().rev() {
                renderer.ltr_glyph(glyph.glyph, glyph);
            }
        }
    }
    renderer.finish()
}

struct LineRenderer {
    scale: f32,
    baseline: f32,
    pen: Point,
    /// The last glyph placed has an exit anchor awaiting the next glyph in its chain
    in_chain: bool,
    /// Glyphs of an unfinished cursive chain, whose vertical offset is not known yet
    chain: Vec<(u16, Point)>,
    /// Marks of a left-to-right character, waiting for their base
    marks: Vec<(u16, PositionRecord)>,
    drawn: Vec<(u16, f32, f32)>,
}

impl LineRenderer {
    fn new(scale: f32, pen: Point) -> LineRenderer {
        LineRenderer {
            scale,
            baseline: pen.y,
            pen,
            in_chain: false,
            chain: Vec::new(),
            marks: Vec::new(),
            drawn: Vec::new(),
        }
    }

    fn draw(&mut self, glyph: u16, at: Point) {
        self.drawn.push((glyph, at.x, at.y));
    }

    fn mark_point(&self, position: &PositionRecord) -> Point {
        Point::new(
            self.pen.x - (position.anchor.x - position.placement.x) as f32 * self.scale,
            self.pen.y + (position.anchor.y - position.placement.y) as f32 * self.scale,
        )
    }

    fn placed(&self, position: &PositionRecord) -> Point {
        Point::new(
            self.pen.x,
            self.pen.y - position.placement.y as f32 * self.scale,
        )
    }

    /// Settle the pending chain so that its last glyph sits on the baseline.
    fn end_chain(&mut self) {
        let offset = self.pen.y - self.baseline;
        for (glyph, at) in std::mem::take(&mut self.chain) {
            self.draw(glyph, Point::new(at.x, at.y - offset));
        }
        self.pen.y = self.baseline;
        self.in_chain = false;
    }

    fn rtl_glyph(&mut self, glyph: u16, record: &GlyphRecord) {
        if glyph == 0 {
            return;
        }
        let position = &record.position;
        let anchor_type = position.anchor_type;
        if anchor_type.intersects(AnchorType::MARK | AnchorType::CURSIVE_IGNORED) {
            let at = self.mark_point(position);
            if self.in_chain {
                self.chain.push((glyph, at));
            } else {
                self.draw(glyph, at);
            }
        } else if anchor_type.contains(AnchorType::ENTRY) {
            self.pen.x += position.anchor.x as f32 * self.scale;
            self.pen.y -= position.anchor.y as f32 * self.scale;
            if anchor_type.contains(AnchorType::EXIT) {
                self.in_chain = true;
                self.chain.push((glyph, self.pen));
            } else {
                self.end_chain();
                self.draw(glyph, self.pen);
            }
        } else {
            self.pen.x -= glyph_advance(record) as f32 * self.scale;
            if anchor_type.contains(AnchorType::EXIT) {
                self.in_chain = true;
                self.chain.push((glyph, self.placed(position)));
            } else {
                if self.in_chain {
                    self.end_chain();
                }
                self.draw(glyph, self.placed(position));
            }
        }
    }

    /// Glyphs of a left-to-right character arrive last to first.
    fn ltr_glyph(&mut self, glyph: u16, record: &GlyphRecord) {
        if glyph == 0 {
            return;
        }
        if self.in_chain {
            self.end_chain();
        }
        let position = &record.position;
        if position
            .anchor_type
            .intersects(AnchorType::MARK | AnchorType::CURSIVE_IGNORED)
        {
            self.marks.push((glyph, *position));
            return;
        }
        self.pen.x -= glyph_advance(record) as f32 * self.scale;
        self.draw(glyph, self.placed(position));
        for (mark, position) in std::mem::take(&mut self.marks) {
            let at = self.mark_point(&position);
            self.draw(mark, at);
        }
    }

    fn finish(mut self) -> Vec<(u16, f32, f32)> {
        if !self.chain.is_empty() || self.in_chain {
            self.end_chain();
        }
        for (mark, position) in std::mem::take(&mut self.marks) {
            let at = self.mark_point(&position);
            self.draw(mark, at);
        }
        self.drawn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::TableMap;
    use crate::tag;
    use crate::tests::{format4_cmap, test_font, TestEngine};

    // Glyph n is n pixels wide at the test font's size.
    fn text(text: &str) -> Text<TestEngine> {
        let cmap = format4_cmap(&[
            (' ', 2),
            ('(', 7),
            (')', 8),
            ('A', 3),
            ('B', 4),
            ('\u{05D0}', 5),
            ('\u{05D1}', 6),
        ]);
        let font = test_font(TableMap::new().with_table(tag::CMAP, cmap));
        Text::new(text, Some(font))
    }

    fn rendered(text: &Text<TestEngine>, frame_width: f32) -> Vec<(u16, f32, f32)> {
        let mut glyphs = Vec::new();
        text.show_string(frame_width, Point::default(), 0, usize::MAX, |glyph, x, y| {
            glyphs.push((glyph, x, y))
        });
        glyphs
    }

    #[test]
    fn ltr_left_aligned() {
        let mut ab = text("AB");
        ab.set_alignment(TextAlignment::Left);
        assert_eq!(rendered(&ab, 100.0), vec![(3, 0.0, 0.0), (4, 3.0, 0.0)]);
    }

    #[test]
    fn alignments() {
        let mut ab = text("AB");
        assert_eq!(ab.alignment(), TextAlignment::Right);
        assert_eq!(rendered(&ab, 17.0), vec![(3, 10.0, 0.0), (4, 13.0, 0.0)]);
        ab.set_alignment(TextAlignment::Center);
        assert_eq!(rendered(&ab, 17.0), vec![(3, 5.0, 0.0), (4, 8.0, 0.0)]);
    }

    #[test]
    fn rtl_right_aligned() {
        let hebrew = text("\u{05D0}\u{05D1}");
        assert_eq!(rendered(&hebrew, 20.0), vec![(6, 9.0, 0.0), (5, 15.0, 0.0)]);
    }

    #[test]
    fn rtl_mirrors_brackets() {
        let mut hebrew = text("\u{05D0}(\u{05D1})");
        hebrew.set_writing_direction(WritingDirection::Rtl);
        let glyphs = rendered(&hebrew, 100.0)
            .into_iter()
            .map(|(glyph, _, _)| glyph)
            .collect::<Vec<_>>();
        assert_eq!(glyphs, vec![7, 6, 8, 5]);
    }

    #[test]
    fn breaks_after_spaces() {
        let words = text("AA AA AA");
        assert_eq!(words.measure_lines(15.0), 2);
        assert_eq!(words.measure_height(15.0), 32.0);
        assert_eq!(words.next_line_char_index(15.0, 0, 1), (Some(6), 1));
        assert_eq!(words.next_line_char_index(15.0, 0, 5), (None, 2));
        assert_eq!(words.measure_lines(100.0), 1);
    }

    #[test]
    fn lines_partition_the_string() {
        let words = text("AB A BAB AA B");
        let mut start = 0;
        let mut covered = 0;
        loop {
            let (opt_next, lines) = words.next_line_char_index(7.0, start, 1);
            assert_eq!(lines, 1);
            match opt_next {
                Some(next) => {
                    assert!(next > start);
                    covered += next - start;
                    start = next;
                }
                None => {
                    covered += words.text().chars().count() - start;
                    break;
                }
            }
        }
        assert_eq!(covered, 13);
    }

    #[test]
    fn newline_ends_line() {
        let mut lines = text("AA\nB");
        assert_eq!(lines.measure_lines(100.0), 2);
        lines.set_alignment(TextAlignment::Left);
        assert_eq!(
            rendered(&lines, 100.0),
            vec![(3, 0.0, 0.0), (3, 3.0, 0.0), (4, 0.0, 16.0)]
        );
    }

    #[test]
    fn forced_break_without_spaces() {
        let long = text("AAAA");
        assert_eq!(long.next_line_char_index(7.0, 0, 1), (Some(2), 1));
        assert_eq!(long.measure_lines(0.0), 4);
    }

    #[test]
    fn last_character_counts_towards_overflow() {
        let mut long = text("AAAA");
        assert_eq!(long.measure_lines(10.0), 2);
        assert_eq!(long.measure_lines(7.0), 2);
        assert_eq!(long.next_line_char_index(10.0, 0, 1), (Some(3), 1));
        long.set_alignment(TextAlignment::Left);
        assert_eq!(
            rendered(&long, 10.0),
            vec![(3, 0.0, 0.0), (3, 3.0, 0.0), (3, 6.0, 0.0), (3, 0.0, 16.0)]
        );
    }

    #[test]
    fn wrapped_line_drops_its_break_space() {
        let mut words = text("AA AA AA");
        words.set_alignment(TextAlignment::Left);
        let mut glyphs = Vec::new();
        words.show_string(15.0, Point::default(), 0, 1, |glyph, x, y| {
            glyphs.push((glyph, x, y))
        });
        assert_eq!(
            glyphs,
            vec![(3, 0.0, 0.0), (3, 3.0, 0.0), (2, 6.0, 0.0), (3, 8.0, 0.0), (3, 11.0, 0.0)]
        );

        words.set_alignment(TextAlignment::Right);
        let mut right_edge = 0.0f32;
        words.show_string(15.0, Point::default(), 0, 1, |glyph, x, _| {
            assert!(x >= 0.0);
            right_edge = right_edge.max(x + f32::from(glyph));
        });
        assert_eq!(right_edge, 15.0);
    }

    #[test]
    fn max_lines_limits_rendering() {
        let words = text("AA AA AA");
        let mut count = 0;
        let result = words.show_string(15.0, Point::new(0.0, 10.0), 0, 1, |_, _, y| {
            assert_eq!(y, 10.0);
            count += 1;
        });
        assert_eq!(result, (Some(6), 1));
        assert_eq!(count, 5);
    }

    #[test]
    fn no_font_is_a_no_op() {
        let text = Text::<TestEngine>::new("AB", None);
        assert_eq!(text.measure_lines(100.0), 0);
        assert_eq!(text.measure_height(100.0), 0.0);
        assert_eq!(text.next_line_char_index(100.0, 0, 1), (None, 0));
        let mut called = false;
        let result = text.show_string(100.0, Point::default(), 0, 1, |_, _, _| called = true);
        assert_eq!(result, (None, 0));
        assert!(!called);
    }

    #[test]
    fn empty_text_has_no_lines() {
        let mut empty = text("");
        assert!(empty.record().is_none());
        assert_eq!(empty.measure_lines(100.0), 0);
        empty.set_string("A");
        assert_eq!(empty.measure_lines(100.0), 1);
    }

    #[test]
    fn mark_attachment_offsets_from_base() {
        let mut record = text("AB").record().map(|record| (*record).clone()).unwrap();
        let mark = record
            .get_mut(crate::string_record::GlyphIndex::new(1, 0))
            .unwrap();
        mark.position.anchor_type = AnchorType::MARK;
        mark.position.anchor = crate::string_record::Position::new(-64, -128);
        let tables = DecodedTables::decode(&TableMap::new());
        let glyphs = render_line(&record, &tables, 1.0 / 64.0, 0..2, Point::new(10.0, 0.0));
        // right to left: base then its mark
        assert_eq!(glyphs, vec![(3, 7.0, 0.0), (4, 8.0, -2.0)]);
    }

    #[test]
    fn cursive_chain_ends_on_baseline() {
        let mut record = text("\u{05D0}\u{05D1}\u{05D0}")
            .record()
            .map(|record| (*record).clone())
            .unwrap();
        let mut set = |char_index, anchor_type, anchor: (i32, i32)| {
            let glyph = record
                .get_mut(crate::string_record::GlyphIndex::new(char_index, 0))
                .unwrap();
            glyph.position.anchor_type = anchor_type;
            glyph.position.anchor = crate::string_record::Position::new(anchor.0, anchor.1);
        };
        set(0, AnchorType::EXIT, (0, 0));
        // each entry meets the left edge of the glyph before it, rising 2 then 1 pixel
        set(1, AnchorType::ENTRY | AnchorType::EXIT, (-384, 128));
        set(2, AnchorType::ENTRY, (-320, 64));
        let tables = DecodedTables::decode(&TableMap::new());
        let glyphs = render_line(&record, &tables, 1.0 / 64.0, 0..3, Point::new(20.0, 0.0));
        assert_eq!(glyphs, vec![(5, 15.0, 3.0), (6, 9.0, 1.0), (5, 4.0, 0.0)]);
    }
}
