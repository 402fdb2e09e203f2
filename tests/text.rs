mod common;

use sheenfigure::bidi::WritingDirection;
use sheenfigure::gdef::{GLYPH_CLASS_BASE, GLYPH_CLASS_MARK};
use sheenfigure::tables::TableMap;
use sheenfigure::tag;
use sheenfigure::{Font, Point, Text, TextAlignment};

use crate::common::{cmap, font, gdef, layout, mark_base, MemoryEngine};

// glyph n is n pixels wide
fn test_font() -> Font<MemoryEngine> {
    font(TableMap::new().with_table(
        tag::CMAP,
        cmap(&[
            (' ', 2),
            ('A', 3),
            ('B', 4),
            ('\u{05D0}', 5),
            ('\u{05D1}', 6),
        ]),
    ))
}

fn render_all(text: &Text<MemoryEngine>, frame_width: f32) -> Vec<(u16, f32, f32)> {
    let mut glyphs = Vec::new();
    let result = text.show_string(frame_width, Point::default(), 0, usize::MAX, |glyph, x, y| {
        glyphs.push((glyph, x, y))
    });
    assert_eq!(result.0, None);
    glyphs
}

#[test]
fn mixed_direction_line() {
    let mut text = Text::new("AB \u{05D0}\u{05D1}", Some(test_font()));
    text.set_alignment(TextAlignment::Left);
    assert_eq!(
        render_all(&text, 100.0),
        vec![
            (3, 0.0, 0.0),
            (4, 3.0, 0.0),
            (2, 7.0, 0.0),
            (6, 9.0, 0.0),
            (5, 15.0, 0.0),
        ]
    );
}

#[test]
fn rtl_paragraph_keeps_latin_left_to_right() {
    let mut text = Text::new("AB", Some(test_font()));
    text.set_writing_direction(WritingDirection::Rtl);
    assert_eq!(text.record().unwrap().levels(), &[2, 2]);
    assert_eq!(render_all(&text, 10.0), vec![(3, 3.0, 0.0), (4, 6.0, 0.0)]);
}

#[test]
fn lines_partition_text_at_any_width() {
    let text = Text::new("AB BA \u{05D0}\u{05D1} AAB B\u{05D0} A", Some(test_font()));
    let char_count = text.text().chars().count();
    for frame_width in [0.0, 3.0, 7.5, 12.0, 20.0, 1000.0] {
        let mut start = 0;
        let mut lines = 0;
        while let (Some(next), 1) = text.next_line_char_index(frame_width, start, 1) {
            assert!(next > start && next < char_count);
            start = next;
            lines += 1;
        }
        assert_eq!(lines + 1, text.measure_lines(frame_width));
    }
}

#[test]
fn rendering_resumes_where_it_stopped() {
    let text = Text::new("AA BB AB BA", Some(test_font()));
    let all = render_all(&text, 12.0);

    let mut resumed = Vec::new();
    let mut from = 0;
    let mut y = 0.0;
    loop {
        let (opt_next, lines) =
            text.show_string(12.0, Point::new(0.0, y), from, 1, |glyph, x, y| {
                resumed.push((glyph, x, y))
            });
        assert_eq!(lines, 1);
        match opt_next {
            Some(next) => from = next,
            None => break,
        }
        y += 16.0;
    }
    assert_eq!(resumed, all);
}

#[test]
fn height_follows_font_size() {
    let mut text = Text::new("AA AA", Some(test_font()));
    assert_eq!(text.measure_lines(7.0), 2);
    assert_eq!(text.measure_height(7.0), 32.0);

    let large = test_font().make_clone(32.0);
    text.set_font(large);
    assert_eq!(text.measure_lines(14.0), 2);
    assert_eq!(text.measure_height(14.0), 64.0);
}

#[test]
fn positioned_mark_is_drawn_over_its_base() {
    let font = font(
        TableMap::new()
            .with_table(tag::CMAP, cmap(&[('A', 3), ('\u{0301}', 9)]))
            .with_table(tag::GDEF, gdef(&[(3, GLYPH_CLASS_BASE), (9, GLYPH_CLASS_MARK)]))
            .with_table(
                tag::GPOS,
                layout(
                    tag::LATN,
                    &[(tag::MARK, vec![0])],
                    &[(4, mark_base(9, 3, (100, 500), (400, 700)))],
                ),
            ),
    );
    let mut text = Text::new("A\u{0301}", Some(font));
    text.set_alignment(TextAlignment::Left);
    // the mark takes no room on the line
    assert_eq!(text.measure_lines(4.5), 1);
    // base anchor (400, 700) meets mark anchor (100, 500): 300 units right and 200 up
    assert_eq!(
        render_all(&text, 100.0),
        vec![(9, 4.6875, -3.125), (3, 0.0, 0.0)]
    );
}
