use sheenfigure::bidi::{BidiParagraph, WritingDirection};

// text, direction, resolved levels, visual order
const CASES: &[(&str, WritingDirection, &[u8], &[usize])] = &[
    ("abc", WritingDirection::Auto, &[0, 0, 0], &[0, 1, 2]),
    (
        "\u{0627}\u{0628}\u{062A}",
        WritingDirection::Auto,
        &[1, 1, 1],
        &[2, 1, 0],
    ),
    (
        "\u{05D0}\u{05D1} abc",
        WritingDirection::Auto,
        &[1, 1, 1, 2, 2, 2],
        &[3, 4, 5, 2, 1, 0],
    ),
    (
        "ab \u{05D0}\u{05D1} cd",
        WritingDirection::Auto,
        &[0, 0, 0, 1, 1, 0, 0, 0],
        &[0, 1, 2, 4, 3, 5, 6, 7],
    ),
    (
        "\u{05D0} 12 \u{05D1}",
        WritingDirection::Auto,
        &[1, 1, 2, 2, 1, 1],
        &[5, 4, 2, 3, 1, 0],
    ),
    ("ab", WritingDirection::Rtl, &[2, 2], &[0, 1]),
];

#[test]
fn reference_vectors() {
    for &(text, direction, levels, visual) in CASES {
        let chars = text.chars().collect::<Vec<_>>();
        let paragraph = BidiParagraph::new(&chars, direction);
        assert_eq!(paragraph.levels, levels, "levels of {:?}", text);
        let order = paragraph
            .reorder_line(0..chars.len())
            .into_iter()
            .map(|(index, _)| index)
            .collect::<Vec<_>>();
        assert_eq!(order, visual, "visual order of {:?}", text);
    }
}

#[test]
fn lines_reorder_independently() {
    let chars = "\u{05D0}\u{05D1} ab \u{05D2}".chars().collect::<Vec<_>>();
    let paragraph = BidiParagraph::new(&chars, WritingDirection::Auto);
    assert_eq!(paragraph.base_level, 1);
    let first = paragraph
        .reorder_line(0..3)
        .into_iter()
        .map(|(index, _)| index)
        .collect::<Vec<_>>();
    // the trailing space is reset to the paragraph level
    assert_eq!(first, vec![2, 1, 0]);
}
