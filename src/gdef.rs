//! `gdef` font table utilities.
//!
//! Glyph classification and the glyph-stream scans that every `GSUB` and `GPOS` lookup
//! uses to step over glyphs its lookup flag ignores.
//!
//! <https://docs.microsoft.com/en-us/typography/opentype/spec/gdef>

use crate::context::MatchType;
use crate::layout::GDEFTable;
use crate::string_record::{GlyphIndex, GlyphProperties, StringRecord};

pub const GLYPH_CLASS_NONE: u16 = 0;
pub const GLYPH_CLASS_BASE: u16 = 1;
pub const GLYPH_CLASS_LIGATURE: u16 = 2;
pub const GLYPH_CLASS_MARK: u16 = 3;
pub const GLYPH_CLASS_COMPONENT: u16 = 4;

pub fn glyph_class(opt_gdef_table: Option<&GDEFTable>, glyph: u16) -> u16 {
    opt_gdef_table.map_or(GLYPH_CLASS_NONE, |gdef| gdef.glyph_class(glyph))
}

pub fn mark_attach_class(opt_gdef_table: Option<&GDEFTable>, glyph: u16) -> u16 {
    opt_gdef_table.map_or(GLYPH_CLASS_NONE, |gdef| gdef.mark_attach_class(glyph))
}

/// Properties of `glyph` derived from the `GDEF` glyph class definition.
pub fn classify(opt_gdef_table: Option<&GDEFTable>, glyph: u16) -> GlyphProperties {
    let class = match glyph_class(opt_gdef_table, glyph) {
        GLYPH_CLASS_BASE => GlyphProperties::BASE,
        GLYPH_CLASS_LIGATURE => GlyphProperties::LIGATURE,
        GLYPH_CLASS_MARK => GlyphProperties::MARK,
        GLYPH_CLASS_COMPONENT => GlyphProperties::COMPONENT,
        _ => GlyphProperties::empty(),
    };
    GlyphProperties::RECEIVED | class
}

/// The properties of the glyph at `index`, classifying it on first use.
pub fn glyph_properties(
    opt_gdef_table: Option<&GDEFTable>,
    record: &mut StringRecord,
    index: GlyphIndex,
) -> GlyphProperties {
    match record.get_mut(index) {
        Some(glyph) => {
            if !glyph.props.contains(GlyphProperties::RECEIVED) {
                glyph.props |= classify(opt_gdef_table, glyph.glyph);
            }
            glyph.props
        }
        None => GlyphProperties::empty(),
    }
}

/// Whether a lookup with `match_type` skips the glyph at `index`.
///
/// Deleted glyphs and out of range indices are always ignored.
pub fn is_ignored_glyph(
    opt_gdef_table: Option<&GDEFTable>,
    record: &mut StringRecord,
    index: GlyphIndex,
    match_type: MatchType,
) -> bool {
    let glyph = record.glyph(index);
    if glyph == 0 {
        return true;
    }
    let props = glyph_properties(opt_gdef_table, record, index);
    let flag = match_type.lookup_flag;

    if props.contains(GlyphProperties::MARK) {
        if flag.get_ignore_marks() {
            return true;
        }
        if let Some(set_index) = match_type.mark_filtering_set {
            return !opt_gdef_table.is_some_and(|gdef| gdef.glyph_in_mark_set(glyph, set_index));
        }
        let attachment_type = flag.get_mark_attachment_type();
        if attachment_type != 0
            && opt_gdef_table.is_some_and(|gdef| gdef.opt_mark_attach_classdef.is_some())
            && mark_attach_class(opt_gdef_table, glyph) != attachment_type
        {
            return true;
        }
    }
    if flag.get_ignore_ligatures() && props.contains(GlyphProperties::LIGATURE) {
        return true;
    }
    flag.get_ignore_bases() && props.contains(GlyphProperties::BASE)
}

/// The first glyph after `index` that `match_type` does not ignore.
pub fn next_valid_glyph(
    opt_gdef_table: Option<&GDEFTable>,
    record: &mut StringRecord,
    index: GlyphIndex,
    match_type: MatchType,
) -> Option<GlyphIndex> {
    let mut current = record.next_index(index)?;
    loop {
        if !is_ignored_glyph(opt_gdef_table, record, current, match_type) {
            return Some(current);
        }
        current = record.next_index(current)?;
    }
}

/// The last glyph before `index` that `match_type` does not ignore.
pub fn prev_valid_glyph(
    opt_gdef_table: Option<&GDEFTable>,
    record: &mut StringRecord,
    index: GlyphIndex,
    match_type: MatchType,
) -> Option<GlyphIndex> {
    let mut current = record.prev_index(index)?;
    loop {
        if !is_ignored_glyph(opt_gdef_table, record, current, match_type) {
            return Some(current);
        }
        current = record.prev_index(current)?;
    }
}

// A glyph with no GDEF class can act as a base or a ligature; fonts without a glyph class
// definition still attach marks.
fn is_unclassified(props: GlyphProperties) -> bool {
    props == GlyphProperties::RECEIVED
}

/// The base glyph a mark at `index` attaches to.
///
/// Marks in between are skipped. Any other glyph that is not a base ends the search.
pub fn prev_base_glyph(
    opt_gdef_table: Option<&GDEFTable>,
    record: &mut StringRecord,
    index: GlyphIndex,
    match_type: MatchType,
) -> Option<GlyphIndex> {
    let mut current = index;
    loop {
        current = prev_valid_glyph(opt_gdef_table, record, current, match_type)?;
        let props = glyph_properties(opt_gdef_table, record, current);
        if props.contains(GlyphProperties::BASE) || is_unclassified(props) {
            return Some(current);
        } else if !props.contains(GlyphProperties::MARK) {
            return None;
        }
    }
}

/// The ligature a mark at `index` attaches to, along with the index of the ligature
/// component the mark belongs to.
///
/// The component is the number of deleted glyphs between the ligature and the mark: each
/// absorbed component leaves one behind.
pub fn prev_ligature_glyph(
    opt_gdef_table: Option<&GDEFTable>,
    record: &mut StringRecord,
    index: GlyphIndex,
    match_type: MatchType,
) -> Option<(GlyphIndex, usize)> {
    let mut empty_glyphs = 0;
    let mut current = index;
    loop {
        current = record.prev_index(current)?;
        if record.glyph(current) == 0 {
            empty_glyphs += 1;
            continue;
        }
        if is_ignored_glyph(opt_gdef_table, record, current, match_type) {
            continue;
        }
        let props = glyph_properties(opt_gdef_table, record, current);
        if props.contains(GlyphProperties::LIGATURE) || is_unclassified(props) {
            return Some((current, empty_glyphs));
        } else if !props.contains(GlyphProperties::MARK) {
            return None;
        }
    }
}

/// The mark a mark at `index` attaches to. Only the immediately preceding valid glyph is
/// considered.
pub fn prev_mark_glyph(
    opt_gdef_table: Option<&GDEFTable>,
    record: &mut StringRecord,
    index: GlyphIndex,
    match_type: MatchType,
) -> Option<GlyphIndex> {
    let prev = prev_valid_glyph(opt_gdef_table, record, index, match_type)?;
    glyph_properties(opt_gdef_table, record, prev)
        .contains(GlyphProperties::MARK)
        .then_some(prev)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bidi::WritingDirection;
    use crate::context::LookupFlag;
    use crate::layout::{ClassDef, ClassRangeRecord, Coverage};

    const BASE: u16 = 1;
    const LIGATURE: u16 = 2;
    const MARK_A: u16 = 3;
    const MARK_B: u16 = 4;

    fn gdef() -> GDEFTable {
        GDEFTable {
            opt_glyph_classdef: Some(ClassDef::Format2 {
                class_range_array: vec![
                    ClassRangeRecord {
                        start_glyph: BASE,
                        end_glyph: BASE,
                        class_value: GLYPH_CLASS_BASE,
                    },
                    ClassRangeRecord {
                        start_glyph: LIGATURE,
                        end_glyph: LIGATURE,
                        class_value: GLYPH_CLASS_LIGATURE,
                    },
                    ClassRangeRecord {
                        start_glyph: MARK_A,
                        end_glyph: MARK_B,
                        class_value: GLYPH_CLASS_MARK,
                    },
                ],
            }),
            opt_mark_attach_classdef: Some(ClassDef::Format1 {
                start_glyph: MARK_A,
                class_value_array: vec![1, 2],
            }),
            opt_mark_glyph_sets: Some(vec![Coverage::Format1 {
                glyph_array: vec![MARK_B],
            }]),
        }
    }

    fn make_record(glyphs: &[u16]) -> StringRecord {
        let text = "x".repeat(glyphs.len());
        let mut glyphs = glyphs.iter().copied();
        StringRecord::new(&text, WritingDirection::Ltr, |_| glyphs.next().unwrap_or(0))
    }

    fn flag(bits: u16) -> MatchType {
        MatchType::from_lookup_flag(LookupFlag(bits), None)
    }

    fn at(char_index: usize) -> GlyphIndex {
        GlyphIndex::new(char_index, 0)
    }

    #[test]
    fn classification_is_memoized() {
        let gdef = gdef();
        let mut record = make_record(&[MARK_A, 9]);
        let props = glyph_properties(Some(&gdef), &mut record, at(0));
        assert_eq!(props, GlyphProperties::RECEIVED | GlyphProperties::MARK);
        assert_eq!(record.get(at(0)).unwrap().props, props);
        assert_eq!(
            glyph_properties(Some(&gdef), &mut record, at(1)),
            GlyphProperties::RECEIVED
        );
    }

    #[test]
    fn deleted_glyph_always_ignored() {
        let gdef = gdef();
        let mut record = make_record(&[0]);
        assert!(is_ignored_glyph(Some(&gdef), &mut record, at(0), flag(0)));
        assert!(is_ignored_glyph(None, &mut record, at(0), flag(0)));
    }

    #[test]
    fn ignore_flags() {
        let gdef = gdef();
        let mut record = make_record(&[BASE, LIGATURE, MARK_A]);
        let gdef = Some(&gdef);
        assert!(!is_ignored_glyph(gdef, &mut record, at(0), flag(0)));
        let ignore_bases = flag(LookupFlag::IGNORE_BASE_GLYPHS);
        assert!(is_ignored_glyph(gdef, &mut record, at(0), ignore_bases));
        let ignore_ligatures = flag(LookupFlag::IGNORE_LIGATURES);
        assert!(is_ignored_glyph(gdef, &mut record, at(1), ignore_ligatures));
        let ignore_marks = flag(LookupFlag::IGNORE_MARKS);
        assert!(is_ignored_glyph(gdef, &mut record, at(2), ignore_marks));
        assert!(!is_ignored_glyph(gdef, &mut record, at(0), ignore_marks));
    }

    #[test]
    fn mark_attachment_type() {
        let gdef = gdef();
        let mut record = make_record(&[MARK_A, MARK_B]);
        let only_class_1 = flag(1 << 8);
        assert!(!is_ignored_glyph(Some(&gdef), &mut record, at(0), only_class_1));
        assert!(is_ignored_glyph(Some(&gdef), &mut record, at(1), only_class_1));
    }

    #[test]
    fn mark_filtering_set() {
        let gdef = gdef();
        let mut record = make_record(&[MARK_A, MARK_B]);
        let filtered =
            MatchType::from_lookup_flag(LookupFlag(LookupFlag::USE_MARK_FILTERING_SET), Some(0));
        assert!(is_ignored_glyph(Some(&gdef), &mut record, at(0), filtered));
        assert!(!is_ignored_glyph(Some(&gdef), &mut record, at(1), filtered));
    }

    #[test]
    fn scans_cross_characters() {
        let gdef = gdef();
        let mut record = make_record(&[BASE, MARK_A, 0, BASE]);
        let skip_marks = flag(LookupFlag::IGNORE_MARKS);
        assert_eq!(
            next_valid_glyph(Some(&gdef), &mut record, at(0), skip_marks),
            Some(at(3))
        );
        assert_eq!(
            prev_valid_glyph(Some(&gdef), &mut record, at(3), skip_marks),
            Some(at(0))
        );
        assert_eq!(prev_valid_glyph(Some(&gdef), &mut record, at(0), skip_marks), None);
    }

    #[test]
    fn base_scan_skips_marks() {
        let gdef = gdef();
        let mut record = make_record(&[BASE, MARK_A, MARK_B]);
        assert_eq!(
            prev_base_glyph(Some(&gdef), &mut record, at(2), flag(0)),
            Some(at(0))
        );

        let mut record = make_record(&[LIGATURE, MARK_A]);
        assert_eq!(prev_base_glyph(Some(&gdef), &mut record, at(1), flag(0)), None);
    }

    #[test]
    fn ligature_scan_counts_components() {
        let gdef = gdef();
        let mut record = make_record(&[LIGATURE, 0, 0, MARK_A]);
        assert_eq!(
            prev_ligature_glyph(Some(&gdef), &mut record, at(3), flag(0)),
            Some((at(0), 2))
        );

        let mut record = make_record(&[LIGATURE, MARK_A, 0, MARK_B]);
        assert_eq!(
            prev_ligature_glyph(Some(&gdef), &mut record, at(3), flag(0)),
            Some((at(0), 1))
        );

        let mut record = make_record(&[BASE, MARK_A]);
        assert_eq!(prev_ligature_glyph(Some(&gdef), &mut record, at(1), flag(0)), None);
    }

    #[test]
    fn mark_scan_only_looks_at_neighbour() {
        let gdef = gdef();
        let mut record = make_record(&[BASE, MARK_A, MARK_B]);
        assert_eq!(
            prev_mark_glyph(Some(&gdef), &mut record, at(2), flag(0)),
            Some(at(1))
        );
        assert_eq!(prev_mark_glyph(Some(&gdef), &mut record, at(1), flag(0)), None);
    }

    #[test]
    fn no_gdef_treats_everything_as_unclassified() {
        let mut record = make_record(&[5, 6]);
        assert!(!is_ignored_glyph(None, &mut record, at(1), flag(LookupFlag::IGNORE_MARKS)));
        assert_eq!(prev_base_glyph(None, &mut record, at(1), flag(0)), Some(at(0)));
    }
}
