//! Shared test code.

use std::borrow::Cow;
use std::path::Path;

use crate::error::{FontLoadError, ParseError};
use crate::font::{Font, FontEngine, GlyphBitmap};
use crate::tables::{FontTableProvider, TableMap};

/// An in-memory font engine. Glyph `n` advances `n * 64` font units, which is `n` pixels at
/// 16 pixels per em.
pub(crate) struct TestEngine {
    pub(crate) tables: TableMap,
    pub(crate) pixel_size: f32,
}

impl TestEngine {
    pub(crate) fn new(tables: TableMap) -> TestEngine {
        TestEngine {
            tables,
            pixel_size: 0.0,
        }
    }
}

impl FontTableProvider for TestEngine {
    fn table_data<'a>(&'a self, tag: u32) -> Result<Option<Cow<'a, [u8]>>, ParseError> {
        self.tables.table_data(tag)
    }

    fn has_table(&self, tag: u32) -> bool {
        self.tables.has_table(tag)
    }
}

impl FontEngine for TestEngine {
    fn load(_path: &Path) -> Result<Self, FontLoadError> {
        Err(FontLoadError::Face(String::from("not supported")))
    }

    fn units_per_em(&self) -> u16 {
        1024
    }

    fn ascender(&self) -> i16 {
        768
    }

    fn descender(&self) -> i16 {
        -256
    }

    fn glyph_advance(&self, glyph: u16) -> Option<u16> {
        glyph.checked_mul(64)
    }

    fn set_pixel_size(&mut self, size: f32) {
        self.pixel_size = size;
    }

    fn render_glyph(&mut self, glyph: u16) -> Option<GlyphBitmap> {
        let side = self.pixel_size as u32;
        Some(GlyphBitmap {
            width: side,
            height: side,
            left: 0,
            top: i32::from(glyph),
            pixels: vec![0xFF; (side * side) as usize],
        })
    }
}

/// A 16 pixels per em font over `tables`.
pub(crate) fn test_font(tables: TableMap) -> Font<TestEngine> {
    Font::new(TestEngine::new(tables), 16.0).unwrap()
}

/// Serialise big-endian 16-bit words.
pub(crate) fn to_bytes(words: &[u16]) -> Vec<u8> {
    words.iter().flat_map(|word| word.to_be_bytes()).collect()
}

/// A `cmap` table with a single Windows Unicode BMP format 4 subtable.
///
/// Each mapping gets its own one character segment using `idDelta`.
pub(crate) fn format4_cmap(mappings: &[(char, u16)]) -> Vec<u8> {
    let mut mappings = mappings.to_vec();
    mappings.sort_by_key(|&(ch, _)| ch);

    let seg_count = mappings.len() as u16 + 1;
    let subtable_length = 16 + seg_count * 8;
    let mut words = vec![
        0, // version
        1, // num tables
        3, // platform: Windows
        1, // encoding: Unicode BMP
        0, 12, // offset
        4, // format
        subtable_length,
        0, // language
        seg_count * 2,
        0, 0, 0, // search range, entry selector, range shift
    ];
    words.extend(mappings.iter().map(|&(ch, _)| ch as u16));
    words.push(0xFFFF);
    words.push(0); // reserved pad
    words.extend(mappings.iter().map(|&(ch, _)| ch as u16));
    words.push(0xFFFF);
    words.extend(
        mappings
            .iter()
            .map(|&(ch, glyph)| glyph.wrapping_sub(ch as u16)),
    );
    words.push(1);
    words.extend(std::iter::repeat(0).take(usize::from(seg_count)));
    to_bytes(&words)
}

#[test]
fn format4_cmap_layout() {
    let data = format4_cmap(&[('A', 3)]);
    // header + encoding record + subtable header + 4 arrays of 2 segments + pad
    assert_eq!(data.len(), (2 + 4 + 7 + 2 * 4 + 1) * 2);
}

/// A `GSUB` or `GPOS` table with one script using `script_tag`, whose default language
/// system enables every feature in order.
///
/// Each feature is a tag and the indices of the lookups it applies. Each lookup is a lookup
/// type and the words of its single subtable.
pub(crate) fn layout_table(
    script_tag: u32,
    features: &[(u32, Vec<u16>)],
    lookups: &[(u16, Vec<u16>)],
) -> Vec<u8> {
    let feature_count = features.len() as u16;
    let mut script_list = vec![
        1, // script count
        (script_tag >> 16) as u16,
        script_tag as u16,
        8, // script offset
        4, // default langsys offset
        0, // langsys count
        0, // lookup order
        0xFFFF, // no required feature
        feature_count,
    ];
    script_list.extend(0..feature_count);

    let mut feature_list = vec![feature_count];
    let mut feature_tables = Vec::new();
    let mut offset = 2 + 6 * feature_count;
    for (tag, lookup_indices) in features {
        feature_list.extend([(tag >> 16) as u16, *tag as u16, offset]);
        let table = [vec![0, lookup_indices.len() as u16], lookup_indices.clone()].concat();
        offset += table.len() as u16 * 2;
        feature_tables.extend(table);
    }
    feature_list.extend(feature_tables);

    let script_list_offset = 10;
    let feature_list_offset = script_list_offset + script_list.len() as u16 * 2;
    let lookup_list_offset = feature_list_offset + feature_list.len() as u16 * 2;
    let mut words = vec![1, 0, script_list_offset, feature_list_offset, lookup_list_offset];
    words.extend(script_list);
    words.extend(feature_list);
    words.extend(lookup_list(lookups));
    to_bytes(&words)
}

fn lookup_list(lookups: &[(u16, Vec<u16>)]) -> Vec<u16> {
    let mut words = vec![lookups.len() as u16];
    let mut offset = 2 + 2 * lookups.len() as u16;
    let mut bodies = Vec::new();
    for (lookup_type, subtable) in lookups {
        words.push(offset);
        // lookup type, flag, one subtable directly after the header
        let body = [vec![*lookup_type, 0, 1, 8], subtable.clone()].concat();
        offset += body.len() as u16 * 2;
        bodies.extend(body);
    }
    words.extend(bodies);
    words
}

/// A `GDEF` table classifying each `(glyph, class)` pair.
pub(crate) fn gdef_table(classes: &[(u16, u16)]) -> Vec<u8> {
    let mut classes = classes.to_vec();
    classes.sort();
    let mut words = vec![
        1, 0, // version 1.0
        12, // glyph classdef offset
        0, 0, // attach list, ligature caret list
        0, // mark attach classdef
        2, // classdef format
        classes.len() as u16,
    ];
    for (glyph, class) in classes {
        words.extend([glyph, glyph, class]);
    }
    to_bytes(&words)
}
