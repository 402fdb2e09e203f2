#![allow(dead_code)]

use std::borrow::Cow;
use std::path::Path;

use sheenfigure::error::{FontLoadError, ParseError};
use sheenfigure::font::{Font, FontEngine, GlyphBitmap};
use sheenfigure::tables::{FontTableProvider, TableMap};

/// A font engine over in-memory tables with 1024 units per em. Glyph `n` advances `n * 64`
/// units, so `n` pixels in a 16 pixel font.
pub struct MemoryEngine {
    tables: TableMap,
}

impl FontTableProvider for MemoryEngine {
    fn table_data<'a>(&'a self, tag: u32) -> Result<Option<Cow<'a, [u8]>>, ParseError> {
        self.tables.table_data(tag)
    }

    fn has_table(&self, tag: u32) -> bool {
        self.tables.has_table(tag)
    }
}

impl FontEngine for MemoryEngine {
    fn load(path: &Path) -> Result<Self, FontLoadError> {
        Err(FontLoadError::Face(format!("{} is not in memory", path.display())))
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

    fn set_pixel_size(&mut self, _size: f32) {}

    fn render_glyph(&mut self, _glyph: u16) -> Option<GlyphBitmap> {
        None
    }
}

pub fn font(tables: TableMap) -> Font<MemoryEngine> {
    Font::new(MemoryEngine { tables }, 16.0).expect("valid engine")
}

pub fn to_bytes(words: &[u16]) -> Vec<u8> {
    words.iter().flat_map(|word| word.to_be_bytes()).collect()
}

/// A `cmap` table holding a format 4 subtable with one segment per mapping.
pub fn cmap(mappings: &[(char, u16)]) -> Vec<u8> {
    let mut mappings = mappings.to_vec();
    mappings.sort_by_key(|&(ch, _)| ch);
    let seg_count = mappings.len() as u16 + 1;
    let mut words = vec![0, 1, 3, 1, 0, 12, 4, 16 + seg_count * 8, 0, seg_count * 2, 0, 0, 0];
    words.extend(mappings.iter().map(|&(ch, _)| ch as u16));
    words.extend([0xFFFF, 0]);
    words.extend(mappings.iter().map(|&(ch, _)| ch as u16));
    words.push(0xFFFF);
    words.extend(mappings.iter().map(|&(ch, glyph)| glyph.wrapping_sub(ch as u16)));
    words.push(1);
    words.extend(std::iter::repeat(0).take(usize::from(seg_count)));
    to_bytes(&words)
}

/// A `GDEF` table assigning each glyph a class.
pub fn gdef(classes: &[(u16, u16)]) -> Vec<u8> {
    let mut classes = classes.to_vec();
    classes.sort();
    let mut words = vec![1, 0, 12, 0, 0, 0, 2, classes.len() as u16];
    for (glyph, class) in classes {
        words.extend([glyph, glyph, class]);
    }
    to_bytes(&words)
}

/// A `GSUB` or `GPOS` table with a single script, whose default language system enables
/// `features` in order. Every lookup has one subtable and no flags.
pub fn layout(
    script_tag: u32,
    features: &[(u32, Vec<u16>)],
    lookups: &[(u16, Vec<u16>)],
) -> Vec<u8> {
    let feature_count = features.len() as u16;
    let mut script_list = vec![
        1,
        (script_tag >> 16) as u16,
        script_tag as u16,
        8,
        4,
        0,
        0,
        0xFFFF,
        feature_count,
    ];
    script_list.extend(0..feature_count);

    let mut feature_list = vec![feature_count];
    let mut tables = Vec::new();
    let mut offset = 2 + 6 * feature_count;
    for (tag, indices) in features {
        feature_list.extend([(tag >> 16) as u16, *tag as u16, offset]);
        let table = [vec![0, indices.len() as u16], indices.clone()].concat();
        offset += table.len() as u16 * 2;
        tables.extend(table);
    }
    feature_list.extend(tables);

    let mut lookup_list = vec![lookups.len() as u16];
    let mut offset = 2 + 2 * lookups.len() as u16;
    let mut bodies = Vec::new();
    for (lookup_type, subtable) in lookups {
        lookup_list.push(offset);
        let body = [vec![*lookup_type, 0, 1, 8], subtable.clone()].concat();
        offset += body.len() as u16 * 2;
        bodies.extend(body);
    }
    lookup_list.extend(bodies);

    let feature_list_offset = 10 + script_list.len() as u16 * 2;
    let lookup_list_offset = feature_list_offset + feature_list.len() as u16 * 2;
    let mut words = vec![1, 0, 10, feature_list_offset, lookup_list_offset];
    words.extend(script_list);
    words.extend(feature_list);
    words.extend(lookup_list);
    to_bytes(&words)
}

/// A format 1 single substitution adding `delta` to `glyph`.
pub fn single_subst(glyph: u16, delta: i16) -> Vec<u16> {
    vec![1, 6, delta as u16, 1, 1, glyph]
}

/// A format 1 mark-to-base subtable attaching `mark` to `base`.
pub fn mark_base(
    mark: u16,
    base: u16,
    mark_anchor: (i16, i16),
    base_anchor: (i16, i16),
) -> Vec<u16> {
    #[rustfmt::skip]
    let words = vec![
        1, 12, 18, 1, 24, 36,
        1, 1, mark,
        1, 1, base,
        1, 0, 6,
        1, mark_anchor.0 as u16, mark_anchor.1 as u16,
        1, 4,
        1, base_anchor.0 as u16, base_anchor.1 as u16,
    ];
    words
}
