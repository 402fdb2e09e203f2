//! The mutable buffer a string is shaped in.
//!
//! A [StringRecord] holds one [CharRecord] per input character, in logical order. Each
//! character owns a small list of [GlyphRecord]s which substitution rewrites in place: a
//! multiple substitution grows the list of the character it applies to, a ligature zeroes
//! the glyphs it absorbs. A character never loses its last glyph slot, so glyph ids of `0`
//! mark deleted glyphs rather than removed entries.
//!
//! Glyphs are addressed by [GlyphIndex]. An index stays valid across mutations of other
//! characters; an index into a character whose glyph list grew must be re-derived.

use bitflags::bitflags;
use tinyvec::{tiny_vec, TinyVec};

use crate::bidi::{BidiClass, BidiParagraph, WritingDirection};

bitflags! {
    /// Classification of a glyph, memoized from `GDEF` the first time a lookup flag is
    /// evaluated against it. Empty means the glyph has not been classified yet.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct GlyphProperties: u8 {
        const RECEIVED = 0x01;
        const BASE = 0x02;
        const MARK = 0x04;
        const LIGATURE = 0x08;
        const COMPONENT = 0x10;
        /// `GlyphRecord::advance` holds the glyph's advance width
        const ADVANCE = 0x20;
    }
}

bitflags! {
    /// How a glyph is attached to its neighbours by positioning.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AnchorType: u8 {
        /// Skipped over inside a cursive chain, positioned with the chain
        const CURSIVE_IGNORED = 0x01;
        const MARK = 0x02;
        const EXIT = 0x04;
        const ENTRY = 0x08;
    }
}

/// A 2D offset in font units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Position {
        Position { x, y }
    }
}

/// Positioning accumulated for a glyph by `GPOS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PositionRecord {
    pub placement: Position,
    pub advance: Position,
    pub anchor_type: AnchorType,
    /// Offset from the glyph this one is attached to, valid when `anchor_type` is set
    pub anchor: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GlyphRecord {
    pub glyph: u16,
    pub props: GlyphProperties,
    /// Cached horizontal advance in font units, valid when `props` contains `ADVANCE`
    pub advance: i32,
    pub position: PositionRecord,
}

impl GlyphRecord {
    pub fn new(glyph: u16) -> GlyphRecord {
        GlyphRecord {
            glyph,
            ..GlyphRecord::default()
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.glyph == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharRecord {
    pub glyphs: TinyVec<[GlyphRecord; 1]>,
}

impl CharRecord {
    fn new(glyph: u16) -> CharRecord {
        CharRecord {
            glyphs: tiny_vec!([GlyphRecord; 1] => GlyphRecord::new(glyph)),
        }
    }
}

/// Cursor into the glyph stream of a [StringRecord], ordered by character then glyph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct GlyphIndex {
    pub char_index: usize,
    pub glyph_index: usize,
}

impl GlyphIndex {
    pub const fn new(char_index: usize, glyph_index: usize) -> GlyphIndex {
        GlyphIndex {
            char_index,
            glyph_index,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringRecord {
    chars: Vec<char>,
    base_level: u8,
    classes: Vec<BidiClass>,
    levels: Vec<u8>,
    char_records: Vec<CharRecord>,
}

impl StringRecord {
    /// Resolve bidi levels for `text` and seed each character with the glyph `map_char`
    /// returns for it.
    pub fn new(
        text: &str,
        direction: WritingDirection,
        mut map_char: impl FnMut(char) -> u16,
    ) -> StringRecord {
        let chars = text.chars().collect::<Vec<_>>();
        let BidiParagraph {
            base_level,
            classes,
            levels,
        } = BidiParagraph::new(&chars, direction);
        let char_records = chars
            .iter()
            .map(|&ch| CharRecord::new(map_char(ch)))
            .collect();
        StringRecord {
            chars,
            base_level,
            classes,
            levels,
            char_records,
        }
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    pub fn char_count(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Number of glyphs that have not been deleted.
    pub fn glyph_count(&self) -> usize {
        self.char_records
            .iter()
            .flat_map(|record| record.glyphs.iter())
            .filter(|glyph| !glyph.is_deleted())
            .count()
    }

    pub fn base_level(&self) -> u8 {
        self.base_level
    }

    pub fn classes(&self) -> &[BidiClass] {
        &self.classes
    }

    pub fn levels(&self) -> &[u8] {
        &self.levels
    }

    pub fn level(&self, char_index: usize) -> u8 {
        self.levels
            .get(char_index)
            .copied()
            .unwrap_or(self.base_level)
    }

    /// The glyphs of character `char_index`, empty when out of range.
    pub fn glyphs(&self, char_index: usize) -> &[GlyphRecord] {
        self.char_records
            .get(char_index)
            .map_or(&[], |record| record.glyphs.as_slice())
    }

    pub fn get(&self, index: GlyphIndex) -> Option<&GlyphRecord> {
        self.char_records
            .get(index.char_index)
            .and_then(|record| record.glyphs.get(index.glyph_index))
    }

    pub fn get_mut(&mut self, index: GlyphIndex) -> Option<&mut GlyphRecord> {
        self.char_records
            .get_mut(index.char_index)
            .and_then(|record| record.glyphs.get_mut(index.glyph_index))
    }

    /// The glyph id at `index`, 0 if `index` is out of range.
    pub fn glyph(&self, index: GlyphIndex) -> u16 {
        self.get(index).map_or(0, |record| record.glyph)
    }

    /// Replace the glyph at `index`. The new glyph has to be classified afresh.
    pub fn set_glyph(&mut self, index: GlyphIndex, glyph: u16) {
        if let Some(record) = self.get_mut(index) {
            record.glyph = glyph;
            record.props = GlyphProperties::empty();
        }
    }

    pub fn delete_glyph(&mut self, index: GlyphIndex) {
        self.set_glyph(index, 0);
    }

    /// Replace the glyph at `index` with `glyphs`, growing its character's glyph list.
    ///
    /// An empty sequence deletes the glyph. Returns the number of glyph slots now occupying
    /// the position of the replaced glyph.
    pub fn replace_glyph(&mut self, index: GlyphIndex, glyphs: &[u16]) -> usize {
        let Some((&first, rest)) = glyphs.split_first() else {
            self.delete_glyph(index);
            return 1;
        };
        self.set_glyph(index, first);
        if let Some(record) = self.char_records.get_mut(index.char_index) {
            let mut insert_at = index.glyph_index + 1;
            for &glyph in rest {
                if insert_at > record.glyphs.len() {
                    break;
                }
                record.glyphs.insert(insert_at, GlyphRecord::new(glyph));
                insert_at += 1;
            }
        }
        glyphs.len()
    }

    pub fn first_index(&self) -> Option<GlyphIndex> {
        self.char_records
            .iter()
            .position(|record| !record.glyphs.is_empty())
            .map(|char_index| GlyphIndex::new(char_index, 0))
    }

    pub fn last_index(&self) -> Option<GlyphIndex> {
        self.char_records
            .iter()
            .rposition(|record| !record.glyphs.is_empty())
            .map(|char_index| {
                GlyphIndex::new(char_index, self.char_records[char_index].glyphs.len() - 1)
            })
    }

    /// The index following `index` in logical order, crossing character boundaries.
    pub fn next_index(&self, index: GlyphIndex) -> Option<GlyphIndex> {
        if index.glyph_index + 1 < self.glyphs(index.char_index).len() {
            return Some(GlyphIndex::new(index.char_index, index.glyph_index + 1));
        }
        ((index.char_index + 1)..self.char_records.len())
            .find(|&char_index| !self.char_records[char_index].glyphs.is_empty())
            .map(|char_index| GlyphIndex::new(char_index, 0))
    }

    /// The index preceding `index` in logical order, crossing character boundaries.
    pub fn prev_index(&self, index: GlyphIndex) -> Option<GlyphIndex> {
        if index.glyph_index > 0 {
            return Some(GlyphIndex::new(index.char_index, index.glyph_index - 1));
        }
        (0..index.char_index.min(self.char_records.len()))
            .rev()
            .find(|&char_index| !self.char_records[char_index].glyphs.is_empty())
            .map(|char_index| {
                GlyphIndex::new(char_index, self.char_records[char_index].glyphs.len() - 1)
            })
    }

    /// Iterate over every glyph slot in logical order, deleted glyphs included.
    pub fn iter(&self) -> impl Iterator<Item = (GlyphIndex, &GlyphRecord)> + '_ {
        self.char_records
            .iter()
            .enumerate()
            .flat_map(|(char_index, record)| {
                record.glyphs.iter().enumerate().map(move |(glyph_index, glyph)| {
                    (GlyphIndex::new(char_index, glyph_index), glyph)
                })
            })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut GlyphRecord> + '_ {
        self.char_records
            .iter_mut()
            .flat_map(|record| record.glyphs.iter_mut())
    }
}
