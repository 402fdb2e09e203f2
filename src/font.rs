//! Fonts and the shaping pipeline.
//!
//! A [Font] is a face at a particular pixel size. The face itself, the engine that renders it
//! and the layout tables decoded from it are shared by every size cloned from the same font.
//! Tables are decoded once, on first use, and are immutable afterwards.

use std::path::Path;
use std::sync::{Arc, OnceLock};

use bitflags::bitflags;
use log::warn;
use parking_lot::Mutex;

use crate::bidi::WritingDirection;
use crate::binary::read::ReadScope;
use crate::error::{DecodeError, FontLoadError, ParseError};
use crate::layout::{GDEFTable, LayoutTable, GPOS, GSUB};
use crate::string_record::{GlyphProperties, StringRecord};
use crate::tables::cmap::{self, CmapSubtable};
use crate::tables::FontTableProvider;
use crate::tag::{self, DisplayTag};
use crate::{gpos, gsub};

/// The font rendering engine a face is loaded into.
///
/// An engine is not expected to be reentrant: every call that sizes or renders a glyph is made
/// while holding the face's lock.
pub trait FontEngine: FontTableProvider {
    /// Load the face stored in the font file at `path`.
    fn load(path: &Path) -> Result<Self, FontLoadError>
    where
        Self: Sized;

    fn units_per_em(&self) -> u16;

    /// Distance from the baseline to the top of the face, in font units
    fn ascender(&self) -> i16;

    /// Distance from the baseline to the bottom of the face, in font units (usually negative)
    fn descender(&self) -> i16;

    /// Horizontal advance of `glyph` in font units
    fn glyph_advance(&self, glyph: u16) -> Option<u16>;

    fn set_pixel_size(&mut self, size: f32);

    fn render_glyph(&mut self, glyph: u16) -> Option<GlyphBitmap>;
}

/// An 8-bit coverage bitmap of a rendered glyph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphBitmap {
    pub width: u32,
    pub height: u32,
    /// Offset from the pen position to the left edge of the bitmap
    pub left: i32,
    /// Offset from the baseline up to the top edge of the bitmap
    pub top: i32,
    pub pixels: Vec<u8>,
}

bitflags! {
    /// The tables a face provided that decoded successfully.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct AvailableTables: u8 {
        const CMAP = 1 << 0;
        const GDEF = 1 << 1;
        const GSUB = 1 << 2;
        const GPOS = 1 << 3;
    }
}

/// Layout tables decoded from a face.
pub struct DecodedTables {
    pub available: AvailableTables,
    pub opt_cmap: Option<CmapSubtable>,
    pub opt_gdef: Option<GDEFTable>,
    pub opt_gsub: Option<LayoutTable<GSUB>>,
    pub opt_gpos: Option<LayoutTable<GPOS>>,
}

impl DecodedTables {
    /// Decode the `cmap`, `GDEF`, `GSUB` and `GPOS` tables of `provider`.
    ///
    /// A table that fails to decode is logged and left out.
    pub fn decode(provider: &impl FontTableProvider) -> DecodedTables {
        let opt_cmap = absorb(decode_table(provider, tag::CMAP, cmap::read_cmap));
        let opt_gdef = absorb(decode_table(provider, tag::GDEF, |data| {
            ReadScope::new(data).read::<GDEFTable>()
        }));
        let opt_gsub = absorb(decode_table(provider, tag::GSUB, |data| {
            ReadScope::new(data).read::<LayoutTable<GSUB>>()
        }));
        let opt_gpos = absorb(decode_table(provider, tag::GPOS, |data| {
            ReadScope::new(data).read::<LayoutTable<GPOS>>()
        }));

        let mut available = AvailableTables::empty();
        available.set(AvailableTables::CMAP, opt_cmap.is_some());
        available.set(AvailableTables::GDEF, opt_gdef.is_some());
        available.set(AvailableTables::GSUB, opt_gsub.is_some());
        available.set(AvailableTables::GPOS, opt_gpos.is_some());

        DecodedTables {
            available,
            opt_cmap,
            opt_gdef,
            opt_gsub,
            opt_gpos,
        }
    }

    /// The glyph `ch` maps to, `0` when there is no `cmap` or no mapping.
    pub fn glyph_for_char(&self, ch: char) -> u16 {
        self.opt_cmap
            .as_ref()
            .map_or(0, |subtable| cmap::char_to_glyph(subtable, ch))
    }

    /// Build the string record for `text` and run substitution and positioning over it.
    pub fn shape(&self, text: &str, direction: WritingDirection) -> StringRecord {
        let mut record = StringRecord::new(text, direction, |ch| self.glyph_for_char(ch));
        let opt_gdef = self.opt_gdef.as_ref();
        if let Some(gsub_table) = &self.opt_gsub {
            gsub::gsub_apply(opt_gdef, gsub_table, &mut record);
        }
        if let Some(gpos_table) = &self.opt_gpos {
            gpos::gpos_apply(opt_gdef, gpos_table, &mut record);
        }
        record
    }
}

fn decode_table<T>(
    provider: &impl FontTableProvider,
    tag: u32,
    decode: impl FnOnce(&[u8]) -> Result<T, ParseError>,
) -> Result<Option<T>, DecodeError> {
    let data = match provider.table_data(tag) {
        Ok(Some(data)) => data,
        Ok(None) => return Ok(None),
        Err(err) => return Err(DecodeError::new(tag, err)),
    };
    decode(&data)
        .map(Some)
        .map_err(|err| DecodeError::new(tag, err))
}

fn absorb<T>(result: Result<Option<T>, DecodeError>) -> Option<T> {
    result.unwrap_or_else(|err| {
        warn!("{}, treating '{}' as absent", err, DisplayTag(err.tag));
        None
    })
}

struct Face<E> {
    engine: Mutex<E>,
    tables: OnceLock<Arc<DecodedTables>>,
    units_per_em: u16,
    ascender: i16,
    descender: i16,
}

/// A face at a particular size in pixels per em.
pub struct Font<E: FontEngine> {
    face: Arc<Face<E>>,
    size: f32,
}

impl<E: FontEngine> Font<E> {
    /// Wrap a loaded engine as a font of `size` pixels per em.
    pub fn new(engine: E, size: f32) -> Result<Font<E>, FontLoadError> {
        let units_per_em = engine.units_per_em();
        if units_per_em == 0 {
            return Err(FontLoadError::Face(String::from("units per em is zero")));
        }
        let face = Face {
            units_per_em,
            ascender: engine.ascender(),
            descender: engine.descender(),
            engine: Mutex::new(engine),
            tables: OnceLock::new(),
        };
        Ok(Font {
            face: Arc::new(face),
            size,
        })
    }

    /// Load the font file at `path` as a font of `size` pixels per em.
    pub fn from_path(path: impl AsRef<Path>, size: f32) -> Result<Font<E>, FontLoadError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(FontLoadError::NotFound(path.to_path_buf()));
        }
        Font::new(E::load(path)?, size)
    }

    /// The same face at another size, sharing its engine and decoded tables.
    pub fn make_clone(&self, size: f32) -> Font<E> {
        Font {
            face: Arc::clone(&self.face),
            size,
        }
    }

    /// Whether `other` was created from the same face as this font.
    pub fn same_face(&self, other: &Font<E>) -> bool {
        Arc::ptr_eq(&self.face, &other.face)
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    /// Pixels per font unit at this size
    pub fn size_by_em(&self) -> f32 {
        self.size / f32::from(self.face.units_per_em)
    }

    pub fn ascender(&self) -> f32 {
        f32::from(self.face.ascender) * self.size_by_em()
    }

    pub fn descender(&self) -> f32 {
        f32::from(self.face.descender) * self.size_by_em()
    }

    /// Height of one line of text
    pub fn leading(&self) -> f32 {
        self.ascender() - self.descender()
    }

    /// The decoded tables of the face, decoding them on first use.
    pub fn tables(&self) -> Arc<DecodedTables> {
        let tables = self.face.tables.get_or_init(|| {
            let engine = self.face.engine.lock();
            Arc::new(DecodedTables::decode(&*engine))
        });
        Arc::clone(tables)
    }

    /// Shape `text`, caching the advance of every glyph it produces.
    ///
    /// Returns `None` for empty text.
    pub fn shape(&self, text: &str, direction: WritingDirection) -> Option<StringRecord> {
        if text.is_empty() {
            return None;
        }
        let mut record = self.tables().shape(text, direction);
        let engine = self.face.engine.lock();
        for glyph in record.iter_mut() {
            if !glyph.props.contains(GlyphProperties::ADVANCE) {
                glyph.advance = engine.glyph_advance(glyph.glyph).map_or(0, i32::from);
                glyph.props |= GlyphProperties::ADVANCE;
            }
        }
        Some(record)
    }

    /// Horizontal advance of `glyph` in font units.
    pub fn glyph_advance(&self, glyph: u16) -> i32 {
        self.face
            .engine
            .lock()
            .glyph_advance(glyph)
            .map_or(0, i32::from)
    }

    /// Render `glyph` at this font's size.
    pub fn render_glyph(&self, glyph: u16) -> Option<GlyphBitmap> {
        let mut engine = self.face.engine.lock();
        engine.set_pixel_size(self.size);
        engine.render_glyph(glyph)
    }
}

impl<E: FontEngine> Clone for Font<E> {
    fn clone(&self) -> Self {
        self.make_clone(self.size)
    }
}
