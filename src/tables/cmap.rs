//! `cmap` table decoding and character to glyph mapping.
//!
//! <https://docs.microsoft.com/en-us/typography/opentype/spec/cmap>

use std::convert::TryFrom;

use log::debug;

use crate::binary::read::{ReadArray, ReadBinary, ReadCtxt, ReadFrom, ReadScope};
use crate::binary::{I16Be, U16Be, U32Be};
use crate::error::ParseError;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PlatformId(pub u16);

impl PlatformId {
    pub const UNICODE: PlatformId = PlatformId(0);
    pub const MACINTOSH: PlatformId = PlatformId(1);
    pub const WINDOWS: PlatformId = PlatformId(3);
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EncodingId(pub u16);

impl EncodingId {
    pub const WINDOWS_SYMBOL: EncodingId = EncodingId(0);
    pub const WINDOWS_UNICODE_BMP_UCS2: EncodingId = EncodingId(1);
    pub const WINDOWS_UNICODE_UCS4: EncodingId = EncodingId(10);

    pub const UNICODE_BMP: EncodingId = EncodingId(3);
    pub const UNICODE_FULL: EncodingId = EncodingId(4);
}

/// Subtables are tried in this order; the first one that decodes is used.
const SUBTABLE_PREFERENCE: &[(PlatformId, EncodingId)] = &[
    (PlatformId::WINDOWS, EncodingId::WINDOWS_UNICODE_UCS4),
    (PlatformId::UNICODE, EncodingId::UNICODE_FULL),
    (PlatformId::WINDOWS, EncodingId::WINDOWS_UNICODE_BMP_UCS2),
    (PlatformId::UNICODE, EncodingId::UNICODE_BMP),
    (PlatformId::WINDOWS, EncodingId::WINDOWS_SYMBOL),
];

pub struct Cmap<'a> {
    pub scope: ReadScope<'a>,
    encoding_records: ReadArray<'a, EncodingRecord>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EncodingRecord {
    pub platform_id: u16,
    pub encoding_id: u16,
    pub offset: u32,
}

/// A decoded cmap subtable
///
/// Only the Unicode-capable segment formats are retained. Other formats are skipped during
/// subtable selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CmapSubtable {
    Format4 {
        end_codes: Vec<u16>,
        start_codes: Vec<u16>,
        id_deltas: Vec<i16>,
        id_range_offsets: Vec<u16>,
        glyph_id_array: Vec<u16>,
    },
    Format12 {
        groups: Vec<SequentialMapGroup>,
    },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SequentialMapGroup {
    pub start_char_code: u32,
    pub end_char_code: u32,
    pub start_glyph_id: u32,
}

impl ReadBinary for Cmap<'_> {
    type HostType<'a> = Cmap<'a>;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self::HostType<'a>, ParseError> {
        let scope = ctxt.scope();
        let version = ctxt.read_u16be()?;
        ctxt.check_version(version == 0)?;
        let num_tables = usize::from(ctxt.read_u16be()?);
        let encoding_records = ctxt.read_array::<EncodingRecord>(num_tables)?;
        Ok(Cmap {
            scope,
            encoding_records,
        })
    }
}

impl ReadFrom for EncodingRecord {
    type ReadType = (U16Be, U16Be, U32Be);
    fn read_from((platform_id, encoding_id, offset): (u16, u16, u32)) -> Self {
        EncodingRecord {
            platform_id,
            encoding_id,
            offset,
        }
    }
}

impl ReadFrom for SequentialMapGroup {
    type ReadType = (U32Be, U32Be, U32Be);
    fn read_from((start_char_code, end_char_code, start_glyph_id): (u32, u32, u32)) -> Self {
        SequentialMapGroup {
            start_char_code,
            end_char_code,
            start_glyph_id,
        }
    }
}

impl ReadBinary for CmapSubtable {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let subtable_format = ctxt.read_u16be()?;
        match subtable_format {
            4 => {
                let length = usize::from(ctxt.read_u16be()?);
                let _language = ctxt.read_u16be()?;
                let seg_count_x2 = usize::from(ctxt.read_u16be()?);
                ctxt.check((seg_count_x2 & 1) == 0)?;
                let seg_count = seg_count_x2 >> 1;
                let _search_range = ctxt.read_u16be()?;
                let _entry_selector = ctxt.read_u16be()?;
                let _range_shift = ctxt.read_u16be()?;
                let end_codes = ctxt.read_array::<U16Be>(seg_count)?.to_vec();
                let _reserved_pad = ctxt.read_u16be()?;
                let start_codes = ctxt.read_array::<U16Be>(seg_count)?.to_vec();
                let id_deltas = ctxt.read_array::<I16Be>(seg_count)?.to_vec();
                let id_range_offsets = ctxt.read_array::<U16Be>(seg_count)?.to_vec();
                // The declared length is frequently wrong, read what is actually there.
                let header_size = (8 + 4 * seg_count) * 2;
                let num_indices = length.saturating_sub(header_size) / 2;
                let glyph_id_array = ctxt.read_array_upto_hack::<U16Be>(num_indices)?.to_vec();
                Ok(CmapSubtable::Format4 {
                    end_codes,
                    start_codes,
                    id_deltas,
                    id_range_offsets,
                    glyph_id_array,
                })
            }
            12 => {
                let reserved = ctxt.read_u16be()?;
                ctxt.check(reserved == 0)?;
                let _length = ctxt.read_u32be()?;
                let _language = ctxt.read_u32be()?;
                let num_groups = usize::try_from(ctxt.read_u32be()?)?;
                let groups = ctxt.read_array::<SequentialMapGroup>(num_groups)?.to_vec();
                Ok(CmapSubtable::Format12 { groups })
            }
            _ => Err(ParseError::NotImplemented),
        }
    }
}

impl<'a> Cmap<'a> {
    /// Find the first encoding record for the given `platform_id` and `encoding_id`
    pub fn find_subtable(
        &self,
        platform_id: PlatformId,
        encoding_id: EncodingId,
    ) -> Option<EncodingRecord> {
        self.encoding_records.iter().find(|record| {
            record.platform_id == platform_id.0 && record.encoding_id == encoding_id.0
        })
    }

    /// Decode the subtable referenced by `record`.
    pub fn read_subtable(&self, record: EncodingRecord) -> Result<CmapSubtable, ParseError> {
        let offset = usize::try_from(record.offset)?;
        self.scope.offset_checked(offset)?.read::<CmapSubtable>()
    }

    /// Decode the most suitable Unicode subtable.
    pub fn best_subtable(&self) -> Result<CmapSubtable, ParseError> {
        for &(platform_id, encoding_id) in SUBTABLE_PREFERENCE {
            if let Some(record) = self.find_subtable(platform_id, encoding_id) {
                match self.read_subtable(record) {
                    Ok(subtable) => return Ok(subtable),
                    Err(err) => debug!(
                        "skipping cmap subtable ({}, {}): {}",
                        platform_id.0, encoding_id.0, err
                    ),
                }
            }
        }
        Err(ParseError::MissingValue)
    }
}

impl CmapSubtable {
    /// Map a Unicode scalar value to a glyph id, 0 when unmapped.
    pub fn map_glyph(&self, ch: u32) -> u16 {
        match self {
            CmapSubtable::Format4 {
                end_codes,
                start_codes,
                id_deltas,
                id_range_offsets,
                glyph_id_array,
            } => {
                let ch = match u16::try_from(ch) {
                    Ok(ch) => ch,
                    Err(_) => return 0,
                };
                let Some(seg) = end_codes.iter().position(|&end_code| end_code >= ch) else {
                    return 0;
                };
                let (Some(&start_code), Some(&id_delta), Some(&id_range_offset)) = (
                    start_codes.get(seg),
                    id_deltas.get(seg),
                    id_range_offsets.get(seg),
                ) else {
                    return 0;
                };
                if start_code > ch {
                    return 0;
                }
                if id_range_offset == 0 {
                    // The idDelta arithmetic is modulo 65536.
                    return ch.wrapping_add(id_delta as u16);
                }
                // idRangeOffset is relative to its own position in the idRangeOffset array.
                let index = (usize::from(id_range_offset) / 2 + seg + usize::from(ch - start_code))
                    .checked_sub(id_range_offsets.len());
                match index.and_then(|index| glyph_id_array.get(index)) {
                    Some(0) | None => 0,
                    Some(&glyph_id) => glyph_id.wrapping_add(id_delta as u16),
                }
            }
            CmapSubtable::Format12 { groups } => groups
                .iter()
                .find(|group| group.start_char_code <= ch && ch <= group.end_char_code)
                .and_then(|group| {
                    let glyph_id = group
                        .start_glyph_id
                        .checked_add(ch - group.start_char_code)?;
                    u16::try_from(glyph_id).ok()
                })
                .unwrap_or(0),
        }
    }
}

/// Resolve `ch` to a glyph id through `cmap`, 0 if the character is not mapped.
pub fn char_to_glyph(cmap: &CmapSubtable, ch: char) -> u16 {
    cmap.map_glyph(u32::from(ch))
}

/// Decode the preferred Unicode subtable from raw `cmap` table data.
pub fn read_cmap(data: &[u8]) -> Result<CmapSubtable, ParseError> {
    ReadScope::new(data).read::<Cmap<'_>>()?.best_subtable()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{format4_cmap, to_bytes};

    fn format4(segments: &[(u16, u16, i16, u16)], glyph_ids: &[u16]) -> CmapSubtable {
        CmapSubtable::Format4 {
            end_codes: segments.iter().map(|s| s.1).collect(),
            start_codes: segments.iter().map(|s| s.0).collect(),
            id_deltas: segments.iter().map(|s| s.2).collect(),
            id_range_offsets: segments.iter().map(|s| s.3).collect(),
            glyph_id_array: glyph_ids.to_vec(),
        }
    }

    #[test]
    fn format4_delta() {
        let cmap = format4(&[(0x41, 0x5A, -29, 0), (0xFFFF, 0xFFFF, 1, 0)], &[]);
        assert_eq!(char_to_glyph(&cmap, 'A'), 36);
        assert_eq!(char_to_glyph(&cmap, 'Z'), 61);
        assert_eq!(char_to_glyph(&cmap, '@'), 0);
        assert_eq!(char_to_glyph(&cmap, 'a'), 0);
    }

    #[test]
    fn format4_delta_wraps() {
        let cmap = format4(&[(0x10, 0x10, -0x10, 0), (0xFFFF, 0xFFFF, 1, 0)], &[]);
        assert_eq!(cmap.map_glyph(0x10), 0);
        let cmap = format4(&[(0x10, 0x10, -0x11, 0), (0xFFFF, 0xFFFF, 1, 0)], &[]);
        assert_eq!(cmap.map_glyph(0x10), 0xFFFF);
    }

    #[test]
    fn format4_range_offset() {
        // Segment 0 uses the glyph id array; idRangeOffset = 2 * (segCount - 0) = 4.
        let cmap = format4(
            &[(0x61, 0x63, 5, 4), (0xFFFF, 0xFFFF, 1, 0)],
            &[10, 0, 12],
        );
        assert_eq!(cmap.map_glyph(0x61), 15);
        assert_eq!(cmap.map_glyph(0x62), 0);
        assert_eq!(cmap.map_glyph(0x63), 17);
    }

    #[test]
    fn format4_range_offset_out_of_bounds() {
        let cmap = format4(&[(0x61, 0x63, 0, 400), (0xFFFF, 0xFFFF, 1, 0)], &[1]);
        assert_eq!(cmap.map_glyph(0x61), 0);
    }

    #[test]
    fn format4_is_stable() {
        let cmap = format4(&[(0x600, 0x6FF, 100, 0), (0xFFFF, 0xFFFF, 1, 0)], &[]);
        for ch in 0x600..=0x6FF {
            let first = cmap.map_glyph(ch);
            assert_eq!(first, cmap.map_glyph(ch));
            assert_eq!(u32::from(first), ch + 100);
        }
    }

    #[test]
    fn format12_groups() {
        let cmap = CmapSubtable::Format12 {
            groups: vec![SequentialMapGroup {
                start_char_code: 0x1F600,
                end_char_code: 0x1F602,
                start_glyph_id: 7,
            }],
        };
        assert_eq!(char_to_glyph(&cmap, '\u{1F601}'), 8);
        assert_eq!(char_to_glyph(&cmap, '\u{1F603}'), 0);
    }

    #[test]
    fn read_format4_table() {
        let data = format4_cmap(&[('A', 1), ('B', 2), ('C', 3)]);
        let cmap = read_cmap(&data).unwrap();
        assert_eq!(char_to_glyph(&cmap, 'A'), 1);
        assert_eq!(char_to_glyph(&cmap, 'C'), 3);
        assert_eq!(char_to_glyph(&cmap, 'D'), 0);
    }

    #[test]
    fn read_truncated_table() {
        let data = format4_cmap(&[('A', 1)]);
        assert!(read_cmap(&data[..data.len() - 20]).is_err());
    }

    #[test]
    fn read_unknown_format_is_skipped() {
        // version 0, one record (3, 1) pointing at a format 6 subtable
        let data = to_bytes(&[0, 1, 3, 1, 0, 12, 6, 0, 0, 0, 0, 0]);
        assert_eq!(read_cmap(&data), Err(ParseError::MissingValue));
    }
}
