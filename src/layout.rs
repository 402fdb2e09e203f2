//! `GDEF`, `GSUB` and `GPOS` table decoding.
//!
//! Tables are decoded eagerly into owned structures so that a decoded table can be shared
//! between threads and font sizes. Every offset followed is validated against the data
//! available; a subtable that fails to decode is logged and skipped, while a failure in the
//! table header or top-level lists fails the whole table.

use std::marker::PhantomData;

use log::{debug, warn};

use crate::binary::read::{
    ReadArray, ReadBinary, ReadBinaryDep, ReadCtxt, ReadFixedSizeDep, ReadFrom,
    ReadScope,
};
use crate::binary::{U16Be, U32Be};
use crate::context::LookupFlag;
use crate::error::ParseError;

pub enum GSUB {}
pub enum GPOS {}

const GDEF_HEADER_SIZE: usize = 6 * 2;

pub struct GDEFTable {
    pub opt_glyph_classdef: Option<ClassDef>,
    pub opt_mark_attach_classdef: Option<ClassDef>,
    /// Mark glyph sets, available from GDEF version 1.2
    pub opt_mark_glyph_sets: Option<Vec<Coverage>>,
}

// GSUB and GPOS tables have the same top-level structure
pub struct LayoutTable<T: LayoutTableType> {
    pub opt_script_list: Option<ScriptList>,
    pub opt_feature_list: Option<FeatureList>,
    pub opt_lookup_list: Option<LookupList<T>>,
}

pub struct ScriptList {
    script_records: Vec<ScriptRecord>,
}

pub struct ScriptRecord {
    pub script_tag: u32,
    script_table: ScriptTable,
}

pub struct ScriptTable {
    opt_default_langsys: Option<LangSys>,
    langsys_records: Vec<LangSysRecord>,
}

pub struct LangSysRecord {
    pub langsys_tag: u32,
    langsys_table: LangSys,
}

#[derive(Debug)]
pub struct LangSys {
    pub required_feature_index: Option<u16>,
    pub feature_indices: Vec<u16>,
}

pub struct FeatureList {
    feature_records: Vec<FeatureRecord>,
}

pub struct FeatureRecord {
    pub feature_tag: u32,
    feature_table: FeatureTable,
}

pub struct FeatureTable {
    pub lookup_indices: Vec<u16>,
}

pub struct LookupList<T: LayoutTableType> {
    /// Lookups that failed to decode are kept as `None` so that lookup indices stay valid.
    lookups: Vec<Option<Lookup<T::LookupType>>>,
    phantom: PhantomData<T>,
}

pub struct Lookup<L> {
    pub lookup_flag: LookupFlag,
    pub mark_filtering_set: Option<u16>,
    pub subtables: L,
}

pub enum SubstLookup {
    SingleSubst(Vec<SingleSubst>),
    MultipleSubst(Vec<MultipleSubst>),
    AlternateSubst(Vec<AlternateSubst>),
    LigatureSubst(Vec<LigatureSubst>),
    ContextSubst(Vec<ContextLookup>),
    ChainContextSubst(Vec<ChainContextLookup>),
    ReverseChainSingleSubst(Vec<ReverseChainSingleSubst>),
}

pub enum PosLookup {
    SinglePos(Vec<SinglePos>),
    PairPos(Vec<PairPos>),
    CursivePos(Vec<CursivePos>),
    MarkBasePos(Vec<MarkBasePos>),
    MarkLigPos(Vec<MarkLigPos>),
    MarkMarkPos(Vec<MarkBasePos>),
    ContextPos(Vec<ContextLookup>),
    ChainContextPos(Vec<ChainContextLookup>),
}

pub trait LayoutTableType: Sized {
    type LookupType;

    /// Lookup type number that wraps other lookup types in an extension subtable.
    const EXTENSION_LOOKUP_TYPE: u16;

    fn read_subtables(
        lookup_type: u16,
        subtables: &[ReadScope<'_>],
    ) -> Result<Self::LookupType, ParseError>;
}

impl ReadBinary for GDEFTable {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let table = ctxt.scope();

        let major_version = ctxt.read_u16be()?;
        ctxt.check_version(major_version == 1)?;
        let minor_version = ctxt.read_u16be()?;
        let glyph_classdef_offset = usize::from(ctxt.read_u16be()?);
        // AttachList and LigCaretList only serve hinting and caret placement
        let _attach_list_offset = ctxt.read_u16be()?;
        let _lig_caret_list_offset = ctxt.read_u16be()?;
        // MarkAttachClassDef was added in OpenType 1.2 without a version bump, so it is
        // always read.
        let mark_attach_classdef_offset = usize::from(ctxt.read_u16be()?);
        let mark_glyph_sets_offset = if minor_version >= 2 {
            usize::from(ctxt.read_u16be()?)
        } else {
            0
        };

        let opt_glyph_classdef = read_gdef_subtable::<ClassDef>(&table, glyph_classdef_offset)?;
        let opt_mark_attach_classdef =
            read_gdef_subtable::<ClassDef>(&table, mark_attach_classdef_offset)?;
        let opt_mark_glyph_sets =
            read_gdef_subtable::<MarkGlyphSets>(&table, mark_glyph_sets_offset)?
                .map(|MarkGlyphSets(coverages)| coverages);

        Ok(GDEFTable {
            opt_glyph_classdef,
            opt_mark_attach_classdef,
            opt_mark_glyph_sets,
        })
    }
}

// Offsets that point back into the header are treated as absent.
fn read_gdef_subtable<'a, T: ReadBinary<HostType<'a> = T>>(
    table: &ReadScope<'a>,
    offset: usize,
) -> Result<Option<T>, ParseError> {
    if offset < GDEF_HEADER_SIZE {
        Ok(None)
    } else {
        table.offset_checked(offset)?.read::<T>().map(Some)
    }
}

struct MarkGlyphSets(Vec<Coverage>);

impl ReadBinary for MarkGlyphSets {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let scope = ctxt.scope();
        let format = ctxt.read_u16be()?;
        ctxt.check_version(format == 1)?;
        let mark_glyph_set_count = usize::from(ctxt.read_u16be()?);
        let coverage_offsets = ctxt.read_array::<U32Be>(mark_glyph_set_count)?;
        let coverages = coverage_offsets
            .iter()
            .map(|offset| {
                let offset = usize::try_from(offset)?;
                scope.offset_checked(offset)?.read::<Coverage>()
            })
            .collect::<Result<_, _>>()?;
        Ok(MarkGlyphSets(coverages))
    }
}

impl GDEFTable {
    pub fn glyph_class(&self, glyph: u16) -> u16 {
        self.opt_glyph_classdef
            .as_ref()
            .map_or(0, |classdef| classdef.glyph_class_value(glyph))
    }

    pub fn mark_attach_class(&self, glyph: u16) -> u16 {
        self.opt_mark_attach_classdef
            .as_ref()
            .map_or(0, |classdef| classdef.glyph_class_value(glyph))
    }

    pub fn glyph_in_mark_set(&self, glyph: u16, set_index: u16) -> bool {
        self.opt_mark_glyph_sets
            .as_ref()
            .and_then(|sets| sets.get(usize::from(set_index)))
            .is_some_and(|coverage| coverage.glyph_coverage_value(glyph).is_some())
    }
}

impl<T: LayoutTableType> ReadBinary for LayoutTable<T> {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let table = ctxt.scope();

        let major_version = ctxt.read_u16be()?;
        let _minor_version = ctxt.read_u16be()?;
        let script_list_offset = usize::from(ctxt.read_u16be()?);
        let feature_list_offset = usize::from(ctxt.read_u16be()?);
        let lookup_list_offset = usize::from(ctxt.read_u16be()?);

        // We handle versions 1.x
        ctxt.check_version(major_version == 1)?;

        let opt_script_list = match script_list_offset {
            0 => None,
            offset => Some(table.offset_checked(offset)?.read::<ScriptList>()?),
        };
        let opt_feature_list = match feature_list_offset {
            0 => None,
            offset => Some(table.offset_checked(offset)?.read::<FeatureList>()?),
        };
        let opt_lookup_list = match lookup_list_offset {
            0 => None,
            offset => Some(table.offset_checked(offset)?.read::<LookupList<T>>()?),
        };

        // Version 1.1 also includes an offset to a FeatureVariations table which is not used.

        Ok(LayoutTable {
            opt_script_list,
            opt_feature_list,
            opt_lookup_list,
        })
    }
}

impl ReadBinary for ScriptList {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let scope = ctxt.scope();
        let script_count = usize::from(ctxt.read_u16be()?);
        let script_records = ctxt
            .read_array_dep::<ScriptRecord>(script_count, scope)?
            .read_to_vec()?;
        Ok(ScriptList { script_records })
    }
}

impl ReadBinaryDep for ScriptRecord {
    type Args<'a> = ReadScope<'a>;
    type HostType<'a> = ScriptRecord;

    fn read_dep<'a>(ctxt: &mut ReadCtxt<'a>, scope: Self::Args<'a>) -> Result<Self, ParseError> {
        let script_tag = ctxt.read_u32be()?;
        let script_offset = usize::from(ctxt.read_u16be()?);
        let script_table = scope.offset_checked(script_offset)?.read::<ScriptTable>()?;
        Ok(ScriptRecord {
            script_tag,
            script_table,
        })
    }
}

impl ReadFixedSizeDep for ScriptRecord {
    fn size(_scope: Self::Args<'_>) -> usize {
        4 + 2
    }
}

impl ReadBinary for ScriptTable {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let scope = ctxt.scope();
        let default_langsys_offset = usize::from(ctxt.read_u16be()?);
        let opt_default_langsys = match default_langsys_offset {
            0 => None,
            offset => Some(scope.offset_checked(offset)?.read::<LangSys>()?),
        };
        let langsys_count = usize::from(ctxt.read_u16be()?);
        let langsys_records = ctxt
            .read_array_dep::<LangSysRecord>(langsys_count, scope)?
            .read_to_vec()?;
        Ok(ScriptTable {
            opt_default_langsys,
            langsys_records,
        })
    }
}

impl ReadBinaryDep for LangSysRecord {
    type Args<'a> = ReadScope<'a>;
    type HostType<'a> = LangSysRecord;

    fn read_dep<'a>(ctxt: &mut ReadCtxt<'a>, scope: Self::Args<'a>) -> Result<Self, ParseError> {
        let langsys_tag = ctxt.read_u32be()?;
        let langsys_offset = usize::from(ctxt.read_u16be()?);
        let langsys_table = scope.offset_checked(langsys_offset)?.read::<LangSys>()?;
        Ok(LangSysRecord {
            langsys_tag,
            langsys_table,
        })
    }
}

impl ReadFixedSizeDep for LangSysRecord {
    fn size(_scope: Self::Args<'_>) -> usize {
        4 + 2
    }
}

impl ReadBinary for LangSys {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let _lookup_order = ctxt.read_u16be()?; // reserved, should be zero
        let required_feature_index = match ctxt.read_u16be()? {
            0xFFFF => None,
            index => Some(index),
        };
        let feature_index_count = usize::from(ctxt.read_u16be()?);
        let feature_indices = ctxt.read_array::<U16Be>(feature_index_count)?.to_vec();
        Ok(LangSys {
            required_feature_index,
            feature_indices,
        })
    }
}

impl ReadBinary for FeatureList {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let scope = ctxt.scope();
        let feature_count = usize::from(ctxt.read_u16be()?);
        let feature_records = ctxt
            .read_array_dep::<FeatureRecord>(feature_count, scope)?
            .read_to_vec()?;
        Ok(FeatureList { feature_records })
    }
}

impl ReadBinaryDep for FeatureRecord {
    type Args<'a> = ReadScope<'a>;
    type HostType<'a> = FeatureRecord;

    fn read_dep<'a>(ctxt: &mut ReadCtxt<'a>, scope: Self::Args<'a>) -> Result<Self, ParseError> {
        let feature_tag = ctxt.read_u32be()?;
        let feature_offset = usize::from(ctxt.read_u16be()?);
        let feature_table = scope.offset_checked(feature_offset)?.read::<FeatureTable>()?;
        Ok(FeatureRecord {
            feature_tag,
            feature_table,
        })
    }
}

impl ReadFixedSizeDep for FeatureRecord {
    fn size(_scope: Self::Args<'_>) -> usize {
        4 + 2
    }
}

impl ReadBinary for FeatureTable {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let _feature_params = ctxt.read_u16be()?;
        let lookup_index_count = usize::from(ctxt.read_u16be()?);
        let lookup_indices = ctxt.read_array::<U16Be>(lookup_index_count)?.to_vec();
        Ok(FeatureTable { lookup_indices })
    }
}

impl<T: LayoutTableType> ReadBinary for LookupList<T> {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let scope = ctxt.scope();
        let lookup_count = usize::from(ctxt.read_u16be()?);
        let lookup_offsets = ctxt.read_array::<U16Be>(lookup_count)?;
        let lookups = lookup_offsets
            .iter()
            .enumerate()
            .map(|(index, offset)| {
                match scope
                    .offset_checked(usize::from(offset))
                    .and_then(|lookup| read_lookup::<T>(lookup))
                {
                    Ok(lookup) => Some(lookup),
                    Err(err) => {
                        warn!("skipping invalid lookup {}: {}", index, err);
                        None
                    }
                }
            })
            .collect();
        Ok(LookupList {
            lookups,
            phantom: PhantomData,
        })
    }
}

fn read_lookup<T: LayoutTableType>(
    scope: ReadScope<'_>,
) -> Result<Lookup<T::LookupType>, ParseError> {
    let mut ctxt = scope.ctxt();
    let lookup_type = ctxt.read_u16be()?;
    let lookup_flag = LookupFlag(ctxt.read_u16be()?);
    let subtable_count = usize::from(ctxt.read_u16be()?);
    let subtable_offsets = ctxt.read_array::<U16Be>(subtable_count)?;
    let mark_filtering_set = if lookup_flag.get_use_mark_filtering_set() {
        Some(ctxt.read_u16be()?)
    } else {
        None
    };

    let mut subtables = Vec::with_capacity(subtable_offsets.len());
    for offset in &subtable_offsets {
        subtables.push(scope.offset_checked(usize::from(offset))?);
    }

    let subtables = if lookup_type == T::EXTENSION_LOOKUP_TYPE {
        let (lookup_type, subtables) = resolve_extensions(&subtables)?;
        T::read_subtables(lookup_type, &subtables)?
    } else {
        T::read_subtables(lookup_type, &subtables)?
    };

    Ok(Lookup {
        lookup_flag,
        mark_filtering_set,
        subtables,
    })
}

// All extension subtables of a lookup must wrap the same lookup type.
fn resolve_extensions<'a>(
    subtables: &[ReadScope<'a>],
) -> Result<(u16, Vec<ReadScope<'a>>), ParseError> {
    let mut opt_lookup_type = None;
    let mut resolved = Vec::with_capacity(subtables.len());
    for subtable in subtables {
        let mut ctxt = subtable.ctxt();
        let format = ctxt.read_u16be()?;
        ctxt.check_version(format == 1)?;
        let extension_lookup_type = ctxt.read_u16be()?;
        let extension_offset = usize::try_from(ctxt.read_u32be()?)?;
        match opt_lookup_type {
            Some(lookup_type) if lookup_type != extension_lookup_type => {
                return Err(ParseError::BadValue)
            }
            _ => opt_lookup_type = Some(extension_lookup_type),
        }
        resolved.push(subtable.offset_checked(extension_offset)?);
    }
    let lookup_type = opt_lookup_type.ok_or(ParseError::MissingValue)?;
    Ok((lookup_type, resolved))
}

fn read_subtables<'a, S: ReadBinary<HostType<'a> = S>>(subtables: &[ReadScope<'a>]) -> Vec<S> {
    let mut result = Vec::with_capacity(subtables.len());
    for subtable in subtables {
        match subtable.read::<S>() {
            Ok(subtable) => result.push(subtable),
            Err(ParseError::BadVersion) => debug!("skipping subtable with unknown format"),
            Err(err) => warn!("skipping invalid subtable: {}", err),
        }
    }
    result
}

impl LayoutTableType for GSUB {
    type LookupType = SubstLookup;

    const EXTENSION_LOOKUP_TYPE: u16 = 7;

    fn read_subtables(
        lookup_type: u16,
        subtables: &[ReadScope<'_>],
    ) -> Result<SubstLookup, ParseError> {
        let lookup = match lookup_type {
            1 => SubstLookup::SingleSubst(read_subtables::<SingleSubst>(subtables)),
            2 => SubstLookup::MultipleSubst(read_subtables::<MultipleSubst>(subtables)),
            3 => SubstLookup::AlternateSubst(read_subtables::<AlternateSubst>(subtables)),
            4 => SubstLookup::LigatureSubst(read_subtables::<LigatureSubst>(subtables)),
            5 => SubstLookup::ContextSubst(read_subtables::<ContextLookup>(subtables)),
            6 => SubstLookup::ChainContextSubst(read_subtables::<ChainContextLookup>(subtables)),
            8 => SubstLookup::ReverseChainSingleSubst(read_subtables::<ReverseChainSingleSubst>(
                subtables,
            )),
            _ => return Err(ParseError::BadVersion),
        };
        Ok(lookup)
    }
}

impl LayoutTableType for GPOS {
    type LookupType = PosLookup;

    const EXTENSION_LOOKUP_TYPE: u16 = 9;

    fn read_subtables(
        lookup_type: u16,
        subtables: &[ReadScope<'_>],
    ) -> Result<PosLookup, ParseError> {
        let lookup = match lookup_type {
            1 => PosLookup::SinglePos(read_subtables::<SinglePos>(subtables)),
            2 => PosLookup::PairPos(read_subtables::<PairPos>(subtables)),
            3 => PosLookup::CursivePos(read_subtables::<CursivePos>(subtables)),
            4 => PosLookup::MarkBasePos(read_subtables::<MarkBasePos>(subtables)),
            5 => PosLookup::MarkLigPos(read_subtables::<MarkLigPos>(subtables)),
            6 => PosLookup::MarkMarkPos(read_subtables::<MarkBasePos>(subtables)),
            7 => PosLookup::ContextPos(read_subtables::<ContextLookup>(subtables)),
            8 => PosLookup::ChainContextPos(read_subtables::<ChainContextLookup>(subtables)),
            _ => return Err(ParseError::BadVersion),
        };
        Ok(lookup)
    }
}

impl<T: LayoutTableType> LayoutTable<T> {
    pub fn find_script(&self, script_tag: u32) -> Option<&ScriptTable> {
        self.opt_script_list
            .as_ref()
            .and_then(|script_list| script_list.find_script(script_tag))
    }

    pub fn feature_by_index(&self, feature_index: u16) -> Option<&FeatureRecord> {
        self.opt_feature_list
            .as_ref()
            .and_then(|feature_list| feature_list.nth_feature_record(usize::from(feature_index)))
    }

    pub fn lookup(&self, lookup_index: u16) -> Option<&Lookup<T::LookupType>> {
        self.opt_lookup_list
            .as_ref()
            .and_then(|lookup_list| lookup_list.lookup(usize::from(lookup_index)))
    }
}

impl ScriptList {
    pub fn script_records(&self) -> &[ScriptRecord] {
        &self.script_records
    }

    pub fn find_script(&self, script_tag: u32) -> Option<&ScriptTable> {
        self.script_records
            .iter()
            .find(|script_record| script_record.script_tag == script_tag)
            .map(|script_record| &script_record.script_table)
    }
}

impl ScriptRecord {
    pub fn script_table(&self) -> &ScriptTable {
        &self.script_table
    }
}

impl ScriptTable {
    pub fn default_langsys_record(&self) -> Option<&LangSys> {
        self.opt_default_langsys.as_ref()
    }

    pub fn find_langsys(&self, langsys_tag: u32) -> Option<&LangSys> {
        self.langsys_records
            .iter()
            .find(|langsys_record| langsys_record.langsys_tag == langsys_tag)
            .map(|langsys_record| &langsys_record.langsys_table)
    }
}

impl FeatureList {
    pub fn nth_feature_record(&self, index: usize) -> Option<&FeatureRecord> {
        self.feature_records.get(index)
    }
}

impl FeatureRecord {
    pub fn feature_table(&self) -> &FeatureTable {
        &self.feature_table
    }
}

impl<T: LayoutTableType> LookupList<T> {
    pub fn len(&self) -> usize {
        self.lookups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookups.is_empty()
    }

    pub fn lookup(&self, lookup_index: usize) -> Option<&Lookup<T::LookupType>> {
        self.lookups.get(lookup_index).and_then(Option::as_ref)
    }
}

pub enum SingleSubst {
    Format1 {
        coverage: Coverage,
        delta_glyph_index: i16,
    },
    Format2 {
        coverage: Coverage,
        substitute_glyph_array: Vec<u16>,
    },
}

impl ReadBinary for SingleSubst {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let subtable = ctxt.scope();
        match ctxt.read_u16be()? {
            1 => {
                let coverage_offset = usize::from(ctxt.read_u16be()?);
                let coverage = read_coverage(&subtable, coverage_offset)?;
                let delta_glyph_index = ctxt.read_i16be()?;
                Ok(SingleSubst::Format1 {
                    coverage,
                    delta_glyph_index,
                })
            }
            2 => {
                let coverage_offset = usize::from(ctxt.read_u16be()?);
                let coverage = read_coverage(&subtable, coverage_offset)?;
                let glyph_count = usize::from(ctxt.read_u16be()?);
                let substitute_glyph_array = ctxt.read_array::<U16Be>(glyph_count)?.to_vec();
                Ok(SingleSubst::Format2 {
                    coverage,
                    substitute_glyph_array,
                })
            }
            _ => Err(ParseError::BadVersion),
        }
    }
}

impl SingleSubst {
    pub fn apply_glyph(&self, glyph: u16) -> Option<u16> {
        match self {
            SingleSubst::Format1 {
                coverage,
                delta_glyph_index,
            } => coverage
                .glyph_coverage_value(glyph)
                // Addition of deltaGlyphID is modulo 65536.
                .map(|_| glyph.wrapping_add(*delta_glyph_index as u16)),
            SingleSubst::Format2 {
                coverage,
                substitute_glyph_array,
            } => coverage
                .glyph_coverage_value(glyph)
                .and_then(|index| substitute_glyph_array.get(usize::from(index)).copied()),
        }
    }
}

pub struct MultipleSubst {
    coverage: Coverage,
    sequences: Vec<SequenceTable>,
}

pub struct SequenceTable {
    pub substitute_glyphs: Vec<u16>,
}

impl ReadBinary for MultipleSubst {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let scope = ctxt.scope();
        match ctxt.read_u16be()? {
            1 => {
                let coverage_offset = usize::from(ctxt.read_u16be()?);
                let coverage = read_coverage(&scope, coverage_offset)?;
                let sequence_count = usize::from(ctxt.read_u16be()?);
                let sequence_offsets = ctxt.read_array::<U16Be>(sequence_count)?;
                let sequences = read_objects::<SequenceTable>(&scope, sequence_offsets)?;
                Ok(MultipleSubst {
                    coverage,
                    sequences,
                })
            }
            _ => Err(ParseError::BadVersion),
        }
    }
}

impl MultipleSubst {
    pub fn apply_glyph(&self, glyph: u16) -> Option<&SequenceTable> {
        self.coverage
            .glyph_coverage_value(glyph)
            .and_then(|index| self.sequences.get(usize::from(index)))
    }
}

impl ReadBinary for SequenceTable {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let glyph_count = usize::from(ctxt.read_u16be()?);
        // The spec requires at least one glyph, but fonts do not always follow it.
        let substitute_glyphs = ctxt.read_array::<U16Be>(glyph_count)?.to_vec();
        Ok(SequenceTable { substitute_glyphs })
    }
}

pub struct AlternateSubst {
    coverage: Coverage,
    alternatesets: Vec<AlternateSet>,
}

pub struct AlternateSet {
    pub alternate_glyphs: Vec<u16>,
}

impl ReadBinary for AlternateSubst {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let scope = ctxt.scope();
        match ctxt.read_u16be()? {
            1 => {
                let coverage_offset = usize::from(ctxt.read_u16be()?);
                let coverage = read_coverage(&scope, coverage_offset)?;
                let alternateset_count = usize::from(ctxt.read_u16be()?);
                let alternateset_offsets = ctxt.read_array::<U16Be>(alternateset_count)?;
                let alternatesets = read_objects::<AlternateSet>(&scope, alternateset_offsets)?;
                Ok(AlternateSubst {
                    coverage,
                    alternatesets,
                })
            }
            _ => Err(ParseError::BadVersion),
        }
    }
}

impl AlternateSubst {
    pub fn apply_glyph(&self, glyph: u16) -> Option<&AlternateSet> {
        self.coverage
            .glyph_coverage_value(glyph)
            .and_then(|index| self.alternatesets.get(usize::from(index)))
    }
}

impl ReadBinary for AlternateSet {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let glyph_count = usize::from(ctxt.read_u16be()?);
        ctxt.check(glyph_count > 0)?;
        let alternate_glyphs = ctxt.read_array::<U16Be>(glyph_count)?.to_vec();
        Ok(AlternateSet { alternate_glyphs })
    }
}

pub struct LigatureSubst {
    coverage: Coverage,
    ligaturesets: Vec<LigatureSet>,
}

pub struct LigatureSet {
    pub ligatures: Vec<Ligature>,
}

pub struct Ligature {
    pub ligature_glyph: u16,
    /// Components after the first, which is matched by the coverage table
    pub component_glyphs: Vec<u16>,
}

impl ReadBinary for LigatureSubst {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let scope = ctxt.scope();
        match ctxt.read_u16be()? {
            1 => {
                let coverage_offset = usize::from(ctxt.read_u16be()?);
                let coverage = read_coverage(&scope, coverage_offset)?;
                let ligatureset_count = usize::from(ctxt.read_u16be()?);
                let ligatureset_offsets = ctxt.read_array::<U16Be>(ligatureset_count)?;
                let ligaturesets = read_objects::<LigatureSet>(&scope, ligatureset_offsets)?;
                Ok(LigatureSubst {
                    coverage,
                    ligaturesets,
                })
            }
            _ => Err(ParseError::BadVersion),
        }
    }
}

impl LigatureSubst {
    pub fn apply_glyph(&self, glyph: u16) -> Option<&LigatureSet> {
        self.coverage
            .glyph_coverage_value(glyph)
            .and_then(|index| self.ligaturesets.get(usize::from(index)))
    }
}

impl ReadBinary for LigatureSet {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let scope = ctxt.scope();
        let ligature_count = usize::from(ctxt.read_u16be()?);
        let ligature_offsets = ctxt.read_array::<U16Be>(ligature_count)?;
        let ligatures = read_objects::<Ligature>(&scope, ligature_offsets)?;
        Ok(LigatureSet { ligatures })
    }
}

impl ReadBinary for Ligature {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let ligature_glyph = ctxt.read_u16be()?;
        let component_count = usize::from(ctxt.read_u16be()?);
        ctxt.check(component_count > 0)?;
        let component_glyphs = ctxt.read_array::<U16Be>(component_count - 1)?.to_vec();
        Ok(Ligature {
            ligature_glyph,
            component_glyphs,
        })
    }
}

/// GSUB Lookup Type 8 Subtable Formats
pub enum ReverseChainSingleSubst {
    Format1 {
        /// Coverage table for the single input glyph
        coverage: Coverage,
        /// Backtrack coverages, ordered from the glyph nearest the input outwards
        backtrack_coverages: Vec<Coverage>,
        lookahead_coverages: Vec<Coverage>,
        /// Substitute glyphs, ordered by coverage index
        substitute_glyphs: Vec<u16>,
    },
}

impl ReadBinary for ReverseChainSingleSubst {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let scope = ctxt.scope();
        match ctxt.read_u16be()? {
            1 => {
                let coverage_offset = usize::from(ctxt.read_u16be()?);
                let backtrack_count = usize::from(ctxt.read_u16be()?);
                let backtrack_coverage_offsets = ctxt.read_array::<U16Be>(backtrack_count)?;
                let lookahead_count = usize::from(ctxt.read_u16be()?);
                let lookahead_coverage_offsets = ctxt.read_array::<U16Be>(lookahead_count)?;
                let glyph_count = usize::from(ctxt.read_u16be()?);
                let substitute_glyphs = ctxt.read_array::<U16Be>(glyph_count)?.to_vec();
                let coverage = read_coverage(&scope, coverage_offset)?;
                let backtrack_coverages = read_coverages(&scope, backtrack_coverage_offsets)?;
                let lookahead_coverages = read_coverages(&scope, lookahead_coverage_offsets)?;

                ctxt.check(coverage.glyph_count() == glyph_count)?;
                Ok(ReverseChainSingleSubst::Format1 {
                    coverage,
                    backtrack_coverages,
                    lookahead_coverages,
                    substitute_glyphs,
                })
            }
            _ => Err(ParseError::BadVersion),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValueFormat(u16);

impl ReadBinary for ValueFormat {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let value_format = ctxt.read_u16be()?;
        if value_format <= 0xFF {
            Ok(ValueFormat(value_format))
        } else {
            Err(ParseError::BadValue)
        }
    }
}

impl ValueFormat {
    pub fn size(self) -> usize {
        (self.0 & 0xFF).count_ones() as usize * 2
    }

    fn is_zero(self) -> bool {
        self.0 == 0
    }

    fn has_x_placement(self) -> bool {
        ith_bit_set(self.0, 0)
    }
    fn has_y_placement(self) -> bool {
        ith_bit_set(self.0, 1)
    }
    fn has_x_advance(self) -> bool {
        ith_bit_set(self.0, 2)
    }
    fn has_y_advance(self) -> bool {
        ith_bit_set(self.0, 3)
    }
    fn has_x_placement_device(self) -> bool {
        ith_bit_set(self.0, 4)
    }
    fn has_y_placement_device(self) -> bool {
        ith_bit_set(self.0, 5)
    }
    fn has_x_advance_device(self) -> bool {
        ith_bit_set(self.0, 6)
    }
    fn has_y_advance_device(self) -> bool {
        ith_bit_set(self.0, 7)
    }
}

fn ith_bit_set(flags: u16, i: u16) -> bool {
    (flags & (1 << i)) != 0
}

/// Positioning adjustment in font units
///
/// Device adjustments are decoded but shaping only applies the design unit values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueRecord {
    pub x_placement: i16,
    pub y_placement: i16,
    pub x_advance: i16,
    pub y_advance: i16,
    pub x_placement_device: Option<Device>,
    pub y_placement_device: Option<Device>,
    pub x_advance_device: Option<Device>,
    pub y_advance_device: Option<Device>,
}

impl ReadBinaryDep for ValueRecord {
    /// The value format and the scope device offsets are relative to
    type Args<'a> = (ValueFormat, ReadScope<'a>);
    type HostType<'a> = Option<Self>;

    fn read_dep<'a>(
        ctxt: &mut ReadCtxt<'a>,
        (value_format, scope): Self::Args<'a>,
    ) -> Result<Option<Self>, ParseError> {
        if value_format.is_zero() {
            return Ok(None);
        }
        let mut read_value = |present: bool| -> Result<i16, ParseError> {
            if present {
                Ok(ctxt.read_i16be()?)
            } else {
                Ok(0)
            }
        };
        let x_placement = read_value(value_format.has_x_placement())?;
        let y_placement = read_value(value_format.has_y_placement())?;
        let x_advance = read_value(value_format.has_x_advance())?;
        let y_advance = read_value(value_format.has_y_advance())?;

        let mut read_device = |present: bool| -> Result<Option<Device>, ParseError> {
            if !present {
                return Ok(None);
            }
            match usize::from(ctxt.read_u16be()?) {
                0 => Ok(None),
                offset => scope.offset_checked(offset)?.read::<Device>().map(Some),
            }
        };
        let x_placement_device = read_device(value_format.has_x_placement_device())?;
        let y_placement_device = read_device(value_format.has_y_placement_device())?;
        let x_advance_device = read_device(value_format.has_x_advance_device())?;
        let y_advance_device = read_device(value_format.has_y_advance_device())?;

        Ok(Some(ValueRecord {
            x_placement,
            y_placement,
            x_advance,
            y_advance,
            x_placement_device,
            y_placement_device,
            x_advance_device,
            y_advance_device,
        }))
    }
}

impl ReadFixedSizeDep for ValueRecord {
    fn size((value_format, _scope): Self::Args<'_>) -> usize {
        value_format.size()
    }
}

/// Device or variation index table
///
/// <https://docs.microsoft.com/en-us/typography/opentype/spec/chapter2#device-and-variationindex-tables>
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Device {
    Hinting {
        start_size: u16,
        end_size: u16,
        delta_format: u16,
        delta_values: Vec<u16>,
    },
    VariationIndex {
        outer_index: u16,
        inner_index: u16,
    },
}

impl ReadBinary for Device {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let first = ctxt.read_u16be()?;
        let second = ctxt.read_u16be()?;
        let delta_format = ctxt.read_u16be()?;
        match delta_format {
            1..=3 => {
                ctxt.check(first <= second)?;
                let bits_per_value = 1usize << delta_format;
                let count = usize::from(second - first) + 1;
                let words = (count * bits_per_value + 15) / 16;
                let delta_values = ctxt.read_array::<U16Be>(words)?.to_vec();
                Ok(Device::Hinting {
                    start_size: first,
                    end_size: second,
                    delta_format,
                    delta_values,
                })
            }
            0x8000 => Ok(Device::VariationIndex {
                outer_index: first,
                inner_index: second,
            }),
            _ => Err(ParseError::BadVersion),
        }
    }
}

impl Device {
    /// Adjustment in pixels at the given pixels-per-em size.
    pub fn delta(&self, ppem: u16) -> i16 {
        match self {
            Device::Hinting {
                start_size,
                end_size,
                delta_format,
                delta_values,
            } => {
                if ppem < *start_size || ppem > *end_size {
                    return 0;
                }
                let bits = 1u16 << delta_format;
                let per_word = 16 / bits;
                let index = ppem - start_size;
                let Some(&word) = delta_values.get(usize::from(index / per_word)) else {
                    return 0;
                };
                let shift = 16 - bits * (index % per_word + 1);
                let mask = (1u16 << bits) - 1;
                let value = (word >> shift) & mask;
                // Sign extend
                let sign_bit = 1u16 << (bits - 1);
                if value & sign_bit != 0 {
                    value as i16 - (1i16 << bits)
                } else {
                    value as i16
                }
            }
            Device::VariationIndex { .. } => 0,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct Anchor {
    pub x: i16,
    pub y: i16,
}

impl ReadBinary for Anchor {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        match ctxt.read_u16be()? {
            1..=3 => {
                let x = ctxt.read_i16be()?;
                let y = ctxt.read_i16be()?;
                // Anchor points and device adjustments of formats 2 and 3 are not used
                Ok(Anchor { x, y })
            }
            _ => Err(ParseError::BadVersion),
        }
    }
}

pub enum SinglePos {
    Format1 {
        coverage: Coverage,
        value_record: Option<ValueRecord>,
    },
    Format2 {
        coverage: Coverage,
        value_records: Vec<Option<ValueRecord>>,
    },
}

impl ReadBinary for SinglePos {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let scope = ctxt.scope();
        match ctxt.read_u16be()? {
            1 => {
                let coverage_offset = usize::from(ctxt.read_u16be()?);
                let coverage = read_coverage(&scope, coverage_offset)?;
                let value_format = ctxt.read::<ValueFormat>()?;
                let value_record = ctxt.read_dep::<ValueRecord>((value_format, scope))?;
                Ok(SinglePos::Format1 {
                    coverage,
                    value_record,
                })
            }
            2 => {
                let coverage_offset = usize::from(ctxt.read_u16be()?);
                let coverage = read_coverage(&scope, coverage_offset)?;
                let value_format = ctxt.read::<ValueFormat>()?;
                let value_count = usize::from(ctxt.read_u16be()?);
                let value_records = ctxt
                    .read_array_dep::<ValueRecord>(value_count, (value_format, scope))?
                    .read_to_vec()?;
                Ok(SinglePos::Format2 {
                    coverage,
                    value_records,
                })
            }
            _ => Err(ParseError::BadVersion),
        }
    }
}

impl SinglePos {
    /// Value record for `glyph`, or `None` when the glyph is not covered.
    pub fn apply(&self, glyph: u16) -> Option<&ValueRecord> {
        match self {
            SinglePos::Format1 {
                coverage,
                value_record,
            } => coverage
                .glyph_coverage_value(glyph)
                .and_then(|_| value_record.as_ref()),
            SinglePos::Format2 {
                coverage,
                value_records,
            } => coverage
                .glyph_coverage_value(glyph)
                .and_then(|index| value_records.get(usize::from(index)))
                .and_then(Option::as_ref),
        }
    }
}

pub enum PairPos {
    Format1 {
        coverage: Coverage,
        pairsets: Vec<PairSet>,
    },
    Format2 {
        coverage: Coverage,
        classdef1: ClassDef,
        classdef2: ClassDef,
        class2_count: usize,
        class1_records: Vec<Class1Record>,
    },
}

pub type PairValues<'a> = (Option<&'a ValueRecord>, Option<&'a ValueRecord>);

impl ReadBinary for PairPos {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let scope = ctxt.scope();
        match ctxt.read_u16be()? {
            1 => {
                let coverage_offset = usize::from(ctxt.read_u16be()?);
                let coverage = read_coverage(&scope, coverage_offset)?;
                let value_format1 = ctxt.read::<ValueFormat>()?;
                let value_format2 = ctxt.read::<ValueFormat>()?;
                let pairset_count = usize::from(ctxt.read_u16be()?);
                let pairset_offsets = ctxt.read_array::<U16Be>(pairset_count)?;
                let mut pairsets = Vec::with_capacity(pairset_offsets.len());
                for offset in &pairset_offsets {
                    let pairset_scope = scope.offset_checked(usize::from(offset))?;
                    // Device offsets in a PairValueRecord are relative to the PairSet
                    pairsets.push(pairset_scope.read_dep::<PairSet>((
                        value_format1,
                        value_format2,
                        pairset_scope,
                    ))?);
                }
                Ok(PairPos::Format1 { coverage, pairsets })
            }
            2 => {
                let coverage_offset = usize::from(ctxt.read_u16be()?);
                let coverage = read_coverage(&scope, coverage_offset)?;
                let value_format1 = ctxt.read::<ValueFormat>()?;
                let value_format2 = ctxt.read::<ValueFormat>()?;
                let classdef1_offset = usize::from(ctxt.read_u16be()?);
                let classdef2_offset = usize::from(ctxt.read_u16be()?);
                let classdef1 = scope.offset_checked(classdef1_offset)?.read::<ClassDef>()?;
                let classdef2 = scope.offset_checked(classdef2_offset)?.read::<ClassDef>()?;
                let class1_count = usize::from(ctxt.read_u16be()?);
                let class2_count = usize::from(ctxt.read_u16be()?);
                let class1_records = ctxt
                    .read_array_dep::<Class1Record>(
                        class1_count,
                        (class2_count, value_format1, value_format2, scope),
                    )?
                    .read_to_vec()?;
                Ok(PairPos::Format2 {
                    coverage,
                    classdef1,
                    classdef2,
                    class2_count,
                    class1_records,
                })
            }
            _ => Err(ParseError::BadVersion),
        }
    }
}

pub struct PairSet {
    pair_value_records: Vec<PairValueRecord>,
}

impl ReadBinaryDep for PairSet {
    type Args<'a> = (ValueFormat, ValueFormat, ReadScope<'a>);
    type HostType<'a> = Self;

    fn read_dep<'a>(ctxt: &mut ReadCtxt<'a>, args: Self::Args<'a>) -> Result<Self, ParseError> {
        let pair_value_count = usize::from(ctxt.read_u16be()?);
        let pair_value_records = ctxt
            .read_array_dep::<PairValueRecord>(pair_value_count, args)?
            .read_to_vec()?;
        Ok(PairSet { pair_value_records })
    }
}

pub struct PairValueRecord {
    second_glyph: u16,
    value_record1: Option<ValueRecord>,
    value_record2: Option<ValueRecord>,
}

impl ReadBinaryDep for PairValueRecord {
    type Args<'a> = (ValueFormat, ValueFormat, ReadScope<'a>);
    type HostType<'a> = Self;

    fn read_dep<'a>(ctxt: &mut ReadCtxt<'a>, args: Self::Args<'a>) -> Result<Self, ParseError> {
        let (value_format1, value_format2, scope) = args;
        let second_glyph = ctxt.read_u16be()?;
        let value_record1 = ctxt.read_dep::<ValueRecord>((value_format1, scope))?;
        let value_record2 = ctxt.read_dep::<ValueRecord>((value_format2, scope))?;
        Ok(PairValueRecord {
            second_glyph,
            value_record1,
            value_record2,
        })
    }
}

impl ReadFixedSizeDep for PairValueRecord {
    fn size((value_format1, value_format2, _scope): Self::Args<'_>) -> usize {
        2 + value_format1.size() + value_format2.size()
    }
}

pub struct Class1Record {
    class2_records: Vec<Class2Record>,
}

impl ReadBinaryDep for Class1Record {
    type Args<'a> = (usize, ValueFormat, ValueFormat, ReadScope<'a>);
    type HostType<'a> = Self;

    fn read_dep<'a>(ctxt: &mut ReadCtxt<'a>, args: Self::Args<'a>) -> Result<Self, ParseError> {
        let (class2_count, value_format1, value_format2, scope) = args;
        let class2_records = ctxt
            .read_array_dep::<Class2Record>(class2_count, (value_format1, value_format2, scope))?
            .read_to_vec()?;
        Ok(Class1Record { class2_records })
    }
}

impl ReadFixedSizeDep for Class1Record {
    fn size((class2_count, value_format1, value_format2, scope): Self::Args<'_>) -> usize {
        class2_count * Class2Record::size((value_format1, value_format2, scope))
    }
}

pub struct Class2Record {
    value_record1: Option<ValueRecord>,
    value_record2: Option<ValueRecord>,
}

impl ReadBinaryDep for Class2Record {
    type Args<'a> = (ValueFormat, ValueFormat, ReadScope<'a>);
    type HostType<'a> = Self;

    fn read_dep<'a>(ctxt: &mut ReadCtxt<'a>, args: Self::Args<'a>) -> Result<Self, ParseError> {
        let (value_format1, value_format2, scope) = args;
        let value_record1 = ctxt.read_dep::<ValueRecord>((value_format1, scope))?;
        let value_record2 = ctxt.read_dep::<ValueRecord>((value_format2, scope))?;
        Ok(Class2Record {
            value_record1,
            value_record2,
        })
    }
}

impl ReadFixedSizeDep for Class2Record {
    fn size((value_format1, value_format2, _scope): Self::Args<'_>) -> usize {
        value_format1.size() + value_format2.size()
    }
}

impl PairPos {
    /// Value records for the pair, or `None` when the pair is not matched.
    pub fn apply(&self, glyph1: u16, glyph2: u16) -> Option<PairValues<'_>> {
        match self {
            PairPos::Format1 { coverage, pairsets } => {
                let coverage_index = coverage.glyph_coverage_value(glyph1)?;
                let pairset = pairsets.get(usize::from(coverage_index))?;
                pairset
                    .pair_value_records
                    .iter()
                    .find(|record| record.second_glyph == glyph2)
                    .map(|record| (record.value_record1.as_ref(), record.value_record2.as_ref()))
            }
            PairPos::Format2 {
                coverage,
                classdef1,
                classdef2,
                class2_count,
                class1_records,
            } => {
                coverage.glyph_coverage_value(glyph1)?;
                let class1_value = usize::from(classdef1.glyph_class_value(glyph1));
                let class2_value = usize::from(classdef2.glyph_class_value(glyph2));
                if class2_value >= *class2_count {
                    return None;
                }
                let class2_record = class1_records
                    .get(class1_value)?
                    .class2_records
                    .get(class2_value)?;
                Some((
                    class2_record.value_record1.as_ref(),
                    class2_record.value_record2.as_ref(),
                ))
            }
        }
    }
}

pub struct CursivePos {
    coverage: Coverage,
    entry_exit_records: Vec<EntryExitRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryExitRecord {
    pub entry_anchor: Option<Anchor>,
    pub exit_anchor: Option<Anchor>,
}

impl ReadBinary for CursivePos {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let scope = ctxt.scope();
        match ctxt.read_u16be()? {
            1 => {
                let coverage_offset = usize::from(ctxt.read_u16be()?);
                let coverage = read_coverage(&scope, coverage_offset)?;
                let entry_exit_count = usize::from(ctxt.read_u16be()?);
                let entry_exit_records = ctxt
                    .read_array_dep::<EntryExitRecord>(entry_exit_count, scope)?
                    .read_to_vec()?;
                Ok(CursivePos {
                    coverage,
                    entry_exit_records,
                })
            }
            _ => Err(ParseError::BadVersion),
        }
    }
}

impl ReadBinaryDep for EntryExitRecord {
    type Args<'a> = ReadScope<'a>;
    type HostType<'a> = Self;

    fn read_dep<'a>(ctxt: &mut ReadCtxt<'a>, scope: Self::Args<'a>) -> Result<Self, ParseError> {
        let entry_anchor_offset = usize::from(ctxt.read_u16be()?);
        let exit_anchor_offset = usize::from(ctxt.read_u16be()?);
        Ok(EntryExitRecord {
            entry_anchor: read_anchor_nullable(&scope, entry_anchor_offset)?,
            exit_anchor: read_anchor_nullable(&scope, exit_anchor_offset)?,
        })
    }
}

impl ReadFixedSizeDep for EntryExitRecord {
    fn size(_scope: Self::Args<'_>) -> usize {
        2 * 2
    }
}

impl CursivePos {
    /// Entry and exit anchors for `glyph`, or `None` when the glyph is not covered.
    pub fn entry_exit(&self, glyph: u16) -> Option<&EntryExitRecord> {
        self.coverage
            .glyph_coverage_value(glyph)
            .and_then(|index| self.entry_exit_records.get(usize::from(index)))
    }
}

// also used for MarkToMark tables
pub struct MarkBasePos {
    mark_coverage: Coverage,
    base_coverage: Coverage,
    mark_class_count: usize,
    mark_array: MarkArray,
    base_array: BaseArray,
}

impl ReadBinary for MarkBasePos {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let scope = ctxt.scope();
        match ctxt.read_u16be()? {
            1 => {
                let mark_coverage_offset = usize::from(ctxt.read_u16be()?);
                let base_coverage_offset = usize::from(ctxt.read_u16be()?);
                let mark_class_count = usize::from(ctxt.read_u16be()?);
                let mark_array_offset = usize::from(ctxt.read_u16be()?);
                let base_array_offset = usize::from(ctxt.read_u16be()?);
                let mark_coverage = read_coverage(&scope, mark_coverage_offset)?;
                let base_coverage = read_coverage(&scope, base_coverage_offset)?;
                let mark_array = scope.offset_checked(mark_array_offset)?.read::<MarkArray>()?;
                let base_array = scope
                    .offset_checked(base_array_offset)?
                    .read_dep::<BaseArray>(mark_class_count)?;
                Ok(MarkBasePos {
                    mark_coverage,
                    base_coverage,
                    mark_class_count,
                    mark_array,
                    base_array,
                })
            }
            _ => Err(ParseError::BadVersion),
        }
    }
}

struct BaseArray {
    base_records: Vec<BaseRecord>,
}

impl ReadBinaryDep for BaseArray {
    type Args<'a> = usize;
    type HostType<'a> = Self;

    fn read_dep<'a>(ctxt: &mut ReadCtxt<'a>, args: Self::Args<'a>) -> Result<Self, ParseError> {
        let mark_class_count = args;
        let scope = ctxt.scope();
        let base_count = usize::from(ctxt.read_u16be()?);
        let base_records = ctxt
            .read_array_dep::<BaseRecord>(base_count, (scope, mark_class_count))?
            .read_to_vec()?;
        Ok(BaseArray { base_records })
    }
}

struct BaseRecord {
    base_anchors: Vec<Option<Anchor>>,
}

impl ReadBinaryDep for BaseRecord {
    type Args<'a> = (ReadScope<'a>, usize);
    type HostType<'a> = Self;

    fn read_dep<'a>(ctxt: &mut ReadCtxt<'a>, args: Self::Args<'a>) -> Result<Self, ParseError> {
        let (scope, mark_class_count) = args;
        let base_anchor_offsets = ctxt.read_array::<U16Be>(mark_class_count)?;
        let base_anchors = read_anchors_nullable(&scope, base_anchor_offsets)?;
        Ok(BaseRecord { base_anchors })
    }
}

impl ReadFixedSizeDep for BaseRecord {
    fn size((_scope, mark_class_count): Self::Args<'_>) -> usize {
        mark_class_count * 2
    }
}

struct MarkArray {
    mark_records: Vec<MarkRecord>,
}

impl ReadBinary for MarkArray {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let scope = ctxt.scope();
        let mark_count = usize::from(ctxt.read_u16be()?);
        let mark_records = ctxt
            .read_array_dep::<MarkRecord>(mark_count, scope)?
            .read_to_vec()?;
        Ok(MarkArray { mark_records })
    }
}

struct MarkRecord {
    mark_class: u16,
    mark_anchor: Anchor,
}

impl ReadBinaryDep for MarkRecord {
    type Args<'a> = ReadScope<'a>;
    type HostType<'a> = Self;

    fn read_dep<'a>(ctxt: &mut ReadCtxt<'a>, scope: Self::Args<'a>) -> Result<Self, ParseError> {
        let mark_class = ctxt.read_u16be()?;
        let mark_anchor_offset = usize::from(ctxt.read_u16be()?);
        let mark_anchor = scope.offset_checked(mark_anchor_offset)?.read::<Anchor>()?;
        Ok(MarkRecord {
            mark_class,
            mark_anchor,
        })
    }
}

impl ReadFixedSizeDep for MarkRecord {
    fn size(_scope: Self::Args<'_>) -> usize {
        2 * 2
    }
}

impl MarkArray {
    fn mark_record(
        &self,
        mark_coverage_index: u16,
        mark_class_count: usize,
    ) -> Option<&MarkRecord> {
        self.mark_records
            .get(usize::from(mark_coverage_index))
            .filter(|record| usize::from(record.mark_class) < mark_class_count)
    }
}

impl MarkBasePos {
    /// Anchors `(base_anchor, mark_anchor)` attaching `mark` to `base`.
    pub fn apply(&self, base: u16, mark: u16) -> Option<(Anchor, Anchor)> {
        let base_coverage_index = self.base_coverage.glyph_coverage_value(base)?;
        let mark_coverage_index = self.mark_coverage.glyph_coverage_value(mark)?;
        let mark_record = self
            .mark_array
            .mark_record(mark_coverage_index, self.mark_class_count)?;
        let base_record = self
            .base_array
            .base_records
            .get(usize::from(base_coverage_index))?;
        let base_anchor = (*base_record
            .base_anchors
            .get(usize::from(mark_record.mark_class))?)?;
        Some((base_anchor, mark_record.mark_anchor))
    }

    pub fn covers_mark(&self, mark: u16) -> bool {
        self.mark_coverage.glyph_coverage_value(mark).is_some()
    }
}

pub struct MarkLigPos {
    mark_coverage: Coverage,
    liga_coverage: Coverage,
    mark_class_count: usize,
    mark_array: MarkArray,
    ligature_array: LigatureArray,
}

impl ReadBinary for MarkLigPos {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let scope = ctxt.scope();
        match ctxt.read_u16be()? {
            1 => {
                let mark_coverage_offset = usize::from(ctxt.read_u16be()?);
                let liga_coverage_offset = usize::from(ctxt.read_u16be()?);
                let mark_class_count = usize::from(ctxt.read_u16be()?);
                let mark_array_offset = usize::from(ctxt.read_u16be()?);
                let liga_array_offset = usize::from(ctxt.read_u16be()?);
                let mark_coverage = read_coverage(&scope, mark_coverage_offset)?;
                let liga_coverage = read_coverage(&scope, liga_coverage_offset)?;
                let mark_array = scope.offset_checked(mark_array_offset)?.read::<MarkArray>()?;
                let ligature_array = scope
                    .offset_checked(liga_array_offset)?
                    .read_dep::<LigatureArray>(mark_class_count)?;
                Ok(MarkLigPos {
                    mark_coverage,
                    liga_coverage,
                    mark_class_count,
                    mark_array,
                    ligature_array,
                })
            }
            _ => Err(ParseError::BadVersion),
        }
    }
}

struct LigatureArray {
    ligature_attaches: Vec<LigatureAttach>,
}

impl ReadBinaryDep for LigatureArray {
    type Args<'a> = usize;
    type HostType<'a> = Self;

    fn read_dep<'a>(ctxt: &mut ReadCtxt<'a>, mark_class_count: usize) -> Result<Self, ParseError> {
        let scope = ctxt.scope();
        let ligature_count = usize::from(ctxt.read_u16be()?);
        let ligature_attach_offsets = ctxt.read_array::<U16Be>(ligature_count)?;
        let mut ligature_attaches = Vec::with_capacity(ligature_attach_offsets.len());
        for offset in &ligature_attach_offsets {
            ligature_attaches.push(
                scope
                    .offset_checked(usize::from(offset))?
                    .read_dep::<LigatureAttach>(mark_class_count)?,
            );
        }
        Ok(LigatureArray { ligature_attaches })
    }
}

struct LigatureAttach {
    component_records: Vec<ComponentRecord>,
}

impl ReadBinaryDep for LigatureAttach {
    type Args<'a> = usize;
    type HostType<'a> = Self;

    fn read_dep<'a>(ctxt: &mut ReadCtxt<'a>, args: Self::Args<'a>) -> Result<Self, ParseError> {
        let mark_class_count = args;
        let scope = ctxt.scope();
        let component_count = usize::from(ctxt.read_u16be()?);
        let component_records = ctxt
            .read_array_dep::<ComponentRecord>(component_count, (scope, mark_class_count))?
            .read_to_vec()?;
        Ok(LigatureAttach { component_records })
    }
}

struct ComponentRecord {
    ligature_anchors: Vec<Option<Anchor>>,
}

impl ReadBinaryDep for ComponentRecord {
    type Args<'a> = (ReadScope<'a>, usize);
    type HostType<'a> = Self;

    fn read_dep<'a>(
        ctxt: &mut ReadCtxt<'a>,
        args: Self::Args<'a>,
    ) -> Result<Self::HostType<'a>, ParseError> {
        let (scope, mark_class_count) = args;
        let ligature_anchor_offsets = ctxt.read_array::<U16Be>(mark_class_count)?;
        let ligature_anchors = read_anchors_nullable(&scope, ligature_anchor_offsets)?;
        Ok(ComponentRecord { ligature_anchors })
    }
}

impl ReadFixedSizeDep for ComponentRecord {
    fn size((_scope, mark_class_count): Self::Args<'_>) -> usize {
        mark_class_count * 2
    }
}

impl MarkLigPos {
    /// Anchors `(ligature_anchor, mark_anchor)` attaching `mark` to component
    /// `liga_component_index` of `ligature`.
    pub fn apply(
        &self,
        ligature: u16,
        mark: u16,
        liga_component_index: usize,
    ) -> Option<(Anchor, Anchor)> {
        let liga_coverage_index = self.liga_coverage.glyph_coverage_value(ligature)?;
        let mark_coverage_index = self.mark_coverage.glyph_coverage_value(mark)?;
        let mark_record = self
            .mark_array
            .mark_record(mark_coverage_index, self.mark_class_count)?;
        let liga_attach = self
            .ligature_array
            .ligature_attaches
            .get(usize::from(liga_coverage_index))?;
        let component_record = liga_attach.component_records.get(liga_component_index)?;
        let liga_anchor = (*component_record
            .ligature_anchors
            .get(usize::from(mark_record.mark_class))?)?;
        Some((liga_anchor, mark_record.mark_anchor))
    }
}

/// A `(sequence_index, lookup_index)` pair naming a nested lookup to apply.
pub type SequenceLookupRecord = (u16, u16);

pub enum ContextLookup {
    Format1 {
        coverage: Coverage,
        rulesets: Vec<Option<Vec<SequenceRule>>>,
    },
    Format2 {
        coverage: Coverage,
        classdef: ClassDef,
        rulesets: Vec<Option<Vec<SequenceRule>>>,
    },
    Format3 {
        coverages: Vec<Coverage>,
        lookup_records: Vec<SequenceLookupRecord>,
    },
}

/// A context rule; the input sequence holds glyph ids (format 1) or classes (format 2) and
/// excludes the first glyph, which is matched by the coverage table.
pub struct SequenceRule {
    pub input_sequence: Vec<u16>,
    pub lookup_records: Vec<SequenceLookupRecord>,
}

pub enum ChainContextLookup {
    Format1 {
        coverage: Coverage,
        rulesets: Vec<Option<Vec<ChainedSequenceRule>>>,
    },
    Format2 {
        coverage: Coverage,
        backtrack_classdef: ClassDef,
        input_classdef: ClassDef,
        lookahead_classdef: ClassDef,
        rulesets: Vec<Option<Vec<ChainedSequenceRule>>>,
    },
    Format3 {
        backtrack_coverages: Vec<Coverage>,
        input_coverages: Vec<Coverage>,
        lookahead_coverages: Vec<Coverage>,
        lookup_records: Vec<SequenceLookupRecord>,
    },
}

/// A chained context rule, backtrack ordered from the glyph nearest the input outwards.
pub struct ChainedSequenceRule {
    pub backtrack_sequence: Vec<u16>,
    pub input_sequence: Vec<u16>,
    pub lookahead_sequence: Vec<u16>,
    pub lookup_records: Vec<SequenceLookupRecord>,
}

impl ReadBinary for ContextLookup {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let scope = ctxt.scope();
        match ctxt.read_u16be()? {
            1 => {
                let coverage_offset = usize::from(ctxt.read_u16be()?);
                let ruleset_count = usize::from(ctxt.read_u16be()?);
                let ruleset_offsets = ctxt.read_array::<U16Be>(ruleset_count)?;
                let rulesets = read_rulesets::<SequenceRule>(&scope, ruleset_offsets)?;
                let coverage = read_coverage(&scope, coverage_offset)?;
                Ok(ContextLookup::Format1 { coverage, rulesets })
            }
            2 => {
                let coverage_offset = usize::from(ctxt.read_u16be()?);
                let classdef_offset = usize::from(ctxt.read_u16be()?);
                let ruleset_count = usize::from(ctxt.read_u16be()?);
                let ruleset_offsets = ctxt.read_array::<U16Be>(ruleset_count)?;
                let rulesets = read_rulesets::<SequenceRule>(&scope, ruleset_offsets)?;
                let coverage = read_coverage(&scope, coverage_offset)?;
                let classdef = scope.offset_checked(classdef_offset)?.read::<ClassDef>()?;
                Ok(ContextLookup::Format2 {
                    coverage,
                    classdef,
                    rulesets,
                })
            }
            3 => {
                let glyph_count = usize::from(ctxt.read_u16be()?);
                ctxt.check(glyph_count > 0)?;
                let lookup_count = usize::from(ctxt.read_u16be()?);
                let coverage_offsets = ctxt.read_array::<U16Be>(glyph_count)?;
                let coverages = read_coverages(&scope, coverage_offsets)?;
                let lookup_records = ctxt.read_array::<(U16Be, U16Be)>(lookup_count)?.to_vec();
                Ok(ContextLookup::Format3 {
                    coverages,
                    lookup_records,
                })
            }
            _ => Err(ParseError::BadVersion),
        }
    }
}

impl ReadBinary for SequenceRule {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let glyph_count = usize::from(ctxt.read_u16be()?);
        ctxt.check(glyph_count > 0)?;
        let lookup_count = usize::from(ctxt.read_u16be()?);
        let input_sequence = ctxt.read_array::<U16Be>(glyph_count - 1)?.to_vec();
        let lookup_records = ctxt.read_array::<(U16Be, U16Be)>(lookup_count)?.to_vec();
        Ok(SequenceRule {
            input_sequence,
            lookup_records,
        })
    }
}

impl ReadBinary for ChainContextLookup {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let scope = ctxt.scope();
        match ctxt.read_u16be()? {
            1 => {
                let coverage_offset = usize::from(ctxt.read_u16be()?);
                let ruleset_count = usize::from(ctxt.read_u16be()?);
                let ruleset_offsets = ctxt.read_array::<U16Be>(ruleset_count)?;
                let rulesets = read_rulesets::<ChainedSequenceRule>(&scope, ruleset_offsets)?;
                let coverage = read_coverage(&scope, coverage_offset)?;
                Ok(ChainContextLookup::Format1 { coverage, rulesets })
            }
            2 => {
                let coverage_offset = usize::from(ctxt.read_u16be()?);
                let backtrack_classdef_offset = usize::from(ctxt.read_u16be()?);
                let input_classdef_offset = usize::from(ctxt.read_u16be()?);
                let lookahead_classdef_offset = usize::from(ctxt.read_u16be()?);
                let ruleset_count = usize::from(ctxt.read_u16be()?);
                let ruleset_offsets = ctxt.read_array::<U16Be>(ruleset_count)?;
                let rulesets = read_rulesets::<ChainedSequenceRule>(&scope, ruleset_offsets)?;
                let coverage = read_coverage(&scope, coverage_offset)?;
                let backtrack_classdef = read_classdef_or_empty(&scope, backtrack_classdef_offset)?;
                let input_classdef = scope
                    .offset_checked(input_classdef_offset)?
                    .read::<ClassDef>()?;
                let lookahead_classdef = read_classdef_or_empty(&scope, lookahead_classdef_offset)?;
                Ok(ChainContextLookup::Format2 {
                    coverage,
                    backtrack_classdef,
                    input_classdef,
                    lookahead_classdef,
                    rulesets,
                })
            }
            3 => {
                let backtrack_count = usize::from(ctxt.read_u16be()?);
                let backtrack_coverage_offsets = ctxt.read_array::<U16Be>(backtrack_count)?;
                let input_count = usize::from(ctxt.read_u16be()?);
                ctxt.check(input_count > 0)?;
                let input_coverage_offsets = ctxt.read_array::<U16Be>(input_count)?;
                let lookahead_count = usize::from(ctxt.read_u16be()?);
                let lookahead_coverage_offsets = ctxt.read_array::<U16Be>(lookahead_count)?;
                let lookup_count = usize::from(ctxt.read_u16be()?);
                let lookup_records = ctxt.read_array::<(U16Be, U16Be)>(lookup_count)?.to_vec();
                let backtrack_coverages = read_coverages(&scope, backtrack_coverage_offsets)?;
                let input_coverages = read_coverages(&scope, input_coverage_offsets)?;
                let lookahead_coverages = read_coverages(&scope, lookahead_coverage_offsets)?;
                Ok(ChainContextLookup::Format3 {
                    backtrack_coverages,
                    input_coverages,
                    lookahead_coverages,
                    lookup_records,
                })
            }
            _ => Err(ParseError::BadVersion),
        }
    }
}

impl ReadBinary for ChainedSequenceRule {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let backtrack_count = usize::from(ctxt.read_u16be()?);
        let backtrack_sequence = ctxt.read_array::<U16Be>(backtrack_count)?.to_vec();
        let input_count = usize::from(ctxt.read_u16be()?);
        ctxt.check(input_count > 0)?;
        let input_sequence = ctxt.read_array::<U16Be>(input_count - 1)?.to_vec();
        let lookahead_count = usize::from(ctxt.read_u16be()?);
        let lookahead_sequence = ctxt.read_array::<U16Be>(lookahead_count)?.to_vec();
        let lookup_count = usize::from(ctxt.read_u16be()?);
        let lookup_records = ctxt.read_array::<(U16Be, U16Be)>(lookup_count)?.to_vec();
        Ok(ChainedSequenceRule {
            backtrack_sequence,
            input_sequence,
            lookahead_sequence,
            lookup_records,
        })
    }
}

fn read_objects<'a, T: ReadBinary<HostType<'a> = T>>(
    scope: &ReadScope<'a>,
    offsets: ReadArray<'a, U16Be>,
) -> Result<Vec<T>, ParseError> {
    let mut objects = Vec::with_capacity(offsets.len());
    for offset in &offsets {
        let object = scope.offset_checked(usize::from(offset))?.read::<T>()?;
        objects.push(object);
    }
    Ok(objects)
}

// A null offset is a rule set with no rules.
fn read_rulesets<'a, T: ReadBinary<HostType<'a> = T>>(
    scope: &ReadScope<'a>,
    offsets: ReadArray<'a, U16Be>,
) -> Result<Vec<Option<Vec<T>>>, ParseError> {
    let mut rulesets = Vec::with_capacity(offsets.len());
    for offset in &offsets {
        if offset == 0 {
            rulesets.push(None);
            continue;
        }
        let ruleset_scope = scope.offset_checked(usize::from(offset))?;
        let mut ctxt = ruleset_scope.ctxt();
        let rule_count = usize::from(ctxt.read_u16be()?);
        let rule_offsets = ctxt.read_array::<U16Be>(rule_count)?;
        rulesets.push(Some(read_objects::<T>(&ruleset_scope, rule_offsets)?));
    }
    Ok(rulesets)
}

fn read_anchor_nullable(
    scope: &ReadScope<'_>,
    offset: usize,
) -> Result<Option<Anchor>, ParseError> {
    match offset {
        0 => Ok(None),
        offset => scope.offset_checked(offset)?.read::<Anchor>().map(Some),
    }
}

fn read_anchors_nullable<'a>(
    scope: &ReadScope<'a>,
    offsets: ReadArray<'a, U16Be>,
) -> Result<Vec<Option<Anchor>>, ParseError> {
    offsets
        .iter()
        .map(|offset| read_anchor_nullable(scope, usize::from(offset)))
        .collect()
}

fn read_coverage(scope: &ReadScope<'_>, offset: usize) -> Result<Coverage, ParseError> {
    scope.offset_checked(offset)?.read::<Coverage>()
}

fn read_coverages<'a>(
    scope: &ReadScope<'a>,
    offsets: ReadArray<'a, U16Be>,
) -> Result<Vec<Coverage>, ParseError> {
    offsets
        .iter()
        .map(|offset| read_coverage(scope, usize::from(offset)))
        .collect()
}

// Backtrack and lookahead class definitions may be omitted, in which case every glyph is
// class 0.
fn read_classdef_or_empty(scope: &ReadScope<'_>, offset: usize) -> Result<ClassDef, ParseError> {
    match offset {
        0 => Ok(ClassDef::Format2 {
            class_range_array: Vec::new(),
        }),
        offset => scope.offset_checked(offset)?.read::<ClassDef>(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Coverage {
    Format1 {
        glyph_array: Vec<u16>,
    },
    Format2 {
        coverage_range_array: Vec<CoverageRangeRecord>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoverageRangeRecord {
    pub start_glyph: u16,
    pub end_glyph: u16,
    pub start_coverage_index: u16,
}

impl ReadFrom for CoverageRangeRecord {
    type ReadType = (U16Be, U16Be, U16Be);
    fn read_from((start_glyph, end_glyph, start_coverage_index): (u16, u16, u16)) -> Self {
        CoverageRangeRecord {
            start_glyph,
            end_glyph,
            start_coverage_index,
        }
    }
}

impl ReadBinary for Coverage {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        match ctxt.read_u16be()? {
            1 => {
                let glyph_count = usize::from(ctxt.read_u16be()?);
                let glyph_array = ctxt.read_array::<U16Be>(glyph_count)?.to_vec();
                Ok(Coverage::Format1 { glyph_array })
            }
            2 => {
                let coverage_range_count = usize::from(ctxt.read_u16be()?);
                let coverage_range_array = ctxt
                    .read_array::<CoverageRangeRecord>(coverage_range_count)?
                    .to_vec();
                for coverage_range_record in &coverage_range_array {
                    ctxt.check(
                        coverage_range_record.start_glyph <= coverage_range_record.end_glyph,
                    )?
                }
                Ok(Coverage::Format2 {
                    coverage_range_array,
                })
            }
            _ => Err(ParseError::BadVersion),
        }
    }
}

impl Coverage {
    /// Coverage index of `glyph`, or `None` when the glyph is not covered.
    pub fn glyph_coverage_value(&self, glyph: u16) -> Option<u16> {
        match self {
            Coverage::Format1 { glyph_array } => {
                // The glyph indices must be in numerical order for binary searching of the list.
                glyph_array
                    .binary_search(&glyph)
                    .ok()
                    .and_then(|index| u16::try_from(index).ok())
            }
            Coverage::Format2 {
                coverage_range_array,
            } => {
                let index = coverage_range_array
                    .binary_search_by(|range| {
                        if glyph < range.start_glyph {
                            std::cmp::Ordering::Greater
                        } else if glyph > range.end_glyph {
                            std::cmp::Ordering::Less
                        } else {
                            std::cmp::Ordering::Equal
                        }
                    })
                    .ok()?;
                let range = &coverage_range_array[index];
                range
                    .start_coverage_index
                    .checked_add(glyph - range.start_glyph)
            }
        }
    }

    /// Convenience method to count the total number of glyphs covered
    pub fn glyph_count(&self) -> usize {
        match self {
            Coverage::Format1 { glyph_array } => glyph_array.len(),
            Coverage::Format2 {
                coverage_range_array,
            } => coverage_range_array
                .iter()
                .map(|range| usize::from(range.end_glyph - range.start_glyph) + 1)
                .sum(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassDef {
    Format1 {
        start_glyph: u16,
        class_value_array: Vec<u16>,
    },
    Format2 {
        class_range_array: Vec<ClassRangeRecord>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassRangeRecord {
    pub start_glyph: u16,
    pub end_glyph: u16,
    pub class_value: u16,
}

impl ReadFrom for ClassRangeRecord {
    type ReadType = (U16Be, U16Be, U16Be);
    fn read_from((start_glyph, end_glyph, class_value): (u16, u16, u16)) -> Self {
        ClassRangeRecord {
            start_glyph,
            end_glyph,
            class_value,
        }
    }
}

impl ReadBinary for ClassDef {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        match ctxt.read_u16be()? {
            1 => {
                let start_glyph = ctxt.read_u16be()?;
                let glyph_count = usize::from(ctxt.read_u16be()?);
                let class_value_array = ctxt.read_array::<U16Be>(glyph_count)?.to_vec();
                Ok(ClassDef::Format1 {
                    start_glyph,
                    class_value_array,
                })
            }
            2 => {
                let class_range_count = usize::from(ctxt.read_u16be()?);
                // Some fonts declare more class ranges than the table holds, so cap the length
                // based on available bytes.
                let class_range_array = ctxt
                    .read_array_upto_hack::<ClassRangeRecord>(class_range_count)?
                    .to_vec();
                Ok(ClassDef::Format2 { class_range_array })
            }
            _ => Err(ParseError::BadVersion),
        }
    }
}

impl ClassDef {
    /// Class of `glyph`, 0 for glyphs not assigned a class.
    pub fn glyph_class_value(&self, glyph: u16) -> u16 {
        match self {
            ClassDef::Format1 {
                start_glyph,
                class_value_array,
            } => glyph
                .checked_sub(*start_glyph)
                .and_then(|index| class_value_array.get(usize::from(index)))
                .copied()
                .unwrap_or(0),
            ClassDef::Format2 { class_range_array } => class_range_array
                .iter()
                .find(|range| glyph >= range.start_glyph && glyph <= range.end_glyph)
                .map_or(0, |range| range.class_value),
        }
    }
}
