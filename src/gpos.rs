//! Glyph positioning (`gpos`) implementation.
//!
//! > The Glyph Positioning table (GPOS) provides precise control over glyph placement for
//! > sophisticated text layout and rendering in each script and language system that a font
//! > supports.
//!
//! — <https://docs.microsoft.com/en-us/typography/opentype/spec/gpos>
//!
//! Positioning never changes the glyphs of a [StringRecord]. Adjustments are accumulated in
//! each glyph's [PositionRecord]: value records add to its placement and advance, while
//! cursive and mark attachment record an anchor offset from the glyph it attaches to. The
//! renderer resolves those offsets against the pen position.

use log::debug;

use crate::context::{
    chain_context_lookup_info, context_lookup_info, ContextLookupHelper, MatchType,
    MAX_CONTEXT_RECURSION,
};
use crate::gdef;
use crate::layout::{
    Anchor, ChainContextLookup, ContextLookup, CursivePos, GDEFTable, LayoutTable, Lookup,
    MarkBasePos, MarkLigPos, PairPos, PosLookup, SinglePos, ValueRecord, GPOS,
};
use crate::scripts::{self, arabic, ScriptType};
use crate::string_record::{AnchorType, GlyphIndex, Position, PositionRecord, StringRecord};

/// Apply the `GPOS` features for the script of `record`'s text.
pub fn gpos_apply(
    opt_gdef_table: Option<&GDEFTable>,
    gpos_table: &LayoutTable<GPOS>,
    record: &mut StringRecord,
) {
    let Some((script_tag, langsys)) = scripts::find_langsys(gpos_table, record.chars()) else {
        return;
    };
    let priority = match ScriptType::from(script_tag) {
        ScriptType::Arabic => arabic::GPOS_FEATURE_ORDER,
        ScriptType::Default => &[],
    };

    for (_feature_tag, feature_table) in scripts::ordered_features(gpos_table, langsys, priority)
    {
        for &lookup_index in &feature_table.lookup_indices {
            match gpos_table.lookup(lookup_index) {
                Some(lookup) => gpos_apply_lookup(opt_gdef_table, gpos_table, lookup, record),
                None => debug!("feature lookup {} is missing, skipping", lookup_index),
            }
        }
    }
}

/// Apply `lookup` across the whole of `record`.
pub fn gpos_apply_lookup(
    opt_gdef_table: Option<&GDEFTable>,
    gpos_table: &LayoutTable<GPOS>,
    lookup: &Lookup<PosLookup>,
    record: &mut StringRecord,
) {
    let match_type = MatchType::from_lookup(lookup);
    match lookup.subtables {
        PosLookup::SinglePos(ref subtables) => {
            forall_glyphs_match(match_type, opt_gdef_table, record, |i, record| {
                singlepos(subtables, i, record).then_some(i)
            })
        }
        PosLookup::PairPos(ref subtables) => {
            forall_glyphs_match(match_type, opt_gdef_table, record, |i1, record| {
                let i2 = match_type.find_next(opt_gdef_table, record, i1)?;
                pairpos(subtables, i1, i2, record)
            })
        }
        PosLookup::CursivePos(ref subtables) => {
            cursive_chain(match_type, opt_gdef_table, subtables, record)
        }
        PosLookup::MarkBasePos(ref subtables) => forall_glyphs(record, |i, record| {
            markbasepos(subtables, match_type, opt_gdef_table, i, record);
        }),
        PosLookup::MarkLigPos(ref subtables) => forall_glyphs(record, |i, record| {
            markligpos(subtables, match_type, opt_gdef_table, i, record);
        }),
        PosLookup::MarkMarkPos(ref subtables) => forall_glyphs(record, |i, record| {
            markmarkpos(subtables, match_type, opt_gdef_table, i, record);
        }),
        PosLookup::ContextPos(ref subtables) => {
            forall_glyphs_match(match_type, opt_gdef_table, record, |i, record| {
                contextpos(
                    MAX_CONTEXT_RECURSION,
                    opt_gdef_table,
                    gpos_table,
                    subtables,
                    match_type,
                    i,
                    record,
                )
            })
        }
        PosLookup::ChainContextPos(ref subtables) => {
            forall_glyphs_match(match_type, opt_gdef_table, record, |i, record| {
                chaincontextpos(
                    MAX_CONTEXT_RECURSION,
                    opt_gdef_table,
                    gpos_table,
                    subtables,
                    match_type,
                    i,
                    record,
                )
            })
        }
    }
}

// Apply a lookup at a single glyph, as the nested lookup of a context rule.
fn gpos_apply_lookup_at(
    recursion_limit: usize,
    opt_gdef_table: Option<&GDEFTable>,
    gpos_table: &LayoutTable<GPOS>,
    lookup: &Lookup<PosLookup>,
    index: GlyphIndex,
    record: &mut StringRecord,
) {
    let match_type = MatchType::from_lookup(lookup);
    match lookup.subtables {
        PosLookup::SinglePos(ref subtables) => {
            singlepos(subtables, index, record);
        }
        PosLookup::PairPos(ref subtables) => {
            if let Some(i2) = match_type.find_next(opt_gdef_table, record, index) {
                pairpos(subtables, index, i2, record);
            }
        }
        PosLookup::CursivePos(ref subtables) => {
            if let Some(i1) = match_type.find_prev(opt_gdef_table, record, index) {
                cursivepos(subtables, i1, index, record);
            }
        }
        PosLookup::MarkBasePos(ref subtables) => {
            markbasepos(subtables, match_type, opt_gdef_table, index, record);
        }
        PosLookup::MarkLigPos(ref subtables) => {
            markligpos(subtables, match_type, opt_gdef_table, index, record);
        }
        PosLookup::MarkMarkPos(ref subtables) => {
            markmarkpos(subtables, match_type, opt_gdef_table, index, record);
        }
        PosLookup::ContextPos(ref subtables) => {
            contextpos(
                recursion_limit,
                opt_gdef_table,
                gpos_table,
                subtables,
                match_type,
                index,
                record,
            );
        }
        PosLookup::ChainContextPos(ref subtables) => {
            chaincontextpos(
                recursion_limit,
                opt_gdef_table,
                gpos_table,
                subtables,
                match_type,
                index,
                record,
            );
        }
    }
}

// Calls `f` for each glyph the match type accepts. When `f` returns an index the walk
// resumes after it.
fn forall_glyphs_match(
    match_type: MatchType,
    opt_gdef_table: Option<&GDEFTable>,
    record: &mut StringRecord,
    mut f: impl FnMut(GlyphIndex, &mut StringRecord) -> Option<GlyphIndex>,
) {
    let mut cursor = record.first_index();
    while let Some(index) = cursor {
        let mut last = index;
        if match_type.match_glyph(opt_gdef_table, record, index) {
            if let Some(last_index) = f(index, record) {
                last = last_index;
            }
        }
        cursor = record.next_index(last);
    }
}

// Calls `f` for each glyph that has not been deleted.
fn forall_glyphs(record: &mut StringRecord, mut f: impl FnMut(GlyphIndex, &mut StringRecord)) {
    let mut cursor = record.first_index();
    while let Some(index) = cursor {
        if record.glyph(index) != 0 {
            f(index, record);
        }
        cursor = record.next_index(index);
    }
}

fn anchor_offset(from: Anchor, to: Anchor) -> Position {
    Position::new(
        i32::from(from.x) - i32::from(to.x),
        i32::from(from.y) - i32::from(to.y),
    )
}

fn adjust(position: &mut PositionRecord, value_record: &ValueRecord) {
    position.placement.x += i32::from(value_record.x_placement);
    position.placement.y += i32::from(value_record.y_placement);
    position.advance.x += i32::from(value_record.x_advance);
    position.advance.y += i32::from(value_record.y_advance);
}

fn attach(record: &mut StringRecord, index: GlyphIndex, anchor_type: AnchorType, anchor: Position) {
    if let Some(glyph) = record.get_mut(index) {
        glyph.position.anchor_type |= anchor_type;
        glyph.position.anchor = anchor;
    }
}

fn singlepos(subtables: &[SinglePos], i: GlyphIndex, record: &mut StringRecord) -> bool {
    let glyph = record.glyph(i);
    let Some(value_record) = subtables.iter().find_map(|single_pos| single_pos.apply(glyph))
    else {
        return false;
    };
    if let Some(glyph) = record.get_mut(i) {
        adjust(&mut glyph.position, value_record);
    }
    true
}

// Returns the glyph the walk resumes after. The second glyph of a pair only starts the next
// pair when the pair leaves it unadjusted.
fn pairpos(
    subtables: &[PairPos],
    i1: GlyphIndex,
    i2: GlyphIndex,
    record: &mut StringRecord,
) -> Option<GlyphIndex> {
    let (glyph1, glyph2) = (record.glyph(i1), record.glyph(i2));
    let (opt_adj1, opt_adj2) = subtables
        .iter()
        .find_map(|pair_pos| pair_pos.apply(glyph1, glyph2))?;
    if let (Some(adj1), Some(glyph)) = (opt_adj1, record.get_mut(i1)) {
        adjust(&mut glyph.position, adj1);
    }
    match (opt_adj2, record.get_mut(i2)) {
        (Some(adj2), Some(glyph)) => {
            adjust(&mut glyph.position, adj2);
            Some(i2)
        }
        _ => Some(i1),
    }
}

// Connects the exit anchor of each glyph to the entry anchor of the next one it accepts.
// Glyphs skipped in between are tagged so that they move with the chain.
fn cursive_chain(
    match_type: MatchType,
    opt_gdef_table: Option<&GDEFTable>,
    subtables: &[CursivePos],
    record: &mut StringRecord,
) {
    let mut opt_exit = None;
    let mut cursor = record.first_index();
    while let Some(index) = cursor {
        cursor = record.next_index(index);
        if record.glyph(index) == 0 {
            continue;
        }
        if !match_type.match_glyph(opt_gdef_table, record, index) {
            if opt_exit.is_some() {
                attach(record, index, AnchorType::CURSIVE_IGNORED, Position::default());
            }
            continue;
        }

        let glyph = record.glyph(index);
        match subtables.iter().find_map(|cursive_pos| cursive_pos.entry_exit(glyph)) {
            Some(entry_exit) => {
                if let (Some(exit), Some(entry)) = (opt_exit, entry_exit.entry_anchor) {
                    attach(record, index, AnchorType::ENTRY, anchor_offset(exit, entry));
                }
                opt_exit = entry_exit.exit_anchor;
                if opt_exit.is_some() {
                    if let Some(glyph) = record.get_mut(index) {
                        glyph.position.anchor_type |= AnchorType::EXIT;
                    }
                }
            }
            None => opt_exit = None,
        }
    }
}

// Connects a single pair of glyphs, for nested application.
fn cursivepos(subtables: &[CursivePos], i1: GlyphIndex, i2: GlyphIndex, record: &mut StringRecord) {
    let (glyph1, glyph2) = (record.glyph(i1), record.glyph(i2));
    let opt_exit = subtables
        .iter()
        .find_map(|cursive_pos| cursive_pos.entry_exit(glyph1))
        .and_then(|entry_exit| entry_exit.exit_anchor);
    let opt_entry = subtables
        .iter()
        .find_map(|cursive_pos| cursive_pos.entry_exit(glyph2))
        .and_then(|entry_exit| entry_exit.entry_anchor);
    if let (Some(exit), Some(entry)) = (opt_exit, opt_entry) {
        if let Some(glyph) = record.get_mut(i1) {
            glyph.position.anchor_type |= AnchorType::EXIT;
        }
        attach(record, i2, AnchorType::ENTRY, anchor_offset(exit, entry));
    }
}

fn markbasepos(
    subtables: &[MarkBasePos],
    match_type: MatchType,
    opt_gdef_table: Option<&GDEFTable>,
    i: GlyphIndex,
    record: &mut StringRecord,
) {
    let mark = record.glyph(i);
    if !subtables.iter().any(|mark_base| mark_base.covers_mark(mark)) {
        return;
    }
    let Some(base_index) = gdef::prev_base_glyph(opt_gdef_table, record, i, match_type) else {
        return;
    };
    let base = record.glyph(base_index);
    if let Some((base_anchor, mark_anchor)) = subtables
        .iter()
        .find_map(|mark_base| mark_base.apply(base, mark))
    {
        attach(record, i, AnchorType::MARK, anchor_offset(mark_anchor, base_anchor));
    }
}

fn markligpos(
    subtables: &[MarkLigPos],
    match_type: MatchType,
    opt_gdef_table: Option<&GDEFTable>,
    i: GlyphIndex,
    record: &mut StringRecord,
) {
    let Some((liga_index, component)) =
        gdef::prev_ligature_glyph(opt_gdef_table, record, i, match_type)
    else {
        return;
    };
    let (ligature, mark) = (record.glyph(liga_index), record.glyph(i));
    if let Some((liga_anchor, mark_anchor)) = subtables
        .iter()
        .find_map(|mark_lig| mark_lig.apply(ligature, mark, component))
    {
        attach(record, i, AnchorType::MARK, anchor_offset(mark_anchor, liga_anchor));
    }
}

fn markmarkpos(
    subtables: &[MarkBasePos],
    match_type: MatchType,
    opt_gdef_table: Option<&GDEFTable>,
    i: GlyphIndex,
    record: &mut StringRecord,
) {
    let mark1 = record.glyph(i);
    if !subtables.iter().any(|mark_mark| mark_mark.covers_mark(mark1)) {
        return;
    }
    let Some(mark2_index) = gdef::prev_mark_glyph(opt_gdef_table, record, i, match_type) else {
        return;
    };
    let mark2 = record.glyph(mark2_index);
    let Some((mark2_anchor, mark1_anchor)) = subtables
        .iter()
        .find_map(|mark_mark| mark_mark.apply(mark2, mark1))
    else {
        return;
    };
    // The attachment is relative to the first mark, which is itself offset from its base
    let offset = anchor_offset(mark1_anchor, mark2_anchor);
    let base_offset = record
        .get(mark2_index)
        .map(|glyph| glyph.position.anchor)
        .unwrap_or_default();
    attach(
        record,
        i,
        AnchorType::MARK,
        Position::new(offset.x + base_offset.x, offset.y + base_offset.y),
    );
}

fn contextpos(
    recursion_limit: usize,
    opt_gdef_table: Option<&GDEFTable>,
    gpos_table: &LayoutTable<GPOS>,
    subtables: &[ContextLookup],
    match_type: MatchType,
    i: GlyphIndex,
    record: &mut StringRecord,
) -> Option<GlyphIndex> {
    let glyph = record.glyph(i);
    let pos = subtables.iter().find_map(|context_lookup| {
        context_lookup_info(context_lookup, glyph, |context| {
            context.matches(opt_gdef_table, match_type, record, i)
        })
    })?;
    apply_pos_context(recursion_limit, opt_gdef_table, gpos_table, &pos, record);
    pos.last_position()
}

fn chaincontextpos(
    recursion_limit: usize,
    opt_gdef_table: Option<&GDEFTable>,
    gpos_table: &LayoutTable<GPOS>,
    subtables: &[ChainContextLookup],
    match_type: MatchType,
    i: GlyphIndex,
    record: &mut StringRecord,
) -> Option<GlyphIndex> {
    let glyph = record.glyph(i);
    let pos = subtables.iter().find_map(|chain_context_lookup| {
        chain_context_lookup_info(chain_context_lookup, glyph, |context| {
            context.matches(opt_gdef_table, match_type, record, i)
        })
    })?;
    apply_pos_context(recursion_limit, opt_gdef_table, gpos_table, &pos, record);
    pos.last_position()
}

fn apply_pos_context(
    recursion_limit: usize,
    opt_gdef_table: Option<&GDEFTable>,
    gpos_table: &LayoutTable<GPOS>,
    pos: &ContextLookupHelper<'_>,
    record: &mut StringRecord,
) {
    if recursion_limit == 0 {
        debug!("nested positioning lookup recursion limit reached");
        return;
    }
    for &(pos_index, pos_lookup_index) in pos.lookup_array {
        let Some(&index) = pos.positions.get(usize::from(pos_index)) else {
            continue;
        };
        if let Some(lookup) = gpos_table.lookup(pos_lookup_index) {
            gpos_apply_lookup_at(
                recursion_limit - 1,
                opt_gdef_table,
                gpos_table,
                lookup,
                index,
                record,
            );
        }
    }
}
