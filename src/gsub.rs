//! Glyph substitution (`gsub`) implementation.
//!
//! > The Glyph Substitution (GSUB) table provides data for substition of glyphs for appropriate
//! > rendering of scripts, such as cursively-connecting forms in Arabic script, or for advanced
//! > typographic effects, such as ligatures.
//!
//! — <https://docs.microsoft.com/en-us/typography/opentype/spec/gsub>

use log::debug;

use crate::context::{
    chain_context_lookup_info, context_lookup_info, ContextLookupHelper, GlyphTable,
    MatchContext, MatchType, MAX_CONTEXT_RECURSION,
};
use crate::layout::{
    AlternateSubst, ChainContextLookup, ContextLookup, GDEFTable, LayoutTable, Ligature,
    LigatureSubst, Lookup, MultipleSubst, ReverseChainSingleSubst, SingleSubst, SubstLookup, GSUB,
};
use crate::scripts::{self, arabic, ScriptType};
use crate::string_record::{GlyphIndex, StringRecord};

impl Ligature {
    /// Match the remaining components of the ligature after the glyph at `index`.
    ///
    /// Returns the positions of the matched components.
    pub fn matches(
        &self,
        match_type: MatchType,
        opt_gdef_table: Option<&GDEFTable>,
        index: GlyphIndex,
        record: &mut StringRecord,
    ) -> Option<Vec<GlyphIndex>> {
        let match_context = MatchContext {
            backtrack_table: GlyphTable::Empty,
            input_table: GlyphTable::ById(&self.component_glyphs),
            lookahead_table: GlyphTable::Empty,
        };
        match_context
            .matches(opt_gdef_table, match_type, record, index)
            .map(|mut positions| positions.split_off(1))
    }

    /// Replace the glyph at `index` with the ligature and delete the components at
    /// `positions`.
    pub fn apply(&self, index: GlyphIndex, positions: &[GlyphIndex], record: &mut StringRecord) {
        record.set_glyph(index, self.ligature_glyph);
        for &position in positions {
            record.delete_glyph(position);
        }
    }
}

/// Apply the `GSUB` features for the script of `record`'s text.
pub fn gsub_apply(
    opt_gdef_table: Option<&GDEFTable>,
    gsub_table: &LayoutTable<GSUB>,
    record: &mut StringRecord,
) {
    let Some((script_tag, langsys)) = scripts::find_langsys(gsub_table, record.chars()) else {
        return;
    };
    let script_type = ScriptType::from(script_tag);
    let (priority, opt_forms) = match script_type {
        ScriptType::Arabic => (
            arabic::GSUB_FEATURE_ORDER,
            Some(arabic::joining_forms(record.chars())),
        ),
        ScriptType::Default => (&[][..], None),
    };

    for (feature_tag, feature_table) in scripts::ordered_features(gsub_table, langsys, priority) {
        for &lookup_index in &feature_table.lookup_indices {
            let Some(lookup) = gsub_table.lookup(lookup_index) else {
                debug!("feature lookup {} is missing, skipping", lookup_index);
                continue;
            };
            match opt_forms
                .as_ref()
                .filter(|_| arabic::is_joining_feature(feature_tag))
            {
                // Joining forms are selected for the first glyph of each letter only
                Some(forms) => gsub_apply_lookup(
                    opt_gdef_table,
                    gsub_table,
                    lookup,
                    record,
                    |index: GlyphIndex| {
                        index.glyph_index == 0
                            && forms.get(index.char_index) == Some(&feature_tag)
                    },
                ),
                None => gsub_apply_lookup(opt_gdef_table, gsub_table, lookup, record, |_| true),
            }
        }
    }
}

/// Apply `lookup` at every glyph of `record` it does not ignore and `pred` accepts.
pub fn gsub_apply_lookup(
    opt_gdef_table: Option<&GDEFTable>,
    gsub_table: &LayoutTable<GSUB>,
    lookup: &Lookup<SubstLookup>,
    record: &mut StringRecord,
    pred: impl Fn(GlyphIndex) -> bool,
) {
    let match_type = MatchType::from_lookup(lookup);

    if let SubstLookup::ReverseChainSingleSubst(ref subtables) = lookup.subtables {
        let mut cursor = record.last_index();
        while let Some(index) = cursor {
            if match_type.match_glyph(opt_gdef_table, record, index) && pred(index) {
                reversechainsubst(opt_gdef_table, subtables, match_type, index, record);
            }
            cursor = record.prev_index(index);
        }
        return;
    }

    let mut cursor = record.first_index();
    while let Some(index) = cursor {
        let mut last = index;
        if match_type.match_glyph(opt_gdef_table, record, index) && pred(index) {
            if let Some(last_index) = gsub_apply_lookup_at(
                MAX_CONTEXT_RECURSION,
                opt_gdef_table,
                gsub_table,
                lookup,
                match_type,
                index,
                record,
            ) {
                last = last_index;
            }
        }
        cursor = record.next_index(last);
    }
}

// Apply a lookup at one glyph, returning the last glyph it covered when it applied.
fn gsub_apply_lookup_at(
    recursion_limit: usize,
    opt_gdef_table: Option<&GDEFTable>,
    gsub_table: &LayoutTable<GSUB>,
    lookup: &Lookup<SubstLookup>,
    match_type: MatchType,
    index: GlyphIndex,
    record: &mut StringRecord,
) -> Option<GlyphIndex> {
    match lookup.subtables {
        SubstLookup::SingleSubst(ref subtables) => singlesubst(subtables, index, record),
        SubstLookup::MultipleSubst(ref subtables) => multiplesubst(subtables, index, record),
        SubstLookup::AlternateSubst(ref subtables) => alternatesubst(subtables, index, record),
        SubstLookup::LigatureSubst(ref subtables) => {
            ligaturesubst(opt_gdef_table, subtables, match_type, index, record)
        }
        SubstLookup::ContextSubst(ref subtables) => contextsubst(
            recursion_limit,
            opt_gdef_table,
            gsub_table,
            subtables,
            match_type,
            index,
            record,
        ),
        SubstLookup::ChainContextSubst(ref subtables) => chaincontextsubst(
            recursion_limit,
            opt_gdef_table,
            gsub_table,
            subtables,
            match_type,
            index,
            record,
        ),
        SubstLookup::ReverseChainSingleSubst(ref subtables) => {
            reversechainsubst(opt_gdef_table, subtables, match_type, index, record)
        }
    }
}

fn singlesubst_would_apply(subtables: &[SingleSubst], glyph: u16) -> Option<u16> {
    subtables
        .iter()
        .find_map(|single_subst| single_subst.apply_glyph(glyph))
}

fn singlesubst(
    subtables: &[SingleSubst],
    index: GlyphIndex,
    record: &mut StringRecord,
) -> Option<GlyphIndex> {
    let output_glyph = singlesubst_would_apply(subtables, record.glyph(index))?;
    record.set_glyph(index, output_glyph);
    Some(index)
}

fn multiplesubst(
    subtables: &[MultipleSubst],
    index: GlyphIndex,
    record: &mut StringRecord,
) -> Option<GlyphIndex> {
    let glyph = record.glyph(index);
    let sequence_table = subtables
        .iter()
        .find_map(|multiple_subst| multiple_subst.apply_glyph(glyph))?;
    // an empty sequence is forbidden, but implementations all treat it as a deletion
    let count = record.replace_glyph(index, &sequence_table.substitute_glyphs);
    Some(GlyphIndex::new(
        index.char_index,
        index.glyph_index + count.saturating_sub(1),
    ))
}

fn alternatesubst(
    subtables: &[AlternateSubst],
    index: GlyphIndex,
    record: &mut StringRecord,
) -> Option<GlyphIndex> {
    let glyph = record.glyph(index);
    let alternate_set = subtables
        .iter()
        .find_map(|alternate_subst| alternate_subst.apply_glyph(glyph))?;
    // No way to pick an alternate is exposed, so the first one is used
    let &alternate = alternate_set.alternate_glyphs.first()?;
    record.set_glyph(index, alternate);
    Some(index)
}

fn ligaturesubst_would_apply<'a>(
    opt_gdef_table: Option<&GDEFTable>,
    subtables: &'a [LigatureSubst],
    match_type: MatchType,
    index: GlyphIndex,
    record: &mut StringRecord,
) -> Option<(&'a Ligature, Vec<GlyphIndex>)> {
    let glyph = record.glyph(index);
    for ligature_subst in subtables {
        if let Some(ligature_set) = ligature_subst.apply_glyph(glyph) {
            for ligature in &ligature_set.ligatures {
                if let Some(positions) = ligature.matches(match_type, opt_gdef_table, index, record)
                {
                    return Some((ligature, positions));
                }
            }
        }
    }
    None
}

fn ligaturesubst(
    opt_gdef_table: Option<&GDEFTable>,
    subtables: &[LigatureSubst],
    match_type: MatchType,
    index: GlyphIndex,
    record: &mut StringRecord,
) -> Option<GlyphIndex> {
    let (ligature, positions) =
        ligaturesubst_would_apply(opt_gdef_table, subtables, match_type, index, record)?;
    ligature.apply(index, &positions, record);
    Some(index)
}

fn contextsubst(
    recursion_limit: usize,
    opt_gdef_table: Option<&GDEFTable>,
    gsub_table: &LayoutTable<GSUB>,
    subtables: &[ContextLookup],
    match_type: MatchType,
    index: GlyphIndex,
    record: &mut StringRecord,
) -> Option<GlyphIndex> {
    let glyph = record.glyph(index);
    let helper = subtables.iter().find_map(|context_lookup| {
        context_lookup_info(context_lookup, glyph, |context| {
            context.matches(opt_gdef_table, match_type, record, index)
        })
    })?;
    apply_subst_context(recursion_limit, opt_gdef_table, gsub_table, helper, record)
}

fn chaincontextsubst(
    recursion_limit: usize,
    opt_gdef_table: Option<&GDEFTable>,
    gsub_table: &LayoutTable<GSUB>,
    subtables: &[ChainContextLookup],
    match_type: MatchType,
    index: GlyphIndex,
    record: &mut StringRecord,
) -> Option<GlyphIndex> {
    let glyph = record.glyph(index);
    let helper = subtables.iter().find_map(|chain_context_lookup| {
        chain_context_lookup_info(chain_context_lookup, glyph, |context| {
            context.matches(opt_gdef_table, match_type, record, index)
        })
    })?;
    apply_subst_context(recursion_limit, opt_gdef_table, gsub_table, helper, record)
}

// Apply the nested lookups of a matched rule, returning the last input glyph.
fn apply_subst_context(
    recursion_limit: usize,
    opt_gdef_table: Option<&GDEFTable>,
    gsub_table: &LayoutTable<GSUB>,
    mut helper: ContextLookupHelper<'_>,
    record: &mut StringRecord,
) -> Option<GlyphIndex> {
    if recursion_limit == 0 {
        debug!("nested substitution lookup recursion limit reached");
    } else {
        for &(sequence_index, lookup_index) in helper.lookup_array {
            let Some(&position) = helper.positions.get(usize::from(sequence_index)) else {
                continue;
            };
            let Some(lookup) = gsub_table.lookup(lookup_index) else {
                continue;
            };
            let glyph_count = record.glyphs(position.char_index).len();
            gsub_apply_lookup_at(
                recursion_limit - 1,
                opt_gdef_table,
                gsub_table,
                lookup,
                MatchType::from_lookup(lookup),
                position,
                record,
            );
            let inserted = record
                .glyphs(position.char_index)
                .len()
                .saturating_sub(glyph_count);
            helper.shift_after(position, inserted);
        }
    }
    helper.last_position()
}

fn reversechainsubst(
    opt_gdef_table: Option<&GDEFTable>,
    subtables: &[ReverseChainSingleSubst],
    match_type: MatchType,
    index: GlyphIndex,
    record: &mut StringRecord,
) -> Option<GlyphIndex> {
    let glyph = record.glyph(index);
    for subtable in subtables {
        let ReverseChainSingleSubst::Format1 {
            coverage,
            backtrack_coverages,
            lookahead_coverages,
            substitute_glyphs,
        } = subtable;
        let Some(coverage_index) = coverage.glyph_coverage_value(glyph) else {
            continue;
        };
        let match_context = MatchContext {
            backtrack_table: GlyphTable::ByCoverage(backtrack_coverages),
            input_table: GlyphTable::Empty,
            lookahead_table: GlyphTable::ByCoverage(lookahead_coverages),
        };
        if match_context
            .matches(opt_gdef_table, match_type, record, index)
            .is_some()
        {
            let &output_glyph = substitute_glyphs.get(usize::from(coverage_index))?;
            record.set_glyph(index, output_glyph);
            return Some(index);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bidi::WritingDirection;
    use crate::binary::read::ReadScope;
    use crate::context::LookupFlag;
    use crate::gdef::GLYPH_CLASS_MARK;
    use crate::tag;
    use crate::tests::{gdef_table, layout_table};

    fn make_record(glyphs: &[u16]) -> StringRecord {
        let text = "x".repeat(glyphs.len());
        let mut glyphs = glyphs.iter().copied();
        StringRecord::new(&text, WritingDirection::Ltr, |_| glyphs.next().unwrap_or(0))
    }

    fn glyph_ids(record: &StringRecord) -> Vec<u16> {
        record.iter().map(|(_, glyph)| glyph.glyph).collect()
    }

    // A GSUB table with no features and the given lookups.
    fn gsub_with_lookups(lookups: &[(u16, Vec<u16>)]) -> LayoutTable<GSUB> {
        let data = layout_table(tag::LATN, &[], lookups);
        ReadScope::new(&data).read::<LayoutTable<GSUB>>().unwrap()
    }

    fn apply_all(gsub: &LayoutTable<GSUB>, lookup_index: u16, record: &mut StringRecord) {
        let lookup = gsub.lookup(lookup_index).unwrap();
        gsub_apply_lookup(None, gsub, lookup, record, |_| true);
    }

    #[test]
    fn single_subst_delta() {
        // format 1, coverage at 6, delta 10; coverage glyph 5
        let gsub = gsub_with_lookups(&[(1, vec![1, 6, 10, 1, 1, 5])]);
        let mut record = make_record(&[5, 6, 5]);
        apply_all(&gsub, 0, &mut record);
        assert_eq!(glyph_ids(&record), vec![15, 6, 15]);
    }

    #[test]
    fn multiple_subst_grows_character() {
        // format 1, coverage at 8, 1 sequence at 14; coverage glyph 5; sequence [7, 8]
        let gsub = gsub_with_lookups(&[(2, vec![1, 8, 1, 14, 1, 1, 5, 2, 7, 8])]);
        let mut record = make_record(&[5, 6]);
        apply_all(&gsub, 0, &mut record);
        assert_eq!(glyph_ids(&record), vec![7, 8, 6]);
        assert_eq!(record.glyphs(0).len(), 2);
        assert_eq!(record.glyph_count(), 3);
    }

    #[test]
    fn alternate_subst_picks_first() {
        // format 1, coverage at 8, 1 set at 14; coverage glyph 5; alternates [20, 21]
        let gsub = gsub_with_lookups(&[(3, vec![1, 8, 1, 14, 1, 1, 5, 2, 20, 21])]);
        let mut record = make_record(&[5]);
        apply_all(&gsub, 0, &mut record);
        assert_eq!(glyph_ids(&record), vec![20]);
    }

    #[test]
    fn ligature_subst_deletes_components() {
        // format 1, coverage at 8, 1 set at 14; coverage glyph 1;
        // ligature set: 1 ligature at 4; ligature 9 of 3 components [1] 2 3
        let gsub = gsub_with_lookups(&[(
            4,
            vec![1, 8, 1, 14, 1, 1, 1, 1, 4, 9, 3, 2, 3],
        )]);
        let mut record = make_record(&[1, 2, 3, 4]);
        apply_all(&gsub, 0, &mut record);
        assert_eq!(glyph_ids(&record), vec![9, 0, 0, 4]);
        assert_eq!(record.glyph_count(), 2);

        // incomplete sequence
        let mut record = make_record(&[1, 2, 4]);
        apply_all(&gsub, 0, &mut record);
        assert_eq!(glyph_ids(&record), vec![1, 2, 4]);
    }

    #[test]
    fn chain_context_applies_nested_lookup() {
        let gsub = gsub_with_lookups(&[
            // lookup 0: single subst format 1, delta 100 on glyph 2
            (1, vec![1, 6, 100, 1, 1, 2]),
            // lookup 1: chain context format 3, backtrack [1], input [2], lookahead [3],
            // applying lookup 0 at input 0
            (
                6,
                vec![
                    3, // format
                    1, 20, // backtrack count, coverage offset
                    1, 26, // input count, coverage offset
                    1, 32, // lookahead count, coverage offset
                    1, 0, 0, // lookup record count, sequence index, lookup index
                    1, 1, 1, // coverage at 20: glyph 1
                    1, 1, 2, // coverage at 26: glyph 2
                    1, 1, 3, // coverage at 32: glyph 3
                ],
            ),
        ]);
        let mut record = make_record(&[1, 2, 3, 2]);
        apply_all(&gsub, 1, &mut record);
        assert_eq!(glyph_ids(&record), vec![1, 102, 3, 2]);
    }

    #[test]
    fn reverse_chain_walks_backwards() {
        // format 1, coverage at 14, no backtrack, 1 lookahead at 20, 1 substitute
        let gsub = gsub_with_lookups(&[(
            8,
            vec![1, 14, 0, 1, 20, 1, 50, 1, 1, 5, 1, 2, 5, 6],
        )]);
        // A 5 followed by 5 or 6 becomes 50. The lookahead of the first glyph sees the
        // already substituted second glyph.
        let mut record = make_record(&[5, 5, 6]);
        apply_all(&gsub, 0, &mut record);
        assert_eq!(glyph_ids(&record), vec![5, 50, 6]);

        let mut record = make_record(&[5, 5]);
        apply_all(&gsub, 0, &mut record);
        assert_eq!(glyph_ids(&record), vec![50, 5]);
    }

    #[test]
    fn pred_restricts_application() {
        let gsub = gsub_with_lookups(&[(1, vec![1, 6, 10, 1, 1, 5])]);
        let lookup = gsub.lookup(0).unwrap();
        let mut record = make_record(&[5, 5]);
        gsub_apply_lookup(None, &gsub, lookup, &mut record, |index| index.char_index == 1);
        assert_eq!(glyph_ids(&record), vec![5, 15]);
    }

    #[test]
    fn ligature_skips_marks_when_flagged() {
        // same ligature as above, with the lookup flag set to ignore marks
        let mut data = layout_table(
            tag::LATN,
            &[],
            &[(4, vec![1, 8, 1, 14, 1, 1, 1, 1, 4, 9, 3, 2, 3])],
        );
        let read_u16 =
            |data: &[u8], at: usize| usize::from(u16::from_be_bytes([data[at], data[at + 1]]));
        let lookup_list = read_u16(&data, 8);
        let lookup = lookup_list + read_u16(&data, lookup_list + 2);
        data[lookup + 3] = LookupFlag::IGNORE_MARKS as u8;
        let gsub = ReadScope::new(&data).read::<LayoutTable<GSUB>>().unwrap();
        let gdef_data = gdef_table(&[(7, GLYPH_CLASS_MARK)]);
        let gdef = ReadScope::new(&gdef_data).read::<GDEFTable>().unwrap();

        let mut record = make_record(&[1, 7, 2, 3]);
        let lookup = gsub.lookup(0).unwrap();
        gsub_apply_lookup(Some(&gdef), &gsub, lookup, &mut record, |_| true);
        assert_eq!(glyph_ids(&record), vec![9, 7, 0, 0]);
    }

    #[test]
    fn features_apply_in_order() {
        // liga: 1 2 -> 9, then ccmp: 1 -> 5. Outside Arabic, features run in the order the
        // language system lists them.
        let data = layout_table(
            tag::LATN,
            &[(tag::LIGA, vec![0]), (tag::CCMP, vec![1])],
            &[
                (4, vec![1, 8, 1, 14, 1, 1, 1, 1, 4, 9, 2, 2]),
                (1, vec![1, 6, 4, 1, 1, 1]),
            ],
        );
        let gsub = ReadScope::new(&data).read::<LayoutTable<GSUB>>().unwrap();
        let mut record = make_record(&[1, 2, 1]);
        gsub_apply(None, &gsub, &mut record);
        assert_eq!(glyph_ids(&record), vec![9, 0, 5]);
    }
}
