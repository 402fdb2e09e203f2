//! Utilities for performing contextual lookup in gpos and gsub.

use crate::gdef;
use crate::layout::{
    ChainContextLookup, ClassDef, ContextLookup, Coverage, GDEFTable, Lookup,
    SequenceLookupRecord,
};
use crate::string_record::{GlyphIndex, StringRecord};

/// Nested contextual lookups deeper than this are not applied.
pub const MAX_CONTEXT_RECURSION: usize = 6;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct LookupFlag(pub u16);

impl LookupFlag {
    pub const RIGHT_TO_LEFT: u16 = 0x0001;
    pub const IGNORE_BASE_GLYPHS: u16 = 0x0002;
    pub const IGNORE_LIGATURES: u16 = 0x0004;
    pub const IGNORE_MARKS: u16 = 0x0008;
    pub const USE_MARK_FILTERING_SET: u16 = 0x0010;
    pub const MARK_ATTACHMENT_TYPE: u16 = 0xFF00;

    pub fn get_rtl(self) -> bool {
        (self.0 & Self::RIGHT_TO_LEFT) != 0
    }

    pub fn get_ignore_bases(self) -> bool {
        (self.0 & Self::IGNORE_BASE_GLYPHS) != 0
    }

    pub fn get_ignore_ligatures(self) -> bool {
        (self.0 & Self::IGNORE_LIGATURES) != 0
    }

    pub fn get_ignore_marks(self) -> bool {
        (self.0 & Self::IGNORE_MARKS) != 0
    }

    pub fn get_use_mark_filtering_set(self) -> bool {
        (self.0 & Self::USE_MARK_FILTERING_SET) != 0
    }

    /// The mark attachment class marks must have to be considered, 0 for any.
    pub fn get_mark_attachment_type(self) -> u16 {
        (self.0 & Self::MARK_ATTACHMENT_TYPE) >> 8
    }
}

/// Which glyphs a lookup skips over, from its lookup flag and mark filtering set.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MatchType {
    pub lookup_flag: LookupFlag,
    pub mark_filtering_set: Option<u16>,
}

impl MatchType {
    pub fn from_lookup_flag(lookup_flag: LookupFlag, mark_filtering_set: Option<u16>) -> MatchType {
        MatchType {
            lookup_flag,
            mark_filtering_set: mark_filtering_set
                .filter(|_| lookup_flag.get_use_mark_filtering_set()),
        }
    }

    pub fn from_lookup<L>(lookup: &Lookup<L>) -> MatchType {
        MatchType::from_lookup_flag(lookup.lookup_flag, lookup.mark_filtering_set)
    }

    pub fn match_glyph(
        self,
        opt_gdef_table: Option<&GDEFTable>,
        record: &mut StringRecord,
        index: GlyphIndex,
    ) -> bool {
        !gdef::is_ignored_glyph(opt_gdef_table, record, index, self)
    }

    // searches forwards from the glyph after index
    pub fn find_next(
        self,
        opt_gdef_table: Option<&GDEFTable>,
        record: &mut StringRecord,
        index: GlyphIndex,
    ) -> Option<GlyphIndex> {
        gdef::next_valid_glyph(opt_gdef_table, record, index, self)
    }

    // searches backwards from the glyph before index
    pub fn find_prev(
        self,
        opt_gdef_table: Option<&GDEFTable>,
        record: &mut StringRecord,
        index: GlyphIndex,
    ) -> Option<GlyphIndex> {
        gdef::prev_valid_glyph(opt_gdef_table, record, index, self)
    }

    // Matches glyph_table against the glyphs before index, nearest first.
    fn match_back(
        self,
        opt_gdef_table: Option<&GDEFTable>,
        glyph_table: &GlyphTable<'_>,
        record: &mut StringRecord,
        mut index: GlyphIndex,
    ) -> bool {
        for i in 0..glyph_table.len() {
            match self.find_prev(opt_gdef_table, record, index) {
                Some(prev_index) => {
                    index = prev_index;
                    if !glyph_table.check(i, record.glyph(index)) {
                        return false;
                    }
                }
                None => return false,
            }
        }
        true
    }

    // Matches glyph_table against the glyphs after index, collecting their positions.
    fn match_front(
        self,
        opt_gdef_table: Option<&GDEFTable>,
        glyph_table: &GlyphTable<'_>,
        record: &mut StringRecord,
        mut index: GlyphIndex,
        positions: &mut Vec<GlyphIndex>,
    ) -> bool {
        for i in 0..glyph_table.len() {
            match self.find_next(opt_gdef_table, record, index) {
                Some(next_index) => {
                    index = next_index;
                    if !glyph_table.check(i, record.glyph(index)) {
                        return false;
                    }
                    positions.push(index);
                }
                None => return false,
            }
        }
        true
    }
}

pub enum GlyphTable<'a> {
    Empty,
    ById(&'a [u16]),
    ByClassDef(&'a ClassDef, &'a [u16]),
    ByCoverage(&'a [Coverage]),
}

impl<'a> GlyphTable<'a> {
    pub fn len(&self) -> usize {
        match self {
            GlyphTable::Empty => 0,
            GlyphTable::ById(arr) => arr.len(),
            GlyphTable::ByClassDef(_, arr) => arr.len(),
            GlyphTable::ByCoverage(coverages) => coverages.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check(&self, i: usize, glyph: u16) -> bool {
        match *self {
            GlyphTable::Empty => false,
            GlyphTable::ById(table) => table.get(i) == Some(&glyph),
            GlyphTable::ByClassDef(classdef, table) => {
                table.get(i) == Some(&classdef.glyph_class_value(glyph))
            }
            GlyphTable::ByCoverage(coverages) => coverages
                .get(i)
                .is_some_and(|coverage| coverage.glyph_coverage_value(glyph).is_some()),
        }
    }
}

/// The sequences a rule matches around its first input glyph. The input table excludes
/// that first glyph.
pub struct MatchContext<'a> {
    pub backtrack_table: GlyphTable<'a>,
    pub input_table: GlyphTable<'a>,
    pub lookahead_table: GlyphTable<'a>,
}

impl<'a> MatchContext<'a> {
    /// Match the rule with its first input glyph at `index`.
    ///
    /// Returns the positions of the input glyphs on success, the first glyph included.
    pub fn matches(
        &self,
        opt_gdef_table: Option<&GDEFTable>,
        match_type: MatchType,
        record: &mut StringRecord,
        index: GlyphIndex,
    ) -> Option<Vec<GlyphIndex>> {
        let mut positions = vec![index];
        if !match_type.match_front(
            opt_gdef_table,
            &self.input_table,
            record,
            index,
            &mut positions,
        ) {
            return None;
        }
        let last_input = positions[positions.len() - 1];
        let mut lookahead = Vec::new();
        let matched = match_type.match_front(
            opt_gdef_table,
            &self.lookahead_table,
            record,
            last_input,
            &mut lookahead,
        ) && match_type.match_back(opt_gdef_table, &self.backtrack_table, record, index);
        matched.then_some(positions)
    }
}

/// A matched contextual rule: where its input glyphs are and which nested lookups to apply
/// to them.
#[derive(Debug)]
pub struct ContextLookupHelper<'a> {
    pub positions: Vec<GlyphIndex>,
    pub lookup_array: &'a [SequenceLookupRecord],
}

impl<'a> ContextLookupHelper<'a> {
    pub fn new(
        positions: Vec<GlyphIndex>,
        lookup_array: &'a [SequenceLookupRecord],
    ) -> ContextLookupHelper<'a> {
        ContextLookupHelper {
            positions,
            lookup_array,
        }
    }

    /// The last input glyph of the match.
    pub fn last_position(&self) -> Option<GlyphIndex> {
        self.positions.last().copied()
    }

    /// Account for `inserted` glyphs added after `index` within its character.
    pub fn shift_after(&mut self, index: GlyphIndex, inserted: usize) {
        if inserted == 0 {
            return;
        }
        for position in self.positions.iter_mut() {
            if position.char_index == index.char_index && position.glyph_index > index.glyph_index
            {
                position.glyph_index += inserted;
            }
        }
    }
}

/// Find the first rule of `context_lookup` that `f` matches with `glyph` as its first input.
pub fn context_lookup_info<'a>(
    context_lookup: &'a ContextLookup,
    glyph: u16,
    mut f: impl FnMut(&MatchContext<'_>) -> Option<Vec<GlyphIndex>>,
) -> Option<ContextLookupHelper<'a>> {
    match context_lookup {
        ContextLookup::Format1 { coverage, rulesets } => {
            let coverage_index = coverage.glyph_coverage_value(glyph)?;
            let rules = rulesets.get(usize::from(coverage_index))?.as_ref()?;
            rules.iter().find_map(|rule| {
                let match_context = MatchContext {
                    backtrack_table: GlyphTable::Empty,
                    input_table: GlyphTable::ById(&rule.input_sequence),
                    lookahead_table: GlyphTable::Empty,
                };
                f(&match_context)
                    .map(|positions| ContextLookupHelper::new(positions, &rule.lookup_records))
            })
        }
        ContextLookup::Format2 {
            coverage,
            classdef,
            rulesets,
        } => {
            coverage.glyph_coverage_value(glyph)?;
            let class = classdef.glyph_class_value(glyph);
            let rules = rulesets.get(usize::from(class))?.as_ref()?;
            rules.iter().find_map(|rule| {
                let match_context = MatchContext {
                    backtrack_table: GlyphTable::Empty,
                    input_table: GlyphTable::ByClassDef(classdef, &rule.input_sequence),
                    lookahead_table: GlyphTable::Empty,
                };
                f(&match_context)
                    .map(|positions| ContextLookupHelper::new(positions, &rule.lookup_records))
            })
        }
        ContextLookup::Format3 {
            coverages,
            lookup_records,
        } => {
            let (first, rest) = coverages.split_first()?;
            first.glyph_coverage_value(glyph)?;
            let match_context = MatchContext {
                backtrack_table: GlyphTable::Empty,
                input_table: GlyphTable::ByCoverage(rest),
                lookahead_table: GlyphTable::Empty,
            };
            f(&match_context).map(|positions| ContextLookupHelper::new(positions, lookup_records))
        }
    }
}

/// Find the first rule of `chain_context_lookup` that `f` matches with `glyph` as its first
/// input.
pub fn chain_context_lookup_info<'a>(
    chain_context_lookup: &'a ChainContextLookup,
    glyph: u16,
    mut f: impl FnMut(&MatchContext<'_>) -> Option<Vec<GlyphIndex>>,
) -> Option<ContextLookupHelper<'a>> {
    match chain_context_lookup {
        ChainContextLookup::Format1 { coverage, rulesets } => {
            let coverage_index = coverage.glyph_coverage_value(glyph)?;
            let rules = rulesets.get(usize::from(coverage_index))?.as_ref()?;
            rules.iter().find_map(|rule| {
                let match_context = MatchContext {
                    backtrack_table: GlyphTable::ById(&rule.backtrack_sequence),
                    input_table: GlyphTable::ById(&rule.input_sequence),
                    lookahead_table: GlyphTable::ById(&rule.lookahead_sequence),
                };
                f(&match_context)
                    .map(|positions| ContextLookupHelper::new(positions, &rule.lookup_records))
            })
        }
        ChainContextLookup::Format2 {
            coverage,
            backtrack_classdef,
            input_classdef,
            lookahead_classdef,
            rulesets,
        } => {
            coverage.glyph_coverage_value(glyph)?;
            let class = input_classdef.glyph_class_value(glyph);
            let rules = rulesets.get(usize::from(class))?.as_ref()?;
            rules.iter().find_map(|rule| {
                let match_context = MatchContext {
                    backtrack_table: GlyphTable::ByClassDef(
                        backtrack_classdef,
                        &rule.backtrack_sequence,
                    ),
                    input_table: GlyphTable::ByClassDef(input_classdef, &rule.input_sequence),
                    lookahead_table: GlyphTable::ByClassDef(
                        lookahead_classdef,
                        &rule.lookahead_sequence,
                    ),
                };
                f(&match_context)
                    .map(|positions| ContextLookupHelper::new(positions, &rule.lookup_records))
            })
        }
        ChainContextLookup::Format3 {
            backtrack_coverages,
            input_coverages,
            lookahead_coverages,
            lookup_records,
        } => {
            let (first, rest) = input_coverages.split_first()?;
            first.glyph_coverage_value(glyph)?;
            let match_context = MatchContext {
                backtrack_table: GlyphTable::ByCoverage(backtrack_coverages),
                input_table: GlyphTable::ByCoverage(rest),
                lookahead_table: GlyphTable::ByCoverage(lookahead_coverages),
            };
            f(&match_context).map(|positions| ContextLookupHelper::new(positions, lookup_records))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bidi::WritingDirection;
    use crate::layout::{ChainedSequenceRule, ClassRangeRecord, SequenceRule};

    fn make_record(glyphs: &[u16]) -> StringRecord {
        let text = "x".repeat(glyphs.len());
        let mut glyphs = glyphs.iter().copied();
        StringRecord::new(&text, WritingDirection::Ltr, |_| glyphs.next().unwrap_or(0))
    }

    fn coverage(glyphs: &[u16]) -> Coverage {
        Coverage::Format1 {
            glyph_array: glyphs.to_vec(),
        }
    }

    fn at(char_index: usize) -> GlyphIndex {
        GlyphIndex::new(char_index, 0)
    }

    fn no_skip() -> MatchType {
        MatchType::from_lookup_flag(LookupFlag(0), None)
    }

    #[test]
    fn lookup_flag_bits() {
        let flag = LookupFlag(0x0319);
        assert!(flag.get_rtl());
        assert!(flag.get_ignore_marks());
        assert!(flag.get_use_mark_filtering_set());
        assert!(!flag.get_ignore_bases());
        assert!(!flag.get_ignore_ligatures());
        assert_eq!(flag.get_mark_attachment_type(), 3);
    }

    #[test]
    fn mark_filtering_set_requires_flag() {
        let match_type = MatchType::from_lookup_flag(LookupFlag(0), Some(2));
        assert_eq!(match_type.mark_filtering_set, None);
        let match_type =
            MatchType::from_lookup_flag(LookupFlag(LookupFlag::USE_MARK_FILTERING_SET), Some(2));
        assert_eq!(match_type.mark_filtering_set, Some(2));
    }

    #[test]
    fn format1_rule_matches_sequence() {
        let lookup = ContextLookup::Format1 {
            coverage: coverage(&[10]),
            rulesets: vec![Some(vec![SequenceRule {
                input_sequence: vec![11, 12],
                lookup_records: vec![(1, 7)],
            }])],
        };
        let mut record = make_record(&[10, 11, 12]);
        let helper = context_lookup_info(&lookup, 10, |context| {
            context.matches(None, no_skip(), &mut record, at(0))
        })
        .unwrap();
        assert_eq!(helper.positions, vec![at(0), at(1), at(2)]);
        assert_eq!(helper.lookup_array, &[(1, 7)]);

        let mut record = make_record(&[10, 11, 13]);
        assert!(context_lookup_info(&lookup, 10, |context| {
            context.matches(None, no_skip(), &mut record, at(0))
        })
        .is_none());
    }

    #[test]
    fn format2_matches_classes() {
        let classdef = ClassDef::Format2 {
            class_range_array: vec![ClassRangeRecord {
                start_glyph: 20,
                end_glyph: 29,
                class_value: 1,
            }],
        };
        let lookup = ContextLookup::Format2 {
            coverage: coverage(&[5]),
            classdef,
            rulesets: vec![
                Some(vec![SequenceRule {
                    input_sequence: vec![1],
                    lookup_records: vec![],
                }]),
                None,
            ],
        };
        let mut record = make_record(&[5, 27]);
        let helper = context_lookup_info(&lookup, 5, |context| {
            context.matches(None, no_skip(), &mut record, at(0))
        });
        assert!(helper.is_some());
    }

    #[test]
    fn chain_format3_checks_both_sides() {
        let lookup = ChainContextLookup::Format3 {
            backtrack_coverages: vec![coverage(&[1])],
            input_coverages: vec![coverage(&[2]), coverage(&[3])],
            lookahead_coverages: vec![coverage(&[4])],
            lookup_records: vec![(0, 0)],
        };
        let mut record = make_record(&[1, 2, 3, 4]);
        let helper = chain_context_lookup_info(&lookup, 2, |context| {
            context.matches(None, no_skip(), &mut record, at(1))
        })
        .unwrap();
        assert_eq!(helper.positions, vec![at(1), at(2)]);
        assert_eq!(helper.last_position(), Some(at(2)));

        // missing lookahead
        let mut record = make_record(&[1, 2, 3]);
        assert!(chain_context_lookup_info(&lookup, 2, |context| {
            context.matches(None, no_skip(), &mut record, at(1))
        })
        .is_none());

        // wrong backtrack
        let mut record = make_record(&[9, 2, 3, 4]);
        assert!(chain_context_lookup_info(&lookup, 2, |context| {
            context.matches(None, no_skip(), &mut record, at(1))
        })
        .is_none());
    }

    #[test]
    fn chain_format1_backtrack_is_nearest_first() {
        let lookup = ChainContextLookup::Format1 {
            coverage: coverage(&[3]),
            rulesets: vec![Some(vec![ChainedSequenceRule {
                backtrack_sequence: vec![2, 1],
                input_sequence: vec![],
                lookahead_sequence: vec![],
                lookup_records: vec![],
            }])],
        };
        let mut record = make_record(&[1, 2, 3]);
        assert!(chain_context_lookup_info(&lookup, 3, |context| {
            context.matches(None, no_skip(), &mut record, at(2))
        })
        .is_some());
    }

    #[test]
    fn shift_after_insertion() {
        let mut helper = ContextLookupHelper::new(
            vec![GlyphIndex::new(0, 0), GlyphIndex::new(0, 1), GlyphIndex::new(1, 0)],
            &[],
        );
        helper.shift_after(GlyphIndex::new(0, 0), 2);
        assert_eq!(
            helper.positions,
            vec![GlyphIndex::new(0, 0), GlyphIndex::new(0, 3), GlyphIndex::new(1, 0)]
        );
    }
}
