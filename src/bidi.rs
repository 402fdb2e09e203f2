//! The Unicode Bidirectional Algorithm
//!
//! Resolves embedding levels for a paragraph following
//! [UAX #9](https://www.unicode.org/reports/tr9/) rules X1 to X10, W1 to W7, N0 to N2 and
//! I1 to I2, and reorders individual lines for display following rules L1 and L2.
//! Character classification comes from the `unicode-bidi` crate's data tables.

use std::ops::Range;

pub use unicode_bidi::BidiClass;
use unicode_bidi::BidiClass::*;

/// Deepest explicit embedding level (BD2).
pub const MAX_DEPTH: u8 = 125;

/// Bracket pairs are only tracked this deep (BD16).
const MAX_BRACKET_DEPTH: usize = 63;

/// Base direction of a paragraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritingDirection {
    /// Taken from the first strong character, left-to-right if there is none
    #[default]
    Auto,
    Rtl,
    Ltr,
}

/// Resolved bidi state of a paragraph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BidiParagraph {
    pub base_level: u8,
    /// The original class of each character
    pub classes: Vec<BidiClass>,
    /// The resolved embedding level of each character
    pub levels: Vec<u8>,
}

/// Look up the bidi class of `ch`.
pub fn bidi_class(ch: char) -> BidiClass {
    unicode_bidi::bidi_class(ch)
}

impl BidiParagraph {
    pub fn new(chars: &[char], direction: WritingDirection) -> BidiParagraph {
        let classes = chars.iter().map(|&ch| bidi_class(ch)).collect::<Vec<_>>();
        let (matching_pdi, matched_pdi) = match_isolates(&classes);

        // P2, P3
        let base_level = match direction {
            WritingDirection::Ltr => 0,
            WritingDirection::Rtl => 1,
            WritingDirection::Auto => {
                first_strong_level(&classes, &matching_pdi, 0..classes.len()).unwrap_or(0)
            }
        };

        let mut types = classes.clone();
        let mut levels = explicit_levels(&classes, base_level, &matching_pdi, &mut types);

        for sequence in isolating_run_sequences(&classes, &levels, &matching_pdi, &matched_pdi) {
            let (sos, eos) = sequence_boundaries(&sequence, &classes, &levels, base_level);
            let level = levels[sequence[0]];
            resolve_weak(&sequence, &mut types, sos);
            resolve_brackets(&sequence, chars, &classes, &mut types, sos, level);
            resolve_neutral(&sequence, &mut types, sos, eos, level);
            resolve_implicit(&sequence, &types, &mut levels);
        }

        // Characters removed by X9 take the level of the preceding character so that they
        // travel with it when reordered.
        let mut previous = base_level;
        for (level, &class) in levels.iter_mut().zip(&classes) {
            if is_removed_by_x9(class) {
                *level = previous;
            } else {
                previous = *level;
            }
        }

        BidiParagraph {
            base_level,
            classes,
            levels,
        }
    }

    pub fn is_rtl(&self) -> bool {
        self.base_level & 1 == 1
    }

    /// Visual order of the characters in `line`, see [`reorder_line`].
    pub fn reorder_line(&self, line: Range<usize>) -> Vec<(usize, u8)> {
        reorder_line(&self.classes, &self.levels, self.base_level, line)
    }
}

/// Reorder the characters of one line for display.
///
/// Returns `(index, level)` pairs in visual left-to-right order, where `level` is the
/// embedding level after trailing whitespace has been reset to the paragraph level.
pub fn reorder_line(
    classes: &[BidiClass],
    levels: &[u8],
    base_level: u8,
    line: Range<usize>,
) -> Vec<(usize, u8)> {
    let end = line.end.min(levels.len()).min(classes.len());
    let start = line.start.min(end);

    // L1
    let mut items = (start..end)
        .map(|index| (index, levels[index]))
        .collect::<Vec<_>>();
    let mut trailing = true;
    for (index, level) in items.iter_mut().rev() {
        let class = classes[*index];
        if matches!(class, S | B) {
            *level = base_level;
            trailing = true;
        } else if trailing
            && (matches!(class, WS | FSI | LRI | RLI | PDI) || is_removed_by_x9(class))
        {
            *level = base_level;
        } else {
            trailing = false;
        }
    }

    // L2
    let highest = items.iter().map(|&(_, level)| level).max().unwrap_or(0);
    let lowest_odd = items
        .iter()
        .map(|&(_, level)| level)
        .min()
        .map_or(1, |lowest| lowest | 1);
    for level in (lowest_odd..=highest).rev() {
        let mut i = 0;
        while i < items.len() {
            if items[i].1 >= level {
                let run_start = i;
                while i < items.len() && items[i].1 >= level {
                    i += 1;
                }
                items[run_start..i].reverse();
            } else {
                i += 1;
            }
        }
    }
    items
}

/// Characters in `line` at odd levels that display as their mirror image.
pub fn mirrored_chars(chars: &[char], levels: &[u8], line: Range<usize>) -> Vec<(usize, char)> {
    line.filter(|&index| levels.get(index).is_some_and(|level| level & 1 == 1))
        .filter_map(|index| {
            chars
                .get(index)
                .and_then(|&ch| bidi_mirror(ch))
                .map(|mirrored| (index, mirrored))
        })
        .collect()
}

/// The mirrored counterpart of `ch`, if it has one.
pub fn bidi_mirror(ch: char) -> Option<char> {
    MIRROR_PAIRS.iter().find_map(|&(left, right)| {
        if ch == left {
            Some(right)
        } else if ch == right {
            Some(left)
        } else {
            None
        }
    })
}

fn is_removed_by_x9(class: BidiClass) -> bool {
    matches!(class, RLE | LRE | RLO | LRO | PDF | BN)
}

fn is_isolate_initiator(class: BidiClass) -> bool {
    matches!(class, LRI | RLI | FSI)
}

fn is_neutral_or_isolate(class: BidiClass) -> bool {
    matches!(class, B | S | WS | ON | FSI | LRI | RLI | PDI)
}

/// Direction of a resolved type for N0 and N1, where numbers count as R.
fn strong_direction(class: BidiClass) -> Option<BidiClass> {
    match class {
        L => Some(L),
        R | AL | EN | AN => Some(R),
        _ => None,
    }
}

fn direction_of_level(level: u8) -> BidiClass {
    if level & 1 == 1 {
        R
    } else {
        L
    }
}

fn next_level(level: u8, rtl: bool) -> u8 {
    if rtl {
        (level + 1) | 1
    } else {
        (level + 2) & !1
    }
}

// BD9
fn match_isolates(classes: &[BidiClass]) -> (Vec<Option<usize>>, Vec<bool>) {
    let mut matching_pdi = vec![None; classes.len()];
    let mut matched_pdi = vec![false; classes.len()];
    let mut open = Vec::new();
    for (i, &class) in classes.iter().enumerate() {
        match class {
            LRI | RLI | FSI => open.push(i),
            PDI => {
                if let Some(initiator) = open.pop() {
                    matching_pdi[initiator] = Some(i);
                    matched_pdi[i] = true;
                }
            }
            B => open.clear(),
            _ => {}
        }
    }
    (matching_pdi, matched_pdi)
}

// P2, P3: skips over isolates, stops at a paragraph separator.
fn first_strong_level(
    classes: &[BidiClass],
    matching_pdi: &[Option<usize>],
    range: Range<usize>,
) -> Option<u8> {
    let mut i = range.start;
    while i < range.end {
        match classes[i] {
            L => return Some(0),
            R | AL => return Some(1),
            LRI | RLI | FSI => match matching_pdi[i] {
                Some(pdi) => i = pdi,
                None => return None,
            },
            B => return None,
            _ => {}
        }
        i += 1;
    }
    None
}

#[derive(Clone, Copy)]
struct DirectionalStatus {
    level: u8,
    override_class: Option<BidiClass>,
    isolate: bool,
}

// X1 to X8
fn explicit_levels(
    classes: &[BidiClass],
    base_level: u8,
    matching_pdi: &[Option<usize>],
    types: &mut [BidiClass],
) -> Vec<u8> {
    let mut levels = vec![base_level; classes.len()];
    let mut stack = vec![DirectionalStatus {
        level: base_level,
        override_class: None,
        isolate: false,
    }];
    let mut overflow_isolates = 0usize;
    let mut overflow_embeddings = 0usize;
    let mut valid_isolates = 0usize;

    for i in 0..classes.len() {
        let current = stack[stack.len() - 1];
        match classes[i] {
            RLE | LRE | RLO | LRO => {
                levels[i] = current.level;
                let new_level = next_level(current.level, matches!(classes[i], RLE | RLO));
                if new_level <= MAX_DEPTH && overflow_isolates == 0 && overflow_embeddings == 0 {
                    let override_class = match classes[i] {
                        RLO => Some(R),
                        LRO => Some(L),
                        _ => None,
                    };
                    stack.push(DirectionalStatus {
                        level: new_level,
                        override_class,
                        isolate: false,
                    });
                } else if overflow_isolates == 0 {
                    overflow_embeddings += 1;
                }
            }
            RLI | LRI | FSI => {
                levels[i] = current.level;
                if let Some(class) = current.override_class {
                    types[i] = class;
                }
                let rtl = match classes[i] {
                    RLI => true,
                    LRI => false,
                    _ => {
                        let end = matching_pdi[i].unwrap_or(classes.len());
                        first_strong_level(classes, matching_pdi, (i + 1)..end) == Some(1)
                    }
                };
                let new_level = next_level(current.level, rtl);
                if new_level <= MAX_DEPTH && overflow_isolates == 0 && overflow_embeddings == 0 {
                    valid_isolates += 1;
                    stack.push(DirectionalStatus {
                        level: new_level,
                        override_class: None,
                        isolate: true,
                    });
                } else {
                    overflow_isolates += 1;
                }
            }
            PDI => {
                if overflow_isolates > 0 {
                    overflow_isolates -= 1;
                } else if valid_isolates > 0 {
                    overflow_embeddings = 0;
                    while stack.last().is_some_and(|status| !status.isolate) {
                        stack.pop();
                    }
                    stack.pop();
                    valid_isolates -= 1;
                }
                let current = stack.last().copied().unwrap_or(current);
                levels[i] = current.level;
                if let Some(class) = current.override_class {
                    types[i] = class;
                }
            }
            PDF => {
                levels[i] = current.level;
                if overflow_isolates > 0 {
                    // ignored
                } else if overflow_embeddings > 0 {
                    overflow_embeddings -= 1;
                } else if !current.isolate && stack.len() >= 2 {
                    stack.pop();
                }
            }
            B => levels[i] = base_level,
            BN => levels[i] = current.level,
            _ => {
                levels[i] = current.level;
                if let Some(class) = current.override_class {
                    types[i] = class;
                }
            }
        }
    }
    levels
}

// X9, X10: level runs of the characters that remain, chained across matched isolates.
fn isolating_run_sequences(
    classes: &[BidiClass],
    levels: &[u8],
    matching_pdi: &[Option<usize>],
    matched_pdi: &[bool],
) -> Vec<Vec<usize>> {
    let mut runs: Vec<Vec<usize>> = Vec::new();
    let mut run_starting_at = vec![None; classes.len()];
    let mut run: Vec<usize> = Vec::new();
    for i in (0..classes.len()).filter(|&i| !is_removed_by_x9(classes[i])) {
        if let Some(&last) = run.last() {
            if levels[last] != levels[i] {
                run_starting_at[run[0]] = Some(runs.len());
                runs.push(std::mem::take(&mut run));
            }
        }
        run.push(i);
    }
    if !run.is_empty() {
        run_starting_at[run[0]] = Some(runs.len());
        runs.push(run);
    }

    let continuation = runs
        .iter()
        .map(|run| {
            let last = *run.last()?;
            if !is_isolate_initiator(classes[last]) {
                return None;
            }
            let pdi = matching_pdi[last]?;
            run_starting_at[pdi].filter(|_| matched_pdi[pdi])
        })
        .collect::<Vec<_>>();
    let mut is_continuation = vec![false; runs.len()];
    for &next in continuation.iter().flatten() {
        is_continuation[next] = true;
    }

    let mut sequences = Vec::new();
    for start in 0..runs.len() {
        if is_continuation[start] {
            continue;
        }
        let mut sequence = runs[start].clone();
        let mut current = start;
        while let Some(next) = continuation[current] {
            sequence.extend_from_slice(&runs[next]);
            current = next;
        }
        sequences.push(sequence);
    }
    sequences
}

fn sequence_boundaries(
    sequence: &[usize],
    classes: &[BidiClass],
    levels: &[u8],
    base_level: u8,
) -> (BidiClass, BidiClass) {
    let first = sequence[0];
    let last = sequence[sequence.len() - 1];
    let level = levels[first];

    let preceding = (0..first)
        .rev()
        .find(|&i| !is_removed_by_x9(classes[i]))
        .map_or(base_level, |i| levels[i]);
    let following = if is_isolate_initiator(classes[last]) {
        base_level
    } else {
        ((last + 1)..classes.len())
            .find(|&i| !is_removed_by_x9(classes[i]))
            .map_or(base_level, |i| levels[i])
    };

    (
        direction_of_level(level.max(preceding)),
        direction_of_level(level.max(following)),
    )
}

// W1 to W7
fn resolve_weak(sequence: &[usize], types: &mut [BidiClass], sos: BidiClass) {
    // W1
    let mut previous = sos;
    for &i in sequence {
        if types[i] == NSM {
            types[i] = match previous {
                LRI | RLI | FSI | PDI => ON,
                class => class,
            };
        }
        previous = types[i];
    }

    // W2
    let mut last_strong = sos;
    for &i in sequence {
        match types[i] {
            R | L | AL => last_strong = types[i],
            EN if last_strong == AL => types[i] = AN,
            _ => {}
        }
    }

    // W3
    for &i in sequence {
        if types[i] == AL {
            types[i] = R;
        }
    }

    // W4
    for k in 1..sequence.len().saturating_sub(1) {
        let before = types[sequence[k - 1]];
        let after = types[sequence[k + 1]];
        match types[sequence[k]] {
            ES if before == EN && after == EN => types[sequence[k]] = EN,
            CS if before == after && matches!(before, EN | AN) => types[sequence[k]] = before,
            _ => {}
        }
    }

    // W5
    let mut k = 0;
    while k < sequence.len() {
        if types[sequence[k]] != ET {
            k += 1;
            continue;
        }
        let run_start = k;
        while k < sequence.len() && types[sequence[k]] == ET {
            k += 1;
        }
        let adjacent_number = (run_start > 0 && types[sequence[run_start - 1]] == EN)
            || (k < sequence.len() && types[sequence[k]] == EN);
        if adjacent_number {
            for &i in &sequence[run_start..k] {
                types[i] = EN;
            }
        }
    }

    // W6
    for &i in sequence {
        if matches!(types[i], ES | ET | CS) {
            types[i] = ON;
        }
    }

    // W7
    let mut last_strong = sos;
    for &i in sequence {
        match types[i] {
            L | R => last_strong = types[i],
            EN if last_strong == L => types[i] = L,
            _ => {}
        }
    }
}

// N0
fn resolve_brackets(
    sequence: &[usize],
    chars: &[char],
    classes: &[BidiClass],
    types: &mut [BidiClass],
    sos: BidiClass,
    level: u8,
) {
    // BD16
    let mut pairs = Vec::new();
    let mut open: Vec<(char, usize)> = Vec::new();
    for (k, &i) in sequence.iter().enumerate() {
        if types[i] != ON {
            continue;
        }
        match paired_bracket(chars[i]) {
            Some((closing, true)) => {
                if open.len() == MAX_BRACKET_DEPTH {
                    break;
                }
                open.push((closing, k));
            }
            Some((_, false)) => {
                let closing = canonical_bracket(chars[i]);
                if let Some(depth) = open.iter().rposition(|&(expected, _)| expected == closing) {
                    pairs.push((open[depth].1, k));
                    open.truncate(depth);
                }
            }
            None => {}
        }
    }
    pairs.sort_unstable();

    let embedding = direction_of_level(level);
    for (opening, closing) in pairs {
        let mut found_embedding = false;
        let mut found_opposite = false;
        for &i in &sequence[(opening + 1)..closing] {
            match strong_direction(types[i]) {
                Some(direction) if direction == embedding => found_embedding = true,
                Some(_) => found_opposite = true,
                None => {}
            }
        }

        let resolved = if found_embedding {
            embedding
        } else if found_opposite {
            let context = sequence[..opening]
                .iter()
                .rev()
                .find_map(|&i| strong_direction(types[i]))
                .unwrap_or(sos);
            if context != embedding {
                context
            } else {
                embedding
            }
        } else {
            continue;
        };

        for bracket in [opening, closing] {
            types[sequence[bracket]] = resolved;
            for &i in &sequence[(bracket + 1)..] {
                if classes[i] != NSM {
                    break;
                }
                types[i] = resolved;
            }
        }
    }
}

// N1, N2
fn resolve_neutral(
    sequence: &[usize],
    types: &mut [BidiClass],
    sos: BidiClass,
    eos: BidiClass,
    level: u8,
) {
    let embedding = direction_of_level(level);
    let mut k = 0;
    while k < sequence.len() {
        if !is_neutral_or_isolate(types[sequence[k]]) {
            k += 1;
            continue;
        }
        let run_start = k;
        while k < sequence.len() && is_neutral_or_isolate(types[sequence[k]]) {
            k += 1;
        }
        let before = if run_start == 0 {
            sos
        } else {
            strong_direction(types[sequence[run_start - 1]]).unwrap_or(embedding)
        };
        let after = if k == sequence.len() {
            eos
        } else {
            strong_direction(types[sequence[k]]).unwrap_or(embedding)
        };
        let resolved = if before == after { before } else { embedding };
        for &i in &sequence[run_start..k] {
            types[i] = resolved;
        }
    }
}

// I1, I2
fn resolve_implicit(sequence: &[usize], types: &[BidiClass], levels: &mut [u8]) {
    for &i in sequence {
        let level = levels[i];
        levels[i] = if level & 1 == 0 {
            match types[i] {
                R => level + 1,
                AN | EN => level + 2,
                _ => level,
            }
        } else {
            match types[i] {
                L | EN | AN => level + 1,
                _ => level,
            }
        };
    }
}

/// The paired bracket of `ch` and whether `ch` is the opening bracket.
fn paired_bracket(ch: char) -> Option<(char, bool)> {
    BRACKET_PAIRS.iter().find_map(|&(opening, closing)| {
        if ch == opening {
            Some((canonical_bracket(closing), true))
        } else if ch == closing {
            Some((canonical_bracket(opening), false))
        } else {
            None
        }
    })
}

// U+2329 and U+232A are canonically equivalent to U+3008 and U+3009.
fn canonical_bracket(ch: char) -> char {
    match ch {
        '\u{2329}' => '\u{3008}',
        '\u{232A}' => '\u{3009}',
        ch => ch,
    }
}

const BRACKET_PAIRS: &[(char, char)] = &[
    ('(', ')'),
    ('[', ']'),
    ('{', '}'),
    ('\u{0F3A}', '\u{0F3B}'),
    ('\u{0F3C}', '\u{0F3D}'),
    ('\u{169B}', '\u{169C}'),
    ('\u{2045}', '\u{2046}'),
    ('\u{207D}', '\u{207E}'),
    ('\u{208D}', '\u{208E}'),
    ('\u{2308}', '\u{2309}'),
    ('\u{230A}', '\u{230B}'),
    ('\u{2329}', '\u{232A}'),
    ('\u{2768}', '\u{2769}'),
    ('\u{276A}', '\u{276B}'),
    ('\u{276C}', '\u{276D}'),
    ('\u{276E}', '\u{276F}'),
    ('\u{2770}', '\u{2771}'),
    ('\u{2772}', '\u{2773}'),
    ('\u{2774}', '\u{2775}'),
    ('\u{27C5}', '\u{27C6}'),
    ('\u{27E6}', '\u{27E7}'),
    ('\u{27E8}', '\u{27E9}'),
    ('\u{27EA}', '\u{27EB}'),
    ('\u{27EC}', '\u{27ED}'),
    ('\u{27EE}', '\u{27EF}'),
    ('\u{2983}', '\u{2984}'),
    ('\u{2985}', '\u{2986}'),
    ('\u{2987}', '\u{2988}'),
    ('\u{2989}', '\u{298A}'),
    ('\u{298B}', '\u{298C}'),
    ('\u{2E22}', '\u{2E23}'),
    ('\u{2E24}', '\u{2E25}'),
    ('\u{2E26}', '\u{2E27}'),
    ('\u{2E28}', '\u{2E29}'),
    ('\u{3008}', '\u{3009}'),
    ('\u{300A}', '\u{300B}'),
    ('\u{300C}', '\u{300D}'),
    ('\u{300E}', '\u{300F}'),
    ('\u{3010}', '\u{3011}'),
    ('\u{3014}', '\u{3015}'),
    ('\u{3016}', '\u{3017}'),
    ('\u{3018}', '\u{3019}'),
    ('\u{301A}', '\u{301B}'),
    ('\u{FE59}', '\u{FE5A}'),
    ('\u{FE5B}', '\u{FE5C}'),
    ('\u{FE5D}', '\u{FE5E}'),
    ('\u{FF08}', '\u{FF09}'),
    ('\u{FF3B}', '\u{FF3D}'),
    ('\u{FF5B}', '\u{FF5D}'),
    ('\u{FF5F}', '\u{FF60}'),
    ('\u{FF62}', '\u{FF63}'),
];

const MIRROR_PAIRS: &[(char, char)] = &[
    ('(', ')'),
    ('<', '>'),
    ('[', ']'),
    ('{', '}'),
    ('\u{00AB}', '\u{00BB}'),
    ('\u{0F3A}', '\u{0F3B}'),
    ('\u{0F3C}', '\u{0F3D}'),
    ('\u{169B}', '\u{169C}'),
    ('\u{2039}', '\u{203A}'),
    ('\u{2045}', '\u{2046}'),
    ('\u{207D}', '\u{207E}'),
    ('\u{208D}', '\u{208E}'),
    ('\u{2208}', '\u{220B}'),
    ('\u{2209}', '\u{220C}'),
    ('\u{220A}', '\u{220D}'),
    ('\u{2215}', '\u{29F5}'),
    ('\u{223C}', '\u{223D}'),
    ('\u{2243}', '\u{22CD}'),
    ('\u{2252}', '\u{2253}'),
    ('\u{2254}', '\u{2255}'),
    ('\u{2264}', '\u{2265}'),
    ('\u{2266}', '\u{2267}'),
    ('\u{2268}', '\u{2269}'),
    ('\u{226A}', '\u{226B}'),
    ('\u{226E}', '\u{226F}'),
    ('\u{2270}', '\u{2271}'),
    ('\u{2272}', '\u{2273}'),
    ('\u{2274}', '\u{2275}'),
    ('\u{2276}', '\u{2277}'),
    ('\u{2278}', '\u{2279}'),
    ('\u{227A}', '\u{227B}'),
    ('\u{227C}', '\u{227D}'),
    ('\u{227E}', '\u{227F}'),
    ('\u{2280}', '\u{2281}'),
    ('\u{2282}', '\u{2283}'),
    ('\u{2284}', '\u{2285}'),
    ('\u{2286}', '\u{2287}'),
    ('\u{2288}', '\u{2289}'),
    ('\u{228A}', '\u{228B}'),
    ('\u{228F}', '\u{2290}'),
    ('\u{2291}', '\u{2292}'),
    ('\u{22A2}', '\u{22A3}'),
    ('\u{22B0}', '\u{22B1}'),
    ('\u{22B2}', '\u{22B3}'),
    ('\u{22B4}', '\u{22B5}'),
    ('\u{22D0}', '\u{22D1}'),
    ('\u{22D6}', '\u{22D7}'),
    ('\u{22D8}', '\u{22D9}'),
    ('\u{22DA}', '\u{22DB}'),
    ('\u{22DC}', '\u{22DD}'),
    ('\u{22DE}', '\u{22DF}'),
    ('\u{22E0}', '\u{22E1}'),
    ('\u{22E2}', '\u{22E3}'),
    ('\u{22E4}', '\u{22E5}'),
    ('\u{22E6}', '\u{22E7}'),
    ('\u{22E8}', '\u{22E9}'),
    ('\u{22EA}', '\u{22EB}'),
    ('\u{22EC}', '\u{22ED}'),
    ('\u{2308}', '\u{2309}'),
    ('\u{230A}', '\u{230B}'),
    ('\u{2329}', '\u{232A}'),
    ('\u{2768}', '\u{2769}'),
    ('\u{276A}', '\u{276B}'),
    ('\u{276C}', '\u{276D}'),
    ('\u{276E}', '\u{276F}'),
    ('\u{2770}', '\u{2771}'),
    ('\u{2772}', '\u{2773}'),
    ('\u{2774}', '\u{2775}'),
    ('\u{27C5}', '\u{27C6}'),
    ('\u{27E6}', '\u{27E7}'),
    ('\u{27E8}', '\u{27E9}'),
    ('\u{27EA}', '\u{27EB}'),
    ('\u{27EC}', '\u{27ED}'),
    ('\u{27EE}', '\u{27EF}'),
    ('\u{2983}', '\u{2984}'),
    ('\u{2985}', '\u{2986}'),
    ('\u{2987}', '\u{2988}'),
    ('\u{2989}', '\u{298A}'),
    ('\u{298B}', '\u{298C}'),
    ('\u{2E22}', '\u{2E23}'),
    ('\u{2E24}', '\u{2E25}'),
    ('\u{2E26}', '\u{2E27}'),
    ('\u{2E28}', '\u{2E29}'),
    ('\u{3008}', '\u{3009}'),
    ('\u{300A}', '\u{300B}'),
    ('\u{300C}', '\u{300D}'),
    ('\u{300E}', '\u{300F}'),
    ('\u{3010}', '\u{3011}'),
    ('\u{3014}', '\u{3015}'),
    ('\u{3016}', '\u{3017}'),
    ('\u{3018}', '\u{3019}'),
    ('\u{301A}', '\u{301B}'),
    ('\u{FE59}', '\u{FE5A}'),
    ('\u{FE5B}', '\u{FE5C}'),
    ('\u{FE5D}', '\u{FE5E}'),
    ('\u{FF08}', '\u{FF09}'),
    ('\u{FF1C}', '\u{FF1E}'),
    ('\u{FF3B}', '\u{FF3D}'),
    ('\u{FF5B}', '\u{FF5D}'),
    ('\u{FF5F}', '\u{FF60}'),
    ('\u{FF62}', '\u{FF63}'),
];

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraph(text: &str, direction: WritingDirection) -> BidiParagraph {
        let chars = text.chars().collect::<Vec<_>>();
        BidiParagraph::new(&chars, direction)
    }

    fn visual(paragraph: &BidiParagraph) -> Vec<usize> {
        paragraph
            .reorder_line(0..paragraph.levels.len())
            .into_iter()
            .map(|(index, _)| index)
            .collect()
    }

    #[test]
    fn pure_ltr() {
        let para = paragraph("abc", WritingDirection::Auto);
        assert_eq!(para.base_level, 0);
        assert_eq!(para.levels, vec![0, 0, 0]);
        assert_eq!(visual(&para), vec![0, 1, 2]);
    }

    #[test]
    fn pure_rtl() {
        let para = paragraph("\u{0627}\u{0628}\u{062A}", WritingDirection::Auto);
        assert_eq!(para.base_level, 1);
        assert!(para.is_rtl());
        assert_eq!(para.levels, vec![1, 1, 1]);
        assert_eq!(visual(&para), vec![2, 1, 0]);
    }

    #[test]
    fn mixed_ltr_paragraph() {
        let para = paragraph("abc \u{05D0}\u{05D1}", WritingDirection::Auto);
        assert_eq!(para.base_level, 0);
        assert_eq!(para.levels, vec![0, 0, 0, 0, 1, 1]);
        assert_eq!(visual(&para), vec![0, 1, 2, 3, 5, 4]);
    }

    #[test]
    fn numbers_in_rtl_paragraph() {
        let para = paragraph("\u{05D0} 123", WritingDirection::Auto);
        assert_eq!(para.levels, vec![1, 1, 2, 2, 2]);
        assert_eq!(visual(&para), vec![2, 3, 4, 1, 0]);
    }

    #[test]
    fn arabic_number_after_arabic_letter() {
        // W2 turns European digits after an Arabic letter into Arabic numbers
        let para = paragraph("\u{0627}1", WritingDirection::Auto);
        assert_eq!(para.levels, vec![1, 2]);
    }

    #[test]
    fn forced_direction() {
        let para = paragraph("abc", WritingDirection::Rtl);
        assert_eq!(para.base_level, 1);
        assert_eq!(para.levels, vec![2, 2, 2]);

        let para = paragraph("\u{05D0}", WritingDirection::Ltr);
        assert_eq!(para.base_level, 0);
        assert_eq!(para.levels, vec![1]);
    }

    #[test]
    fn auto_direction_skips_neutrals() {
        let para = paragraph("123 \u{05D0}abc", WritingDirection::Auto);
        assert_eq!(para.base_level, 1);
    }

    #[test]
    fn brackets_take_context_direction() {
        let para = paragraph("a(\u{05D0})", WritingDirection::Auto);
        assert_eq!(para.levels, vec![0, 0, 1, 0]);

        let para = paragraph("\u{05D0}(a)", WritingDirection::Auto);
        assert_eq!(para.levels, vec![1, 1, 2, 1]);
    }

    #[test]
    fn embedding() {
        let para = paragraph("a\u{202B}b\u{202C}c", WritingDirection::Auto);
        assert_eq!(para.levels[0], 0);
        assert_eq!(para.levels[2], 2);
        assert_eq!(para.levels[4], 0);
    }

    #[test]
    fn override_forces_direction() {
        let para = paragraph("\u{202E}ab\u{202C}", WritingDirection::Ltr);
        assert_eq!(para.levels[1], 1);
        assert_eq!(para.levels[2], 1);
    }

    #[test]
    fn isolate() {
        let para = paragraph("a\u{2067}\u{05D0}\u{2069}b", WritingDirection::Auto);
        assert_eq!(para.levels, vec![0, 0, 1, 0, 0]);
    }

    #[test]
    fn first_strong_isolate() {
        let para = paragraph("a\u{2068}\u{05D0}b\u{2069}", WritingDirection::Auto);
        assert_eq!(para.levels[2], 1);
        assert_eq!(para.levels[3], 2);
    }

    #[test]
    fn trailing_whitespace_takes_paragraph_level() {
        let para = paragraph("abc ", WritingDirection::Rtl);
        let line = para.reorder_line(0..4);
        assert_eq!(line, vec![(3, 1), (0, 2), (1, 2), (2, 2)]);
    }

    #[test]
    fn reorder_sub_range() {
        let para = paragraph("\u{05D0}\u{05D1} \u{05D2}\u{05D3}", WritingDirection::Auto);
        let order = para
            .reorder_line(3..5)
            .into_iter()
            .map(|(index, _)| index)
            .collect::<Vec<_>>();
        assert_eq!(order, vec![4, 3]);
    }

    #[test]
    fn mirroring() {
        assert_eq!(bidi_mirror('('), Some(')'));
        assert_eq!(bidi_mirror(')'), Some('('));
        assert_eq!(bidi_mirror('\u{00AB}'), Some('\u{00BB}'));
        assert_eq!(bidi_mirror('a'), None);

        let chars = ['(', 'a', ')'];
        assert_eq!(mirrored_chars(&chars, &[1, 1, 0], 0..3), vec![(0, ')')]);
    }
}
