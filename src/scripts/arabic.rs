//! Arabic joining forms and feature order.
//!
//! Joining states are computed following
//! <https://github.com/n8willis/opentype-shaping-documents/blob/master/opentype-shaping-arabic-general.md>

use unicode_joining_type::{get_joining_type, JoiningType};

use crate::tag;

/// `GSUB` features applied ahead of the others, in this order.
pub const GSUB_FEATURE_ORDER: &[u32] = &[
    tag::CCMP,
    tag::INIT,
    tag::MEDI,
    tag::FINA,
    tag::ISOL,
    tag::RLIG,
    tag::CALT,
    tag::LIGA,
];

/// `GPOS` features applied ahead of the others, in this order.
pub const GPOS_FEATURE_ORDER: &[u32] = &[tag::CURS, tag::KERN, tag::MARK, tag::MKMK];

/// Whether `feature_tag` selects a joining form and so only applies to letters in that form.
pub fn is_joining_feature(feature_tag: u32) -> bool {
    matches!(feature_tag, tag::INIT | tag::MEDI | tag::FINA | tag::ISOL)
}

pub fn is_arabic(ch: char) -> bool {
    matches!(
        ch,
        '\u{0600}'..='\u{06FF}'
            | '\u{0750}'..='\u{077F}'
            | '\u{08A0}'..='\u{08FF}'
            | '\u{FB50}'..='\u{FDFF}'
            | '\u{FE70}'..='\u{FEFF}'
    )
}

fn is_transparent(joining_type: JoiningType) -> bool {
    joining_type == JoiningType::Transparent
}

fn is_left_joining(joining_type: JoiningType) -> bool {
    joining_type == JoiningType::LeftJoining
        || joining_type == JoiningType::DualJoining
        || joining_type == JoiningType::JoinCausing
}

fn is_right_joining(joining_type: JoiningType) -> bool {
    joining_type == JoiningType::RightJoining
        || joining_type == JoiningType::DualJoining
        || joining_type == JoiningType::JoinCausing
}

/// The joining form feature selected for each character of `chars`.
///
/// Transparent characters do not interrupt joining and keep `isol`.
pub fn joining_forms(chars: &[char]) -> Vec<u32> {
    let joining_types = chars
        .iter()
        .map(|&ch| get_joining_type(ch))
        .collect::<Vec<_>>();
    let mut forms = vec![tag::ISOL; chars.len()];

    let Some(mut previous_i) = joining_types.iter().position(|&jt| !is_transparent(jt)) else {
        return forms;
    };
    for i in (previous_i + 1)..joining_types.len() {
        if is_transparent(joining_types[i]) {
            continue;
        }

        if is_left_joining(joining_types[previous_i]) && is_right_joining(joining_types[i]) {
            forms[i] = tag::FINA;

            match forms[previous_i] {
                tag::ISOL => forms[previous_i] = tag::INIT,
                tag::FINA => forms[previous_i] = tag::MEDI,
                _ => {}
            }
        }

        previous_i = i;
    }
    forms
}

#[cfg(test)]
mod tests {
    use super::*;

    const BEH: char = '\u{0628}';
    const TEH: char = '\u{062A}';
    const THEH: char = '\u{062B}';
    const ALEF: char = '\u{0627}';
    const FATHA: char = '\u{064E}';

    #[test]
    fn dual_joining_word() {
        assert_eq!(
            joining_forms(&[BEH, TEH, THEH]),
            vec![tag::INIT, tag::MEDI, tag::FINA]
        );
    }

    #[test]
    fn right_joining_breaks_the_chain() {
        assert_eq!(joining_forms(&[ALEF, BEH]), vec![tag::ISOL, tag::ISOL]);
        assert_eq!(joining_forms(&[BEH, ALEF]), vec![tag::INIT, tag::FINA]);
        assert_eq!(
            joining_forms(&[BEH, ALEF, BEH, BEH]),
            vec![tag::INIT, tag::FINA, tag::INIT, tag::FINA]
        );
    }

    #[test]
    fn marks_are_transparent() {
        assert_eq!(
            joining_forms(&[BEH, FATHA, TEH]),
            vec![tag::INIT, tag::ISOL, tag::FINA]
        );
    }

    #[test]
    fn non_joining_text() {
        assert_eq!(joining_forms(&['a', 'b']), vec![tag::ISOL, tag::ISOL]);
        assert_eq!(joining_forms(&[FATHA]), vec![tag::ISOL]);
        assert!(joining_forms(&[]).is_empty());
    }

    #[test]
    fn arabic_ranges() {
        assert!(is_arabic(BEH));
        assert!(is_arabic('\u{FEF5}'));
        assert!(!is_arabic('a'));
        assert!(!is_arabic('\u{05D0}'));
    }

    #[test]
    fn form_features() {
        assert!(is_joining_feature(tag::MEDI));
        assert!(!is_joining_feature(tag::LIGA));
    }
}
