//! Script selection and script specific feature ordering.

pub mod arabic;

use crate::layout::{FeatureTable, LangSys, LayoutTable, LayoutTableType};
use crate::tag;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ScriptType {
    Arabic,
    Default,
}

impl From<u32> for ScriptType {
    fn from(script_tag: u32) -> Self {
        match script_tag {
            tag::ARAB => ScriptType::Arabic,
            _ => ScriptType::Default,
        }
    }
}

/// Pick the script of `table` to shape `chars` with and return its default language system.
///
/// `arab` is used when the text contains Arabic, then `DFLT`, then `latn`, then whichever
/// script the font lists first.
pub fn find_langsys<'a, T: LayoutTableType>(
    table: &'a LayoutTable<T>,
    chars: &[char],
) -> Option<(u32, &'a LangSys)> {
    let script_list = table.opt_script_list.as_ref()?;
    let has_arabic = chars.iter().any(|&ch| arabic::is_arabic(ch));
    let script_tag = [has_arabic.then_some(tag::ARAB), Some(tag::DFLT), Some(tag::LATN)]
        .into_iter()
        .flatten()
        .find(|&script_tag| script_list.find_script(script_tag).is_some())
        .or_else(|| {
            script_list
                .script_records()
                .first()
                .map(|record| record.script_tag)
        })?;
    let langsys = script_list
        .find_script(script_tag)?
        .default_langsys_record()?;
    Some((script_tag, langsys))
}

/// The features of `langsys` in the order they are applied.
///
/// The required feature comes first. Features named in `priority` follow in that order and
/// the remaining features keep the order the font declares them in.
pub fn ordered_features<'a, T: LayoutTableType>(
    table: &'a LayoutTable<T>,
    langsys: &LangSys,
    priority: &[u32],
) -> Vec<(u32, &'a FeatureTable)> {
    let mut features = langsys
        .feature_indices
        .iter()
        .filter_map(|&feature_index| table.feature_by_index(feature_index))
        .map(|record| (record.feature_tag, record.feature_table()))
        .collect::<Vec<_>>();
    if !priority.is_empty() {
        // stable, so unlisted features stay in declared order
        features.sort_by_key(|&(feature_tag, _)| {
            priority
                .iter()
                .position(|&tag| tag == feature_tag)
                .unwrap_or(priority.len())
        });
    }
    if let Some(record) = langsys
        .required_feature_index
        .and_then(|feature_index| table.feature_by_index(feature_index))
    {
        features.insert(0, (record.feature_tag, record.feature_table()));
    }
    features
}
