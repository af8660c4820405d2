use std::fmt::Write;

use skjema_data::FieldPath;

use crate::lookups::LayoutLookups;

/// Resolves the indexed id of `base_id` as seen from a concrete data
/// model location.
///
/// A component with no repeating ancestors keeps its base id. Otherwise
/// each repeating ancestor's group binding must match a prefix of the
/// location, outermost first, and the location must carry a row index at
/// that depth; the collected indices become the `-i1-i2` suffix.
/// Returns `None` when the location is unrelated to the component's row
/// context or does not reach deep enough, so a caller can tell "not
/// addressable from here" apart from a configuration error.
#[must_use]
pub fn make_indexed_id(
    base_id: &str,
    current_location: Option<&FieldPath>,
    lookups: &LayoutLookups,
) -> Option<String> {
    let ancestors = lookups.repeating_ancestors(base_id);
    if ancestors.is_empty() {
        return lookups.component(base_id).map(|_| base_id.to_string());
    }

    let location = current_location?;
    let mut indexed = base_id.to_string();
    for ancestor in ancestors {
        let binding = ancestor.binding(skjema_models::ComponentDecl::GROUP_BINDING)?;
        let group_path = FieldPath::parse(binding.field()).ok()?.without_indices();
        if !location.starts_with_bases(&group_path) {
            return None;
        }
        let depth = group_path.segments().len();
        let index = location.segments().get(depth - 1)?.index?;
        write!(indexed, "-{index}").ok()?;
    }
    Some(indexed)
}
