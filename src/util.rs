//! Conference-series ordering.
//!
//! Conference groups are sorted by a fixed index assigned when the group is
//! first created. Known series take their position in [`ORDERED_SERIES`];
//! the catch-all group is pushed to the end with a large sentinel.

/// Known conference series, in display order. Index in this list becomes the
/// group's sort index.
pub const ORDERED_SERIES: &[&str] = &[
    "congress",
    "camp",
    "gpn",
    "mrmcd",
    "datenspuren",
    "easterhegg",
    "froscon",
    "sigint",
    "fiffkon",
    "denog",
];

/// Label for conferences that belong to no known series.
pub const CATCH_ALL_SERIES: &str = "other conferences";

/// Sort index of the catch-all group, so it always sorts last.
pub const CATCH_ALL_SORT_INDEX: i64 = 1_000_001;

/// Sort index for a group created under `name`.
///
/// Unknown series names fall through to index 0 and therefore sort ahead of
/// every indexed series. That ordering is questionable but intentional here;
/// changing it is a product decision, not a bug fix.
pub fn series_sort_index(name: &str) -> i64 {
    if let Some(position) = ORDERED_SERIES.iter().position(|s| *s == name) {
        position as i64
    } else if name == CATCH_ALL_SERIES {
        CATCH_ALL_SORT_INDEX
    } else {
        0
    }
}

/// Derive the series name from a conference slug.
///
/// Slugs of the form `conferences/<series>/<acronym>` group under
/// `<series>`; flat slugs (`conferences/<acronym>` or a bare acronym) fall
/// into the catch-all group.
pub fn series_name(slug: &str) -> &str {
    let segments: Vec<&str> = slug.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() >= 3 {
        segments[1]
    } else {
        CATCH_ALL_SERIES
    }
}
