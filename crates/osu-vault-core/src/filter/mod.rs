//! Query, filter and sort engine
//!
//! Operates purely on canonical records and is shared by both drivers.

mod query;
mod sort;

pub use query::*;
pub use sort::*;

use crate::beatmap::Beatmap;

/// A UI range slider parked at its maximum position means "unbounded", not
/// "exactly this value".
pub const MAX_STAR_RATING: f64 = 10.0;

/// Filter options for a beatmap search.
#[derive(Debug, Clone, Default)]
pub struct BeatmapFilter {
    /// Free text plus optional `field(op)value` tokens.
    pub query: Option<String>,
    /// Sort key; ignored unless on the allow-list.
    pub sort: Option<String>,
    /// Case-insensitive status name.
    pub status: Option<String>,
    /// Inclusive star-rating bounds; an upper bound of [`MAX_STAR_RATING`]
    /// disables the upper check.
    pub difficulty_range: Option<(f64, f64)>,
    /// Keep one difficulty per unique key.
    pub unique: bool,
    /// Restrict the search to one collection.
    pub collection: Option<String>,
}

/// Filter options for a beatmapset search.
#[derive(Debug, Clone, Default)]
pub struct BeatmapSetFilter {
    pub query: Option<String>,
    pub sort: Option<String>,
}

/// Inclusive difficulty-range check with the unbounded-upper sentinel.
pub fn check_difficulty(beatmap: &Beatmap, range: (f64, f64)) -> bool {
    let (min, max) = range;

    if beatmap.star_rating < min {
        return false;
    }
    if max != MAX_STAR_RATING && beatmap.star_rating > max {
        return false;
    }

    true
}

/// Evaluate every filter against one record. A record passes only if all of
/// them do.
pub fn filter_beatmap(beatmap: &Beatmap, options: &BeatmapFilter) -> bool {
    if beatmap.beatmapset_id == -1 {
        return false;
    }

    if let Some(range) = options.difficulty_range {
        if !check_difficulty(beatmap, range) {
            return false;
        }
    }

    if let Some(query) = options.query.as_deref() {
        if !matches_query(beatmap, query) {
            return false;
        }
    }

    if let Some(status) = options.status.as_deref() {
        if !beatmap.status.name().eq_ignore_ascii_case(status) {
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beatmap::Status;

    fn beatmap(star_rating: f64) -> Beatmap {
        Beatmap {
            md5: "aa".repeat(16),
            beatmapset_id: 10,
            star_rating,
            status: Status::Ranked,
            ..Default::default()
        }
    }

    #[test]
    fn test_difficulty_range_inclusive() {
        assert!(check_difficulty(&beatmap(4.0), (4.0, 6.0)));
        assert!(check_difficulty(&beatmap(6.0), (4.0, 6.0)));
        assert!(!check_difficulty(&beatmap(6.01), (4.0, 6.0)));
        assert!(!check_difficulty(&beatmap(3.99), (4.0, 6.0)));
    }

    #[test]
    fn test_sentinel_upper_bound_is_unbounded() {
        // 11.2* passes a (0, 10) filter because 10 is the slider maximum
        assert!(check_difficulty(&beatmap(11.2), (0.0, MAX_STAR_RATING)));
        assert!(!check_difficulty(&beatmap(11.2), (0.0, 9.9)));
    }

    #[test]
    fn test_unset_online_set_id_rejected() {
        let mut record = beatmap(5.0);
        record.beatmapset_id = -1;
        assert!(!filter_beatmap(&record, &BeatmapFilter::default()));
    }

    #[test]
    fn test_status_filter_case_insensitive() {
        let record = beatmap(5.0);

        let mut options = BeatmapFilter {
            status: Some("ranked".to_string()),
            ..Default::default()
        };
        assert!(filter_beatmap(&record, &options));

        options.status = Some("loved".to_string());
        assert!(!filter_beatmap(&record, &options));
    }
}
