//! Tempo derivation from stable timing points

use serde::{Deserialize, Serialize};

/// A timing point as stored in the stable database.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingPoint {
    /// Milliseconds per beat (may be a negative multiplier for inherited points).
    pub beat_length: f64,
    /// Start offset in milliseconds.
    pub offset: f64,
    pub inherited: bool,
}

/// Derive a single representative BPM: the tempo whose timing segments cover
/// the greatest cumulative duration up to the map's total length. Equal
/// durations keep the earlier-accumulated tempo (comparison is strictly
/// greater-than).
pub fn common_bpm(timing_points: &[TimingPoint], length: i32) -> f64 {
    if timing_points.is_empty() {
        return 0.0;
    }

    let last_time = if length > 0 {
        f64::from(length)
    } else {
        timing_points[timing_points.len() - 1].offset
    };

    // keyed by BPM rounded to three decimals; insertion order preserved so
    // the tie behavior is deterministic
    let mut durations: Vec<(i64, f64, f64)> = Vec::new();

    for (i, point) in timing_points.iter().enumerate() {
        if point.offset > last_time {
            continue;
        }

        let bpm = (60000.0 / point.beat_length * 1000.0).round() / 1000.0;
        let current_time = if i == 0 { 0.0 } else { point.offset };
        let next_time = if i == timing_points.len() - 1 {
            last_time
        } else {
            timing_points[i + 1].offset
        };
        let duration = next_time - current_time;

        let key = (bpm * 1000.0).round() as i64;
        match durations.iter_mut().find(|(k, _, _)| *k == key) {
            Some(entry) => entry.2 += duration,
            None => durations.push((key, bpm, duration)),
        }
    }

    let mut best = (0.0, 0.0);
    for (_, bpm, duration) in durations {
        if duration > best.1 {
            best = (bpm, duration);
        }
    }

    best.0
}
