//! Ranked-status codes for both database generations
//!
//! The two backends persist different numeric code tables; the canonical
//! model keeps one status enum that both map onto.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical ranked status of a beatmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Status {
    #[default]
    Unknown,
    Unsubmitted,
    Pending,
    Unused,
    Ranked,
    Approved,
    Qualified,
    Loved,
    Graveyard,
    Wip,
    LocallyModified,
}

impl Status {
    /// Decode the stable database's status byte.
    ///
    /// Stable: 0 unknown, 1 unsubmitted, 2 pending (also graveyard/wip),
    /// 3 unused, 4 ranked, 5 approved, 6 qualified, 7 loved.
    pub fn from_stable_code(code: u8) -> Self {
        match code {
            1 => Status::Unsubmitted,
            2 => Status::Pending,
            3 => Status::Unused,
            4 => Status::Ranked,
            5 => Status::Approved,
            6 => Status::Qualified,
            7 => Status::Loved,
            _ => Status::Unknown,
        }
    }

    /// Encode into the stable database's status byte.
    pub fn to_stable_code(self) -> u8 {
        match self {
            Status::Unsubmitted => 1,
            // stable classifies these three as "pending"
            Status::Pending | Status::Graveyard | Status::Wip | Status::LocallyModified => 2,
            Status::Unused => 3,
            Status::Ranked => 4,
            Status::Approved => 5,
            Status::Qualified => 6,
            Status::Loved => 7,
            Status::Unknown => 0,
        }
    }

    /// Decode the modern store's status code.
    ///
    /// Modern: -4 locally modified, -3 unsubmitted, -2 graveyard, -1 wip,
    /// 0 pending, 1 ranked, 2 approved, 3 qualified, 4 loved.
    pub fn from_modern_code(code: i32) -> Self {
        match code {
            -4 => Status::LocallyModified,
            -3 => Status::Unsubmitted,
            -2 => Status::Graveyard,
            -1 => Status::Wip,
            0 => Status::Pending,
            1 => Status::Ranked,
            2 => Status::Approved,
            3 => Status::Qualified,
            4 => Status::Loved,
            _ => Status::Unknown,
        }
    }

    /// Encode into the modern store's status code.
    pub fn to_modern_code(self) -> i32 {
        match self {
            Status::LocallyModified => -4,
            Status::Unsubmitted | Status::Unknown => -3,
            Status::Graveyard => -2,
            Status::Wip => -1,
            Status::Pending | Status::Unused => 0,
            Status::Ranked => 1,
            Status::Approved => 2,
            Status::Qualified => 3,
            Status::Loved => 4,
        }
    }

    /// Display name, also used for case-insensitive status filtering.
    pub fn name(self) -> &'static str {
        match self {
            Status::Unknown => "Unknown",
            Status::Unsubmitted => "Unsubmitted",
            Status::Pending => "Pending",
            Status::Unused => "Unused",
            Status::Ranked => "Ranked",
            Status::Approved => "Approved",
            Status::Qualified => "Qualified",
            Status::Loved => "Loved",
            Status::Graveyard => "Graveyard",
            Status::Wip => "Wip",
            Status::LocallyModified => "Locally Modified",
        }
    }

    /// Parse a status name the way the UI sends it.
    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "unsubmitted" | "not submitted" => Status::Unsubmitted,
            "pending" => Status::Pending,
            "unused" => Status::Unused,
            "ranked" => Status::Ranked,
            "approved" => Status::Approved,
            "qualified" => Status::Qualified,
            "loved" => Status::Loved,
            "graveyard" => Status::Graveyard,
            "wip" => Status::Wip,
            "locally modified" => Status::LocallyModified,
            _ => Status::Unknown,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
