// Player attributes and the roster container.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Preference lists are capped at four ranked positions per segment.
pub const MAX_PREFS: usize = 4;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("duplicate player id `{id}`")]
    DuplicateId { id: String },

    #[error("player `{id}` has an empty name")]
    EmptyName { id: String },

    #[error("player `{id}` lists more than {MAX_PREFS} {segment} preferences")]
    TooManyPreferences { id: String, segment: Segment },

    #[error("player `{id}` lists {position} more than once in {segment} preferences")]
    DuplicatePreference {
        id: String,
        segment: Segment,
        position: Position,
    },

    #[error("row {row}: unknown {field} value `{value}`")]
    UnknownValue {
        row: usize,
        field: String,
        value: String,
    },

    #[error("roster csv is missing required column `{column}`")]
    MissingColumn { column: String },

    #[error("failed to read roster csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("roster csv io error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Segment
// ---------------------------------------------------------------------------

/// Which side of the ball a series is played on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Segment {
    Offense,
    Defense,
}

impl Segment {
    pub fn from_str_seg(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "offense" | "off" | "o" => Some(Segment::Offense),
            "defense" | "def" | "d" => Some(Segment::Defense),
            _ => None,
        }
    }

    pub fn display_str(&self) -> &'static str {
        match self {
            Segment::Offense => "Offense",
            Segment::Defense => "Defense",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

// ---------------------------------------------------------------------------
// Positions
// ---------------------------------------------------------------------------

/// Youth-football positions used for lineup slot assignment.
///
/// Offense runs an 11-slot set; defense runs either a 5-3 or 4-4 front
/// drawn from the same defensive position pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    // Offense
    Quarterback,
    AllBack,
    HalfBack,
    WideReceiver,
    SlotReceiver,
    Center,
    LeftGuard,
    LeftTackle,
    RightGuard,
    RightTackle,
    TightEnd,
    // Defense
    NoseTackle,
    LeftDefTackle,
    RightDefTackle,
    LeftDefEnd,
    RightDefEnd,
    MiddleLinebacker,
    LeftLinebacker,
    RightLinebacker,
    LeftCorner,
    RightCorner,
    Safety,
}

impl Position {
    /// Parse a position label into a Position enum.
    ///
    /// Case-insensitive. Legacy 4-4 linebacker labels normalize to the core
    /// set: RILB/LILB/RMLB/LMLB -> MLB, ROLB -> RLB, LOLB -> LLB.
    pub fn from_str_pos(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "QB" => Some(Position::Quarterback),
            "AB" => Some(Position::AllBack),
            "HB" => Some(Position::HalfBack),
            "WR" => Some(Position::WideReceiver),
            "SLOT" => Some(Position::SlotReceiver),
            "C" => Some(Position::Center),
            "LG" => Some(Position::LeftGuard),
            "LT" => Some(Position::LeftTackle),
            "RG" => Some(Position::RightGuard),
            "RT" => Some(Position::RightTackle),
            "TE" => Some(Position::TightEnd),
            "NT" => Some(Position::NoseTackle),
            "LDT" => Some(Position::LeftDefTackle),
            "RDT" => Some(Position::RightDefTackle),
            "LDE" => Some(Position::LeftDefEnd),
            "RDE" => Some(Position::RightDefEnd),
            "MLB" | "RILB" | "LILB" | "RMLB" | "LMLB" => Some(Position::MiddleLinebacker),
            "LLB" | "LOLB" => Some(Position::LeftLinebacker),
            "RLB" | "ROLB" => Some(Position::RightLinebacker),
            "LC" => Some(Position::LeftCorner),
            "RC" => Some(Position::RightCorner),
            "S" => Some(Position::Safety),
            _ => None,
        }
    }

    /// Return the display label for this position.
    pub fn display_str(&self) -> &'static str {
        match self {
            Position::Quarterback => "QB",
            Position::AllBack => "AB",
            Position::HalfBack => "HB",
            Position::WideReceiver => "WR",
            Position::SlotReceiver => "Slot",
            Position::Center => "C",
            Position::LeftGuard => "LG",
            Position::LeftTackle => "LT",
            Position::RightGuard => "RG",
            Position::RightTackle => "RT",
            Position::TightEnd => "TE",
            Position::NoseTackle => "NT",
            Position::LeftDefTackle => "LDT",
            Position::RightDefTackle => "RDT",
            Position::LeftDefEnd => "LDE",
            Position::RightDefEnd => "RDE",
            Position::MiddleLinebacker => "MLB",
            Position::LeftLinebacker => "LLB",
            Position::RightLinebacker => "RLB",
            Position::LeftCorner => "LC",
            Position::RightCorner => "RC",
            Position::Safety => "S",
        }
    }

    /// The segment this position belongs to.
    pub fn segment(&self) -> Segment {
        match self {
            Position::Quarterback
            | Position::AllBack
            | Position::HalfBack
            | Position::WideReceiver
            | Position::SlotReceiver
            | Position::Center
            | Position::LeftGuard
            | Position::LeftTackle
            | Position::RightGuard
            | Position::RightTackle
            | Position::TightEnd => Segment::Offense,
            _ => Segment::Defense,
        }
    }

    /// The fairness reporting category this position counts toward.
    pub fn category(&self) -> Category {
        match self {
            Position::Quarterback => Category::Quarterback,
            Position::AllBack | Position::HalfBack => Category::Backfield,
            Position::WideReceiver | Position::SlotReceiver => Category::Wide,
            Position::TightEnd => Category::TightEnd,
            Position::Center
            | Position::LeftGuard
            | Position::LeftTackle
            | Position::RightGuard
            | Position::RightTackle => Category::InteriorLine,
            Position::NoseTackle | Position::LeftDefTackle | Position::RightDefTackle => {
                Category::DLine
            }
            Position::LeftDefEnd | Position::RightDefEnd => Category::DefEnd,
            Position::MiddleLinebacker | Position::LeftLinebacker | Position::RightLinebacker => {
                Category::Linebacker
            }
            Position::LeftCorner | Position::RightCorner | Position::Safety => Category::Secondary,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

/// Reporting buckets for playtime spread by position group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Quarterback,
    Backfield,
    Wide,
    TightEnd,
    InteriorLine,
    DLine,
    DefEnd,
    Linebacker,
    Secondary,
}

impl Category {
    pub fn display_str(&self) -> &'static str {
        match self {
            Category::Quarterback => "QB",
            Category::Backfield => "Backfield",
            Category::Wide => "Wide",
            Category::TightEnd => "TE",
            Category::InteriorLine => "Interior Line",
            Category::DLine => "DLine",
            Category::DefEnd => "DE",
            Category::Linebacker => "Linebacker",
            Category::Secondary => "Secondary",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

// ---------------------------------------------------------------------------
// Role / Energy
// ---------------------------------------------------------------------------

/// Coach-assigned role for the day. Drives the strength index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Explorer,
    Connector,
    Driver,
}

impl Role {
    pub fn from_str_role(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "explorer" => Some(Role::Explorer),
            "connector" => Some(Role::Connector),
            "driver" => Some(Role::Driver),
            _ => None,
        }
    }

    pub fn score(&self) -> u32 {
        match self {
            Role::Explorer => 1,
            Role::Connector => 2,
            Role::Driver => 3,
        }
    }

    pub fn display_str(&self) -> &'static str {
        match self {
            Role::Explorer => "Explorer",
            Role::Connector => "Connector",
            Role::Driver => "Driver",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

/// Caller-supplied energy level for the day. An ordinal input, not a
/// fatigue model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Energy {
    Low,
    Medium,
    High,
}

impl Energy {
    pub fn from_str_energy(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Energy::Low),
            "medium" | "med" => Some(Energy::Medium),
            "high" => Some(Energy::High),
            _ => None,
        }
    }

    pub fn score(&self) -> u32 {
        match self {
            Energy::Low => 0,
            Energy::Medium => 1,
            Energy::High => 2,
        }
    }

    pub fn display_str(&self) -> &'static str {
        match self {
            Energy::Low => "Low",
            Energy::Medium => "Medium",
            Energy::High => "High",
        }
    }
}

impl fmt::Display for Energy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// Stable player identifier. Unique within a roster.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        PlayerId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single player with day-of attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    /// Ranked offensive position preferences, best first (rank 1..=4).
    pub offense_prefs: Vec<Position>,
    /// Ranked defensive position preferences, best first (rank 1..=4).
    pub defense_prefs: Vec<Position>,
    pub role: Role,
    pub energy: Energy,
    /// Varsity minutes already played today. Nonzero marks the player as
    /// varsity for the reduced minimum-playtime target.
    #[serde(default)]
    pub varsity_minutes: u32,
    /// Checked in and available for assignment.
    #[serde(default = "default_true")]
    pub present: bool,
    /// Excluded from the evenness spread (injury or coach override).
    #[serde(default)]
    pub excused: bool,
}

fn default_true() -> bool {
    true
}

impl Player {
    /// Combined role/energy score used as the lineup strength term.
    /// Always >= 10 for a valid role, so strictly nonnegative.
    pub fn strength_index(&self) -> u32 {
        self.role.score() * 10 + self.energy.score()
    }

    pub fn is_varsity(&self) -> bool {
        self.varsity_minutes > 0
    }

    pub fn prefs(&self, segment: Segment) -> &[Position] {
        match segment {
            Segment::Offense => &self.offense_prefs,
            Segment::Defense => &self.defense_prefs,
        }
    }

    /// 1-based preference rank of `position` in the player's list for
    /// `segment`, or None when the position is not listed.
    pub fn pref_rank(&self, segment: Segment, position: Position) -> Option<usize> {
        self.prefs(segment).iter().position(|p| *p == position).map(|i| i + 1)
    }

    /// Preference weight for `position`: rank 1..=4 maps to 4, 3, 2, 1.
    pub fn pref_weight(&self, segment: Segment, position: Position) -> Option<u32> {
        self.pref_rank(segment, position)
            .map(|rank| (MAX_PREFS + 1 - rank) as u32)
    }
}

/// Normalize a display name: trim, collapse whitespace, Title Case each word.
pub fn normalize_name(s: &str) -> String {
    s.split_whitespace()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

/// A validated roster: unique ids, nonempty names, capped preference lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Roster {
    players: Vec<Player>,
}

impl Roster {
    /// Build a roster from players, validating the invariants the engine
    /// relies on. Players keep their given order.
    pub fn from_players(players: Vec<Player>) -> Result<Self, RosterError> {
        let mut seen = std::collections::HashSet::new();
        for p in &players {
            if !seen.insert(p.id.clone()) {
                return Err(RosterError::DuplicateId {
                    id: p.id.to_string(),
                });
            }
            if p.name.trim().is_empty() {
                return Err(RosterError::EmptyName {
                    id: p.id.to_string(),
                });
            }
            for (segment, prefs) in [
                (Segment::Offense, &p.offense_prefs),
                (Segment::Defense, &p.defense_prefs),
            ] {
                if prefs.len() > MAX_PREFS {
                    return Err(RosterError::TooManyPreferences {
                        id: p.id.to_string(),
                        segment,
                    });
                }
                for (i, pos) in prefs.iter().enumerate() {
                    if prefs[..i].contains(pos) {
                        return Err(RosterError::DuplicatePreference {
                            id: p.id.to_string(),
                            segment,
                            position: *pos,
                        });
                    }
                }
            }
        }
        Ok(Roster { players })
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn get(&self, id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| &p.id == id)
    }

    pub fn get_mut(&mut self, id: &PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| &p.id == id)
    }

    /// Players checked in for today, in roster order.
    pub fn present_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.present)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Median strength index across present players. Used to balance
    /// paired slots between stronger and weaker players.
    pub fn median_strength(&self) -> u32 {
        let mut strengths: Vec<u32> = self.present_players().map(|p| p.strength_index()).collect();
        if strengths.is_empty() {
            return 0;
        }
        strengths.sort_unstable();
        strengths[strengths.len() / 2]
    }
}
