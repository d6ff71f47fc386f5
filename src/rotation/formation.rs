// Formation definitions: lineup slots per segment, parsed from formation.toml.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::roster::{Position, Segment};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum FormationError {
    #[error("failed to parse formation toml: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{formation}: unknown position `{position}` for slot `{slot}`")]
    UnknownPosition {
        formation: String,
        slot: String,
        position: String,
    },

    #[error("{formation}: slot `{slot}` position {position} belongs to the other segment")]
    WrongSegment {
        formation: String,
        slot: String,
        position: Position,
    },

    #[error("{formation}: duplicate slot id `{slot}`")]
    DuplicateSlotId { formation: String, slot: String },

    #[error("{formation}: slot `{slot}` is paired with unknown slot `{partner}`")]
    DanglingPair {
        formation: String,
        slot: String,
        partner: String,
    },

    #[error("{formation}: slot `{slot}` is paired with itself")]
    SelfPair { formation: String, slot: String },

    #[error("{formation}: pairing between `{slot}` and `{partner}` is not symmetric")]
    AsymmetricPair {
        formation: String,
        slot: String,
        partner: String,
    },

    #[error("{formation}: slot list is empty")]
    EmptySlots { formation: String },
}

// ---------------------------------------------------------------------------
// Slot / Formation types
// ---------------------------------------------------------------------------

/// Display identifier of a lineup slot (e.g. "LDE"). Unique within a formation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SlotId(String);

impl SlotId {
    pub fn new(id: impl Into<String>) -> Self {
        SlotId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Defensive front variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubFormation {
    FiveThree,
    FourFour,
}

impl SubFormation {
    pub fn from_str_sub(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "5-3" | "53" | "five_three" => Some(SubFormation::FiveThree),
            "4-4" | "44" | "four_four" => Some(SubFormation::FourFour),
            _ => None,
        }
    }

    pub fn display_str(&self) -> &'static str {
        match self {
            SubFormation::FiveThree => "5-3",
            SubFormation::FourFour => "4-4",
        }
    }
}

impl fmt::Display for SubFormation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

/// One lineup slot in a formation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slot {
    pub id: SlotId,
    /// The position a player must list to be eligible (unless the slot is open).
    pub position: Position,
    /// Symmetric partner slot for strong/weak pairing balance.
    pub paired_with: Option<SlotId>,
    /// Open slots admit any player, at a weight penalty.
    pub open: bool,
}

/// An ordered, validated slot list for one segment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Formation {
    pub segment: Segment,
    slots: Vec<Slot>,
}

impl Formation {
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn slot(&self, id: &SlotId) -> Option<&Slot> {
        self.slots.iter().find(|s| &s.id == id)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Whether `slot` is the lead of its pair: paired, and listed before its
    /// partner in formation order. The lead side favors stronger players,
    /// the trailing side weaker ones.
    pub fn is_pair_lead(&self, slot: &Slot) -> bool {
        let Some(partner) = &slot.paired_with else {
            return false;
        };
        let own = self.slots.iter().position(|s| s.id == slot.id);
        let other = self.slots.iter().position(|s| &s.id == partner);
        matches!((own, other), (Some(a), Some(b)) if a < b)
    }
}

/// All formations for a game: offense plus both defensive fronts.
#[derive(Debug, Clone)]
pub struct FormationSet {
    pub offense: Formation,
    pub defense_53: Formation,
    pub defense_44: Formation,
}

impl FormationSet {
    pub fn formation(&self, segment: Segment, front: SubFormation) -> &Formation {
        match (segment, front) {
            (Segment::Offense, _) => &self.offense,
            (Segment::Defense, SubFormation::FiveThree) => &self.defense_53,
            (Segment::Defense, SubFormation::FourFour) => &self.defense_44,
        }
    }

    /// Parse and validate a formation.toml document.
    pub fn from_toml_str(text: &str) -> Result<Self, FormationError> {
        let file: FormationFile = toml::from_str(text)?;
        Ok(FormationSet {
            offense: build_formation("offense", Segment::Offense, file.offense.slots)?,
            defense_53: build_formation(
                "defense.five_three",
                Segment::Defense,
                file.defense.five_three.slots,
            )?,
            defense_44: build_formation(
                "defense.four_four",
                Segment::Defense,
                file.defense.four_four.slots,
            )?,
        })
    }
}

// ---------------------------------------------------------------------------
// formation.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FormationFile {
    offense: RawFormation,
    defense: DefenseSection,
}

#[derive(Debug, Deserialize)]
struct DefenseSection {
    five_three: RawFormation,
    four_four: RawFormation,
}

#[derive(Debug, Deserialize)]
struct RawFormation {
    slots: Vec<RawSlot>,
}

#[derive(Debug, Deserialize)]
struct RawSlot {
    id: String,
    position: String,
    #[serde(default)]
    paired_with: Option<String>,
    #[serde(default)]
    open: bool,
}

fn build_formation(
    label: &str,
    segment: Segment,
    raw: Vec<RawSlot>,
) -> Result<Formation, FormationError> {
    if raw.is_empty() {
        return Err(FormationError::EmptySlots {
            formation: label.to_string(),
        });
    }

    let mut slots = Vec::with_capacity(raw.len());
    for rs in &raw {
        let position =
            Position::from_str_pos(&rs.position).ok_or_else(|| FormationError::UnknownPosition {
                formation: label.to_string(),
                slot: rs.id.clone(),
                position: rs.position.clone(),
            })?;
        if position.segment() != segment {
            return Err(FormationError::WrongSegment {
                formation: label.to_string(),
                slot: rs.id.clone(),
                position,
            });
        }
        let id = SlotId::new(rs.id.clone());
        if slots.iter().any(|s: &Slot| s.id == id) {
            return Err(FormationError::DuplicateSlotId {
                formation: label.to_string(),
                slot: rs.id.clone(),
            });
        }
        slots.push(Slot {
            id,
            position,
            paired_with: rs.paired_with.clone().map(SlotId::new),
            open: rs.open,
        });
    }

    // Pairing must reference an existing, distinct slot, symmetrically.
    for slot in &slots {
        let Some(partner_id) = &slot.paired_with else {
            continue;
        };
        if partner_id == &slot.id {
            return Err(FormationError::SelfPair {
                formation: label.to_string(),
                slot: slot.id.to_string(),
            });
        }
        let Some(partner) = slots.iter().find(|s| &s.id == partner_id) else {
            return Err(FormationError::DanglingPair {
                formation: label.to_string(),
                slot: slot.id.to_string(),
                partner: partner_id.to_string(),
            });
        };
        if partner.paired_with.as_ref() != Some(&slot.id) {
            return Err(FormationError::AsymmetricPair {
                formation: label.to_string(),
                slot: slot.id.to_string(),
                partner: partner_id.to_string(),
            });
        }
    }

    Ok(Formation { segment, slots })
}
