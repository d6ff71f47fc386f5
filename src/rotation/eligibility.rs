// Eligibility and soft scoring for (player, slot) pairs.
//
// Hard eligibility: the slot's position appears in the player's preference
// list for the segment, or the slot is open. Soft weight: preference rank
// plus a pairing-balance bonus that steers paired slots toward mixing
// stronger and weaker players.

use serde::Serialize;

use crate::roster::{Player, Roster};
use crate::rotation::formation::{Formation, Slot};

/// Weight for a player placed on an open slot they did not ask for.
/// Below the lowest preference weight (1) so listed positions always win.
pub const OPEN_SLOT_WEIGHT: f64 = 0.5;

/// The resolved fit of one player for one slot.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SlotFit {
    pub eligible: bool,
    /// Preference-rank weight, or the open-slot penalty.
    pub pref_weight: f64,
    /// Pairing-balance bonus, already at its configured scale.
    pub pairing_bonus: f64,
}

impl SlotFit {
    const INELIGIBLE: SlotFit = SlotFit {
        eligible: false,
        pref_weight: 0.0,
        pairing_bonus: 0.0,
    };

    /// Combined soft weight.
    pub fn weight(&self) -> f64 {
        self.pref_weight + self.pairing_bonus
    }
}

/// Scores (player, slot) pairs for one formation. Deterministic: the same
/// inputs always produce the same fit.
pub struct Resolver<'a> {
    formation: &'a Formation,
    pairing_weight: f64,
    median_strength: u32,
}

impl<'a> Resolver<'a> {
    pub fn new(formation: &'a Formation, roster: &Roster, pairing_weight: f64) -> Self {
        Resolver {
            formation,
            pairing_weight,
            median_strength: roster.median_strength(),
        }
    }

    pub fn resolve(&self, player: &Player, slot: &Slot) -> SlotFit {
        let pref_weight = player.pref_weight(self.formation.segment, slot.position);
        if pref_weight.is_none() && !slot.open {
            return SlotFit::INELIGIBLE;
        }

        let pref_weight = pref_weight.map(f64::from).unwrap_or(OPEN_SLOT_WEIGHT);

        // Pairing balance: the lead slot of a couple favors players at or
        // above the roster median strength, the trailing slot favors those
        // below, so the pair tends to land one stronger and one weaker player.
        let mut pairing_bonus = 0.0;
        if slot.paired_with.is_some() {
            let lead = self.formation.is_pair_lead(slot);
            let strong = player.strength_index() >= self.median_strength;
            if lead == strong {
                pairing_bonus = self.pairing_weight;
            }
        }

        SlotFit {
            eligible: true,
            pref_weight,
            pairing_bonus,
        }
    }
}
