// Fairness accounting: minutes, deficits, and the evenness cap, derived from
// the committed play-record history. Pure; the game controller owns the
// history and the engine consumes the derived state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::game::state::PlayRecord;
use crate::roster::{Category, Player, PlayerId, Roster, Segment};

/// Fairness tuning knobs from strategy.toml.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FairnessConfig {
    /// Minimum series every present player should reach by game end.
    pub min_guarantee_series: u32,
    /// Max lead in series played over the least-used present player.
    pub evenness_cap: u32,
    /// Fractional target reduction for varsity players, in [0, 1].
    pub varsity_reduction: f64,
}

/// Derived per-segment fairness snapshot.
///
/// Minutes are committed series appearances in the segment. A player's
/// target is the minimum guarantee, reduced for varsity players; the deficit
/// is the clamped shortfall and never increases as minutes accrue.
#[derive(Debug, Clone, Serialize)]
pub struct FairnessState {
    pub segment: Segment,
    minutes: BTreeMap<PlayerId, u32>,
    targets: BTreeMap<PlayerId, f64>,
    category_counts: BTreeMap<Category, BTreeMap<PlayerId, u32>>,
    /// Minimum minutes across present, non-excused players.
    min_present_minutes: u32,
}

impl FairnessState {
    /// Derive the fairness snapshot for `segment` from committed history.
    pub fn compute(
        history: &[PlayRecord],
        roster: &Roster,
        segment: Segment,
        config: &FairnessConfig,
    ) -> Self {
        let mut minutes: BTreeMap<PlayerId, u32> = BTreeMap::new();
        let mut category_counts: BTreeMap<Category, BTreeMap<PlayerId, u32>> = BTreeMap::new();

        for record in history.iter().filter(|r| r.segment == segment) {
            *minutes.entry(record.player.clone()).or_insert(0) += 1;
            *category_counts
                .entry(record.position.category())
                .or_default()
                .entry(record.player.clone())
                .or_insert(0) += 1;
        }

        let mut targets = BTreeMap::new();
        for p in roster.players() {
            let base = f64::from(config.min_guarantee_series);
            let target = if p.is_varsity() {
                base * (1.0 - config.varsity_reduction)
            } else {
                base
            };
            targets.insert(p.id.clone(), target);
        }

        let min_present_minutes = roster
            .present_players()
            .filter(|p| !p.excused)
            .map(|p| minutes.get(&p.id).copied().unwrap_or(0))
            .min()
            .unwrap_or(0);

        FairnessState {
            segment,
            minutes,
            targets,
            category_counts,
            min_present_minutes,
        }
    }

    /// Committed series appearances for `player` in this segment.
    pub fn minutes(&self, player: &PlayerId) -> u32 {
        self.minutes.get(player).copied().unwrap_or(0)
    }

    /// The player's playtime target for this segment.
    pub fn target(&self, player: &PlayerId) -> f64 {
        self.targets.get(player).copied().unwrap_or(0.0)
    }

    /// Clamped shortfall against the target. Zero once the target is met.
    pub fn deficit(&self, player: &PlayerId) -> f64 {
        (self.target(player) - f64::from(self.minutes(player))).max(0.0)
    }

    /// Minimum minutes across present, non-excused players.
    pub fn min_present_minutes(&self) -> u32 {
        self.min_present_minutes
    }

    /// Whether assigning `player` one more series would put them more than
    /// `cap` appearances ahead of the least-used present player.
    pub fn violates_cap(&self, player: &PlayerId, cap: u32) -> bool {
        self.minutes(player) + 1 > self.min_present_minutes + cap
    }

    /// Max minus min minutes across present, non-excused players.
    pub fn spread(&self, roster: &Roster) -> u32 {
        let values: Vec<u32> = roster
            .present_players()
            .filter(|p| !p.excused)
            .map(|p| self.minutes(&p.id))
            .collect();
        match (values.iter().max(), values.iter().min()) {
            (Some(max), Some(min)) => max - min,
            _ => 0,
        }
    }

    /// Present, non-excused players still short of their target.
    pub fn below_guarantee(&self, roster: &Roster) -> Vec<PlayerId> {
        roster
            .present_players()
            .filter(|p| !p.excused)
            .filter(|p| self.deficit(&p.id) > 0.0)
            .map(|p| p.id.clone())
            .collect()
    }

    /// Appearances for `player` in `category`.
    pub fn category_count(&self, category: Category, player: &PlayerId) -> u32 {
        self.category_counts
            .get(&category)
            .and_then(|m| m.get(player))
            .copied()
            .unwrap_or(0)
    }

    /// Max minus min appearances in `category` across present, non-excused
    /// players who list a position of that category in their preferences.
    pub fn category_spread(&self, category: Category, roster: &Roster) -> u32 {
        let eligible: Vec<&Player> = roster
            .present_players()
            .filter(|p| !p.excused)
            .filter(|p| {
                p.prefs(self.segment)
                    .iter()
                    .any(|pos| pos.category() == category)
            })
            .collect();
        let values: Vec<u32> = eligible
            .iter()
            .map(|p| self.category_count(category, &p.id))
            .collect();
        match (values.iter().max(), values.iter().min()) {
            (Some(max), Some(min)) => max - min,
            _ => 0,
        }
    }
}
