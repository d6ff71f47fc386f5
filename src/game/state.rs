// Game state: the series lifecycle and the committed play log.
//
// The controller is the only writer of history. The engine is called with a
// fairness snapshot derived from committed records, so an uncommitted
// proposal never influences the next one.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::config::Strategy;
use crate::roster::{Category, PlayerId, Position, Roster, Segment};
use crate::rotation::eligibility::Resolver;
use crate::rotation::engine::{AssignRequest, Engine, EngineError, SeriesProposal};
use crate::rotation::fairness::FairnessState;
use crate::rotation::formation::{FormationSet, SlotId, SubFormation};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum GameError {
    #[error("cannot {action} in phase {phase:?}")]
    Phase {
        action: &'static str,
        phase: GamePhase,
    },

    #[error("invalid override: {reason}")]
    InvalidOverride { reason: String },

    #[error("player `{player}` is not on the roster")]
    UnknownPlayer { player: PlayerId },

    #[error(transparent)]
    Engine(#[from] EngineError),
}

// ---------------------------------------------------------------------------
// Core types
// ---------------------------------------------------------------------------

/// Where the game stands. Series numbers are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GamePhase {
    NotStarted,
    /// Between series: fixed picks may be staged, nothing is on the field.
    SeriesPending(u32),
    /// A proposal exists for this series and may still be overridden.
    SeriesActive(u32),
    Ended,
}

/// One committed appearance: a player held a slot for one series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayRecord {
    pub series: u32,
    pub slot: SlotId,
    pub player: PlayerId,
    pub position: Position,
    pub segment: Segment,
}

/// Per-segment rollup for the end-of-game summary.
#[derive(Debug, Clone, Serialize)]
pub struct SegmentSummary {
    pub appearances: BTreeMap<PlayerId, u32>,
    pub below_guarantee: Vec<PlayerId>,
    /// Max minus min series played across present, non-excused players.
    pub spread: u32,
    /// Per-category spread, keyed by category label.
    pub category_spread: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GameSummary {
    pub series_played: u32,
    pub offense: SegmentSummary,
    pub defense: SegmentSummary,
}

struct ActiveSeries {
    series: u32,
    segment: Segment,
    front: SubFormation,
    proposal: SeriesProposal,
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Drives a game series by series. Owns the roster, the committed history,
/// and the staged fixed picks; every lineup comes from [`Engine::assign`].
pub struct GameController {
    roster: Roster,
    formations: FormationSet,
    strategy: Strategy,
    front: SubFormation,
    phase: GamePhase,
    history: Vec<PlayRecord>,
    fixed_picks: BTreeMap<SlotId, PlayerId>,
    active: Option<ActiveSeries>,
}

impl GameController {
    pub fn new(roster: Roster, formations: FormationSet, strategy: Strategy) -> Self {
        GameController {
            roster,
            formations,
            strategy,
            front: SubFormation::FiveThree,
            phase: GamePhase::NotStarted,
            history: Vec::new(),
            fixed_picks: BTreeMap::new(),
            active: None,
        }
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn history(&self) -> &[PlayRecord] {
        &self.history
    }

    /// The defensive front used for the next defensive series.
    pub fn set_front(&mut self, front: SubFormation) {
        self.front = front;
    }

    /// Mark a player present/absent and excused between series. Absences
    /// take effect on the next generated series; committed history stands.
    pub fn set_availability(
        &mut self,
        player: &PlayerId,
        present: bool,
        excused: bool,
    ) -> Result<(), GameError> {
        let p = self
            .roster
            .get_mut(player)
            .ok_or_else(|| GameError::UnknownPlayer {
                player: player.clone(),
            })?;
        p.present = present;
        p.excused = excused;
        Ok(())
    }

    pub fn start_game(&mut self) -> Result<(), GameError> {
        if self.phase != GamePhase::NotStarted {
            return Err(GameError::Phase {
                action: "start the game",
                phase: self.phase,
            });
        }
        self.history.clear();
        self.phase = GamePhase::SeriesPending(1);
        info!(players = self.roster.len(), "game started");
        Ok(())
    }

    /// Stage a coach pick for the next generated series.
    pub fn set_fixed_pick(&mut self, slot: SlotId, player: PlayerId) -> Result<(), GameError> {
        let GamePhase::SeriesPending(_) = self.phase else {
            return Err(GameError::Phase {
                action: "stage a fixed pick",
                phase: self.phase,
            });
        };
        if self.roster.get(&player).is_none() {
            return Err(GameError::UnknownPlayer { player });
        }
        self.fixed_picks.insert(slot, player);
        Ok(())
    }

    pub fn clear_fixed_picks(&mut self) {
        self.fixed_picks.clear();
    }

    /// Generate the lineup proposal for the pending series. The proposal is
    /// uncommitted until [`end_series`](Self::end_series).
    pub fn generate_series(&mut self, segment: Segment) -> Result<&SeriesProposal, GameError> {
        let GamePhase::SeriesPending(series) = self.phase else {
            return Err(GameError::Phase {
                action: "generate a series",
                phase: self.phase,
            });
        };

        let formation = self.formations.formation(segment, self.front);
        let fairness = FairnessState::compute(
            &self.history,
            &self.roster,
            segment,
            &self.strategy.fairness,
        );
        let proposal = Engine::assign(&AssignRequest {
            roster: &self.roster,
            formation,
            fairness: &fairness,
            fixed_picks: &self.fixed_picks,
            objective: &self.strategy.objective,
            evenness_cap: self.strategy.fairness.evenness_cap,
            time_budget: self.strategy.time_budget(),
        })?;

        info!(
            series,
            segment = segment.display_str(),
            status = ?proposal.diagnostic.status,
            unfilled = proposal.diagnostic.unfilled.len(),
            "series proposal generated"
        );
        let active = self.active.insert(ActiveSeries {
            series,
            segment,
            front: self.front,
            proposal,
        });
        self.phase = GamePhase::SeriesActive(series);
        Ok(&active.proposal)
    }

    /// The uncommitted proposal for the active series, if any.
    pub fn proposal(&self) -> Option<&SeriesProposal> {
        self.active.as_ref().map(|a| &a.proposal)
    }

    /// Manual override on the active proposal. Revalidates hard eligibility
    /// and within-series uniqueness; soft preferences are the coach's call.
    pub fn change_slot(&mut self, slot: &SlotId, player: &PlayerId) -> Result<(), GameError> {
        let GamePhase::SeriesActive(_) = self.phase else {
            return Err(GameError::Phase {
                action: "override a slot",
                phase: self.phase,
            });
        };
        let active = match self.active.as_mut() {
            Some(a) => a,
            None => {
                return Err(GameError::Phase {
                    action: "override a slot",
                    phase: self.phase,
                })
            }
        };

        let formation = self.formations.formation(active.segment, active.front);
        let Some(slot_def) = formation.slot(slot) else {
            return Err(GameError::InvalidOverride {
                reason: format!(
                    "no slot `{}` in the {} formation",
                    slot,
                    active.segment.display_str()
                ),
            });
        };
        let Some(p) = self.roster.get(player).filter(|p| p.present) else {
            return Err(GameError::InvalidOverride {
                reason: format!("player `{}` is not available", player),
            });
        };

        let resolver = Resolver::new(formation, &self.roster, self.strategy.objective.pairing);
        if !resolver.resolve(p, slot_def).eligible {
            return Err(GameError::InvalidOverride {
                reason: format!("player `{}` is not eligible for slot `{}`", player, slot),
            });
        }
        if let Some(held) = active.proposal.assignment.slot_of(player) {
            if held != slot {
                return Err(GameError::InvalidOverride {
                    reason: format!("player `{}` already holds slot `{}`", player, held),
                });
            }
        }

        active.proposal.assignment.set(slot.clone(), player.clone());
        Ok(())
    }

    /// Commit the active proposal to history and advance. All-or-nothing:
    /// either every filled slot becomes a record or none do.
    pub fn end_series(&mut self) -> Result<(), GameError> {
        let GamePhase::SeriesActive(series) = self.phase else {
            return Err(GameError::Phase {
                action: "end the series",
                phase: self.phase,
            });
        };
        let active = match self.active.take() {
            Some(a) => a,
            None => {
                return Err(GameError::Phase {
                    action: "end the series",
                    phase: self.phase,
                })
            }
        };

        let formation = self.formations.formation(active.segment, active.front);
        let mut records = Vec::with_capacity(active.proposal.assignment.len());
        for (slot_id, player_id) in active.proposal.assignment.picks() {
            let position = match formation.slot(slot_id) {
                Some(s) => s.position,
                None => {
                    return Err(GameError::InvalidOverride {
                        reason: format!(
                            "no slot `{}` in the {} formation",
                            slot_id,
                            active.segment.display_str()
                        ),
                    })
                }
            };
            records.push(PlayRecord {
                series,
                slot: slot_id.clone(),
                player: player_id.clone(),
                position,
                segment: active.segment,
            });
        }
        self.history.extend(records);
        self.fixed_picks.clear();
        self.phase = GamePhase::SeriesPending(series + 1);
        info!(series, "series committed");
        Ok(())
    }

    /// Drop the last committed series from history.
    pub fn undo_series(&mut self) -> Result<(), GameError> {
        let GamePhase::SeriesPending(next) = self.phase else {
            return Err(GameError::Phase {
                action: "undo a series",
                phase: self.phase,
            });
        };
        if next <= 1 {
            return Err(GameError::Phase {
                action: "undo a series",
                phase: self.phase,
            });
        }
        let last = next - 1;
        self.history.retain(|r| r.series != last);
        self.phase = GamePhase::SeriesPending(last);
        info!(series = last, "series undone");
        Ok(())
    }

    /// Terminal. Any uncommitted proposal is discarded.
    pub fn end_game(&mut self) -> Result<GameSummary, GameError> {
        let series_played = match self.phase {
            GamePhase::SeriesPending(n) => n - 1,
            GamePhase::SeriesActive(n) => n - 1,
            _ => {
                return Err(GameError::Phase {
                    action: "end the game",
                    phase: self.phase,
                })
            }
        };
        self.active = None;
        self.fixed_picks.clear();
        self.phase = GamePhase::Ended;

        Ok(GameSummary {
            series_played,
            offense: self.segment_summary(Segment::Offense),
            defense: self.segment_summary(Segment::Defense),
        })
    }

    fn segment_summary(&self, segment: Segment) -> SegmentSummary {
        let fairness = FairnessState::compute(
            &self.history,
            &self.roster,
            segment,
            &self.strategy.fairness,
        );

        let appearances: BTreeMap<PlayerId, u32> = self
            .roster
            .players()
            .iter()
            .map(|p| (p.id.clone(), fairness.minutes(&p.id)))
            .collect();

        let categories: BTreeSet<Category> = self
            .roster
            .players()
            .iter()
            .flat_map(|p| p.prefs(segment).iter().map(|pos| pos.category()))
            .collect();
        let category_spread: BTreeMap<String, u32> = categories
            .into_iter()
            .map(|c| {
                (
                    c.display_str().to_string(),
                    fairness.category_spread(c, &self.roster),
                )
            })
            .collect();

        SegmentSummary {
            appearances,
            below_guarantee: fairness.below_guarantee(&self.roster),
            spread: fairness.spread(&self.roster),
            category_spread,
        }
    }
}
