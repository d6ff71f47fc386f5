// Per-series assignment engine.
//
// Exact path: a scored bipartite matching over free slots x available
// players, solved with Kuhn-Munkres. Falls back to a deterministic greedy
// pass (plus a feasibility-only repair matching) when the exact path is
// skipped, times out, or the instance has no complete matching.

use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

use pathfinding::kuhn_munkres::kuhn_munkres;
use pathfinding::matrix::Matrix;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::roster::{Player, PlayerId, Roster};
use crate::rotation::eligibility::Resolver;
use crate::rotation::fairness::FairnessState;
use crate::rotation::formation::{Formation, Slot, SlotId};

/// Matrix entries are scores scaled to integers, with a per-candidate
/// index penalty so score ties resolve toward the lowest player id.
const SCORE_SCALE: f64 = 1_000_000.0;

/// Sentinel for pairs the matching must not use.
const FORBIDDEN: i64 = -1_000_000_000_000;

/// Base weight for any legal edge in the repair matching, large enough that
/// maximizing total weight maximizes the number of filled slots first.
const REPAIR_BASE: i64 = 1_000_000;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("fixed pick: slot `{slot}` is not in the formation")]
    UnknownSlot { slot: SlotId },

    #[error("fixed pick: player `{player}` is not on the roster or not present")]
    UnknownPlayer { player: PlayerId },

    #[error("fixed pick: player `{player}` is not eligible for slot `{slot}`")]
    IneligibleFixedPick { slot: SlotId, player: PlayerId },

    #[error("fixed pick: player `{player}` is pinned to more than one slot")]
    DuplicateFixedPick { player: PlayerId },
}

// ---------------------------------------------------------------------------
// Objective / request / result types
// ---------------------------------------------------------------------------

/// Objective coefficients from strategy.toml. Fairness should dominate:
/// one unit of deficit must outweigh any strength plus preference edge.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObjectiveWeights {
    pub strength: f64,
    pub preference: f64,
    pub fairness: f64,
    pub pairing: f64,
}

/// Snapshot of everything one series assignment needs. The engine itself is
/// stateless; the game controller owns history and fairness derivation.
pub struct AssignRequest<'a> {
    pub roster: &'a Roster,
    pub formation: &'a Formation,
    pub fairness: &'a FairnessState,
    pub fixed_picks: &'a BTreeMap<SlotId, PlayerId>,
    pub objective: &'a ObjectiveWeights,
    pub evenness_cap: u32,
    pub time_budget: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SolveStatus {
    /// Exact matching over the full instance.
    Optimal,
    /// Greedy fallback produced the lineup.
    Heuristic,
    /// One or more slots had no legal candidate; the rest are filled.
    Infeasible,
}

/// A constraint the engine had to bend, itemized for the coach.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Relaxation {
    /// The player is placed despite exceeding the evenness cap.
    EvennessCap { slot: SlotId, player: PlayerId },
    /// The player landed on an open slot they did not list.
    OpenSlotPlacement { slot: SlotId, player: PlayerId },
    /// The exact solve overran its budget; the heuristic result was used.
    SolverTimeout,
}

/// Per-series lineup: one player per slot, each player at most once.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Assignment {
    picks: BTreeMap<SlotId, PlayerId>,
}

impl Assignment {
    pub fn picks(&self) -> &BTreeMap<SlotId, PlayerId> {
        &self.picks
    }

    pub fn player_for(&self, slot: &SlotId) -> Option<&PlayerId> {
        self.picks.get(slot)
    }

    pub fn slot_of(&self, player: &PlayerId) -> Option<&SlotId> {
        self.picks
            .iter()
            .find(|(_, p)| *p == player)
            .map(|(s, _)| s)
    }

    pub fn len(&self) -> usize {
        self.picks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.picks.is_empty()
    }

    pub(crate) fn set(&mut self, slot: SlotId, player: PlayerId) {
        self.picks.insert(slot, player);
    }
}

/// What the engine reports alongside the lineup.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub status: SolveStatus,
    pub relaxations: Vec<Relaxation>,
    /// Present, non-excused players still short of target after this series.
    pub below_guarantee: Vec<PlayerId>,
    /// Slots with no legal candidate this series.
    pub unfilled: Vec<SlotId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeriesProposal {
    pub assignment: Assignment,
    pub diagnostic: Diagnostic,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct Engine;

impl Engine {
    /// Produce a lineup proposal for one series. Fixed picks are validated
    /// and pinned before the search; everything else is filled by the exact
    /// path when possible, otherwise the greedy fallback.
    pub fn assign(req: &AssignRequest<'_>) -> Result<SeriesProposal, EngineError> {
        let resolver = Resolver::new(req.formation, req.roster, req.objective.pairing);

        let mut assignment = Assignment::default();
        let mut relaxations: Vec<Relaxation> = Vec::new();
        let mut pinned: BTreeSet<PlayerId> = BTreeSet::new();

        for (slot_id, player_id) in req.fixed_picks {
            let slot = req
                .formation
                .slot(slot_id)
                .ok_or_else(|| EngineError::UnknownSlot {
                    slot: slot_id.clone(),
                })?;
            let player = req
                .roster
                .get(player_id)
                .filter(|p| p.present)
                .ok_or_else(|| EngineError::UnknownPlayer {
                    player: player_id.clone(),
                })?;
            if !resolver.resolve(player, slot).eligible {
                return Err(EngineError::IneligibleFixedPick {
                    slot: slot_id.clone(),
                    player: player_id.clone(),
                });
            }
            if !pinned.insert(player_id.clone()) {
                return Err(EngineError::DuplicateFixedPick {
                    player: player_id.clone(),
                });
            }
            assignment.set(slot_id.clone(), player_id.clone());
        }

        let free_slots: Vec<&Slot> = req
            .formation
            .slots()
            .iter()
            .filter(|s| assignment.player_for(&s.id).is_none())
            .collect();

        // Sorted by id: every tie downstream resolves toward the lowest id.
        let mut candidates: Vec<&Player> = req
            .roster
            .present_players()
            .filter(|p| !pinned.contains(&p.id))
            .collect();
        candidates.sort_by(|a, b| a.id.cmp(&b.id));

        let mut status = SolveStatus::Heuristic;
        let mut chosen: Option<Vec<Option<usize>>> = None;

        let exact_viable = !free_slots.is_empty()
            && !req.time_budget.is_zero()
            && candidates.len() >= free_slots.len();
        if exact_viable {
            let start = Instant::now();
            let mut exact_relaxations = Vec::new();
            let result = Self::exact(
                &free_slots,
                &candidates,
                &resolver,
                req,
                &mut exact_relaxations,
            );
            if start.elapsed() > req.time_budget {
                debug!(
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "exact solve overran its budget, falling back to heuristic"
                );
                relaxations.push(Relaxation::SolverTimeout);
            } else if let Some(per_slot) = result {
                relaxations.append(&mut exact_relaxations);
                chosen = Some(per_slot);
                status = SolveStatus::Optimal;
            }
        }

        let per_slot = match chosen {
            Some(per_slot) => per_slot,
            None => Self::heuristic(&free_slots, &candidates, &resolver, req, &mut relaxations),
        };

        let mut unfilled: Vec<SlotId> = Vec::new();
        for (slot_idx, cand_idx) in per_slot.iter().enumerate() {
            let slot = free_slots[slot_idx];
            match cand_idx {
                Some(c) => {
                    let player = candidates[*c];
                    if slot.open
                        && player
                            .pref_weight(req.formation.segment, slot.position)
                            .is_none()
                    {
                        relaxations.push(Relaxation::OpenSlotPlacement {
                            slot: slot.id.clone(),
                            player: player.id.clone(),
                        });
                    }
                    assignment.set(slot.id.clone(), player.id.clone());
                }
                None => unfilled.push(slot.id.clone()),
            }
        }

        if !unfilled.is_empty() {
            status = SolveStatus::Infeasible;
        }

        // Deficits after a hypothetical commit of this lineup.
        let below_guarantee: Vec<PlayerId> = req
            .roster
            .present_players()
            .filter(|p| !p.excused)
            .filter(|p| {
                let played = assignment.slot_of(&p.id).is_some() as u32;
                let minutes_after = f64::from(req.fairness.minutes(&p.id) + played);
                req.fairness.target(&p.id) - minutes_after > 0.0
            })
            .map(|p| p.id.clone())
            .collect();

        Ok(SeriesProposal {
            assignment,
            diagnostic: Diagnostic {
                status,
                relaxations,
                below_guarantee,
                unfilled,
            },
        })
    }

    /// Scored entry for a legal pair, or None when hard-ineligible.
    fn score(
        resolver: &Resolver<'_>,
        req: &AssignRequest<'_>,
        player: &Player,
        slot: &Slot,
    ) -> Option<f64> {
        let fit = resolver.resolve(player, slot);
        if !fit.eligible {
            return None;
        }
        Some(
            req.objective.strength * f64::from(player.strength_index())
                + req.objective.preference * fit.pref_weight
                + fit.pairing_bonus
                + req.objective.fairness * req.fairness.deficit(&player.id),
        )
    }

    /// Exact matching. Tries a strict matrix (evenness-cap violations
    /// forbidden) first, then a cap-relaxed one; returns None when even the
    /// relaxed instance has no complete matching.
    fn exact(
        free_slots: &[&Slot],
        candidates: &[&Player],
        resolver: &Resolver<'_>,
        req: &AssignRequest<'_>,
        relaxations: &mut Vec<Relaxation>,
    ) -> Option<Vec<Option<usize>>> {
        let entry = |relax_cap: bool, slot_idx: usize, cand_idx: usize| -> i64 {
            let slot = free_slots[slot_idx];
            let player = candidates[cand_idx];
            let Some(score) = Self::score(resolver, req, player, slot) else {
                return FORBIDDEN;
            };
            if !relax_cap && req.fairness.violates_cap(&player.id, req.evenness_cap) {
                return FORBIDDEN;
            }
            (score * SCORE_SCALE).round() as i64 - cand_idx as i64
        };

        for relax_cap in [false, true] {
            let per_slot = km_match(free_slots.len(), candidates.len(), |s, c| {
                entry(relax_cap, s, c)
            });
            if per_slot.iter().all(|c| c.is_some()) {
                if relax_cap {
                    for (slot_idx, cand_idx) in per_slot.iter().enumerate() {
                        let Some(cand_idx) = *cand_idx else { continue };
                        let player = candidates[cand_idx];
                        if req.fairness.violates_cap(&player.id, req.evenness_cap) {
                            relaxations.push(Relaxation::EvennessCap {
                                slot: free_slots[slot_idx].id.clone(),
                                player: player.id.clone(),
                            });
                        }
                    }
                }
                return Some(per_slot);
            }
            if !relax_cap {
                debug!("no complete matching under the evenness cap, retrying relaxed");
            }
        }
        None
    }

    /// Greedy fallback: most-constrained slots first; per slot the highest
    /// deficit, then soft weight, then strength, then lowest id. A final
    /// feasibility-only matching repairs anything the greedy order
    /// dead-ended on.
    fn heuristic(
        free_slots: &[&Slot],
        candidates: &[&Player],
        resolver: &Resolver<'_>,
        req: &AssignRequest<'_>,
        relaxations: &mut Vec<Relaxation>,
    ) -> Vec<Option<usize>> {
        let mut per_slot: Vec<Option<usize>> = vec![None; free_slots.len()];
        let mut used: BTreeSet<usize> = BTreeSet::new();

        // Most-constrained first, formation order as tie-break.
        let mut order: Vec<usize> = (0..free_slots.len()).collect();
        let counts: Vec<usize> = free_slots
            .iter()
            .map(|slot| {
                candidates
                    .iter()
                    .filter(|p| resolver.resolve(p, slot).eligible)
                    .count()
            })
            .collect();
        order.sort_by_key(|&i| (counts[i], i));

        let pick_best = |pool: &[usize], slot: &Slot| -> Option<usize> {
            pool.iter()
                .copied()
                .max_by(|&a, &b| {
                    let pa = candidates[a];
                    let pb = candidates[b];
                    let key = |p: &Player| {
                        let fit = resolver.resolve(p, slot);
                        (req.fairness.deficit(&p.id), fit.weight(), p.strength_index())
                    };
                    let (da, wa, sa) = key(pa);
                    let (db, wb, sb) = key(pb);
                    da.total_cmp(&db)
                        .then(wa.total_cmp(&wb))
                        .then(sa.cmp(&sb))
                        // max_by picks the later element on Equal; compare ids
                        // reversed so the lowest id wins.
                        .then(pb.id.cmp(&pa.id))
                })
        };

        for &slot_idx in &order {
            let slot = free_slots[slot_idx];
            let eligible: Vec<usize> = (0..candidates.len())
                .filter(|i| !used.contains(i))
                .filter(|&i| resolver.resolve(candidates[i], slot).eligible)
                .collect();
            let within_cap: Vec<usize> = eligible
                .iter()
                .copied()
                .filter(|&i| !req.fairness.violates_cap(&candidates[i].id, req.evenness_cap))
                .collect();

            let (pool, relaxed) = if !within_cap.is_empty() {
                (within_cap, false)
            } else {
                (eligible, true)
            };
            if let Some(best) = pick_best(&pool, slot) {
                if relaxed {
                    relaxations.push(Relaxation::EvennessCap {
                        slot: slot.id.clone(),
                        player: candidates[best].id.clone(),
                    });
                }
                per_slot[slot_idx] = Some(best);
                used.insert(best);
            }
        }

        // Repair: a feasibility matching over what is left guarantees a full
        // lineup whenever one exists.
        let open_slots: Vec<usize> = (0..free_slots.len())
            .filter(|&i| per_slot[i].is_none())
            .collect();
        let free_cands: Vec<usize> = (0..candidates.len())
            .filter(|i| !used.contains(i))
            .collect();
        if !open_slots.is_empty() && !free_cands.is_empty() {
            let repaired = km_match(open_slots.len(), free_cands.len(), |s, c| {
                let slot = free_slots[open_slots[s]];
                let player = candidates[free_cands[c]];
                match Self::score(resolver, req, player, slot) {
                    Some(score) => {
                        let cap_ok =
                            !req.fairness.violates_cap(&player.id, req.evenness_cap);
                        REPAIR_BASE + i64::from(cap_ok) * 1_000 + (score as i64).min(999)
                    }
                    None => FORBIDDEN,
                }
            });
            for (i, cand) in repaired.iter().enumerate() {
                let Some(c) = cand else { continue };
                let slot_idx = open_slots[i];
                let cand_idx = free_cands[*c];
                let player = candidates[cand_idx];
                if req.fairness.violates_cap(&player.id, req.evenness_cap) {
                    relaxations.push(Relaxation::EvennessCap {
                        slot: free_slots[slot_idx].id.clone(),
                        player: player.id.clone(),
                    });
                }
                per_slot[slot_idx] = Some(cand_idx);
            }
        }

        per_slot
    }
}

/// Maximum-weight bipartite matching via Kuhn-Munkres, tolerant of either
/// side being larger. Returns the chosen candidate per slot; slots whose
/// best edge is the forbidden sentinel come back as None.
fn km_match(
    n_slots: usize,
    n_cands: usize,
    entry: impl Fn(usize, usize) -> i64,
) -> Vec<Option<usize>> {
    if n_slots == 0 || n_cands == 0 {
        return vec![None; n_slots];
    }
    if n_slots <= n_cands {
        let weights = Matrix::from_fn(n_slots, n_cands, |(s, c)| entry(s, c));
        let (_, assigned) = kuhn_munkres(&weights);
        assigned
            .iter()
            .enumerate()
            .map(|(s, &c)| (entry(s, c) != FORBIDDEN).then_some(c))
            .collect()
    } else {
        // More slots than candidates: match from the candidate side.
        let weights = Matrix::from_fn(n_cands, n_slots, |(c, s)| entry(s, c));
        let (_, assigned) = kuhn_munkres(&weights);
        let mut per_slot = vec![None; n_slots];
        for (c, &s) in assigned.iter().enumerate() {
            if entry(s, c) != FORBIDDEN {
                per_slot[s] = Some(c);
            }
        }
        per_slot
    }
}
