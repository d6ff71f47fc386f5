// Rotation core: formations, fairness accounting, eligibility scoring, and
// the per-series assignment engine.

pub mod eligibility;
pub mod engine;
pub mod fairness;
pub mod formation;

pub use engine::{
    AssignRequest, Assignment, Diagnostic, Engine, EngineError, ObjectiveWeights, Relaxation,
    SeriesProposal, SolveStatus,
};
pub use fairness::{FairnessConfig, FairnessState};
pub use formation::{Formation, FormationSet, Slot, SlotId, SubFormation};
