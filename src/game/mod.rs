// Live game: the series state machine and the play-log / summary exports.

pub mod export;
pub mod state;

pub use state::{GameController, GameError, GamePhase, GameSummary, PlayRecord, SegmentSummary};
