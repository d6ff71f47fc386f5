// Roster domain: player attributes and CSV interchange.

pub mod csv_io;
pub mod player;

pub use player::{
    Category, Energy, Player, PlayerId, Position, Role, Roster, RosterError, Segment,
};
