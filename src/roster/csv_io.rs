// Roster CSV import/export.
//
// Import is forgiving about column naming (coach spreadsheets arrive with
// "offense 1" or "RoleToday" style headers) but strict about cell values:
// an unknown position, role, or energy label is an error with a row number
// rather than a silent default.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use tracing::warn;

use crate::roster::player::{
    normalize_name, Energy, Player, PlayerId, Position, Role, Roster, RosterError, Segment,
};

const OFF_COLUMNS: [&str; 4] = ["Off1", "Off2", "Off3", "Off4"];
const DEF_COLUMNS: [&str; 4] = ["Def1", "Def2", "Def3", "Def4"];

/// Map a raw header cell to its canonical column name.
fn canonical_header(raw: &str) -> Option<&'static str> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "id" => Some("id"),
        "name" => Some("Name"),
        "off1" | "offense 1" => Some("Off1"),
        "off2" | "offense 2" => Some("Off2"),
        "off3" | "offense 3" => Some("Off3"),
        "off4" | "offense 4" => Some("Off4"),
        "def1" | "defense 1" => Some("Def1"),
        "def2" | "defense 2" => Some("Def2"),
        "def3" | "defense 3" => Some("Def3"),
        "def4" | "defense 4" => Some("Def4"),
        "role" | "roletoday" | "role today" => Some("Role"),
        "energy" | "energytoday" | "energy today" => Some("Energy"),
        "varsity" | "varsity minutes" | "varsity_minutes" => Some("Varsity"),
        "present" => Some("Present"),
        "excused" => Some("Excused"),
        _ => None,
    }
}

/// Stable id derived from the player's name when the sheet has no id column.
fn derive_id(name: &str, taken: &HashSet<String>) -> String {
    let slug: String = name
        .to_ascii_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    let base = slug
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    let base = if base.is_empty() {
        "player".to_string()
    } else {
        base
    };
    if !taken.contains(&base) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{base}-{n}");
        if !taken.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

fn parse_flag(value: &str, row: usize, field: &str, default: bool) -> Result<bool, RosterError> {
    match value.to_ascii_lowercase().as_str() {
        "" => Ok(default),
        "1" | "true" | "yes" | "y" => Ok(true),
        "0" | "false" | "no" | "n" => Ok(false),
        _ => Err(RosterError::UnknownValue {
            row,
            field: field.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Parse a roster CSV. The `Name` column is required; everything else is
/// optional with sensible defaults. Rows with an empty name are skipped.
pub fn read_roster<R: Read>(rdr: R) -> Result<Roster, RosterError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(rdr);

    let mut columns: HashMap<&'static str, usize> = HashMap::new();
    for (i, header) in reader.headers()?.iter().enumerate() {
        if let Some(canonical) = canonical_header(header) {
            columns.entry(canonical).or_insert(i);
        }
    }
    if !columns.contains_key("Name") {
        return Err(RosterError::MissingColumn {
            column: "Name".to_string(),
        });
    }

    let mut players = Vec::new();
    let mut taken_ids: HashSet<String> = HashSet::new();

    for (idx, result) in reader.records().enumerate() {
        let record = result?;
        // 1-based data row, counting the header line.
        let row = idx + 2;
        let cell = |key: &str| -> &str {
            columns
                .get(key)
                .and_then(|&i| record.get(i))
                .unwrap_or("")
                .trim()
        };

        let name = normalize_name(cell("Name"));
        if name.is_empty() {
            warn!(row, "skipping roster row with an empty name");
            continue;
        }

        let prefs_for = |segment: Segment,
                             keys: &[&str; 4]|
         -> Result<Vec<Position>, RosterError> {
            let mut prefs = Vec::new();
            for key in keys {
                let value = cell(key);
                if value.is_empty() {
                    continue;
                }
                let position = Position::from_str_pos(value)
                    .filter(|p| p.segment() == segment)
                    .ok_or_else(|| RosterError::UnknownValue {
                        row,
                        field: key.to_string(),
                        value: value.to_string(),
                    })?;
                if prefs.contains(&position) {
                    warn!(row, position = %position, "ignoring duplicate preference");
                    continue;
                }
                prefs.push(position);
            }
            Ok(prefs)
        };
        let offense_prefs = prefs_for(Segment::Offense, &OFF_COLUMNS)?;
        let defense_prefs = prefs_for(Segment::Defense, &DEF_COLUMNS)?;

        let role = match cell("Role") {
            "" => Role::Connector,
            value => Role::from_str_role(value).ok_or_else(|| RosterError::UnknownValue {
                row,
                field: "Role".to_string(),
                value: value.to_string(),
            })?,
        };
        let energy = match cell("Energy") {
            "" => Energy::Medium,
            value => Energy::from_str_energy(value).ok_or_else(|| RosterError::UnknownValue {
                row,
                field: "Energy".to_string(),
                value: value.to_string(),
            })?,
        };
        let varsity_minutes = match cell("Varsity") {
            "" => 0,
            value => value.parse::<u32>().map_err(|_| RosterError::UnknownValue {
                row,
                field: "Varsity".to_string(),
                value: value.to_string(),
            })?,
        };
        let present = parse_flag(cell("Present"), row, "Present", true)?;
        let excused = parse_flag(cell("Excused"), row, "Excused", false)?;

        let id = match cell("id") {
            "" => derive_id(&name, &taken_ids),
            explicit => explicit.to_string(),
        };
        taken_ids.insert(id.clone());

        players.push(Player {
            id: PlayerId::new(id),
            name,
            offense_prefs,
            defense_prefs,
            role,
            energy,
            varsity_minutes,
            present,
            excused,
        });
    }

    Roster::from_players(players)
}

/// Load a roster from a CSV file.
pub fn load_roster(path: &Path) -> Result<Roster, RosterError> {
    read_roster(File::open(path)?)
}

/// Write a roster in the canonical column layout. Lossless: reading the
/// output reproduces the same roster.
pub fn write_roster<W: Write>(out: W, roster: &Roster) -> Result<(), RosterError> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record([
        "id", "Name", "Off1", "Off2", "Off3", "Off4", "Def1", "Def2", "Def3", "Def4", "Role",
        "Energy", "Varsity", "Present", "Excused",
    ])?;
    for p in roster.players() {
        let pref = |prefs: &[Position], i: usize| -> &str {
            prefs.get(i).map(|p| p.display_str()).unwrap_or("")
        };
        writer.write_record([
            p.id.as_str(),
            &p.name,
            pref(&p.offense_prefs, 0),
            pref(&p.offense_prefs, 1),
            pref(&p.offense_prefs, 2),
            pref(&p.offense_prefs, 3),
            pref(&p.defense_prefs, 0),
            pref(&p.defense_prefs, 1),
            pref(&p.defense_prefs, 2),
            pref(&p.defense_prefs, 3),
            p.role.display_str(),
            p.energy.display_str(),
            &p.varsity_minutes.to_string(),
            if p.present { "true" } else { "false" },
            if p.excused { "true" } else { "false" },
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Save a roster to a CSV file.
pub fn save_roster(path: &Path, roster: &Roster) -> Result<(), RosterError> {
    write_roster(File::create(path)?, roster)
}
