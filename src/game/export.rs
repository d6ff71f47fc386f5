// Exports: the printable play-log CSV and the end-of-game summary JSON.

use std::fs::File;
use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::game::state::{GameSummary, PlayRecord};
use crate::roster::Roster;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Write the committed history as a printable sideline sheet: one block per
/// series with a title row, a header, and Slot,Player rows.
pub fn write_play_log<W: io::Write>(
    out: W,
    history: &[PlayRecord],
    roster: &Roster,
) -> Result<(), ExportError> {
    // Blocks have a one-field title row, so the writer must be flexible.
    let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(out);

    let mut current: Option<u32> = None;
    for record in history {
        if current != Some(record.series) {
            if current.is_some() {
                writer.write_record([""])?;
            }
            writer.write_record([format!(
                "Series {} ({})",
                record.series,
                record.segment.display_str()
            )])?;
            writer.write_record(["Slot", "Player"])?;
            current = Some(record.series);
        }
        let name = roster
            .get(&record.player)
            .map(|p| p.name.as_str())
            .unwrap_or_else(|| record.player.as_str());
        writer.write_record([record.slot.as_str(), name])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn export_play_log(
    path: &Path,
    history: &[PlayRecord],
    roster: &Roster,
) -> Result<(), ExportError> {
    write_play_log(File::create(path)?, history, roster)
}

#[derive(Serialize)]
struct SummaryDocument<'a> {
    generated_at: DateTime<Utc>,
    #[serde(flatten)]
    summary: &'a GameSummary,
}

/// Write the end-of-game summary as pretty JSON, stamped with the export time.
pub fn write_summary<W: io::Write>(out: W, summary: &GameSummary) -> Result<(), ExportError> {
    serde_json::to_writer_pretty(
        out,
        &SummaryDocument {
            generated_at: Utc::now(),
            summary,
        },
    )?;
    Ok(())
}

pub fn export_summary(path: &Path, summary: &GameSummary) -> Result<(), ExportError> {
    write_summary(File::create(path)?, summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::SegmentSummary;
    use crate::roster::{Energy, Player, PlayerId, Position, Role};
    use crate::rotation::formation::SlotId;
    use std::collections::BTreeMap;

    fn roster() -> Roster {
        Roster::from_players(vec![
            Player {
                id: PlayerId::new("p1"),
                name: "Avery Ngata".to_string(),
                offense_prefs: vec![Position::Quarterback],
                defense_prefs: vec![Position::Safety],
                role: Role::Connector,
                energy: Energy::Medium,
                varsity_minutes: 0,
                present: true,
                excused: false,
            },
            Player {
                id: PlayerId::new("p2"),
                name: "Sam Okafor".to_string(),
                offense_prefs: vec![Position::WideReceiver],
                defense_prefs: vec![Position::LeftCorner],
                role: Role::Driver,
                energy: Energy::High,
                varsity_minutes: 0,
                present: true,
                excused: false,
            },
        ])
        .unwrap()
    }

    fn record(series: u32, slot: &str, pid: &str, position: Position) -> PlayRecord {
        PlayRecord {
            series,
            slot: SlotId::new(slot),
            player: PlayerId::new(pid),
            position,
            segment: position.segment(),
        }
    }

    #[test]
    fn play_log_groups_records_into_series_blocks() {
        let history = vec![
            record(1, "QB", "p1", Position::Quarterback),
            record(1, "WR", "p2", Position::WideReceiver),
            record(2, "S", "p1", Position::Safety),
        ];

        let mut buf = Vec::new();
        write_play_log(&mut buf, &history, &roster()).unwrap();
        let text = String::from_utf8(buf).unwrap();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Series 1 (Offense)");
        assert_eq!(lines[1], "Slot,Player");
        assert_eq!(lines[2], "QB,Avery Ngata");
        assert_eq!(lines[3], "WR,Sam Okafor");
        assert_eq!(lines[4], "");
        assert_eq!(lines[5], "Series 2 (Defense)");
        assert_eq!(lines[6], "Slot,Player");
        assert_eq!(lines[7], "S,Avery Ngata");
    }

    #[test]
    fn play_log_falls_back_to_the_id_for_unknown_players() {
        let history = vec![record(1, "QB", "ghost", Position::Quarterback)];
        let mut buf = Vec::new();
        write_play_log(&mut buf, &history, &roster()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("QB,ghost"));
    }

    #[test]
    fn empty_history_produces_an_empty_log() {
        let mut buf = Vec::new();
        write_play_log(&mut buf, &[], &roster()).unwrap();
        assert!(buf.is_empty());
    }

    #[test]
    fn summary_json_carries_a_timestamp_and_the_rollups() {
        let mut appearances = BTreeMap::new();
        appearances.insert(PlayerId::new("p1"), 3u32);
        appearances.insert(PlayerId::new("p2"), 2u32);

        let segment = SegmentSummary {
            appearances,
            below_guarantee: vec![PlayerId::new("p2")],
            spread: 1,
            category_spread: BTreeMap::from([("QB".to_string(), 1u32)]),
        };
        let summary = GameSummary {
            series_played: 5,
            offense: segment.clone(),
            defense: SegmentSummary {
                appearances: BTreeMap::new(),
                below_guarantee: vec![],
                spread: 0,
                category_spread: BTreeMap::new(),
            },
        };

        let mut buf = Vec::new();
        write_summary(&mut buf, &summary).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();

        assert!(value.get("generated_at").is_some());
        assert_eq!(value["series_played"], 5);
        assert_eq!(value["offense"]["appearances"]["p1"], 3);
        assert_eq!(value["offense"]["below_guarantee"][0], "p2");
        assert_eq!(value["offense"]["spread"], 1);
        assert_eq!(value["offense"]["category_spread"]["QB"], 1);
        assert_eq!(value["defense"]["spread"], 0);
    }
}
