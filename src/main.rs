// Rotation assistant entry point.
//
// Builds a full-game rotation plan from a roster CSV: one engine-generated
// lineup per series, committed in order, then exported as a printable
// play-log CSV and a summary JSON.

use std::path::PathBuf;

use anyhow::{bail, Context};
use tracing::{info, warn};

use rotation_assistant::config;
use rotation_assistant::game::export;
use rotation_assistant::game::state::GameController;
use rotation_assistant::roster::csv_io;
use rotation_assistant::roster::Segment;
use rotation_assistant::rotation::formation::SubFormation;

/// How series alternate between the segments.
#[derive(Debug, Clone, Copy)]
enum SegmentMode {
    /// Odd series on offense, even on defense.
    Alternate,
    Fixed(Segment),
}

#[derive(Debug)]
struct Args {
    roster: PathBuf,
    series: Option<u32>,
    segment: SegmentMode,
    front: Option<SubFormation>,
    out: PathBuf,
}

const USAGE: &str = "\
Usage: rotations --roster <roster.csv> [options]

Options:
  --roster <path>     Roster CSV (required)
  --series <n>        Number of series to plan (default: game.total_series)
  --segment <mode>    offense | defense | alternate (default: alternate)
  --front <front>     Defensive front: 5-3 | 4-4 (default: 5-3)
  --out <dir>         Output directory (default: out)
  -h, --help          Show this help
";

fn parse_args(mut argv: impl Iterator<Item = String>) -> anyhow::Result<Args> {
    let mut roster = None;
    let mut series = None;
    let mut segment = SegmentMode::Alternate;
    let mut front = None;
    let mut out = PathBuf::from("out");

    while let Some(arg) = argv.next() {
        match arg.as_str() {
            "--roster" => {
                let value = argv.next().context("--roster requires a path")?;
                roster = Some(PathBuf::from(value));
            }
            "--series" => {
                let value = argv.next().context("--series requires a number")?;
                series = Some(
                    value
                        .parse::<u32>()
                        .with_context(|| format!("invalid series count `{value}`"))?,
                );
            }
            "--segment" => {
                let value = argv.next().context("--segment requires a mode")?;
                segment = match value.to_ascii_lowercase().as_str() {
                    "alternate" => SegmentMode::Alternate,
                    other => match Segment::from_str_seg(other) {
                        Some(s) => SegmentMode::Fixed(s),
                        None => bail!("unknown segment mode `{value}`"),
                    },
                };
            }
            "--front" => {
                let value = argv.next().context("--front requires a value")?;
                front = Some(
                    SubFormation::from_str_sub(&value)
                        .with_context(|| format!("unknown defensive front `{value}`"))?,
                );
            }
            "--out" => {
                let value = argv.next().context("--out requires a path")?;
                out = PathBuf::from(value);
            }
            "-h" | "--help" => {
                print!("{USAGE}");
                std::process::exit(0);
            }
            other => bail!("unknown argument `{other}`\n\n{USAGE}"),
        }
    }

    let Some(roster) = roster else {
        bail!("--roster is required\n\n{USAGE}");
    };
    Ok(Args {
        roster,
        series,
        segment,
        front,
        out,
    })
}

fn main() -> anyhow::Result<()> {
    init_tracing()?;
    let args = parse_args(std::env::args().skip(1))?;

    let cfg = config::load_config().context("failed to load configuration")?;
    let mut strategy = cfg.strategy;
    if let Some(n) = args.series {
        strategy.game.total_series = n;
    }

    let roster = csv_io::load_roster(&args.roster)
        .with_context(|| format!("failed to load roster from {}", args.roster.display()))?;
    info!(
        players = roster.len(),
        present = roster.present_players().count(),
        "roster loaded"
    );

    let total_series = strategy.game.total_series;
    let mut game = GameController::new(roster, cfg.formations, strategy);
    if let Some(front) = args.front {
        game.set_front(front);
    }

    game.start_game()?;
    for series in 1..=total_series {
        let segment = match args.segment {
            SegmentMode::Alternate => {
                if series % 2 == 1 {
                    Segment::Offense
                } else {
                    Segment::Defense
                }
            }
            SegmentMode::Fixed(s) => s,
        };

        let (assignment, diagnostic) = {
            let proposal = game.generate_series(segment)?;
            (proposal.assignment.clone(), proposal.diagnostic.clone())
        };
        info!(
            series,
            segment = segment.display_str(),
            status = ?diagnostic.status,
            "series planned"
        );
        for relaxation in &diagnostic.relaxations {
            warn!(series, relaxation = ?relaxation, "constraint relaxed");
        }
        for slot in &diagnostic.unfilled {
            warn!(series, slot = %slot, "no legal candidate for slot");
        }

        println!("Series {series} ({})", segment.display_str());
        for (slot, player) in assignment.picks() {
            let name = game
                .roster()
                .get(player)
                .map(|p| p.name.as_str())
                .unwrap_or(player.as_str());
            println!("  {:<4} {}", slot.as_str(), name);
        }
        game.end_series()?;
    }

    let summary = game.end_game()?;
    println!();
    println!(
        "Played {} series. Spread: offense {}, defense {}.",
        summary.series_played, summary.offense.spread, summary.defense.spread
    );
    if !summary.offense.below_guarantee.is_empty() || !summary.defense.below_guarantee.is_empty() {
        warn!(
            offense = summary.offense.below_guarantee.len(),
            defense = summary.defense.below_guarantee.len(),
            "players finished below the minimum guarantee"
        );
    }

    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("failed to create output directory {}", args.out.display()))?;
    let play_log = args.out.join("play_log.csv");
    let summary_path = args.out.join("summary.json");
    export::export_play_log(&play_log, game.history(), game.roster())
        .context("failed to write play log")?;
    export::export_summary(&summary_path, &summary).context("failed to write summary")?;

    info!(
        play_log = %play_log.display(),
        summary = %summary_path.display(),
        series = summary.series_played,
        "rotation plan written"
    );
    Ok(())
}

fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("rotation_assistant=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
