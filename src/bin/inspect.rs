//! Inspect Tool - Print the derived timeline of one stored game
//!
//! Usage:
//!   cargo run --bin inspect -- pbp.db MISSING_e19f02
//!   cargo run --bin inspect -- pbp.db W20241105HAWOWL --json

use std::path::PathBuf;

use pbp_engine::{DerivedEvent, GameDatabase, GameStore};

fn main() {
    let config = InspectConfig::from_args();

    if config.show_help {
        print_help();
        return;
    }

    let Some(game_key) = config.game_key.as_deref() else {
        eprintln!("Missing game key\n");
        print_help();
        std::process::exit(2);
    };

    let db = match GameDatabase::open(&config.db_path) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Failed to open {}: {}", config.db_path.display(), e);
            std::process::exit(1);
        }
    };

    let game = match db.find_game_by_key(game_key) {
        Ok(Some(game)) => game,
        Ok(None) => {
            eprintln!("No game {} in {}", game_key, config.db_path.display());
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Lookup failed: {}", e);
            std::process::exit(1);
        }
    };

    let events = match db.load_derived_events(game_key) {
        Ok(events) => events,
        Err(e) => {
            eprintln!("Failed to load events: {}", e);
            std::process::exit(1);
        }
    };

    if config.json {
        match serde_json::to_string_pretty(&events) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("Failed to serialize events: {}", e),
        }
        return;
    }

    println!(
        "Game {} ({}, season {}){}",
        game.game_key,
        game.date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "no date".to_string()),
        game.season,
        if game.is_placeholder() { " [placeholder]" } else { "" }
    );
    println!("{} events\n", events.len());
    println!("{}", format_timeline(&events));
}

fn format_timeline(events: &[DerivedEvent]) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "{:>4} {:>2} {:>6} {:>8} {:>7} {:>5} {:>3} {:>5} {:>5}  {}\n",
        "seq", "P", "clock", "score", "run", "lead", "LC", "bonus", "TO", "description"
    ));
    output.push_str(&format!("{:-<100}\n", ""));

    for ev in events {
        let run = match ev.run_team {
            Some(side) => format!("{} {}", side.label(), ev.run_points),
            None => "-".to_string(),
        };
        let bonus = if ev.double_bonus {
            "2x"
        } else if ev.bonus {
            "1x"
        } else {
            ""
        };
        output.push_str(&format!(
            "{:>4} {:>2} {:>6.1} {:>8} {:>7} {:>5} {:>3} {:>5} {:>5}  {}\n",
            ev.seq,
            ev.period,
            ev.clock,
            format!("{}-{}", ev.home_score, ev.away_score),
            run,
            ev.leading_label(),
            ev.lead_changes,
            bonus,
            format!("{}/{}", ev.timeouts_remaining_home, ev.timeouts_remaining_away),
            ev.description
        ));
    }

    output
}

/// Configuration for the inspect tool
struct InspectConfig {
    db_path: PathBuf,
    game_key: Option<String>,
    json: bool,
    show_help: bool,
}

impl Default for InspectConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("pbp.db"),
            game_key: None,
            json: false,
            show_help: false,
        }
    }
}

impl InspectConfig {
    fn from_args() -> Self {
        let args: Vec<String> = std::env::args().collect();
        let mut config = Self::default();
        let mut positional = Vec::new();

        for arg in args.iter().skip(1) {
            match arg.as_str() {
                "--json" => config.json = true,
                "--help" | "-h" => config.show_help = true,
                arg if !arg.starts_with('-') => positional.push(arg.to_string()),
                _ => {}
            }
        }

        // One positional is the game key; two are db path then game key
        match positional.len() {
            0 => {}
            1 => config.game_key = positional.pop(),
            _ => {
                config.db_path = PathBuf::from(&positional[0]);
                config.game_key = Some(positional[1].clone());
            }
        }

        config
    }
}

fn print_help() {
    println!(
        r#"Inspect Tool - Print a stored game's derived timeline

USAGE:
    cargo run --bin inspect -- [DB_PATH] <GAME_KEY> [OPTIONS]

ARGUMENTS:
    DB_PATH             SQLite database path (default: pbp.db)
    GAME_KEY            Canonical game key

OPTIONS:
    --json              Print the derived rows as JSON
    --help, -h          Show this help
"#
    );
}
