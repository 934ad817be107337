//! CLI entry point for Cryptic Crossings.
//!
//! Usage:
//!   cryptic-crossings levels
//!   cryptic-crossings solve (--level <n> | --words <A> <B> <C>) [--timeout <secs>]
//!   cryptic-crossings validate --level <n> S=9 E=5 ...
//!   cryptic-crossings cross --level <n> (<moves.json> | --stdin)
//!   cryptic-crossings play (<script.json> | --stdin) [--save-file <path> | --no-save]
//!
//! Global options:
//!   --levels <file>   Load levels from a JSON file instead of the built-in set
//!
//! Levels are numbered from 1 on the command line. Results are printed as
//! JSON on stdout; logs go to stderr (set RUST_LOG to see them).

use std::error::Error;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cryptic_crossings::progress::DEFAULT_SAVE_FILE;
use cryptic_crossings::puzzle::LetterDigit;
use cryptic_crossings::{
    validate, Assignment, CharacterId, Digit, Edit, JsonProgressFile, Letter, Level,
    LevelCatalog, MemoryProgress, ProgressStore, PuzzleSpec, RiverEngine, Session,
    SessionConfig, Solver, SolverConfig, SolverResult,
};

#[derive(Parser)]
#[command(name = "cryptic-crossings")]
#[command(about = "Cryptarithmetic puzzles that unlock river crossings")]
#[command(version)]
struct Cli {
    /// Level definitions (JSON array) to use instead of the built-in levels
    #[arg(long, global = true, value_name = "FILE")]
    levels: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the levels
    Levels,

    /// Solve a cryptarithmetic puzzle by exhaustive search
    Solve {
        /// Level number, starting at 1
        #[arg(long, conflicts_with = "words", required_unless_present = "words")]
        level: Option<usize>,

        /// The three words of OPERAND1 + OPERAND2 = RESULT
        #[arg(long, num_args = 3, value_names = ["OPERAND1", "OPERAND2", "RESULT"])]
        words: Option<Vec<String>>,

        /// Maximum search time in seconds
        #[arg(long, default_value = "15")]
        timeout: u64,
    },

    /// Check a letter assignment against a level's puzzle
    Validate {
        /// Level number, starting at 1
        #[arg(long, default_value = "1")]
        level: usize,

        /// Letter assignments
        #[arg(value_name = "LETTER=DIGIT")]
        pairs: Vec<LetterDigit>,
    },

    /// Replay river moves against a level's crossing
    Cross {
        /// Level number, starting at 1
        #[arg(long, default_value = "1")]
        level: usize,

        /// JSON array of moves (use --stdin to read from stdin)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,

        /// Read moves from stdin instead of a file
        #[arg(long)]
        stdin: bool,
    },

    /// Replay a whole session script: edits, validation and crossings
    Play {
        /// JSON array of steps (use --stdin to read from stdin)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,

        /// Read the script from stdin instead of a file
        #[arg(long)]
        stdin: bool,

        /// Where progress is kept
        #[arg(long, default_value = DEFAULT_SAVE_FILE)]
        save_file: PathBuf,

        /// Keep progress in memory only
        #[arg(long)]
        no_save: bool,
    },
}

/// One river move in a `cross` file.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum RiverAction {
    Board { id: CharacterId },
    Unboard { id: CharacterId },
    Toggle { id: CharacterId },
    Travel,
    Restart,
}

/// One step in a `play` script.
#[derive(Debug, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
enum ScriptStep {
    Set { letter: Letter, digit: Digit },
    Clear { letter: Letter },
    Reset,
    Hints,
    Reveal,
    Validate,
    Board { id: CharacterId },
    Unboard { id: CharacterId },
    Toggle { id: CharacterId },
    Travel,
    Restart,
    /// Fire the pending status check now instead of waiting for it.
    Check,
}

/// Output format for `solve`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SolveOutput<'a> {
    puzzle: &'a PuzzleSpec,
    solved: bool,
    #[serde(flatten)]
    result: &'a SolverResult,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Run a command. `Ok(false)` means the command worked but the answer is "no".
fn run(cli: Cli) -> Result<bool, Box<dyn Error>> {
    let catalog = match &cli.levels {
        Some(path) => LevelCatalog::load(path)?,
        None => LevelCatalog::builtin(),
    };

    match cli.command {
        Commands::Levels => {
            let levels: Vec<Value> = catalog
                .iter()
                .enumerate()
                .map(|(i, level)| level_json(i, level))
                .collect();
            print_json(&levels)?;
            Ok(true)
        }

        Commands::Solve {
            level,
            words,
            timeout,
        } => {
            let puzzle = match (level, words) {
                (Some(number), _) => find_level(&catalog, number)?.puzzle.clone(),
                (None, Some(words)) => {
                    let words: Vec<String> = words.iter().map(|w| w.to_uppercase()).collect();
                    PuzzleSpec::new([&words[0], &words[1], &words[2]].map(String::as_str))?
                }
                (None, None) => return Err("either --level or --words is required".into()),
            };
            let config = SolverConfig::with_timeout(Duration::from_secs(timeout));
            let result = Solver::new().solve_with(&puzzle, &config);
            print_json(&SolveOutput {
                puzzle: &puzzle,
                solved: result.solution.is_some(),
                result: &result,
            })?;
            Ok(result.solution.is_some())
        }

        Commands::Validate { level, pairs } => {
            let level = find_level(&catalog, level)?;
            let assignment: Assignment = pairs.iter().map(|p| (p.0, p.1)).collect();
            let output = match validate(&level.puzzle, &assignment) {
                Ok(verified) => json!({ "valid": true, "verified": verified }),
                Err(err) => json!({ "valid": false, "reason": err.to_string() }),
            };
            print_json(&output)?;
            Ok(output["valid"] == Value::Bool(true))
        }

        Commands::Cross { level, file, stdin } => {
            let level = find_level(&catalog, level)?;
            let actions: Vec<RiverAction> = serde_json::from_str(&read_input(file, stdin)?)?;
            let mut engine = RiverEngine::new(level.river);
            let mut rejected = Vec::new();

            for (index, action) in actions.iter().enumerate() {
                let outcome = match action {
                    RiverAction::Board { id } => engine.add_to_boat(*id),
                    RiverAction::Unboard { id } => engine.remove_from_boat(*id),
                    RiverAction::Toggle { id } => engine.toggle(*id).map(|_| ()),
                    RiverAction::Travel => engine.travel().map(|_| ()),
                    RiverAction::Restart => {
                        engine.restart();
                        Ok(())
                    }
                };
                if let Err(err) = outcome {
                    rejected.push(json!({ "move": index, "reason": err.to_string() }));
                }
            }

            print_json(&json!({
                "state": engine.snapshot(),
                "history": engine.history(),
                "rejected": rejected,
            }))?;
            Ok(engine.status() == cryptic_crossings::RiverStatus::Won)
        }

        Commands::Play {
            file,
            stdin,
            save_file,
            no_save,
        } => {
            let steps: Vec<ScriptStep> = serde_json::from_str(&read_input(file, stdin)?)?;
            if no_save {
                play(catalog, MemoryProgress::default(), &steps)
            } else {
                play(catalog, JsonProgressFile::new(save_file), &steps)
            }
        }
    }
}

fn play<P: ProgressStore>(
    catalog: LevelCatalog,
    store: P,
    steps: &[ScriptStep],
) -> Result<bool, Box<dyn Error>> {
    // Scripts fire checks explicitly, so there is nothing to wait for.
    let config = SessionConfig {
        status_check_delay: Duration::ZERO,
        ..Default::default()
    };
    let mut session = Session::new(catalog, store, config);
    let mut reports = Vec::with_capacity(steps.len());

    for step in steps {
        let report = match step {
            ScriptStep::Set { letter, digit } => json!(session.edit(Edit::Set {
                letter: *letter,
                digit: *digit
            })),
            ScriptStep::Clear { letter } => json!(session.edit(Edit::Clear { letter: *letter })),
            ScriptStep::Reset => json!(session.edit(Edit::Reset)),
            ScriptStep::Hints => json!(session.hints()),
            ScriptStep::Reveal => json!(session.reveal_solution()),
            ScriptStep::Validate => match session.validate() {
                Ok(verified) => json!({ "valid": true, "verified": verified }),
                Err(err) => json!({ "valid": false, "reason": err.to_string() }),
            },
            ScriptStep::Board { id } => result_json(session.add_to_boat(*id)),
            ScriptStep::Unboard { id } => result_json(session.remove_from_boat(*id)),
            ScriptStep::Toggle { id } => result_json(session.toggle(*id).map(|_| ())),
            ScriptStep::Travel => result_json(session.travel().map(|_| ())),
            ScriptStep::Restart => result_json(session.restart_river()),
            ScriptStep::Check => match session.pending_check() {
                Some(check) => json!(session.fire_status_check(check)),
                None => json!({ "outcome": "none_pending" }),
            },
        };
        reports.push(json!({ "step": format!("{step:?}"), "result": report }));
    }

    if let Err(err) = session.save_stats() {
        tracing::warn!("Failed to save session stats: {}", err);
    }

    print_json(&json!({
        "steps": reports,
        "level": session.level_index() + 1,
        "highestLevel": session.highest_level(),
        "unlocked": session.is_unlocked(),
        "river": session.river_snapshot(),
        "stats": session.stats(),
        "summary": session.stats().summary(),
    }))?;
    Ok(true)
}

fn result_json<E: std::fmt::Display>(result: Result<(), E>) -> Value {
    match result {
        Ok(()) => json!({ "ok": true }),
        Err(err) => json!({ "ok": false, "reason": err.to_string() }),
    }
}

fn level_json(index: usize, level: &Level) -> Value {
    json!({
        "number": index + 1,
        "name": level.name,
        "description": level.description,
        "puzzle": level.puzzle.equation(),
        "missionaries": level.river.missionaries,
        "cannibals": level.river.cannibals,
        "boatCapacity": level.river.capacity,
    })
}

fn find_level(catalog: &LevelCatalog, number: usize) -> Result<&Level, Box<dyn Error>> {
    let index = number
        .checked_sub(1)
        .ok_or("level numbers start at 1")?;
    Ok(catalog.level(index)?)
}

fn read_input(file: Option<PathBuf>, stdin: bool) -> Result<String, Box<dyn Error>> {
    if stdin {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else if let Some(path) = file {
        fs::read_to_string(&path).map_err(|e| format!("failed to read {path:?}: {e}").into())
    } else {
        Err("must provide either a file path or --stdin".into())
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
