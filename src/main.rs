/// Headless runner.
///
/// ```text
/// tworld-run play <level> [moves]             play a move string, print the result
/// tworld-run replay <level> <tws> <number>    replay a solution from a .tws file
/// tworld-run list                             list embedded and directory levels
/// ```
///
/// `<level>` is a text level file, a name in the levels directory, or an
/// embedded level name. Each move character is one tick of held input:
/// `N` `W` `S` `E`, or `.` for none. Once the moves run out the level keeps
/// stepping without input until it ends or `max_ticks` is reached.
/// Log output goes to stderr; `RUST_LOG` overrides the default `warn` filter.

use std::error::Error;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use log::warn;

use tworld::config::{RngKind, RunConfig};
use tworld::domain::dir::DirMask;
use tworld::domain::entity::Entity;
use tworld::domain::grid::{GRID_HEIGHT, GRID_WIDTH};
use tworld::domain::rng::Randomness;
use tworld::sim::level::{char_for_tile, embedded_level, embedded_levels, load_from_directory, parse_level};
use tworld::sim::replay::{self, SolutionFile};
use tworld::{Level, LevelData};

type CliResult = Result<(), Box<dyn Error>>;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play a level with a move string and print how it ended
    Play {
        /// Level file, levels-directory name or embedded name
        level: String,
        /// One character per tick: N, W, S, E or `.`
        #[arg(default_value = "")]
        moves: String,
    },
    /// Replay a recorded solution
    Replay {
        level: String,
        /// `.tws` solution file
        solution: PathBuf,
        /// Level number inside the solution file
        number: u16,
    },
    /// List embedded and directory levels
    List,
}

/// Route `log` records to stderr at `warn` unless `RUST_LOG` says otherwise.
fn init_logging() {
    let env = env_logger::Env::default().default_filter_or("warn");
    // already set up when called twice, as in tests
    let _ = env_logger::Builder::from_env(env).try_init();
}

fn main() {
    init_logging();

    let cli = Cli::parse();
    let config = RunConfig::load();

    let result = match &cli.command {
        Command::Play { level, moves } => run_moves(level, moves, &config),
        Command::Replay { level, solution, number } => run_replay(level, solution, *number, &config),
        Command::List => {
            list_levels(&config);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn list_levels(config: &RunConfig) {
    for (name, _) in embedded_levels() {
        println!("{name}  (embedded)");
    }
    for (name, data) in load_from_directory(&config.levels_dir) {
        println!("{name}  {}", data.title);
    }
}

fn load_level(name: &str, config: &RunConfig) -> Result<LevelData, Box<dyn Error>> {
    let path = Path::new(name);
    if path.is_file() {
        return Ok(parse_level(&std::fs::read_to_string(path)?)?);
    }
    let in_dir = config.levels_dir.join(format!("{name}.txt"));
    if in_dir.is_file() {
        return Ok(parse_level(&std::fs::read_to_string(in_dir)?)?);
    }
    match embedded_level(name) {
        Some(text) => Ok(parse_level(text)?),
        None => Err(format!("no level named {name:?}").into()),
    }
}

fn parse_moves(moves: &str) -> Result<Vec<DirMask>, Box<dyn Error>> {
    moves
        .chars()
        .map(|ch| match ch.to_ascii_uppercase() {
            'N' => Ok(DirMask::NORTH),
            'W' => Ok(DirMask::WEST),
            'S' => Ok(DirMask::SOUTH),
            'E' => Ok(DirMask::EAST),
            '.' => Ok(DirMask::NONE),
            other => Err(format!("bad move character {other:?}").into()),
        })
        .collect()
}

// ══════════════════════════════════════════════════════════════
// Modes
// ══════════════════════════════════════════════════════════════

fn run_moves(name: &str, moves: &str, config: &RunConfig) -> CliResult {
    let data = load_level(name, config)?;
    let moves = parse_moves(moves)?;
    let engine = &config.engine;
    match engine.rng {
        RngKind::Legacy => {
            let level = Level::legacy(&data, engine.seed).with_conditions(engine.conditions);
            play(level, &data, &moves, config.max_ticks)
        }
        #[cfg(feature = "system-rng")]
        RngKind::System => {
            let rng = tworld::domain::rng::SystemRng::seeded(engine.seed as u64);
            let level = Level::new(&data, rng).with_conditions(engine.conditions);
            play(level, &data, &moves, config.max_ticks)
        }
        #[cfg(not(feature = "system-rng"))]
        RngKind::System => Err("built without the system-rng feature".into()),
    }
}

fn play<R: Randomness>(mut level: Level<R>, data: &LevelData, moves: &[DirMask], max_ticks: u32) -> CliResult {
    if let Err(e) = level.init() {
        warn!("{}: {e}", data.title);
    }
    if level.actor_count() == 0 {
        return Err("level has no player".into());
    }

    let mut inputs = moves.iter().copied();
    while !level.is_game_over() && level.current_time() < max_ticks {
        level.set_input(inputs.next().unwrap_or(DirMask::NONE));
        level.step();
    }

    print_board(&level);
    println!("{}: {} after {} ticks", data.title, level.end_cause(), level.current_time());
    println!("chips left: {}", level.chips_left());
    if let Some(t) = level.time_left_seconds() {
        println!("time left: {t}");
    }
    Ok(())
}

fn run_replay(level: &str, tws: &Path, number: u16, config: &RunConfig) -> CliResult {
    let data = load_level(level, config)?;
    let solution = SolutionFile::open(tws)?
        .solution(number)?
        .ok_or_else(|| format!("no solution for level {number}"))?;

    let mut level = Level::legacy(&data, solution.prng_seed);
    let cause = replay::run(&mut level, &solution)?;
    print_board(&level);
    println!("{}: {} after {} of {} ticks", data.title, cause, level.current_time(), solution.total_time);
    Ok(())
}

// ── Board dump ──

fn actor_char(entity: Entity) -> char {
    match entity {
        Entity::Chip => '@',
        Entity::Block | Entity::BlockGhost => '&',
        Entity::Bug => 'a',
        Entity::Paramecium => 'p',
        Entity::Glider => 'q',
        Entity::Fireball => 'z',
        Entity::Ball => 'o',
        Entity::Blob => 'e',
        Entity::Tank | Entity::TankReversed => 'n',
        Entity::Walker => 'K',
        Entity::Teeth => 'D',
        Entity::None | Entity::Static => '+',
    }
}

fn print_board<R: Randomness>(level: &Level<R>) {
    for y in 0..GRID_HEIGHT as u8 {
        let row: String = (0..GRID_WIDTH as u8)
            .map(|x| {
                let top = level.top_actor(x, y);
                if top.code() > 0 {
                    actor_char(top.entity())
                } else {
                    char_for_tile(level.bottom_tile(x, y))
                }
            })
            .collect();
        println!("{row}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_are_not_dropped() {
        init_logging();
        init_logging();
        if std::env::var_os("RUST_LOG").is_none() {
            assert!(log::log_enabled!(log::Level::Warn));
            assert!(!log::log_enabled!(log::Level::Info));
        }
    }

    #[test]
    fn subcommands_parse() {
        let cli = Cli::try_parse_from(["tworld-run", "play", "first-steps", "EE.S"]).unwrap();
        assert!(matches!(cli.command, Command::Play { ref level, ref moves } if level == "first-steps" && moves == "EE.S"));

        let cli = Cli::try_parse_from(["tworld-run", "play", "first-steps"]).unwrap();
        assert!(matches!(cli.command, Command::Play { ref moves, .. } if moves.is_empty()));

        let cli = Cli::try_parse_from(["tworld-run", "replay", "lvl.txt", "set.tws", "3"]).unwrap();
        assert!(matches!(cli.command, Command::Replay { number: 3, .. }));

        let cli = Cli::try_parse_from(["tworld-run", "list"]).unwrap();
        assert!(matches!(cli.command, Command::List));
    }

    #[test]
    fn incomplete_replay_is_a_usage_error() {
        let err = Cli::try_parse_from(["tworld-run", "replay", "lvl.txt"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
        let err = Cli::try_parse_from(["tworld-run", "replay", "lvl.txt", "set.tws", "many"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        assert!(Cli::try_parse_from(["tworld-run"]).is_err());
    }

    #[test]
    fn move_strings_map_to_held_input() {
        let moves = parse_moves("nE.s").unwrap();
        assert_eq!(moves, vec![DirMask::NORTH, DirMask::EAST, DirMask::NONE, DirMask::SOUTH]);
        assert!(parse_moves("NX").is_err());
    }

    #[test]
    fn embedded_levels_load_by_name() {
        let config = RunConfig::from_toml_str("");
        for (name, _) in embedded_levels() {
            assert!(load_level(name, &config).is_ok(), "{name}");
        }
        assert!(load_level("no-such-level", &config).is_err());
    }
}
