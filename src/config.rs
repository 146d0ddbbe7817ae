/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to defaults if the file is missing or incomplete.

use log::warn;
use serde::Deserialize;
use std::path::PathBuf;

use crate::domain::dir::Direction;
use crate::sim::world::StartConditions;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct RunConfig {
    pub engine: EngineConfig,
    pub levels_dir: PathBuf,
    /// Headless runs stop after this many ticks.
    pub max_ticks: u32,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RngKind {
    /// Bit-exact generators; required for replays.
    Legacy,
    System,
}

#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub rng: RngKind,
    pub seed: u32,
    pub conditions: StartConditions,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    engine: TomlEngine,
    #[serde(default)]
    run: TomlRun,
}

#[derive(Deserialize, Debug)]
struct TomlEngine {
    #[serde(default = "default_rng")]
    rng: String,
    #[serde(default)]
    seed: u32,
    #[serde(default)]
    stepping: u8,
    #[serde(default = "default_slide_dir")]
    random_slide_dir: Direction,
}

#[derive(Deserialize, Debug)]
struct TomlRun {
    #[serde(default = "default_levels_dir")]
    levels_dir: String,
    #[serde(default = "default_max_ticks")]
    max_ticks: u32,
}

// ── Defaults ──

fn default_rng() -> String { "legacy".into() }
fn default_slide_dir() -> Direction { Direction::North }
fn default_levels_dir() -> String { "levels".into() }
fn default_max_ticks() -> u32 { 20_000 }

impl Default for TomlEngine {
    fn default() -> Self {
        TomlEngine {
            rng: default_rng(),
            seed: 0,
            stepping: 0,
            random_slide_dir: default_slide_dir(),
        }
    }
}

impl Default for TomlRun {
    fn default() -> Self {
        TomlRun {
            levels_dir: default_levels_dir(),
            max_ticks: default_max_ticks(),
        }
    }
}

// ── Loading ──

impl RunConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        RunConfig::resolve(toml_cfg, &search_dirs)
    }

    /// Config from TOML text; unparsable text gives the defaults.
    pub fn from_toml_str(text: &str) -> Self {
        let toml_cfg = toml::from_str::<TomlConfig>(text).unwrap_or_else(|e| {
            warn!("config parse error, using defaults: {e}");
            TomlConfig::default()
        });
        RunConfig::resolve(toml_cfg, &[])
    }

    fn resolve(toml_cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        let levels_dir_str = &toml_cfg.run.levels_dir;
        let levels_dir = if PathBuf::from(levels_dir_str).is_absolute() {
            PathBuf::from(levels_dir_str)
        } else {
            search_dirs.iter()
                .map(|d| d.join(levels_dir_str))
                .find(|p| p.is_dir())
                .unwrap_or_else(|| PathBuf::from(levels_dir_str))
        };

        let engine = &toml_cfg.engine;
        let rng = match engine.rng.to_ascii_lowercase().as_str() {
            "legacy" => RngKind::Legacy,
            "system" if cfg!(feature = "system-rng") => RngKind::System,
            other => {
                warn!("unknown or unavailable rng {other:?}, using legacy");
                RngKind::Legacy
            }
        };
        if engine.stepping > 7 {
            warn!("stepping {} out of range, using {}", engine.stepping, engine.stepping & 7);
        }

        RunConfig {
            engine: EngineConfig {
                rng,
                seed: engine.seed,
                conditions: StartConditions {
                    stepping: engine.stepping & 7,
                    random_slide_dir: engine.random_slide_dir,
                },
            },
            levels_dir,
            max_ticks: toml_cfg.run.max_ticks,
        }
    }
}

/// Directories searched for `config.toml` and `levels/`: the executable's
/// own directory, then the working directory.
fn candidate_dirs() -> Vec<PathBuf> {
    let exe_dir = std::env::current_exe().ok()
        .and_then(|exe| exe.parent().map(PathBuf::from));
    let mut dirs: Vec<PathBuf> = exe_dir.into_iter().collect();
    match std::env::current_dir() {
        Ok(cwd) if !dirs.contains(&cwd) => dirs.push(cwd),
        Ok(_) => {}
        Err(_) if dirs.is_empty() => dirs.push(PathBuf::from(".")),
        Err(_) => {}
    }
    dirs
}

/// The first readable `config.toml` wins; a broken one still stops the search.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    let Some(path) = search_dirs.iter().map(|d| d.join("config.toml")).find(|p| p.is_file()) else {
        return TomlConfig::default();
    };
    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) => {
            warn!("could not read {}: {e}", path.display());
            return TomlConfig::default();
        }
    };
    toml::from_str(&text).unwrap_or_else(|e| {
        warn!("{}: parse error, using defaults: {e}", path.display());
        TomlConfig::default()
    })
}
