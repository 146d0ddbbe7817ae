/// Text level loader.
///
/// ## Sources (priority order):
///   1. A file path given on the command line
///   2. `levels/` directory (individual `.txt` files)
///   3. Built-in embedded levels
///
/// ## Single-level format (`.txt`):
///   ```text
///   @title Lesson
///   @time 100
///   @chips 4
///   @actor chip 3,2 south
///   @actor bug 5,5 west
///   @trap 4,1 9,1
///   @cloner 6,6 6,8
///   ; comment
///   <up to 32 map rows>
///   ```
///
/// Directive lines start with `@`, comment lines with `;`, everything else
/// is a map row. Cells past the end of a row, and rows past the last one,
/// are walls. Without `@chips` the level requires every chip on the map.
/// Actors go on the top layer; their names are the entity names
/// (`chip`, `bug`, `ghost_block`, `tank_reversed`, ...) plus
/// `static_fireball`, `static_ball`, `static_blob` and `static_block`.
///
/// ## Tile legend:
///   ' ' floor        '#' wall          '^' trap         't' static trap
///   '_' toggle floor '%' toggle wall   '(' green button ')' red button
///   '[' brown button ']' blue button   'b' 'r' 'g' 'y'  keys
///   'B' 'R' 'G' 'Y'  locks             '8' '4' '2' '6'  thin wall N W S E
///   '3' thin wall SE '*' ice           'Q' 'Z' 'C' 'E'  ice corner NW SW SE NE
///   'k' 'h' 'j' 'l'  force N W S E     '?' random force ':' gravel
///   'X' exit         'x' fake exit     'w' 'f' 'i' 's'  boots water fire ice slide
///   'T' thief        'c' chip          ',' recessed wall 'u' fake blue wall
///   'U' blue wall    'v' hidden wall   'V' invisible wall '=' socket
///   'd' dirt         'H' hint          'M' cloner       'm' static cloner
///   'o' teleporter   '~' water         'F' fire         '!' bomb

use std::path::Path;

use log::warn;
use thiserror::Error;

use crate::domain::dir::Direction;
use crate::domain::entity::{Actor, Entity};
use crate::domain::grid::{Layer, GRID_HEIGHT, GRID_WIDTH};
use crate::domain::tile::Tile;
use super::links::{Link, Links};
use super::world::LevelData;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("line {line}: unknown tile character {ch:?}")]
    UnknownTile { line: usize, ch: char },
    #[error("line {line}: map row is wider than {} cells", GRID_WIDTH)]
    RowTooWide { line: usize },
    #[error("line {line}: map has more than {} rows", GRID_HEIGHT)]
    TooManyRows { line: usize },
    #[error("line {line}: unknown directive {name:?}")]
    UnknownDirective { line: usize, name: String },
    #[error("line {line}: malformed {directive} directive")]
    BadArguments { line: usize, directive: String },
    #[error("line {line}: unknown actor {name:?}")]
    UnknownActor { line: usize, name: String },
    #[error("line {line}: unknown direction {name:?}")]
    UnknownDirection { line: usize, name: String },
    #[error("line {line}: ({x}, {y}) is outside the grid")]
    OutOfGrid { line: usize, x: usize, y: usize },
}

const LEGEND: [(char, Tile); 56] = [
    (' ', Tile::Floor),
    ('^', Tile::Trap),
    ('_', Tile::ToggleFloor),
    ('%', Tile::ToggleWall),
    ('(', Tile::ButtonGreen),
    (')', Tile::ButtonRed),
    ('[', Tile::ButtonBrown),
    (']', Tile::ButtonBlue),
    ('b', Tile::KeyBlue),
    ('r', Tile::KeyRed),
    ('g', Tile::KeyGreen),
    ('y', Tile::KeyYellow),
    ('B', Tile::LockBlue),
    ('R', Tile::LockRed),
    ('G', Tile::LockGreen),
    ('Y', Tile::LockYellow),
    ('8', Tile::ThinWallN),
    ('4', Tile::ThinWallW),
    ('2', Tile::ThinWallS),
    ('6', Tile::ThinWallE),
    ('3', Tile::ThinWallSE),
    ('*', Tile::Ice),
    ('Q', Tile::IceCornerNW),
    ('Z', Tile::IceCornerSW),
    ('C', Tile::IceCornerSE),
    ('E', Tile::IceCornerNE),
    ('k', Tile::ForceFloorN),
    ('h', Tile::ForceFloorW),
    ('j', Tile::ForceFloorS),
    ('l', Tile::ForceFloorE),
    ('?', Tile::ForceFloorRandom),
    (':', Tile::Gravel),
    ('X', Tile::Exit),
    ('w', Tile::BootsWater),
    ('f', Tile::BootsFire),
    ('i', Tile::BootsIce),
    ('s', Tile::BootsSlide),
    ('T', Tile::Thief),
    ('c', Tile::Chip),
    (',', Tile::RecessedWall),
    ('u', Tile::WallBlueFake),
    ('=', Tile::Socket),
    ('d', Tile::Dirt),
    ('H', Tile::Hint),
    ('#', Tile::Wall),
    ('U', Tile::WallBlueReal),
    ('v', Tile::WallHidden),
    ('V', Tile::WallInvisible),
    ('x', Tile::FakeExit),
    ('M', Tile::Cloner),
    ('m', Tile::StaticCloner),
    ('t', Tile::StaticTrap),
    ('o', Tile::Teleporter),
    ('~', Tile::Water),
    ('F', Tile::Fire),
    ('!', Tile::Bomb),
];

pub fn tile_for_char(ch: char) -> Option<Tile> {
    LEGEND.iter().find(|(c, _)| *c == ch).map(|&(_, t)| t)
}

pub fn char_for_tile(tile: Tile) -> char {
    LEGEND.iter().find(|(_, t)| *t == tile).map_or('#', |&(c, _)| c)
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// Parse a single level from text content.
pub fn parse_level(content: &str) -> Result<LevelData, ParseError> {
    let mut data = LevelData {
        title: String::from("Untitled"),
        bottom: Layer::filled(Tile::Wall.code()),
        ..LevelData::default()
    };
    let mut required_chips = None;
    let mut y = 0;

    for (i, raw) in content.lines().enumerate() {
        let line_no = i + 1;
        let line = raw.trim_end_matches('\r');
        if line.starts_with(';') {
            continue;
        }
        if let Some(directive) = line.strip_prefix('@') {
            if let Some(chips) = parse_directive(&mut data, directive, line_no)? {
                required_chips = Some(chips);
            }
            continue;
        }

        if line.chars().count() > GRID_WIDTH {
            return Err(ParseError::RowTooWide { line: line_no });
        }
        if y >= GRID_HEIGHT {
            // trailing blank lines are not rows
            if line.trim().is_empty() {
                continue;
            }
            return Err(ParseError::TooManyRows { line: line_no });
        }
        for (x, ch) in line.chars().enumerate() {
            let tile = tile_for_char(ch).ok_or(ParseError::UnknownTile { line: line_no, ch })?;
            data.bottom.set(x as u8, y as u8, tile.code());
        }
        y += 1;
    }

    data.required_chips = match required_chips {
        Some(n) => n,
        None => count_chips(&data.bottom),
    };
    Ok(data)
}

/// Every `.txt` level in `dir`, sorted by file name. Files that fail to
/// parse are skipped with a warning.
pub fn load_from_directory(dir: &Path) -> Vec<(String, LevelData)> {
    let mut results = vec![];

    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(_) => return results,
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().is_some_and(|e| e == "txt") {
            let filename = path.file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string();
            match std::fs::read_to_string(&path).map(|content| parse_level(&content)) {
                Ok(Ok(data)) => results.push((filename, data)),
                Ok(Err(e)) => warn!("skipping {}: {e}", path.display()),
                Err(e) => warn!("cannot read {}: {e}", path.display()),
            }
        }
    }

    results.sort_by(|a, b| a.0.cmp(&b.0));
    results
}

// ══════════════════════════════════════════════════════════════
// Directives
// ══════════════════════════════════════════════════════════════

/// Apply one directive; returns the chip count if it was `@chips`.
fn parse_directive(data: &mut LevelData, text: &str, line: usize) -> Result<Option<u16>, ParseError> {
    let mut words = text.split_whitespace();
    let name = words.next().unwrap_or_default();
    let bad = || ParseError::BadArguments { line, directive: name.to_string() };

    match name {
        "title" => {
            data.title = text.trim_start()[name.len()..].trim().to_string();
        }
        "time" => {
            data.time_limit = words.next().and_then(|w| w.parse().ok()).ok_or_else(bad)?;
        }
        "chips" => {
            let chips = words.next().and_then(|w| w.parse().ok()).ok_or_else(bad)?;
            return Ok(Some(chips));
        }
        "actor" => {
            let (Some(kind), Some(pos), Some(dir)) = (words.next(), words.next(), words.next()) else {
                return Err(bad());
            };
            let (x, y) = parse_pos(pos, line).ok_or_else(bad)??;
            let dir = parse_direction(dir)
                .ok_or_else(|| ParseError::UnknownDirection { line, name: dir.to_string() })?;
            let actor = parse_actor(kind, dir)
                .ok_or_else(|| ParseError::UnknownActor { line, name: kind.to_string() })?;
            data.top.set(x, y, actor.code());
        }
        "trap" | "cloner" => {
            let (Some(button), Some(target)) = (words.next(), words.next()) else {
                return Err(bad());
            };
            let button = parse_pos(button, line).ok_or_else(bad)??;
            let target = parse_pos(target, line).ok_or_else(bad)??;
            let links = if name == "trap" { &mut data.trap_links } else { &mut data.cloner_links };
            push_link(links, Link { button, target }, name);
        }
        _ => return Err(ParseError::UnknownDirective { line, name: name.to_string() }),
    }
    Ok(None)
}

fn push_link(links: &mut Links, link: Link, kind: &str) {
    if links.push(link).is_err() {
        warn!("{kind} link table full, dropping {:?} -> {:?}", link.button, link.target);
    }
}

/// `x,y`; `None` if malformed, `Some(Err)` if off the grid.
fn parse_pos(text: &str, line: usize) -> Option<Result<(u8, u8), ParseError>> {
    let (x, y) = text.split_once(',')?;
    let x: usize = x.trim().parse().ok()?;
    let y: usize = y.trim().parse().ok()?;
    if x >= GRID_WIDTH || y >= GRID_HEIGHT {
        return Some(Err(ParseError::OutOfGrid { line, x, y }));
    }
    Some(Ok((x as u8, y as u8)))
}

fn parse_direction(text: &str) -> Option<Direction> {
    match text {
        "north" | "n" => Some(Direction::North),
        "west" | "w" => Some(Direction::West),
        "south" | "s" => Some(Direction::South),
        "east" | "e" => Some(Direction::East),
        _ => None,
    }
}

fn parse_actor(name: &str, dir: Direction) -> Option<Actor> {
    let fixed = match name {
        "static_fireball" => Some(Actor::STATIC_FIREBALL),
        "static_ball" => Some(Actor::STATIC_BALL),
        "static_blob" => Some(Actor::STATIC_BLOB),
        "static_block" => Some(Actor::STATIC_BLOCK),
        _ => None,
    };
    if fixed.is_some() {
        return fixed;
    }
    Entity::all()
        .iter()
        .copied()
        .filter(|e| !matches!(e, Entity::None | Entity::Static))
        .find(|e| e.name() == name)
        .map(|e| Actor::new(e, dir))
}

fn count_chips(bottom: &Layer) -> u16 {
    super::world::cells()
        .filter(|&(x, y)| bottom.get(x, y) == Tile::Chip.code())
        .count() as u16
}

// ══════════════════════════════════════════════════════════════
// Embedded fallback levels
// ══════════════════════════════════════════════════════════════

/// Small built-in levels, by name.
pub fn embedded_levels() -> Vec<(&'static str, &'static str)> {
    vec![
        ("first-steps", FIRST_STEPS),
        ("lock-and-key", LOCK_AND_KEY),
        ("bug-run", BUG_RUN),
    ]
}

pub fn embedded_level(name: &str) -> Option<&'static str> {
    embedded_levels().into_iter().find(|(n, _)| *n == name).map(|(_, text)| text)
}

const FIRST_STEPS: &str = "\
@title First Steps
@time 60
@actor chip 2,2 south
#########
#       #
#  c c  #
#       #
####=####
#   X   #
#########
";

const LOCK_AND_KEY: &str = "\
@title Lock and Key
@actor chip 1,1 south
@actor block 4,3 north
#########
#  b    #
#####B###
# c~    #
#   =   #
#   X   #
#########
";

const BUG_RUN: &str = "\
@title Bug Run
@time 100
@actor chip 1,1 east
@actor bug 5,3 west
@actor tank 8,5 west
@cloner 3,5 8,5
###########
#   c     #
# ####### #
# #     # #
# # ### # #
#  )   ]M #
##### #####
#    X    #
###########
";
