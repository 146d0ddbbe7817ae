/// Monster AI: the ordered list of directions a monster tries each tick.
///
/// Every monster except teeth steers only by its own facing:
///
/// ```text
///   tank        forward
///   walker      forward, random turn
///   ball        forward, back
///   bug         left, forward, right, back
///   paramecium  right, forward, left, back
///   glider      forward, left, right, back
///   fireball    forward, right, left, back
///   blob        random direction
/// ```
///
/// Random entries are placeholders resolved only when the AI reaches
/// them, so a walker that can go forward never draws a number.
/// Teeth head for Chip's cell along the axis with the larger offset
/// (vertical on ties) and rest every other four-tick period.

use super::dir::Direction;
use super::entity::Entity;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Choice {
    Toward(Direction),
    /// Forward turned right by a random 0..=3 quarter turns.
    WalkerTurn,
    /// Random direction, drawn clockwise from north.
    BlobTurn,
}

/// Blob turn index to direction.
pub const CLOCKWISE: [Direction; 4] = [Direction::North, Direction::East, Direction::South, Direction::West];

/// Up to four choices, without allocating.
#[derive(Clone, Copy, Debug)]
pub struct Choices {
    items: [Choice; 4],
    len: usize,
}

impl Choices {
    fn from_slice(items: &[Choice]) -> Choices {
        let mut out = Choices { items: [Choice::BlobTurn; 4], len: 0 };
        for &c in items.iter().take(4) {
            out.items[out.len] = c;
            out.len += 1;
        }
        out
    }

    fn dirs(dirs: &[Direction]) -> Choices {
        let mut out = Choices { items: [Choice::BlobTurn; 4], len: 0 };
        for &d in dirs.iter().take(4) {
            out.items[out.len] = Choice::Toward(d);
            out.len += 1;
        }
        out
    }

    pub fn as_slice(&self) -> &[Choice] {
        &self.items[..self.len]
    }

    pub fn first(&self) -> Option<Choice> {
        self.as_slice().first().copied()
    }
}

/// Teeth only move when bit 2 of the shifted clock is clear.
pub fn teeth_rest(current_time: u32, stepping: u8) -> bool {
    current_time.wrapping_add(stepping as u32) & 0x4 != 0
}

/// Candidate moves for a monster at `from` facing `forward`, given Chip's cell.
pub fn monster_choices(entity: Entity, forward: Direction, from: (u8, u8), chip: (u8, u8)) -> Choices {
    let left = forward.left();
    let right = forward.right();
    let back = forward.back();
    match entity {
        Entity::Teeth => teeth_choices(from, chip),
        Entity::Blob => Choices::from_slice(&[Choice::BlobTurn]),
        Entity::Tank | Entity::TankReversed => Choices::dirs(&[forward]),
        Entity::Walker => Choices::from_slice(&[Choice::Toward(forward), Choice::WalkerTurn]),
        Entity::Ball => Choices::dirs(&[forward, back]),
        Entity::Bug => Choices::dirs(&[left, forward, right, back]),
        Entity::Paramecium => Choices::dirs(&[right, forward, left, back]),
        Entity::Glider => Choices::dirs(&[forward, left, right, back]),
        Entity::Fireball => Choices::dirs(&[forward, right, left, back]),
        _ => Choices::dirs(&[]),
    }
}

fn teeth_choices(from: (u8, u8), chip: (u8, u8)) -> Choices {
    let dx = chip.0 as i16 - from.0 as i16;
    let dy = chip.1 as i16 - from.1 as i16;
    let mut dirs = [Direction::North; 2];
    let mut n = 0;
    if dx != 0 {
        dirs[n] = if dx < 0 { Direction::West } else { Direction::East };
        n += 1;
    }
    if dy != 0 {
        dirs[n] = if dy < 0 { Direction::North } else { Direction::South };
        n += 1;
    }
    if dy.abs() >= dx.abs() {
        dirs[..n].reverse();
    }
    Choices::dirs(&dirs[..n])
}
