/// Recorded solutions (`.tws` files) and replaying them.
///
/// ## File layout (little-endian):
///   ```text
///   0   u32  signature 35 33 9b 99
///   4   u8   ruleset, 1 = Lynx
///   8   records, each:
///         u32  length of the rest of the record (0 = padding, no body)
///         u16  level number
///         5    password and flags (ignored)
///         u8   initial conditions: slide direction (bits 0-2), stepping (bits 3-5)
///         u32  blob generator seed
///         u32  total ticks
///         ...  move records
///   ```
///
/// ## Move records, by the low bits of the first byte:
///   ```text
///   ..00  1 byte   three moves, 4 ticks apart, 2-bit directions in bits 2-7
///   ..01  1 byte   one move, direction bits 2-4, delta bits 5+
///   ..10  2 bytes  as above
///   0.11  4 bytes  one move, 2-bit direction bits 2-3, delta bits 5+
///   1.11  2-5      one move, direction mask bits 5-13, delta bits 14+;
///                  length 2 + bits 2-3 of the first byte
///   ```
///
/// A delta counts ticks since the previous move; the first one is stored
/// one tick late.

use std::path::Path;

use log::debug;
use thiserror::Error;

use crate::domain::dir::{DirMask, Direction};
use crate::domain::rng::LegacyRng;
use super::world::{EndCause, Level, LevelError, StartConditions};

const SIGNATURE: [u8; 4] = [0x35, 0x33, 0x9b, 0x99];
const RULESET_LYNX: u8 = 1;
const HEADER_LEN: usize = 8;

/// 3-bit direction codes: the four directions, then the diagonals.
const DIRECTIONS: [DirMask; 8] = [
    DirMask::NORTH,
    DirMask::WEST,
    DirMask::SOUTH,
    DirMask::EAST,
    DirMask::from_bits(0b0011), // north-west
    DirMask::from_bits(0b0110), // south-west
    DirMask::from_bits(0b1001), // north-east
    DirMask::from_bits(0b1100), // south-east
];

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("cannot read solution file: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a solution file")]
    BadSignature,
    #[error("ruleset {0} is not supported, only Lynx")]
    UnsupportedRuleset(u8),
    #[error("solution data is truncated")]
    Truncated,
    #[error("unsupported move direction {0:#x}")]
    BadDirection(u32),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Move {
    /// Ticks after the previous move.
    pub delta: u32,
    pub dirs: DirMask,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Solution {
    pub total_time: u32,
    pub stepping: u8,
    pub initial_random_slide_dir: Direction,
    pub prng_seed: u32,
    pub moves: Vec<Move>,
}

impl Solution {
    pub fn conditions(&self) -> StartConditions {
        StartConditions { stepping: self.stepping, random_slide_dir: self.initial_random_slide_dir }
    }

    /// One input mask per tick, ending with the last move.
    pub fn inputs(&self) -> Inputs<'_> {
        Inputs { moves: &self.moves, index: 0, time: 0 }
    }
}

pub struct Inputs<'a> {
    moves: &'a [Move],
    index: usize,
    time: u32,
}

impl Iterator for Inputs<'_> {
    type Item = DirMask;

    fn next(&mut self) -> Option<DirMask> {
        let mv = self.moves.get(self.index)?;
        let input = if self.time >= mv.delta {
            self.time -= mv.delta;
            self.index += 1;
            mv.dirs
        } else {
            DirMask::NONE
        };
        self.time += 1;
        Some(input)
    }
}

// ══════════════════════════════════════════════════════════════
// Decoding
// ══════════════════════════════════════════════════════════════

pub struct SolutionFile {
    data: Vec<u8>,
}

impl SolutionFile {
    pub fn open(path: &Path) -> Result<Self, ReplayError> {
        SolutionFile::parse(std::fs::read(path)?)
    }

    pub fn parse(data: Vec<u8>) -> Result<Self, ReplayError> {
        if data.len() < HEADER_LEN || data[..4] != SIGNATURE {
            return Err(ReplayError::BadSignature);
        }
        if data[4] != RULESET_LYNX {
            return Err(ReplayError::UnsupportedRuleset(data[4]));
        }
        Ok(SolutionFile { data })
    }

    /// Solution recorded for level `number` (counting from 1), if any.
    pub fn solution(&self, number: u16) -> Result<Option<Solution>, ReplayError> {
        let mut r = Reader { data: &self.data, pos: HEADER_LEN };
        let end = loop {
            if r.pos >= self.data.len() {
                return Ok(None);
            }
            let len = r.read(4)? as usize;
            if len == 0 {
                continue;
            }
            let end = r.pos + len;
            if r.read(2)? as u16 == number {
                break end;
            }
            r.pos = end;
        };
        if end > self.data.len() {
            return Err(ReplayError::Truncated);
        }
        let mut r = Reader { data: &self.data[..end], pos: r.pos };

        r.skip(5)?;
        let conditions = r.read(1)?;
        let initial_random_slide_dir = Direction::from_bits((conditions & 0x3) as u8);
        let stepping = ((conditions >> 3) & 0x7) as u8;
        let prng_seed = r.read(4)?;
        let total_time = r.read(4)?;

        let mut moves = Vec::new();
        while r.pos < end {
            let first = moves.len();
            r.read_moves(&mut moves)?;
            if first == 0 {
                moves[0].delta = moves[0].delta.saturating_sub(1);
            }
        }

        Ok(Some(Solution { total_time, stepping, initial_random_slide_dir, prng_seed, moves }))
    }
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl Reader<'_> {
    /// Little-endian value of `n` bytes (at most 4).
    fn read(&mut self, n: usize) -> Result<u32, ReplayError> {
        let bytes = self.data.get(self.pos..self.pos + n).ok_or(ReplayError::Truncated)?;
        self.pos += n;
        Ok(bytes.iter().rev().fold(0, |v, &b| v << 8 | b as u32))
    }

    fn skip(&mut self, n: usize) -> Result<(), ReplayError> {
        self.read(n).map(|_| ())
    }

    fn read_moves(&mut self, out: &mut Vec<Move>) -> Result<(), ReplayError> {
        let b = *self.data.get(self.pos).ok_or(ReplayError::Truncated)?;
        match b & 0x3 {
            0b00 => {
                let m = self.read(1)?;
                for shift in [2, 4, 6] {
                    out.push(Move { delta: 4, dirs: DIRECTIONS[(m >> shift) as usize & 0x3] });
                }
            }
            0b01 | 0b10 => {
                let m = self.read(if b & 0x3 == 0b01 { 1 } else { 2 })?;
                out.push(Move { delta: (m >> 5) + 1, dirs: DIRECTIONS[(m >> 2) as usize & 0x7] });
            }
            _ if b & 0x10 != 0 => {
                let len = ((b as usize >> 2) & 0x3) + 2;
                let m = self.read_wide(len)?;
                let bits = ((m >> 5) & 0x1ff) as u32;
                let dirs = DIRECTIONS
                    .iter()
                    .copied()
                    .find(|d| d.bits() as u32 == bits)
                    .ok_or(ReplayError::BadDirection(bits))?;
                out.push(Move { delta: (m >> 14) as u32 + 1, dirs });
            }
            _ => {
                let m = self.read(4)?;
                out.push(Move { delta: ((m >> 5) + 1) & 0x7f_ffff, dirs: DIRECTIONS[(m >> 2) as usize & 0x3] });
            }
        }
        Ok(())
    }

    /// Like `read`, for records of up to five bytes.
    fn read_wide(&mut self, n: usize) -> Result<u64, ReplayError> {
        let bytes = self.data.get(self.pos..self.pos + n).ok_or(ReplayError::Truncated)?;
        self.pos += n;
        Ok(bytes.iter().rev().fold(0, |v, &b| v << 8 | b as u64))
    }
}

// ══════════════════════════════════════════════════════════════
// Replay
// ══════════════════════════════════════════════════════════════

/// Restart `level` under the solution's conditions and play it through.
///
/// After the recorded moves run out the level keeps stepping without
/// input until the recorded total time, or until the attempt ends.
pub fn run(level: &mut Level<LegacyRng>, solution: &Solution) -> Result<EndCause, LevelError> {
    level.rng_mut().set_seed(solution.prng_seed);
    level.set_conditions(solution.conditions());
    level.restart()?;

    for input in solution.inputs() {
        level.set_input(input);
        level.step();
        if level.is_game_over() {
            break;
        }
    }

    level.set_input(DirMask::NONE);
    while !level.is_game_over() && level.current_time() < solution.total_time {
        level.step();
    }

    debug!(
        "replay ended at tick {} of {}: {}",
        level.current_time(),
        solution.total_time,
        level.end_cause()
    );
    Ok(level.end_cause())
}
