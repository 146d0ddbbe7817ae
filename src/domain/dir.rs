/// Compass directions and direction bit masks.
///
/// Directions are numbered counter-clockwise (N=0, W=1, S=2, E=3) so that
/// a left turn is `+1` and a right turn is `-1` modulo 4. Masks use one bit
/// per direction in the same order, which is also the input mask layout.

use serde::Deserialize;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Direction {
    North = 0,
    West = 1,
    South = 2,
    East = 3,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::North, Direction::West, Direction::South, Direction::East];

    /// Direction from the low two bits of `bits`.
    pub fn from_bits(bits: u8) -> Direction {
        Direction::ALL[(bits & 3) as usize]
    }

    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn left(self) -> Direction {
        Direction::from_bits(self.index() + 1)
    }

    pub fn back(self) -> Direction {
        Direction::from_bits(self.index() + 2)
    }

    pub fn right(self) -> Direction {
        Direction::from_bits(self.index() + 3)
    }

    /// Turn right `turns` times.
    pub fn rotate_right(self, turns: u8) -> Direction {
        Direction::from_bits(self.index().wrapping_sub(turns & 3))
    }

    pub fn mask(self) -> DirMask {
        DirMask(1 << self.index())
    }

    pub fn offset(self) -> (i8, i8) {
        match self {
            Direction::North => (0, -1),
            Direction::West => (-1, 0),
            Direction::South => (0, 1),
            Direction::East => (1, 0),
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::West | Direction::East)
    }
}

/// Set of directions, one bit each (N=1, W=2, S=4, E=8).
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Hash)]
pub struct DirMask(u8);

impl DirMask {
    pub const NONE: DirMask = DirMask(0);
    pub const NORTH: DirMask = DirMask(1);
    pub const WEST: DirMask = DirMask(2);
    pub const SOUTH: DirMask = DirMask(4);
    pub const EAST: DirMask = DirMask(8);
    pub const VERTICAL: DirMask = DirMask(1 | 4);
    pub const HORIZONTAL: DirMask = DirMask(2 | 8);

    /// Mask from raw bits; anything above the low nibble is dropped.
    pub const fn from_bits(bits: u8) -> DirMask {
        DirMask(bits & 0x0f)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, dir: Direction) -> bool {
        self.0 & dir.mask().0 != 0
    }

    pub fn intersects(self, other: DirMask) -> bool {
        self.0 & other.0 != 0
    }

    /// The direction if exactly one bit is set.
    pub fn single(self) -> Option<Direction> {
        match self.0 {
            1 => Some(Direction::North),
            2 => Some(Direction::West),
            4 => Some(Direction::South),
            8 => Some(Direction::East),
            _ => None,
        }
    }

    pub fn is_diagonal(self) -> bool {
        self.intersects(DirMask::VERTICAL) && self.intersects(DirMask::HORIZONTAL)
    }

    pub fn iter(self) -> impl Iterator<Item = Direction> {
        Direction::ALL.into_iter().filter(move |d| self.contains(*d))
    }
}

impl std::ops::BitOr for DirMask {
    type Output = DirMask;
    fn bitor(self, rhs: DirMask) -> DirMask {
        DirMask(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for DirMask {
    fn bitor_assign(&mut self, rhs: DirMask) {
        self.0 |= rhs.0;
    }
}

impl std::ops::BitAnd for DirMask {
    type Output = DirMask;
    fn bitand(self, rhs: DirMask) -> DirMask {
        DirMask(self.0 & rhs.0)
    }
}

impl std::ops::Sub for DirMask {
    type Output = DirMask;
    fn sub(self, rhs: DirMask) -> DirMask {
        DirMask(self.0 & !rhs.0)
    }
}

impl From<Direction> for DirMask {
    fn from(dir: Direction) -> DirMask {
        dir.mask()
    }
}
