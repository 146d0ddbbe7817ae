/// Bottom-layer tile kinds and their properties.
///
/// Codes are assigned in contiguous families so that category tests are
/// single range or mask comparisons, and the low two bits of a family
/// member select its variant (key colour, boot kind, button kind, ...).
/// The numeric codes are part of the level format and must not change.

use super::dir::{DirMask, Direction};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
#[repr(u8)]
pub enum Tile {
    Floor = 0x00,
    Trap = 0x01,
    ToggleFloor = 0x02,
    ToggleWall = 0x03,

    ButtonGreen = 0x04,
    ButtonRed = 0x05,
    ButtonBrown = 0x06,
    ButtonBlue = 0x07,

    KeyBlue = 0x08,
    KeyRed = 0x09,

    ThinWallN = 0x0c,
    ThinWallW = 0x0d,
    ThinWallS = 0x0e,
    ThinWallE = 0x0f,
    ThinWallSE = 0x10,

    Ice = 0x13,
    IceCornerNW = 0x14,
    IceCornerSW = 0x15,
    IceCornerSE = 0x16,
    IceCornerNE = 0x17,

    ForceFloorN = 0x18,
    ForceFloorW = 0x19,
    ForceFloorS = 0x1a,
    ForceFloorE = 0x1b,
    ForceFloorRandom = 0x1c,

    Gravel = 0x1e,
    Exit = 0x1f,

    BootsWater = 0x20,
    BootsFire = 0x21,
    BootsIce = 0x22,
    BootsSlide = 0x23,

    LockBlue = 0x24,
    LockRed = 0x25,
    LockGreen = 0x26,
    LockYellow = 0x27,

    KeyGreen = 0x2a,
    KeyYellow = 0x2b,
    Thief = 0x2c,
    Chip = 0x2d,

    RecessedWall = 0x2e,
    WallBlueFake = 0x2f,
    Socket = 0x30,
    Dirt = 0x31,
    Hint = 0x32,
    Wall = 0x33,
    WallBlueReal = 0x34,
    WallHidden = 0x35,
    WallInvisible = 0x36,
    FakeExit = 0x37,
    Cloner = 0x38,

    StaticCloner = 0x3a,
    StaticTrap = 0x3b,

    Teleporter = 0x3c,
    Water = 0x3d,
    Fire = 0x3e,
    Bomb = 0x3f,
}

/// Directions blocked when leaving a thin wall or ice corner, indexed by
/// thin wall (0..=4) then ice corner (5..=8).
const BLOCKED_FROM: [u8; 9] = [
    1, 2, 4, 8, 4 | 8, // N W S E SE
    1 | 2, 4 | 2, 4 | 8, 1 | 8, // NW SW SE NE
];

/// Directions blocked when entering a thin wall or ice corner.
const BLOCKED_TO: [u8; 9] = [
    4, 8, 1, 2, 1 | 2,
    4 | 8, 1 | 8, 1 | 2, 4 | 2,
];

/// Facing after sliding into an ice corner, indexed by `corner * 4 + incoming`.
const ICE_CORNER_TURN: [Option<Direction>; 16] = {
    use Direction::*;
    [
        Some(East), Some(South), None, None, // NW
        None, Some(North), Some(East), None, // SW
        None, None, Some(West), Some(North), // SE
        Some(West), None, None, Some(South), // NE
    ]
};

const ALL: [Tile; 56] = {
    use Tile::*;
    [
        Floor, Trap, ToggleFloor, ToggleWall,
        ButtonGreen, ButtonRed, ButtonBrown, ButtonBlue,
        KeyBlue, KeyRed,
        ThinWallN, ThinWallW, ThinWallS, ThinWallE, ThinWallSE,
        Ice, IceCornerNW, IceCornerSW, IceCornerSE, IceCornerNE,
        ForceFloorN, ForceFloorW, ForceFloorS, ForceFloorE, ForceFloorRandom,
        Gravel, Exit,
        BootsWater, BootsFire, BootsIce, BootsSlide,
        LockBlue, LockRed, LockGreen, LockYellow,
        KeyGreen, KeyYellow, Thief, Chip,
        RecessedWall, WallBlueFake, Socket, Dirt, Hint, Wall,
        WallBlueReal, WallHidden, WallInvisible, FakeExit, Cloner,
        StaticCloner, StaticTrap,
        Teleporter, Water, Fire, Bomb,
    ]
};

impl Tile {
    /// Every assigned tile, in code order.
    pub fn all() -> &'static [Tile] {
        &ALL
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Tile for a raw code; unassigned codes have no tile.
    pub fn from_code(code: u8) -> Option<Tile> {
        ALL.iter().copied().find(|t| t.code() == code)
    }

    /// Key colour, boot kind, button kind, force floor or ice corner (0..=3).
    pub fn variant(self) -> u8 {
        self.code() & 0x3
    }

    pub fn is_key(self) -> bool {
        self.code() & 0x1c == 0x08
    }

    pub fn is_lock(self) -> bool {
        self.code() & !0x3 == Tile::LockBlue.code()
    }

    pub fn is_boots(self) -> bool {
        self.code() & !0x3 == Tile::BootsWater.code()
    }

    pub fn is_button(self) -> bool {
        self.code() & !0x3 == Tile::ButtonGreen.code()
    }

    pub fn is_thin_wall(self) -> bool {
        (Tile::ThinWallN.code()..=Tile::ThinWallSE.code()).contains(&self.code())
    }

    /// Plain ice or any ice corner.
    pub fn is_ice(self) -> bool {
        (Tile::Ice.code()..=Tile::IceCornerNE.code()).contains(&self.code())
    }

    pub fn is_ice_wall(self) -> bool {
        self.code() & !0x3 == Tile::IceCornerNW.code()
    }

    /// Any force floor, including the random one.
    pub fn is_slide(self) -> bool {
        (Tile::ForceFloorN.code()..=Tile::ForceFloorRandom.code()).contains(&self.code())
    }

    pub fn is_monster_acting_wall(self) -> bool {
        (0x1e..=0x3a).contains(&self.code())
    }

    pub fn is_block_acting_wall(self) -> bool {
        (0x1f..=0x3a).contains(&self.code())
    }

    pub fn is_chip_acting_wall(self) -> bool {
        (0x33..=0x3a).contains(&self.code())
    }

    /// Real blue wall or hidden wall: turns into a plain wall when bumped.
    pub fn is_revealable_wall(self) -> bool {
        self.code() & !0x1 == 0x34
    }

    /// Occupants of static tiles never join the actor list.
    pub fn is_static(self) -> bool {
        self.code() & !0x1 == 0x3a
    }

    pub fn is_toggle_tile(self) -> bool {
        self.code() & !0x1 == 0x02
    }

    /// Toggle floor/wall as seen with the pending flip applied.
    pub fn with_toggle_state(self, flipped: bool) -> Tile {
        debug_assert!(self.is_toggle_tile());
        match (self, flipped) {
            (Tile::ToggleFloor, true) => Tile::ToggleWall,
            (Tile::ToggleWall, true) => Tile::ToggleFloor,
            (t, _) => t,
        }
    }

    /// Key of the given colour (0 blue, 1 red, 2 green, 3 yellow).
    pub fn key(variant: u8) -> Tile {
        match variant & 0x3 {
            0 => Tile::KeyBlue,
            1 => Tile::KeyRed,
            2 => Tile::KeyGreen,
            _ => Tile::KeyYellow,
        }
    }

    /// Direction of a fixed force floor; the random floor has none.
    pub fn slide_direction(self) -> Option<Direction> {
        match self {
            Tile::ForceFloorN => Some(Direction::North),
            Tile::ForceFloorW => Some(Direction::West),
            Tile::ForceFloorS => Some(Direction::South),
            Tile::ForceFloorE => Some(Direction::East),
            _ => None,
        }
    }

    fn wall_index(self) -> Option<usize> {
        if self.is_thin_wall() {
            Some((self.code() - Tile::ThinWallN.code()) as usize)
        } else if self.is_ice_wall() {
            Some(5 + self.variant() as usize)
        } else {
            None
        }
    }

    /// Directions an actor standing here cannot leave by.
    pub fn blocked_from(self) -> DirMask {
        self.wall_index()
            .map_or(DirMask::NONE, |i| DirMask::from_bits(BLOCKED_FROM[i]))
    }

    /// Directions an actor cannot enter this tile by.
    pub fn blocked_to(self) -> DirMask {
        self.wall_index()
            .map_or(DirMask::NONE, |i| DirMask::from_bits(BLOCKED_TO[i]))
    }

    /// New facing for an actor sliding into this ice corner.
    pub fn ice_corner_turn(self, incoming: Direction) -> Option<Direction> {
        if !self.is_ice_wall() {
            return None;
        }
        ICE_CORNER_TURN[self.variant() as usize * 4 + incoming.index() as usize]
    }
}

impl Default for Tile {
    fn default() -> Self {
        Tile::Floor
    }
}
