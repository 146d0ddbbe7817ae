/// Occupants of the top layer and entries of the actor list.
///
/// An `Actor` is the 6-bit top-layer code: entity kind in the high four
/// bits, facing in the low two. The actor list stores only position,
/// movement progress and a transient state (`ActiveActor`); kind and
/// facing always live in the top-layer cell under the actor.

use super::dir::Direction;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
#[repr(u8)]
pub enum Entity {
    None = 0x00,
    Chip = 0x04,
    Static = 0x0c,
    BlockGhost = 0x10,
    Block = 0x14,
    Bug = 0x18,
    Paramecium = 0x1c,
    Glider = 0x20,
    Fireball = 0x24,
    Ball = 0x28,
    Blob = 0x2c,
    Tank = 0x30,
    TankReversed = 0x34,
    Walker = 0x38,
    Teeth = 0x3c,
}

const ENTITIES: [Entity; 15] = {
    use Entity::*;
    [
        None, Chip, Static, BlockGhost, Block, Bug, Paramecium, Glider,
        Fireball, Ball, Blob, Tank, TankReversed, Walker, Teeth,
    ]
};

impl Entity {
    pub fn all() -> &'static [Entity] {
        &ENTITIES
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Entity> {
        ENTITIES.iter().copied().find(|e| e.code() == code)
    }

    /// Tank or reversed tank.
    pub fn is_tank(self) -> bool {
        self.code() & 0x38 == 0x30
    }

    /// Block or ghost block.
    pub fn is_block(self) -> bool {
        self.code() & 0x38 == 0x10
    }

    pub fn is_monster(self) -> bool {
        self.code() > Entity::Block.code()
    }

    pub fn is_monster_or_block(self) -> bool {
        self.code() >= Entity::BlockGhost.code()
    }

    /// Entities other than Chip that join the actor list when a level starts.
    pub fn is_on_actor_list(self) -> bool {
        self.code() >= Entity::Block.code()
    }

    /// Swaps tank and reversed tank; other entities are returned unchanged.
    pub fn reverse_tank(self) -> Entity {
        match self {
            Entity::Tank => Entity::TankReversed,
            Entity::TankReversed => Entity::Tank,
            e => e,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Entity::None => "none",
            Entity::Chip => "chip",
            Entity::Static => "static",
            Entity::BlockGhost => "ghost_block",
            Entity::Block => "block",
            Entity::Bug => "bug",
            Entity::Paramecium => "paramecium",
            Entity::Glider => "glider",
            Entity::Fireball => "fireball",
            Entity::Ball => "ball",
            Entity::Blob => "blob",
            Entity::Tank => "tank",
            Entity::TankReversed => "tank_reversed",
            Entity::Walker => "walker",
            Entity::Teeth => "teeth",
        }
    }
}

/// Top-layer code: entity kind and facing.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Default)]
pub struct Actor(u8);

impl Actor {
    pub const NONE: Actor = Actor(0x00);
    /// Death animation in progress on this cell.
    pub const ANIMATION: Actor = Actor(0x01);
    pub const STATIC_FIREBALL: Actor = Actor(0x0c);
    pub const STATIC_BALL: Actor = Actor(0x0d);
    pub const STATIC_BLOB: Actor = Actor(0x0e);
    pub const STATIC_BLOCK: Actor = Actor(0x0f);

    pub fn new(entity: Entity, dir: Direction) -> Actor {
        Actor(entity.code() | dir.index())
    }

    pub fn from_code(code: u8) -> Actor {
        Actor(code & 0x3f)
    }

    pub fn code(self) -> u8 {
        self.0
    }

    /// Entity kind; the unassigned `0x08` family reads as `None`.
    pub fn entity(self) -> Entity {
        Entity::from_code(self.0 & !0x3).unwrap_or(Entity::None)
    }

    pub fn dir(self) -> Direction {
        Direction::from_bits(self.0)
    }

    pub fn with_dir(self, dir: Direction) -> Actor {
        Actor((self.0 & !0x3) | dir.index())
    }

    pub fn with_entity(self, entity: Entity) -> Actor {
        Actor(entity.code() | (self.0 & 0x3))
    }

    /// Static block, ghost block or block, whatever the facing.
    pub fn is_block(self) -> bool {
        (0x0f..=0x17).contains(&self.0)
    }
}

/// Transient state of an actor list entry.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum ActorState {
    #[default]
    None = 0,
    /// Dead or reusable slot; a positive step counts down a death animation.
    Hidden = 1,
    /// A move was chosen this tick.
    Moved = 2,
    /// Relocated by a teleporter; forces a move out next tick.
    Teleported = 3,
}

impl ActorState {
    fn from_bits(bits: u16) -> ActorState {
        match bits & 0x3 {
            0 => ActorState::None,
            1 => ActorState::Hidden,
            2 => ActorState::Moved,
            _ => ActorState::Teleported,
        }
    }
}

pub const STEP_MIN: i8 = -3;
pub const STEP_MAX: i8 = 12;
const STEP_BIAS: i8 = 3;

/// Packed actor list entry.
///
/// ```text
///   bits 0..=4   x
///   bits 5..=6   state
///   bits 7..=11  y
///   bits 12..=15 step + 3
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct ActiveActor(u16);

impl ActiveActor {
    pub fn new(x: u8, y: u8, step: i8, state: ActorState) -> ActiveActor {
        debug_assert!(x < 32 && y < 32);
        debug_assert!((STEP_MIN..=STEP_MAX).contains(&step), "step {step} out of range");
        let step_bits = (step.clamp(STEP_MIN, STEP_MAX) + STEP_BIAS) as u16;
        ActiveActor(
            (x as u16 & 0x1f)
                | (state as u16) << 5
                | (y as u16 & 0x1f) << 7
                | step_bits << 12,
        )
    }

    pub fn x(self) -> u8 {
        (self.0 & 0x1f) as u8
    }

    pub fn y(self) -> u8 {
        ((self.0 >> 7) & 0x1f) as u8
    }

    pub fn step(self) -> i8 {
        (self.0 >> 12) as i8 - STEP_BIAS
    }

    pub fn state(self) -> ActorState {
        ActorState::from_bits(self.0 >> 5)
    }

    pub fn is_hidden(self) -> bool {
        self.state() == ActorState::Hidden
    }

    pub fn with_state(self, state: ActorState) -> ActiveActor {
        ActiveActor::new(self.x(), self.y(), self.step(), state)
    }

    pub fn with_step(self, step: i8) -> ActiveActor {
        ActiveActor::new(self.x(), self.y(), step, self.state())
    }
}
