/// Level: the complete state of one level attempt.
///
/// ## Grid and actor list
///
/// Two packed layers, `bottom` (terrain) and `top` (occupants), plus the
/// bounded actor list. An actor's kind and facing are stored only in the
/// top-layer cell at its position; the list entry holds position, step
/// counter and transient state.
///
/// Movement code works on a `MovingActor`, a copy of one list entry joined
/// with its top-layer cell. `Level::commit` is the only function that
/// writes a list entry together with its cell, so the two never drift
/// apart outside a single operation.
///
/// ## Lifecycle
///
/// `Level::new` takes the loader's `LevelData`, `init` (re)builds the
/// actor list and scalar state, then `step` runs once per tick until
/// `is_game_over`. `restart` puts the layers back and calls `init` again.

use log::warn;
use thiserror::Error;

use crate::domain::dir::{DirMask, Direction};
use crate::domain::entity::{ActiveActor, Actor, ActorState, Entity};
use crate::domain::grid::{Layer, GRID_HEIGHT, GRID_WIDTH};
use crate::domain::rng::{LegacyRng, Randomness};
use crate::domain::tile::Tile;
use super::event::{EventSet, GameEvent};
use super::links::{Links, Teleporters};

pub const MAX_ACTORS: usize = 128;
pub const TICKS_PER_SECOND: u32 = 20;
/// Idle ticks before Chip turns to face the player.
pub const CHIP_REST_TICKS: u8 = 15;
pub const CHIP_REST_DIRECTION: Direction = Direction::South;

// ── Outcome ──

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum EndCause {
    #[default]
    None,
    Complete,
    Drowned,
    Burned,
    Bombed,
    OutOfTime,
    CollidedMonster,
    CollidedBlock,
}

impl EndCause {
    pub fn is_collision(self) -> bool {
        matches!(self, EndCause::CollidedMonster | EndCause::CollidedBlock)
    }

    pub fn is_death(self) -> bool {
        !matches!(self, EndCause::None | EndCause::Complete | EndCause::OutOfTime)
    }
}

impl std::fmt::Display for EndCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            EndCause::None => "still playing",
            EndCause::Complete => "level complete",
            EndCause::Drowned => "drowned",
            EndCause::Burned => "burned",
            EndCause::Bombed => "bombed",
            EndCause::OutOfTime => "out of time",
            EndCause::CollidedMonster => "hit by a monster",
            EndCause::CollidedBlock => "crushed by a block",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LevelError {
    #[error("no chip on the level")]
    NoPlayer,
    #[error("{count} chips on the level, only the last one is played")]
    MultiplePlayers { count: usize },
    #[error("more than {} actors on the level", MAX_ACTORS)]
    TooManyActors,
    #[error("unknown {layer} tile code {code:#04x} at ({x}, {y})")]
    UnknownCode { layer: &'static str, x: u8, y: u8, code: u8 },
}

// ── Inventory ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Boot {
    Water = 0,
    Fire = 1,
    Ice = 2,
    Slide = 3,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Inventory {
    /// Blue, red, green, yellow.
    pub keys: [u8; 4],
    /// One bit per `Boot`.
    pub boots: u8,
}

impl Inventory {
    pub fn has_boots(&self, boot: Boot) -> bool {
        self.boots & (1 << boot as u8) != 0
    }
}

// ── Loader input ──

/// Everything a level loader hands to the engine.
#[derive(Clone, Debug)]
pub struct LevelData {
    pub title: String,
    pub bottom: Layer,
    pub top: Layer,
    /// Seconds; 0 means untimed.
    pub time_limit: u16,
    pub required_chips: u16,
    pub trap_links: Links,
    pub cloner_links: Links,
}

impl Default for LevelData {
    fn default() -> Self {
        LevelData {
            title: String::new(),
            bottom: Layer::new(),
            top: Layer::new(),
            time_limit: 0,
            required_chips: 0,
            trap_links: Links::new(),
            cloner_links: Links::new(),
        }
    }
}

/// Initial conditions recorded alongside a solution.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct StartConditions {
    /// 0..=7, shifts the teeth rhythm and death animation parity.
    pub stepping: u8,
    pub random_slide_dir: Direction,
}

impl Default for StartConditions {
    fn default() -> Self {
        StartConditions { stepping: 0, random_slide_dir: Direction::North }
    }
}

// ── Per-tick state ──

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub(crate) struct Flags {
    /// Toggle floors and walls flip at the start of next tick.
    pub toggle: bool,
    /// Reversed tanks turn around at the start of next tick.
    pub turn_tanks: bool,
    pub chip_self_moved: bool,
    pub chip_force_moved: bool,
    pub chip_can_unslide: bool,
    /// Chip found every teleporter blocked; set for the rest of the attempt.
    pub chip_stuck: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
struct Input {
    held: DirMask,
    /// Pressed since Chip last chose a move.
    latched: DirMask,
}

impl Input {
    /// Held and latched directions, with an axis pressed both ways resolved
    /// to the held side or dropped.
    fn resolved(self) -> DirMask {
        let mut mask = DirMask::NONE;
        for axis in [DirMask::VERTICAL, DirMask::HORIZONTAL] {
            let both = (self.held | self.latched) & axis;
            if both != axis {
                mask |= both;
            } else if (self.held & axis) != axis {
                mask |= self.held & axis;
            } else {
                log::debug!("dropping opposite inputs {:#x}", axis.bits());
            }
        }
        mask
    }
}

/// Transient state of a `MovingActor`. `Died` and `Ghost` only exist
/// between load and commit, and are stored as hidden.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum MoveState {
    None,
    Hidden,
    Moved,
    Teleported,
    /// Leaves a death animation on its cell.
    Died,
    /// Ghost block that did not move: leaves the list, keeps its cell.
    Ghost,
}

impl MoveState {
    fn from_list(state: ActorState) -> MoveState {
        match state {
            ActorState::None => MoveState::None,
            ActorState::Hidden => MoveState::Hidden,
            ActorState::Moved => MoveState::Moved,
            ActorState::Teleported => MoveState::Teleported,
        }
    }

    fn to_list(self) -> ActorState {
        match self {
            MoveState::None => ActorState::None,
            MoveState::Moved => ActorState::Moved,
            MoveState::Teleported => ActorState::Teleported,
            MoveState::Hidden | MoveState::Died | MoveState::Ghost => ActorState::Hidden,
        }
    }
}

/// Working copy of one actor list entry joined with its top-layer cell.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) struct MovingActor {
    pub index: usize,
    pub x: u8,
    pub y: u8,
    pub step: i8,
    pub entity: Entity,
    pub dir: Direction,
    pub state: MoveState,
}

impl MovingActor {
    pub fn actor(&self) -> Actor {
        Actor::new(self.entity, self.dir)
    }

    pub fn pos(&self) -> (u8, u8) {
        (self.x, self.y)
    }

    pub fn is_chip(&self) -> bool {
        self.entity == Entity::Chip
    }
}

// ── Level ──

#[derive(Clone, PartialEq, Debug)]
pub struct Level<R = LegacyRng> {
    pub(crate) bottom: Layer,
    pub(crate) top: Layer,
    initial_bottom: Layer,
    initial_top: Layer,

    pub(crate) actors: [ActiveActor; MAX_ACTORS],
    pub(crate) actors_len: usize,

    pub(crate) trap_links: Links,
    pub(crate) cloner_links: Links,
    pub(crate) teleporters: Teleporters,

    time_limit: u16,
    required_chips: u16,
    pub(crate) conditions: StartConditions,

    pub(crate) untimed: bool,
    pub(crate) time_left: u32,
    pub(crate) current_time: u32,
    pub(crate) chips_left: u16,
    pub(crate) inventory: Inventory,
    pub(crate) flags: Flags,
    pub(crate) random_slide_dir: Direction,

    /// Facing Chip chose last tick, for diagonal input.
    pub(crate) chip_last_dir: Direction,
    /// Direction of Chip's last started move, for trap release.
    pub(crate) last_chip_dir: Direction,
    pub(crate) ticks_since_move: u8,
    /// Cell Chip is about to enter this tick, if it chose the move itself.
    pub(crate) chip_new_pos: Option<(u8, u8)>,
    pub(crate) collided_with: Option<usize>,
    pub(crate) collided_actor: Actor,
    /// Chip's cell code while a monster shares its teleporter.
    pub(crate) teleported_chip: Actor,
    pub(crate) actor_springing_trap: Option<usize>,
    pub(crate) end_cause: EndCause,

    input: Input,
    pub(crate) events: EventSet,
    pub(crate) rng: R,
}

impl Level<LegacyRng> {
    /// Level driven by the legacy generators, seeded with `seed`.
    pub fn legacy(data: &LevelData, seed: u32) -> Self {
        Level::new(data, LegacyRng::new(seed))
    }
}

impl<R: Randomness> Level<R> {
    // ── Construction ──

    pub fn new(data: &LevelData, rng: R) -> Self {
        Level {
            bottom: data.bottom.clone(),
            top: data.top.clone(),
            initial_bottom: data.bottom.clone(),
            initial_top: data.top.clone(),
            actors: [ActiveActor::default(); MAX_ACTORS],
            actors_len: 0,
            trap_links: data.trap_links,
            cloner_links: data.cloner_links,
            teleporters: Teleporters::new(),
            time_limit: data.time_limit,
            required_chips: data.required_chips,
            conditions: StartConditions::default(),
            untimed: data.time_limit == 0,
            time_left: 0,
            current_time: 0,
            chips_left: data.required_chips,
            inventory: Inventory::default(),
            flags: Flags::default(),
            random_slide_dir: Direction::North,
            chip_last_dir: Direction::South,
            last_chip_dir: Direction::North,
            ticks_since_move: 0,
            chip_new_pos: None,
            collided_with: None,
            collided_actor: Actor::NONE,
            teleported_chip: Actor::NONE,
            actor_springing_trap: None,
            end_cause: EndCause::None,
            input: Input::default(),
            events: EventSet::default(),
            rng,
        }
    }

    pub fn with_conditions(mut self, conditions: StartConditions) -> Self {
        self.conditions = conditions;
        self
    }

    pub fn set_conditions(&mut self, conditions: StartConditions) {
        self.conditions = conditions;
    }

    pub fn rng_mut(&mut self) -> &mut R {
        &mut self.rng
    }

    /// Reset scalar state and rebuild the actor list from the grid.
    ///
    /// On a level-authoring error the level is still left playable where
    /// possible and the first error found is returned. Without a chip the
    /// actor list stays empty and `step` does nothing.
    pub fn init(&mut self) -> Result<(), LevelError> {
        self.flags = Flags::default();
        self.untimed = self.time_limit == 0;
        self.time_left = self.time_limit as u32 * TICKS_PER_SECOND;
        self.current_time = 0;
        self.chips_left = self.required_chips;
        self.inventory = Inventory::default();
        self.random_slide_dir = self.conditions.random_slide_dir;
        self.chip_last_dir = Direction::South;
        self.last_chip_dir = Direction::North;
        self.ticks_since_move = 0;
        self.chip_new_pos = None;
        self.collided_with = None;
        self.collided_actor = Actor::NONE;
        self.teleported_chip = Actor::NONE;
        self.actor_springing_trap = None;
        self.end_cause = EndCause::None;
        self.input = Input::default();
        self.events.clear();
        self.rng.restart();

        self.build_teleporters();
        let mut first_error = self.check_codes().err();
        if let Err(e) = self.build_actor_list() {
            first_error.get_or_insert(e);
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Put the level back as loaded and start a new attempt.
    pub fn restart(&mut self) -> Result<(), LevelError> {
        self.bottom = self.initial_bottom.clone();
        self.top = self.initial_top.clone();
        self.init()
    }

    fn check_codes(&self) -> Result<(), LevelError> {
        for (x, y) in cells() {
            let code = self.bottom.get(x, y);
            if Tile::from_code(code).is_none() {
                return Err(LevelError::UnknownCode { layer: "bottom", x, y, code });
            }
            let code = self.top.get(x, y);
            if code > Actor::ANIMATION.code() && Actor::from_code(code).entity() == Entity::None {
                return Err(LevelError::UnknownCode { layer: "top", x, y, code });
            }
        }
        Ok(())
    }

    fn build_teleporters(&mut self) {
        self.teleporters.clear();
        for (x, y) in cells() {
            if self.bottom_tile(x, y) == Tile::Teleporter {
                self.teleporters.push(x, y);
            }
        }
    }

    /// Actors in reading order, Chip swapped to the front. Occupants of
    /// static tiles stay out of the list.
    fn build_actor_list(&mut self) -> Result<(), LevelError> {
        self.actors_len = 0;
        let mut chip_index = None;
        let mut chips = 0;
        let mut overflow = false;
        for (x, y) in cells() {
            let entity = self.top_actor(x, y).entity();
            if entity == Entity::Chip {
                chip_index = Some(self.actors_len);
                chips += 1;
            } else if !entity.is_on_actor_list() || self.bottom_tile(x, y).is_static() {
                continue;
            }
            self.actors[self.actors_len] = ActiveActor::new(x, y, 0, ActorState::None);
            self.actors_len += 1;
            if self.actors_len == MAX_ACTORS {
                warn!("actor list full at ({x}, {y}), remaining actors stay frozen");
                overflow = true;
                break;
            }
        }

        let Some(chip_index) = chip_index else {
            warn!("level has no chip");
            self.actors_len = 0;
            return Err(LevelError::NoPlayer);
        };
        self.actors.swap(0, chip_index);

        if chips > 1 {
            warn!("level has {chips} chips");
            return Err(LevelError::MultiplePlayers { count: chips });
        }
        if overflow {
            return Err(LevelError::TooManyActors);
        }
        Ok(())
    }

    // ── Input ──

    /// Directions held down for the coming tick (N=1, W=2, S=4, E=8).
    pub fn set_input(&mut self, held: DirMask) {
        self.input.held = held;
    }

    /// Record a key press that should count even if released before Chip
    /// can act on it.
    pub fn press(&mut self, dir: Direction) {
        self.input.latched |= dir.mask();
    }

    pub(crate) fn chip_input(&self) -> DirMask {
        self.input.resolved()
    }

    pub(crate) fn consume_latched_input(&mut self) {
        self.input.latched = DirMask::NONE;
    }

    // ── Queries ──

    pub fn bottom_tile(&self, x: u8, y: u8) -> Tile {
        // unknown codes are rejected by init and read as walls
        Tile::from_code(self.bottom.get(x, y)).unwrap_or(Tile::Wall)
    }

    pub fn top_actor(&self, x: u8, y: u8) -> Actor {
        Actor::from_code(self.top.get(x, y))
    }

    pub fn bottom_layer(&self) -> &Layer {
        &self.bottom
    }

    pub fn top_layer(&self) -> &Layer {
        &self.top
    }

    pub fn is_game_over(&self) -> bool {
        self.end_cause != EndCause::None
    }

    pub fn end_cause(&self) -> EndCause {
        self.end_cause
    }

    pub fn is_collision(&self) -> bool {
        self.end_cause.is_collision()
    }

    /// Occupant Chip collided with, if the attempt ended that way.
    pub fn collided_actor(&self) -> Option<Actor> {
        self.is_collision().then_some(self.collided_actor)
    }

    pub fn chip_position(&self) -> (u8, u8) {
        let chip = self.actors[0];
        (chip.x(), chip.y())
    }

    pub fn chip_facing(&self) -> Direction {
        let (x, y) = self.chip_position();
        self.top_actor(x, y).dir()
    }

    /// Remaining ticks, or `None` when untimed.
    pub fn time_left(&self) -> Option<u32> {
        (!self.untimed).then_some(self.time_left)
    }

    /// Remaining whole seconds as shown on a HUD, rounded up.
    pub fn time_left_seconds(&self) -> Option<u32> {
        self.time_left().map(|t| t.div_ceil(TICKS_PER_SECOND))
    }

    pub fn current_time(&self) -> u32 {
        self.current_time
    }

    pub fn chips_left(&self) -> u16 {
        self.chips_left
    }

    pub fn inventory(&self) -> Inventory {
        self.inventory
    }

    pub fn is_chip_stuck(&self) -> bool {
        self.flags.chip_stuck
    }

    /// Chip is standing on the hint tile.
    pub fn on_hint(&self) -> bool {
        if self.actors_len == 0 {
            return false;
        }
        let (x, y) = self.chip_position();
        self.bottom_tile(x, y) == Tile::Hint
    }

    pub fn events(&self) -> EventSet {
        self.events
    }

    pub fn take_events(&mut self) -> EventSet {
        std::mem::take(&mut self.events)
    }

    pub fn actor_count(&self) -> usize {
        self.actors_len
    }

    pub fn actor_entry(&self, index: usize) -> Option<ActiveActor> {
        self.actors[..self.actors_len].get(index).copied()
    }

    pub(crate) fn has_boots(&self, boot: Boot) -> bool {
        self.inventory.has_boots(boot)
    }

    pub(crate) fn raise(&mut self, event: GameEvent) {
        self.events.insert(event);
    }

    // ── Grid writes ──

    pub(crate) fn set_bottom_tile(&mut self, x: u8, y: u8, tile: Tile) {
        self.bottom.set(x, y, tile.code());
    }

    pub(crate) fn set_top_actor(&mut self, x: u8, y: u8, actor: Actor) {
        self.top.set(x, y, actor.code());
    }

    // ── Actor list ──

    /// Working copy of list entry `index`.
    pub(crate) fn load_actor(&self, index: usize) -> MovingActor {
        let entry = self.actors[index];
        let cell = self.top_actor(entry.x(), entry.y());
        MovingActor {
            index,
            x: entry.x(),
            y: entry.y(),
            step: entry.step(),
            entity: cell.entity(),
            dir: cell.dir(),
            state: MoveState::from_list(entry.state()),
        }
    }

    /// Write a working copy back to its list entry and its top-layer cell.
    pub(crate) fn commit(&mut self, act: &MovingActor) {
        self.actors[act.index] = ActiveActor::new(act.x, act.y, act.step, act.state.to_list());
        let cell = match act.state {
            MoveState::Died => Actor::ANIMATION,
            MoveState::Hidden => Actor::NONE,
            _ => act.actor(),
        };
        self.set_top_actor(act.x, act.y, cell);
    }

    pub(crate) fn set_entry_state(&mut self, index: usize, state: ActorState) {
        self.actors[index] = self.actors[index].with_state(state);
    }

    /// First live actor at a cell; with `include_animated`, also a slot
    /// still playing its death animation there.
    pub(crate) fn lookup_actor(&self, x: u8, y: u8, include_animated: bool) -> Option<MovingActor> {
        (0..self.actors_len)
            .find(|&i| {
                let a = self.actors[i];
                a.x() == x && a.y() == y && (!a.is_hidden() || (include_animated && a.step() != 0))
            })
            .map(|i| self.load_actor(i))
    }

    /// A hidden slot to fill in: a finished dead actor, or a new entry.
    /// Nothing needs committing if the caller ends up not using it.
    pub(crate) fn spawn_actor(&mut self) -> Option<MovingActor> {
        if let Some(i) = (0..self.actors_len).find(|&i| self.actors[i].is_hidden() && self.actors[i].step() == 0) {
            return Some(self.load_actor(i));
        }
        if self.actors_len >= MAX_ACTORS {
            warn!("actor list full ({MAX_ACTORS}), cannot spawn");
            return None;
        }
        let index = self.actors_len;
        self.actors[index] = ActiveActor::new(0, 0, 0, ActorState::Hidden);
        self.actors_len += 1;
        Some(MovingActor {
            index,
            x: 0,
            y: 0,
            step: 0,
            entity: Entity::None,
            dir: Direction::North,
            state: MoveState::Hidden,
        })
    }

    pub(crate) fn stop_death_animation(&mut self, x: u8, y: u8) {
        for i in 0..self.actors_len {
            let a = self.actors[i];
            if a.x() == x && a.y() == y {
                self.actors[i] = a.with_step(0);
            }
        }
        self.set_top_actor(x, y, Actor::NONE);
    }
}

/// Every cell in reading order.
pub(crate) fn cells() -> impl Iterator<Item = (u8, u8)> {
    (0..GRID_HEIGHT as u8).flat_map(|y| (0..GRID_WIDTH as u8).map(move |x| (x, y)))
}
