/// Move legality and move execution.
///
/// ## Legality (`can_move`)
///
/// Checked top to bottom; the first matching row decides.
///
/// ┌────────────────────────────────────────────┬─────────┬──────────────────┐
/// │ Condition                                   │ Result  │ Applies to       │
/// ├────────────────────────────────────────────┼─────────┼──────────────────┤
/// │ destination off the grid                    │ DENY    │ all              │
/// │ on trap/cloner and not being released       │ DENY    │ all              │
/// │ on static trap                              │ DENY    │ all              │
/// │ destination toggle tile in wall phase       │ DENY    │ all              │
/// │ backing out against a force floor           │ DENY    │ all but booted   │
/// │ thin wall / ice corner in the way           │ DENY    │ all              │
/// │ chip wall (not revealable)                  │ DENY    │ chip             │
/// │ socket with chips left, lock without key    │ DENY    │ chip             │
/// │ animation still running there               │ DENY    │ chip             │
/// │ block there that cannot be pushed           │ DENY    │ chip             │
/// │ revealable wall (revealed on a real move)   │ DENY    │ chip             │
/// │ stuck on a teleporter                       │ DENY    │ chip             │
/// │ otherwise                                   │ ALLOW   │ chip             │
/// │ block mid-move, block wall                  │ DENY    │ block            │
/// │ monster wall, fire (except fireball)        │ DENY    │ monster          │
/// │ monster or block already there              │ DENY    │ block, monster   │
/// │ otherwise                                   │ ALLOW   │ block, monster   │
/// └────────────────────────────────────────────┴─────────┴──────────────────┘
///
/// ## Execution (`perform_move`)
///
/// `start_movement` re-validates and relocates the actor, detecting the
/// three collision cases; `continue_movement` counts the step down
/// (2 per tick, 1 for blobs, doubled on ice and force floors);
/// `end_movement` applies the tile underneath once the step reaches zero.

use log::debug;

use crate::domain::dir::Direction;
use crate::domain::entity::{Actor, ActorState, Entity};
use crate::domain::grid::neighbor;
use crate::domain::rng::Randomness;
use crate::domain::tile::Tile;
use super::event::GameEvent;
use super::world::{Boot, EndCause, Level, MoveState, MovingActor};

/// Context of a legality probe.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub(crate) struct MoveFlags(u8);

impl MoveFlags {
    pub const NONE: MoveFlags = MoveFlags(0);
    /// The move is really happening: reveal walls.
    pub const START_MOVEMENT: MoveFlags = MoveFlags(0x01);
    /// Turn (and mark moved) any block Chip would push.
    pub const PUSH_BLOCKS: MoveFlags = MoveFlags(0x02);
    /// Also move the pushed block right away.
    pub const PUSH_BLOCKS_NOW: MoveFlags = MoveFlags(0x04);
    /// Leaving a trap or cloner.
    pub const RELEASING: MoveFlags = MoveFlags(0x08);
    /// Clear a finished death animation at the destination.
    pub const CLEAR_ANIM: MoveFlags = MoveFlags(0x10);

    const PUSH_ANY: MoveFlags = MoveFlags(0x02 | 0x04);

    pub fn contains(self, other: MoveFlags) -> bool {
        self.0 & other.0 == other.0
    }

    fn intersects(self, other: MoveFlags) -> bool {
        self.0 & other.0 != 0
    }

    fn without(self, other: MoveFlags) -> MoveFlags {
        MoveFlags(self.0 & !other.0)
    }
}

impl std::ops::BitOr for MoveFlags {
    type Output = MoveFlags;
    fn bitor(self, rhs: MoveFlags) -> MoveFlags {
        MoveFlags(self.0 | rhs.0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum MoveResult {
    /// Could not move; still alive.
    Fail,
    /// Moved, or had nothing to do.
    Success,
    Died,
}

/// Step units added when a move starts.
const MOVE_STEPS: i8 = 8;
/// Death animation length, before the parity tick.
const DEATH_ANIMATION_STEPS: i8 = 11;

impl<R: Randomness> Level<R> {
    // ══════════════════════════════════════════════════════════════
    // Legality
    // ══════════════════════════════════════════════════════════════

    pub(crate) fn can_move(&mut self, act: &MovingActor, dir: Direction, flags: MoveFlags) -> bool {
        let Some((px, py)) = neighbor(act.x, act.y, dir) else { return false };
        let tile_from = self.bottom_tile(act.x, act.y);
        let tile_to = self.bottom_tile(px, py);

        if matches!(tile_from, Tile::Trap | Tile::Cloner) && !flags.contains(MoveFlags::RELEASING) {
            return false;
        }
        if tile_from == Tile::StaticTrap {
            return false;
        }
        if tile_to.is_toggle_tile() && tile_to.with_toggle_state(self.flags.toggle) == Tile::ToggleWall {
            return false;
        }
        if tile_from.is_slide()
            && (!act.is_chip() || !self.has_boots(Boot::Slide))
            && self.peek_slide_dir(tile_from) == dir.back()
        {
            return false;
        }
        if (tile_from.blocked_from() | tile_to.blocked_to()).contains(dir) {
            return false;
        }

        if act.is_chip() {
            return self.chip_can_enter(px, py, tile_to, dir, flags);
        }
        if act.entity.is_block() {
            if act.step > 0 || tile_to.is_block_acting_wall() {
                return false;
            }
        } else {
            if tile_to.is_monster_acting_wall() {
                return false;
            }
            if tile_to == Tile::Fire && act.entity != Entity::Fireball {
                return false;
            }
        }

        let other = self.top_actor(px, py);
        if other.entity().is_monster_or_block() {
            return false;
        }
        if flags.contains(MoveFlags::CLEAR_ANIM) && other == Actor::ANIMATION {
            self.stop_death_animation(px, py);
        }
        true
    }

    fn chip_can_enter(&mut self, px: u8, py: u8, tile_to: Tile, dir: Direction, flags: MoveFlags) -> bool {
        if tile_to.is_chip_acting_wall() && !tile_to.is_revealable_wall() {
            return false;
        }
        if tile_to == Tile::Socket && self.chips_left > 0 {
            return false;
        }
        if tile_to.is_lock() && self.inventory.keys[tile_to.variant() as usize] == 0 {
            return false;
        }

        let mut other = self.lookup_actor(px, py, true);
        if other.is_none() && self.top_actor(px, py).entity() == Entity::BlockGhost {
            // a ghost block joins the list only once something pushes it
            if let Some(mut ghost) = self.spawn_actor() {
                ghost.entity = Entity::BlockGhost;
                ghost.dir = self.top_actor(px, py).dir();
                ghost.x = px;
                ghost.y = py;
                ghost.state = MoveState::None;
                other = Some(ghost);
            }
        }
        if let Some(mut other) = other {
            if other.state == MoveState::Hidden {
                if other.step > 0 {
                    return false;
                }
            } else if other.entity.is_block()
                && !self.can_push_block(&mut other, dir, flags.without(MoveFlags::RELEASING))
            {
                if other.entity == Entity::BlockGhost {
                    self.set_entry_state(other.index, ActorState::Hidden);
                }
                return false;
            }
        }

        if tile_to.is_revealable_wall() {
            if flags.contains(MoveFlags::START_MOVEMENT) {
                self.set_bottom_tile(px, py, Tile::Wall);
            }
            return false;
        }
        !self.flags.chip_stuck
    }

    /// Whether `block` can be pushed in `dir`. With a push flag the block
    /// is turned that way (and moved with `PUSH_BLOCKS_NOW`) and committed.
    pub(crate) fn can_push_block(&mut self, block: &mut MovingActor, dir: Direction, flags: MoveFlags) -> bool {
        let mut changed = false;
        let can_push = if !self.can_move(block, dir, flags) {
            // blocks already forced to move this tick keep their facing
            if block.step == 0 && flags.intersects(MoveFlags::PUSH_ANY) && block.state != MoveState::Moved {
                block.dir = dir;
                changed = true;
            }
            false
        } else {
            if flags.intersects(MoveFlags::PUSH_ANY) {
                block.dir = dir;
                block.state = MoveState::Moved;
                if flags.contains(MoveFlags::PUSH_BLOCKS_NOW) {
                    self.perform_move(block, MoveFlags::NONE);
                }
                changed = true;
                if self.actor_springing_trap == Some(block.index) {
                    // pushed off the trap button while it was springing the trap
                    self.actor_springing_trap = None;
                }
            }
            true
        };
        if changed {
            self.commit(block);
        }
        can_push
    }

    // ══════════════════════════════════════════════════════════════
    // Execution
    // ══════════════════════════════════════════════════════════════

    pub(crate) fn perform_move(&mut self, act: &mut MovingActor, flags: MoveFlags) -> MoveResult {
        let releasing = flags.contains(MoveFlags::RELEASING);
        if act.step <= 0 {
            let mut dir_before = None;
            if releasing {
                // Chip leaves a trap the way it went in, whatever is held now
                if act.is_chip() {
                    dir_before = Some(act.dir);
                    act.dir = self.last_chip_dir;
                }
            } else if act.state == MoveState::None {
                return MoveResult::Success;
            }

            let result = self.start_movement(act, flags);
            if result != MoveResult::Success {
                if let Some(dir) = dir_before {
                    act.dir = dir;
                    self.last_chip_dir = dir;
                }
                return result;
            }
        }

        if !self.continue_movement(act) {
            let cause = self.end_movement(act);
            if cause != EndCause::None {
                if act.is_chip() {
                    self.end_cause = cause;
                } else {
                    act.state = MoveState::Died;
                    let parity = (self.current_time.wrapping_add(self.conditions.stepping as u32) & 1) as i8;
                    act.step = DEATH_ANIMATION_STEPS + parity;
                }
                return MoveResult::Died;
            }
        }
        MoveResult::Success
    }

    fn start_movement(&mut self, act: &mut MovingActor, flags: MoveFlags) -> MoveResult {
        let tile_from = self.bottom_tile(act.x, act.y);

        if act.is_chip() {
            if !self.has_boots(Boot::Slide) {
                if tile_from.is_slide() && !self.flags.chip_self_moved {
                    self.flags.chip_can_unslide = true;
                } else if !tile_from.is_ice() || self.has_boots(Boot::Ice) {
                    self.flags.chip_can_unslide = false;
                }
            }
            self.flags.chip_force_moved = false;
            self.flags.chip_self_moved = false;
            self.last_chip_dir = act.dir;
        }

        let probe = MoveFlags::START_MOVEMENT | MoveFlags::CLEAR_ANIM | MoveFlags::PUSH_BLOCKS_NOW | flags;
        if !self.can_move(act, act.dir, probe) {
            if tile_from.is_ice() && (!act.is_chip() || !self.has_boots(Boot::Ice)) {
                act.dir = act.dir.back();
                self.apply_ice_wall_turn(act);
            }
            return MoveResult::Fail;
        }
        debug_assert!(
            !matches!(tile_from, Tile::Cloner | Tile::Trap) || flags.contains(MoveFlags::RELEASING)
        );

        let mut chip_collided = false;
        if act.entity.is_monster() && self.chip_new_pos == Some(act.pos()) {
            // leaving the cell Chip is about to enter
            self.collided_with = Some(act.index);
            self.collided_actor = act.actor();
        } else if act.is_chip() {
            if let Some(index) = self.collided_with {
                let other = self.actors[index];
                if !other.is_hidden() {
                    // the monster has already moved on; take it off its new cell
                    chip_collided = true;
                    self.set_top_actor(other.x(), other.y(), Actor::NONE);
                }
            }
        }

        let Some((x, y)) = neighbor(act.x, act.y, act.dir) else { return MoveResult::Fail };
        if act.is_chip() {
            let other = self.top_actor(x, y);
            if other.entity() != Entity::None {
                chip_collided = true;
                self.collided_actor = other;
            }
        }

        if tile_from != Tile::Cloner {
            self.set_top_actor(act.x, act.y, Actor::NONE);
        }
        act.x = x;
        act.y = y;

        if !act.is_chip() {
            let chip = self.actors[0];
            if (x, y) == (chip.x(), chip.y()) {
                chip_collided = true;
                self.collided_actor = act.actor();
                // Chip's turn still comes this tick; keep it from moving again
                self.set_entry_state(0, ActorState::None);
            }
        }

        if chip_collided {
            self.end_cause = if self.collided_actor.is_block() {
                EndCause::CollidedBlock
            } else {
                EndCause::CollidedMonster
            };
            return MoveResult::Died;
        }

        act.step += MOVE_STEPS;
        MoveResult::Success
    }

    /// Count the move down; true while it is still in progress.
    fn continue_movement(&mut self, act: &mut MovingActor) -> bool {
        debug_assert!(act.step > 0);
        let tile = self.bottom_tile(act.x, act.y);
        let mut speed = if act.entity == Entity::Blob { 1 } else { 2 };
        if tile.is_ice() && (!act.is_chip() || !self.has_boots(Boot::Ice)) {
            speed *= 2;
        } else if tile.is_slide() && (!act.is_chip() || !self.has_boots(Boot::Slide)) {
            speed *= 2;
        }
        act.step -= speed;
        act.step > 0
    }

    /// Apply the tile an actor has just arrived on. Returns how it died, if it did.
    fn end_movement(&mut self, act: &mut MovingActor) -> EndCause {
        let tile = self.bottom_tile(act.x, act.y);
        let variant = tile.variant() as usize;

        if !act.is_chip() || !self.has_boots(Boot::Ice) {
            self.apply_ice_wall_turn(act);
        }

        let mut new_tile = None;
        let mut cause = EndCause::None;
        if act.is_chip() {
            match tile {
                Tile::Water if !self.has_boots(Boot::Water) => cause = EndCause::Drowned,
                Tile::Fire if !self.has_boots(Boot::Fire) => cause = EndCause::Burned,
                Tile::Dirt | Tile::WallBlueFake => new_tile = Some(Tile::Floor),
                Tile::RecessedWall => new_tile = Some(Tile::Wall),
                t if t.is_lock() => {
                    if t != Tile::LockGreen {
                        self.inventory.keys[variant] = self.inventory.keys[variant].saturating_sub(1);
                    }
                    new_tile = Some(Tile::Floor);
                }
                t if t.is_key() => {
                    self.inventory.keys[variant] = self.inventory.keys[variant].saturating_add(1);
                    self.raise(GameEvent::KeyTaken);
                    new_tile = Some(Tile::Floor);
                }
                t if t.is_boots() => {
                    self.inventory.boots |= 1 << variant;
                    self.raise(GameEvent::BootsTaken);
                    new_tile = Some(Tile::Floor);
                }
                Tile::Thief => self.inventory.boots = 0,
                Tile::Chip => {
                    let before = self.chips_left;
                    self.chips_left = before.saturating_sub(1);
                    self.raise(GameEvent::ChipTaken);
                    if before == 1 {
                        self.raise(GameEvent::LastChipTaken);
                    }
                    new_tile = Some(Tile::Floor);
                }
                Tile::Socket => new_tile = Some(Tile::Floor),
                Tile::Exit => cause = EndCause::Complete,
                _ => {}
            }
        } else {
            match tile {
                Tile::Water => {
                    if act.entity.is_block() {
                        new_tile = Some(Tile::Dirt);
                    }
                    if act.entity != Entity::Glider {
                        cause = EndCause::Drowned;
                    }
                }
                Tile::KeyBlue => new_tile = Some(Tile::Floor),
                _ => {}
            }
        }

        match tile {
            Tile::Bomb => {
                new_tile = Some(Tile::Floor);
                cause = EndCause::Bombed;
            }
            Tile::ButtonGreen => self.flags.toggle = !self.flags.toggle,
            Tile::ButtonBlue => self.turn_tanks(act),
            Tile::ButtonRed => self.activate_cloner(act.x, act.y),
            _ => {}
        }

        if let Some(t) = new_tile {
            self.set_bottom_tile(act.x, act.y, t);
        }
        cause
    }

    // ══════════════════════════════════════════════════════════════
    // Terrain helpers
    // ══════════════════════════════════════════════════════════════

    pub(crate) fn apply_ice_wall_turn(&self, act: &mut MovingActor) {
        if let Some(dir) = self.bottom_tile(act.x, act.y).ice_corner_turn(act.dir) {
            act.dir = dir;
        }
    }

    /// Force floor direction without using up the random floor's turn.
    pub(crate) fn peek_slide_dir(&self, tile: Tile) -> Direction {
        tile.slide_direction().unwrap_or(self.random_slide_dir)
    }

    /// Force floor direction; the random floor turns right on every use.
    pub(crate) fn advance_slide_dir(&mut self, tile: Tile) -> Direction {
        if tile == Tile::ForceFloorRandom {
            self.random_slide_dir = self.random_slide_dir.right();
        }
        self.peek_slide_dir(tile)
    }

    // ══════════════════════════════════════════════════════════════
    // Buttons
    // ══════════════════════════════════════════════════════════════

    /// Blue button: mark every tank not on ice or in a cloner as reversed.
    /// Reversed tanks turn around at the start of the next tick; a second
    /// press before then flips them back.
    fn turn_tanks(&mut self, trigger: &mut MovingActor) {
        self.flags.turn_tanks = true;
        if trigger.entity.is_tank() {
            // its cell is rewritten on commit
            trigger.entity = trigger.entity.reverse_tank();
        }
        for i in 0..self.actors_len {
            let a = self.actors[i];
            if a.is_hidden() {
                continue;
            }
            let tile = self.bottom_tile(a.x(), a.y());
            if tile == Tile::Cloner || tile.is_ice() {
                continue;
            }
            let cell = self.top_actor(a.x(), a.y());
            if cell.entity().is_tank() {
                self.set_top_actor(a.x(), a.y(), cell.with_entity(cell.entity().reverse_tank()));
            }
        }
    }

    /// Brown button at `(x, y)`: release whatever sits in the linked trap.
    pub(crate) fn spring_trap(&mut self, x: u8, y: u8) {
        let Some((tx, ty)) = self.trap_links.find(x, y) else { return };
        if let Some(mut act) = self.lookup_actor(tx, ty, false) {
            self.perform_move(&mut act, MoveFlags::RELEASING);
            self.commit(&act);
        }
    }

    /// Red button at `(x, y)`: the linked cloner sends out a copy of its
    /// occupant. With the actor list full the occupant itself comes out.
    fn activate_cloner(&mut self, x: u8, y: u8) {
        let Some((cx, cy)) = self.cloner_links.find(x, y) else { return };
        let Some(mut parent) = self.lookup_actor(cx, cy, false) else { return };

        let Some(spawned) = self.spawn_actor() else {
            debug!("no free actor slot, releasing cloner occupant at ({cx}, {cy})");
            if self.perform_move(&mut parent, MoveFlags::RELEASING) == MoveResult::Success {
                self.set_top_actor(cx, cy, Actor::NONE);
                self.commit(&parent);
            }
            return;
        };

        let clone = MovingActor { index: spawned.index, ..parent };
        parent.state = MoveState::Moved;
        if self.perform_move(&mut parent, MoveFlags::RELEASING) == MoveResult::Success {
            self.commit(&parent);
            self.commit(&clone);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::level::parse_level;

    fn level(text: &str) -> Level {
        let data = parse_level(text).expect("fixture parses");
        let mut level = Level::legacy(&data, 0);
        level.init().expect("fixture initialises");
        level
    }

    fn chip(lv: &Level) -> MovingActor {
        lv.load_actor(0)
    }

    #[test]
    fn walls_and_edges_block_chip() {
        let mut lv = level("@actor chip 0,1 east\n  #\n  #\n");
        let c = chip(&lv);
        assert!(!lv.can_move(&c, Direction::West, MoveFlags::NONE));
        assert!(lv.can_move(&c, Direction::East, MoveFlags::NONE));
        assert!(lv.can_move(&c, Direction::North, MoveFlags::NONE));
    }

    #[test]
    fn thin_walls_block_one_side() {
        let mut lv = level("@actor chip 1,1 south\n#####\n# 6 #\n#####\n");
        let c = chip(&lv);
        // east-facing thin wall: enterable from the west
        assert!(lv.can_move(&c, Direction::East, MoveFlags::NONE));
        let mut lv = level("@actor chip 2,1 south\n#####\n# 6 #\n#####\n");
        let c = chip(&lv);
        assert!(!lv.can_move(&c, Direction::East, MoveFlags::NONE));
        assert!(lv.can_move(&c, Direction::West, MoveFlags::NONE));
    }

    #[test]
    fn locks_and_sockets_need_items() {
        let mut lv = level("@chips 1\n@actor chip 1,1 south\n#####\n# B=#\n#####\n");
        let c = chip(&lv);
        assert!(!lv.can_move(&c, Direction::East, MoveFlags::NONE));
        lv.inventory.keys[0] = 1;
        assert!(lv.can_move(&c, Direction::East, MoveFlags::NONE));
        let mut c2 = c;
        c2.x = 2;
        assert!(!lv.can_move(&c2, Direction::East, MoveFlags::NONE));
        lv.chips_left = 0;
        assert!(lv.can_move(&c2, Direction::East, MoveFlags::NONE));
    }

    #[test]
    fn revealable_wall_turns_solid_only_on_a_real_move() {
        let mut lv = level("@actor chip 1,1 south\n####\n# v#\n####\n");
        let c = chip(&lv);
        assert!(!lv.can_move(&c, Direction::East, MoveFlags::NONE));
        assert_eq!(lv.bottom_tile(2, 1), Tile::WallHidden);
        assert!(!lv.can_move(&c, Direction::East, MoveFlags::START_MOVEMENT));
        assert_eq!(lv.bottom_tile(2, 1), Tile::Wall);
    }

    #[test]
    fn monsters_treat_fire_and_gravel_as_walls() {
        let mut lv = level("@actor chip 5,1 south\n@actor bug 1,1 east\n@actor fireball 1,2 east\n#######\n# F   #\n# F:  #\n#######\n");
        let bug = lv.load_actor(1);
        assert_eq!(bug.entity, Entity::Bug);
        assert!(!lv.can_move(&bug, Direction::East, MoveFlags::NONE));
        let fireball = lv.load_actor(2);
        assert!(lv.can_move(&fireball, Direction::East, MoveFlags::NONE));
        let mut on_fire = fireball;
        on_fire.x = 2;
        assert!(!lv.can_move(&on_fire, Direction::East, MoveFlags::NONE));
    }

    #[test]
    fn toggle_walls_follow_the_pending_flip() {
        let mut lv = level("@actor chip 1,1 south\n####\n# %#\n####\n");
        let c = chip(&lv);
        assert!(!lv.can_move(&c, Direction::East, MoveFlags::NONE));
        lv.flags.toggle = true;
        assert!(lv.can_move(&c, Direction::East, MoveFlags::NONE));
    }

    #[test]
    fn pushing_a_block_moves_it_first() {
        let mut lv = level("@actor chip 1,1 east\n@actor block 2,1 north\n#####\n#   #\n#####\n");
        let c = chip(&lv);
        // probing with push turns the block without moving it
        assert!(lv.can_move(&c, Direction::East, MoveFlags::PUSH_BLOCKS));
        assert_eq!(lv.top_actor(2, 1), Actor::new(Entity::Block, Direction::East));
        assert_eq!(lv.actor_entry(1).unwrap().state(), ActorState::Moved);
        // a real push moves the block out of the way
        assert!(lv.can_move(&c, Direction::East, MoveFlags::PUSH_BLOCKS_NOW));
        assert_eq!(lv.top_actor(3, 1).entity(), Entity::Block);
        assert_eq!(lv.top_actor(2, 1), Actor::NONE);
    }

    #[test]
    fn blocked_block_still_turns() {
        let mut lv = level("@actor chip 1,1 east\n@actor block 2,1 north\n####\n#  #\n####\n");
        let c = chip(&lv);
        assert!(!lv.can_move(&c, Direction::East, MoveFlags::PUSH_BLOCKS));
        assert_eq!(lv.top_actor(2, 1), Actor::new(Entity::Block, Direction::East));
        assert_eq!(lv.actor_entry(1).unwrap().state(), ActorState::None);
    }

    #[test]
    fn ghost_block_joins_the_list_when_pushed() {
        let mut lv = level("@actor chip 1,1 east\n@actor ghost_block 2,1 north\n#####\n#   #\n#####\n");
        assert_eq!(lv.actor_count(), 1);
        let c = chip(&lv);
        assert!(lv.can_move(&c, Direction::East, MoveFlags::PUSH_BLOCKS));
        assert_eq!(lv.actor_count(), 2);
        assert_eq!(lv.top_actor(2, 1), Actor::new(Entity::BlockGhost, Direction::East));
    }

    #[test]
    fn stuck_ghost_block_leaves_the_list_again() {
        let mut lv = level("@actor chip 1,1 east\n@actor ghost_block 2,1 north\n####\n#  #\n####\n");
        let c = chip(&lv);
        assert!(!lv.can_move(&c, Direction::East, MoveFlags::PUSH_BLOCKS));
        assert!(lv.actor_entry(1).unwrap().is_hidden());
        assert_eq!(lv.top_actor(2, 1).entity(), Entity::BlockGhost);
    }

    #[test]
    fn slide_direction_peek_does_not_advance() {
        let mut lv = level("@actor chip 1,1 south\n###\n#?#\n###\n");
        assert_eq!(lv.peek_slide_dir(Tile::ForceFloorRandom), Direction::North);
        assert_eq!(lv.peek_slide_dir(Tile::ForceFloorRandom), Direction::North);
        assert_eq!(lv.advance_slide_dir(Tile::ForceFloorRandom), Direction::East);
        assert_eq!(lv.advance_slide_dir(Tile::ForceFloorRandom), Direction::South);
        assert_eq!(lv.advance_slide_dir(Tile::ForceFloorW), Direction::West);
        assert_eq!(lv.peek_slide_dir(Tile::ForceFloorRandom), Direction::South);
    }

    #[test]
    fn chip_cannot_back_out_of_a_force_floor_without_boots() {
        let mut lv = level("@actor chip 2,1 south\n#####\n# l #\n#####\n");
        let c = chip(&lv);
        assert!(!lv.can_move(&c, Direction::West, MoveFlags::NONE));
        assert!(!lv.can_move(&c, Direction::North, MoveFlags::NONE));
        lv.inventory.boots = 1 << Boot::Slide as u8;
        assert!(lv.can_move(&c, Direction::West, MoveFlags::NONE));
    }

    #[test]
    fn second_blue_press_cancels_the_reversal() {
        let mut lv = level("@actor chip 1,1 south\n@actor tank 2,1 east\n@actor tank 4,1 east\n######\n# *  #\n######\n");
        let mut c = chip(&lv);
        lv.turn_tanks(&mut c);
        assert!(lv.flags.turn_tanks);
        // the tank on ice is left alone
        assert_eq!(lv.top_actor(2, 1).entity(), Entity::Tank);
        assert_eq!(lv.top_actor(4, 1).entity(), Entity::TankReversed);
        lv.turn_tanks(&mut c);
        assert_eq!(lv.top_actor(4, 1).entity(), Entity::Tank);
        assert!(lv.flags.turn_tanks);
    }

    #[test]
    fn trap_holds_until_released() {
        let mut lv = level("@actor chip 4,1 south\n@actor bug 1,1 east\n######\n#^   #\n######\n");
        let bug = lv.load_actor(1);
        assert!(!lv.can_move(&bug, Direction::East, MoveFlags::NONE));
        assert!(lv.can_move(&bug, Direction::East, MoveFlags::RELEASING));
    }

    #[test]
    fn blob_moves_at_half_speed_and_ice_doubles() {
        let mut lv = level("@actor chip 4,1 south\n@actor blob 1,1 east\n@actor bug 2,2 east\n######\n#    #\n#  * #\n######\n");
        let mut blob = lv.load_actor(1);
        blob.step = 8;
        assert!(lv.continue_movement(&mut blob));
        assert_eq!(blob.step, 7);
        let mut bug = lv.load_actor(2);
        bug.step = 8;
        bug.x = 3;
        assert!(lv.continue_movement(&mut bug));
        assert_eq!(bug.step, 4);
    }
}
