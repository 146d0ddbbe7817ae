/// The step function: advances a level by one tick.
///
/// Processing order:
///   1. Out-of-time check
///   2. Consistency check (debug builds only)
///   3. Deferred effects from last tick (toggle flip, tank reversal)
///   4. Choose moves, last list entry first
///   5. Perform moves, last list entry first; brown buttons spring traps
///   6. Teleport actors that came to rest on a teleporter
///   7. Clock and timer
///
/// Chip is always entry 0, so every monster has chosen and made its move
/// before Chip does. Collisions caused by that ordering are detected in
/// `start_movement`.

use thiserror::Error;

use crate::domain::ai::{self, Choice, CLOCKWISE};
use crate::domain::dir::DirMask;
use crate::domain::entity::{Actor, ActorState, Entity};
use crate::domain::grid::{neighbor, GRID_CELLS, GRID_WIDTH};
use crate::domain::rng::Randomness;
use crate::domain::tile::Tile;
use super::movement::{MoveFlags, MoveResult};
use super::world::{cells, Boot, EndCause, Level, MoveState, MovingActor, CHIP_REST_DIRECTION, CHIP_REST_TICKS};

/// Broken bookkeeping between the actor list and the top layer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("two actors at ({x}, {y}) at tick {time}")]
    SharedCell { x: u8, y: u8, time: u32 },
    #[error("actor {index} at ({x}, {y}) has no occupant cell")]
    MissingCell { index: usize, x: u8, y: u8 },
    #[error("chip is not first in the actor list")]
    ChipNotFirst,
}

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

impl<R: Randomness> Level<R> {
    /// Advance one tick using the current input.
    pub fn step(&mut self) {
        if self.is_game_over() || self.actors_len == 0 {
            return;
        }
        if !self.untimed && self.time_left == 0 {
            self.end_cause = EndCause::OutOfTime;
            return;
        }

        #[cfg(debug_assertions)]
        if let Err(e) = self.check_consistency() {
            panic!("inconsistent level state: {e}");
        }

        self.prestep();
        self.choose_all_moves();
        self.perform_all_moves();
        self.teleport_all();

        // the clock runs on untimed levels too; teeth and death animations read it
        self.current_time = self.current_time.wrapping_add(1);
        if !self.untimed {
            self.time_left -= 1;
        }
    }

    /// Verify the actor list against the top layer. No side effects.
    pub fn check_consistency(&self) -> Result<(), StateError> {
        let sharing_allowed = usize::from(self.teleported_chip != Actor::NONE);
        let mut seen = [false; GRID_CELLS];
        let mut shared = 0;
        for i in 0..self.actors_len {
            let a = self.actors[i];
            if a.is_hidden() {
                continue;
            }
            let cell = a.y() as usize * GRID_WIDTH + a.x() as usize;
            if seen[cell] {
                shared += 1;
                if shared > sharing_allowed {
                    return Err(StateError::SharedCell { x: a.x(), y: a.y(), time: self.current_time });
                }
            }
            seen[cell] = true;
        }

        for i in 0..self.actors_len {
            let a = self.actors[i];
            if a.is_hidden() || self.top_actor(a.x(), a.y()).entity() != Entity::None {
                continue;
            }
            if i == 0 && self.teleported_chip != Actor::NONE {
                continue;
            }
            return Err(StateError::MissingCell { index: i, x: a.x(), y: a.y() });
        }

        if self.teleported_chip == Actor::NONE && self.actors_len > 0 {
            let (x, y) = self.chip_position();
            if self.top_actor(x, y).entity() != Entity::Chip {
                return Err(StateError::ChipNotFirst);
            }
        }
        Ok(())
    }

    // ══════════════════════════════════════════════════════════════
    // Deferred effects
    // ══════════════════════════════════════════════════════════════

    fn prestep(&mut self) {
        if self.flags.toggle {
            self.flags.toggle = false;
            for (x, y) in cells() {
                let tile = self.bottom_tile(x, y);
                if tile.is_toggle_tile() {
                    self.set_bottom_tile(x, y, tile.with_toggle_state(true));
                }
            }
        }

        if self.flags.turn_tanks {
            self.flags.turn_tanks = false;
            for i in 0..self.actors_len {
                if self.actors[i].is_hidden() {
                    continue;
                }
                let mut act = self.load_actor(i);
                if act.entity == Entity::TankReversed {
                    act.entity = Entity::Tank;
                    // tanks between cells keep going
                    if act.step <= 0 {
                        act.dir = act.dir.back();
                    }
                    self.commit(&act);
                }
            }
        }

        self.chip_new_pos = None;
    }

    // ══════════════════════════════════════════════════════════════
    // Choosing moves
    // ══════════════════════════════════════════════════════════════

    fn choose_all_moves(&mut self) {
        self.events.clear();
        for i in (0..self.actors_len).rev() {
            let entry = self.actors[i];
            if entry.is_hidden() {
                // death animation countdown
                if entry.step() > 0 {
                    self.actors[i] = entry.with_step(entry.step() - 1);
                }
                continue;
            }
            let teleported = entry.state() == ActorState::Teleported;
            self.actors[i] = entry.with_state(ActorState::None);
            if entry.step() <= 0 {
                let mut act = self.load_actor(i);
                self.choose_move(&mut act, teleported);
                self.commit(&act);
            }
        }
    }

    /// Pick this tick's direction. A chosen move is marked `Moved`.
    fn choose_move(&mut self, act: &mut MovingActor, teleported: bool) {
        self.apply_forced_move(act, teleported);

        if act.is_chip() {
            self.choose_chip_move(act);
            self.chip_last_dir = act.dir;

            self.collided_with = None;
            if act.state == MoveState::Moved {
                self.ticks_since_move = 0;
                // a forced move never collides head-on
                if !self.flags.chip_force_moved {
                    self.chip_new_pos = neighbor(act.x, act.y, act.dir);
                }
            } else if self.ticks_since_move == CHIP_REST_TICKS {
                act.dir = CHIP_REST_DIRECTION;
            } else if self.ticks_since_move < CHIP_REST_TICKS {
                self.ticks_since_move += 1;
            }
        } else if !act.entity.is_block() {
            self.choose_monster_move(act);
        } else if act.entity == Entity::BlockGhost && act.state == MoveState::None {
            // an idle ghost block leaves the list, unless it is holding something down
            let tile = self.bottom_tile(act.x, act.y);
            if !tile.is_button() && tile != Tile::Trap {
                act.state = MoveState::Ghost;
            }
        }
    }

    /// Ice, force floors and a fresh teleport decide the move by themselves.
    fn apply_forced_move(&mut self, act: &mut MovingActor, teleported: bool) {
        if self.current_time == 0 {
            return;
        }
        let tile = self.bottom_tile(act.x, act.y);
        if tile.is_ice() {
            if act.is_chip() && self.has_boots(Boot::Ice) {
                return;
            }
        } else if tile.is_slide() {
            if act.is_chip() && self.has_boots(Boot::Slide) {
                return;
            }
            act.dir = self.advance_slide_dir(tile);
        } else if !teleported {
            return;
        }

        if act.is_chip() {
            self.flags.chip_force_moved = true;
        }
        act.state = MoveState::Moved;
    }

    fn choose_chip_move(&mut self, act: &mut MovingActor) {
        let input = self.chip_input();
        if input.is_empty() {
            return;
        }
        if self.flags.chip_force_moved && !self.flags.chip_can_unslide {
            return;
        }

        if input.is_diagonal() {
            let last = self.chip_last_dir;
            if input.contains(last) {
                // keep going unless the current way is blocked and the other is not
                let other = (input - last.mask()).single().unwrap_or(last);
                let can_current = self.can_move(act, last, MoveFlags::PUSH_BLOCKS);
                let can_other = self.can_move(act, other, MoveFlags::PUSH_BLOCKS);
                act.dir = if !can_current && can_other { other } else { last };
            } else {
                let horizontal = (input & DirMask::HORIZONTAL).single().unwrap_or(last);
                let vertical = (input & DirMask::VERTICAL).single().unwrap_or(last);
                let go_horizontal = self.can_move(act, horizontal, MoveFlags::PUSH_BLOCKS);
                act.dir = if go_horizontal { horizontal } else { vertical };
            }
        } else if let Some(dir) = input.single() {
            act.dir = dir;
            // result unused; pushing turns the block
            self.can_move(act, dir, MoveFlags::PUSH_BLOCKS);
        }

        self.flags.chip_self_moved = true;
        act.state = MoveState::Moved;
        self.consume_latched_input();
    }

    fn choose_monster_move(&mut self, act: &mut MovingActor) {
        if act.state == MoveState::Moved {
            return;
        }
        let tile = self.bottom_tile(act.x, act.y);
        if matches!(tile, Tile::Cloner | Tile::Trap) {
            return;
        }
        if act.entity == Entity::Teeth && ai::teeth_rest(self.current_time, self.conditions.stepping) {
            return;
        }

        let forward = act.dir;
        let choices = ai::monster_choices(act.entity, forward, act.pos(), self.chip_position());

        // even fully blocked, the monster counts as moved: a cell may free up
        act.state = MoveState::Moved;
        for &choice in choices.as_slice() {
            let dir = match choice {
                Choice::Toward(dir) => dir,
                Choice::WalkerTurn => forward.rotate_right(self.rng.walker_turn()),
                Choice::BlobTurn => CLOCKWISE[(self.rng.blob_turn() & 3) as usize],
            };
            act.dir = dir;
            if self.can_move(act, dir, MoveFlags::CLEAR_ANIM) {
                return;
            }
        }

        if act.entity == Entity::Teeth {
            if let Some(Choice::Toward(dir)) = choices.first() {
                act.dir = dir;
            }
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Performing moves
    // ══════════════════════════════════════════════════════════════

    fn perform_all_moves(&mut self) {
        for i in (0..self.actors_len).rev() {
            if self.actors[i].is_hidden() {
                continue;
            }
            let mut act = self.load_actor(i);
            let result = self.perform_move(&mut act, MoveFlags::NONE);

            let mut persist = true;
            if result != MoveResult::Died
                && act.step <= 0
                && self.bottom_tile(act.x, act.y) == Tile::ButtonBrown
            {
                // if the released actor pushes this one off the button, the
                // push has already committed it and our copy is stale
                self.actor_springing_trap = Some(act.index);
                self.spring_trap(act.x, act.y);
                persist = self.actor_springing_trap.is_some();
                self.actor_springing_trap = None;
            }
            if persist {
                self.commit(&act);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dir::Direction;
    use crate::domain::rng::LegacyRng;
    use crate::sim::event::GameEvent;
    use crate::sim::level::parse_level;

    fn level(text: &str) -> Level {
        let data = parse_level(text).expect("fixture parses");
        let mut level = Level::legacy(&data, 0);
        level.init().expect("fixture initialises");
        level
    }

    /// One move of Chip: hold `dir` for a tick, then let the move finish.
    fn walk(lv: &mut Level, dir: Direction) {
        hold(lv, dir.mask());
    }

    fn hold(lv: &mut Level, input: DirMask) {
        lv.set_input(input);
        lv.step();
        lv.set_input(DirMask::NONE);
        for _ in 0..3 {
            lv.step();
        }
    }

    // ── Basic moves ──

    #[test]
    fn chip_walks_one_cell_in_four_ticks() {
        let mut lv = level("@actor chip 1,1 south\n#####\n#   #\n#####\n");
        lv.set_input(DirMask::EAST);
        lv.step();
        assert_eq!(lv.chip_position(), (2, 1));
        assert_eq!(lv.actor_entry(0).unwrap().step(), 6);
        lv.set_input(DirMask::NONE);
        for _ in 0..3 {
            lv.step();
        }
        assert_eq!(lv.chip_position(), (2, 1));
        assert_eq!(lv.actor_entry(0).unwrap().step(), 0);
        assert_eq!(lv.chip_facing(), Direction::East);
        assert_eq!(lv.current_time(), 4);
        assert!(!lv.is_game_over());
    }

    #[test]
    fn chip_drowns_when_the_move_completes() {
        let mut lv = level("@actor chip 1,1 south\n#####\n# ~ #\n#####\n");
        lv.set_input(DirMask::EAST);
        for _ in 0..3 {
            lv.step();
            assert!(!lv.is_game_over());
        }
        lv.step();
        assert_eq!(lv.end_cause(), EndCause::Drowned);
        assert_eq!(lv.current_time(), 4);
        lv.step();
        assert_eq!(lv.current_time(), 4);
        assert_eq!(lv.chip_position(), (2, 1));
    }

    #[test]
    fn water_boots_keep_chip_afloat() {
        let mut lv = level("@actor chip 1,1 south\n######\n# w~ #\n######\n");
        walk(&mut lv, Direction::East);
        assert!(lv.inventory().has_boots(Boot::Water));
        assert!(lv.events().contains(GameEvent::BootsTaken));
        walk(&mut lv, Direction::East);
        assert!(!lv.is_game_over());
        assert_eq!(lv.chip_position(), (3, 1));
    }

    #[test]
    fn key_is_picked_up_and_saturates() {
        let mut lv = level("@actor chip 1,1 south\n######\n# bb #\n######\n");
        walk(&mut lv, Direction::East);
        assert_eq!(lv.bottom_tile(2, 1), Tile::Floor);
        assert_eq!(lv.inventory().keys[0], 1);
        assert!(lv.events().contains(GameEvent::KeyTaken));

        lv.inventory.keys[0] = 255;
        walk(&mut lv, Direction::East);
        assert_eq!(lv.inventory().keys[0], 255);
        assert_eq!(lv.bottom_tile(3, 1), Tile::Floor);
    }

    #[test]
    fn green_key_opens_any_number_of_green_locks() {
        let mut lv = level("@actor chip 1,1 south\n#######\n# gGG #\n#######\n");
        walk(&mut lv, Direction::East);
        walk(&mut lv, Direction::East);
        walk(&mut lv, Direction::East);
        assert_eq!(lv.chip_position(), (4, 1));
        assert_eq!(lv.inventory().keys[2], 1);
    }

    #[test]
    fn blue_wall_is_revealed_and_costs_the_move() {
        let mut lv = level("@actor chip 1,1 south\n#####\n# U #\n#####\n");
        lv.set_input(DirMask::EAST);
        lv.step();
        assert_eq!(lv.chip_position(), (1, 1));
        assert_eq!(lv.bottom_tile(2, 1), Tile::Wall);
    }

    #[test]
    fn exit_completes_the_level() {
        let mut lv = level("@actor chip 1,1 south\n####\n# X#\n####\n");
        walk(&mut lv, Direction::East);
        assert_eq!(lv.end_cause(), EndCause::Complete);
    }

    // ── Monsters ──

    #[test]
    fn boxed_in_bug_turns_through_every_choice() {
        let mut lv = level(
            "@actor chip 5,1 south\n\
             @actor bug 2,2 north\n\
             #######\n\
             ##### #\n\
             ## ####\n\
             #######\n",
        );
        lv.step();
        // last attempted direction is back
        assert_eq!(lv.top_actor(2, 2), Actor::new(Entity::Bug, Direction::South));
        let bug = lv.actor_entry(1).unwrap();
        assert_eq!((bug.x(), bug.y()), (2, 2));
        assert_eq!(bug.state(), ActorState::Moved);
    }

    #[test]
    fn teeth_face_chip_even_when_blocked() {
        let mut lv = level(
            "@actor chip 1,1 south\n\
             @actor teeth 4,1 north\n\
             ######\n\
             #  # #\n\
             ######\n",
        );
        lv.step();
        assert_eq!(lv.top_actor(4, 1), Actor::new(Entity::Teeth, Direction::West));
    }

    #[test]
    fn monster_walking_into_chip_kills_it() {
        let mut lv = level(
            "@actor chip 1,1 east\n\
             @actor glider 3,1 west\n\
             ######\n\
             #    #\n\
             ######\n",
        );
        lv.set_input(DirMask::EAST);
        lv.step();
        assert_eq!(lv.end_cause(), EndCause::CollidedMonster);
        assert_eq!(lv.collided_actor(), Some(Actor::new(Entity::Glider, Direction::West)));
        assert_eq!(lv.chip_position(), (2, 1));
    }

    #[test]
    fn monster_reaching_chip_ends_the_attempt() {
        let mut lv = level(
            "@actor chip 1,1 south\n\
             @actor ball 3,1 west\n\
             #####\n\
             #   #\n\
             #####\n",
        );
        for _ in 0..8 {
            lv.step();
        }
        assert_eq!(lv.end_cause(), EndCause::CollidedMonster);
        assert!(lv.end_cause().is_death());
    }

    #[test]
    fn bomb_kills_a_monster_and_leaves_an_animation() {
        let mut lv = level(
            "@actor chip 1,3 south\n\
             @actor glider 1,1 east\n\
             ######\n\
             #  !##\n\
             ######\n\
             #    #\n\
             ######\n",
        );
        // glider: (1,1) -> (2,1) in 4 ticks, then onto the bomb in 4 more
        for _ in 0..8 {
            lv.step();
        }
        assert_eq!(lv.bottom_tile(3, 1), Tile::Floor);
        assert_eq!(lv.top_actor(3, 1), Actor::ANIMATION);
        let entry = lv.actor_entry(1).unwrap();
        assert!(entry.is_hidden());
        assert!(entry.step() >= 11);
        assert!(!lv.is_game_over());

        // the countdown runs out and the slot is free again
        for _ in 0..12 {
            lv.step();
        }
        assert_eq!(lv.actor_entry(1).unwrap().step(), 0);
    }

    #[test]
    fn walker_only_draws_when_blocked() {
        let mut lv = level(
            "@actor chip 1,3 south\n\
             @actor walker 1,1 east\n\
             ######\n\
             #    #\n\
             ######\n\
             #    #\n\
             ######\n",
        );
        lv.step();
        assert_eq!(lv.rng, LegacyRng::new(0));
        // walk to the wall, then the turn needs a draw
        for _ in 0..12 {
            lv.step();
        }
        assert_ne!(lv.rng, LegacyRng::new(0));
    }

    #[test]
    fn blob_uses_the_seeded_generator() {
        let text = "@actor chip 1,5 south\n@actor blob 3,2 north\n#######\n#     #\n#     #\n#     #\n#######\n#     #\n#######\n";
        let data = parse_level(text).unwrap();
        let mut lv = Level::legacy(&data, 12345);
        lv.init().unwrap();
        lv.step();
        let mut rng = LegacyRng::new(12345);
        let dir = CLOCKWISE[rng.blob_turn() as usize];
        let blob = lv.actor_entry(1).unwrap();
        assert_eq!(lv.top_actor(blob.x(), blob.y()).dir(), dir);
    }

    // ── Machinery ──

    #[test]
    fn blue_button_reverses_tanks_next_tick() {
        let mut lv = level(
            "@actor chip 2,1 east\n\
             @actor tank 6,3 east\n\
             ########\n\
             #  ]   #\n\
             #      #\n\
             #      #\n\
             ########\n",
        );
        walk(&mut lv, Direction::East);
        assert_eq!(lv.top_actor(6, 3), Actor::new(Entity::TankReversed, Direction::East));
        lv.step();
        assert_eq!(lv.top_actor(5, 3), Actor::new(Entity::Tank, Direction::West));
    }

    #[test]
    fn two_blue_presses_in_one_tick_cancel_out() {
        let mut lv = level(
            "@actor chip 2,1 east\n\
             @actor glider 2,3 east\n\
             @actor tank 6,5 east\n\
             ########\n\
             #  ]   #\n\
             #      #\n\
             #  ]   #\n\
             #      #\n\
             #      #\n\
             ########\n",
        );
        // chip and glider land on their buttons in the same perform pass
        walk(&mut lv, Direction::East);
        assert_eq!(lv.chip_position(), (3, 1));
        assert_eq!(lv.top_actor(3, 3).entity(), Entity::Glider);
        assert_eq!(lv.top_actor(6, 5), Actor::new(Entity::Tank, Direction::East));
        assert!(lv.flags.turn_tanks);

        lv.step();
        assert!(!lv.flags.turn_tanks);
        assert_eq!(lv.top_actor(6, 5), Actor::new(Entity::Tank, Direction::East));
        assert_eq!(lv.top_actor(5, 5), Actor::NONE);
    }

    #[test]
    fn green_button_flips_toggle_walls_next_tick() {
        let mut lv = level("@actor chip 1,1 south\n######\n# (%_#\n######\n");
        walk(&mut lv, Direction::East);
        assert_eq!(lv.bottom_tile(3, 1), Tile::ToggleWall);
        lv.step();
        assert_eq!(lv.bottom_tile(3, 1), Tile::ToggleFloor);
        assert_eq!(lv.bottom_tile(4, 1), Tile::ToggleWall);
    }

    #[test]
    fn brown_button_releases_the_trapped_monster() {
        let mut lv = level(
            "@trap 3,1 1,2\n\
             @actor chip 2,1 east\n\
             @actor bug 1,2 east\n\
             #######\n\
             #  [  #\n\
             #^    #\n\
             #######\n",
        );
        for _ in 0..3 {
            lv.set_input(DirMask::EAST);
            lv.step();
            lv.set_input(DirMask::NONE);
            assert_eq!(lv.actor_entry(1).map(|a| (a.x(), a.y())), Some((1, 2)));
        }
        lv.step();
        assert_eq!(lv.chip_position(), (3, 1));
        assert_eq!(lv.actor_entry(1).map(|a| (a.x(), a.y())), Some((2, 2)));
        assert_eq!(lv.top_actor(2, 2).entity(), Entity::Bug);
        assert_eq!(lv.top_actor(1, 2), Actor::NONE);
    }

    #[test]
    fn red_button_clones_the_cloner_occupant() {
        let mut lv = level(
            "@cloner 3,1 1,2\n\
             @actor chip 2,1 east\n\
             @actor glider 1,2 east\n\
             #######\n\
             #  )  #\n\
             #M    #\n\
             #######\n",
        );
        walk(&mut lv, Direction::East);
        assert_eq!(lv.actor_count(), 3);
        assert_eq!(lv.top_actor(1, 2), Actor::new(Entity::Glider, Direction::East));
        assert_eq!(lv.top_actor(2, 2), Actor::new(Entity::Glider, Direction::East));
        assert_eq!(lv.check_consistency(), Ok(()));
    }

    #[test]
    fn pushed_ghost_block_drops_off_the_list_when_idle() {
        let mut lv = level("@actor chip 1,1 east\n@actor ghost_block 2,1 north\n######\n#    #\n######\n");
        walk(&mut lv, Direction::East);
        assert_eq!(lv.chip_position(), (2, 1));
        assert_eq!(lv.top_actor(3, 1), Actor::new(Entity::BlockGhost, Direction::East));
        assert_eq!(lv.actor_count(), 2);
        lv.step();
        assert!(lv.actor_entry(1).unwrap().is_hidden());
        assert_eq!(lv.top_actor(3, 1).entity(), Entity::BlockGhost);
    }

    #[test]
    fn block_pushed_into_water_makes_dirt() {
        let mut lv = level("@actor chip 1,1 east\n@actor block 2,1 north\n######\n#  ~ #\n######\n");
        walk(&mut lv, Direction::East);
        assert_eq!(lv.bottom_tile(3, 1), Tile::Dirt);
        assert_eq!(lv.top_actor(3, 1), Actor::ANIMATION);
        // no entry while the block is still sinking
        walk(&mut lv, Direction::East);
        assert_eq!(lv.chip_position(), (2, 1));
        for _ in 0..8 {
            lv.step();
        }
        walk(&mut lv, Direction::East);
        assert_eq!(lv.chip_position(), (3, 1));
        assert_eq!(lv.bottom_tile(3, 1), Tile::Floor);
    }

    #[test]
    fn stuck_chip_never_moves_again() {
        let mut lv = level("@actor chip 1,1 east\n#####\n# o##\n#####\n");
        walk(&mut lv, Direction::East);
        assert_eq!(lv.chip_position(), (2, 1));
        assert!(lv.is_chip_stuck());
        for dir in [Direction::West, Direction::North, Direction::East] {
            walk(&mut lv, dir);
            assert_eq!(lv.chip_position(), (2, 1));
        }
        assert!(!lv.is_game_over());
    }

    #[test]
    fn teleport_carries_chip_forward() {
        let mut lv = level(
            "@actor chip 4,3 east\n\
             ########\n\
             # o    #\n\
             #      #\n\
             #    o #\n\
             ########\n",
        );
        walk(&mut lv, Direction::East);
        assert_eq!(lv.chip_position(), (2, 1));
        assert_eq!(lv.actor_entry(0).unwrap().state(), ActorState::Teleported);
        // forced out in the same direction on the next tick
        lv.step();
        assert_eq!(lv.chip_position(), (3, 1));
    }

    #[test]
    fn force_floor_carries_chip() {
        let mut lv = level("@actor chip 1,1 south\n#######\n# ll  #\n#######\n");
        walk(&mut lv, Direction::East);
        // force floors run at double speed
        assert_eq!(lv.chip_position(), (3, 1));
        lv.step();
        assert_eq!(lv.chip_position(), (4, 1));
    }

    #[test]
    fn force_floor_ignores_input_until_chip_may_unslide() {
        let mut lv = level(
            "@actor chip 1,2 east\n\
             ########\n\
             #      #\n\
             # lll  #\n\
             #      #\n\
             ########\n",
        );
        lv.set_input(DirMask::EAST);
        lv.step();
        lv.set_input(DirMask::NONE);
        lv.step();
        assert_eq!(lv.chip_position(), (2, 2));

        // stepped onto the floor by choice: carried regardless of input
        lv.set_input(DirMask::NORTH);
        lv.step();
        assert_eq!(lv.chip_position(), (3, 2));
        assert_eq!(lv.chip_facing(), Direction::East);
        lv.step();
        assert_eq!(lv.chip_position(), (3, 2));

        // carried onto this one: input may steer off it
        lv.step();
        assert_eq!(lv.chip_position(), (3, 1));
        assert_eq!(lv.chip_facing(), Direction::North);
    }

    #[test]
    fn diagonal_takes_the_open_axis_when_blocked() {
        let mut lv = level("@actor chip 1,1 south\n#####\n#   #\n#####\n");
        hold(&mut lv, DirMask::SOUTH | DirMask::EAST);
        assert_eq!(lv.chip_position(), (2, 1));
        assert_eq!(lv.chip_facing(), Direction::East);
    }

    #[test]
    fn diagonal_keeps_the_last_direction_while_it_is_open() {
        let mut lv = level("@actor chip 1,1 east\n######\n#    #\n#    #\n######\n");
        // last direction starts as south and is part of the input
        hold(&mut lv, DirMask::SOUTH | DirMask::EAST);
        assert_eq!(lv.chip_position(), (1, 2));
        // last direction not in the input: horizontal first
        hold(&mut lv, DirMask::NORTH | DirMask::EAST);
        assert_eq!(lv.chip_position(), (2, 2));
        hold(&mut lv, DirMask::NORTH | DirMask::EAST);
        assert_eq!(lv.chip_position(), (3, 2));
        hold(&mut lv, DirMask::NORTH | DirMask::EAST);
        assert_eq!(lv.chip_position(), (4, 2));
        // east runs into the wall, so switch to north
        hold(&mut lv, DirMask::NORTH | DirMask::EAST);
        assert_eq!(lv.chip_position(), (4, 1));
        assert_eq!(lv.chip_facing(), Direction::North);
    }

    #[test]
    fn chip_rests_facing_south() {
        let mut lv = level("@actor chip 1,1 east\n#####\n#   #\n#####\n");
        for _ in 0..15 {
            lv.step();
        }
        assert_eq!(lv.chip_facing(), Direction::East);
        lv.step();
        assert_eq!(lv.chip_facing(), Direction::South);
    }

    #[test]
    fn latched_press_is_honoured_once() {
        let mut lv = level("@actor chip 1,1 south\n######\n#    #\n######\n");
        lv.press(Direction::East);
        lv.step();
        assert_eq!(lv.chip_position(), (2, 1));
        for _ in 0..3 {
            lv.step();
        }
        lv.step();
        assert_eq!(lv.chip_position(), (2, 1));
    }

    // ── Properties ──

    #[test]
    fn identical_runs_stay_identical() {
        let text = "@actor chip 1,1 south\n\
                    @actor blob 5,3 north\n\
                    @actor walker 2,4 east\n\
                    @actor bug 6,5 west\n\
                    ##########\n\
                    #        #\n\
                    #  *     #\n\
                    #   ?    #\n\
                    #        #\n\
                    #        #\n\
                    ##########\n";
        let data = parse_level(text).unwrap();
        let mut a = Level::legacy(&data, 99);
        let mut b = Level::legacy(&data, 99);
        a.init().unwrap();
        b.init().unwrap();
        let inputs = [DirMask::EAST, DirMask::SOUTH, DirMask::NONE, DirMask::EAST | DirMask::SOUTH];
        for t in 0..200 {
            let input = inputs[t / 7 % inputs.len()];
            a.set_input(input);
            b.set_input(input);
            a.step();
            b.step();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn idle_timed_level_runs_out_of_time() {
        let mut lv = level("@time 2\n@actor chip 1,1 south\n###\n# #\n###\n");
        let ticks = lv.time_left().unwrap();
        assert_eq!(ticks, 40);
        for _ in 0..ticks {
            lv.step();
            assert!(!lv.is_game_over());
        }
        assert_eq!(lv.time_left(), Some(0));
        lv.step();
        assert_eq!(lv.end_cause(), EndCause::OutOfTime);
        assert_eq!(lv.current_time(), 40);
    }

    #[test]
    fn chips_count_down_one_at_a_time() {
        let mut lv = level("@chips 2\n@actor chip 1,1 south\n########\n# ccc  #\n########\n");
        let mut last = lv.chips_left();
        assert_eq!(last, 2);
        lv.set_input(DirMask::EAST);
        for _ in 0..20 {
            lv.step();
            let now = lv.chips_left();
            assert!(now == last || now + 1 == last);
            last = now;
        }
        assert_eq!(lv.chips_left(), 0);
        assert_eq!(lv.bottom_tile(3, 1), Tile::Floor);
        assert_eq!(lv.bottom_tile(4, 1), Tile::Floor);
    }

    #[test]
    fn last_chip_event_fires_once() {
        let mut lv = level("@chips 1\n@actor chip 1,1 south\n#######\n# cc  #\n#######\n");
        walk(&mut lv, Direction::East);
        assert!(lv.events().contains(GameEvent::LastChipTaken));
        walk(&mut lv, Direction::East);
        assert!(lv.events().contains(GameEvent::ChipTaken));
        assert!(!lv.events().contains(GameEvent::LastChipTaken));
        assert_eq!(lv.chips_left(), 0);
    }

    #[test]
    fn consistency_check_catches_a_lost_cell() {
        let mut lv = level("@actor chip 1,1 south\n@actor bug 3,1 north\n#####\n#   #\n#####\n");
        assert_eq!(lv.check_consistency(), Ok(()));
        lv.set_top_actor(3, 1, Actor::NONE);
        assert_eq!(lv.check_consistency(), Err(StateError::MissingCell { index: 1, x: 3, y: 1 }));
    }
}
