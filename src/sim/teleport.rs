/// Teleporters: end-of-tick relocation of actors standing on one.
///
/// An actor is sent to the first teleporter before its own in reading
/// order (wrapping around) whose cell holds no monster or block and that
/// it can leave in its current facing. Its own teleporter is tried last.
/// Chip finding no exit at all is stuck for the rest of the attempt.

use log::debug;

use crate::domain::entity::{Actor, Entity};
use crate::domain::rng::Randomness;
use crate::domain::tile::Tile;
use super::movement::MoveFlags;
use super::world::{Level, MoveState, MovingActor};

impl<R: Randomness> Level<R> {
    /// Teleport every settled actor on a teleporter, last list entry first.
    pub(crate) fn teleport_all(&mut self) {
        if self.is_game_over() {
            // a monster that just hit Chip on a teleporter stays there
            return;
        }
        for i in (0..self.actors_len).rev() {
            let entry = self.actors[i];
            if entry.is_hidden() || entry.step() > 0 {
                continue;
            }
            if self.bottom_tile(entry.x(), entry.y()) == Tile::Teleporter {
                let mut act = self.load_actor(i);
                self.teleport_actor(&mut act);
                self.commit(&act);
            }
        }
    }

    fn teleport_actor(&mut self, act: &mut MovingActor) {
        if act.index == 0 && !act.is_chip() {
            // a monster teleported onto Chip last tick overwrote its cell
            act.entity = self.teleported_chip.entity();
            act.dir = self.teleported_chip.dir();
            self.teleported_chip = Actor::NONE;
        } else {
            // unclaim the cell so this teleporter counts as free
            self.set_top_actor(act.x, act.y, Actor::NONE);
        }

        let origin = act.pos();
        let teleporters = self.teleporters;
        for (px, py) in teleporters.exits_from(origin) {
            act.x = px;
            act.y = py;
            let occupant = self.top_actor(px, py);
            if !occupant.entity().is_monster_or_block() && self.can_move(act, act.dir, MoveFlags::NONE) {
                act.state = MoveState::Teleported;
                if occupant.entity() == Entity::Chip {
                    // legal overlap; keep Chip's cell until it leaves
                    self.teleported_chip = occupant;
                }
                return;
            }
        }

        act.x = origin.0;
        act.y = origin.1;
        if act.is_chip() {
            debug!("chip stuck on teleporter at ({}, {})", origin.0, origin.1);
            self.flags.chip_stuck = true;
        }
    }
}
