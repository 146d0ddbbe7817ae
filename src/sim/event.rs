/// Events raised while stepping, for the audio layer.
///
/// Stored as a small bitset on the level. The set is cleared when the
/// next tick starts choosing moves, so callers stepping several ticks in a
/// row must drain it between calls.

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GameEvent {
    KeyTaken,
    BootsTaken,
    ChipTaken,
    LastChipTaken,
}

impl GameEvent {
    pub const ALL: [GameEvent; 4] = [
        GameEvent::KeyTaken,
        GameEvent::BootsTaken,
        GameEvent::ChipTaken,
        GameEvent::LastChipTaken,
    ];

    fn bit(self) -> u8 {
        1 << self as u8
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct EventSet(u8);

impl EventSet {
    pub fn insert(&mut self, event: GameEvent) {
        self.0 |= event.bit();
    }

    pub fn contains(self, event: GameEvent) -> bool {
        self.0 & event.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }

    pub fn iter(self) -> impl Iterator<Item = GameEvent> {
        GameEvent::ALL.into_iter().filter(move |e| self.contains(*e))
    }
}
