/// Button linkages and the teleporter list.
///
/// Both are filled once per level and only read while stepping. Storage
/// is fixed-size: link tables hold 32 entries and overflowing one is a
/// level-authoring error; the teleporter list has room for every cell.

use crate::domain::grid::{GRID_CELLS, GRID_WIDTH};

pub const MAX_LINKS: usize = 32;

/// Button cell and the trap or cloner it controls.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Link {
    pub button: (u8, u8),
    pub target: (u8, u8),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Links {
    items: [Link; MAX_LINKS],
    len: usize,
}

impl Links {
    pub fn new() -> Self {
        Links { items: [Link::default(); MAX_LINKS], len: 0 }
    }

    /// Appends a link; gives it back if the table is full.
    pub fn push(&mut self, link: Link) -> Result<(), Link> {
        if self.len == MAX_LINKS {
            return Err(link);
        }
        self.items[self.len] = link;
        self.len += 1;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[Link] {
        &self.items[..self.len]
    }

    /// Target controlled by the button at `(x, y)`; first match wins.
    pub fn find(&self, x: u8, y: u8) -> Option<(u8, u8)> {
        self.as_slice().iter().find(|l| l.button == (x, y)).map(|l| l.target)
    }
}

impl Default for Links {
    fn default() -> Self {
        Links::new()
    }
}

impl FromIterator<Link> for Links {
    /// Links past the table capacity are dropped.
    fn from_iter<I: IntoIterator<Item = Link>>(iter: I) -> Self {
        let mut links = Links::new();
        for link in iter {
            if links.push(link).is_err() {
                break;
            }
        }
        links
    }
}

/// Teleporter cells in reading order.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Teleporters {
    cells: [(u8, u8); GRID_CELLS],
    len: usize,
}

impl Teleporters {
    pub fn new() -> Self {
        Teleporters { cells: [(0, 0); GRID_CELLS], len: 0 }
    }

    /// Cells must be pushed in reading order, each at most once.
    pub fn push(&mut self, x: u8, y: u8) {
        debug_assert!(self.len == 0 || reading_index(self.cells[self.len - 1]) < reading_index((x, y)));
        self.cells[self.len] = (x, y);
        self.len += 1;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Candidate exits for the teleporter at `from`: every other teleporter
    /// in reverse reading order, wrapping around, then `from` itself.
    pub fn exits_from(&self, from: (u8, u8)) -> impl Iterator<Item = (u8, u8)> + '_ {
        let n = self.len;
        let start = self.cells[..n].iter().position(|&c| c == from);
        let count = if start.is_some() { n } else { 0 };
        let start = start.unwrap_or(0);
        (1..=count).map(move |k| self.cells[(start + n - k) % n])
    }
}

impl Default for Teleporters {
    fn default() -> Self {
        Teleporters::new()
    }
}

fn reading_index((x, y): (u8, u8)) -> usize {
    y as usize * GRID_WIDTH + x as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_uses_first_matching_button() {
        let mut links = Links::new();
        links.push(Link { button: (1, 1), target: (5, 5) }).unwrap();
        links.push(Link { button: (1, 1), target: (6, 6) }).unwrap();
        links.push(Link { button: (2, 1), target: (7, 7) }).unwrap();
        assert_eq!(links.find(1, 1), Some((5, 5)));
        assert_eq!(links.find(2, 1), Some((7, 7)));
        assert_eq!(links.find(3, 1), None);
    }

    #[test]
    fn links_table_is_bounded() {
        let mut links = Links::new();
        for i in 0..MAX_LINKS as u8 {
            assert!(links.push(Link { button: (i, 0), target: (i, 1) }).is_ok());
        }
        assert!(links.push(Link::default()).is_err());
        assert_eq!(links.len(), MAX_LINKS);
    }

    #[test]
    fn exits_scan_backwards_and_end_at_origin() {
        let mut tp = Teleporters::new();
        tp.push(3, 0);
        tp.push(10, 2);
        tp.push(4, 7);
        tp.push(20, 20);
        let order: Vec<_> = tp.exits_from((4, 7)).collect();
        assert_eq!(order, vec![(10, 2), (3, 0), (20, 20), (4, 7)]);
        let order: Vec<_> = tp.exits_from((3, 0)).collect();
        assert_eq!(order, vec![(20, 20), (4, 7), (10, 2), (3, 0)]);
    }

    #[test]
    fn single_teleporter_only_offers_itself() {
        let mut tp = Teleporters::new();
        tp.push(8, 8);
        assert_eq!(tp.exits_from((8, 8)).collect::<Vec<_>>(), vec![(8, 8)]);
        assert_eq!(tp.exits_from((1, 1)).count(), 0);
    }
}
