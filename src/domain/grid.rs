/// Packed 32x32 layer of 6-bit tile codes.
///
/// Four cells share three bytes, read as a little-endian bit stream:
///
/// ```text
///   byte 0: [ c1 1..0 | c0 5..0 ]
///   byte 1: [ c2 3..0 | c1 5..2 ]
///   byte 2: [ c3 5..0 | c2 5..4 ]
/// ```

pub const GRID_WIDTH: usize = 32;
pub const GRID_HEIGHT: usize = 32;
pub const GRID_CELLS: usize = GRID_WIDTH * GRID_HEIGHT;
pub const LAYER_BYTES: usize = GRID_CELLS / 4 * 3;

#[derive(Clone, PartialEq, Eq)]
pub struct Layer {
    data: [u8; LAYER_BYTES],
}

impl Layer {
    pub fn new() -> Self {
        Layer { data: [0; LAYER_BYTES] }
    }

    /// Layer with every cell set to `code`.
    pub fn filled(code: u8) -> Self {
        let mut layer = Layer::new();
        for y in 0..GRID_HEIGHT as u8 {
            for x in 0..GRID_WIDTH as u8 {
                layer.set(x, y, code);
            }
        }
        layer
    }

    pub fn from_bytes(data: [u8; LAYER_BYTES]) -> Self {
        Layer { data }
    }

    pub fn as_bytes(&self) -> &[u8; LAYER_BYTES] {
        &self.data
    }

    fn block(x: u8, y: u8) -> (usize, usize) {
        debug_assert!((x as usize) < GRID_WIDTH && (y as usize) < GRID_HEIGHT);
        let i = y as usize * GRID_WIDTH + x as usize;
        (i / 4 * 3, i % 4)
    }

    pub fn get(&self, x: u8, y: u8) -> u8 {
        let (b, cell) = Self::block(x, y);
        let d = &self.data;
        match cell {
            0 => d[b] & 0x3f,
            1 => (d[b] >> 6) | ((d[b + 1] & 0x0f) << 2),
            2 => (d[b + 1] >> 4) | ((d[b + 2] & 0x03) << 4),
            _ => d[b + 2] >> 2,
        }
    }

    pub fn set(&mut self, x: u8, y: u8, code: u8) {
        let code = code & 0x3f;
        let (b, cell) = Self::block(x, y);
        let d = &mut self.data;
        match cell {
            0 => d[b] = (d[b] & 0xc0) | code,
            1 => {
                d[b] = (d[b] & 0x3f) | (code << 6);
                d[b + 1] = (d[b + 1] & 0xf0) | (code >> 2);
            }
            2 => {
                d[b + 1] = (d[b + 1] & 0x0f) | (code << 4);
                d[b + 2] = (d[b + 2] & 0xfc) | (code >> 4);
            }
            _ => d[b + 2] = (d[b + 2] & 0x03) | (code << 2),
        }
    }
}

impl Default for Layer {
    fn default() -> Self {
        Layer::new()
    }
}

impl std::fmt::Debug for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for y in 0..GRID_HEIGHT as u8 {
            for x in 0..GRID_WIDTH as u8 {
                write!(f, "{:02x}", self.get(x, y))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Neighbouring cell in `dir`, or `None` past the grid edge.
pub fn neighbor(x: u8, y: u8, dir: super::dir::Direction) -> Option<(u8, u8)> {
    let (dx, dy) = dir.offset();
    let nx = x as i16 + dx as i16;
    let ny = y as i16 + dy as i16;
    if nx < 0 || ny < 0 || nx >= GRID_WIDTH as i16 || ny >= GRID_HEIGHT as i16 {
        return None;
    }
    Some((nx as u8, ny as u8))
}
