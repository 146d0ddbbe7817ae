pub mod ai;
pub mod dir;
pub mod entity;
pub mod grid;
pub mod rng;
pub mod tile;
