pub mod event;
pub mod level;
pub mod links;
pub mod movement;
pub mod replay;
pub mod step;
pub mod teleport;
pub mod world;
