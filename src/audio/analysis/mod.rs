pub mod beat_grid;
pub mod compatibility;
