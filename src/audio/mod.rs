pub mod analysis;
pub mod config;
pub mod crossfade;
pub mod devices;
pub mod effects;
pub mod errors;
pub mod graph;
pub mod planner;
pub mod playback;
pub mod track;
pub mod types;
