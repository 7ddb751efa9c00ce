pub mod chart;
pub mod config;
pub mod export;
pub mod generator;
pub mod playback;
pub mod session;
pub mod settings;
pub mod time;
