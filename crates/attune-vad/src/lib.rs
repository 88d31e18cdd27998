pub mod config;
pub mod constants;
pub mod energy;
pub mod engine;
pub mod heuristic;
pub mod types;

// Core exports - grouped and sorted alphabetically
pub use config::VadConfig;
pub use constants::{FRAME_DURATION_MS, FRAME_SIZE_SAMPLES, SAMPLE_RATE_HZ};
pub use engine::VadEngine;
pub use heuristic::EnergyZcrVad;
pub use types::VadStatus;
