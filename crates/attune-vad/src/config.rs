use serde::{Deserialize, Serialize};

use super::constants::{CONFIDENCE_SCALE, ENERGY_THRESHOLD, ZCR_MAX, ZCR_MIN};

/// Thresholds for the energy/ZCR heuristic.
///
/// The defaults are empirically chosen constants with no documented
/// derivation. They are configurable, never re-derived.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VadConfig {
    pub energy_threshold: f32,
    pub zcr_min: f32,
    pub zcr_max: f32,
    pub confidence_scale: f32,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            energy_threshold: ENERGY_THRESHOLD,
            zcr_min: ZCR_MIN,
            zcr_max: ZCR_MAX,
            confidence_scale: CONFIDENCE_SCALE,
        }
    }
}
