//! Idle motion layered on top of simulation coordinates.
//!
//! Offsets are presentational only. Nothing here ever writes back into the
//! layout engine.

use std::f32::consts::TAU;

use eframe::egui::{Vec2, vec2};
use rand::Rng;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DriftConfig {
    pub amplitude_min: f32,
    pub amplitude_max: f32,
    /// Angular frequency in radians per second.
    pub frequency_min: f32,
    pub frequency_max: f32,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            amplitude_min: 1.5,
            amplitude_max: 4.0,
            frequency_min: 0.2,
            frequency_max: 0.6,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DriftParams {
    pub amplitude: Vec2,
    pub frequency: Vec2,
    pub phase: Vec2,
}

impl DriftParams {
    pub fn random(config: &DriftConfig, rng: &mut impl Rng) -> Self {
        Self {
            amplitude: vec2(
                sample(rng, config.amplitude_min, config.amplitude_max),
                sample(rng, config.amplitude_min, config.amplitude_max),
            ),
            frequency: vec2(
                sample(rng, config.frequency_min, config.frequency_max),
                sample(rng, config.frequency_min, config.frequency_max),
            ),
            phase: vec2(rng.gen_range(0.0..TAU), rng.gen_range(0.0..TAU)),
        }
    }

    pub fn offset(&self, seconds: f32) -> Vec2 {
        vec2(
            self.amplitude.x * (seconds * self.frequency.x + self.phase.x).sin(),
            self.amplitude.y * (seconds * self.frequency.y + self.phase.y).cos(),
        )
    }
}

fn sample(rng: &mut impl Rng, min: f32, max: f32) -> f32 {
    if max > min {
        rng.gen_range(min..max)
    } else {
        min
    }
}

/// Per-node drift parameters and the offsets computed for the current frame,
/// indexed like the layout's node arena.
#[derive(Clone, Debug, Default)]
pub struct DriftField {
    params: Vec<DriftParams>,
    offsets: Vec<Vec2>,
}

impl DriftField {
    pub fn new(count: usize, config: &DriftConfig, rng: &mut impl Rng) -> Self {
        Self {
            params: (0..count).map(|_| DriftParams::random(config, rng)).collect(),
            offsets: vec![Vec2::ZERO; count],
        }
    }

    /// Recomputes every offset for time `seconds`. The dragged node, if any,
    /// gets an exact zero so it tracks the pointer.
    pub fn update(&mut self, seconds: f32, dragging: Option<usize>) {
        for (index, (params, offset)) in self.params.iter().zip(self.offsets.iter_mut()).enumerate()
        {
            *offset = if dragging == Some(index) {
                Vec2::ZERO
            } else {
                params.offset(seconds)
            };
        }
    }

    pub fn offset(&self, index: usize) -> Vec2 {
        self.offsets.get(index).copied().unwrap_or(Vec2::ZERO)
    }

    #[cfg(test)]
    pub fn offsets(&self) -> &[Vec2] {
        &self.offsets
    }
}
