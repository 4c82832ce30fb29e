use bevy::prelude::*;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::events::SimEvent;

const FOLLOW_LERP: f32 = 0.005;
/// Right clamp of the camera centre, in view widths.
const MAX_X_SCREENS: f32 = 2.5;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CameraShakeState {
    pub strength: f32,
    pub remaining: f32,
    pub duration: f32,
}

/// Presentation-side camera: follows the player and consumes shake requests.
/// Its centre is fed back to the simulation as the projectile band.
#[derive(Resource, Clone, Debug)]
pub struct CameraRig {
    pub base: Vec2,
    pub offset: Vec2,
    pub shake: CameraShakeState,
    view_size: Vec2,
    rng: SmallRng,
}

impl CameraRig {
    pub fn new(view_size: Vec2, seed: u64) -> Self {
        Self {
            base: view_size * 0.5,
            offset: Vec2::ZERO,
            shake: CameraShakeState::default(),
            view_size,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn center(&self) -> Vec2 {
        self.base + self.offset
    }

    /// A new request replaces whatever shake is running.
    pub fn start_shake(&mut self, duration: f32, strength: f32) {
        if duration <= 0.0 {
            return;
        }
        self.shake = CameraShakeState {
            strength,
            remaining: duration,
            duration,
        };
    }

    pub fn consume(&mut self, events: &[SimEvent]) {
        for event in events {
            if let SimEvent::CameraShake { duration, strength } = *event {
                self.start_shake(duration, strength);
            }
        }
    }

    pub fn update(&mut self, dt: f32, follow: Vec2) {
        let half = self.view_size * 0.5;
        let target = Vec2::new(follow.x, half.y);
        self.base = self.base.lerp(target, FOLLOW_LERP);
        self.base.x = self.base.x.clamp(half.x, self.view_size.x * MAX_X_SCREENS);

        self.offset = Vec2::ZERO;
        if self.shake.remaining > 0.0 {
            self.shake.remaining = (self.shake.remaining - dt).max(0.0);
            let strength = self.shake.strength * (self.shake.remaining / self.shake.duration);
            self.offset = Vec2::new(
                self.rng.gen_range(-1.0..=1.0) * strength,
                self.rng.gen_range(-1.0..=1.0) * strength,
            );
        }
    }
}
