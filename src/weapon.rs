use bevy::prelude::*;
use rand::Rng;

use crate::animation::{weapon_clips, Animator, WeaponClip};
use crate::components::{forward, up, Facing};
use crate::config::WeaponProfile;

const FOLLOW_LERP: f32 = 0.1;

/// Maps any angle in degrees into `[-180, 180)`.
pub fn wrap180(angle: f32) -> f32 {
    (angle + 180.0).rem_euclid(360.0) - 180.0
}

/// Aim expressed relative to a sprite mirrored by `facing`.
pub fn relative_aim(aimed: f32, facing: Facing) -> f32 {
    match facing {
        Facing::Right => aimed,
        Facing::Left => aimed - 180.0,
    }
}

/// Continuous aim angle that stays smooth across facing flips.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AimTracker {
    pub angle: f32,
    facing: Facing,
}

impl Default for AimTracker {
    fn default() -> Self {
        Self {
            angle: 0.0,
            facing: Facing::Right,
        }
    }
}

impl AimTracker {
    /// Blends toward `target` (relative to facing) at `rate` per second.
    pub fn update(&mut self, facing: Facing, target: f32, rate: f32, dt: f32) {
        if facing != self.facing {
            self.angle -= 180.0;
            self.facing = facing;
        }
        let t = (rate * dt).min(1.0);
        self.angle += wrap180(target - self.angle) * t;
    }

    pub fn rotation(&self) -> f32 {
        self.angle.rem_euclid(360.0)
    }
}

/// Reload timer gating shots.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FireControl {
    pub reload: f32,
    pub timer: f32,
    pub ready: bool,
}

impl FireControl {
    pub fn new(reload: f32, ready: bool) -> Self {
        Self {
            reload,
            timer: 0.0,
            ready,
        }
    }

    /// Counts toward the next shot while `armed`; disarming drops any progress.
    pub fn tick(&mut self, dt: f32, armed: bool) {
        if !armed {
            self.timer = 0.0;
            self.ready = false;
            return;
        }
        if self.ready {
            return;
        }
        self.timer += dt;
        if self.timer >= self.reload {
            self.timer = 0.0;
            self.ready = true;
        }
    }

    pub fn try_fire(&mut self) -> bool {
        if !self.ready {
            return false;
        }
        self.ready = false;
        self.timer = 0.0;
        true
    }
}

/// A shot leaving the muzzle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Shot {
    pub origin: Vec2,
    /// Aim before spread, used for recoil and the muzzle flash.
    pub aimed: f32,
    /// Travel angle including spread.
    pub angle: f32,
}

#[derive(Clone, Debug)]
pub struct Weapon {
    pub profile: WeaponProfile,
    /// Smoothed pose.
    pub pos: Vec2,
    pub target_pos: Vec2,
    /// Instantaneous aim, absolute degrees.
    pub aimed: f32,
    pub tracker: Option<AimTracker>,
    pub fire: FireControl,
    pub animator: Animator<WeaponClip>,
}

impl Weapon {
    pub fn new(profile: WeaponProfile, body_pos: Vec2, facing: Facing, tracked: bool) -> Self {
        let mut animator = Animator::new(profile.sheet_tiles);
        animator.register_clips(&weapon_clips(profile.shoot_clip_duration));
        animator.play(WeaponClip::Wait);
        let target_pos = Self::anchor(&profile, body_pos, facing);
        Self {
            fire: FireControl::new(profile.reload, !tracked),
            profile,
            pos: target_pos,
            target_pos,
            aimed: 0.0,
            tracker: tracked.then(AimTracker::default),
            animator,
        }
    }

    fn anchor(profile: &WeaponProfile, body_pos: Vec2, facing: Facing) -> Vec2 {
        let offset = profile.offset();
        body_pos + Vec2::new(offset.x * facing.sign(), offset.y)
    }

    /// Snaps the pose onto the body, for spawns.
    pub fn snap_to(&mut self, body_pos: Vec2, facing: Facing) {
        self.target_pos = Self::anchor(&self.profile, body_pos, facing);
        self.pos = self.target_pos;
    }

    pub fn follow(&mut self, body_pos: Vec2, facing: Facing) {
        self.target_pos = Self::anchor(&self.profile, body_pos, facing);
        self.pos = self.pos.lerp(self.target_pos, FOLLOW_LERP);
    }

    pub fn aim_at(&mut self, point: Vec2) {
        let d = point - self.pos;
        self.aimed = d.y.atan2(d.x).to_degrees();
    }

    pub fn muzzle(&self, facing: Facing) -> Vec2 {
        self.pos
            + forward(self.aimed) * self.profile.muzzle_distance
            + up(self.aimed) * (-self.profile.muzzle_rise * facing.sign())
    }

    /// Sprite rotation in degrees.
    pub fn rotation(&self, facing: Facing) -> f32 {
        match &self.tracker {
            Some(tracker) => tracker.rotation(),
            None => relative_aim(self.aimed, facing).rem_euclid(360.0),
        }
    }

    pub fn track(&mut self, facing: Facing, attacking: bool, rate: f32, dt: f32) {
        let target = if attacking {
            relative_aim(self.aimed, facing)
        } else {
            0.0
        };
        if let Some(tracker) = self.tracker.as_mut() {
            tracker.update(facing, target, rate, dt);
        }
    }

    /// Fires if the reload allows it.
    pub fn discharge<R: Rng>(&mut self, facing: Facing, rng: &mut R) -> Option<Shot> {
        if !self.fire.try_fire() {
            return None;
        }
        let spread = self.profile.spread_deg;
        let jitter = if spread > 0.0 {
            rng.gen_range(-spread..=spread)
        } else {
            0.0
        };
        self.animator.restart(WeaponClip::Shoot);
        Some(Shot {
            origin: self.muzzle(facing),
            aimed: self.aimed,
            angle: self.aimed + jitter,
        })
    }

    pub fn update_clip(&mut self, dt: f32) {
        match self.animator.current() {
            None => self.animator.play(WeaponClip::Wait),
            Some(WeaponClip::Shoot) if self.animator.is_finished() => {
                self.animator.play(WeaponClip::Wait)
            }
            _ => {}
        }
        self.animator.advance(dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn wrap_stays_in_half_open_range() {
        assert_eq!(wrap180(190.0), -170.0);
        assert_eq!(wrap180(-190.0), 170.0);
        assert_eq!(wrap180(180.0), -180.0);
        assert_eq!(wrap180(45.0), 45.0);
    }

    #[test]
    fn aim_converges_without_overshoot() {
        let mut tracker = AimTracker::default();
        let mut previous = tracker.angle;
        for _ in 0..120 {
            tracker.update(Facing::Right, 30.0, 12.0, 1.0 / 60.0);
            assert!(tracker.angle >= previous);
            assert!(tracker.angle <= 30.0);
            previous = tracker.angle;
        }
        assert!((tracker.angle - 30.0).abs() < 1e-3);
    }

    #[test]
    fn aim_takes_short_way_round() {
        let mut tracker = AimTracker {
            angle: 170.0,
            facing: Facing::Right,
        };
        tracker.update(Facing::Right, -170.0, 12.0, 1.0);
        assert!((tracker.rotation() - 190.0).abs() < 1e-3);
    }

    #[test]
    fn facing_flip_shifts_tracked_angle() {
        let mut tracker = AimTracker {
            angle: 20.0,
            facing: Facing::Right,
        };
        tracker.update(Facing::Left, -160.0, 12.0, 0.0);
        assert_eq!(tracker.angle, -160.0);
    }

    #[test]
    fn fire_control_counts_only_while_armed() {
        let mut fire = FireControl::new(1.0, false);
        for _ in 0..120 {
            fire.tick(1.0 / 60.0, false);
            assert!(!fire.ready);
        }
        for _ in 0..59 {
            fire.tick(1.0 / 60.0, true);
        }
        assert!(!fire.ready);
        fire.tick(1.0 / 60.0, true);
        fire.tick(1.0 / 60.0, true);
        assert!(fire.ready);
        assert!(fire.try_fire());
        assert!(!fire.try_fire());

        fire.tick(0.5, true);
        fire.tick(0.1, false);
        assert_eq!(fire.timer, 0.0);
    }

    #[test]
    fn muzzle_sits_ahead_of_pivot() {
        let weapon = Weapon::new(WeaponProfile::carbine(), Vec2::ZERO, Facing::Right, true);
        assert_eq!(weapon.pos, Vec2::new(0.0, 12.0));
        let muzzle = weapon.muzzle(Facing::Right);
        assert!((muzzle - Vec2::new(65.0, 10.0)).length() < 1e-3);
    }

    #[test]
    fn discharge_spreads_within_bounds_and_plays_shoot() {
        let mut rng = SmallRng::seed_from_u64(7);
        let mut weapon = Weapon::new(WeaponProfile::rifle(), Vec2::ZERO, Facing::Right, false);
        weapon.aim_at(Vec2::new(100.0, 18.0));
        let shot = weapon.discharge(Facing::Right, &mut rng).expect("ready to fire");
        assert!((shot.angle - shot.aimed).abs() <= 4.0);
        assert_eq!(weapon.animator.current(), Some(WeaponClip::Shoot));
        assert!(weapon.discharge(Facing::Right, &mut rng).is_none());

        for _ in 0..30 {
            weapon.update_clip(1.0 / 60.0);
        }
        assert_eq!(weapon.animator.current(), Some(WeaponClip::Wait));
    }
}
