use std::fmt::Debug;

use bevy::prelude::*;
use thiserror::Error;

use crate::components::Facing;

/// Key type of an [`Animator`] clip table.
pub trait ClipKey: Copy + Eq + Debug {
    const COUNT: usize;

    fn index(self) -> usize;

    fn name(self) -> &'static str;
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum BodyClip {
    Idle,
    Run,
    RunBack,
    Jump,
    Fall,
    Death,
}

impl ClipKey for BodyClip {
    const COUNT: usize = 6;

    fn index(self) -> usize {
        self as usize
    }

    fn name(self) -> &'static str {
        match self {
            BodyClip::Idle => "idle",
            BodyClip::Run => "run",
            BodyClip::RunBack => "run_back",
            BodyClip::Jump => "jump",
            BodyClip::Fall => "fall",
            BodyClip::Death => "death",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum WeaponClip {
    Wait,
    Shoot,
}

impl ClipKey for WeaponClip {
    const COUNT: usize = 2;

    fn index(self) -> usize {
        self as usize
    }

    fn name(self) -> &'static str {
        match self {
            WeaponClip::Wait => "wait",
            WeaponClip::Shoot => "shoot",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnimationError {
    #[error("clip '{clip}': sprite sheet has no tiles")]
    EmptySheet { clip: &'static str },
    #[error("clip '{clip}': frame list is empty")]
    NoFrames { clip: &'static str },
    #[error("clip '{clip}': frame {frame} is outside a sheet of {tiles} tiles")]
    FrameOutOfRange {
        clip: &'static str,
        frame: u32,
        tiles: u32,
    },
    #[error("clip '{clip}': duration {duration} must be positive and finite")]
    InvalidDuration { clip: &'static str, duration: f32 },
}

/// Static description of one clip, used to register a whole table at once.
#[derive(Clone, Debug, PartialEq)]
pub struct ClipDef<K> {
    pub key: K,
    pub frames: Vec<u32>,
    pub duration: f32,
    pub looping: bool,
}

impl<K> ClipDef<K> {
    pub fn new(key: K, frames: impl Into<Vec<u32>>, duration: f32, looping: bool) -> Self {
        Self {
            key,
            frames: frames.into(),
            duration,
            looping,
        }
    }
}

/// Slack, in frames, so `duration / n` rounding never drops a wrap.
const FRAME_EPSILON: f32 = 1e-4;

#[derive(Clone, Debug, PartialEq)]
pub struct AnimClip {
    frames: Vec<u32>,
    pub duration: f32,
    pub frame_time: f32,
    pub looping: bool,
    pub index: usize,
    pub timer: f32,
    pub finished: bool,
    pub speed: f32,
    /// Completed wraps since the clip was last (re)started.
    pub loop_count: u32,
}

impl AnimClip {
    fn new(frames: Vec<u32>, duration: f32, looping: bool) -> Self {
        let frame_time = duration / frames.len() as f32;
        Self {
            frames,
            duration,
            frame_time,
            looping,
            index: 0,
            timer: 0.0,
            finished: false,
            speed: 1.0,
            loop_count: 0,
        }
    }

    pub fn frames(&self) -> &[u32] {
        &self.frames
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Sheet tile of the current frame.
    pub fn tile(&self) -> u32 {
        self.frames[self.index]
    }

    fn reset(&mut self) {
        self.index = 0;
        self.timer = 0.0;
        self.finished = false;
        self.loop_count = 0;
    }

    /// Steps by whole frames of accumulated time, in constant time for any `dt`.
    fn advance(&mut self, dt: f32) {
        if self.finished {
            return;
        }
        self.timer += dt * self.speed;
        if self.timer.is_nan() {
            self.timer = 0.0;
            return;
        }
        let whole = (self.timer / self.frame_time + FRAME_EPSILON).floor();
        if !(whole >= 1.0) {
            return;
        }
        self.timer = (self.timer - whole * self.frame_time).clamp(0.0, self.frame_time);
        if !self.timer.is_finite() {
            self.timer = 0.0;
        }

        let count = self.frames.len() as u64;
        let last = count - 1;
        // `as` saturates, so huge or infinite steps stay in range.
        let target = (self.index as u64).saturating_add(whole as u64);
        if self.looping {
            let wraps = u32::try_from(target / count).unwrap_or(u32::MAX);
            self.loop_count = self.loop_count.saturating_add(wraps);
            self.index = (target % count) as usize;
        } else if target > last {
            self.index = last as usize;
            self.finished = true;
            self.timer = 0.0;
        } else {
            self.index = target as usize;
        }
    }
}

/// Clip table plus the currently playing clip.
#[derive(Clone, Debug)]
pub struct Animator<K: ClipKey> {
    sheet_tiles: u32,
    clips: Vec<Option<AnimClip>>,
    active: Option<K>,
}

impl<K: ClipKey> Animator<K> {
    pub fn new(sheet_tiles: u32) -> Self {
        Self {
            sheet_tiles,
            clips: vec![None; K::COUNT],
            active: None,
        }
    }

    pub fn sheet_tiles(&self) -> u32 {
        self.sheet_tiles
    }

    pub fn register_clip(
        &mut self,
        key: K,
        frames: Vec<u32>,
        duration: f32,
        looping: bool,
    ) -> Result<(), AnimationError> {
        let result = self.validate(key, &frames, duration);
        match result {
            Ok(()) => {
                self.clips[key.index()] = Some(AnimClip::new(frames, duration, looping));
                Ok(())
            }
            Err(e) => {
                warn!("[Recoil animation] {}", e);
                Err(e)
            }
        }
    }

    /// Registers every clip in `defs`, returning how many were accepted.
    pub fn register_clips(&mut self, defs: &[ClipDef<K>]) -> usize {
        defs.iter()
            .filter(|def| {
                self.register_clip(def.key, def.frames.clone(), def.duration, def.looping)
                    .is_ok()
            })
            .count()
    }

    fn validate(&self, key: K, frames: &[u32], duration: f32) -> Result<(), AnimationError> {
        let clip = key.name();
        if self.sheet_tiles == 0 {
            return Err(AnimationError::EmptySheet { clip });
        }
        if frames.is_empty() {
            return Err(AnimationError::NoFrames { clip });
        }
        if let Some(&frame) = frames.iter().find(|&&f| f >= self.sheet_tiles) {
            return Err(AnimationError::FrameOutOfRange {
                clip,
                frame,
                tiles: self.sheet_tiles,
            });
        }
        if !(duration.is_finite() && duration > 0.0) {
            return Err(AnimationError::InvalidDuration { clip, duration });
        }
        Ok(())
    }

    pub fn is_registered(&self, key: K) -> bool {
        self.clips[key.index()].is_some()
    }

    /// Switches to `key`. Re-playing the active clip does nothing while it
    /// runs; a finished one-shot starts over.
    pub fn play(&mut self, key: K) {
        if !self.is_registered(key) {
            debug!("[Recoil animation] ignoring unregistered clip '{}'", key.name());
            return;
        }
        if self.active == Some(key) {
            if let Some(clip) = self.active_clip_mut().filter(|c| c.finished) {
                clip.reset();
            }
            return;
        }
        if let Some(outgoing) = self.active.and_then(|k| self.clips[k.index()].as_mut()) {
            outgoing.reset();
        }
        if let Some(incoming) = self.clips[key.index()].as_mut() {
            incoming.reset();
        }
        self.active = Some(key);
    }

    /// Plays `key` from its first frame even when it is already active.
    pub fn restart(&mut self, key: K) {
        if self.active == Some(key) {
            if let Some(clip) = self.clips[key.index()].as_mut() {
                clip.reset();
            }
        } else {
            self.play(key);
        }
    }

    pub fn advance(&mut self, dt: f32) {
        if let Some(clip) = self.active_clip_mut() {
            clip.advance(dt);
        }
    }

    pub fn current(&self) -> Option<K> {
        self.active
    }

    pub fn clip(&self, key: K) -> Option<&AnimClip> {
        self.clips[key.index()].as_ref()
    }

    pub fn active_clip(&self) -> Option<&AnimClip> {
        self.active.and_then(|k| self.clips[k.index()].as_ref())
    }

    fn active_clip_mut(&mut self) -> Option<&mut AnimClip> {
        let key = self.active?;
        self.clips[key.index()].as_mut()
    }

    /// Sheet tile to draw, if anything is playing.
    pub fn current_frame(&self) -> Option<u32> {
        self.active_clip().map(AnimClip::tile)
    }

    pub fn is_finished(&self) -> bool {
        self.active_clip().is_some_and(|c| c.finished)
    }

    pub fn set_speed(&mut self, speed: f32) {
        if let Some(clip) = self.active_clip_mut() {
            clip.speed = speed;
        }
    }

    /// Copies frame position and timer from `other` into the active clip.
    pub fn sync_from(&mut self, other: &AnimClip) {
        if let Some(clip) = self.active_clip_mut() {
            clip.index = other.index.min(clip.frames.len() - 1);
            clip.timer = other.timer;
        }
    }
}

/// Physical state the body clip is chosen from.
#[derive(Clone, Copy, Debug)]
pub struct MotionSample {
    pub dead: bool,
    /// Post-collision combined velocity.
    pub speed: Vec2,
    pub grounded: bool,
    pub facing: Facing,
}

/// Priority selector for body clips. `None` keeps whatever is playing.
pub fn select_body_clip(sample: &MotionSample, fall_threshold: f32) -> Option<BodyClip> {
    let MotionSample {
        dead,
        speed,
        grounded,
        facing,
    } = *sample;
    if dead {
        return Some(BodyClip::Death);
    }
    if speed == Vec2::ZERO {
        return Some(BodyClip::Idle);
    }
    if speed.y > fall_threshold {
        return Some(BodyClip::Fall);
    }
    if speed.y < 0.0 {
        return Some(BodyClip::Jump);
    }
    if grounded && speed.x != 0.0 {
        let toward = (speed.x > 0.0) == (facing == Facing::Right);
        return Some(if toward { BodyClip::Run } else { BodyClip::RunBack });
    }
    None
}

pub fn player_body_clips() -> Vec<ClipDef<BodyClip>> {
    vec![
        ClipDef::new(BodyClip::Idle, [10, 11, 12, 13, 14], 0.5, true),
        ClipDef::new(BodyClip::Run, [18, 19, 20, 21, 22, 23, 24, 25], 0.45, true),
        ClipDef::new(BodyClip::RunBack, [25, 24, 23, 22, 21, 20, 19, 18], 0.8, true),
        ClipDef::new(BodyClip::Jump, [15, 16, 17], 0.25, true),
        ClipDef::new(BodyClip::Fall, [7, 8, 9], 0.15, true),
        ClipDef::new(BodyClip::Death, [0, 1, 2, 3, 4, 5, 6], 1.0, false),
    ]
}

pub fn enemy_body_clips() -> Vec<ClipDef<BodyClip>> {
    vec![
        ClipDef::new(BodyClip::Idle, [11, 12, 13, 14, 15], 0.5, true),
        ClipDef::new(BodyClip::Run, [17, 18, 19, 20, 21, 22, 23, 24], 0.45, true),
        ClipDef::new(BodyClip::RunBack, [24, 23, 22, 21, 20, 19, 18, 17], 0.8, true),
        ClipDef::new(BodyClip::Jump, [16], 0.25, true),
        ClipDef::new(BodyClip::Fall, [8, 9, 10], 0.15, true),
        ClipDef::new(BodyClip::Death, [0, 1, 2, 3, 4, 5, 6, 7], 1.0, false),
    ]
}

pub fn weapon_clips(shoot_duration: f32) -> Vec<ClipDef<WeaponClip>> {
    vec![
        ClipDef::new(WeaponClip::Wait, [0, 1, 2, 3, 4], 0.5, true),
        ClipDef::new(
            WeaponClip::Shoot,
            [5, 6, 7, 8, 9, 10, 11, 12],
            shoot_duration,
            false,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn looping_animator(frames: u32, duration: f32) -> Animator<BodyClip> {
        let mut anim = Animator::new(32);
        anim.register_clip(BodyClip::Idle, (0..frames).collect(), duration, true)
            .expect("valid clip");
        anim.play(BodyClip::Idle);
        anim
    }

    #[test]
    fn looping_clip_wraps_once_per_duration() {
        let mut anim = looping_animator(4, 1.0);
        let mut zero_visits = 1;
        for _ in 0..4 {
            let before = anim.active_clip().map(|c| c.loop_count).unwrap_or(0);
            anim.advance(1.0);
            let clip = anim.active_clip().expect("active clip");
            zero_visits += clip.loop_count - before;
            assert_eq!(clip.index, 0);
            assert!(!clip.finished);
        }
        assert_eq!(zero_visits, 5);
        assert_eq!(anim.active_clip().map(|c| c.loop_count), Some(4));
    }

    #[test]
    fn non_looping_clip_holds_last_frame_until_replayed() {
        let mut anim: Animator<BodyClip> = Animator::new(8);
        anim.register_clip(BodyClip::Death, vec![0, 1, 2, 3], 1.0, false)
            .expect("valid clip");
        anim.play(BodyClip::Death);
        anim.advance(0.6);
        anim.advance(0.6);
        anim.advance(5.0);
        let clip = anim.active_clip().expect("active clip");
        assert_eq!(clip.index, 3);
        assert!(clip.finished);
        assert_eq!(anim.current_frame(), Some(3));

        anim.play(BodyClip::Death);
        let clip = anim.active_clip().expect("active clip");
        assert_eq!(clip.index, 0);
        assert!(!clip.finished);

        anim.advance(0.5);
        anim.play(BodyClip::Death);
        assert_eq!(anim.active_clip().map(|c| c.index), Some(2));
        anim.restart(BodyClip::Death);
        assert_eq!(anim.active_clip().map(|c| c.index), Some(0));
    }

    fn assert_loop_law<K: ClipKey>(defs: &[ClipDef<K>]) {
        for def in defs.iter().filter(|d| d.looping) {
            let mut anim: Animator<K> = Animator::new(32);
            anim.register_clip(def.key, def.frames.clone(), def.duration, true)
                .expect("valid clip");
            anim.play(def.key);
            let n = def.frames.len() as u32;
            let mut zero_visits = 1;
            for _ in 0..n {
                let before = anim.active_clip().map_or(0, |c| c.loop_count);
                anim.advance(def.duration);
                let clip = anim.active_clip().expect("active clip");
                zero_visits += clip.loop_count - before;
                assert_eq!(clip.index, 0, "clip '{}' drifted", def.key.name());
                assert!(!clip.finished);
            }
            assert_eq!(zero_visits, n + 1, "clip '{}'", def.key.name());
        }
    }

    #[test]
    fn every_looping_table_clip_wraps_once_per_duration() {
        assert_loop_law(&player_body_clips());
        assert_loop_law(&enemy_body_clips());
        assert_loop_law(&weapon_clips(0.05));
    }

    #[test]
    fn huge_dt_completes() {
        let mut anim = looping_animator(5, 0.5);
        anim.advance(1.0e9);
        let clip = anim.active_clip().expect("active clip");
        assert!(clip.index < 5);
        assert!(clip.loop_count > 0);
        assert!(clip.timer >= 0.0 && clip.timer <= clip.frame_time);

        let mut death: Animator<BodyClip> = Animator::new(8);
        death
            .register_clip(BodyClip::Death, vec![0, 1, 2, 3], 1.0, false)
            .expect("valid clip");
        death.play(BodyClip::Death);
        death.advance(1.0e9);
        assert!(death.is_finished());
        assert_eq!(death.current_frame(), Some(3));
        death.play(BodyClip::Death);
        death.advance(f32::INFINITY);
        assert!(death.is_finished());
    }

    #[test]
    fn replaying_active_clip_is_noop() {
        let mut anim = looping_animator(4, 1.0);
        anim.advance(0.5);
        anim.play(BodyClip::Idle);
        assert_eq!(anim.active_clip().map(|c| c.index), Some(2));
    }

    #[test]
    fn switching_resets_incoming_clip() {
        let mut anim = looping_animator(4, 1.0);
        anim.register_clip(BodyClip::Run, vec![4, 5, 6], 0.3, true)
            .expect("valid clip");
        anim.advance(0.5);
        anim.play(BodyClip::Run);
        anim.advance(0.15);
        anim.play(BodyClip::Idle);
        let idle = anim.active_clip().expect("active clip");
        assert_eq!(idle.index, 0);
        assert_eq!(idle.timer, 0.0);
        assert_eq!(anim.clip(BodyClip::Run).map(|c| c.index), Some(0));
    }

    #[test]
    fn bad_clips_are_rejected_without_touching_active() {
        let mut anim = looping_animator(4, 1.0);
        assert!(matches!(
            anim.register_clip(BodyClip::Run, vec![], 1.0, true),
            Err(AnimationError::NoFrames { .. })
        ));
        assert!(matches!(
            anim.register_clip(BodyClip::Run, vec![1, 40], 1.0, true),
            Err(AnimationError::FrameOutOfRange { frame: 40, .. })
        ));
        assert!(matches!(
            anim.register_clip(BodyClip::Run, vec![1], f32::NAN, true),
            Err(AnimationError::InvalidDuration { .. })
        ));
        assert!(matches!(
            anim.register_clip(BodyClip::Run, vec![1], 0.0, true),
            Err(AnimationError::InvalidDuration { .. })
        ));
        assert!(!anim.is_registered(BodyClip::Run));
        assert_eq!(anim.current(), Some(BodyClip::Idle));

        let mut empty: Animator<WeaponClip> = Animator::new(0);
        assert_eq!(empty.register_clips(&weapon_clips(0.1)), 0);
        empty.play(WeaponClip::Wait);
        assert_eq!(empty.current(), None);
        empty.advance(1.0);
    }

    #[test]
    fn default_tables_fit_their_sheets() {
        let mut body: Animator<BodyClip> = Animator::new(28);
        assert_eq!(body.register_clips(&player_body_clips()), 6);
        let mut enemy: Animator<BodyClip> = Animator::new(25);
        assert_eq!(enemy.register_clips(&enemy_body_clips()), 6);
        let mut weapon: Animator<WeaponClip> = Animator::new(13);
        assert_eq!(weapon.register_clips(&weapon_clips(0.05)), 2);
    }

    #[test]
    fn sync_copies_phase() {
        let source = looping_animator(5, 0.5);
        let mut source = source;
        source.advance(0.25);

        let mut weapon: Animator<WeaponClip> = Animator::new(13);
        weapon.register_clips(&weapon_clips(0.1));
        weapon.play(WeaponClip::Wait);
        let phase = source.active_clip().expect("active clip").clone();
        weapon.sync_from(&phase);
        assert_eq!(weapon.active_clip().map(|c| c.index), Some(phase.index));
    }

    #[test]
    fn body_clip_priority() {
        let mut sample = MotionSample {
            dead: false,
            speed: Vec2::ZERO,
            grounded: true,
            facing: Facing::Right,
        };
        assert_eq!(select_body_clip(&sample, 250.0), Some(BodyClip::Idle));

        sample.speed = Vec2::new(100.0, 300.0);
        assert_eq!(select_body_clip(&sample, 250.0), Some(BodyClip::Fall));

        sample.speed = Vec2::new(100.0, -10.0);
        assert_eq!(select_body_clip(&sample, 250.0), Some(BodyClip::Jump));

        sample.speed = Vec2::new(100.0, 0.0);
        assert_eq!(select_body_clip(&sample, 250.0), Some(BodyClip::Run));

        sample.facing = Facing::Left;
        assert_eq!(select_body_clip(&sample, 250.0), Some(BodyClip::RunBack));

        sample.grounded = false;
        sample.speed = Vec2::new(100.0, 100.0);
        assert_eq!(select_body_clip(&sample, 250.0), None);

        sample.dead = true;
        assert_eq!(select_body_clip(&sample, 250.0), Some(BodyClip::Death));
    }
}
