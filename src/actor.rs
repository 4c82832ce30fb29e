use bevy::prelude::*;
use rand::rngs::SmallRng;

use crate::ai::{AiAgent, AiState, TargetView};
use crate::animation::{
    enemy_body_clips, player_body_clips, select_body_clip, Animator, BodyClip, MotionSample,
    WeaponClip,
};
use crate::combat::{DamageOutcome, Health, Projectile};
use crate::components::{ActorId, EffectKind, PlayerIntent};
use crate::config::{ActorProfile, SimConfig};
use crate::events::{EventQueue, SimEvent};
use crate::physics_core::{KinematicBody, Movement, PhysicsParams};
use crate::tilemap::Grid;
use crate::weapon::{Shot, Weapon};

const MUZZLE_FLASH_SCALE: f32 = 4.0;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum ActorKind {
    Player,
    Enemy,
}

/// Input edge tracking and weapon bob sync for the player.
#[derive(Clone, Debug, Default)]
pub struct PlayerControl {
    jump_held: bool,
    idle_sync_pending: bool,
}

#[derive(Clone, Debug)]
pub enum Controller {
    Player(PlayerControl),
    Ai(AiAgent),
    Dead,
}

/// Shared state a controller may touch during its update.
pub struct TickContext<'a> {
    pub dt: f32,
    pub grid: &'a Grid,
    pub config: &'a SimConfig,
    pub params: &'a PhysicsParams,
    pub events: &'a mut EventQueue,
    pub projectiles: &'a mut Vec<Projectile>,
    pub rng: &'a mut SmallRng,
}

#[derive(Clone, Debug)]
pub struct Actor {
    pub kind: ActorKind,
    pub body: KinematicBody,
    pub animator: Animator<BodyClip>,
    pub health: Health,
    pub weapon: Weapon,
    pub controller: Controller,
}

fn movement_of(profile: &ActorProfile) -> Movement {
    Movement {
        max_speed: profile.max_speed,
        back_speed: profile.back_speed,
        brake: profile.brake,
    }
}

impl Actor {
    pub fn player(pos: Vec2, config: &SimConfig) -> Self {
        let profile = &config.player;
        let body = KinematicBody::new(pos, profile.body_shape(), movement_of(profile));
        let mut animator = Animator::new(profile.sheet_tiles);
        animator.register_clips(&player_body_clips());
        animator.play(BodyClip::Idle);
        let weapon = Weapon::new(config.player_weapon.clone(), pos, body.facing, false);
        Self {
            kind: ActorKind::Player,
            body,
            animator,
            health: Health::new(profile.life, config.damage_feedback),
            weapon,
            controller: Controller::Player(PlayerControl::default()),
        }
    }

    pub fn enemy(pos: Vec2, going_right: bool, target: ActorId, config: &SimConfig) -> Self {
        let profile = &config.enemy;
        let body = KinematicBody::new(pos, profile.body_shape(), movement_of(profile));
        let mut animator = Animator::new(profile.sheet_tiles);
        animator.register_clips(&enemy_body_clips());
        animator.play(BodyClip::Idle);
        let weapon = Weapon::new(config.enemy_weapon.clone(), pos, body.facing, true);
        let mut agent = AiAgent::new(pos, going_right, config.ai.clone(), profile.max_speed);
        agent.target = Some(target);
        Self {
            kind: ActorKind::Enemy,
            body,
            animator,
            health: Health::new(profile.life, config.damage_feedback),
            weapon,
            controller: Controller::Ai(agent),
        }
    }

    pub fn is_dead(&self) -> bool {
        self.health.dead
    }

    pub fn pos(&self) -> Vec2 {
        self.body.pos
    }

    pub fn ai(&self) -> Option<&AiAgent> {
        match &self.controller {
            Controller::Ai(agent) => Some(agent),
            _ => None,
        }
    }

    pub fn ai_state(&self) -> Option<AiState> {
        self.ai().map(|a| a.state)
    }

    /// What other actors may know about this one for a tick.
    pub fn snapshot(&self, id: ActorId) -> TargetView {
        TargetView {
            id,
            pos: self.body.pos,
            aim_point: self.weapon.target_pos,
            dead: self.health.dead,
        }
    }

    /// Moves the actor keeping its health.
    pub fn spawn_at(&mut self, pos: Vec2) {
        self.body.reset_at(pos);
        self.weapon.snap_to(pos, self.body.facing);
        if let Controller::Ai(agent) = &mut self.controller {
            agent.reset_patrol(pos);
        }
    }

    /// Runs this actor's controller: player input or AI decisions, then the weapon.
    pub fn control(
        &mut self,
        id: ActorId,
        intent: &PlayerIntent,
        snapshots: &[TargetView],
        ctx: &mut TickContext<'_>,
    ) {
        let dt = ctx.dt;
        match &mut self.controller {
            Controller::Player(control) => {
                if !intent.left && !intent.right {
                    self.body.stop_move_x(dt);
                }
                let max = self.body.movement.max_speed;
                if intent.left {
                    self.body.move_x(dt, false, max);
                }
                if intent.right {
                    self.body.move_x(dt, true, max);
                }
                if intent.jump {
                    if !control.jump_held {
                        self.body.jump(ctx.params);
                        control.jump_held = true;
                    }
                } else {
                    control.jump_held = false;
                }

                self.body.set_facing(intent.aim_at.x - self.body.pos.x);
                self.weapon.follow(self.body.pos, self.body.facing);
                if intent.aim_at != self.weapon.pos {
                    self.weapon.aim_at(intent.aim_at);
                }
                if intent.fire {
                    if let Some(shot) = self.weapon.discharge(self.body.facing, ctx.rng) {
                        control.idle_sync_pending = true;
                        release_shot(&mut self.body, &self.weapon, id, shot, ctx);
                    }
                }
                self.weapon.fire.tick(dt, true);
            }
            Controller::Ai(agent) => {
                let target = agent.target.and_then(|t| snapshots.get(t.0));
                let state = agent.decide(self.health.dead, &self.body, target, ctx.grid);
                agent.act(dt, &mut self.body, target, ctx.grid);

                let attacking = state == AiState::Attack;
                let rate = agent.tuning.aim_rate;
                self.weapon.follow(self.body.pos, self.body.facing);
                if let Some(t) = target.filter(|_| attacking) {
                    if t.aim_point != self.weapon.pos {
                        self.weapon.aim_at(t.aim_point);
                    }
                }
                self.weapon.track(self.body.facing, attacking, rate, dt);
                if attacking {
                    if let Some(shot) = self.weapon.discharge(self.body.facing, ctx.rng) {
                        release_shot(&mut self.body, &self.weapon, id, shot, ctx);
                    }
                }
                self.weapon.fire.tick(dt, attacking);
            }
            Controller::Dead => self.body.stop_move_x(dt),
        }
    }

    /// Picks and advances clips from the post-physics state, and runs timers.
    pub fn animate(&mut self, dt: f32, fall_threshold: f32) {
        let sample = MotionSample {
            dead: self.health.dead,
            speed: self.body.speed,
            grounded: self.body.grounded,
            facing: self.body.facing,
        };
        // Only switches; a finished Death must not be replayed.
        if let Some(clip) = select_body_clip(&sample, fall_threshold)
            .filter(|&clip| self.animator.current() != Some(clip))
        {
            self.animator.play(clip);
        }
        self.animator.advance(dt);
        self.health.tick(dt);

        if !self.health.dead {
            self.weapon.update_clip(dt);
        }
        if let Controller::Player(control) = &mut self.controller {
            let body_idle = self.animator.current() == Some(BodyClip::Idle);
            if !body_idle {
                control.idle_sync_pending = true;
            } else if control.idle_sync_pending
                && self.weapon.animator.current() == Some(WeaponClip::Wait)
            {
                if let Some(idle) = self.animator.active_clip() {
                    self.weapon.animator.sync_from(idle);
                }
                control.idle_sync_pending = false;
            }
        }
    }

    /// Applies one projectile hit. Returns false when the actor was already dead.
    pub fn take_damage(
        &mut self,
        id: ActorId,
        dir: Vec2,
        config: &SimConfig,
        events: &mut EventQueue,
    ) -> bool {
        let outcome = self.health.take_hit();
        if outcome == DamageOutcome::Ignored {
            return false;
        }
        self.body.apply_impulse(config.knockback_force, dir);
        events.emit(SimEvent::ActorDamaged {
            actor: id,
            life: self.health.life,
        });
        if self.kind == ActorKind::Player {
            let [duration, strength] = config.damage_shake;
            events.shake(duration, strength);
        }
        if let Controller::Ai(agent) = &mut self.controller {
            agent.notice();
        }
        if outcome == DamageOutcome::Killed {
            self.animator.play(BodyClip::Death);
            events.emit(SimEvent::ActorDied { actor: id });
            debug!("[Recoil] {:?} {} died", self.kind, id.0);
            if matches!(self.controller, Controller::Player(_)) {
                self.controller = Controller::Dead;
            }
        }
        true
    }
}

fn release_shot(
    body: &mut KinematicBody,
    weapon: &Weapon,
    id: ActorId,
    shot: Shot,
    ctx: &mut TickContext<'_>,
) {
    ctx.projectiles.push(Projectile::new(
        shot.origin,
        shot.angle,
        ctx.config.projectile_speed,
        id,
    ));
    ctx.events.effect(
        EffectKind::FireMuzzle,
        shot.origin,
        shot.aimed,
        Vec2::splat(MUZZLE_FLASH_SCALE),
    );
    body.apply_recoil(ctx.config.recoil_force, shot.aimed);
    if let Some([duration, strength]) = weapon.profile.fire_shake {
        ctx.events.shake(duration, strength);
    }
}
