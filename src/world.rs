use bevy::prelude::*;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::actor::{Actor, TickContext};
use crate::ai::TargetView;
use crate::combat::{advance_projectile, sweep_deleted, HitRadii, HitTarget, Projectile, ProjectileOutcome, ViewBand};
use crate::components::{forward, ActorId, EffectKind, PlayerIntent, TileType};
use crate::config::SimConfig;
use crate::events::{EventQueue, SimEvent};
use crate::physics_core::{Aabb, PhysicsParams};
use crate::tilemap::Grid;

const EXPLOSION_OFFSET: f32 = 10.0;
const EXPLOSION_ROTATION: f32 = 45.0;
const EXPLOSION_SCALE: (f32, f32) = (0.7, 1.8);
const SIGHT_STEP: f32 = 20.0;

/// Player index in the actor arena.
pub const PLAYER: ActorId = ActorId(0);

/// All mutable simulation state, advanced one tick at a time.
#[derive(Resource)]
pub struct SimWorld {
    pub config: SimConfig,
    params: PhysicsParams,
    pub grid: Grid,
    actors: Vec<Actor>,
    pub projectiles: Vec<Projectile>,
    events: EventQueue,
    view_center: Vec2,
    rng: SmallRng,
    pub ticks: u64,
}

impl SimWorld {
    pub fn new(config: SimConfig, grid: Grid, player_spawn: Vec2) -> Self {
        let view_center = config.view_size() * 0.5;
        let rng = SmallRng::seed_from_u64(config.seed);
        let player = Actor::player(player_spawn, &config);
        Self {
            params: PhysicsParams::from(&config),
            config,
            grid,
            actors: vec![player],
            projectiles: Vec::new(),
            events: EventQueue::default(),
            view_center,
            rng,
            ticks: 0,
        }
    }

    pub fn actors(&self) -> &[Actor] {
        &self.actors
    }

    pub fn actor(&self, id: ActorId) -> Option<&Actor> {
        self.actors.get(id.0)
    }

    pub fn actor_mut(&mut self, id: ActorId) -> Option<&mut Actor> {
        self.actors.get_mut(id.0)
    }

    pub fn player(&self) -> &Actor {
        &self.actors[PLAYER.0]
    }

    pub fn enemies(&self) -> impl Iterator<Item = (ActorId, &Actor)> + '_ {
        self.actors
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, a)| (ActorId(i), a))
    }

    /// Adds an enemy targeting the player; its initial patrol direction is random.
    pub fn add_enemy(&mut self, pos: Vec2) -> ActorId {
        let going_right = self.rng.gen_bool(0.5);
        let id = ActorId(self.actors.len());
        self.actors
            .push(Actor::enemy(pos, going_right, PLAYER, &self.config));
        id
    }

    pub fn view_center(&self) -> Vec2 {
        self.view_center
    }

    pub fn set_view_center(&mut self, center: Vec2) {
        self.view_center = center;
    }

    pub fn events(&self) -> &EventQueue {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        self.events.drain()
    }

    pub fn tick(&mut self, dt: f32, intent: &PlayerIntent) {
        if !(dt > 0.0) {
            return;
        }
        let dt = dt.min(self.config.max_dt);

        let snapshots: Vec<TargetView> = self
            .actors
            .iter()
            .enumerate()
            .map(|(i, a)| a.snapshot(ActorId(i)))
            .collect();

        {
            let Self {
                config,
                params,
                grid,
                actors,
                projectiles,
                events,
                rng,
                ..
            } = self;
            let mut ctx = TickContext {
                dt,
                grid,
                config,
                params,
                events,
                projectiles,
                rng,
            };
            for (i, actor) in actors.iter_mut().enumerate() {
                actor.control(ActorId(i), intent, &snapshots, &mut ctx);
            }
        }

        for actor in &mut self.actors {
            actor.body.step(dt, &self.grid, &self.params);
        }

        let fall_threshold = self.config.fall_anim_threshold;
        for actor in &mut self.actors {
            actor.animate(dt, fall_threshold);
        }

        self.resolve_projectiles(dt);
        sweep_deleted(&mut self.projectiles);

        self.events.advance_frame();
        self.ticks += 1;
    }

    fn resolve_projectiles(&mut self, dt: f32) {
        let band = ViewBand {
            center: self.view_center,
            half_width: self.config.view_size[0] * 0.5,
        };
        let radii = HitRadii {
            coarse: self.config.projectile_coarse_radius,
            precise: self.config.projectile_hit_radius,
        };
        let mut targets: Vec<HitTarget> = self
            .actors
            .iter()
            .enumerate()
            .map(|(i, a)| HitTarget {
                id: ActorId(i),
                pos: a.body.pos,
                hit_box: a.body.hit_box(),
                dead: a.is_dead(),
            })
            .collect();

        for projectile in &mut self.projectiles {
            let outcome = advance_projectile(projectile, dt, &band, &self.grid, &targets, radii);
            let impact = projectile.pos + projectile.dir * EXPLOSION_OFFSET;
            match outcome {
                ProjectileOutcome::Flying | ProjectileOutcome::Culled => continue,
                ProjectileOutcome::HitTile { cell, tile } => {
                    if tile.is_destructible() && self.grid.clear_tile(cell.x, cell.y).is_some() {
                        destroy_box(&mut self.events, &self.grid, cell, tile);
                    }
                }
                ProjectileOutcome::HitActor(id) => {
                    if let Some(actor) = self.actors.get_mut(id.0) {
                        actor.take_damage(id, projectile.dir, &self.config, &mut self.events);
                        targets[id.0].dead = actor.is_dead();
                    }
                }
            }
            let scale = self.rng.gen_range(EXPLOSION_SCALE.0..=EXPLOSION_SCALE.1);
            self.events.effect(
                EffectKind::Explosion,
                impact,
                projectile.angle + EXPLOSION_ROTATION,
                Vec2::splat(scale),
            );
        }
    }

    /// A tile may go where the cell is free and no actor overlaps it.
    pub fn can_place_tile(&self, cell: IVec2) -> bool {
        if self.grid.is_solid(cell.x, cell.y) {
            return false;
        }
        !self
            .actors
            .iter()
            .any(|a| self.grid.cells_in_rect(&a.body.vbox).contains(&cell))
    }

    pub fn place_tile(&mut self, tile: TileType, cell: IVec2) -> bool {
        self.can_place_tile(cell) && self.grid.set_tile(tile, cell.x, cell.y)
    }

    /// Editor removal. Boxes removed this way do not explode.
    pub fn remove_tile(&mut self, cell: IVec2) -> Option<TileType> {
        self.grid.clear_tile(cell.x, cell.y)
    }

    /// Whether a body of `size` centred on `pos` would overlap neither tiles nor actors.
    pub fn can_place_actor(&self, pos: Vec2, size: Vec2) -> bool {
        let cells = self.grid.cells_in_rect(&Aabb::from_center(pos, size));
        if cells.iter().any(|c| self.grid.is_solid(c.x, c.y)) {
            return false;
        }
        !self.actors.iter().any(|a| {
            let taken = self.grid.cells_in_rect(&a.body.vbox);
            cells.iter().any(|c| taken.contains(c))
        })
    }

    pub fn place_enemy(&mut self, pos: Vec2) -> Option<ActorId> {
        let size = self.config.enemy.body_shape().size;
        if !self.can_place_actor(pos, size) {
            return None;
        }
        Some(self.add_enemy(pos))
    }

    /// Moves the player. Its own current footprint does not block the move.
    pub fn place_player(&mut self, pos: Vec2) -> bool {
        let size = self.config.player.body_shape().size;
        let cells = self.grid.cells_in_rect(&Aabb::from_center(pos, size));
        let blocked = cells.iter().any(|c| self.grid.is_solid(c.x, c.y))
            || self.enemies().any(|(_, a)| {
                let taken = self.grid.cells_in_rect(&a.body.vbox);
                cells.iter().any(|c| taken.contains(c))
            });
        if blocked {
            return false;
        }
        self.actors[PLAYER.0].spawn_at(pos);
        true
    }

    /// Distance along the player's aim to the first tile or living enemy, up to
    /// `max_len`. Measured from one step behind the muzzle.
    pub fn sight_length(&self, max_len: f32) -> f32 {
        let weapon = &self.player().weapon;
        let dir = forward(weapon.aimed);
        let start = weapon.muzzle(self.player().body.facing) - dir * SIGHT_STEP;
        let mut dist = 0.0;
        while dist < max_len {
            let p = start + dir * dist;
            if self.grid.is_solid_at(p) {
                return dist;
            }
            if self
                .enemies()
                .any(|(_, e)| !e.is_dead() && e.body.vbox.contains(p))
            {
                return dist;
            }
            dist += SIGHT_STEP;
        }
        max_len
    }
}

fn destroy_box(events: &mut EventQueue, grid: &Grid, cell: IVec2, tile: TileType) {
    events.emit(SimEvent::TileDestroyed { cell, tile });
    events.effect(
        EffectKind::BoxExplosion,
        grid.cell_center(cell.x, cell.y),
        0.0,
        Vec2::ONE,
    );
    debug!("[Recoil] Box destroyed at ({}, {})", cell.x, cell.y);
}
