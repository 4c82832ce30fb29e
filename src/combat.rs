use bevy::prelude::*;

use crate::components::{forward, ActorId, TileType};
use crate::physics_core::Aabb;
use crate::tilemap::Grid;

#[derive(Clone, Debug, PartialEq)]
pub struct Projectile {
    pub pos: Vec2,
    pub dir: Vec2,
    pub speed: f32,
    /// Travel angle in degrees.
    pub angle: f32,
    pub owner: ActorId,
    pub deleted: bool,
}

impl Projectile {
    pub fn new(pos: Vec2, angle: f32, speed: f32, owner: ActorId) -> Self {
        Self {
            pos,
            dir: forward(angle),
            speed,
            angle,
            owner,
            deleted: false,
        }
    }
}

/// A body a projectile can hit this tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HitTarget {
    pub id: ActorId,
    pub pos: Vec2,
    pub hit_box: Aabb,
    pub dead: bool,
}

/// Camera band projectiles live in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewBand {
    pub center: Vec2,
    pub half_width: f32,
}

impl ViewBand {
    pub fn contains(&self, p: Vec2) -> bool {
        p.x <= self.center.x + self.half_width && p.x >= self.center.x - self.half_width && p.y >= 0.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HitRadii {
    pub coarse: f32,
    pub precise: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ProjectileOutcome {
    Flying,
    /// Left the camera band.
    Culled,
    HitTile { cell: IVec2, tile: TileType },
    HitActor(ActorId),
}

/// Moves `projectile` one tick and decides what, if anything, it hit.
/// Targets are tested in slice order and at most one is hit.
pub fn advance_projectile(
    projectile: &mut Projectile,
    dt: f32,
    band: &ViewBand,
    grid: &Grid,
    targets: &[HitTarget],
    radii: HitRadii,
) -> ProjectileOutcome {
    if projectile.deleted {
        return ProjectileOutcome::Culled;
    }
    projectile.pos += projectile.dir * projectile.speed * dt;

    if !band.contains(projectile.pos) {
        projectile.deleted = true;
        return ProjectileOutcome::Culled;
    }

    let cell = grid.cell_of(projectile.pos);
    if let Some(tile) = grid.tile_at(cell.x, cell.y) {
        projectile.deleted = true;
        return ProjectileOutcome::HitTile { cell, tile };
    }

    let coarse_sq = radii.coarse * radii.coarse;
    let precise_sq = radii.precise * radii.precise;
    let hit = targets.iter().filter(|t| !t.dead).find(|t| {
        t.pos.distance_squared(projectile.pos) < coarse_sq
            && t.hit_box.distance_sq_to_point(projectile.pos) < precise_sq
    });
    match hit {
        Some(target) => {
            projectile.deleted = true;
            ProjectileOutcome::HitActor(target.id)
        }
        None => ProjectileOutcome::Flying,
    }
}

/// Drops deleted projectiles, scanning from the back.
pub fn sweep_deleted(projectiles: &mut Vec<Projectile>) -> usize {
    let mut removed = 0;
    for i in (0..projectiles.len()).rev() {
        if projectiles[i].deleted {
            projectiles.remove(i);
            removed += 1;
        }
    }
    removed
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DamageOutcome {
    Ignored,
    Hurt,
    Killed,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Health {
    pub life: i32,
    pub dead: bool,
    pub feedback_window: f32,
    pub feedback_timer: f32,
    pub feedback_active: bool,
}

impl Health {
    pub fn new(life: i32, feedback_window: f32) -> Self {
        Self {
            life,
            dead: false,
            feedback_window,
            feedback_timer: 0.0,
            feedback_active: false,
        }
    }

    pub fn take_hit(&mut self) -> DamageOutcome {
        if self.dead {
            return DamageOutcome::Ignored;
        }
        self.life -= 1;
        self.feedback_active = true;
        self.feedback_timer = 0.0;
        if self.life <= 0 {
            self.dead = true;
            DamageOutcome::Killed
        } else {
            DamageOutcome::Hurt
        }
    }

    pub fn tick(&mut self, dt: f32) {
        if !self.feedback_active {
            return;
        }
        self.feedback_timer += dt;
        if self.feedback_timer >= self.feedback_window {
            self.feedback_active = false;
            self.feedback_timer = 0.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn radii() -> HitRadii {
        HitRadii {
            coarse: 100.0,
            precise: 4.0,
        }
    }

    fn band() -> ViewBand {
        ViewBand {
            center: Vec2::new(960.0, 540.0),
            half_width: 960.0,
        }
    }

    fn target(id: usize, center: Vec2) -> HitTarget {
        HitTarget {
            id: ActorId(id),
            pos: center,
            hit_box: Aabb::from_center(center, Vec2::new(34.0, 58.0)),
            dead: false,
        }
    }

    #[test]
    fn crossing_projectile_stops_at_first_solid_cell() {
        let mut grid = Grid::new(64.0);
        grid.set_tile(TileType::Box, 10, 0);
        let mut p = Projectile::new(Vec2::new(5.0, 10.0), 0.0, 1600.0, ActorId(0));

        let mut ticks = 0;
        loop {
            let outcome = advance_projectile(&mut p, DT, &band(), &grid, &[], radii());
            ticks += 1;
            match outcome {
                ProjectileOutcome::Flying => assert!(p.pos.x < 640.0),
                ProjectileOutcome::HitTile { cell, tile } => {
                    assert_eq!(cell, IVec2::new(10, 0));
                    assert_eq!(tile, TileType::Box);
                    assert!(p.pos.x >= 640.0);
                    break;
                }
                other => panic!("unexpected outcome {other:?}"),
            }
            assert!(ticks < 100);
        }
        assert!(p.deleted);
        assert_eq!(ticks, 24);
    }

    #[test]
    fn leaving_band_or_top_culls() {
        let grid = Grid::new(64.0);
        let mut up = Projectile::new(Vec2::new(500.0, 5.0), -90.0, 1600.0, ActorId(0));
        assert_eq!(
            advance_projectile(&mut up, DT, &band(), &grid, &[], radii()),
            ProjectileOutcome::Culled
        );
        let mut right = Projectile::new(Vec2::new(1915.0, 500.0), 0.0, 1600.0, ActorId(0));
        assert_eq!(
            advance_projectile(&mut right, DT, &band(), &grid, &[], radii()),
            ProjectileOutcome::Culled
        );
        assert!(right.deleted);
    }

    #[test]
    fn hits_only_first_living_target() {
        let grid = Grid::new(64.0);
        let center = Vec2::new(530.0, 500.0);
        let mut dead = target(0, center);
        dead.dead = true;
        let targets = [dead, target(1, center), target(2, center)];

        let mut p = Projectile::new(Vec2::new(500.0, 500.0), 0.0, 600.0, ActorId(3));
        assert_eq!(
            advance_projectile(&mut p, DT, &band(), &grid, &targets, radii()),
            ProjectileOutcome::HitActor(ActorId(1))
        );
        assert_eq!(
            advance_projectile(&mut p, DT, &band(), &grid, &targets, radii()),
            ProjectileOutcome::Culled
        );
    }

    #[test]
    fn near_miss_outside_precise_radius() {
        let grid = Grid::new(64.0);
        let targets = [target(1, Vec2::new(500.0, 540.0))];
        let mut p = Projectile::new(Vec2::new(400.0, 500.0), 0.0, 600.0, ActorId(0));
        // Box top is at 511, the projectile flies 11px above it.
        for _ in 0..30 {
            let outcome = advance_projectile(&mut p, DT, &band(), &grid, &targets, radii());
            assert_eq!(outcome, ProjectileOutcome::Flying);
        }
    }

    #[test]
    fn sweep_removes_only_deleted() {
        let mut list: Vec<Projectile> = (0..5)
            .map(|i| Projectile::new(Vec2::new(i as f32, 0.0), 0.0, 1.0, ActorId(0)))
            .collect();
        list[1].deleted = true;
        list[4].deleted = true;
        assert_eq!(sweep_deleted(&mut list), 2);
        assert_eq!(list.len(), 3);
        assert!(list.iter().all(|p| !p.deleted));
    }

    #[test]
    fn damage_kills_on_last_life() {
        let mut health = Health::new(3, 0.2);
        assert_eq!(health.take_hit(), DamageOutcome::Hurt);
        assert!(health.feedback_active);
        for _ in 0..13 {
            health.tick(DT);
        }
        assert!(!health.feedback_active);
        assert_eq!(health.take_hit(), DamageOutcome::Hurt);
        assert_eq!(health.take_hit(), DamageOutcome::Killed);
        assert!(health.dead);
        assert_eq!(health.take_hit(), DamageOutcome::Ignored);
        assert_eq!(health.life, 0);
    }
}
