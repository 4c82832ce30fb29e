use bevy::prelude::*;

use crate::components::{forward, Facing};
use crate::config::SimConfig;
use crate::tilemap::Grid;

/// Edge shrink used when turning box edges into cell ranges, so an edge lying
/// exactly on a cell boundary does not claim the neighbouring cell.
pub const EPS: f32 = 0.001;

/// Axis-aligned rectangle in world space, y growing downward.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Aabb {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn from_center(center: Vec2, size: Vec2) -> Self {
        Self::new(
            center.x - size.x * 0.5,
            center.y - size.y * 0.5,
            size.x,
            size.y,
        )
    }

    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.left + self.width * 0.5, self.top + self.height * 0.5)
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.left && p.x < self.right() && p.y >= self.top && p.y < self.bottom()
    }

    /// Squared distance from `p` to the closest point of the rectangle (0 inside).
    pub fn distance_sq_to_point(&self, p: Vec2) -> f32 {
        let dx = (self.left - p.x).max(0.0).max(p.x - self.right());
        let dy = (self.top - p.y).max(0.0).max(p.y - self.bottom());
        dx * dx + dy * dy
    }
}

/// Collision box placement relative to a body's position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyShape {
    /// Top-left corner of the box minus the body position.
    pub offset: Vec2,
    pub size: Vec2,
}

impl BodyShape {
    pub fn at(&self, pos: Vec2) -> Aabb {
        Aabb::new(
            pos.x + self.offset.x,
            pos.y + self.offset.y,
            self.size.x,
            self.size.y,
        )
    }
}

/// Horizontal movement tuning of one body.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Movement {
    pub max_speed: f32,
    pub back_speed: f32,
    pub brake: f32,
}

/// World-wide physics constants, copied out of [`SimConfig`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhysicsParams {
    pub tile_size: f32,
    pub gravity: f32,
    pub max_fall_speed: f32,
    pub jump_velocity: f32,
    pub impulse_retention: f32,
    pub impulse_epsilon: f32,
    pub ground_probe: f32,
}

impl From<&SimConfig> for PhysicsParams {
    fn from(config: &SimConfig) -> Self {
        Self {
            tile_size: config.tile_size,
            gravity: config.gravity,
            max_fall_speed: config.max_fall_speed,
            jump_velocity: config.jump_velocity,
            impulse_retention: config.impulse_retention,
            impulse_epsilon: config.impulse_epsilon,
            ground_probe: config.ground_probe,
        }
    }
}

impl Default for PhysicsParams {
    fn default() -> Self {
        Self::from(&SimConfig::default())
    }
}

/// Which axes hit the grid during the last [`KinematicBody::step`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CollisionReport {
    pub vertical: bool,
    pub horizontal: bool,
}

#[derive(Clone, Debug)]
pub struct KinematicBody {
    pub pos: Vec2,
    /// Movement and gravity driven velocity.
    pub intent: Vec2,
    /// Knockback and recoil velocity, decaying every tick.
    pub impulse: Vec2,
    /// Combined velocity actually applied during the last step.
    pub speed: Vec2,
    pub shape: BodyShape,
    /// Box projected one tick ahead vertically.
    pub vbox: Aabb,
    /// Box projected one tick ahead horizontally.
    pub hbox: Aabb,
    pub grounded: bool,
    pub just_jumped: bool,
    pub facing: Facing,
    pub movement: Movement,
}

impl KinematicBody {
    pub fn new(pos: Vec2, shape: BodyShape, movement: Movement) -> Self {
        let rest = shape.at(pos);
        Self {
            pos,
            intent: Vec2::ZERO,
            impulse: Vec2::ZERO,
            speed: Vec2::ZERO,
            shape,
            vbox: rest,
            hbox: rest,
            grounded: false,
            just_jumped: false,
            facing: Facing::Right,
            movement,
        }
    }

    /// Unprojected box at the current position.
    pub fn hit_box(&self) -> Aabb {
        self.shape.at(self.pos)
    }

    pub fn reset_at(&mut self, pos: Vec2) {
        self.pos = pos;
        self.intent = Vec2::ZERO;
        self.impulse = Vec2::ZERO;
        self.speed = Vec2::ZERO;
        self.grounded = false;
        self.just_jumped = false;
        self.vbox = self.hit_box();
        self.hbox = self.vbox;
    }

    pub fn set_facing(&mut self, sign: f32) {
        self.facing = Facing::from_sign(sign);
    }

    /// Advances the body one tick against `grid`.
    pub fn step(&mut self, dt: f32, grid: &Grid, params: &PhysicsParams) -> CollisionReport {
        if !self.grounded {
            self.apply_gravity(dt, params);
        }
        self.decay_impulse(params);
        self.speed = self.intent + self.impulse;
        let report = self.resolve_collisions(dt, grid, params);
        self.pos += self.speed * dt;
        report
    }

    pub fn apply_gravity(&mut self, dt: f32, params: &PhysicsParams) {
        self.intent.y += params.gravity * 2.0 * dt;
        if self.intent.y >= params.max_fall_speed {
            self.intent.y = params.max_fall_speed;
        }
    }

    pub fn decay_impulse(&mut self, params: &PhysicsParams) {
        self.impulse *= params.impulse_retention;
        if self.impulse.x.abs() < params.impulse_epsilon {
            self.impulse.x = 0.0;
        }
        if self.impulse.y.abs() < params.impulse_epsilon {
            self.impulse.y = 0.0;
        }
    }

    fn project_boxes(&mut self, dt: f32) {
        let rest = self.hit_box();
        self.vbox = Aabb {
            top: rest.top + self.speed.y * dt,
            ..rest
        };
        self.hbox = Aabb {
            left: rest.left + self.speed.x * dt,
            ..rest
        };
    }

    fn resolve_collisions(&mut self, dt: f32, grid: &Grid, params: &PhysicsParams) -> CollisionReport {
        self.project_boxes(dt);
        let ts = params.tile_size;

        let report = CollisionReport {
            vertical: vertical_hit(grid, &self.vbox, self.speed.y, ts),
            horizontal: horizontal_hit(grid, &self.hbox, self.speed.x, ts),
        };

        self.grounded = false;
        let vy_before = self.speed.y;

        if report.vertical {
            self.grounded = self.speed.y > 0.0;
            self.intent.y = 0.0;
            self.speed.y = 0.0;
        }
        if report.horizontal {
            self.intent.x = 0.0;
            self.speed.x = 0.0;
        }

        self.project_boxes(dt);
        self.check_ground(vy_before, grid, params);
        self.just_jumped = false;
        report
    }

    fn check_ground(&mut self, vy_before: f32, grid: &Grid, params: &PhysicsParams) {
        if vy_before < 0.0 || self.just_jumped {
            return;
        }
        let ts = params.tile_size;
        let x0 = (self.hbox.left / ts).floor() as i32;
        let x1 = ((self.hbox.right() - EPS) / ts).floor() as i32;
        let gy = ((self.hbox.bottom() + params.ground_probe) / ts).floor() as i32;
        self.grounded = (x0..=x1).any(|cx| grid.is_solid(cx, gy));
    }

    /// Accelerates horizontal intent toward `max_speed` (or the back-pedal cap
    /// when moving away from the faced direction).
    pub fn move_x(&mut self, dt: f32, right: bool, max_speed: f32) {
        let dir = if right { 1.0 } else { -1.0 };
        let prev_sign = sign_or_zero(self.intent.x);
        let toward_facing = (self.facing == Facing::Right) == right;
        let cap = if toward_facing {
            max_speed
        } else {
            self.movement.back_speed
        };

        self.intent.x += dir * cap * 2.0 * dt;
        if prev_sign != 0.0 && prev_sign != dir {
            self.intent.x += dir * max_speed * self.movement.brake * dt;
        }
        if self.intent.x.abs() >= cap {
            self.intent.x = cap * sign_or_zero(self.intent.x);
        }
    }

    /// Brakes horizontal intent, landing on exactly zero.
    pub fn stop_move_x(&mut self, dt: f32) {
        let sign = sign_or_zero(self.intent.x);
        if sign == 0.0 {
            return;
        }
        self.intent.x -= sign * self.movement.max_speed * self.movement.brake * dt;
        if sign_or_zero(self.intent.x) != sign {
            self.intent.x = 0.0;
        }
    }

    /// Returns whether the jump happened.
    pub fn jump(&mut self, params: &PhysicsParams) -> bool {
        if !self.grounded {
            return false;
        }
        self.intent.y = -params.jump_velocity;
        self.grounded = false;
        self.just_jumped = true;
        true
    }

    /// Pushes the body along `dir`; the vertical part only applies while airborne.
    pub fn apply_impulse(&mut self, force: f32, dir: Vec2) {
        let push = dir.normalize_or_zero() * force;
        self.impulse.x += push.x;
        if !self.grounded {
            self.impulse.y += push.y;
        }
    }

    /// Kick opposite to a shot fired along `angle_deg`.
    pub fn apply_recoil(&mut self, force: f32, angle_deg: f32) {
        self.apply_impulse(force, -forward(angle_deg));
    }
}

fn sign_or_zero(v: f32) -> f32 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Tests the row just beyond the leading vertical edge of `vbox`.
fn vertical_hit(grid: &Grid, vbox: &Aabb, vy: f32, ts: f32) -> bool {
    let row = if vy > 0.0 {
        (vbox.bottom() / ts).floor() as i32
    } else if vy < 0.0 {
        ((vbox.top + EPS) / ts).floor() as i32
    } else {
        return false;
    };
    let x0 = (vbox.left / ts).floor() as i32;
    let x1 = ((vbox.right() - EPS) / ts).floor() as i32;
    (x0..=x1).any(|cx| grid.is_solid(cx, row))
}

/// Tests the column just beyond the leading horizontal edge of `hbox`.
fn horizontal_hit(grid: &Grid, hbox: &Aabb, vx: f32, ts: f32) -> bool {
    let column = if vx > 0.0 {
        (hbox.right() / ts).floor() as i32
    } else if vx < 0.0 {
        (hbox.left / ts).floor() as i32
    } else {
        return false;
    };
    let y0 = ((hbox.top + EPS) / ts).floor() as i32;
    let y1 = ((hbox.bottom() - EPS) / ts).floor() as i32;
    (y0..=y1).any(|cy| grid.is_solid(column, cy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::TileType;

    const DT: f32 = 1.0 / 60.0;

    fn square_body(left: f32, top: f32) -> KinematicBody {
        KinematicBody::new(
            Vec2::new(left, top),
            BodyShape {
                offset: Vec2::ZERO,
                size: Vec2::new(32.0, 32.0),
            },
            Movement {
                max_speed: 500.0,
                back_speed: 350.0,
                brake: 3.0,
            },
        )
    }

    fn grid_with(cells: &[(i32, i32)]) -> Grid {
        let mut grid = Grid::new(64.0);
        for &(x, y) in cells {
            grid.set_tile(TileType::Ground, x, y);
        }
        grid
    }

    fn floor_row(row: i32, from: i32, to: i32) -> Vec<(i32, i32)> {
        (from..=to).map(|x| (x, row)).collect()
    }

    #[test]
    fn wall_hit_keeps_vertical_velocity() {
        let grid = grid_with(&[(2, 0)]);
        let mut body = square_body(90.0, 0.0);
        body.intent = Vec2::new(600.0, 300.0);

        let report = body.step(DT, &grid, &PhysicsParams::default());

        assert!(report.horizontal);
        assert!(!report.vertical);
        assert_eq!(body.intent.x, 0.0);
        assert!(body.intent.y > 300.0);
        assert_eq!(body.pos.x, 90.0);
        assert!(body.pos.y > 0.0);
        assert!(!body.grounded);
    }

    #[test]
    fn floor_hit_keeps_horizontal_velocity() {
        let grid = grid_with(&floor_row(1, -2, 4));
        let mut body = square_body(0.0, 28.0);
        body.intent = Vec2::new(300.0, 600.0);

        let report = body.step(DT, &grid, &PhysicsParams::default());

        assert!(report.vertical);
        assert!(!report.horizontal);
        assert_eq!(body.intent.y, 0.0);
        assert_eq!(body.intent.x, 300.0);
        assert!((body.pos.x - 5.0).abs() < 1e-4);
        assert_eq!(body.pos.y, 28.0);
    }

    #[test]
    fn corner_stops_each_axis_independently() {
        let mut cells = floor_row(1, 0, 3);
        cells.push((2, 0));
        let grid = grid_with(&cells);
        let mut body = square_body(90.0, 28.0);
        body.intent = Vec2::new(600.0, 600.0);

        let report = body.step(DT, &grid, &PhysicsParams::default());

        assert_eq!(
            report,
            CollisionReport {
                vertical: true,
                horizontal: true
            }
        );
        assert_eq!(body.speed, Vec2::ZERO);
        assert_eq!(body.pos, Vec2::new(90.0, 28.0));
        assert!(body.grounded);
    }

    #[test]
    fn ceiling_hit_does_not_ground() {
        let grid = grid_with(&[(0, -1)]);
        let mut body = square_body(0.0, 2.0);
        body.intent = Vec2::new(0.0, -600.0);

        let report = body.step(DT, &grid, &PhysicsParams::default());

        assert!(report.vertical);
        assert!(!body.grounded);
        assert_eq!(body.intent.y, 0.0);
    }

    #[test]
    fn resting_body_stays_grounded() {
        let grid = grid_with(&floor_row(1, -2, 4));
        let mut body = square_body(10.0, 32.0);
        let params = PhysicsParams::default();

        for _ in 0..240 {
            body.step(DT, &grid, &params);
            assert!(body.grounded);
            assert_eq!(body.pos, Vec2::new(10.0, 32.0));
        }
    }

    #[test]
    fn jump_leaves_ground_until_landing() {
        let grid = grid_with(&floor_row(1, -2, 4));
        let mut body = square_body(10.0, 32.0);
        let params = PhysicsParams::default();
        body.step(DT, &grid, &params);
        assert!(body.grounded);

        assert!(body.jump(&params));
        assert!(!body.jump(&params));

        let mut airborne = 0;
        loop {
            body.step(DT, &grid, &params);
            if body.grounded {
                break;
            }
            airborne += 1;
            assert!(airborne < 200, "body never landed");
        }
        assert!((40..90).contains(&airborne), "airborne for {airborne} ticks");
        assert!((body.hit_box().bottom() - 64.0).abs() < 1.0);

        for _ in 0..60 {
            body.step(DT, &grid, &params);
            assert!(body.grounded);
        }
    }

    #[test]
    fn impulse_decays_to_exact_zero() {
        let mut body = square_body(0.0, 0.0);
        body.grounded = true;
        body.apply_impulse(3000.0, Vec2::new(-1.0, 0.0));
        assert_eq!(body.impulse, Vec2::new(-3000.0, 0.0));

        let params = PhysicsParams::default();
        let mut previous = body.impulse.x.abs();
        for _ in 0..120 {
            body.decay_impulse(&params);
            assert!(body.impulse.x.abs() <= previous);
            previous = body.impulse.x.abs();
        }
        assert_eq!(body.impulse.x, 0.0);
    }

    #[test]
    fn airborne_recoil_pushes_vertically_too() {
        let mut body = square_body(0.0, 0.0);
        body.apply_recoil(1500.0, 90.0);
        assert!(body.impulse.x.abs() < 1e-3);
        assert!((body.impulse.y + 1500.0).abs() < 1e-2);

        body.impulse = Vec2::ZERO;
        body.grounded = true;
        body.apply_recoil(1500.0, 90.0);
        assert_eq!(body.impulse.y, 0.0);
    }

    #[test]
    fn backpedal_uses_lower_cap() {
        let mut body = square_body(0.0, 0.0);
        body.facing = Facing::Right;
        for _ in 0..120 {
            body.move_x(DT, true, 500.0);
        }
        assert_eq!(body.intent.x, 500.0);

        for _ in 0..120 {
            body.move_x(DT, false, 500.0);
        }
        assert_eq!(body.intent.x, -350.0);
    }

    #[test]
    fn braking_reverses_faster_than_plain_acceleration() {
        let mut braked = square_body(0.0, 0.0);
        braked.intent.x = 200.0;
        braked.move_x(DT, false, 500.0);

        let mut plain = square_body(0.0, 0.0);
        plain.intent.x = 200.0;
        plain.movement.brake = 0.0;
        plain.move_x(DT, false, 500.0);

        assert!(braked.intent.x < plain.intent.x);
    }

    #[test]
    fn stop_lands_on_zero_without_overshoot() {
        let mut body = square_body(0.0, 0.0);
        body.intent.x = -480.0;
        let mut ticks = 0;
        while body.intent.x != 0.0 {
            body.stop_move_x(DT);
            assert!(body.intent.x <= 0.0);
            ticks += 1;
            assert!(ticks < 100);
        }
        body.stop_move_x(DT);
        assert_eq!(body.intent.x, 0.0);
    }

    #[test]
    fn point_distance_to_box() {
        let b = Aabb::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(b.distance_sq_to_point(Vec2::new(5.0, 5.0)), 0.0);
        assert_eq!(b.distance_sq_to_point(Vec2::new(13.0, 14.0)), 25.0);
        assert_eq!(b.distance_sq_to_point(Vec2::new(-2.0, 5.0)), 4.0);
    }
}
