use bevy::prelude::*;

use crate::components::{ActorId, Facing};
use crate::config::AiProfile;
use crate::physics_core::KinematicBody;
use crate::tilemap::Grid;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum AiState {
    Patrol,
    Chase,
    Attack,
    Dead,
}

impl AiState {
    pub fn name(self) -> &'static str {
        match self {
            AiState::Patrol => "patrol",
            AiState::Chase => "chase",
            AiState::Attack => "attack",
            AiState::Dead => "dead",
        }
    }
}

/// What an agent knows about its target, taken from the previous tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TargetView {
    pub id: ActorId,
    pub pos: Vec2,
    /// Point the agent aims at.
    pub aim_point: Vec2,
    pub dead: bool,
}

#[derive(Clone, Debug)]
pub struct AiAgent {
    pub state: AiState,
    pub has_seen: bool,
    pub anchor: Vec2,
    pub going_right: bool,
    pub target: Option<ActorId>,
    pub tuning: AiProfile,
    pub chase_speed: f32,
}

impl AiAgent {
    pub fn new(anchor: Vec2, going_right: bool, tuning: AiProfile, chase_speed: f32) -> Self {
        Self {
            state: AiState::Patrol,
            has_seen: false,
            anchor,
            going_right,
            target: None,
            tuning,
            chase_speed,
        }
    }

    /// Remembers the target's side after being shot.
    pub fn notice(&mut self) {
        if self.state != AiState::Dead {
            self.has_seen = true;
        }
    }

    pub fn reset_patrol(&mut self, anchor: Vec2) {
        self.anchor = anchor;
        self.has_seen = false;
        if self.state != AiState::Dead {
            self.state = AiState::Patrol;
        }
    }

    /// Picks this tick's state.
    pub fn decide(
        &mut self,
        dead: bool,
        body: &KinematicBody,
        target: Option<&TargetView>,
        grid: &Grid,
    ) -> AiState {
        if dead || self.state == AiState::Dead {
            self.state = AiState::Dead;
            return self.state;
        }

        let away = (body.pos.x - self.anchor.x).abs();
        let alive_target = target.filter(|t| !t.dead);

        let sees = alive_target.is_some_and(|t| {
            let view = self.tuning.view_distance;
            let facing_target = Facing::from_sign(t.pos.x - body.pos.x) == body.facing;
            body.pos.distance_squared(t.pos) <= view * view
                && facing_target
                && has_line_of_sight(grid, body.pos, t.pos)
        });

        self.state = if sees {
            self.has_seen = true;
            AiState::Attack
        } else if self.has_seen && away <= self.tuning.patrol_distance && alive_target.is_some() {
            AiState::Chase
        } else if away > self.tuning.patrol_distance {
            self.has_seen = false;
            AiState::Patrol
        } else {
            AiState::Patrol
        };
        self.state
    }

    /// Runs the movement part of the current state and updates facing.
    pub fn act(&mut self, dt: f32, body: &mut KinematicBody, target: Option<&TargetView>, grid: &Grid) {
        match self.state {
            AiState::Patrol => self.patrol(dt, body, grid),
            AiState::Chase => self.chase(dt, body, target, grid),
            AiState::Attack | AiState::Dead => body.stop_move_x(dt),
        }

        match (self.state, target) {
            (AiState::Patrol | AiState::Chase, _) => body.set_facing(body.intent.x),
            (AiState::Attack, Some(t)) => body.set_facing(t.pos.x - body.pos.x),
            _ => {}
        }
    }

    /// Cell under the leading foot, probed for a ledge.
    pub fn ledge_probe(&self, body: &KinematicBody) -> Vec2 {
        let dir = if self.going_right { 1.0 } else { -1.0 };
        let size = body.shape.size;
        body.pos
            + Vec2::new(
                dir * (size.x * 0.5 + self.tuning.probe_ahead),
                size.y * 0.5 + self.tuning.probe_below,
            )
    }

    fn patrol(&mut self, dt: f32, body: &mut KinematicBody, grid: &Grid) {
        if !body.grounded {
            return;
        }

        let probe = self.ledge_probe(body);
        let floor_ahead = grid.is_solid_at(probe);
        let wall_ahead = grid.is_solid_at(Vec2::new(probe.x, body.pos.y));
        if !floor_ahead || wall_ahead {
            self.going_right = !self.going_right;
            return;
        }

        let reach = self.tuning.patrol_distance;
        let offset = body.pos.x - self.anchor.x;
        if (self.going_right && offset >= reach) || (!self.going_right && -offset >= reach) {
            self.going_right = !self.going_right;
            body.intent.x = 0.0;
            return;
        }

        body.move_x(dt, self.going_right, self.tuning.patrol_speed);
    }

    fn chase(&mut self, dt: f32, body: &mut KinematicBody, target: Option<&TargetView>, grid: &Grid) {
        if !body.grounded {
            return;
        }
        let Some(t) = target else {
            return;
        };
        if !has_line_of_sight(grid, body.pos, t.pos) {
            self.has_seen = false;
            return;
        }
        body.move_x(dt, t.pos.x > body.pos.x, self.chase_speed);
    }
}

/// Bresenham walk between the cells of `from` and `to`. Only cells strictly
/// between the two endpoints can block.
pub fn has_line_of_sight(grid: &Grid, from: Vec2, to: Vec2) -> bool {
    let start = grid.cell_of(from);
    let end = grid.cell_of(to);

    let dx = (end.x - start.x).abs();
    let dy = -(end.y - start.y).abs();
    let sx = if start.x < end.x { 1 } else { -1 };
    let sy = if start.y < end.y { 1 } else { -1 };
    let mut err = dx + dy;
    let mut cell = start;

    while cell != end {
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            cell.x += sx;
        }
        if e2 <= dx {
            err += dx;
            cell.y += sy;
        }
        if cell != end && grid.is_solid(cell.x, cell.y) {
            return false;
        }
    }
    true
}
