use bevy::prelude::*;

/// Tile kinds a grid cell can hold. Every kind is solid; only `Box` is
/// destructible.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, serde::Serialize, serde::Deserialize)]
#[repr(u8)]
pub enum TileType {
    Ground = 0,
    EdgeLeft = 1,
    EdgeRight = 2,
    AngleLeft = 3,
    AngleRight = 4,
    Dirt = 5,
    Box = 6,
}

impl TileType {
    pub fn is_destructible(self) -> bool {
        self == TileType::Box
    }

    pub fn name(self) -> &'static str {
        match self {
            TileType::Ground => "ground",
            TileType::EdgeLeft => "edge_left",
            TileType::EdgeRight => "edge_right",
            TileType::AngleLeft => "angle_left",
            TileType::AngleRight => "angle_right",
            TileType::Dirt => "dirt",
            TileType::Box => "box",
        }
    }
}

/// Horizontal facing of a body (and of the sprite drawn for it).
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Facing {
    #[default]
    Right,
    Left,
}

impl Facing {
    /// `+0.0` counts as right, `-0.0` as left, matching a sprite scale flip.
    pub fn from_sign(sign: f32) -> Self {
        if sign.is_sign_negative() {
            Facing::Left
        } else {
            Facing::Right
        }
    }

    pub fn sign(self) -> f32 {
        match self {
            Facing::Right => 1.0,
            Facing::Left => -1.0,
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            Facing::Right => Facing::Left,
            Facing::Left => Facing::Right,
        }
    }
}

/// Stable index of an actor in the world arena.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, PartialOrd, Ord)]
pub struct ActorId(pub usize);

/// What the input collaborator wants the player to do this tick.
#[derive(Resource, Clone, Copy, Debug, Default)]
pub struct PlayerIntent {
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    pub fire: bool,
    /// Pointer position in world space.
    pub aim_at: Vec2,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum EffectKind {
    FireMuzzle,
    Explosion,
    BoxExplosion,
}

impl EffectKind {
    pub fn name(self) -> &'static str {
        match self {
            EffectKind::FireMuzzle => "fire_muzzle",
            EffectKind::Explosion => "explosion",
            EffectKind::BoxExplosion => "box_explosion",
        }
    }
}

/// Unit vector pointing along `angle_deg`.
pub fn forward(angle_deg: f32) -> Vec2 {
    let rad = angle_deg.to_radians();
    Vec2::new(rad.cos(), rad.sin()).normalize_or_zero()
}

/// Unit vector perpendicular to [`forward`].
pub fn up(angle_deg: f32) -> Vec2 {
    let rad = angle_deg.to_radians();
    Vec2::new(-rad.sin(), rad.cos()).normalize_or_zero()
}
