use std::collections::VecDeque;

use bevy::prelude::*;
use serde::Serialize;

use crate::components::{ActorId, EffectKind, TileType};

const MAX_EVENTS: usize = 500;

/// Requests and notifications the simulation hands to presentation.
#[derive(Clone, Debug, PartialEq)]
pub enum SimEvent {
    CameraShake {
        duration: f32,
        strength: f32,
    },
    Effect {
        kind: EffectKind,
        position: Vec2,
        rotation: f32,
        scale: Vec2,
    },
    TileDestroyed {
        cell: IVec2,
        tile: TileType,
    },
    ActorDamaged {
        actor: ActorId,
        life: i32,
    },
    ActorDied {
        actor: ActorId,
    },
}

impl SimEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SimEvent::CameraShake { .. } => "camera_shake",
            SimEvent::Effect { .. } => "effect",
            SimEvent::TileDestroyed { .. } => "tile_destroyed",
            SimEvent::ActorDamaged { .. } => "actor_damaged",
            SimEvent::ActorDied { .. } => "actor_died",
        }
    }

    pub fn data(&self) -> serde_json::Value {
        match self {
            SimEvent::CameraShake { duration, strength } => {
                serde_json::json!({ "duration": duration, "strength": strength })
            }
            SimEvent::Effect {
                kind,
                position,
                rotation,
                scale,
            } => serde_json::json!({
                "kind": kind.name(),
                "x": position.x,
                "y": position.y,
                "rotation": rotation,
                "scale": [scale.x, scale.y],
            }),
            SimEvent::TileDestroyed { cell, tile } => {
                serde_json::json!({ "x": cell.x, "y": cell.y, "tile": tile.name() })
            }
            SimEvent::ActorDamaged { actor, life } => {
                serde_json::json!({ "actor": actor.0, "life": life })
            }
            SimEvent::ActorDied { actor } => serde_json::json!({ "actor": actor.0 }),
        }
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct EventRecord {
    pub name: &'static str,
    pub data: serde_json::Value,
    pub frame: u64,
}

impl From<(&SimEvent, u64)> for EventRecord {
    fn from((event, frame): (&SimEvent, u64)) -> Self {
        Self {
            name: event.name(),
            data: event.data(),
            frame,
        }
    }
}

/// Bounded per-world queue, drained once per tick by presentation.
#[derive(Default, Debug)]
pub struct EventQueue {
    pending: VecDeque<(u64, SimEvent)>,
    pub frame: u64,
    pub dropped_events: u64,
    last_overflow_log_frame: u64,
}

impl EventQueue {
    pub fn emit(&mut self, event: SimEvent) {
        self.pending.push_back((self.frame, event));
        if self.pending.len() > MAX_EVENTS {
            let excess = self.pending.len() - MAX_EVENTS;
            for _ in 0..excess {
                self.pending.pop_front();
            }
            self.dropped_events = self.dropped_events.saturating_add(excess as u64);
            if self.frame.saturating_sub(self.last_overflow_log_frame) >= 60 {
                self.last_overflow_log_frame = self.frame;
                warn!(
                    "[Recoil events] Dropped {} undrained events (total dropped: {})",
                    excess, self.dropped_events
                );
            }
        }
    }

    pub fn effect(&mut self, kind: EffectKind, position: Vec2, rotation: f32, scale: Vec2) {
        self.emit(SimEvent::Effect {
            kind,
            position,
            rotation,
            scale,
        });
    }

    pub fn shake(&mut self, duration: f32, strength: f32) {
        self.emit(SimEvent::CameraShake { duration, strength });
    }

    pub fn advance_frame(&mut self) {
        self.frame = self.frame.saturating_add(1);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SimEvent> + '_ {
        self.pending.iter().map(|(_, e)| e)
    }

    pub fn drain(&mut self) -> Vec<SimEvent> {
        self.pending.drain(..).map(|(_, e)| e).collect()
    }

    /// Drains into serializable records stamped with their frame.
    pub fn drain_records(&mut self) -> Vec<EventRecord> {
        self.pending
            .drain(..)
            .map(|(frame, e)| EventRecord::from((&e, frame)))
            .collect()
    }
}
