use std::collections::HashMap;

use bevy::prelude::*;

use crate::components::TileType;
use crate::physics_core::{Aabb, EPS};

/// Packs a cell coordinate into the grid key: column in the high half, row in the low half.
pub fn pack_cell(x: i32, y: i32) -> u64 {
    ((x as u32 as u64) << 32) | (y as u32 as u64)
}

pub fn unpack_cell(key: u64) -> IVec2 {
    IVec2::new((key >> 32) as u32 as i32, (key & 0xFFFF_FFFF) as u32 as i32)
}

/// Sparse tile occupancy map. A cell is solid exactly when it holds a tile.
#[derive(Clone, Debug)]
pub struct Grid {
    pub tile_size: f32,
    tiles: HashMap<u64, TileType>,
}

impl Grid {
    pub fn new(tile_size: f32) -> Self {
        Self {
            tile_size,
            tiles: HashMap::new(),
        }
    }

    pub fn is_solid(&self, x: i32, y: i32) -> bool {
        self.tiles.contains_key(&pack_cell(x, y))
    }

    pub fn tile_at(&self, x: i32, y: i32) -> Option<TileType> {
        self.tiles.get(&pack_cell(x, y)).copied()
    }

    /// Places `tile` at `(x, y)`. An occupied cell keeps its tile and `false` is returned.
    pub fn set_tile(&mut self, tile: TileType, x: i32, y: i32) -> bool {
        let key = pack_cell(x, y);
        if self.tiles.contains_key(&key) {
            return false;
        }
        self.tiles.insert(key, tile);
        true
    }

    /// Removes and returns the tile at `(x, y)`, if any.
    pub fn clear_tile(&mut self, x: i32, y: i32) -> Option<TileType> {
        self.tiles.remove(&pack_cell(x, y))
    }

    pub fn cell_of(&self, world: Vec2) -> IVec2 {
        IVec2::new(
            (world.x / self.tile_size).floor() as i32,
            (world.y / self.tile_size).floor() as i32,
        )
    }

    pub fn is_solid_at(&self, world: Vec2) -> bool {
        let cell = self.cell_of(world);
        self.is_solid(cell.x, cell.y)
    }

    pub fn cell_center(&self, x: i32, y: i32) -> Vec2 {
        Vec2::new(
            x as f32 * self.tile_size + self.tile_size * 0.5,
            y as f32 * self.tile_size + self.tile_size * 0.5,
        )
    }

    /// Every cell overlapped by `rect`, row by row.
    pub fn cells_in_rect(&self, rect: &Aabb) -> Vec<IVec2> {
        let ts = self.tile_size;
        let x0 = (rect.left / ts).floor() as i32;
        let x1 = ((rect.right() - EPS) / ts).floor() as i32;
        let y0 = ((rect.top + EPS) / ts).floor() as i32;
        let y1 = (rect.bottom() / ts).floor() as i32;

        let mut cells = Vec::new();
        if x1 < x0 || y1 < y0 {
            return cells;
        }
        cells.reserve(((x1 - x0 + 1) * (y1 - y0 + 1)) as usize);
        for cy in y0..=y1 {
            for cx in x0..=x1 {
                cells.push(IVec2::new(cx, cy));
            }
        }
        cells
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (IVec2, TileType)> + '_ {
        self.tiles.iter().map(|(key, tile)| (unpack_cell(*key), *tile))
    }
}
