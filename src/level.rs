use bevy::prelude::*;

use crate::components::TileType;
use crate::config::SimConfig;
use crate::tilemap::Grid;
use crate::world::SimWorld;

/// Screen-widths of level left of the far wall.
const LEVEL_SCREENS: i32 = 3;
/// Screen-widths covered by the floor and ceiling strips.
const STRIP_SCREENS: i32 = 4;

/// Horizontal tile runs: tile, first column, last column, row.
const ROWS: &[(TileType, i32, i32, i32)] = &[
    (TileType::Ground, 3, 6, 11),
    (TileType::Ground, 9, 11, 9),
    (TileType::Ground, 11, 17, 12),
    (TileType::Ground, 17, 20, 6),
    (TileType::Box, 20, 20, 5),
    (TileType::Box, 20, 31, 14),
    (TileType::Box, 20, 31, 15),
    (TileType::Box, 30, 32, 3),
    (TileType::Ground, 34, 36, 11),
    (TileType::Box, 38, 40, 9),
    (TileType::Ground, 34, 36, 6),
    (TileType::Ground, 39, 44, 4),
    (TileType::Ground, 57, 62, 5),
    (TileType::Ground, 57, 59, 9),
    (TileType::Ground, 57, 59, 13),
    (TileType::Box, 47, 51, 8),
    (TileType::Ground, 43, 45, 10),
    (TileType::Box, 60, 60, 4),
    (TileType::Box, 61, 70, 2),
    (TileType::Ground, 70, 74, 3),
    (TileType::Box, 75, 75, 3),
    (TileType::Box, 75, 80, 4),
    (TileType::Ground, 61, 62, 14),
    (TileType::Ground, 61, 62, 11),
    (TileType::Ground, 61, 62, 8),
    (TileType::Box, 76, 76, 19),
    (TileType::Ground, 68, 70, 7),
    (TileType::Ground, 68, 70, 11),
    (TileType::Ground, 74, 76, 9),
    (TileType::Box, 73, 74, 13),
    (TileType::Box, 71, 71, 15),
    (TileType::Ground, 81, 84, 12),
    (TileType::Ground, 65, 66, 15),
    (TileType::Ground, 84, 86, 9),
    (TileType::Ground, 84, 87, 5),
    (TileType::Box, 79, 80, 7),
];

/// Vertical tile runs: tile, column, first row, last row.
const COLUMNS: &[(TileType, i32, i32, i32)] = &[
    (TileType::Box, 8, 14, 15),
    (TileType::Box, 11, 10, 11),
    (TileType::Box, 41, 14, 15),
    (TileType::EdgeRight, 60, 2, 3),
    (TileType::EdgeRight, 60, 6, 14),
];

const ENEMY_SPAWNS: &[(f32, f32)] = &[
    (325.0, 665.0),
    (920.0, 730.0),
    (920.0, 990.0),
    (1200.0, 350.0),
    (1545.0, 855.0),
    (2010.0, 155.0),
    (3160.0, 470.0),
    (2530.0, 535.0),
    (2270.0, 665.0),
    (2815.0, 985.0),
    (3470.0, 985.0),
    (3740.0, 795.0),
    (3705.0, 535.0),
    (3780.0, 275.0),
    (3905.0, 45.0),
    (4325.0, 85.0),
    (5020.0, 220.0),
    (3945.0, 285.0),
    (3995.0, 475.0),
    (3940.0, 670.0),
    (3985.0, 860.0),
    (4410.0, 415.0),
    (4220.0, 925.0),
    (4445.0, 665.0),
    (5280.0, 730.0),
    (5120.0, 415.0),
    (4725.0, 990.0),
    (5465.0, 540.0),
    (5495.0, 285.0),
    (5155.0, 900.0),
    (4940.0, 795.0),
    (4840.0, 395.0),
    (4675.0, 25.0),
];

pub const PLAYER_SPAWN: Vec2 = Vec2::new(200.0, 980.0);

pub struct Level {
    pub grid: Grid,
    pub player_spawn: Vec2,
    pub enemy_spawns: Vec<Vec2>,
}

/// Walls, floor and ceiling strips framing the playable area.
fn build_limits(grid: &mut Grid, config: &SimConfig) {
    let ts = config.tile_size;
    let cols = (config.view_size[0] / ts) as i32;
    let last_row = (config.view_size[1] / ts) as i32 - 1;
    let far_wall = cols * LEVEL_SCREENS - 1;

    for i in 0..cols * STRIP_SCREENS {
        let floor = if i == 0 {
            TileType::AngleLeft
        } else if i == far_wall {
            TileType::AngleRight
        } else if i == 65 || i == 66 {
            TileType::Dirt
        } else {
            TileType::Ground
        };
        grid.set_tile(floor, i, last_row + 1);
        grid.set_tile(TileType::Dirt, i, -1);
        grid.set_tile(TileType::Dirt, i, last_row + 2);
    }

    for row in (0..=last_row).rev() {
        grid.set_tile(TileType::EdgeLeft, 0, row);
        grid.set_tile(TileType::EdgeRight, far_wall, row);
    }
}

fn add_platforms(grid: &mut Grid) {
    for &(tile, x0, x1, y) in ROWS {
        for x in x0..=x1 {
            grid.set_tile(tile, x, y);
        }
    }
    for &(tile, x, y0, y1) in COLUMNS {
        for y in y0..=y1 {
            grid.set_tile(tile, x, y);
        }
    }
}

pub fn demo_level(config: &SimConfig) -> Level {
    let mut grid = Grid::new(config.tile_size);
    build_limits(&mut grid, config);
    add_platforms(&mut grid);
    Level {
        grid,
        player_spawn: PLAYER_SPAWN,
        enemy_spawns: ENEMY_SPAWNS
            .iter()
            .map(|&(x, y)| Vec2::new(x, y))
            .collect(),
    }
}

impl SimWorld {
    pub fn from_level(config: SimConfig, level: Level) -> Self {
        let mut world = SimWorld::new(config, level.grid, level.player_spawn);
        for spawn in level.enemy_spawns {
            world.add_enemy(spawn);
        }
        info!(
            "[Recoil] Level ready: {} tiles, {} enemies",
            world.grid.len(),
            world.actors().len() - 1
        );
        world
    }
}

pub fn demo_world(config: SimConfig) -> SimWorld {
    let level = demo_level(&config);
    SimWorld::from_level(config, level)
}
