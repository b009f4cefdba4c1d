use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::MapError;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[repr(u8)]
pub enum TileType {
    Grass = 0,
    Water = 1,
    Tree = 2,
    WaterEdgeTop = 3,
    WaterEdgeBottom = 4,
    WaterEdgeLeft = 5,
    WaterEdgeRight = 6,
    WaterCornerTopLeft = 7,
    WaterCornerTopRight = 8,
    WaterCornerBottomLeft = 9,
    WaterCornerBottomRight = 10,
    WaterDeep = 11,
    WaterShallow = 12,
    GrassFlowers = 13,
    Sand = 14,
    DirtPath = 15,
    CobblePath = 16,
    Snow = 17,
    Ice = 18,
    Lava = 19,
    StoneFloor = 20,
    WoodFloor = 21,
}

impl TileType {
    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => TileType::Water,
            2 => TileType::Tree,
            3 => TileType::WaterEdgeTop,
            4 => TileType::WaterEdgeBottom,
            5 => TileType::WaterEdgeLeft,
            6 => TileType::WaterEdgeRight,
            7 => TileType::WaterCornerTopLeft,
            8 => TileType::WaterCornerTopRight,
            9 => TileType::WaterCornerBottomLeft,
            10 => TileType::WaterCornerBottomRight,
            11 => TileType::WaterDeep,
            12 => TileType::WaterShallow,
            13 => TileType::GrassFlowers,
            14 => TileType::Sand,
            15 => TileType::DirtPath,
            16 => TileType::CobblePath,
            17 => TileType::Snow,
            18 => TileType::Ice,
            19 => TileType::Lava,
            20 => TileType::StoneFloor,
            21 => TileType::WoodFloor,
            _ => TileType::Grass,
        }
    }

    pub fn is_solid(self) -> bool {
        matches!(
            self,
            TileType::Water | TileType::WaterDeep | TileType::Lava | TileType::Tree
        ) || self.is_water_edge()
    }

    /// Edge and corner kinds only block the half of the tile nearest the water.
    pub fn is_water_edge(self) -> bool {
        matches!(
            self,
            TileType::WaterEdgeTop
                | TileType::WaterEdgeBottom
                | TileType::WaterEdgeLeft
                | TileType::WaterEdgeRight
                | TileType::WaterCornerTopLeft
                | TileType::WaterCornerTopRight
                | TileType::WaterCornerBottomLeft
                | TileType::WaterCornerBottomRight
        )
    }
}

/// Spawn descriptor consumed once when the world is built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Spawner {
    pub x: f32,
    pub y: f32,
    pub character_id: String,
}

/// One vertical level: a tile grid plus a parallel object-id grid.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Tilemap {
    pub level: i32,
    pub width: usize,
    pub height: usize,
    pub tiles: Vec<u8>,
    pub objects: Vec<u32>,
    #[serde(default)]
    pub spawners: Vec<Spawner>,
    #[serde(default)]
    pub player_spawn: (f32, f32),
}

impl Tilemap {
    pub fn filled(level: i32, width: usize, height: usize, tile: TileType) -> Self {
        Self {
            level,
            width,
            height,
            tiles: vec![tile as u8; width * height],
            objects: vec![0; width * height],
            spawners: Vec::new(),
            player_spawn: (0.0, 0.0),
        }
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if self.in_bounds(x, y) {
            Some(y as usize * self.width + x as usize)
        } else {
            None
        }
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    /// Raw tile id; out-of-bounds cells read as grass.
    pub fn get_tile(&self, x: i32, y: i32) -> u8 {
        self.index(x, y)
            .and_then(|i| self.tiles.get(i).copied())
            .unwrap_or(0)
    }

    pub fn get(&self, x: i32, y: i32) -> TileType {
        TileType::from_u8(self.get_tile(x, y))
    }

    pub fn object(&self, x: i32, y: i32) -> u32 {
        self.index(x, y)
            .and_then(|i| self.objects.get(i).copied())
            .unwrap_or(0)
    }

    pub fn set_tile(&mut self, x: i32, y: i32, tile: TileType) {
        if let Some(i) = self.index(x, y) {
            self.tiles[i] = tile as u8;
        }
    }

    pub fn set_object(&mut self, x: i32, y: i32, object: u32) {
        if let Some(i) = self.index(x, y) {
            self.objects[i] = object;
        }
    }

    /// Cell is unusable for path planning: off the map, solid, or holding an object.
    pub fn is_blocked(&self, x: i32, y: i32) -> bool {
        !self.in_bounds(x, y) || self.get(x, y).is_solid() || self.object(x, y) > 0
    }

    /// In-bounds cell that interrupts a sight ray.
    pub fn blocks_sight(&self, x: i32, y: i32) -> bool {
        self.in_bounds(x, y) && (self.get(x, y).is_solid() || self.object(x, y) > 0)
    }

    /// Projectiles fly over water but stop at trees and objects.
    pub fn stops_projectile(&self, x: i32, y: i32) -> bool {
        self.in_bounds(x, y) && (self.get(x, y) == TileType::Tree || self.object(x, y) > 0)
    }

    pub fn from_definition(def: LevelDefinition) -> Result<Self, MapError> {
        let expected = def
            .width
            .checked_mul(def.height)
            .ok_or(MapError::Dimensions {
                width: def.width,
                height: def.height,
            })?;
        if def.layers.ground.len() != expected {
            return Err(MapError::LayerSize {
                layer: "ground",
                expected,
                actual: def.layers.ground.len(),
            });
        }
        let objects = if def.layers.objects.is_empty() {
            vec![0; expected]
        } else if def.layers.objects.len() != expected {
            return Err(MapError::LayerSize {
                layer: "objects",
                expected,
                actual: def.layers.objects.len(),
            });
        } else {
            def.layers.objects
        };
        Ok(Self {
            level: def.level,
            width: def.width,
            height: def.height,
            tiles: def.layers.ground,
            objects,
            spawners: def.spawners,
            player_spawn: def.player_spawn.unwrap_or((0.0, 0.0)),
        })
    }

    pub fn from_json(json: &str) -> Result<Self, MapError> {
        Self::from_definition(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, MapError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// A small grass arena with a pond, a tree line and two guards.
    pub fn test_level() -> Self {
        let (width, height) = (40usize, 30usize);
        let mut map = Tilemap::filled(0, width, height, TileType::Grass);

        // Pond (x=6..12, y=6..10) ringed by edge tiles
        for y in 6..10 {
            for x in 6..12 {
                map.set_tile(x, y, TileType::Water);
            }
        }
        for x in 6..12 {
            map.set_tile(x, 5, TileType::WaterEdgeBottom);
            map.set_tile(x, 10, TileType::WaterEdgeTop);
        }
        for y in 6..10 {
            map.set_tile(5, y, TileType::WaterEdgeRight);
            map.set_tile(12, y, TileType::WaterEdgeLeft);
        }
        map.set_tile(5, 5, TileType::WaterCornerBottomRight);
        map.set_tile(12, 5, TileType::WaterCornerBottomLeft);
        map.set_tile(5, 10, TileType::WaterCornerTopRight);
        map.set_tile(12, 10, TileType::WaterCornerTopLeft);

        // Tree line with a gap (x=20, y=4..24, gap at y=14..16)
        for y in 4..24 {
            if !(14..16).contains(&y) {
                map.set_tile(20, y, TileType::Tree);
            }
        }

        // Dirt road and a few rocks
        for x in 0..width as i32 {
            map.set_tile(x, 15, TileType::DirtPath);
        }
        map.set_object(26, 8, 1);
        map.set_object(30, 22, 1);

        map.spawners = vec![
            Spawner {
                x: 28.0 * 32.0,
                y: 10.0 * 32.0,
                character_id: "guard_melee".to_string(),
            },
            Spawner {
                x: 32.0 * 32.0,
                y: 20.0 * 32.0,
                character_id: "guard_ranged".to_string(),
            },
        ];
        map.player_spawn = (3.0 * 32.0, 15.0 * 32.0);
        map
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LevelLayers {
    pub ground: Vec<u8>,
    #[serde(default)]
    pub objects: Vec<u32>,
}

/// On-disk shape of a level as produced by the map collaborator.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LevelDefinition {
    #[serde(default)]
    pub level: i32,
    pub width: usize,
    pub height: usize,
    pub layers: LevelLayers,
    #[serde(default)]
    pub spawners: Vec<Spawner>,
    #[serde(default)]
    pub player_spawn: Option<(f32, f32)>,
}

/// Every loaded level, keyed by vertical level index.
#[derive(Clone, Debug, Default)]
pub struct Atlas {
    levels: HashMap<i32, Tilemap>,
}

impl Atlas {
    pub fn single(map: Tilemap) -> Self {
        let mut atlas = Self::default();
        atlas.insert(map);
        atlas
    }

    pub fn insert(&mut self, map: Tilemap) {
        self.levels.insert(map.level, map);
    }

    pub fn get(&self, level: i32) -> Option<&Tilemap> {
        self.levels.get(&level)
    }

    pub fn levels(&self) -> impl Iterator<Item = &Tilemap> {
        self.levels.values()
    }

    /// Where new players appear: the lowest level's player spawn.
    pub fn player_spawn(&self) -> (f32, f32, i32) {
        self.levels
            .values()
            .min_by_key(|m| m.level)
            .map(|m| (m.player_spawn.0, m.player_spawn.1, m.level))
            .unwrap_or((0.0, 0.0, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_ids_decode_as_grass() {
        assert_eq!(TileType::from_u8(200), TileType::Grass);
        assert_eq!(TileType::from_u8(19), TileType::Lava);
        assert!(TileType::Lava.is_solid());
        assert!(!TileType::WaterShallow.is_solid());
        assert!(TileType::WaterCornerTopLeft.is_solid());
    }

    #[test]
    fn blocking_queries_distinguish_sight_paths_and_projectiles() {
        let mut map = Tilemap::filled(0, 4, 4, TileType::Grass);
        map.set_tile(1, 1, TileType::Water);
        map.set_tile(2, 2, TileType::Tree);
        map.set_object(3, 0, 7);

        assert!(map.is_blocked(-1, 0));
        assert!(!map.blocks_sight(-1, 0));
        assert!(map.blocks_sight(1, 1));
        assert!(!map.stops_projectile(1, 1));
        assert!(map.stops_projectile(2, 2));
        assert!(map.stops_projectile(3, 0));
        assert!(map.is_blocked(3, 0));
    }

    #[test]
    fn level_definition_checks_layer_sizes() {
        let json = r#"{
            "level": 2,
            "width": 2,
            "height": 2,
            "layers": { "ground": [0, 1, 2, 0], "objects": [0, 0, 0, 5] },
            "spawners": [{ "x": 32.0, "y": 0.0, "character_id": "guard_melee" }]
        }"#;
        let map = Tilemap::from_json(json).expect("valid level");
        assert_eq!(map.level, 2);
        assert_eq!(map.get(1, 0), TileType::Water);
        assert_eq!(map.object(1, 1), 5);
        assert_eq!(map.spawners.len(), 1);

        let short = r#"{ "width": 2, "height": 2, "layers": { "ground": [0, 1] } }"#;
        assert!(matches!(
            Tilemap::from_json(short),
            Err(MapError::LayerSize { layer: "ground", .. })
        ));
    }

    #[test]
    fn oversized_dimensions_are_rejected() {
        let def = LevelDefinition {
            width: usize::MAX,
            height: 2,
            ..Default::default()
        };
        assert!(matches!(
            Tilemap::from_definition(def),
            Err(MapError::Dimensions { height: 2, .. })
        ));
    }
}
