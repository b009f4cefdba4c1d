use bevy::prelude::Vec2;

use crate::tilemap::Tilemap;

/// How sight rays are cast: step length and the half-width of the shrunken
/// box whose corners seed the four outer rays.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SightParams {
    pub tile_size: f32,
    pub step: f32,
    pub spread: f32,
}

/// Walks from `from` to `to` in `step`-sized increments (both ends included)
/// and fails on the first cell that blocks sight.
pub fn ray_is_clear(map: &Tilemap, from: Vec2, to: Vec2, tile_size: f32, step: f32) -> bool {
    let dist = from.distance(to);
    let steps = ((dist / step.max(0.5)) as usize).max(1);
    for i in 0..=steps {
        let p = from.lerp(to, i as f32 / steps as f32);
        let tx = (p.x / tile_size).floor() as i32;
        let ty = (p.y / tile_size).floor() as i32;
        if map.blocks_sight(tx, ty) {
            return false;
        }
    }
    true
}

/// Five parallel rays: center plus the corners of a shrunken box. Sight is
/// clear only when every ray is.
pub fn has_line_of_sight(map: &Tilemap, from: Vec2, to: Vec2, params: &SightParams) -> bool {
    let s = params.spread;
    let offsets = [
        Vec2::ZERO,
        Vec2::new(-s, -s),
        Vec2::new(s, -s),
        Vec2::new(-s, s),
        Vec2::new(s, s),
    ];
    offsets.iter().all(|offset| {
        ray_is_clear(
            map,
            from + *offset,
            to + *offset,
            params.tile_size,
            params.step,
        )
    })
}
