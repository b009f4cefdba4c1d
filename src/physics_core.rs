use bevy::prelude::Vec2;

use crate::components::{Sprite, Transform};
use crate::tilemap::{TileType, Tilemap};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Aabb {
    pub fn from_center(x: f32, y: f32, width: f32, height: f32) -> Self {
        let hw = width / 2.0;
        let hh = height / 2.0;
        Self {
            min_x: x - hw,
            min_y: y - hh,
            max_x: x + hw,
            max_y: y + hh,
        }
    }

    pub fn from_corner(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x + width,
            max_y: y + height,
        }
    }

    /// Full sprite footprint, used for hit detection.
    pub fn of_sprite(transform: &Transform, sprite: &Sprite) -> Self {
        Self::from_corner(transform.x, transform.y, sprite.width, sprite.height)
    }

    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.max_x > other.min_x
            && self.min_x < other.max_x
            && self.max_y > other.min_y
            && self.min_y < other.max_y
    }

    /// Area shared with `other`, zero when apart.
    pub fn overlap_area(&self, other: &Aabb) -> f32 {
        let w = self.max_x.min(other.max_x) - self.min_x.max(other.min_x);
        let h = self.max_y.min(other.max_y) - self.min_y.max(other.min_y);
        w.max(0.0) * h.max(0.0)
    }

    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }
}

/// Square movement box centered inside a sprite, smaller than the sprite itself.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyShape {
    pub offset: Vec2,
    pub size: f32,
}

impl BodyShape {
    pub fn of_sprite(sprite: &Sprite, scale: f32) -> Self {
        let size = sprite.width.min(sprite.height) * scale.clamp(0.05, 1.0);
        Self {
            offset: Vec2::new((sprite.width - size) * 0.5, (sprite.height - size) * 0.5),
            size,
        }
    }

    pub fn at(&self, x: f32, y: f32) -> Aabb {
        Aabb::from_corner(x + self.offset.x, y + self.offset.y, self.size, self.size)
    }
}

#[derive(Clone, Copy)]
pub struct MotionParams {
    pub tile_size: f32,
    pub x: f32,
    pub y: f32,
    pub dx: f32,
    pub dy: f32,
    pub shape: BodyShape,
}

#[derive(Clone, Copy, Debug)]
pub struct MotionResult {
    pub x: f32,
    pub y: f32,
    pub blocked_x: bool,
    pub blocked_y: bool,
}

/// Moves along X, then along Y from the (possibly updated) X position.
/// A blocked axis is discarded whole, so the other axis can still slide.
pub fn resolve_motion(
    map: Option<&Tilemap>,
    obstacles: &[Aabb],
    params: MotionParams,
) -> MotionResult {
    let MotionParams {
        tile_size,
        x,
        y,
        dx,
        dy,
        shape,
    } = params;
    let mut out_x = x;
    let mut out_y = y;
    let mut blocked_x = false;
    let mut blocked_y = false;

    if dx != 0.0 {
        let from = shape.at(out_x, out_y);
        let to = shape.at(out_x + dx, out_y);
        if is_blocked(map, obstacles, &from, &to, tile_size) {
            blocked_x = true;
        } else {
            out_x += dx;
        }
    }

    if dy != 0.0 {
        let from = shape.at(out_x, out_y);
        let to = shape.at(out_x, out_y + dy);
        if is_blocked(map, obstacles, &from, &to, tile_size) {
            blocked_y = true;
        } else {
            out_y += dy;
        }
    }

    MotionResult {
        x: out_x,
        y: out_y,
        blocked_x,
        blocked_y,
    }
}

fn is_blocked(
    map: Option<&Tilemap>,
    obstacles: &[Aabb],
    from: &Aabb,
    to: &Aabb,
    tile_size: f32,
) -> bool {
    if collides_with_map(map, to, tile_size) {
        return true;
    }
    // A body stuck inside another may only move to shrink the overlap.
    obstacles
        .iter()
        .any(|other| {
            to.overlaps(other) && to.overlap_area(other) >= from.overlap_area(other)
        })
}

/// True when the box touches terrain that blocks movement. A missing level and
/// cells past the map edge both count as solid.
pub fn collides_with_map(map: Option<&Tilemap>, aabb: &Aabb, tile_size: f32) -> bool {
    let Some(map) = map else {
        return true;
    };
    let min_tx = (aabb.min_x / tile_size).floor() as i32;
    let max_tx = ((aabb.max_x - 0.01) / tile_size).floor() as i32;
    let min_ty = (aabb.min_y / tile_size).floor() as i32;
    let max_ty = ((aabb.max_y - 0.01) / tile_size).floor() as i32;

    for ty in min_ty..=max_ty {
        for tx in min_tx..=max_tx {
            if !map.in_bounds(tx, ty) {
                return true;
            }
            if tile_blocks(map.get(tx, ty), tx, ty, aabb, tile_size) {
                return true;
            }
            if map.object(tx, ty) > 0 && overlaps_centered_half(tx, ty, aabb, tile_size) {
                return true;
            }
        }
    }
    false
}

fn tile_blocks(tile: TileType, tx: i32, ty: i32, aabb: &Aabb, tile_size: f32) -> bool {
    if !tile.is_solid() {
        return false;
    }
    let half = tile_size / 2.0;
    let local_x = aabb.min_x - tx as f32 * tile_size;
    let local_y = aabb.min_y - ty as f32 * tile_size;
    let w = aabb.width();
    let h = aabb.height();
    match tile {
        TileType::WaterEdgeTop => local_y + h > half,
        TileType::WaterEdgeBottom => local_y < half,
        TileType::WaterEdgeLeft => local_x + w > half,
        TileType::WaterEdgeRight => local_x < half,
        TileType::WaterCornerTopLeft => local_x + w > half && local_y + h > half,
        TileType::WaterCornerTopRight => local_x < half && local_y + h > half,
        TileType::WaterCornerBottomLeft => local_x + w > half && local_y < half,
        TileType::WaterCornerBottomRight => local_x < half && local_y < half,
        TileType::Tree => overlaps_centered_half(tx, ty, aabb, tile_size),
        _ => true,
    }
}

fn overlaps_centered_half(tx: i32, ty: i32, aabb: &Aabb, tile_size: f32) -> bool {
    let inner = Aabb::from_center(
        (tx as f32 + 0.5) * tile_size,
        (ty as f32 + 0.5) * tile_size,
        tile_size / 2.0,
        tile_size / 2.0,
    );
    aabb.overlaps(&inner)
}
