use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use bevy::prelude::Vec2;

use crate::raycast::{self, SightParams};
use crate::tilemap::Tilemap;

type Tile = (i32, i32);

// Costs in thousandths of a tile so the open set can order on integers.
const CARDINAL_COST: u32 = 1000;
const DIAGONAL_COST: u32 = 1414;

const NEIGHBORS: [(i32, i32); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

pub fn tile_of(point: Vec2, tile_size: f32) -> Tile {
    (
        (point.x / tile_size).floor() as i32,
        (point.y / tile_size).floor() as i32,
    )
}

pub fn tile_center(tile: Tile, tile_size: f32) -> Vec2 {
    Vec2::new(
        (tile.0 as f32 + 0.5) * tile_size,
        (tile.1 as f32 + 0.5) * tile_size,
    )
}

/// Plans a route between two world points and smooths it. The returned
/// waypoints exclude the starting tile. `None` when start and goal share a
/// tile, the goal is off the map or blocked, or nothing connects them.
pub fn find_path(map: &Tilemap, from: Vec2, to: Vec2, sight: &SightParams) -> Option<Vec<Vec2>> {
    let ts = sight.tile_size;
    let tiles = find_tile_path(map, tile_of(from, ts), tile_of(to, ts))?;
    let points: Vec<Vec2> = tiles.into_iter().map(|t| tile_center(t, ts)).collect();
    if points.len() > 2 {
        Some(string_pull(map, &points, sight))
    } else {
        Some(points.into_iter().skip(1).collect())
    }
}

/// 8-directional A* over grid cells with a corner-cutting guard. Returns the
/// tile chain from start to goal inclusive.
pub fn find_tile_path(map: &Tilemap, start: Tile, goal: Tile) -> Option<Vec<Tile>> {
    if start == goal || !map.in_bounds(goal.0, goal.1) || map.is_blocked(goal.0, goal.1) {
        return None;
    }

    let mut open = BinaryHeap::<(Reverse<u32>, Tile)>::new();
    let mut g_score = HashMap::<Tile, u32>::new();
    let mut parent = HashMap::<Tile, Tile>::new();
    let mut closed = HashSet::<Tile>::new();

    g_score.insert(start, 0);
    open.push((Reverse(heuristic(start, goal)), start));

    while let Some((_, current)) = open.pop() {
        if current == goal {
            return Some(reconstruct(&parent, start, goal));
        }
        if !closed.insert(current) {
            continue;
        }
        let current_g = g_score.get(&current).copied().unwrap_or(u32::MAX);

        for (dx, dy) in NEIGHBORS {
            let next = (current.0 + dx, current.1 + dy);
            if map.is_blocked(next.0, next.1) || closed.contains(&next) {
                continue;
            }
            let diagonal = dx != 0 && dy != 0;
            if diagonal
                && (corner_blocked(map, current.0 + dx, current.1)
                    || corner_blocked(map, current.0, current.1 + dy))
            {
                continue;
            }
            let step = if diagonal { DIAGONAL_COST } else { CARDINAL_COST };
            let tentative = current_g.saturating_add(step);
            if g_score.get(&next).is_some_and(|seen| *seen <= tentative) {
                continue;
            }
            g_score.insert(next, tentative);
            parent.insert(next, current);
            open.push((Reverse(tentative.saturating_add(heuristic(next, goal))), next));
        }
    }

    None
}

/// A diagonal step is refused when either adjacent cardinal cell is an
/// in-bounds obstruction.
fn corner_blocked(map: &Tilemap, x: i32, y: i32) -> bool {
    map.in_bounds(x, y) && map.is_blocked(x, y)
}

/// Octile distance in the same integer units as the step costs, so it never
/// overestimates a real path.
fn heuristic(a: Tile, b: Tile) -> u32 {
    let dx = a.0.abs_diff(b.0);
    let dy = a.1.abs_diff(b.1);
    let diagonal = dx.min(dy);
    let straight = dx.max(dy) - diagonal;
    diagonal
        .saturating_mul(DIAGONAL_COST)
        .saturating_add(straight.saturating_mul(CARDINAL_COST))
}

fn reconstruct(parent: &HashMap<Tile, Tile>, start: Tile, goal: Tile) -> Vec<Tile> {
    let mut tiles = vec![goal];
    let mut cur = goal;
    while cur != start {
        match parent.get(&cur) {
            Some(prev) => {
                cur = *prev;
                tiles.push(cur);
            }
            None => break,
        }
    }
    tiles.reverse();
    tiles
}

/// Greedily jumps from each waypoint to the farthest later one still in
/// sight, dropping the ones in between. The first waypoint is not returned.
pub fn string_pull(map: &Tilemap, points: &[Vec2], sight: &SightParams) -> Vec<Vec2> {
    if points.len() < 2 {
        return Vec::new();
    }
    let mut smooth = Vec::with_capacity(points.len());
    let mut cur = 0;
    while cur < points.len() - 1 {
        let mut next = cur + 1;
        for i in (cur + 2..points.len()).rev() {
            if raycast::has_line_of_sight(map, points[cur], points[i], sight) {
                next = i;
                break;
            }
        }
        smooth.push(points[next]);
        cur = next;
    }
    smooth
}

pub fn path_length(start: Vec2, waypoints: &[Vec2]) -> f32 {
    let mut total = 0.0;
    let mut prev = start;
    for p in waypoints {
        total += prev.distance(*p);
        prev = *p;
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tilemap::TileType;

    fn sight() -> SightParams {
        SightParams {
            tile_size: 32.0,
            step: 8.0,
            spread: 12.0,
        }
    }

    fn test_tilemap(width: usize, height: usize, solids: &[(i32, i32)]) -> Tilemap {
        let mut map = Tilemap::filled(0, width, height, TileType::Grass);
        for (x, y) in solids {
            map.set_tile(*x, *y, TileType::Water);
        }
        map
    }

    /// Two horizontal walls forcing an S-shaped corridor.
    fn zigzag() -> Tilemap {
        let mut solids = Vec::new();
        for x in 0..9 {
            solids.push((x, 2));
        }
        for x in 1..10 {
            solids.push((x, 5));
        }
        test_tilemap(10, 8, &solids)
    }

    #[test]
    fn degenerate_requests_have_no_path() {
        let map = test_tilemap(4, 4, &[(3, 3)]);
        assert!(find_tile_path(&map, (1, 1), (1, 1)).is_none());
        assert!(find_tile_path(&map, (0, 0), (9, 0)).is_none());
        assert!(find_tile_path(&map, (0, 0), (3, 3)).is_none());
    }

    #[test]
    fn path_avoids_solid_cells() {
        let map = test_tilemap(6, 4, &[(2, 0), (2, 1), (2, 2)]);
        let tiles = find_tile_path(&map, (0, 1), (4, 1)).expect("path should exist");
        assert_eq!(tiles.first(), Some(&(0, 1)));
        assert_eq!(tiles.last(), Some(&(4, 1)));
        assert!(tiles.iter().all(|(x, y)| !map.is_blocked(*x, *y)));
        assert!(tiles.contains(&(2, 3)));
    }

    #[test]
    fn diagonal_steps_do_not_cut_corners() {
        let open = test_tilemap(4, 4, &[]);
        let tiles = find_tile_path(&open, (0, 0), (2, 2)).expect("open diagonal path");
        assert_eq!(tiles, vec![(0, 0), (1, 1), (2, 2)]);

        let walled = test_tilemap(4, 4, &[(1, 0), (0, 1)]);
        assert!(
            find_tile_path(&walled, (0, 0), (2, 2)).is_none(),
            "path should not squeeze diagonally between blocked cells"
        );
    }

    #[test]
    fn zigzag_corridor_path_is_walkable_and_smoothing_shortens_it() {
        let map = zigzag();
        let from = tile_center((0, 0), 32.0);
        let to = tile_center((0, 7), 32.0);
        assert!(!raycast::has_line_of_sight(&map, from, to, &sight()));

        let tiles = find_tile_path(&map, (0, 0), (0, 7)).expect("corridor path");
        let raw: Vec<Vec2> = tiles.iter().map(|t| tile_center(*t, 32.0)).collect();
        let smooth = find_path(&map, from, to, &sight()).expect("smoothed path");

        for p in &smooth {
            let (tx, ty) = tile_of(*p, 32.0);
            assert!(!map.is_blocked(tx, ty));
        }
        assert_eq!(smooth.last(), raw.last());
        assert!(smooth.len() < raw.len() - 1);
        assert!(path_length(from, &smooth) <= path_length(from, &raw[1..]) + 1e-3);
    }

    #[test]
    fn short_paths_skip_smoothing() {
        let map = test_tilemap(4, 4, &[]);
        let from = tile_center((0, 0), 32.0);
        let path = find_path(&map, from, tile_center((1, 0), 32.0), &sight()).expect("path");
        assert_eq!(path, vec![tile_center((1, 0), 32.0)]);
    }

    #[test]
    fn heuristic_matches_open_grid_step_costs() {
        assert_eq!(heuristic((0, 0), (5, 5)), 5 * DIAGONAL_COST);
        assert_eq!(heuristic((0, 0), (-7, 3)), 3 * DIAGONAL_COST + 4 * CARDINAL_COST);
        assert_eq!(heuristic((2, 2), (2, 2)), 0);
    }
}
