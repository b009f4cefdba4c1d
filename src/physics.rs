use std::collections::HashMap;

use bevy::prelude::Vec2;

use crate::components::{Input, Physics, Sprite, Transform};
use crate::config::SimConfig;
use crate::ecs::{ComponentKind, Entity, World};
use crate::physics_core::{self, Aabb, BodyShape, MotionParams};
use crate::tilemap::Atlas;

const DIAGONAL_SCALE: f32 = std::f32::consts::FRAC_1_SQRT_2;

/// Applies intent to every entity holding Input, Transform and Physics.
/// Keeps the per-entity "keep facing the aim point" timers between ticks.
#[derive(Default)]
pub struct MovementSystem {
    facing_hold: HashMap<Entity, f32>,
}

struct Body {
    entity: Entity,
    level: i32,
    aabb: Aabb,
}

impl MovementSystem {
    pub fn run(&mut self, world: &mut World, atlas: &Atlas, config: &SimConfig) {
        let movers = world.query(ComponentKind::Input);
        self.facing_hold.retain(|entity, _| world.has(*entity, ComponentKind::Input));

        let mut bodies = collect_bodies(world, config);

        for entity in movers {
            let (Some(input), Some(mut transform), Some(mut physics)) = (
                world.get::<Input>(entity),
                world.get::<Transform>(entity),
                world.get::<Physics>(entity),
            ) else {
                continue;
            };
            let sprite = world.get::<Sprite>(entity).unwrap_or_default();
            let shape = BodyShape::of_sprite(&sprite, config.collision_box_scale);

            let dir = movement_vector(&input);
            let speed = if input.running {
                physics.speed * config.run_multiplier
            } else {
                physics.speed
            };
            let step = dir * speed;

            let obstacles: Vec<Aabb> = bodies
                .iter()
                .filter(|b| b.entity != entity && b.level == transform.level)
                .map(|b| b.aabb)
                .collect();
            let out = physics_core::resolve_motion(
                atlas.get(transform.level),
                &obstacles,
                MotionParams {
                    tile_size: config.tile_size,
                    x: transform.x,
                    y: transform.y,
                    dx: step.x,
                    dy: step.y,
                    shape,
                },
            );

            physics.vel_x = out.x - transform.x;
            physics.vel_y = out.y - transform.y;
            transform.x = out.x;
            transform.y = out.y;
            transform.rotation = self.facing(entity, &input, &transform, &sprite, dir, config);

            if let Some(body) = bodies.iter_mut().find(|b| b.entity == entity) {
                body.aabb = shape.at(transform.x, transform.y);
            }
            world.set(entity, transform);
            world.set(entity, physics);
        }
    }

    fn facing(
        &mut self,
        entity: Entity,
        input: &Input,
        transform: &Transform,
        sprite: &Sprite,
        dir: Vec2,
        config: &SimConfig,
    ) -> f32 {
        let to_aim = input.aim() - sprite.center_of(transform);
        let aim_angle = to_aim.y.atan2(to_aim.x);
        let hold = self.facing_hold.entry(entity).or_insert(0.0);
        if input.attack {
            *hold = config.facing_hold_secs;
            aim_angle
        } else if *hold > 0.0 {
            *hold -= config.dt();
            aim_angle
        } else if dir != Vec2::ZERO {
            dir.y.atan2(dir.x)
        } else {
            aim_angle
        }
    }
}

/// Unit-or-zero direction from the four flags; diagonals scale each axis by 1/sqrt(2).
pub fn movement_vector(input: &Input) -> Vec2 {
    let mut dx = 0.0;
    let mut dy = 0.0;
    if input.up {
        dy -= 1.0;
    }
    if input.down {
        dy += 1.0;
    }
    if input.left {
        dx -= 1.0;
    }
    if input.right {
        dx += 1.0;
    }
    if dx != 0.0 && dy != 0.0 {
        dx *= DIAGONAL_SCALE;
        dy *= DIAGONAL_SCALE;
    }
    Vec2::new(dx, dy)
}

/// Movement boxes of everything that can block a mover (projectiles excluded).
fn collect_bodies(world: &World, config: &SimConfig) -> Vec<Body> {
    world
        .query(ComponentKind::Physics)
        .into_iter()
        .filter(|e| !world.has(*e, ComponentKind::Projectile))
        .filter_map(|entity| {
            let transform = world.get::<Transform>(entity)?;
            let sprite = world.get::<Sprite>(entity).unwrap_or_default();
            let shape = BodyShape::of_sprite(&sprite, config.collision_box_scale);
            Some(Body {
                entity,
                level: transform.level,
                aabb: shape.at(transform.x, transform.y),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Projectile;
    use crate::tilemap::{TileType, Tilemap};
    use proptest::prelude::*;

    fn open_atlas() -> Atlas {
        Atlas::single(Tilemap::filled(0, 10, 10, TileType::Grass))
    }

    fn spawn_mover(world: &mut World, x: f32, y: f32, input: Input) -> Entity {
        let e = world.create();
        world.set(e, Transform::at(x, y, 0));
        world.set(e, Physics::with_speed(4.0));
        world.set(e, Sprite::default());
        world.set(e, input);
        e
    }

    proptest! {
        #[test]
        fn diagonal_displacement_is_normalized(
            vertical in prop::bool::ANY,
            horizontal in prop::bool::ANY,
            running in prop::bool::ANY,
        ) {
            let config = SimConfig::default();
            let mut world = World::new();
            let input = Input {
                up: vertical,
                down: !vertical,
                left: horizontal,
                right: !horizontal,
                running,
                ..Default::default()
            };
            let e = spawn_mover(&mut world, 128.0, 128.0, input);
            let mut system = MovementSystem::default();
            system.run(&mut world, &open_atlas(), &config);

            let t = world.get::<Transform>(e).expect("transform");
            let single = if running { 8.0 } else { 4.0 };
            let expected = single * DIAGONAL_SCALE;
            prop_assert!(((t.x - 128.0).abs() - expected).abs() < 1e-4);
            prop_assert!(((t.y - 128.0).abs() - expected).abs() < 1e-4);
        }
    }

    #[test]
    fn opposing_flags_cancel() {
        let input = Input {
            up: true,
            down: true,
            left: true,
            ..Default::default()
        };
        assert_eq!(movement_vector(&input), Vec2::new(-1.0, 0.0));
    }

    #[test]
    fn moving_into_solid_tile_does_not_move() {
        let mut map = Tilemap::filled(0, 10, 10, TileType::Grass);
        map.set_tile(3, 2, TileType::WaterDeep);
        let atlas = Atlas::single(map);
        let mut world = World::new();
        let input = Input {
            right: true,
            ..Default::default()
        };
        // Box spans x=68..92; the deep water starts at x=96.
        let e = spawn_mover(&mut world, 64.0, 64.0, input);
        let mut system = MovementSystem::default();
        system.run(&mut world, &atlas, &SimConfig::default());
        system.run(&mut world, &atlas, &SimConfig::default());

        let t = world.get::<Transform>(e).expect("transform");
        assert!((t.x - 68.0).abs() < 0.01, "first step fits, second is blocked");
        system.run(&mut world, &atlas, &SimConfig::default());
        let t2 = world.get::<Transform>(e).expect("transform");
        assert_eq!(t, t2);
    }

    #[test]
    fn corner_lets_entity_slide_along_open_axis() {
        let mut map = Tilemap::filled(0, 10, 10, TileType::Grass);
        // Vertical wall at x=4, horizontal wall at y=4.
        for i in 0..5 {
            map.set_tile(4, i, TileType::Lava);
            map.set_tile(i, 4, TileType::Lava);
        }
        let atlas = Atlas::single(map);
        let mut world = World::new();
        let input = Input {
            right: true,
            down: true,
            ..Default::default()
        };
        // Touching the vertical wall, with room below.
        let e = spawn_mover(&mut world, 100.0, 40.0, input);
        let mut system = MovementSystem::default();
        system.run(&mut world, &atlas, &SimConfig::default());

        let t = world.get::<Transform>(e).expect("transform");
        assert!((t.x - 100.0).abs() < 0.01);
        assert!(t.y > 40.0);
    }

    #[test]
    fn entities_block_each_other_but_not_projectiles() {
        let mut world = World::new();
        let input = Input {
            right: true,
            ..Default::default()
        };
        let mover = spawn_mover(&mut world, 64.0, 64.0, input);
        let wall = world.create();
        world.set(wall, Transform::at(90.0, 64.0, 0));
        world.set(wall, Physics::default());
        world.set(wall, Sprite::default());

        let mut system = MovementSystem::default();
        system.run(&mut world, &open_atlas(), &SimConfig::default());
        assert_eq!(world.get::<Transform>(mover).map(|t| t.x), Some(64.0));

        world.set(wall, Projectile {
            owner: mover,
            damage: 1,
            lifetime: 5,
        });
        system.run(&mut world, &open_atlas(), &SimConfig::default());
        assert_eq!(world.get::<Transform>(mover).map(|t| t.x), Some(68.0));
    }

    #[test]
    fn overlapping_bodies_can_separate_but_not_push_deeper() {
        let mut world = World::new();
        let input = Input {
            right: true,
            ..Default::default()
        };
        let mover = spawn_mover(&mut world, 64.0, 64.0, input);
        let other = world.create();
        world.set(other, Transform::at(74.0, 64.0, 0));
        world.set(other, Physics::default());
        world.set(other, Sprite::default());

        let mut system = MovementSystem::default();
        system.run(&mut world, &open_atlas(), &SimConfig::default());
        assert_eq!(world.get::<Transform>(mover).map(|t| t.x), Some(64.0));

        world.set(
            mover,
            Input {
                left: true,
                ..Default::default()
            },
        );
        system.run(&mut world, &open_atlas(), &SimConfig::default());
        assert_eq!(world.get::<Transform>(mover).map(|t| t.x), Some(60.0));
    }

    #[test]
    fn other_levels_do_not_block() {
        let mut atlas = open_atlas();
        atlas.insert(Tilemap::filled(1, 10, 10, TileType::Grass));
        let mut world = World::new();
        let input = Input {
            right: true,
            ..Default::default()
        };
        let mover = spawn_mover(&mut world, 64.0, 64.0, input);
        let other = world.create();
        world.set(other, Transform::at(90.0, 64.0, 1));
        world.set(other, Physics::default());

        let mut system = MovementSystem::default();
        system.run(&mut world, &atlas, &SimConfig::default());
        assert_eq!(world.get::<Transform>(mover).map(|t| t.x), Some(68.0));
    }

    #[test]
    fn facing_prefers_attack_then_hold_then_travel() {
        let config = SimConfig::default();
        let mut world = World::new();
        let mut input = Input {
            right: true,
            attack: true,
            aim_x: 80.0,
            aim_y: 200.0,
            ..Default::default()
        };
        let e = spawn_mover(&mut world, 64.0, 64.0, input.clone());
        let mut system = MovementSystem::default();
        let atlas = open_atlas();

        system.run(&mut world, &atlas, &config);
        let attacking = world.get::<Transform>(e).expect("transform").rotation;
        assert!(attacking > 1.0, "faces the aim point below");

        input.attack = false;
        world.set(e, input.clone());
        system.run(&mut world, &atlas, &config);
        let held = world.get::<Transform>(e).expect("transform").rotation;
        assert!(held > 1.0, "keeps facing the aim while the hold decays");

        for _ in 0..10 {
            system.run(&mut world, &atlas, &config);
        }
        let travel = world.get::<Transform>(e).expect("transform").rotation;
        assert!(travel.abs() < 1e-4, "faces direction of travel afterwards");
    }

    #[test]
    fn missing_components_are_skipped() {
        let mut world = World::new();
        let e = world.create();
        world.set(e, Input {
            right: true,
            ..Default::default()
        });
        world.set(e, Transform::at(10.0, 10.0, 0));
        let mut system = MovementSystem::default();
        system.run(&mut world, &open_atlas(), &SimConfig::default());
        assert_eq!(world.get::<Transform>(e).map(|t| t.x), Some(10.0));
    }
}
