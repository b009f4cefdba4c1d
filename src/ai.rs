use bevy::prelude::Vec2;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::catalog::Rules;
use crate::combat;
use crate::components::{Ai, AiState, AttackKind, Direction, Input, Sprite, Transform};
use crate::ecs::{ComponentKind, Entity, World};
use crate::events::{GameEventBus, GameEventKind};
use crate::pathfinding;
use crate::raycast::{self, SightParams};
use crate::tilemap::Tilemap;

/// What the engine saw about the current target this tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TargetView {
    /// Gone, dead or on another level.
    Lost,
    Engaged {
        attackable: bool,
        line_of_sight: bool,
    },
}

/// Pre-rolled wander choice; only consumed when the wander timer runs out.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WanderRoll {
    pub idle: bool,
    pub duration: f32,
    pub direction: Direction,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Observation {
    pub leashed: bool,
    pub home_reached: bool,
    pub target: Option<TargetView>,
    pub state_timer: f32,
    pub dt: f32,
    pub settle_secs: f32,
    pub roll: WanderRoll,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathGoal {
    Target,
    Home,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AiEffect {
    ClearTarget,
    ClearPath,
    EmitLeashed,
    SetTimer(f32),
    SetDirection(Direction),
    /// Press the stored wander direction and aim along it.
    Walk,
    AimAtTarget,
    PressAttack,
    SteerToTarget,
    FollowPath(PathGoal),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub next: AiState,
    pub effects: Vec<AiEffect>,
}

impl Transition {
    fn to(next: AiState, effects: Vec<AiEffect>) -> Self {
        Self { next, effects }
    }
}

/// The behavior table. Leash first, then target handling, then the trip home,
/// then wandering.
pub fn transition(state: AiState, obs: &Observation) -> Transition {
    use AiEffect::*;

    if obs.leashed {
        if state == AiState::Return {
            return Transition::to(AiState::Return, vec![ClearTarget, FollowPath(PathGoal::Home)]);
        }
        return Transition::to(AiState::Return, vec![ClearTarget, ClearPath, EmitLeashed]);
    }

    match obs.target {
        Some(TargetView::Lost) => Transition::to(AiState::Wander, vec![ClearTarget, ClearPath]),
        Some(TargetView::Engaged {
            attackable: true, ..
        }) => Transition::to(AiState::Attack, vec![AimAtTarget, PressAttack]),
        Some(TargetView::Engaged {
            line_of_sight: true,
            ..
        }) => Transition::to(AiState::Chase, vec![AimAtTarget, ClearPath, SteerToTarget]),
        Some(TargetView::Engaged { .. }) => Transition::to(
            AiState::Chase,
            vec![AimAtTarget, FollowPath(PathGoal::Target)],
        ),
        None if state == AiState::Return => {
            if obs.home_reached {
                Transition::to(AiState::Wander, vec![ClearPath, SetTimer(obs.settle_secs)])
            } else {
                Transition::to(AiState::Return, vec![FollowPath(PathGoal::Home)])
            }
        }
        None => wander(state, obs),
    }
}

fn wander(state: AiState, obs: &Observation) -> Transition {
    use AiEffect::*;

    let remaining = obs.state_timer - obs.dt;
    if remaining <= 0.0 {
        let roll = obs.roll;
        return if roll.idle {
            Transition::to(AiState::Idle, vec![SetTimer(roll.duration)])
        } else {
            Transition::to(
                AiState::Move,
                vec![SetTimer(roll.duration), SetDirection(roll.direction), Walk],
            )
        };
    }
    match state {
        AiState::Move => Transition::to(AiState::Move, vec![SetTimer(remaining), Walk]),
        AiState::Idle => Transition::to(AiState::Idle, vec![SetTimer(remaining)]),
        _ => Transition::to(AiState::Wander, vec![SetTimer(remaining)]),
    }
}

/// Converts a direction into the four movement flags: the dominant axis is
/// always pressed, the other one only past half magnitude.
pub fn steer(input: &mut Input, delta: Vec2) {
    let d = delta.normalize_or_zero();
    if d == Vec2::ZERO {
        return;
    }
    if d.x.abs() > d.y.abs() {
        input.press(if d.x > 0.0 { Direction::Right } else { Direction::Left });
        if d.y > 0.5 {
            input.press(Direction::Down);
        } else if d.y < -0.5 {
            input.press(Direction::Up);
        }
    } else {
        input.press(if d.y > 0.0 { Direction::Down } else { Direction::Up });
        if d.x > 0.5 {
            input.press(Direction::Right);
        } else if d.x < -0.5 {
            input.press(Direction::Left);
        }
    }
}

struct Engagement {
    center: Vec2,
    view: TargetView,
}

/// Per-entity working set while effects are applied.
struct Agent<'a> {
    entity: Entity,
    ai: Ai,
    input: Input,
    center: Vec2,
    half: Vec2,
    map: &'a Tilemap,
    engagement: Option<Engagement>,
}

/// Drives every AI-bearing entity by writing its Input for the movement and
/// combat passes. Owns the wander RNG.
pub struct AiEngine {
    rng: SmallRng,
}

impl AiEngine {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: SmallRng::from_entropy(),
        }
    }

    pub fn run(&mut self, world: &mut World, events: &mut GameEventBus, rules: Rules<'_>) {
        let config = rules.config;
        let sight = sight_params(rules);
        for entity in world.query(ComponentKind::Ai) {
            let (Some(ai), Some(mut input), Some(transform)) = (
                world.get::<Ai>(entity),
                world.get::<Input>(entity),
                world.get::<Transform>(entity),
            ) else {
                continue;
            };
            let Some(map) = rules.atlas.get(transform.level) else {
                continue;
            };
            input.clear_intent();

            let sprite = world.get::<Sprite>(entity).unwrap_or_default();
            let center = sprite.center_of(&transform);
            let engagement = ai
                .target
                .map(|target| engage(world, rules, map, &sight, entity, &transform, center, target));

            let from_spawn = transform.position().distance_squared(ai.spawn());
            let obs = Observation {
                leashed: from_spawn > ai.leash_radius * ai.leash_radius,
                home_reached: from_spawn < config.home_tolerance * config.home_tolerance,
                target: engagement.as_ref().map(|e| e.view),
                state_timer: ai.state_timer,
                dt: config.dt(),
                settle_secs: config.settle_secs,
                roll: self.roll(rules),
            };
            let Transition { next, effects } = transition(ai.state, &obs);
            if next != ai.state {
                tracing::trace!(%entity, from = ?ai.state, to = ?next, "ai transition");
            }

            let mut agent = Agent {
                entity,
                ai,
                input,
                center,
                half: sprite.half_extents(),
                map,
                engagement,
            };
            for effect in effects {
                agent.apply(effect, events, rules, &sight);
            }
            agent.ai.state = next;
            world.set(entity, agent.ai);
            world.set(entity, agent.input);
        }
    }

    fn roll(&mut self, rules: Rules<'_>) -> WanderRoll {
        let config = rules.config;
        let span = (config.wander_max_secs - config.wander_min_secs).max(0.0);
        WanderRoll {
            idle: self.rng.gen_bool(0.5),
            duration: config.wander_min_secs + self.rng.gen::<f32>() * span,
            direction: Direction::ALL[self.rng.gen_range(0..Direction::ALL.len())],
        }
    }
}

fn sight_params(rules: Rules<'_>) -> SightParams {
    SightParams {
        tile_size: rules.config.tile_size,
        step: rules.config.los_ray_step,
        spread: rules.config.los_ray_spread,
    }
}

#[allow(clippy::too_many_arguments)]
fn engage(
    world: &World,
    rules: Rules<'_>,
    map: &Tilemap,
    sight: &SightParams,
    entity: Entity,
    transform: &Transform,
    center: Vec2,
    target: Entity,
) -> Engagement {
    let Some(target_transform) = world
        .get::<Transform>(target)
        .filter(|t| t.level == transform.level)
    else {
        return Engagement {
            center,
            view: TargetView::Lost,
        };
    };
    let target_center = world
        .get::<Sprite>(target)
        .unwrap_or_default()
        .center_of(&target_transform);
    let line_of_sight = raycast::has_line_of_sight(map, center, target_center, sight);
    let (range, needs_sight) = engagement_range(world, rules, entity);
    let attackable = center.distance(target_center) <= range && (line_of_sight || !needs_sight);
    Engagement {
        center: target_center,
        view: TargetView::Engaged {
            attackable,
            line_of_sight,
        },
    }
}

/// Reach of the equipped weapon and whether it has to see the target.
fn engagement_range(world: &World, rules: Rules<'_>, entity: Entity) -> (f32, bool) {
    match combat::equipped_weapon(world, rules, entity) {
        Some(weapon) if weapon.kind == AttackKind::Ranged => {
            (weapon.range * rules.config.ranged_range_factor, true)
        }
        Some(weapon) => (weapon.range, false),
        None => (rules.config.default_melee_range, false),
    }
}

impl Agent<'_> {
    fn apply(
        &mut self,
        effect: AiEffect,
        events: &mut GameEventBus,
        rules: Rules<'_>,
        sight: &SightParams,
    ) {
        match effect {
            AiEffect::ClearTarget => self.ai.target = None,
            AiEffect::ClearPath => {
                self.ai.path.clear();
                self.ai.path_timer = 0.0;
            }
            AiEffect::EmitLeashed => {
                tracing::debug!(entity = %self.entity, "leashed, returning to spawn");
                events.emit(self.entity, GameEventKind::Leashed);
            }
            AiEffect::SetTimer(secs) => self.ai.state_timer = secs,
            AiEffect::SetDirection(direction) => self.ai.direction = direction,
            AiEffect::Walk => {
                let direction = self.ai.direction;
                self.input.press(direction);
                self.input
                    .set_aim(self.center + direction.vector() * rules.config.wander_aim_distance);
            }
            AiEffect::AimAtTarget => {
                if let Some(target) = self.target_center() {
                    self.input.set_aim(target);
                }
            }
            AiEffect::PressAttack => self.input.attack = true,
            AiEffect::SteerToTarget => {
                if let Some(target) = self.target_center() {
                    steer(&mut self.input, target - self.center);
                }
            }
            AiEffect::FollowPath(goal) => self.follow_path(goal, rules, sight),
        }
    }

    fn target_center(&self) -> Option<Vec2> {
        self.engagement.as_ref().map(|e| e.center)
    }

    /// Re-plans on the goal's interval, then steers at the next waypoint. With
    /// no route a chaser heads straight for the target and a returner waits.
    fn follow_path(&mut self, goal: PathGoal, rules: Rules<'_>, sight: &SightParams) {
        let config = rules.config;
        let (destination, replan_secs) = match goal {
            PathGoal::Target => match self.target_center() {
                Some(target) => (target, config.chase_replan_secs),
                None => return,
            },
            PathGoal::Home => (self.ai.spawn() + self.half, config.return_replan_secs),
        };

        self.ai.path_timer -= config.dt();
        if self.ai.path_timer <= 0.0 {
            self.ai.path =
                pathfinding::find_path(self.map, self.center, destination, sight).unwrap_or_default();
            self.ai.path_timer = replan_secs;
        }

        match self.next_waypoint(config.waypoint_tolerance) {
            Some(waypoint) => steer(&mut self.input, waypoint - self.center),
            None if goal == PathGoal::Target => steer(&mut self.input, destination - self.center),
            None => {}
        }
    }

    fn next_waypoint(&mut self, tolerance: f32) -> Option<Vec2> {
        while let Some(&waypoint) = self.ai.path.first() {
            if waypoint.distance(self.center) >= tolerance {
                return Some(waypoint);
            }
            self.ai.path.remove(0);
            if self.ai.path.is_empty() {
                self.ai.path_timer = 0.0;
            }
        }
        None
    }
}
