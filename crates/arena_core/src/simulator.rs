//! Projectile stepping, collision and removal.
//!
//! Every tick each live projectile, in pool order:
//!
//! 1. runs `on_update` on its modifier chain,
//! 2. sweeps its collider along its velocity for `speed * delta`,
//! 3. stops at the first valid hit and resolves it through the chain,
//! 4. otherwise moves the full distance, or up to its range limit.
//!
//! Hooks always run before default behaviour. A collision whose chain
//! returns anything other than [`Fate::Keep`] removes the projectile. A
//! kept projectile that bounced or pierced spends the rest of its step
//! (`time_behind`) by sweeping again from the contact point.

use crate::entity::{EntityId, EntityStorage};
use crate::math::{Fixed, Vec2Fixed};
use crate::modifier::{ChainOutcome, Fate, ModifierEffect};
use crate::physics::{CastHit, ColliderRef, LayerMask, PhysicsQuery};
use crate::pool::{Pool, PoolHandle};
use crate::projectile::{LifecycleEvent, Projectile, ReflectionType, Travel};
use crate::rng::SimRng;
use crate::stats::Element;
use crate::weapon::ShotRequest;

/// Default number of projectiles alive at once.
pub const DEFAULT_POOL_CAPACITY: usize = 512;

/// Default limit on bounce and pierce continuations within one step.
pub const MAX_CONTINUATION_DEPTH: u32 = 8;

/// Layers projectiles collide with.
pub const COLLIDABLE: LayerMask = LayerMask::PROJECTILE;

/// Something that happened to a projectile during a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CombatEvent {
    /// A projectile was fired.
    Fired {
        /// Projectile handle.
        projectile: PoolHandle,
        /// Shooter.
        source: Option<EntityId>,
    },
    /// An entity took damage from a projectile or explosion.
    Damaged {
        /// Damaged entity.
        target: EntityId,
        /// Shooter.
        source: Option<EntityId>,
        /// Damage removed from pools.
        dealt: Fixed,
        /// Damage absorbed by resistances.
        resisted: Fixed,
        /// The hit killed the target.
        killed: bool,
        /// Damage came from an explosion.
        explosion: bool,
    },
    /// A projectile hit map geometry.
    HitWall {
        /// Projectile handle.
        projectile: PoolHandle,
        /// Contact point.
        point: Vec2Fixed,
    },
    /// A projectile was reflected.
    Reflected {
        /// Projectile handle.
        projectile: PoolHandle,
    },
    /// A projectile ran out of range.
    RangeMet {
        /// Projectile handle.
        projectile: PoolHandle,
        /// Position at the range limit.
        position: Vec2Fixed,
    },
    /// A projectile exploded.
    Exploded {
        /// Projectile handle.
        projectile: PoolHandle,
        /// Blast center.
        position: Vec2Fixed,
        /// Blast radius.
        radius: Fixed,
    },
    /// A projectile left play.
    Removed {
        /// Projectile handle.
        projectile: PoolHandle,
        /// Last event before removal.
        cause: LifecycleEvent,
    },
}

/// World access for one simulator call.
pub struct StepContext<'a> {
    /// Physics queries.
    pub physics: &'a dyn PhysicsQuery,
    /// Entities that can be hit.
    pub entities: &'a mut EntityStorage,
    /// Simulation random stream.
    pub rng: &'a mut SimRng,
    /// Simulation clock.
    pub now: Fixed,
    /// Event output.
    pub events: &'a mut Vec<CombatEvent>,
}

/// Whether a projectile survives an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    Alive,
    Remove,
}

/// Owns and advances every live projectile.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ProjectileSimulator {
    pool: Pool<Projectile>,
    max_depth: u32,
}

impl Default for ProjectileSimulator {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_CAPACITY)
    }
}

impl ProjectileSimulator {
    /// Simulator holding at most `capacity` projectiles.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            pool: Pool::new(capacity),
            max_depth: MAX_CONTINUATION_DEPTH,
        }
    }

    /// Number of live projectiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pool.len()
    }

    /// Whether no projectile is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    /// Borrow a live projectile.
    #[must_use]
    pub fn get(&self, handle: PoolHandle) -> Option<&Projectile> {
        self.pool.get(handle)
    }

    /// Mutably borrow a live projectile.
    pub fn get_mut(&mut self, handle: PoolHandle) -> Option<&mut Projectile> {
        self.pool.get_mut(handle)
    }

    /// Live projectiles, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = (PoolHandle, &Projectile)> {
        self.pool.iter()
    }

    /// Fire a projectile.
    ///
    /// When the pool is full the oldest projectile is finalised as if it
    /// had run out of range to make room.
    pub fn spawn(&mut self, shot: ShotRequest, ctx: &mut StepContext<'_>) -> PoolHandle {
        let source = shot.source;
        let projectile =
            Projectile::launch(shot.spec, shot.position, shot.direction, source, ctx.rng);
        let (handle, evicted) = self.pool.force_acquire(projectile);

        if let Some((old, mut projectile)) = evicted {
            tracing::warn!(capacity = self.pool.capacity(), "Projectile pool full; evicting oldest");
            projectile.last_event = LifecycleEvent::RangeMet;
            let view = projectile.view(Fixed::ZERO);
            projectile.spec.modifiers.on_range_met(&view);
            Self::finalize(old, &mut projectile, ctx);
        }

        ctx.events.push(CombatEvent::Fired {
            projectile: handle,
            source,
        });
        handle
    }

    /// Advance every live projectile by `delta` seconds.
    pub fn step(&mut self, delta: Fixed, ctx: &mut StepContext<'_>) {
        for handle in self.pool.handles() {
            self.step_one(handle, delta, ctx);
        }
    }

    fn step_one(&mut self, handle: PoolHandle, delta: Fixed, ctx: &mut StepContext<'_>) {
        let max_depth = self.max_depth;
        let Some(projectile) = self.pool.get_mut(handle) else {
            return;
        };

        let view = projectile.view(delta);
        let update = projectile.spec.modifiers.on_update(&view);
        for effect in &update.effects {
            if let ModifierEffect::Sway(offset) = effect {
                projectile.position += *offset;
            }
        }

        let disposition = if update.fate == Fate::Remove {
            Disposition::Remove
        } else {
            projectile.time_behind = Fixed::ZERO;
            Self::travel(handle, projectile, delta, delta, 0, max_depth, ctx)
        };

        match disposition {
            Disposition::Alive => projectile.age += delta,
            Disposition::Remove => self.remove(handle, ctx),
        }
    }

    /// Sweep for `time` seconds of motion.
    fn travel(
        handle: PoolHandle,
        projectile: &mut Projectile,
        time: Fixed,
        delta: Fixed,
        depth: u32,
        max_depth: u32,
        ctx: &mut StepContext<'_>,
    ) -> Disposition {
        let distance = projectile.speed() * time;
        if distance <= Fixed::ZERO {
            return Disposition::Alive;
        }

        let heading = projectile.velocity.normalize();
        let entities: &EntityStorage = ctx.entities;
        let hit = ctx
            .physics
            .shape_cast_all(projectile.position, heading, projectile.radius, distance, COLLIDABLE)
            .into_iter()
            .find(|hit| Self::is_valid_hit(projectile, hit, entities));

        match hit {
            Some(hit) => {
                projectile.time_behind = time * (Fixed::ONE - hit.distance / distance);
                Self::collide(handle, projectile, hit, delta, depth, max_depth, ctx)
            }
            None => match projectile.advance(distance) {
                Travel::Moved => Disposition::Alive,
                Travel::RangeMet => Self::range_met(handle, projectile, delta, ctx),
            },
        }
    }

    fn is_valid_hit(projectile: &Projectile, hit: &CastHit, entities: &EntityStorage) -> bool {
        if projectile.pierced.contains(&hit.collider) {
            return false;
        }
        match hit.collider {
            ColliderRef::Map(_) => true,
            ColliderRef::Entity(id) => entities
                .get(id)
                .is_some_and(|entity| entity.attackable_by(projectile.faction())),
        }
    }

    fn collide(
        handle: PoolHandle,
        projectile: &mut Projectile,
        hit: CastHit,
        delta: Fixed,
        depth: u32,
        max_depth: u32,
        ctx: &mut StepContext<'_>,
    ) -> Disposition {
        if projectile.last_event == LifecycleEvent::Removed {
            tracing::warn!(?handle, "Collision on a removed projectile ignored");
            return Disposition::Alive;
        }

        if projectile.move_to(hit.centroid) == Travel::RangeMet {
            return Self::range_met(handle, projectile, delta, ctx);
        }
        projectile.last_hit = Some(hit);

        let outcome = match hit.collider {
            ColliderRef::Entity(target) => Self::hit_target(projectile, target, delta, ctx),
            ColliderRef::Map(_) => {
                projectile.last_event = LifecycleEvent::HitWall;
                ctx.events.push(CombatEvent::HitWall {
                    projectile: handle,
                    point: hit.point,
                });
                let view = projectile.view(delta);
                projectile.spec.modifiers.on_hit_wall(&view)
            }
        };

        if outcome.removes() {
            return Disposition::Remove;
        }

        let bounced = outcome.has(|e| *e == ModifierEffect::Bounce);
        let pierced = outcome.has(|e| *e == ModifierEffect::PassThrough);
        if !bounced && !pierced {
            return Disposition::Alive;
        }
        if depth >= max_depth {
            tracing::warn!(?handle, depth, "Projectile continuation limit reached");
            return Disposition::Alive;
        }

        if bounced {
            projectile.velocity = projectile.velocity.reflect(hit.normal);
        } else {
            projectile.pierced.push(hit.collider);
        }
        let leftover = projectile.time_behind;
        Self::travel(handle, projectile, leftover, delta, depth + 1, max_depth, ctx)
    }

    fn hit_target(
        projectile: &mut Projectile,
        target: EntityId,
        delta: Fixed,
        ctx: &mut StepContext<'_>,
    ) -> ChainOutcome {
        projectile.last_event = LifecycleEvent::HitTarget;
        let view = projectile.view(delta);
        let outcome = projectile.spec.modifiers.on_hit_target(&view);

        if !outcome.cancel_damage {
            let stats = &projectile.spec.stats;
            if let Some(entity) = ctx.entities.get_mut(target) {
                let result = entity.damage(stats.damage, stats.element);
                ctx.events.push(CombatEvent::Damaged {
                    target,
                    source: projectile.source,
                    dealt: result.dealt,
                    resisted: result.resisted,
                    killed: result.killed,
                    explosion: false,
                });
            }
        }
        outcome
    }

    fn range_met(
        handle: PoolHandle,
        projectile: &mut Projectile,
        delta: Fixed,
        ctx: &mut StepContext<'_>,
    ) -> Disposition {
        projectile.last_event = LifecycleEvent::RangeMet;
        ctx.events.push(CombatEvent::RangeMet {
            projectile: handle,
            position: projectile.position,
        });

        let view = projectile.view(delta);
        if projectile.spec.modifiers.on_range_met(&view).fate == Fate::Keep {
            projectile.range_left = None;
            Disposition::Alive
        } else {
            Disposition::Remove
        }
    }

    /// Remove a live projectile, running its removal hooks.
    pub fn remove(&mut self, handle: PoolHandle, ctx: &mut StepContext<'_>) {
        match self.pool.recycle(handle) {
            Some(mut projectile) => Self::finalize(handle, &mut projectile, ctx),
            None => tracing::warn!(?handle, "Removal of a projectile that is not live"),
        }
    }

    fn finalize(handle: PoolHandle, projectile: &mut Projectile, ctx: &mut StepContext<'_>) {
        let cause = projectile.last_event;
        let view = projectile.view(Fixed::ZERO);
        for effect in projectile.spec.modifiers.on_remove(&view) {
            if let ModifierEffect::Explode {
                radius,
                damage,
                element,
            } = effect
            {
                Self::explode(handle, projectile, radius, damage, element, ctx);
            }
        }

        projectile.last_event = LifecycleEvent::Removed;
        ctx.events.push(CombatEvent::Removed {
            projectile: handle,
            cause,
        });
    }

    fn explode(
        handle: PoolHandle,
        projectile: &Projectile,
        radius: Fixed,
        damage: Fixed,
        element: Element,
        ctx: &mut StepContext<'_>,
    ) {
        let center = projectile.position;
        ctx.events.push(CombatEvent::Exploded {
            projectile: handle,
            position: center,
            radius,
        });
        if damage <= Fixed::ZERO {
            return;
        }

        for id in ctx.entities.sorted_ids() {
            let Some(entity) = ctx.entities.get_mut(id) else {
                continue;
            };
            let reach = radius + entity.radius;
            if !entity.attackable_by(projectile.faction())
                || entity.position.distance_squared(center) > reach * reach
            {
                continue;
            }

            let result = entity.damage(damage, element);
            ctx.events.push(CombatEvent::Damaged {
                target: id,
                source: projectile.source,
                dealt: result.dealt,
                resisted: result.resisted,
                killed: result.killed,
                explosion: true,
            });
        }
    }

    /// Reflect a live projectile.
    ///
    /// The faction flips to its reflected counterpart so the projectile can
    /// now hit its shooter. Returns `false` for stale handles.
    pub fn reflect(
        &mut self,
        handle: PoolHandle,
        kind: ReflectionType,
        ctx: &mut StepContext<'_>,
    ) -> bool {
        let Some(projectile) = self.pool.get_mut(handle) else {
            return false;
        };

        let speed = projectile.speed();
        let heading = projectile.velocity.normalize();
        let source = projectile
            .source
            .and_then(|id| ctx.entities.get(id))
            .map(|entity| entity.position);

        let toward_source = |jitter: Fixed, rng: &mut SimRng| match source {
            Some(target) if target != projectile.position => {
                let angle = rng.range(-jitter, jitter);
                (target - projectile.position).normalize().rotate_deg(angle)
            }
            _ => {
                tracing::warn!(?handle, ?kind, "Reflection has no source to target; reversing");
                -heading
            }
        };

        let direction = match kind {
            ReflectionType::None => heading,
            ReflectionType::Random360 => Vec2Fixed::from_angle_deg(ctx.rng.angle_deg()),
            ReflectionType::ReverseDirection => -heading,
            ReflectionType::ReverseDirection90 => {
                let angle = ctx.rng.range(Fixed::from_num(-45), Fixed::from_num(45));
                (-heading).rotate_deg(angle)
            }
            ReflectionType::TargetSource => toward_source(Fixed::ZERO, ctx.rng),
            ReflectionType::TargetSource30 => toward_source(Fixed::from_num(15), ctx.rng),
            ReflectionType::TargetSource90 => toward_source(Fixed::from_num(45), ctx.rng),
        };

        Self::apply_reflection(handle, projectile, direction * speed, ctx);
        true
    }

    /// Point a live projectile at `target` and reflect it without further
    /// heading changes.
    pub fn reflect_towards(
        &mut self,
        handle: PoolHandle,
        target: Vec2Fixed,
        ctx: &mut StepContext<'_>,
    ) -> bool {
        let Some(projectile) = self.pool.get_mut(handle) else {
            return false;
        };
        let heading = (target - projectile.position).normalize();
        let velocity = if heading.is_zero() {
            projectile.velocity
        } else {
            heading * projectile.speed()
        };
        Self::apply_reflection(handle, projectile, velocity, ctx);
        true
    }

    fn apply_reflection(
        handle: PoolHandle,
        projectile: &mut Projectile,
        velocity: Vec2Fixed,
        ctx: &mut StepContext<'_>,
    ) {
        projectile.velocity = velocity;
        projectile.spec.stats.faction = projectile.faction().reflected();
        projectile.last_event = LifecycleEvent::Reflected;
        let view = projectile.view(Fixed::ZERO);
        projectile.spec.modifiers.on_reflected(&view);
        ctx.events.push(CombatEvent::Reflected { projectile: handle });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;
    use crate::factions::Faction;
    use crate::modifier::{BounceModifier, ExplosiveModifier, Modifier, ModifierKind};
    use crate::physics::{ArenaPhysics, Wall};
    use crate::projectile::{ProjectileSpec, ProjectileStats};
    use crate::stats::StatBlock;

    struct World {
        physics: ArenaPhysics,
        entities: EntityStorage,
        rng: SimRng,
        events: Vec<CombatEvent>,
        sim: ProjectileSimulator,
    }

    impl World {
        fn new(walls: Vec<Wall>) -> Self {
            Self {
                physics: ArenaPhysics::new(walls),
                entities: EntityStorage::new(),
                rng: SimRng::new(3),
                events: Vec::new(),
                sim: ProjectileSimulator::default(),
            }
        }

        fn add_entity(&mut self, faction: Faction, position: Vec2Fixed, health: i32) -> EntityId {
            let mut entity = Entity::new(0);
            entity.faction = faction;
            entity.position = position;
            entity.stats = StatBlock::with_health(Fixed::from_num(health));
            let id = self.entities.insert(entity);
            self.physics.sync_bodies(self.entities.bodies());
            id
        }

        fn fire(&mut self, spec: ProjectileSpec, position: Vec2Fixed, direction: Vec2Fixed) -> PoolHandle {
            let shot = ShotRequest {
                spec,
                position,
                direction,
                fired_at: Fixed::ZERO,
                offset: Fixed::ZERO,
                source: None,
            };
            let mut ctx = StepContext {
                physics: &self.physics,
                entities: &mut self.entities,
                rng: &mut self.rng,
                now: Fixed::ZERO,
                events: &mut self.events,
            };
            self.sim.spawn(shot, &mut ctx)
        }

        fn step(&mut self, delta: Fixed) {
            let mut ctx = StepContext {
                physics: &self.physics,
                entities: &mut self.entities,
                rng: &mut self.rng,
                now: Fixed::ZERO,
                events: &mut self.events,
            };
            self.sim.step(delta, &mut ctx);
            self.physics.sync_bodies(self.entities.bodies());
        }

        fn count(&self, predicate: impl Fn(&CombatEvent) -> bool) -> usize {
            self.events.iter().filter(|e| predicate(*e)).count()
        }
    }

    fn spec(faction: Faction, speed: i32, range: i32) -> ProjectileSpec {
        let mut spec = ProjectileSpec {
            stats: ProjectileStats {
                faction,
                speed: Fixed::from_num(speed),
                range: Fixed::from_num(range),
                damage: Fixed::from_num(10),
                ..ProjectileStats::default()
            },
            ..ProjectileSpec::default()
        };
        spec.graphics.size = Fixed::ZERO;
        spec
    }

    fn vertical_wall(x: i32) -> Wall {
        Wall::new(Vec2Fixed::from_num(x, -100), Vec2Fixed::from_num(x, 100))
    }

    #[test]
    fn test_range_is_never_exceeded() {
        for dt in [0.02, 0.1, 0.3, 1.0, 3.0] {
            let mut world = World::new(Vec::new());
            let handle = world.fire(spec(Faction::Player, 10, 10), Vec2Fixed::ZERO, Vec2Fixed::RIGHT);
            let mut max_seen = Fixed::ZERO;
            for _ in 0..200 {
                if let Some(p) = world.sim.get(handle) {
                    max_seen = max_seen.max(p.displacement());
                }
                world.step(Fixed::from_num(dt));
                if world.sim.is_empty() {
                    break;
                }
            }
            assert!(world.sim.is_empty(), "dt = {dt}");
            assert!(max_seen <= Fixed::from_num(10));
            assert_eq!(world.count(|e| matches!(e, CombatEvent::RangeMet { position, .. } if position.x == Fixed::from_num(10))), 1);
        }
    }

    #[test]
    fn test_hit_damages_and_removes() {
        let mut world = World::new(Vec::new());
        let enemy = world.add_entity(Faction::Enemy, Vec2Fixed::from_num(5, 0), 100);
        world.fire(spec(Faction::Player, 10, 100), Vec2Fixed::ZERO, Vec2Fixed::RIGHT);
        world.step(Fixed::ONE);

        assert!(world.sim.is_empty());
        let health = world.entities.get(enemy).map(|e| e.stats.health.current());
        assert_eq!(health, Some(Fixed::from_num(90)));
        assert_eq!(
            world.count(|e| matches!(e, CombatEvent::Removed { cause: LifecycleEvent::HitTarget, .. })),
            1
        );
    }

    #[test]
    fn test_friendly_bodies_are_ignored() {
        let mut world = World::new(Vec::new());
        let ally = world.add_entity(Faction::Ally, Vec2Fixed::from_num(5, 0), 100);
        let handle = world.fire(spec(Faction::Player, 10, 100), Vec2Fixed::ZERO, Vec2Fixed::RIGHT);
        world.step(Fixed::ONE);

        assert_eq!(world.sim.get(handle).map(|p| p.position), Some(Vec2Fixed::from_num(10, 0)));
        let health = world.entities.get(ally).map(|e| e.stats.health.current());
        assert_eq!(health, Some(Fixed::from_num(100)));
    }

    #[test]
    fn test_bounce_twice_then_removed() {
        let mut world = World::new(vec![vertical_wall(5), vertical_wall(-5)]);
        let mut s = spec(Faction::Player, 10, -1);
        s.modifiers.add(Modifier::Bounce(BounceModifier::new(2)));
        let handle = world.fire(s, Vec2Fixed::ZERO, Vec2Fixed::RIGHT);

        world.step(Fixed::ONE);
        let p = world.sim.get(handle).unwrap();
        assert_eq!(p.velocity, Vec2Fixed::from_num(-10, 0));
        assert_eq!(p.position, Vec2Fixed::from_num(0, 0));

        world.step(Fixed::ONE);
        let p = world.sim.get(handle).unwrap();
        assert_eq!(p.velocity, Vec2Fixed::from_num(10, 0));
        assert!(p.spec.modifiers.is_empty());

        world.step(Fixed::ONE);
        assert!(world.sim.get(handle).is_none());
        assert_eq!(world.count(|e| matches!(e, CombatEvent::HitWall { .. })), 3);
    }

    #[test]
    fn test_pierce_continues_through_target() {
        let mut world = World::new(Vec::new());
        let first = world.add_entity(Faction::Enemy, Vec2Fixed::from_num(3, 0), 100);
        let second = world.add_entity(Faction::Enemy, Vec2Fixed::from_num(6, 0), 100);
        let mut s = spec(Faction::Player, 10, 100);
        s.modifiers.add_kind(ModifierKind::Pierce);
        world.fire(s, Vec2Fixed::ZERO, Vec2Fixed::RIGHT);
        world.step(Fixed::ONE);

        for id in [first, second] {
            let health = world.entities.get(id).map(|e| e.stats.health.current());
            assert_eq!(health, Some(Fixed::from_num(90)));
        }
        assert!(world.sim.is_empty());
    }

    #[test]
    fn test_explosion_damages_in_radius() {
        let mut world = World::new(Vec::new());
        let target = world.add_entity(Faction::Enemy, Vec2Fixed::from_num(5, 0), 100);
        let near = world.add_entity(Faction::Enemy, Vec2Fixed::from_num(5, 2), 100);
        let far = world.add_entity(Faction::Enemy, Vec2Fixed::from_num(5, 20), 100);
        let mut s = spec(Faction::Player, 10, 100);
        s.modifiers.add(Modifier::Explosive(ExplosiveModifier {
            damage: Fixed::from_num(25),
            ..ExplosiveModifier::default()
        }));
        world.fire(s, Vec2Fixed::ZERO, Vec2Fixed::RIGHT);
        world.step(Fixed::ONE);

        let health = |id| world.entities.get(id).map(|e| e.stats.health.current());
        assert_eq!(health(target), Some(Fixed::from_num(65)));
        assert_eq!(health(near), Some(Fixed::from_num(75)));
        assert_eq!(health(far), Some(Fixed::from_num(100)));
        assert_eq!(world.count(|e| matches!(e, CombatEvent::Exploded { .. })), 1);
    }

    #[test]
    fn test_reflection_flips_faction() {
        let mut world = World::new(Vec::new());
        let handle = world.fire(spec(Faction::Enemy, 10, 100), Vec2Fixed::ZERO, Vec2Fixed::RIGHT);
        let mut ctx = StepContext {
            physics: &world.physics,
            entities: &mut world.entities,
            rng: &mut world.rng,
            now: Fixed::ZERO,
            events: &mut world.events,
        };
        assert!(world.sim.reflect(handle, ReflectionType::ReverseDirection, &mut ctx));
        assert!(world.sim.reflect(handle, ReflectionType::TargetSource, &mut ctx));

        let p = world.sim.get(handle).unwrap();
        assert_eq!(p.faction(), Faction::Enemy);
        assert_eq!(p.velocity, Vec2Fixed::from_num(10, 0));
        assert_eq!(p.last_event, LifecycleEvent::Reflected);
    }

    #[test]
    fn test_reflect_random_keeps_speed() {
        let mut world = World::new(Vec::new());
        let handle = world.fire(spec(Faction::Enemy, 10, 100), Vec2Fixed::ZERO, Vec2Fixed::RIGHT);
        let mut ctx = StepContext {
            physics: &world.physics,
            entities: &mut world.entities,
            rng: &mut world.rng,
            now: Fixed::ZERO,
            events: &mut world.events,
        };
        world.sim.reflect(handle, ReflectionType::Random360, &mut ctx);
        let p = world.sim.get(handle).unwrap();
        assert_eq!(p.faction(), Faction::ReflectedEnemy);
        let error = (p.speed() - Fixed::from_num(10)).abs();
        assert!(error < Fixed::from_num(0.001));
    }

    #[test]
    fn test_pool_eviction_finalises_oldest() {
        let mut world = World::new(Vec::new());
        world.sim = ProjectileSimulator::new(2);
        let first = world.fire(spec(Faction::Player, 1, 100), Vec2Fixed::ZERO, Vec2Fixed::RIGHT);
        world.fire(spec(Faction::Player, 1, 100), Vec2Fixed::ZERO, Vec2Fixed::RIGHT);
        world.fire(spec(Faction::Player, 1, 100), Vec2Fixed::ZERO, Vec2Fixed::RIGHT);

        assert_eq!(world.sim.len(), 2);
        assert!(world.sim.get(first).is_none());
        assert_eq!(
            world.count(|e| matches!(e, CombatEvent::Removed { cause: LifecycleEvent::RangeMet, .. })),
            1
        );
    }
}
