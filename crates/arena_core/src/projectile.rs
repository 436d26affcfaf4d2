//! Projectile specs and live projectile instances.
//!
//! A [`ProjectileSpec`] is the per-shot value a magazine hands out. Firing
//! clones it into a [`Projectile`], which owns the spec, its own modifier
//! chain and the motion bookkeeping the simulator advances every tick.

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::factions::Faction;
use crate::math::{decimal_serde, fixed_serde, option_fixed_serde, Fixed, Vec2Fixed};
use crate::modifier::{ModifierChain, ProjectileView};
use crate::physics::{CastHit, ColliderRef};
use crate::rng::SimRng;
use crate::stats::Element;

/// Colliders at or below this radius are swept as rays.
pub const RAY_RADIUS: Fixed = Fixed::from_bits(214_748_365); // 0.05

/// Gameplay numbers of a projectile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileStats {
    /// Owner faction, stamped by the magazine.
    pub faction: Faction,
    /// Damage element.
    pub element: Element,
    /// Damage per hit.
    #[serde(with = "decimal_serde")]
    pub damage: Fixed,
    /// Nominal speed in units per second.
    #[serde(with = "decimal_serde")]
    pub speed: Fixed,
    /// Random speed variation, applied in both directions.
    #[serde(with = "decimal_serde")]
    pub speed_flux: Fixed,
    /// Maximum travel distance. Negative means unlimited.
    #[serde(with = "decimal_serde")]
    pub range: Fixed,
    /// Random range reduction.
    #[serde(with = "decimal_serde")]
    pub range_flux: Fixed,
}

impl Default for ProjectileStats {
    fn default() -> Self {
        Self {
            faction: Faction::None,
            element: Element::None,
            damage: Fixed::from_num(10),
            speed: Fixed::from_num(20),
            speed_flux: Fixed::ZERO,
            range: Fixed::from_num(100),
            range_flux: Fixed::ZERO,
        }
    }
}

/// Presentation data carried along for whoever renders projectiles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileGraphics {
    /// Sprite identifier.
    pub sprite: String,
    /// RGBA tint.
    pub color: [u8; 4],
    /// Sprite scale.
    #[serde(with = "decimal_serde")]
    pub scale: Fixed,
    /// Collider diameter before scaling.
    #[serde(with = "decimal_serde")]
    pub size: Fixed,
}

impl Default for ProjectileGraphics {
    fn default() -> Self {
        Self {
            sprite: String::from("bullet"),
            color: [255, 255, 255, 255],
            scale: Fixed::ONE,
            size: Fixed::ONE,
        }
    }
}

impl ProjectileGraphics {
    /// Collider radius derived from scale and size.
    #[must_use]
    pub fn collider_radius(&self) -> Fixed {
        (self.scale * self.size / Fixed::from_num(2)).max(RAY_RADIUS)
    }
}

/// Everything needed to fire one projectile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileSpec {
    /// Gameplay numbers.
    pub stats: ProjectileStats,
    /// Presentation.
    pub graphics: ProjectileGraphics,
    /// Modifier chain prototype, cloned per shot.
    pub modifiers: ModifierChain,
}

/// Last thing that happened to a projectile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LifecycleEvent {
    /// Just fired.
    #[default]
    Fired,
    /// Hit an attackable entity.
    HitTarget,
    /// Hit map geometry.
    HitWall,
    /// Was reflected.
    Reflected,
    /// Ran out of range.
    RangeMet,
    /// Removed from play.
    Removed,
}

/// How a reflected projectile picks its new heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ReflectionType {
    /// Keep the current heading.
    #[default]
    None,
    /// Any direction.
    Random360,
    /// Straight back.
    ReverseDirection,
    /// Back, within 45 degrees either side.
    ReverseDirection90,
    /// Toward the shooter.
    TargetSource,
    /// Toward the shooter, within 15 degrees either side.
    TargetSource30,
    /// Toward the shooter, within 45 degrees either side.
    TargetSource90,
}

/// Result of moving a projectile along its path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Travel {
    /// Moved the full requested distance.
    Moved,
    /// Range ran out part way; the projectile stopped at its limit.
    RangeMet,
}

/// A projectile in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projectile {
    /// Owned copy of the fired spec. Reflection changes its faction.
    pub spec: ProjectileSpec,
    /// Current position.
    pub position: Vec2Fixed,
    /// Current velocity.
    pub velocity: Vec2Fixed,
    /// Remaining travel distance; `None` is unlimited.
    #[serde(with = "option_fixed_serde")]
    pub range_left: Option<Fixed>,
    /// Most recent valid collision.
    pub last_hit: Option<CastHit>,
    /// Seconds of the current step not yet travelled after a collision.
    #[serde(with = "fixed_serde")]
    pub time_behind: Fixed,
    /// Last lifecycle event.
    pub last_event: LifecycleEvent,
    /// Entity that fired it, if any.
    pub source: Option<EntityId>,
    /// Sweep radius; zero for rays.
    #[serde(with = "fixed_serde")]
    pub radius: Fixed,
    /// Colliders passed through by piercing.
    pub pierced: Vec<ColliderRef>,
    /// Seconds since launch.
    #[serde(with = "fixed_serde")]
    pub age: Fixed,
    /// Position at launch.
    pub origin: Vec2Fixed,
}

impl Projectile {
    /// Fire `spec` from `position` along `direction`.
    ///
    /// Speed and range are jittered by their flux values and the modifier
    /// chain is bound to the new projectile.
    pub fn launch(
        mut spec: ProjectileSpec,
        position: Vec2Fixed,
        direction: Vec2Fixed,
        source: Option<EntityId>,
        rng: &mut SimRng,
    ) -> Self {
        let stats = &spec.stats;
        let mut speed = stats.speed;
        if stats.speed_flux > Fixed::ZERO {
            speed += stats.speed_flux * rng.range(-Fixed::ONE, Fixed::ONE);
        }
        let speed = speed.max(Fixed::ZERO);

        let range_left = if stats.range < Fixed::ZERO {
            None
        } else if stats.range_flux > Fixed::ZERO {
            Some((stats.range - stats.range_flux * rng.unit()).max(Fixed::ZERO))
        } else {
            Some(stats.range)
        };

        let collider = spec.graphics.collider_radius();
        let radius = if collider <= RAY_RADIUS {
            Fixed::ZERO
        } else {
            collider
        };

        spec.modifiers.launch();

        Self {
            spec,
            position,
            velocity: direction.normalize() * speed,
            range_left,
            last_hit: None,
            time_behind: Fixed::ZERO,
            last_event: LifecycleEvent::Fired,
            source,
            radius,
            pierced: Vec::new(),
            age: Fixed::ZERO,
            origin: position,
        }
    }

    /// Current faction.
    #[must_use]
    pub fn faction(&self) -> Faction {
        self.spec.stats.faction
    }

    /// Current speed.
    #[must_use]
    pub fn speed(&self) -> Fixed {
        self.velocity.length()
    }

    /// Snapshot handed to modifier hooks.
    #[must_use]
    pub fn view(&self, delta: Fixed) -> ProjectileView {
        ProjectileView {
            position: self.position,
            velocity: self.velocity,
            last_event: self.last_event,
            age: self.age,
            delta,
        }
    }

    /// Move `distance` along the current heading, honouring range.
    ///
    /// When the remaining range is shorter than `distance` the projectile
    /// only covers what is left and [`Travel::RangeMet`] is returned.
    pub fn advance(&mut self, distance: Fixed) -> Travel {
        let heading = self.velocity.normalize();
        let (step, travel) = self.clamp_to_range(distance);
        self.position += heading * step;
        travel
    }

    /// Move to `point`, honouring range.
    ///
    /// Returns [`Travel::RangeMet`] and stops short when the point is out
    /// of range.
    pub fn move_to(&mut self, point: Vec2Fixed) -> Travel {
        let offset = point - self.position;
        let distance = offset.length();
        let (step, travel) = self.clamp_to_range(distance);
        if travel == Travel::Moved {
            self.position = point;
        } else {
            self.position += offset.normalize() * step;
        }
        travel
    }

    fn clamp_to_range(&mut self, distance: Fixed) -> (Fixed, Travel) {
        match self.range_left {
            Some(left) if distance >= left => {
                self.range_left = Some(Fixed::ZERO);
                (left.max(Fixed::ZERO), Travel::RangeMet)
            }
            Some(left) => {
                self.range_left = Some(left - distance);
                (distance, Travel::Moved)
            }
            None => (distance, Travel::Moved),
        }
    }

    /// Total displacement from the launch point.
    #[must_use]
    pub fn displacement(&self) -> Fixed {
        self.position.distance(self.origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modifier::ModifierKind;

    fn spec(speed: i32, range: i32) -> ProjectileSpec {
        ProjectileSpec {
            stats: ProjectileStats {
                speed: Fixed::from_num(speed),
                range: Fixed::from_num(range),
                ..ProjectileStats::default()
            },
            ..ProjectileSpec::default()
        }
    }

    #[test]
    fn test_launch_without_flux() {
        let mut rng = SimRng::new(1);
        let p = Projectile::launch(spec(10, 10), Vec2Fixed::ZERO, Vec2Fixed::from_num(3, 0), None, &mut rng);
        assert_eq!(p.velocity, Vec2Fixed::from_num(10, 0));
        assert_eq!(p.range_left, Some(Fixed::from_num(10)));
        assert_eq!(p.last_event, LifecycleEvent::Fired);
    }

    #[test]
    fn test_negative_range_is_unlimited() {
        let mut rng = SimRng::new(1);
        let mut p = Projectile::launch(spec(10, -1), Vec2Fixed::ZERO, Vec2Fixed::RIGHT, None, &mut rng);
        assert_eq!(p.range_left, None);
        assert_eq!(p.advance(Fixed::from_num(1000)), Travel::Moved);
    }

    #[test]
    fn test_flux_stays_in_bounds() {
        let mut rng = SimRng::new(99);
        let mut s = spec(10, 10);
        s.stats.speed_flux = Fixed::from_num(2);
        s.stats.range_flux = Fixed::from_num(3);
        for _ in 0..50 {
            let p = Projectile::launch(s.clone(), Vec2Fixed::ZERO, Vec2Fixed::RIGHT, None, &mut rng);
            let speed = p.speed();
            assert!(speed >= Fixed::from_num(7.99) && speed <= Fixed::from_num(12.01));
            let range = p.range_left.unwrap_or(Fixed::ZERO);
            assert!(range > Fixed::from_num(7) && range <= Fixed::from_num(10));
        }
    }

    #[test]
    fn test_advance_stops_at_range() {
        let mut rng = SimRng::new(1);
        let mut p = Projectile::launch(spec(10, 10), Vec2Fixed::ZERO, Vec2Fixed::RIGHT, None, &mut rng);
        assert_eq!(p.advance(Fixed::from_num(6)), Travel::Moved);
        assert_eq!(p.advance(Fixed::from_num(6)), Travel::RangeMet);
        assert_eq!(p.position, Vec2Fixed::from_num(10, 0));
        assert_eq!(p.displacement(), Fixed::from_num(10));
    }

    #[test]
    fn test_move_to_respects_range() {
        let mut rng = SimRng::new(1);
        let mut p = Projectile::launch(spec(10, 5), Vec2Fixed::ZERO, Vec2Fixed::RIGHT, None, &mut rng);
        assert_eq!(p.move_to(Vec2Fixed::from_num(3, 0)), Travel::Moved);
        assert_eq!(p.move_to(Vec2Fixed::from_num(8, 0)), Travel::RangeMet);
        assert_eq!(p.position, Vec2Fixed::from_num(5, 0));
    }

    #[test]
    fn test_small_collider_is_ray() {
        let mut rng = SimRng::new(1);
        let mut s = spec(10, 10);
        s.graphics.size = Fixed::from_num(0.05);
        let ray = Projectile::launch(s.clone(), Vec2Fixed::ZERO, Vec2Fixed::RIGHT, None, &mut rng);
        assert_eq!(ray.radius, Fixed::ZERO);

        s.graphics.size = Fixed::from_num(0.5);
        let circle = Projectile::launch(s, Vec2Fixed::ZERO, Vec2Fixed::RIGHT, None, &mut rng);
        assert_eq!(circle.radius, Fixed::from_num(0.25));
    }

    #[test]
    fn test_spec_clones_do_not_share_modifiers() {
        let mut rng = SimRng::new(1);
        let mut s = spec(10, 10);
        s.modifiers.add_kind(ModifierKind::Bounce);
        let mut a = Projectile::launch(s.clone(), Vec2Fixed::ZERO, Vec2Fixed::RIGHT, None, &mut rng);
        let b = Projectile::launch(s.clone(), Vec2Fixed::ZERO, Vec2Fixed::RIGHT, None, &mut rng);
        a.spec.modifiers.remove_kind(ModifierKind::Bounce);
        assert!(b.spec.modifiers.contains(ModifierKind::Bounce));
        assert!(s.modifiers.contains(ModifierKind::Bounce));
    }

    #[test]
    fn test_spec_from_ron() {
        let text = r#"(
            stats: (faction: Player, element: Fire, damage: 12.5, speed: 30.0, range: 40.0),
            graphics: (sprite: "pellet", size: 0.2),
            modifiers: [Pierce((pierces: 2))],
        )"#;
        let spec: ProjectileSpec = ron::from_str(text).unwrap();
        assert_eq!(spec.stats.damage, Fixed::from_num(12.5));
        assert_eq!(spec.stats.faction, Faction::Player);
        assert_eq!(spec.graphics.sprite, "pellet");
        assert_eq!(spec.modifiers.kinds(), vec![ModifierKind::Pierce]);
    }
}
