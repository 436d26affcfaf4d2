//! Physics queries consumed by weapons and projectiles.
//!
//! The combat core never owns a physics engine. It asks a [`PhysicsQuery`]
//! implementation for swept casts and overlap tests. [`ArenaPhysics`] is a
//! brute-force implementation over wall segments and entity circles, used
//! by the headless simulation and tests; a game would plug in its own
//! broad-phase instead.

use std::ops::BitOr;

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::math::{Fixed, Vec2Fixed};

/// Tolerance for contacts at the very start of a cast.
const CAST_EPSILON: Fixed = Fixed::from_bits(1 << 12);

/// Collision layer selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerMask(u8);

impl LayerMask {
    /// Entity bodies.
    pub const ENTITY: Self = Self(0b01);
    /// Static map geometry.
    pub const MAP: Self = Self(0b10);
    /// Everything a projectile collides with.
    pub const PROJECTILE: Self = Self(0b11);

    /// Whether every layer of `other` is in this mask.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for LayerMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// What a cast hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ColliderRef {
    /// An entity body.
    Entity(EntityId),
    /// A map segment, by index.
    Map(usize),
}

/// Result of a swept cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastHit {
    /// Contact point on the collider surface.
    pub point: Vec2Fixed,
    /// Surface normal at the contact, facing the caster.
    pub normal: Vec2Fixed,
    /// Center of the cast shape at the moment of contact.
    pub centroid: Vec2Fixed,
    /// Collider that was hit.
    pub collider: ColliderRef,
    /// Distance travelled along the cast before contact.
    #[serde(with = "crate::math::fixed_serde")]
    pub distance: Fixed,
}

/// Physics capability used by the combat pipeline.
pub trait PhysicsQuery {
    /// Every hit of a circle of `radius` swept from `origin` along
    /// `direction` for `max_distance`, nearest first. A radius of zero is a
    /// ray cast.
    fn shape_cast_all(
        &self,
        origin: Vec2Fixed,
        direction: Vec2Fixed,
        radius: Fixed,
        max_distance: Fixed,
        mask: LayerMask,
    ) -> Vec<CastHit>;

    /// Nearest hit of a swept circle, if any.
    fn shape_cast(
        &self,
        origin: Vec2Fixed,
        direction: Vec2Fixed,
        radius: Fixed,
        max_distance: Fixed,
        mask: LayerMask,
    ) -> Option<CastHit> {
        self.shape_cast_all(origin, direction, radius, max_distance, mask)
            .into_iter()
            .next()
    }

    /// Whether a circle at `point` overlaps anything on `mask`.
    fn overlap_circle(&self, point: Vec2Fixed, radius: Fixed, mask: LayerMask) -> bool;
}

/// A static wall segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wall {
    /// First endpoint.
    pub start: Vec2Fixed,
    /// Second endpoint.
    pub end: Vec2Fixed,
}

impl Wall {
    /// Create a wall between two points.
    #[must_use]
    pub const fn new(start: Vec2Fixed, end: Vec2Fixed) -> Self {
        Self { start, end }
    }

    /// Closest point on the segment to `point`.
    #[must_use]
    pub fn closest_point(&self, point: Vec2Fixed) -> Vec2Fixed {
        let edge = self.end - self.start;
        let len_sq = edge.length_squared();
        if len_sq == Fixed::ZERO {
            return self.start;
        }
        let t = ((point - self.start).dot(edge) / len_sq).clamp(Fixed::ZERO, Fixed::ONE);
        self.start + edge * t
    }
}

/// A circular entity body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Body {
    /// Owning entity.
    pub entity: EntityId,
    /// Center.
    pub position: Vec2Fixed,
    /// Radius.
    #[serde(with = "crate::math::fixed_serde")]
    pub radius: Fixed,
}

/// Brute-force physics world of walls and circular bodies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArenaPhysics {
    walls: Vec<Wall>,
    bodies: Vec<Body>,
}

impl ArenaPhysics {
    /// Create a world with the given walls and no bodies.
    #[must_use]
    pub fn new(walls: Vec<Wall>) -> Self {
        Self {
            walls,
            bodies: Vec::new(),
        }
    }

    /// Static walls.
    #[must_use]
    pub fn walls(&self) -> &[Wall] {
        &self.walls
    }

    /// Entity bodies from the last sync.
    #[must_use]
    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    /// Replace all entity bodies.
    pub fn sync_bodies(&mut self, bodies: impl IntoIterator<Item = Body>) {
        self.bodies.clear();
        self.bodies.extend(bodies);
    }

    /// Build an axis-aligned rectangular room from its corners.
    #[must_use]
    pub fn room(min: Vec2Fixed, max: Vec2Fixed) -> Self {
        let a = min;
        let b = Vec2Fixed::new(max.x, min.y);
        let c = max;
        let d = Vec2Fixed::new(min.x, max.y);
        Self::new(vec![
            Wall::new(a, b),
            Wall::new(b, c),
            Wall::new(c, d),
            Wall::new(d, a),
        ])
    }

    /// Sweep a circle of `radius` against a circle of `target_radius`.
    ///
    /// Returns the travel distance and the contact normal.
    fn cast_circle(
        origin: Vec2Fixed,
        dir: Vec2Fixed,
        radius: Fixed,
        center: Vec2Fixed,
        target_radius: Fixed,
        max_distance: Fixed,
    ) -> Option<(Fixed, Vec2Fixed)> {
        let combined = radius + target_radius;
        let offset = origin - center;
        let b = offset.dot(dir);
        let c = offset.length_squared() - combined * combined;

        if c <= Fixed::ZERO {
            // Already overlapping: only a hit if still moving inwards.
            if b >= Fixed::ZERO {
                return None;
            }
            let normal = if offset.is_zero() {
                -dir
            } else {
                offset.normalize()
            };
            return Some((Fixed::ZERO, normal));
        }
        if b > Fixed::ZERO {
            return None;
        }

        let disc = b * b - c;
        if disc < Fixed::ZERO {
            return None;
        }
        let t = -b - crate::math::fixed_sqrt(disc);
        if t < -CAST_EPSILON || t > max_distance {
            return None;
        }
        let t = t.max(Fixed::ZERO);
        let normal = (origin + dir * t - center).normalize();
        Some((t, normal))
    }

    /// Sweep a circle against a segment treated as a capsule.
    fn cast_wall(
        origin: Vec2Fixed,
        dir: Vec2Fixed,
        radius: Fixed,
        wall: &Wall,
        max_distance: Fixed,
    ) -> Option<(Fixed, Vec2Fixed)> {
        let edge = wall.end - wall.start;
        let mut best: Option<(Fixed, Vec2Fixed)> = None;
        let mut consider = |candidate: Option<(Fixed, Vec2Fixed)>| {
            if let Some((t, normal)) = candidate {
                if best.map_or(true, |(bt, _)| t < bt) {
                    best = Some((t, normal));
                }
            }
        };

        let denom = dir.cross(edge);
        if denom != Fixed::ZERO && !edge.is_zero() {
            let side_normal = edge.perpendicular().normalize();
            for normal in [side_normal, -side_normal] {
                // Only the face the cast approaches can be hit.
                if dir.dot(normal) >= Fixed::ZERO {
                    continue;
                }
                let face_start = wall.start + normal * radius;
                // Casts starting on or behind the face never hit it.
                if (origin - face_start).dot(normal) <= CAST_EPSILON {
                    continue;
                }
                let w = face_start - origin;
                let t = w.cross(edge) / denom;
                let u = w.cross(dir) / denom;
                if u >= Fixed::ZERO && u <= Fixed::ONE && t <= max_distance {
                    consider(Some((t.max(Fixed::ZERO), normal)));
                }
            }
        }

        if radius > Fixed::ZERO {
            for cap in [wall.start, wall.end] {
                consider(Self::cast_circle(origin, dir, radius, cap, Fixed::ZERO, max_distance));
            }
        }

        best
    }
}

impl PhysicsQuery for ArenaPhysics {
    fn shape_cast_all(
        &self,
        origin: Vec2Fixed,
        direction: Vec2Fixed,
        radius: Fixed,
        max_distance: Fixed,
        mask: LayerMask,
    ) -> Vec<CastHit> {
        let dir = direction.normalize();
        if dir.is_zero() || max_distance < Fixed::ZERO {
            return Vec::new();
        }

        let mut hits = Vec::new();

        if mask.contains(LayerMask::MAP) {
            for (index, wall) in self.walls.iter().enumerate() {
                if let Some((t, normal)) = Self::cast_wall(origin, dir, radius, wall, max_distance) {
                    let centroid = origin + dir * t;
                    hits.push(CastHit {
                        point: centroid - normal * radius,
                        normal,
                        centroid,
                        collider: ColliderRef::Map(index),
                        distance: t,
                    });
                }
            }
        }

        if mask.contains(LayerMask::ENTITY) {
            for body in &self.bodies {
                if let Some((t, normal)) =
                    Self::cast_circle(origin, dir, radius, body.position, body.radius, max_distance)
                {
                    let centroid = origin + dir * t;
                    hits.push(CastHit {
                        point: body.position + normal * body.radius,
                        normal,
                        centroid,
                        collider: ColliderRef::Entity(body.entity),
                        distance: t,
                    });
                }
            }
        }

        hits.sort_by(|a, b| {
            a.distance
                .cmp(&b.distance)
                .then_with(|| a.collider.cmp(&b.collider))
        });
        hits
    }

    fn overlap_circle(&self, point: Vec2Fixed, radius: Fixed, mask: LayerMask) -> bool {
        if mask.contains(LayerMask::MAP) {
            let radius_sq = radius * radius;
            if self
                .walls
                .iter()
                .any(|wall| wall.closest_point(point).distance_squared(point) <= radius_sq)
            {
                return true;
            }
        }
        if mask.contains(LayerMask::ENTITY) {
            return self.bodies.iter().any(|body| {
                let reach = body.radius + radius;
                body.position.distance_squared(point) <= reach * reach
            });
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f64, y: f64) -> Vec2Fixed {
        Vec2Fixed::from_num(x, y)
    }

    fn fixed(x: f64) -> Fixed {
        Fixed::from_num(x)
    }

    fn close(a: Fixed, b: f64) -> bool {
        (a.to_num::<f64>() - b).abs() < 1e-4
    }

    fn wall_world() -> ArenaPhysics {
        ArenaPhysics::new(vec![Wall::new(v(5.0, -5.0), v(5.0, 5.0))])
    }

    #[test]
    fn test_ray_hits_wall() {
        let world = wall_world();
        let hit = world
            .shape_cast(v(0.0, 0.0), v(1.0, 0.0), Fixed::ZERO, fixed(10.0), LayerMask::PROJECTILE)
            .unwrap();
        assert!(close(hit.distance, 5.0));
        assert_eq!(hit.collider, ColliderRef::Map(0));
        assert!(close(hit.normal.x, -1.0));
        assert!(close(hit.centroid.x, 5.0));
    }

    #[test]
    fn test_circle_cast_stops_short_of_wall() {
        let world = wall_world();
        let hit = world
            .shape_cast(v(0.0, 0.0), v(1.0, 0.0), fixed(0.5), fixed(10.0), LayerMask::MAP)
            .unwrap();
        assert!(close(hit.distance, 4.5));
        assert!(close(hit.point.x, 5.0));
    }

    #[test]
    fn test_cast_respects_distance_and_mask() {
        let world = wall_world();
        assert!(world
            .shape_cast(v(0.0, 0.0), v(1.0, 0.0), Fixed::ZERO, fixed(4.0), LayerMask::MAP)
            .is_none());
        assert!(world
            .shape_cast(v(0.0, 0.0), v(1.0, 0.0), Fixed::ZERO, fixed(10.0), LayerMask::ENTITY)
            .is_none());
    }

    #[test]
    fn test_moving_away_from_wall_ignored() {
        let world = wall_world();
        assert!(world
            .shape_cast(v(5.0, 0.0), v(-1.0, 0.0), Fixed::ZERO, fixed(10.0), LayerMask::MAP)
            .is_none());
    }

    #[test]
    fn test_cast_hits_body() {
        let mut world = ArenaPhysics::default();
        world.sync_bodies([Body {
            entity: 7,
            position: v(10.0, 0.0),
            radius: fixed(1.0),
        }]);
        let hit = world
            .shape_cast(v(0.0, 0.0), v(1.0, 0.0), Fixed::ZERO, fixed(20.0), LayerMask::ENTITY)
            .unwrap();
        assert_eq!(hit.collider, ColliderRef::Entity(7));
        assert!(close(hit.distance, 9.0));
        assert!(close(hit.point.x, 9.0));
    }

    #[test]
    fn test_cast_all_sorted() {
        let mut world = wall_world();
        world.sync_bodies([Body {
            entity: 1,
            position: v(2.0, 0.0),
            radius: fixed(0.5),
        }]);
        let hits = world.shape_cast_all(
            v(0.0, 0.0),
            v(1.0, 0.0),
            Fixed::ZERO,
            fixed(10.0),
            LayerMask::PROJECTILE,
        );
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].collider, ColliderRef::Entity(1));
        assert_eq!(hits[1].collider, ColliderRef::Map(0));
    }

    #[test]
    fn test_overlap_circle() {
        let world = wall_world();
        assert!(world.overlap_circle(v(4.9, 0.0), fixed(0.2), LayerMask::MAP));
        assert!(!world.overlap_circle(v(4.0, 0.0), fixed(0.2), LayerMask::MAP));
        assert!(!world.overlap_circle(v(4.9, 0.0), fixed(0.2), LayerMask::ENTITY));
    }

    #[test]
    fn test_room_has_four_walls() {
        let room = ArenaPhysics::room(v(-10.0, -10.0), v(10.0, 10.0));
        assert_eq!(room.walls().len(), 4);
        for dir in [v(1.0, 0.0), v(-1.0, 0.0), v(0.0, 1.0), v(0.0, -1.0)] {
            let hit = room
                .shape_cast(Vec2Fixed::ZERO, dir, Fixed::ZERO, fixed(50.0), LayerMask::MAP)
                .unwrap();
            assert!(close(hit.distance, 10.0));
        }
    }
}
