//! Damage pools, elements and resistances.
//!
//! A [`StatBlock`] holds the three damage pools of an entity. Pools clamp
//! every write, so the resolver in [`crate::damage`] can never drive a pool
//! below zero or above its maximum.

use serde::{Deserialize, Serialize};

use crate::math::{decimal_serde, Fixed};

/// Damage multiplier contributed by each resistance level.
pub const RESISTANCE_FACTOR: Fixed = Fixed::from_bits(1 << 30);

/// Resistance level that [`Element::Void`] always reads as.
const VOID_LEVEL: i32 = 4;

/// Damage element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Element {
    /// Untyped damage.
    #[default]
    None,
    /// Eats through armor.
    Acid,
    /// Overloads shields.
    Electric,
    /// Blast damage.
    Explosive,
    /// Burns health.
    Fire,
    /// Cold damage.
    Frost,
    /// Splits across every remaining pool.
    Plasma,
    /// Radiation damage.
    Radiation,
    /// Unresistable damage.
    Void,
    /// Water damage.
    Water,
    /// Wind damage.
    Wind,
}

impl Element {
    /// Every element, in declaration order.
    pub const ALL: [Self; 11] = [
        Self::None,
        Self::Acid,
        Self::Electric,
        Self::Explosive,
        Self::Fire,
        Self::Frost,
        Self::Plasma,
        Self::Radiation,
        Self::Void,
        Self::Water,
        Self::Wind,
    ];
}

/// How strongly an entity reacts to an element.
///
/// Positive values take extra damage, negative values take less.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ResistanceLevel {
    /// +50% damage.
    VeryWeak = 2,
    /// +25% damage.
    Weak = 1,
    /// Unmodified.
    #[default]
    None = 0,
    /// -25% damage.
    Resistant = -1,
    /// -50% damage.
    VeryResistant = -2,
}

impl ResistanceLevel {
    /// Signed level value.
    #[must_use]
    pub const fn value(self) -> i32 {
        self as i32
    }
}

/// Per-element resistance record.
///
/// `basic` applies to [`Element::None`]. Void has no entry because it
/// cannot be resisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Resistances {
    /// Resistance to untyped damage.
    pub basic: ResistanceLevel,
    /// Resistance to acid.
    pub acid: ResistanceLevel,
    /// Resistance to electric damage.
    pub electric: ResistanceLevel,
    /// Resistance to explosions.
    pub explosive: ResistanceLevel,
    /// Resistance to fire.
    pub fire: ResistanceLevel,
    /// Resistance to frost.
    pub frost: ResistanceLevel,
    /// Resistance to plasma.
    pub plasma: ResistanceLevel,
    /// Resistance to radiation.
    pub radiation: ResistanceLevel,
    /// Resistance to water.
    pub water: ResistanceLevel,
    /// Resistance to wind.
    pub wind: ResistanceLevel,
}

impl Resistances {
    /// Raw resistance level for an element, before layer bonuses.
    #[must_use]
    pub const fn level(&self, element: Element) -> i32 {
        match element {
            Element::None => self.basic.value(),
            Element::Acid => self.acid.value(),
            Element::Electric => self.electric.value(),
            Element::Explosive => self.explosive.value(),
            Element::Fire => self.fire.value(),
            Element::Frost => self.frost.value(),
            Element::Plasma => self.plasma.value(),
            Element::Radiation => self.radiation.value(),
            Element::Void => VOID_LEVEL,
            Element::Water => self.water.value(),
            Element::Wind => self.wind.value(),
        }
    }
}

/// Identifies one of the three damage pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PoolKind {
    /// Hit points.
    #[default]
    Health,
    /// Armor plating.
    Armor,
    /// Energy shields.
    Shields,
}

impl PoolKind {
    /// Order in which sequential damage visits the pools.
    pub const DAMAGE_ORDER: [Self; 3] = [Self::Shields, Self::Armor, Self::Health];

    /// Element that deals bonus damage to this pool.
    #[must_use]
    pub const fn favoured_element(self) -> Element {
        match self {
            Self::Health => Element::Fire,
            Self::Armor => Element::Acid,
            Self::Shields => Element::Electric,
        }
    }
}

/// A clamped damage pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "PoolData", into = "PoolData")]
pub struct Pool {
    max: Fixed,
    current: Fixed,
}

/// Authoring form of a [`Pool`]; `current` defaults to `max`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct PoolData {
    #[serde(with = "decimal_serde")]
    max: Fixed,
    #[serde(default, with = "crate::math::option_decimal_serde")]
    current: Option<Fixed>,
}

impl From<PoolData> for Pool {
    fn from(data: PoolData) -> Self {
        let mut pool = Self::new(data.max);
        if let Some(current) = data.current {
            pool.set_current(current);
        }
        pool
    }
}

impl From<Pool> for PoolData {
    fn from(pool: Pool) -> Self {
        Self {
            max: pool.max,
            current: Some(pool.current),
        }
    }
}

impl Default for Pool {
    fn default() -> Self {
        Self::new(Fixed::ZERO)
    }
}

impl Pool {
    /// Create a full pool. A non-positive `max` yields an empty pool.
    #[must_use]
    pub fn new(max: Fixed) -> Self {
        let max = max.max(Fixed::ZERO);
        Self { max, current: max }
    }

    /// Maximum value.
    #[must_use]
    pub const fn max(&self) -> Fixed {
        self.max
    }

    /// Current value, always within `[0, max]`.
    #[must_use]
    pub const fn current(&self) -> Fixed {
        self.current
    }

    /// Whether anything is left in the pool.
    #[must_use]
    pub fn has_any(&self) -> bool {
        self.current > Fixed::ZERO
    }

    /// Set the current value, clamped to `[0, max]`.
    pub fn set_current(&mut self, value: Fixed) {
        if value < Fixed::ZERO {
            tracing::warn!(value = %value, "Pool value set below zero, clamping");
        }
        self.current = value.clamp(Fixed::ZERO, self.max);
    }

    /// Set the maximum. A non-positive max forces the pool to zero.
    pub fn set_max(&mut self, max: Fixed) {
        self.max = max.max(Fixed::ZERO);
        self.current = self.current.min(self.max);
    }

    /// Refill to maximum.
    pub fn fill(&mut self) {
        self.current = self.max;
    }
}

/// Damage pools and resistances of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct StatBlock {
    /// Hit points.
    #[serde(default)]
    pub health: Pool,
    /// Armor.
    #[serde(default)]
    pub armor: Pool,
    /// Shields.
    #[serde(default)]
    pub shields: Pool,
    /// Pool whose depletion kills the entity.
    #[serde(default)]
    pub critical: PoolKind,
    /// Elemental resistances.
    #[serde(default)]
    pub resistances: Resistances,
}

impl StatBlock {
    /// Stat block with only health.
    #[must_use]
    pub fn with_health(max: Fixed) -> Self {
        Self {
            health: Pool::new(max),
            ..Self::default()
        }
    }

    /// Builder-style setter for the armor pool.
    #[must_use]
    pub fn armor(mut self, max: Fixed) -> Self {
        self.armor = Pool::new(max);
        self
    }

    /// Builder-style setter for the shield pool.
    #[must_use]
    pub fn shields(mut self, max: Fixed) -> Self {
        self.shields = Pool::new(max);
        self
    }

    /// Builder-style setter for the critical pool.
    #[must_use]
    pub const fn critical(mut self, kind: PoolKind) -> Self {
        self.critical = kind;
        self
    }

    /// Builder-style setter for resistances.
    #[must_use]
    pub const fn resistances(mut self, resistances: Resistances) -> Self {
        self.resistances = resistances;
        self
    }

    /// Borrow a pool by kind.
    #[must_use]
    pub const fn pool(&self, kind: PoolKind) -> &Pool {
        match kind {
            PoolKind::Health => &self.health,
            PoolKind::Armor => &self.armor,
            PoolKind::Shields => &self.shields,
        }
    }

    /// Mutably borrow a pool by kind.
    pub fn pool_mut(&mut self, kind: PoolKind) -> &mut Pool {
        match kind {
            PoolKind::Health => &mut self.health,
            PoolKind::Armor => &mut self.armor,
            PoolKind::Shields => &mut self.shields,
        }
    }

    /// Refill every pool.
    pub fn restore(&mut self) {
        self.health.fill();
        self.armor.fill();
        self.shields.fill();
    }

    /// Damage multiplier for `element` hitting the `kind` pool.
    ///
    /// `1 + clamp(level + bonus, -2, 2) * 0.25`, where the bonus is +1 when
    /// the element is the pool's favoured element.
    #[must_use]
    pub fn multiplier(&self, kind: PoolKind, element: Element) -> Fixed {
        let bonus = i32::from(kind.favoured_element() == element);
        let level = (self.resistances.level(element) + bonus).clamp(-2, 2);
        Fixed::ONE + Fixed::from_num(level) * RESISTANCE_FACTOR
    }

    /// Whether the critical pool is empty.
    #[must_use]
    pub fn is_depleted(&self) -> bool {
        !self.pool(self.critical).has_any()
    }
}
