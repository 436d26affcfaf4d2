//! Layered damage resolution.
//!
//! Incoming damage visits shields, then armor, then health. Each pool scales
//! the damage by its resistance multiplier and absorbs what it can; the
//! unabsorbed remainder moves on to the next pool. Plasma is the exception:
//! it splits the hit and applies a share to every pool that still has
//! anything left, independently.

use serde::{Deserialize, Serialize};

use crate::math::Fixed;
use crate::stats::{Element, PoolKind, StatBlock};

/// Receives break and death notifications while damage is resolved.
///
/// Every method has a no-op default so listeners only implement what they
/// react to.
pub trait DamageListener {
    /// Shields reached zero.
    fn on_shield_break(&mut self) {}

    /// Armor reached zero.
    fn on_armor_break(&mut self) {}

    /// Health reached zero.
    fn on_health_break(&mut self) {}

    /// The critical pool reached zero.
    ///
    /// Return `true` to take ownership of the death; the entity is then left
    /// alive until the listener finishes it. Returning `false` selects the
    /// default death.
    fn on_death(&mut self) -> bool {
        false
    }
}

/// Listener that ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullListener;

impl DamageListener for NullListener {}

/// How a death was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeathHandling {
    /// Entity is marked dead and removed at the end of the tick.
    Default,
    /// The controller took over the death sequence.
    ControllerOwned,
}

/// Result of one damage call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DamageOutcome {
    /// The critical pool was depleted by this call.
    pub killed: bool,
    /// Total damage removed from pools.
    pub dealt: Fixed,
    /// Damage absorbed by resistances.
    pub resisted: Fixed,
    /// Pools that reached zero, in the order they broke.
    pub broken: Vec<PoolKind>,
    /// Set when `killed` is true.
    pub death: Option<DeathHandling>,
}

/// Outcome of damaging a single pool.
#[derive(Debug, Clone, Copy)]
struct LayerHit {
    dealt: Fixed,
    resisted: Fixed,
    used: Fixed,
    broke: bool,
}

/// Applies damage to stat blocks.
pub struct DamageResolver;

impl DamageResolver {
    /// Damage `stats` by `amount` of `element`, notifying `listener`.
    ///
    /// Non-positive amounts are rejected with a warning and change nothing.
    pub fn damage(
        stats: &mut StatBlock,
        listener: &mut dyn DamageListener,
        amount: Fixed,
        element: Element,
    ) -> DamageOutcome {
        let mut outcome = DamageOutcome::default();
        if amount <= Fixed::ZERO {
            tracing::warn!(amount = %amount, ?element, "Rejected non-positive damage");
            return outcome;
        }

        if element == Element::Plasma {
            Self::damage_split(stats, listener, amount, element, &mut outcome);
        } else {
            Self::damage_sequential(stats, listener, amount, element, &mut outcome);
        }
        outcome
    }

    fn damage_sequential(
        stats: &mut StatBlock,
        listener: &mut dyn DamageListener,
        amount: Fixed,
        element: Element,
        outcome: &mut DamageOutcome,
    ) {
        let mut residual = amount;
        for kind in PoolKind::DAMAGE_ORDER {
            if residual <= Fixed::ZERO {
                break;
            }
            if !stats.pool(kind).has_any() {
                continue;
            }

            let hit = Self::damage_layer(stats, kind, residual, element);
            residual -= hit.used;
            outcome.dealt += hit.dealt;
            outcome.resisted += hit.resisted;

            if hit.broke && Self::handle_break(stats, listener, kind, outcome) {
                return;
            }
        }
    }

    fn damage_split(
        stats: &mut StatBlock,
        listener: &mut dyn DamageListener,
        amount: Fixed,
        element: Element,
        outcome: &mut DamageOutcome,
    ) {
        let layers = Fixed::from_num(2)
            + Fixed::from_num(u8::from(stats.shields.has_any()))
            + Fixed::from_num(u8::from(stats.armor.has_any()));
        let share = amount * Fixed::from_num(2) / layers;

        let targets: Vec<PoolKind> = PoolKind::DAMAGE_ORDER
            .into_iter()
            .filter(|kind| stats.pool(*kind).has_any())
            .collect();

        for kind in targets {
            let hit = Self::damage_layer(stats, kind, share, element);
            outcome.dealt += hit.dealt;
            outcome.resisted += hit.resisted;
            if hit.broke {
                Self::handle_break(stats, listener, kind, outcome);
            }
        }
    }

    fn damage_layer(stats: &mut StatBlock, kind: PoolKind, incoming: Fixed, element: Element) -> LayerHit {
        let multiplier = stats.multiplier(kind, element);
        let pool = stats.pool_mut(kind);
        let effective = incoming * multiplier;
        let dealt = effective.min(pool.current());

        let (used, resisted) = if multiplier >= Fixed::ONE {
            // Amplified or neutral: nothing is resisted and the running
            // damage drops by what the pool took.
            (dealt, Fixed::ZERO)
        } else {
            // A resisted layer that caps only used the part of the incoming
            // damage that, once multiplied, fills the pool.
            let used = if effective <= pool.current() {
                incoming
            } else {
                (dealt / multiplier).min(incoming)
            };
            (used, (used - dealt).max(Fixed::ZERO))
        };

        pool.set_current(pool.current() - dealt);
        LayerHit {
            dealt,
            resisted,
            used,
            broke: !pool.has_any(),
        }
    }

    /// Fire break callbacks for `kind`. Returns true if the entity died.
    fn handle_break(
        stats: &StatBlock,
        listener: &mut dyn DamageListener,
        kind: PoolKind,
        outcome: &mut DamageOutcome,
    ) -> bool {
        outcome.broken.push(kind);
        match kind {
            PoolKind::Shields => listener.on_shield_break(),
            PoolKind::Armor => listener.on_armor_break(),
            PoolKind::Health => listener.on_health_break(),
        }

        if kind != stats.critical || outcome.killed {
            return false;
        }

        outcome.killed = true;
        outcome.death = Some(if listener.on_death() {
            DeathHandling::ControllerOwned
        } else {
            DeathHandling::Default
        });
        true
    }
}
