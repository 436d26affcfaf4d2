//! Entity controllers: who decides what an entity does.
//!
//! Controllers turn a read-only view of the world into an [`Intent`] each
//! tick and receive break/death callbacks from damage resolution. A
//! controller that returns `true` from `on_death` owns the death sequence
//! and reports when the entity may be despawned through
//! [`EntityController::poll_despawn`].

use serde::{Deserialize, Serialize};

use crate::damage::DamageListener;
use crate::entity::EntityId;
use crate::math::{cos, option_fixed_serde, sin, Fixed, Vec2Fixed};

/// Delay between a shield breaking and its removal.
pub const SHIELD_BREAK_DESPAWN: Fixed = Fixed::ONE;

/// Weapon switch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EquipRequest {
    /// Equip a specific slot.
    Slot(usize),
    /// Equip the next slot.
    Next,
    /// Equip the previous slot.
    Previous,
}

/// What a controller wants its entity to do this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Intent {
    /// Primary action (trigger) held.
    pub action1: bool,
    /// Secondary action held.
    pub action2: bool,
    /// Aim direction; `None` keeps the current aim.
    pub aim: Option<Vec2Fixed>,
    /// Movement direction; normalized by the entity.
    pub movement: Vec2Fixed,
    /// Weapon switch.
    pub equip: Option<EquipRequest>,
}

/// World state a controller may read while thinking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerView {
    /// Simulation clock.
    pub now: Fixed,
    /// Position of the controlled entity.
    pub position: Vec2Fixed,
    /// Position of the controller's target, if it is still around.
    pub target_position: Option<Vec2Fixed>,
}

/// Behaviour of an entity's brain.
pub trait EntityController: DamageListener {
    /// Decide this tick's intent.
    fn think(&mut self, view: &ControllerView) -> Intent;

    /// For controller-owned deaths: whether the entity may now be removed.
    fn poll_despawn(&mut self, _now: Fixed) -> bool {
        false
    }

    /// Entity this controller tracks, if any.
    fn target(&self) -> Option<EntityId> {
        None
    }
}

/// Replays externally supplied intents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlayerController {
    pending: Intent,
}

impl PlayerController {
    /// Set the intent used from the next tick on.
    ///
    /// Trigger and movement state persist until replaced; an equip request
    /// is consumed by the first tick that sees it.
    pub fn set_intent(&mut self, intent: Intent) {
        self.pending = intent;
    }

    /// Intent that will be used next tick.
    #[must_use]
    pub const fn pending(&self) -> &Intent {
        &self.pending
    }
}

impl DamageListener for PlayerController {
    fn on_shield_break(&mut self) {
        tracing::debug!("Player shields broken");
    }
}

impl EntityController for PlayerController {
    fn think(&mut self, _view: &ControllerView) -> Intent {
        let intent = self.pending;
        self.pending.equip = None;
        intent
    }
}

/// Target practice enemy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DummyController {
    /// Keep the trigger held.
    pub hold_trigger: bool,
    /// Walk in circles.
    pub move_in_circles: bool,
    /// Entity to aim at.
    pub target: Option<EntityId>,
}

impl DamageListener for DummyController {}

impl EntityController for DummyController {
    fn think(&mut self, view: &ControllerView) -> Intent {
        let movement = if self.move_in_circles {
            let phase = view.now * Fixed::from_num(1.5);
            Vec2Fixed::new(sin(phase), cos(phase))
        } else {
            Vec2Fixed::ZERO
        };

        let aim = view
            .target_position
            .map(|target| target - view.position)
            .filter(|dir| !dir.is_zero());

        Intent {
            action1: self.hold_trigger,
            aim,
            movement,
            ..Intent::default()
        }
    }

    fn target(&self) -> Option<EntityId> {
        self.target
    }
}

/// Destructible shield that plays its own break sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShieldController {
    /// Lifetime from first tick; `None` lasts until broken.
    #[serde(with = "option_fixed_serde")]
    pub duration: Option<Fixed>,
    #[serde(with = "option_fixed_serde")]
    started: Option<Fixed>,
    #[serde(with = "option_fixed_serde")]
    broke_at: Option<Fixed>,
    break_requested: bool,
}

impl ShieldController {
    /// Shield that breaks on its own after `duration` seconds.
    #[must_use]
    pub const fn with_duration(duration: Fixed) -> Self {
        Self {
            duration: Some(duration),
            started: None,
            broke_at: None,
            break_requested: false,
        }
    }

    /// Whether the break sequence has started.
    #[must_use]
    pub const fn is_broken(&self) -> bool {
        self.break_requested || self.broke_at.is_some()
    }

    fn break_shield(&mut self, now: Fixed) {
        if self.broke_at.is_none() {
            tracing::debug!(now = %now, "Shield broke");
            self.broke_at = Some(now);
        }
    }
}

impl DamageListener for ShieldController {
    fn on_death(&mut self) -> bool {
        self.break_requested = true;
        true
    }
}

impl EntityController for ShieldController {
    fn think(&mut self, view: &ControllerView) -> Intent {
        let started = *self.started.get_or_insert(view.now);
        if let Some(duration) = self.duration {
            if view.now >= started + duration {
                self.break_requested = true;
            }
        }
        Intent::default()
    }

    fn poll_despawn(&mut self, now: Fixed) -> bool {
        if self.break_requested {
            self.break_shield(now);
        }
        self.broke_at
            .is_some_and(|t| now >= t + SHIELD_BREAK_DESPAWN)
    }
}

/// Any controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Controller {
    /// Does nothing.
    #[default]
    Inert,
    /// See [`PlayerController`].
    Player(PlayerController),
    /// See [`DummyController`].
    Dummy(DummyController),
    /// See [`ShieldController`].
    Shield(ShieldController),
}

impl DamageListener for Controller {
    fn on_shield_break(&mut self) {
        match self {
            Self::Inert => {}
            Self::Player(c) => c.on_shield_break(),
            Self::Dummy(c) => c.on_shield_break(),
            Self::Shield(c) => c.on_shield_break(),
        }
    }

    fn on_armor_break(&mut self) {
        match self {
            Self::Inert => {}
            Self::Player(c) => c.on_armor_break(),
            Self::Dummy(c) => c.on_armor_break(),
            Self::Shield(c) => c.on_armor_break(),
        }
    }

    fn on_health_break(&mut self) {
        match self {
            Self::Inert => {}
            Self::Player(c) => c.on_health_break(),
            Self::Dummy(c) => c.on_health_break(),
            Self::Shield(c) => c.on_health_break(),
        }
    }

    fn on_death(&mut self) -> bool {
        match self {
            Self::Inert => false,
            Self::Player(c) => c.on_death(),
            Self::Dummy(c) => c.on_death(),
            Self::Shield(c) => c.on_death(),
        }
    }
}

impl EntityController for Controller {
    fn think(&mut self, view: &ControllerView) -> Intent {
        match self {
            Self::Inert => Intent::default(),
            Self::Player(c) => c.think(view),
            Self::Dummy(c) => c.think(view),
            Self::Shield(c) => c.think(view),
        }
    }

    fn poll_despawn(&mut self, now: Fixed) -> bool {
        match self {
            Self::Inert => false,
            Self::Player(c) => c.poll_despawn(now),
            Self::Dummy(c) => c.poll_despawn(now),
            Self::Shield(c) => c.poll_despawn(now),
        }
    }

    fn target(&self) -> Option<EntityId> {
        match self {
            Self::Dummy(c) => c.target(),
            _ => None,
        }
    }
}

impl Controller {
    /// Player controller, if this is one.
    pub fn as_player_mut(&mut self) -> Option<&mut PlayerController> {
        match self {
            Self::Player(c) => Some(c),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(now: f64) -> ControllerView {
        ControllerView {
            now: Fixed::from_num(now),
            position: Vec2Fixed::ZERO,
            target_position: Some(Vec2Fixed::from_num(0, 5)),
        }
    }

    #[test]
    fn test_player_equip_is_consumed_once() {
        let mut player = PlayerController::default();
        player.set_intent(Intent {
            action1: true,
            equip: Some(EquipRequest::Next),
            ..Intent::default()
        });
        let first = player.think(&view(0.0));
        let second = player.think(&view(0.02));
        assert_eq!(first.equip, Some(EquipRequest::Next));
        assert_eq!(second.equip, None);
        assert!(second.action1);
    }

    #[test]
    fn test_dummy_aims_at_target() {
        let mut dummy = DummyController {
            hold_trigger: true,
            move_in_circles: true,
            target: Some(1),
        };
        let intent = dummy.think(&view(0.0));
        assert!(intent.action1);
        assert_eq!(intent.aim, Some(Vec2Fixed::from_num(0, 5)));
        assert_eq!(intent.movement.x, Fixed::ZERO);
        assert_eq!(dummy.target(), Some(1));
    }

    #[test]
    fn test_shield_owns_death_and_despawns_later() {
        let mut shield = ShieldController::default();
        assert!(!shield.poll_despawn(Fixed::ZERO));
        assert!(shield.on_death());
        assert!(!shield.poll_despawn(Fixed::from_num(2)));
        assert!(!shield.poll_despawn(Fixed::from_num(2.5)));
        assert!(shield.poll_despawn(Fixed::from_num(3)));
    }

    #[test]
    fn test_controller_dispatch() {
        let mut controller = Controller::Shield(ShieldController::default());
        assert!(controller.on_death());
        assert!(Controller::Inert.think(&view(0.0)) == Intent::default());
        assert!(!Controller::default().on_death());
        assert!(controller.as_player_mut().is_none());
    }

    #[test]
    fn test_shield_lifetime() {
        let mut shield = ShieldController::with_duration(Fixed::from_num(4));
        shield.think(&view(1.0));
        shield.think(&view(4.0));
        assert!(!shield.is_broken());
        shield.think(&view(5.0));
        assert!(shield.is_broken());
        assert!(!shield.poll_despawn(Fixed::from_num(5)));
        assert!(shield.poll_despawn(Fixed::from_num(6)));
    }
}
