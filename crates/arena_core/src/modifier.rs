//! Projectile modifiers and the ordered chain that runs them.
//!
//! A modifier is a small value-type record attached to a projectile. Each
//! projectile owns its own copy of the chain, so bounce and pierce counters
//! are never shared between shots from the same magazine.
//!
//! # Aggregation
//!
//! Hooks run in stored order. The chain's fate is the first fate that is
//! not [`Fate::Pass`]; later modifiers still run for their side effects
//! until one of them asks to stop. Modifiers never touch the projectile
//! directly. They describe what should happen as [`ModifierEffect`]s, which
//! the simulator applies once the whole chain has run, and may ask to be
//! detached, which also happens after the loop.

use serde::{Deserialize, Serialize};

use crate::math::{decimal_serde, sin, Fixed, Vec2Fixed};
use crate::projectile::LifecycleEvent;
use crate::stats::Element;

/// What a modifier wants to happen to its projectile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Fate {
    /// Remove the projectile.
    Remove,
    /// No opinion; default behaviour applies.
    #[default]
    Pass,
    /// Keep the projectile alive.
    Keep,
}

/// Return value of a modifier hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HookResult {
    /// Fate requested by this modifier.
    pub fate: Fate,
    /// Stop running the rest of the chain for this hook.
    pub stop: bool,
    /// Suppress damage for this hit. Only read for target hits.
    pub cancel_damage: bool,
}

impl HookResult {
    /// No opinion, continue the chain.
    pub const PASS: Self = Self {
        fate: Fate::Pass,
        stop: false,
        cancel_damage: false,
    };

    /// Request a fate and continue the chain.
    #[must_use]
    pub const fn with_fate(fate: Fate) -> Self {
        Self {
            fate,
            stop: false,
            cancel_damage: false,
        }
    }

    /// Also stop the chain.
    #[must_use]
    pub const fn and_stop(mut self) -> Self {
        self.stop = true;
        self
    }
}

/// Read-only projectile state handed to hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectileView {
    /// Current position.
    pub position: Vec2Fixed,
    /// Current velocity.
    pub velocity: Vec2Fixed,
    /// Last lifecycle event.
    pub last_event: LifecycleEvent,
    /// Seconds since the projectile was fired.
    pub age: Fixed,
    /// Length of the current step in seconds.
    pub delta: Fixed,
}

/// Deferred request from a modifier to the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierEffect {
    /// Reflect off the last hit surface and spend the rest of the step.
    Bounce,
    /// Continue through the collider that was just hit.
    PassThrough,
    /// Displace the projectile sideways without changing its velocity.
    Sway(Vec2Fixed),
    /// Detonate at the projectile's position.
    Explode {
        /// Blast radius.
        radius: Fixed,
        /// Damage dealt to every attackable entity in the radius.
        damage: Fixed,
        /// Element of the blast damage.
        element: Element,
    },
}

/// Collects effects and the detach request of a single hook call.
#[derive(Debug, Default)]
pub struct HookEffects {
    effects: Vec<ModifierEffect>,
    detach: bool,
}

impl HookEffects {
    /// Queue an effect.
    pub fn push(&mut self, effect: ModifierEffect) {
        self.effects.push(effect);
    }

    /// Remove the calling modifier from its chain once the hook finishes.
    pub fn detach(&mut self) {
        self.detach = true;
    }
}

/// Aggregated result of running one hook over a chain.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChainOutcome {
    /// First decisive fate, or [`Fate::Pass`].
    pub fate: Fate,
    /// Some modifier cancelled damage.
    pub cancel_damage: bool,
    /// Effects in the order they were requested.
    pub effects: Vec<ModifierEffect>,
}

impl ChainOutcome {
    /// Whether the projectile should be removed after this hook.
    #[must_use]
    pub fn removes(&self) -> bool {
        self.fate != Fate::Keep
    }

    /// Whether an effect of the given shape was requested.
    #[must_use]
    pub fn has(&self, predicate: impl Fn(&ModifierEffect) -> bool) -> bool {
        self.effects.iter().any(predicate)
    }
}

/// Hook set implemented by every modifier variant.
///
/// All hooks default to doing nothing and returning [`HookResult::PASS`].
pub trait ProjectileModifier {
    /// Variant tag.
    fn kind(&self) -> ModifierKind;

    /// Priority value carried by the modifier.
    fn priority(&self) -> i32;

    /// Replace the priority value.
    fn set_priority(&mut self, priority: i32);

    /// Called once when the owning projectile is fired.
    fn on_launch(&mut self) {}

    /// Called at the start of every step.
    fn on_update(&mut self, _view: &ProjectileView, _fx: &mut HookEffects) -> HookResult {
        HookResult::PASS
    }

    /// Called when the projectile hits an attackable entity.
    fn on_hit_target(&mut self, _view: &ProjectileView, _fx: &mut HookEffects) -> HookResult {
        HookResult::PASS
    }

    /// Called when the projectile hits map geometry.
    fn on_hit_wall(&mut self, _view: &ProjectileView, _fx: &mut HookEffects) -> HookResult {
        HookResult::PASS
    }

    /// Called when the projectile runs out of range.
    fn on_range_met(&mut self, _view: &ProjectileView, _fx: &mut HookEffects) -> HookResult {
        HookResult::PASS
    }

    /// Called after the projectile was reflected.
    fn on_reflected(&mut self, _view: &ProjectileView) {}

    /// Called when the projectile is removed, for any reason.
    fn on_remove(&mut self, _view: &ProjectileView, _fx: &mut HookEffects) {}
}

/// Modifier variant tag, used to build and look up modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ModifierKind {
    /// Pass-through base modifier.
    None,
    /// Reflects off surfaces.
    Bounce,
    /// Configurable fates, used as a fixture.
    Dummy,
    /// Explodes on removal.
    Explosive,
    /// Sways side to side.
    Helix,
    /// Passes through hits.
    Pierce,
}

impl ModifierKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::None,
        Self::Bounce,
        Self::Dummy,
        Self::Explosive,
        Self::Helix,
        Self::Pierce,
    ];
}

/// Modifier with no behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseModifier {
    /// Priority value.
    pub priority: i32,
}

impl ProjectileModifier for BaseModifier {
    fn kind(&self) -> ModifierKind {
        ModifierKind::None
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn set_priority(&mut self, priority: i32) {
        self.priority = priority;
    }
}

/// Returns fixed fates for each collision hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DummyModifier {
    /// Priority value.
    pub priority: i32,
    /// Fate on target hits. Target hits also stop the chain.
    pub target_fate: Fate,
    /// Fate on wall hits.
    pub wall_fate: Fate,
    /// Fate when range runs out.
    pub range_fate: Fate,
}

impl ProjectileModifier for DummyModifier {
    fn kind(&self) -> ModifierKind {
        ModifierKind::Dummy
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn set_priority(&mut self, priority: i32) {
        self.priority = priority;
    }

    fn on_hit_target(&mut self, _view: &ProjectileView, _fx: &mut HookEffects) -> HookResult {
        HookResult::with_fate(self.target_fate).and_stop()
    }

    fn on_hit_wall(&mut self, _view: &ProjectileView, _fx: &mut HookEffects) -> HookResult {
        HookResult::with_fate(self.wall_fate)
    }

    fn on_range_met(&mut self, _view: &ProjectileView, _fx: &mut HookEffects) -> HookResult {
        HookResult::with_fate(self.range_fate)
    }
}

/// Bounces off surfaces a limited number of times.
///
/// The priority mirrors the remaining charges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BounceModifier {
    /// Priority value, kept equal to `bounces`.
    pub priority: i32,
    /// Remaining bounce charges.
    pub bounces: i32,
    /// Bounce off entities.
    pub bounce_off_target: bool,
    /// Bounce off walls.
    pub bounce_off_wall: bool,
}

impl Default for BounceModifier {
    fn default() -> Self {
        Self {
            priority: 2,
            bounces: 2,
            bounce_off_target: false,
            bounce_off_wall: true,
        }
    }
}

impl BounceModifier {
    /// Bounce modifier with the given number of wall bounces.
    #[must_use]
    pub const fn new(bounces: i32) -> Self {
        Self {
            priority: bounces,
            bounces,
            bounce_off_target: false,
            bounce_off_wall: true,
        }
    }

    fn bounce(&mut self, fx: &mut HookEffects) -> HookResult {
        fx.push(ModifierEffect::Bounce);
        self.bounces -= 1;
        self.priority = self.bounces;
        if self.bounces <= 0 {
            fx.detach();
        }
        HookResult::with_fate(Fate::Keep).and_stop()
    }
}

impl ProjectileModifier for BounceModifier {
    fn kind(&self) -> ModifierKind {
        ModifierKind::Bounce
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn set_priority(&mut self, priority: i32) {
        self.priority = priority;
    }

    fn on_launch(&mut self) {
        self.priority = self.bounces;
    }

    fn on_hit_target(&mut self, _view: &ProjectileView, fx: &mut HookEffects) -> HookResult {
        if self.bounce_off_target {
            self.bounce(fx)
        } else {
            HookResult::PASS
        }
    }

    fn on_hit_wall(&mut self, _view: &ProjectileView, fx: &mut HookEffects) -> HookResult {
        if self.bounce_off_wall {
            self.bounce(fx)
        } else {
            HookResult::PASS
        }
    }
}

/// Passes through a limited number of hits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PierceModifier {
    /// Priority value.
    pub priority: i32,
    /// Remaining pierce charges.
    pub pierces: i32,
    /// Pierce entities.
    pub pierce_target: bool,
    /// Pierce walls.
    pub pierce_wall: bool,
}

impl Default for PierceModifier {
    fn default() -> Self {
        Self {
            priority: 0,
            pierces: 1,
            pierce_target: true,
            pierce_wall: false,
        }
    }
}

impl PierceModifier {
    fn pierce(&mut self, fx: &mut HookEffects) -> HookResult {
        fx.push(ModifierEffect::PassThrough);
        self.pierces -= 1;
        tracing::debug!(remaining = self.pierces, "Projectile pierced");
        if self.pierces <= 0 {
            fx.detach();
        }
        HookResult::with_fate(Fate::Keep)
    }
}

impl ProjectileModifier for PierceModifier {
    fn kind(&self) -> ModifierKind {
        ModifierKind::Pierce
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn set_priority(&mut self, priority: i32) {
        self.priority = priority;
    }

    fn on_hit_target(&mut self, _view: &ProjectileView, fx: &mut HookEffects) -> HookResult {
        if self.pierce_target {
            self.pierce(fx)
        } else {
            HookResult::PASS
        }
    }

    fn on_hit_wall(&mut self, _view: &ProjectileView, fx: &mut HookEffects) -> HookResult {
        if self.pierce_wall {
            self.pierce(fx)
        } else {
            HookResult::PASS
        }
    }
}

/// Explodes when the projectile is removed after a matching event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplosiveModifier {
    /// Priority value.
    pub priority: i32,
    /// Fate on target hits. Target hits also stop the chain.
    pub target_fate: Fate,
    /// Fate on wall hits.
    pub wall_fate: Fate,
    /// Fate when range runs out.
    pub range_fate: Fate,
    /// Explode when removed after hitting an entity.
    pub explode_on_target: bool,
    /// Explode when removed after hitting a wall.
    pub explode_on_wall: bool,
    /// Explode when removed after running out of range.
    pub explode_on_range_met: bool,
    /// Blast radius.
    #[serde(with = "decimal_serde")]
    pub radius: Fixed,
    /// Area damage; zero for a purely cosmetic blast.
    #[serde(with = "decimal_serde")]
    pub damage: Fixed,
    /// Element of the area damage.
    pub element: Element,
}

impl Default for ExplosiveModifier {
    fn default() -> Self {
        Self {
            priority: 0,
            target_fate: Fate::Remove,
            wall_fate: Fate::Pass,
            range_fate: Fate::Pass,
            explode_on_target: true,
            explode_on_wall: false,
            explode_on_range_met: true,
            radius: Fixed::from_num(2),
            damage: Fixed::ZERO,
            element: Element::Explosive,
        }
    }
}

impl ExplosiveModifier {
    fn triggers_on(&self, event: LifecycleEvent) -> bool {
        match event {
            LifecycleEvent::HitTarget => self.explode_on_target,
            LifecycleEvent::HitWall => self.explode_on_wall,
            LifecycleEvent::RangeMet => self.explode_on_range_met,
            _ => false,
        }
    }
}

impl ProjectileModifier for ExplosiveModifier {
    fn kind(&self) -> ModifierKind {
        ModifierKind::Explosive
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn set_priority(&mut self, priority: i32) {
        self.priority = priority;
    }

    fn on_hit_target(&mut self, _view: &ProjectileView, _fx: &mut HookEffects) -> HookResult {
        HookResult::with_fate(self.target_fate).and_stop()
    }

    fn on_hit_wall(&mut self, _view: &ProjectileView, _fx: &mut HookEffects) -> HookResult {
        HookResult::with_fate(self.wall_fate)
    }

    fn on_range_met(&mut self, _view: &ProjectileView, _fx: &mut HookEffects) -> HookResult {
        HookResult::with_fate(self.range_fate)
    }

    fn on_remove(&mut self, view: &ProjectileView, fx: &mut HookEffects) {
        if self.triggers_on(view.last_event) {
            tracing::debug!(x = %view.position.x, y = %view.position.y, "Projectile exploded");
            fx.push(ModifierEffect::Explode {
                radius: self.radius,
                damage: self.damage,
                element: self.element,
            });
        }
    }
}

/// Sways the projectile sideways along a sine wave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HelixModifier {
    /// Priority value.
    pub priority: i32,
    /// Peak-to-peak sway width.
    #[serde(with = "decimal_serde")]
    pub width: Fixed,
    /// Full sway cycles per second.
    #[serde(with = "decimal_serde")]
    pub frequency: Fixed,
    /// Lateral offset applied so far.
    #[serde(with = "crate::math::fixed_serde")]
    offset: Fixed,
}

impl Default for HelixModifier {
    fn default() -> Self {
        Self {
            priority: 0,
            width: Fixed::ONE,
            frequency: Fixed::from_num(2),
            offset: Fixed::ZERO,
        }
    }
}

impl ProjectileModifier for HelixModifier {
    fn kind(&self) -> ModifierKind {
        ModifierKind::Helix
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn set_priority(&mut self, priority: i32) {
        self.priority = priority;
    }

    fn on_launch(&mut self) {
        self.offset = Fixed::ZERO;
    }

    fn on_update(&mut self, view: &ProjectileView, fx: &mut HookEffects) -> HookResult {
        let phase = crate::math::pi() * Fixed::from_num(2) * self.frequency * (view.age + view.delta);
        let target = self.width / Fixed::from_num(2) * sin(phase);
        let lateral = view.velocity.perpendicular().normalize();
        if !lateral.is_zero() && target != self.offset {
            fx.push(ModifierEffect::Sway(lateral * (target - self.offset)));
        }
        self.offset = target;
        HookResult::PASS
    }
}

/// A modifier of any kind.
///
/// Serialized with the variant as tag, e.g. `Bounce((bounces: 2))` in RON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Modifier {
    /// See [`BaseModifier`].
    None(BaseModifier),
    /// See [`BounceModifier`].
    Bounce(BounceModifier),
    /// See [`DummyModifier`].
    Dummy(DummyModifier),
    /// See [`ExplosiveModifier`].
    Explosive(ExplosiveModifier),
    /// See [`HelixModifier`].
    Helix(HelixModifier),
    /// See [`PierceModifier`].
    Pierce(PierceModifier),
}

impl Modifier {
    /// Default-configured modifier of a kind.
    #[must_use]
    pub fn from_kind(kind: ModifierKind) -> Self {
        match kind {
            ModifierKind::None => Self::None(BaseModifier::default()),
            ModifierKind::Bounce => Self::Bounce(BounceModifier::default()),
            ModifierKind::Dummy => Self::Dummy(DummyModifier::default()),
            ModifierKind::Explosive => Self::Explosive(ExplosiveModifier::default()),
            ModifierKind::Helix => Self::Helix(HelixModifier::default()),
            ModifierKind::Pierce => Self::Pierce(PierceModifier::default()),
        }
    }

    /// Borrow the hook set.
    #[must_use]
    pub fn hooks(&self) -> &dyn ProjectileModifier {
        match self {
            Self::None(m) => m,
            Self::Bounce(m) => m,
            Self::Dummy(m) => m,
            Self::Explosive(m) => m,
            Self::Helix(m) => m,
            Self::Pierce(m) => m,
        }
    }

    /// Mutably borrow the hook set.
    pub fn hooks_mut(&mut self) -> &mut dyn ProjectileModifier {
        match self {
            Self::None(m) => m,
            Self::Bounce(m) => m,
            Self::Dummy(m) => m,
            Self::Explosive(m) => m,
            Self::Helix(m) => m,
            Self::Pierce(m) => m,
        }
    }

    /// Variant tag.
    #[must_use]
    pub fn kind(&self) -> ModifierKind {
        self.hooks().kind()
    }

    /// Priority value.
    #[must_use]
    pub fn priority(&self) -> i32 {
        self.hooks().priority()
    }
}

/// Ordered list of modifiers owned by one projectile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModifierChain {
    modifiers: Vec<Modifier>,
}

impl From<Vec<Modifier>> for ModifierChain {
    fn from(modifiers: Vec<Modifier>) -> Self {
        Self { modifiers }
    }
}

impl ModifierChain {
    /// Empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of modifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.modifiers.len()
    }

    /// Whether the chain is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modifiers.is_empty()
    }

    /// Modifiers in execution order.
    pub fn iter(&self) -> impl Iterator<Item = &Modifier> {
        self.modifiers.iter()
    }

    /// Kinds in execution order.
    #[must_use]
    pub fn kinds(&self) -> Vec<ModifierKind> {
        self.modifiers.iter().map(Modifier::kind).collect()
    }

    /// Whether a modifier of `kind` is attached.
    #[must_use]
    pub fn contains(&self, kind: ModifierKind) -> bool {
        self.modifiers.iter().any(|m| m.kind() == kind)
    }

    /// Append a modifier at the end of the chain.
    pub fn add(&mut self, modifier: Modifier) {
        self.modifiers.push(modifier);
    }

    /// Append a default-configured modifier of `kind`.
    pub fn add_kind(&mut self, kind: ModifierKind) {
        self.add(Modifier::from_kind(kind));
    }

    /// Remove the first modifier of `kind`. Returns whether one was found.
    pub fn remove_kind(&mut self, kind: ModifierKind) -> bool {
        match self.modifiers.iter().position(|m| m.kind() == kind) {
            Some(index) => {
                self.modifiers.remove(index);
                true
            }
            None => false,
        }
    }

    /// Set the priority of the first modifier of `kind`.
    ///
    /// Execution order is the stored order and does not change.
    pub fn set_priority(&mut self, kind: ModifierKind, priority: i32) -> bool {
        match self.modifiers.iter_mut().find(|m| m.kind() == kind) {
            Some(modifier) => {
                modifier.hooks_mut().set_priority(priority);
                true
            }
            None => false,
        }
    }

    /// Bind every modifier to a freshly fired projectile.
    pub fn launch(&mut self) {
        for modifier in &mut self.modifiers {
            modifier.hooks_mut().on_launch();
        }
    }

    /// Run `on_update` over the chain.
    pub fn on_update(&mut self, view: &ProjectileView) -> ChainOutcome {
        self.dispatch(|m, fx| m.on_update(view, fx))
    }

    /// Run `on_hit_target` over the chain.
    pub fn on_hit_target(&mut self, view: &ProjectileView) -> ChainOutcome {
        self.dispatch(|m, fx| m.on_hit_target(view, fx))
    }

    /// Run `on_hit_wall` over the chain.
    pub fn on_hit_wall(&mut self, view: &ProjectileView) -> ChainOutcome {
        self.dispatch(|m, fx| m.on_hit_wall(view, fx))
    }

    /// Run `on_range_met` over the chain.
    pub fn on_range_met(&mut self, view: &ProjectileView) -> ChainOutcome {
        self.dispatch(|m, fx| m.on_range_met(view, fx))
    }

    /// Notify every modifier of a reflection.
    pub fn on_reflected(&mut self, view: &ProjectileView) {
        for modifier in &mut self.modifiers {
            modifier.hooks_mut().on_reflected(view);
        }
    }

    /// Notify every modifier of removal and collect their effects.
    pub fn on_remove(&mut self, view: &ProjectileView) -> Vec<ModifierEffect> {
        let mut effects = Vec::new();
        for modifier in &mut self.modifiers {
            let mut fx = HookEffects::default();
            modifier.hooks_mut().on_remove(view, &mut fx);
            effects.append(&mut fx.effects);
        }
        effects
    }

    fn dispatch(
        &mut self,
        mut hook: impl FnMut(&mut dyn ProjectileModifier, &mut HookEffects) -> HookResult,
    ) -> ChainOutcome {
        let mut outcome = ChainOutcome::default();
        let mut detached = Vec::new();

        for (index, modifier) in self.modifiers.iter_mut().enumerate() {
            let mut fx = HookEffects::default();
            let result = hook(modifier.hooks_mut(), &mut fx);

            outcome.effects.append(&mut fx.effects);
            if fx.detach {
                detached.push(index);
            }
            outcome.cancel_damage |= result.cancel_damage;
            if outcome.fate == Fate::Pass {
                outcome.fate = result.fate;
            }
            if result.stop {
                break;
            }
        }

        for index in detached.into_iter().rev() {
            self.modifiers.remove(index);
        }
        outcome
    }
}

/// Result of the modifier registry self-test.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifierTypeReport {
    /// Kinds that failed a check.
    pub infractions: usize,
    /// Kinds checked.
    pub total_cases: usize,
    /// One message per infraction.
    pub messages: Vec<String>,
}

/// Check that every modifier kind builds and reads back from its RON form
/// unchanged.
#[must_use]
pub fn test_modifier_types() -> ModifierTypeReport {
    let mut report = ModifierTypeReport {
        total_cases: ModifierKind::ALL.len(),
        ..ModifierTypeReport::default()
    };

    for kind in ModifierKind::ALL {
        let modifier = Modifier::from_kind(kind);
        if modifier.kind() != kind {
            report.infractions += 1;
            report
                .messages
                .push(format!("{kind:?} builds a {:?} modifier", modifier.kind()));
            continue;
        }

        let parsed = ron::to_string(&modifier)
            .map_err(|e| e.to_string())
            .and_then(|text| ron::from_str::<Modifier>(&text).map_err(|e| e.to_string()));
        match parsed {
            Ok(back) if back == modifier => {}
            Ok(back) => {
                report.infractions += 1;
                report
                    .messages
                    .push(format!("{kind:?} reads back from RON as {:?}", back.kind()));
            }
            Err(e) => {
                report.infractions += 1;
                report
                    .messages
                    .push(format!("{kind:?} does not survive a RON round trip: {e}"));
            }
        }
    }

    for message in &report.messages {
        tracing::warn!(%message, "Modifier type infraction");
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(event: LifecycleEvent) -> ProjectileView {
        ProjectileView {
            position: Vec2Fixed::ZERO,
            velocity: Vec2Fixed::from_num(10, 0),
            last_event: event,
            age: Fixed::ZERO,
            delta: Fixed::from_num(0.02),
        }
    }

    fn dummy(target: Fate, wall: Fate) -> Modifier {
        Modifier::Dummy(DummyModifier {
            target_fate: target,
            wall_fate: wall,
            ..DummyModifier::default()
        })
    }

    #[test]
    fn test_first_decisive_fate_wins() {
        let mut chain = ModifierChain::from(vec![
            Modifier::from_kind(ModifierKind::None),
            dummy(Fate::Pass, Fate::Keep),
            dummy(Fate::Pass, Fate::Remove),
        ]);
        let out = chain.on_hit_wall(&view(LifecycleEvent::HitWall));
        assert_eq!(out.fate, Fate::Keep);
        assert!(!out.removes());
    }

    #[test]
    fn test_stop_breaks_iteration() {
        // Dummy stops the chain on target hits, so the bounce never runs.
        let mut bounce = BounceModifier::new(3);
        bounce.bounce_off_target = true;
        let mut chain = ModifierChain::from(vec![
            dummy(Fate::Pass, Fate::Pass),
            Modifier::Bounce(bounce),
        ]);
        let out = chain.on_hit_target(&view(LifecycleEvent::HitTarget));
        assert_eq!(out.fate, Fate::Pass);
        assert!(out.effects.is_empty());
        assert!(out.removes());
    }

    #[test]
    fn test_empty_chain_passes() {
        let mut chain = ModifierChain::new();
        let out = chain.on_range_met(&view(LifecycleEvent::RangeMet));
        assert_eq!(out.fate, Fate::Pass);
        assert!(!out.cancel_damage);
    }

    #[test]
    fn test_bounce_detaches_when_spent() {
        let mut chain = ModifierChain::from(vec![Modifier::Bounce(BounceModifier::new(2))]);
        chain.launch();

        let first = chain.on_hit_wall(&view(LifecycleEvent::HitWall));
        assert_eq!(first.fate, Fate::Keep);
        assert_eq!(first.effects, vec![ModifierEffect::Bounce]);
        assert_eq!(chain.iter().next().map(Modifier::priority), Some(1));

        let second = chain.on_hit_wall(&view(LifecycleEvent::HitWall));
        assert_eq!(second.fate, Fate::Keep);
        assert!(chain.is_empty());

        let third = chain.on_hit_wall(&view(LifecycleEvent::HitWall));
        assert!(third.removes());
    }

    #[test]
    fn test_pierce_keeps_and_detaches() {
        let mut chain = ModifierChain::from(vec![Modifier::from_kind(ModifierKind::Pierce)]);
        let out = chain.on_hit_target(&view(LifecycleEvent::HitTarget));
        assert_eq!(out.fate, Fate::Keep);
        assert_eq!(out.effects, vec![ModifierEffect::PassThrough]);
        assert!(chain.is_empty());

        let mut walls = ModifierChain::from(vec![Modifier::from_kind(ModifierKind::Pierce)]);
        assert!(walls.on_hit_wall(&view(LifecycleEvent::HitWall)).removes());
        assert_eq!(walls.len(), 1);
    }

    #[test]
    fn test_explosive_triggers_on_matching_event() {
        let mut chain = ModifierChain::from(vec![Modifier::from_kind(ModifierKind::Explosive)]);
        assert!(chain.on_hit_target(&view(LifecycleEvent::HitTarget)).removes());

        let effects = chain.on_remove(&view(LifecycleEvent::HitTarget));
        assert!(matches!(effects[..], [ModifierEffect::Explode { .. }]));

        assert!(chain.on_remove(&view(LifecycleEvent::HitWall)).is_empty());
        assert_eq!(chain.on_remove(&view(LifecycleEvent::RangeMet)).len(), 1);
    }

    #[test]
    fn test_helix_sways_without_deciding_fate() {
        let mut chain = ModifierChain::from(vec![Modifier::from_kind(ModifierKind::Helix)]);
        chain.launch();
        let out = chain.on_update(&view(LifecycleEvent::Fired));
        assert_eq!(out.fate, Fate::Pass);
        match out.effects[..] {
            [ModifierEffect::Sway(offset)] => {
                assert_eq!(offset.x, Fixed::ZERO);
                assert!(offset.y != Fixed::ZERO);
            }
            _ => panic!("expected a single sway effect"),
        }
    }

    #[test]
    fn test_chain_editing() {
        let mut chain = ModifierChain::new();
        chain.add_kind(ModifierKind::Pierce);
        chain.add_kind(ModifierKind::Explosive);
        assert_eq!(chain.kinds(), vec![ModifierKind::Pierce, ModifierKind::Explosive]);

        assert!(chain.set_priority(ModifierKind::Explosive, 5));
        assert_eq!(chain.kinds(), vec![ModifierKind::Pierce, ModifierKind::Explosive]);
        assert!(!chain.set_priority(ModifierKind::Helix, 1));

        assert!(chain.remove_kind(ModifierKind::Pierce));
        assert!(!chain.remove_kind(ModifierKind::Pierce));
        assert_eq!(chain.kinds(), vec![ModifierKind::Explosive]);
        assert_eq!(chain.iter().next().map(Modifier::priority), Some(5));
    }

    #[test]
    fn test_cloned_chains_do_not_share_counters() {
        let prototype = ModifierChain::from(vec![Modifier::Bounce(BounceModifier::new(2))]);
        let mut first = prototype.clone();
        let second = prototype.clone();
        first.on_hit_wall(&view(LifecycleEvent::HitWall));
        assert_ne!(first, second);
        assert_eq!(second, prototype);
    }

    #[test]
    fn test_modifier_types() {
        let report = super::test_modifier_types();
        assert_eq!(report.infractions, 0);
        assert_eq!(report.total_cases, ModifierKind::ALL.len());
    }

    #[test]
    fn test_configured_modifier_reads_back_from_ron() {
        let helix = Modifier::Helix(HelixModifier {
            width: Fixed::from_num(0.5),
            frequency: Fixed::from_num(3),
            ..HelixModifier::default()
        });
        let text = ron::to_string(&helix).unwrap();
        let back: Modifier = ron::from_str(&text).unwrap();
        assert_eq!(back, helix);
        assert_ne!(back, Modifier::from_kind(ModifierKind::Helix));
    }

    #[test]
    fn test_chain_from_ron() {
        let chain: ModifierChain =
            ron::from_str("[Bounce((bounces: 3)), Explosive((radius: 1.5, damage: 10.0))]").unwrap();
        assert_eq!(chain.kinds(), vec![ModifierKind::Bounce, ModifierKind::Explosive]);
        let second = chain.iter().nth(1);
        match second {
            Some(Modifier::Explosive(m)) => {
                assert_eq!(m.radius, Fixed::from_num(1.5));
                assert_eq!(m.target_fate, Fate::Remove);
            }
            other => panic!("unexpected modifier {other:?}"),
        }
    }
}
