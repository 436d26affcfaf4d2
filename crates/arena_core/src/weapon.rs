//! Gun firing state machine.
//!
//! A gun moves between four states:
//!
//! - `Idle` to `Recovering` when the trigger fires a burst.
//! - `Recovering` to `Idle` once the burst window has elapsed.
//! - `Idle`/`Recovering` to `Reloading` to `Idle` on reload.
//! - any state to `Switching` to `Idle` when equipped.
//!
//! All timers are deadlines compared against the simulation clock. Shots
//! are never late: a shot owed partway through a tick is fired with a
//! catch-up offset, and its projectile is spawned already advanced by
//! `speed * offset` along its path.

use serde::{Deserialize, Serialize};

use crate::data::{FiringType, GunStats, WeaponConfig};
use crate::entity::EntityId;
use crate::factions::Faction;
use crate::magazine::{Magazine, SimpleMag};
use crate::math::{option_fixed_serde, Fixed, Vec2Fixed};
use crate::physics::{LayerMask, PhysicsQuery};
use crate::projectile::ProjectileSpec;
use crate::rng::SimRng;

/// Radius of the muzzle overlap check against map geometry.
pub const BARREL_CHECK_RADIUS: Fixed = Fixed::from_bits(858_993_459); // 0.2

/// Upper bound on shots fired by a single gun in one update.
pub const MAX_SHOTS_PER_UPDATE: u32 = 16;

/// Burst index used while an unbounded burst is running.
pub const UNBOUNDED_BURST: i32 = 999;

/// Gun state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GunState {
    /// Ready.
    #[default]
    Idle,
    /// Firing or cooling down after a burst.
    Recovering,
    /// Reloading.
    Reloading,
    /// Being equipped.
    Switching,
}

/// A projectile the gun wants spawned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShotRequest {
    /// Per-shot spec clone.
    pub spec: ProjectileSpec,
    /// Spawn position, already advanced by the catch-up offset.
    pub position: Vec2Fixed,
    /// Unit heading including spread.
    pub direction: Vec2Fixed,
    /// Simulation time the shot was due.
    pub fired_at: Fixed,
    /// How late the shot is relative to `fired_at`.
    pub offset: Fixed,
    /// Holder of the gun.
    pub source: Option<EntityId>,
}

/// Everything a gun may consult or produce during one call.
pub struct GunContext<'a> {
    /// Simulation clock.
    pub now: Fixed,
    /// Muzzle position.
    pub barrel: Vec2Fixed,
    /// Aim direction.
    pub aim: Vec2Fixed,
    /// Holder of the gun.
    pub source: Option<EntityId>,
    /// Physics used for the barrel check.
    pub physics: &'a dyn PhysicsQuery,
    /// Simulation random stream.
    pub rng: &'a mut SimRng,
    /// Output queue of shots.
    pub shots: &'a mut Vec<ShotRequest>,
}

/// Behaviour shared by every held weapon.
pub trait Weapon {
    /// Start equipping.
    fn equip(&mut self, now: Fixed);

    /// Stop all actions and deactivate.
    fn put_away(&mut self);

    /// Primary action, level-triggered once per tick.
    fn action1(&mut self, pressed: bool, ctx: &mut GunContext<'_>);

    /// Secondary action, level-triggered once per tick.
    fn action2(&mut self, pressed: bool, ctx: &mut GunContext<'_>);

    /// Cancel burst, reload and equip.
    fn interrupt_actions(&mut self);

    /// Advance timers.
    fn update(&mut self, ctx: &mut GunContext<'_>);
}

/// Map a uniform sample `r` in `[0, 1)` to a spread fraction.
///
/// Two linear slopes meet at `r = 0.5 + accuracy / 2`; higher accuracy
/// pushes most of the mass toward zero. Accuracy of 1 or more always
/// returns zero.
#[must_use]
pub fn accuracy_modifier(accuracy: Fixed, r: Fixed) -> Fixed {
    if accuracy >= Fixed::ONE {
        return Fixed::ZERO;
    }
    let knee = Fixed::from_num(0.5) + accuracy / Fixed::from_num(2);
    if r <= knee {
        r * (Fixed::ONE - accuracy)
    } else {
        Fixed::ONE - (Fixed::ONE - r) / (Fixed::ONE - accuracy)
    }
}

fn elapsed(since: Option<Fixed>, delay: Fixed, now: Fixed) -> bool {
    since.map_or(true, |t| now >= t + delay)
}

/// Configured gun with its runtime state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gun {
    config: WeaponConfig,
    state: GunState,
    burst_index: i32,
    #[serde(with = "option_fixed_serde")]
    time_equipped: Option<Fixed>,
    #[serde(with = "option_fixed_serde")]
    reload_started: Option<Fixed>,
    #[serde(with = "option_fixed_serde")]
    last_burst_started: Option<Fixed>,
    #[serde(with = "option_fixed_serde")]
    last_fired: Option<Fixed>,
    action1_released: bool,
    action2_released: bool,
    enabled: bool,
    active: bool,
}

impl Gun {
    /// Build a gun from its config. The magazine starts empty until
    /// [`Gun::initialize`].
    #[must_use]
    pub fn new(config: WeaponConfig) -> Self {
        Self {
            config,
            state: GunState::Idle,
            burst_index: -1,
            time_equipped: None,
            reload_started: None,
            last_burst_started: None,
            last_fired: None,
            action1_released: true,
            action2_released: true,
            enabled: true,
            active: false,
        }
    }

    /// Bind the gun to its holder's faction and fill the magazine.
    pub fn initialize(&mut self, faction: Faction) {
        self.config.magazine.initialize(faction);
    }

    /// Weapon id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.config.id
    }

    /// Current config, including validation fixes.
    #[must_use]
    pub const fn config(&self) -> &WeaponConfig {
        &self.config
    }

    /// Current stats.
    #[must_use]
    pub const fn stats(&self) -> &GunStats {
        &self.config.stats
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> GunState {
        self.state
    }

    /// Shots left in the running burst; -1 when not bursting.
    #[must_use]
    pub const fn burst_index(&self) -> i32 {
        self.burst_index
    }

    /// Magazine.
    #[must_use]
    pub const fn magazine(&self) -> &SimpleMag {
        &self.config.magazine
    }

    /// Mutable magazine.
    pub fn magazine_mut(&mut self) -> &mut SimpleMag {
        &mut self.config.magazine
    }

    /// `(current, max)` ammo.
    #[must_use]
    pub fn ammo(&self) -> (u32, u32) {
        self.config.magazine.ammo()
    }

    /// Whether validation left the gun able to fire.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether the gun is currently equipped.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Distance from the holder's collider to the muzzle.
    #[must_use]
    pub const fn barrel_offset(&self) -> Fixed {
        self.config.barrel_offset
    }

    /// Whether map geometry overlaps the muzzle.
    #[must_use]
    pub fn is_barrel_blocked(&self, ctx: &GunContext<'_>) -> bool {
        ctx.physics
            .overlap_circle(ctx.barrel, BARREL_CHECK_RADIUS, LayerMask::MAP)
    }

    /// Whether a shot may be fired right now.
    #[must_use]
    pub fn can_shoot(&self, ctx: &GunContext<'_>) -> bool {
        self.enabled
            && self.config.magazine.can_fire()
            && matches!(self.state, GunState::Idle | GunState::Recovering)
            && elapsed(self.last_fired, self.config.stats.fire_delay, ctx.now)
            && !self.is_barrel_blocked(ctx)
    }

    /// Whether a new burst may start right now.
    #[must_use]
    pub fn can_burst(&self, ctx: &GunContext<'_>) -> bool {
        elapsed(self.last_burst_started, self.config.stats.burst_delay, ctx.now)
            && self.can_shoot(ctx)
    }

    /// Whether a reload may start.
    #[must_use]
    pub fn can_reload(&self) -> bool {
        let (current, max) = self.config.magazine.ammo();
        current < max && matches!(self.state, GunState::Idle | GunState::Recovering)
    }

    fn is_unbounded(&self) -> bool {
        self.config.stats.burst_count < 0
    }

    /// Fix config problems in place and report them.
    ///
    /// A burst count of 1 becomes 0 and a burst delay shorter than a full
    /// burst is raised. A weapon without an id, magazine capacity or
    /// pellets is disabled.
    pub fn validate(&mut self) -> Vec<String> {
        let mut infractions = Vec::new();
        let id = self.config.id.clone();
        let stats = &mut self.config.stats;

        if id.is_empty() {
            infractions.push("Weapon has no id".to_string());
            self.enabled = false;
        }

        if stats.burst_count == 1 {
            stats.burst_count = 0;
            infractions.push(format!("Burst count of 1 on '{id}'; use 0 instead"));
        }

        if stats.burst_count > 1 {
            let full_burst = stats.fire_delay * Fixed::from_num(stats.burst_count);
            if stats.burst_delay < full_burst {
                stats.burst_delay = full_burst;
                infractions.push(format!("Burst delay too short on '{id}'; set to {full_burst}"));
            }
        }

        if self.config.magazine.mag_size == 0 {
            infractions.push(format!("Magazine of '{id}' has no capacity"));
            self.enabled = false;
        }

        if self.config.magazine.bullets_per_shot == 0 {
            infractions.push(format!("Magazine of '{id}' fires no bullets"));
            self.enabled = false;
        }

        for message in &infractions {
            tracing::warn!(weapon = %id, %message, "Weapon infraction");
        }
        infractions
    }

    fn start_burst(&mut self, held: bool, ctx: &mut GunContext<'_>) {
        let stats = self.config.stats;
        self.burst_index = match stats.burst_count {
            n if n > 1 => n - 1,
            n if n < 0 => UNBOUNDED_BURST,
            _ => -1,
        };

        let window = stats.burst_delay * Fixed::from_num(MAX_SHOTS_PER_UPDATE);
        let catch_up = self.last_burst_started.map(|t| t + stats.burst_delay).filter(|due| {
            held && (0..2).contains(&stats.burst_count)
                && stats.burst_delay > Fixed::ZERO
                && ctx.now - *due < window
        });

        match catch_up {
            Some(due) => self.catch_up_single(due, ctx),
            None => {
                self.last_burst_started = Some(ctx.now);
                self.last_fired = Some(ctx.now);
                self.shoot(ctx.now, Fixed::ZERO, ctx);
            }
        }
    }

    /// Held re-fire of single shots, firing every interval still owed.
    fn catch_up_single(&mut self, mut due: Fixed, ctx: &mut GunContext<'_>) {
        let burst_delay = self.config.stats.burst_delay;
        let mut fired = 0;
        loop {
            self.last_burst_started = Some(due);
            self.last_fired = Some(due);
            self.shoot(due, ctx.now - due, ctx);
            fired += 1;

            let next = due + burst_delay;
            if fired >= MAX_SHOTS_PER_UPDATE || ctx.now < next || !self.can_shoot(ctx) {
                break;
            }
            due = next;
        }

        if fired > 1 {
            tracing::warn!(weapon = %self.config.id, shots = fired, "Firing multiple shots in one update");
        }
    }

    fn cancel_burst(&mut self) -> bool {
        if self.burst_index >= 0 {
            self.burst_index = -1;
            true
        } else {
            false
        }
    }

    fn shoot(&mut self, fired_at: Fixed, offset: Fixed, ctx: &mut GunContext<'_>) {
        self.state = GunState::Recovering;

        let stats = self.config.stats;
        let pellets = self.config.magazine.bullets_per_shot();
        let aim = ctx.aim.normalize();
        for i in 0..pellets {
            let Some(spec) = self.config.magazine.next_bullet(i + 1 == pellets) else {
                break;
            };

            let r = ctx.rng.unit();
            let angle = accuracy_modifier(stats.accuracy, r) * stats.spread * ctx.rng.sign();
            let direction = aim.rotate_deg(angle).normalize();
            let mut position = ctx.barrel;
            if offset > Fixed::ZERO {
                position += direction * (spec.stats.speed * offset);
            }

            ctx.shots.push(ShotRequest {
                spec,
                position,
                direction,
                fired_at,
                offset,
                source: ctx.source,
            });
        }

        tracing::debug!(
            weapon = %self.config.id,
            fired_at = %fired_at,
            offset = %offset,
            pellets,
            "Gun fired"
        );
    }

    fn start_reload(&mut self, now: Fixed) {
        self.cancel_burst();
        self.reload_started = Some(now);
        self.state = GunState::Reloading;
        tracing::debug!(weapon = %self.config.id, "Reload started");
    }

    fn cancel_reload(&mut self) -> bool {
        if self.state == GunState::Reloading {
            self.state = GunState::Idle;
            self.reload_started = None;
            true
        } else {
            false
        }
    }

    fn end_reload(&mut self) {
        match self.config.reload_partial {
            Some(rounds) => self.config.magazine.reload_by(rounds),
            None => self.config.magazine.reload(),
        };
        self.state = GunState::Idle;
        self.reload_started = None;
        tracing::debug!(weapon = %self.config.id, ammo = ?self.ammo(), "Reload finished");
    }

    fn cancel_equip(&mut self) -> bool {
        if self.state == GunState::Switching {
            self.time_equipped = None;
            true
        } else {
            false
        }
    }

    /// One pass over the state machine. Returns `true` when another
    /// mid-burst shot is already owed.
    fn update_once(&mut self, ctx: &mut GunContext<'_>) -> bool {
        let stats = self.config.stats;
        match self.state {
            GunState::Idle => false,
            GunState::Reloading => {
                if elapsed(self.reload_started, stats.reload_delay, ctx.now) {
                    self.end_reload();
                }
                false
            }
            GunState::Switching => {
                if elapsed(self.time_equipped, stats.equip_delay, ctx.now) {
                    self.state = GunState::Idle;
                }
                false
            }
            GunState::Recovering if self.burst_index < 0 => {
                if elapsed(self.last_burst_started, stats.burst_delay, ctx.now)
                    && self.action1_released
                {
                    self.state = GunState::Idle;
                }
                false
            }
            GunState::Recovering if self.burst_index == 0 => {
                if elapsed(self.last_fired, stats.fire_delay, ctx.now)
                    && elapsed(self.last_burst_started, stats.burst_delay, ctx.now)
                {
                    self.state = GunState::Idle;
                    self.burst_index = -1;
                }
                false
            }
            GunState::Recovering => {
                if self.is_unbounded() && self.action1_released {
                    self.cancel_burst();
                    return false;
                }
                if !elapsed(self.last_fired, stats.fire_delay, ctx.now) {
                    return false;
                }
                if !self.can_shoot(ctx) {
                    self.cancel_burst();
                    return false;
                }

                let due = self.last_fired.map_or(ctx.now, |t| t + stats.fire_delay);
                self.last_fired = Some(due);
                if !self.is_unbounded() {
                    self.burst_index -= 1;
                }
                self.shoot(due, ctx.now - due, ctx);
                ctx.now >= due + stats.fire_delay
            }
        }
    }
}

impl Weapon for Gun {
    fn equip(&mut self, now: Fixed) {
        self.time_equipped = Some(now);
        self.state = GunState::Switching;
        self.active = true;
    }

    fn put_away(&mut self) {
        self.interrupt_actions();
        self.time_equipped = None;
        self.active = false;
    }

    fn action1(&mut self, pressed: bool, ctx: &mut GunContext<'_>) {
        if !pressed {
            self.action1_released = true;
            return;
        }

        let held = !self.action1_released;
        if (held && self.config.firing_type == FiringType::SemiAuto) || self.burst_index >= 0 {
            return;
        }

        if self.can_burst(ctx) {
            self.start_burst(held, ctx);
            self.action1_released = false;
        } else if self.config.reload_on_empty_fire
            && self.config.magazine.ammo().0 == 0
            && self.can_reload()
        {
            self.start_reload(ctx.now);
            self.action1_released = true;
        }
    }

    fn action2(&mut self, pressed: bool, ctx: &mut GunContext<'_>) {
        if !pressed {
            self.action2_released = true;
            return;
        }

        self.action2_released = false;
        if self.config.action2_is_reload && self.can_reload() {
            self.start_reload(ctx.now);
            self.action1_released = true;
        }
    }

    fn interrupt_actions(&mut self) {
        self.cancel_burst();
        self.cancel_reload();
        self.cancel_equip();
        self.action1_released = true;
        self.action2_released = true;
    }

    fn update(&mut self, ctx: &mut GunContext<'_>) {
        let mut passes = 1;
        while self.update_once(ctx) {
            if passes >= MAX_SHOTS_PER_UPDATE {
                break;
            }
            passes += 1;
        }
        if passes > 1 {
            tracing::warn!(weapon = %self.config.id, shots = passes, "Firing multiple shots in one update");
        }
    }
}
