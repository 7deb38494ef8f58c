//! The per-adversary record.
//!
//! A [`Combatant`] pairs a [`Body`] (everything every archetype shares: HP,
//! phase, skills, position) with a [`Brain`] (the archetype's state machine).
//! Splitting the two lets a brain mutate the body it drives without fighting
//! the borrow checker.

use std::hash::Hasher;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::archetypes::{ArchetypeKind, Brain, Role};
use crate::config::EncounterConfig;
use crate::context::{EncounterContext, PlayerSnapshot};
use crate::death::{DamageOutcome, DefeatReport, TerminalLatch};
use crate::encounter::PhaseChange;
use crate::math::{decimal_serde, ratio, Fixed, Vec2Fixed};
use crate::phase::{PhaseController, PhaseFlags};
use crate::skills::SkillCooldownBank;

/// Unique identifier for a combatant within a session.
pub type CombatantId = u32;

/// Clamped hit points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Vitals {
    current: Fixed,
    max: Fixed,
}

impl Vitals {
    /// Full HP.
    #[must_use]
    pub fn new(max: Fixed) -> Self {
        let max = max.max(Fixed::ZERO);
        Self { current: max, max }
    }

    /// Current HP.
    #[must_use]
    pub fn current(&self) -> Fixed {
        self.current
    }

    /// Maximum HP.
    #[must_use]
    pub fn max(&self) -> Fixed {
        self.max
    }

    /// Whether HP reached zero.
    #[must_use]
    pub fn is_depleted(&self) -> bool {
        self.current <= Fixed::ZERO
    }

    /// `current / max`, zero when max is zero.
    #[must_use]
    pub fn ratio(&self) -> Fixed {
        if self.max <= Fixed::ZERO {
            Fixed::ZERO
        } else {
            self.current / self.max
        }
    }

    /// Apply damage, returning actual damage dealt.
    pub fn apply_damage(&mut self, amount: Fixed) -> Fixed {
        let actual = amount.max(Fixed::ZERO).min(self.current);
        self.current -= actual;
        actual
    }

    /// Heal, returning the amount actually restored.
    pub fn heal(&mut self, amount: Fixed) -> Fixed {
        let headroom = self.max - self.current;
        let actual = amount.max(Fixed::ZERO).min(headroom);
        self.current += actual;
        actual
    }
}

/// Where a combatant is in its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Lifecycle {
    /// Fighting.
    Active,
    /// Killed through damage; awaiting the next sweep.
    Defeated,
    /// Exploded on its own; awaiting the next sweep.
    SelfDestructed,
    /// Removed because its summoner fell; awaiting the next sweep.
    Dismissed,
}

/// State label exposed to readers, covering every archetype's states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateLabel {
    /// Default pursuit.
    Chase,
    /// Chalk volley.
    Volley,
    /// Pop-quiz ring wind-up.
    PopQuiz,
    /// Equation slam.
    EquationSlam,
    /// Deadly graph.
    DeadlyGraph,
    /// Bark cone.
    Bark,
    /// Goldfish summon.
    GoldfishSwarm,
    /// Bubble volley.
    BubblePrison,
    /// Log 4.57 charge (invulnerable).
    Charging,
    /// Disabled.
    Stunned,
    /// Leap.
    FreeFall,
    /// Sandwich throw.
    SandwichToss,
    /// Grounding pulse.
    EmpPulse,
    /// Dog dash.
    Lunge,
    /// Terminal.
    Defeated,
    /// Left the fight without being defeated.
    Gone,
}

/// Fields shared by every archetype.
#[derive(Debug, Clone)]
pub struct Body {
    /// Session id.
    pub id: CombatantId,
    /// Archetype tag.
    pub kind: ArchetypeKind,
    /// Primary or auxiliary.
    pub role: Role,
    /// Summoner, for auxiliaries.
    pub owner: Option<CombatantId>,
    /// World position.
    pub position: Vec2Fixed,
    /// Units per second.
    pub velocity: Vec2Fixed,
    /// Collision radius.
    pub radius: Fixed,
    /// Hit points.
    pub vitals: Vitals,
    /// Phase tracking.
    pub phases: PhaseController,
    /// Skill cooldowns.
    pub skills: SkillCooldownBank,
    /// Damage is discarded while set.
    pub invulnerable: bool,
    /// Death-sequence guard.
    pub latch: TerminalLatch,
    /// HP and reward scalar fixed at construction.
    pub difficulty: Fixed,
    /// Base pursuit speed.
    pub move_speed: Fixed,
    /// Phase speed multiplier.
    pub speed_multiplier: Fixed,
    /// Contact and fire-rate bonus (log 4.57).
    pub attack_bonus: Fixed,
    /// Contact damage from the balance table.
    pub contact_damage: Fixed,
    /// Reward at difficulty 1.
    pub base_reward: Fixed,
    /// Kru Manop rides the dog.
    pub rider: bool,
    /// Lifetime stage.
    pub lifecycle: Lifecycle,
}

impl Body {
    /// Current pursuit speed.
    #[must_use]
    pub fn speed(&self) -> Fixed {
        self.move_speed.saturating_mul(self.speed_multiplier)
    }

    /// Point `offset` units above the body, for floating text.
    #[must_use]
    pub fn above(&self, offset: i32) -> Vec2Fixed {
        self.position - Vec2Fixed::from_ints(0, offset)
    }

    /// Heading from the body toward the player.
    #[must_use]
    pub fn heading_to(&self, player: &PlayerSnapshot) -> Fixed {
        self.position.angle_to(player.position)
    }

    /// Whether the player is within `range`.
    #[must_use]
    pub fn in_range(&self, player: &PlayerSnapshot, range: Fixed) -> bool {
        self.position.within(player.position, range)
    }

    /// Whether the bodies overlap.
    #[must_use]
    pub fn touching(&self, player: &PlayerSnapshot) -> bool {
        self.in_range(player, self.radius + player.radius)
    }

    /// Steer straight at a visible player; drift to a stop when the player hides.
    pub fn pursue(&mut self, player: &PlayerSnapshot) {
        if player.hidden {
            self.damp(ratio(19, 20));
            return;
        }
        let direction = (player.position - self.position).normalize();
        self.velocity = direction.scale(self.speed());
    }

    /// Multiply velocity by `factor`.
    pub fn damp(&mut self, factor: Fixed) {
        self.velocity = self.velocity.scale(factor);
    }

    /// Stop moving.
    pub fn halt(&mut self) {
        self.velocity = Vec2Fixed::ZERO;
    }

    /// Move by velocity × dt.
    pub fn integrate(&mut self, dt: Fixed) {
        self.position += self.velocity.scale(dt);
    }

    /// Leave the fight by exploding (kamikaze). Returns `false` if already gone.
    pub fn self_destruct(&mut self) -> bool {
        if self.lifecycle != Lifecycle::Active || !self.latch.try_lock() {
            return false;
        }
        self.lifecycle = Lifecycle::SelfDestructed;
        self.halt();
        true
    }

    /// Melee damage while overlapping the player, per second and scaled by the attack bonus.
    pub fn apply_contact(&self, ctx: &mut EncounterContext<'_>) {
        if ctx.dt <= Fixed::ZERO || !self.touching(ctx.player) {
            return;
        }
        let amount = self
            .contact_damage
            .saturating_mul(ctx.dt)
            .saturating_mul(Fixed::ONE + self.attack_bonus);
        ctx.hooks.damage_player(amount);
    }
}

/// Read-only snapshot for HUDs and tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatantView {
    /// Session id.
    pub id: CombatantId,
    /// Archetype.
    pub kind: ArchetypeKind,
    /// Primary or auxiliary.
    pub role: Role,
    /// World position.
    pub position: Vec2Fixed,
    /// Current state.
    pub state: StateLabel,
    /// Seconds in the current state.
    #[serde(with = "decimal_serde")]
    pub state_timer: Fixed,
    /// Current phase.
    pub phase: u8,
    /// Current HP.
    #[serde(with = "decimal_serde")]
    pub hp: Fixed,
    /// Maximum HP.
    #[serde(with = "decimal_serde")]
    pub max_hp: Fixed,
    /// `hp / max_hp`.
    #[serde(with = "decimal_serde")]
    pub hp_ratio: Fixed,
    /// Damage is currently discarded.
    pub invulnerable: bool,
    /// Death sequence has run.
    pub terminal_locked: bool,
    /// Phase speed multiplier.
    #[serde(with = "decimal_serde")]
    pub speed_multiplier: Fixed,
    /// Log 4.57 attack bonus.
    #[serde(with = "decimal_serde")]
    pub attack_bonus: Fixed,
}

/// One active adversary.
#[derive(Debug, Clone)]
pub struct Combatant {
    body: Body,
    brain: Brain,
}

impl Combatant {
    /// Build a combatant at full HP, scaled by `difficulty`.
    #[must_use]
    pub fn new(
        id: CombatantId,
        kind: ArchetypeKind,
        role: Role,
        owner: Option<CombatantId>,
        position: Vec2Fixed,
        difficulty: Fixed,
        rider: bool,
        phase_flags: Option<PhaseFlags>,
        config: &EncounterConfig,
    ) -> Self {
        let stats = config.body(kind);
        let gates = config.phase_gates(kind);
        let flags = phase_flags.unwrap_or_else(|| PhaseFlags::from_gates(gates));

        let body = Body {
            id,
            kind,
            role,
            owner,
            position,
            velocity: Vec2Fixed::ZERO,
            radius: stats.radius,
            vitals: Vitals::new(stats.base_hp.saturating_mul(difficulty)),
            phases: PhaseController::from_config(gates, flags),
            skills: SkillCooldownBank::from_config(config.skills(kind)),
            invulnerable: false,
            latch: TerminalLatch::new(),
            difficulty,
            move_speed: stats.move_speed,
            speed_multiplier: Fixed::ONE,
            attack_bonus: Fixed::ZERO,
            contact_damage: stats.contact_damage,
            base_reward: stats.reward,
            rider,
            lifecycle: Lifecycle::Active,
        };
        let mut combatant = Self {
            body,
            brain: Brain::new(kind, config),
        };
        combatant.brain.archetype_mut().on_spawn(&mut combatant.body);
        combatant
    }

    /// Session id.
    #[must_use]
    pub fn id(&self) -> CombatantId {
        self.body.id
    }

    /// Shared fields.
    #[must_use]
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Whether the combatant still takes part in the fight.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.body.lifecycle == Lifecycle::Active
    }

    /// Current state label.
    #[must_use]
    pub fn state_label(&self) -> StateLabel {
        match self.body.lifecycle {
            Lifecycle::Active => self.brain.archetype().label(),
            Lifecycle::Defeated => StateLabel::Defeated,
            Lifecycle::SelfDestructed | Lifecycle::Dismissed => StateLabel::Gone,
        }
    }

    /// Read-only snapshot.
    #[must_use]
    pub fn view(&self) -> CombatantView {
        let body = &self.body;
        CombatantView {
            id: body.id,
            kind: body.kind,
            role: body.role,
            position: body.position,
            state: self.state_label(),
            state_timer: self.brain.archetype().state_timer(),
            phase: body.phases.current(),
            hp: body.vitals.current(),
            max_hp: body.vitals.max(),
            hp_ratio: body.vitals.ratio(),
            invulnerable: body.invulnerable,
            terminal_locked: body.latch.is_locked(),
            speed_multiplier: body.speed_multiplier,
            attack_bonus: body.attack_bonus,
        }
    }

    /// Advance one frame: phases, cooldowns, then the archetype's state machine.
    pub(crate) fn tick(&mut self, ctx: &mut EncounterContext<'_>) {
        if !self.is_active() {
            return;
        }
        self.evaluate_phases(ctx);
        self.body.skills.tick(ctx.dt);
        self.brain.archetype_mut().tick(&mut self.body, ctx);
    }

    /// Apply already-sanitized damage.
    pub(crate) fn take_damage(
        &mut self,
        amount: Fixed,
        ctx: &mut EncounterContext<'_>,
    ) -> DamageOutcome {
        if amount <= Fixed::ZERO || self.body.latch.is_locked() || !self.is_active() {
            return DamageOutcome::Ignored;
        }
        if self.body.invulnerable {
            trace!(id = self.body.id, "damage discarded, invulnerable");
            ctx.hooks
                .spawn_floating_text("INVINCIBLE!", self.body.above(40), "#facc15", 20);
            return DamageOutcome::Discarded;
        }

        self.body.vitals.apply_damage(amount);
        if self.body.vitals.is_depleted() {
            return self.run_terminal_sequence(ctx);
        }

        self.evaluate_phases(ctx);
        DamageOutcome::Applied {
            remaining: self.body.vitals.current(),
        }
    }

    /// Force the disabled state. Returns `false` if the archetype resisted.
    pub(crate) fn stagger(&mut self, ctx: &mut EncounterContext<'_>) -> bool {
        if !self.is_active() {
            return false;
        }
        self.brain.archetype_mut().stagger(&mut self.body, ctx)
    }

    /// Remove from the fight without a defeat. Returns `false` if already gone.
    pub(crate) fn dismiss(&mut self) -> bool {
        if !self.is_active() || !self.body.latch.try_lock() {
            return false;
        }
        self.body.lifecycle = Lifecycle::Dismissed;
        self.body.invulnerable = false;
        self.body.halt();
        true
    }

    fn evaluate_phases(&mut self, ctx: &mut EncounterContext<'_>) {
        let entered = self
            .body
            .phases
            .evaluate(self.body.vitals.current(), self.body.vitals.max());
        for phase in entered {
            debug!(id = self.body.id, kind = ?self.body.kind, phase, "phase entered");
            ctx.events.phase_changes.push(PhaseChange {
                id: self.body.id,
                phase,
            });
            self.brain
                .archetype_mut()
                .on_phase_entered(phase, &mut self.body, ctx);
        }
    }

    fn run_terminal_sequence(&mut self, ctx: &mut EncounterContext<'_>) -> DamageOutcome {
        let closed = self.body.latch.try_lock();
        debug_assert!(closed, "terminal sequence entered twice for {}", self.body.id);
        if !closed {
            return DamageOutcome::Ignored;
        }

        self.body.lifecycle = Lifecycle::Defeated;
        self.body.invulnerable = false;
        self.body.halt();

        let reward = self.body.base_reward.saturating_mul(self.body.difficulty);
        ctx.hooks.grant_reward(reward);
        self.brain.archetype_mut().on_defeated(&mut self.body, ctx);

        debug!(id = self.body.id, kind = ?self.body.kind, reward = %reward, "combatant defeated");
        DamageOutcome::Defeated(DefeatReport {
            id: self.body.id,
            kind: self.body.kind,
            role: self.body.role,
            position: self.body.position,
            reward,
            advances_wave: self.body.role == Role::Primary,
        })
    }

    /// Feed everything that affects future behaviour into `state`.
    pub(crate) fn hash_state(&self, state: &mut dyn Hasher) {
        let body = &self.body;
        state.write_u32(body.id);
        state.write_u8(body.kind.code());
        state.write_u8(body.lifecycle as u8);
        state.write_i64(body.position.x.to_bits());
        state.write_i64(body.position.y.to_bits());
        state.write_i64(body.velocity.x.to_bits());
        state.write_i64(body.velocity.y.to_bits());
        state.write_i64(body.vitals.current().to_bits());
        state.write_i64(body.vitals.max().to_bits());
        state.write_u8(body.phases.current());
        state.write_u8(u8::from(body.invulnerable));
        state.write_u8(u8::from(body.latch.is_locked()));
        state.write_i64(body.speed_multiplier.to_bits());
        state.write_i64(body.attack_bonus.to_bits());
        for slot in body.skills.iter() {
            state.write_u8(slot.id.code());
            state.write_i64(slot.remaining.to_bits());
            state.write_u8(u8::from(slot.enabled));
        }
        self.brain.archetype().hash_state(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vitals_clamp_both_ways() {
        let mut vitals = Vitals::new(Fixed::from_num(100));
        assert_eq!(vitals.apply_damage(Fixed::from_num(150)), Fixed::from_num(100));
        assert_eq!(vitals.current(), Fixed::ZERO);
        assert!(vitals.is_depleted());

        assert_eq!(vitals.heal(Fixed::from_num(500)), Fixed::from_num(100));
        assert_eq!(vitals.current(), Fixed::from_num(100));
        assert_eq!(vitals.ratio(), Fixed::ONE);
    }

    #[test]
    fn test_vitals_ignore_negative_amounts() {
        let mut vitals = Vitals::new(Fixed::from_num(10));
        assert_eq!(vitals.apply_damage(Fixed::from_num(-5)), Fixed::ZERO);
        assert_eq!(vitals.heal(Fixed::from_num(-5)), Fixed::ZERO);
        assert_eq!(vitals.current(), Fixed::from_num(10));
    }

    #[test]
    fn test_new_scales_hp_by_difficulty() {
        let config = EncounterConfig::default();
        let boss = Combatant::new(
            1,
            ArchetypeKind::KruManop,
            Role::Primary,
            None,
            Vec2Fixed::ZERO,
            Fixed::from_num(2),
            false,
            None,
            &config,
        );
        assert_eq!(boss.body().vitals.max(), Fixed::from_num(4700));
        assert_eq!(boss.view().phase, 1);
        assert_eq!(boss.state_label(), StateLabel::Chase);
    }

    #[test]
    fn test_pursue_moves_toward_player() {
        let config = EncounterConfig::default();
        let mut dog = Combatant::new(
            2,
            ArchetypeKind::BossDog,
            Role::Auxiliary,
            Some(1),
            Vec2Fixed::ZERO,
            Fixed::ONE,
            false,
            None,
            &config,
        );
        let player = PlayerSnapshot::at(Vec2Fixed::from_ints(100, 0));
        dog.body.pursue(&player);
        dog.body.integrate(ratio(1, 10));
        assert!(dog.body.position.x > Fixed::ZERO);
        assert!(dog.body.position.y.abs() < ratio(1, 100));

        let hidden = PlayerSnapshot {
            hidden: true,
            ..player
        };
        let before = dog.body.velocity.x;
        dog.body.pursue(&hidden);
        assert!(dog.body.velocity.x < before);
    }

    #[test]
    fn test_dismiss_is_one_shot() {
        let config = EncounterConfig::default();
        let mut fish = Combatant::new(
            3,
            ArchetypeKind::Goldfish,
            Role::Auxiliary,
            Some(1),
            Vec2Fixed::ZERO,
            Fixed::ONE,
            false,
            None,
            &config,
        );
        assert!(fish.dismiss());
        assert!(!fish.dismiss());
        assert_eq!(fish.state_label(), StateLabel::Gone);
    }
}
