//! Kru First, the physics teacher.
//!
//! A heavier primary than Kru Manop. No fallback attack: when no skill
//! fires he keeps walking at the player.

use std::hash::Hasher;

use tracing::debug;

use crate::archetypes::{Archetype, EvalClock};
use crate::combatant::{Body, StateLabel};
use crate::context::{AudioCue, EncounterContext, PlayerStatus, ProjectileSpec, ProjectileVisual};
use crate::encounter::SkillUse;
use crate::math::{Fixed, Vec2Fixed};
use crate::skills::SkillId;
use crate::state_machine::{SkillTimeline, Stage, StateMachine};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FirstState {
    Chase,
    FreeFall,
    SandwichToss,
    EmpPulse,
    Stunned,
}

/// Kru First's state.
#[derive(Debug, Clone)]
pub struct FirstBrain {
    machine: StateMachine<FirstState>,
    clock: EvalClock,
    overclocked: bool,
    /// Landing spot marked at leap start.
    target: Vec2Fixed,
    stun_for: Fixed,
}

impl FirstBrain {
    pub(crate) fn new(eval_interval: Fixed) -> Self {
        Self {
            machine: StateMachine::new(FirstState::Chase),
            clock: EvalClock::new(eval_interval),
            overclocked: false,
            target: Vec2Fixed::ZERO,
            stun_for: Fixed::ZERO,
        }
    }

    /// Whether phase 2 has been entered.
    #[must_use]
    pub fn is_overclocked(&self) -> bool {
        self.overclocked
    }

    fn back_to_chase(&mut self) {
        self.machine.transition(FirstState::Chase);
        self.clock.rearm(Fixed::ZERO);
    }

    fn chase(&mut self, body: &mut Body, ctx: &mut EncounterContext<'_>) {
        body.pursue(ctx.player);
        if !self.clock.due(self.machine.timer()) {
            return;
        }
        self.machine.restart_timer();
        self.clock.rearm(Fixed::ZERO);

        let Some(skill) = body.skills.select(&mut *ctx.rng, |_| true) else {
            return;
        };
        debug!(id = body.id, ?skill, "first skill selected");
        ctx.events.skills_used.push(SkillUse { id: body.id, skill });
        body.halt();

        let (state, text, color) = match skill {
            SkillId::FreeFall => {
                self.target = ctx.player.position;
                (FirstState::FreeFall, "FREE FALL!", "#a855f7")
            }
            SkillId::SandwichToss => (FirstState::SandwichToss, "PORK SANDWICH!", "#f97316"),
            SkillId::EmpPulse => (FirstState::EmpPulse, "EMP!", "#22d3ee"),
            _ => return,
        };
        ctx.hooks.spawn_floating_text(text, body.above(90), color, 30);
        ctx.hooks.play_audio_cue(AudioCue::BossSpecial);
        self.machine.transition(state);
    }

    fn free_fall(&mut self, body: &mut Body, ctx: &mut EncounterContext<'_>) {
        let config = ctx.config;
        let leap = &config.first.free_fall;
        let timeline = SkillTimeline::new(leap.wind_up, leap.airborne, leap.recovery);

        if timeline.began_execute(&self.machine) {
            body.invulnerable = true;
            ctx.hooks.spawn_particles(body.position, 14, "#a855f7");
        }

        match timeline.stage_at(self.machine.timer()) {
            Stage::WindUp | Stage::Recovery | Stage::Done => body.halt(),
            Stage::Execute => {
                // Cover the rest of the distance in the rest of the air time.
                let left = timeline.recovery_at() - self.machine.timer();
                let offset = self.target - body.position;
                body.velocity = if left > Fixed::ZERO {
                    offset.scale(Fixed::ONE / left.max(ctx.dt))
                } else {
                    Vec2Fixed::ZERO
                };
            }
        }

        if timeline.began_recovery(&self.machine) {
            self.land(body, ctx);
        }
        if timeline.finished(&self.machine) {
            self.back_to_chase();
        }
    }

    fn land(&mut self, body: &mut Body, ctx: &mut EncounterContext<'_>) {
        let leap = &ctx.config.first.free_fall;
        body.invulnerable = false;
        body.position = self.target;
        body.halt();
        ctx.hooks.add_screen_shake(Fixed::from_num(18));
        ctx.hooks.spawn_particles(body.position, 30, "#a855f7");
        if body.in_range(ctx.player, leap.radius) {
            ctx.hooks.damage_player(leap.damage);
        }
    }

    fn sandwich(&mut self, body: &mut Body, ctx: &mut EncounterContext<'_>) {
        let config = ctx.config;
        let toss = &config.first.sandwich;
        let timeline = SkillTimeline::new(toss.wind_up, Fixed::ZERO, toss.recovery);
        body.halt();

        if timeline.began_execute(&self.machine) {
            ctx.hooks.spawn_projectile(
                ProjectileSpec::enemy(
                    body.position,
                    body.heading_to(ctx.player),
                    toss.speed,
                    body.contact_damage.saturating_mul(toss.damage_multiplier),
                    ProjectileVisual::Sandwich,
                )
                .homing(),
            );
        }
        if timeline.finished(&self.machine) {
            self.back_to_chase();
        }
    }

    fn emp(&mut self, body: &mut Body, ctx: &mut EncounterContext<'_>) {
        let config = ctx.config;
        let emp = &config.first.emp;
        let timeline = SkillTimeline::new(emp.wind_up, Fixed::ZERO, emp.recovery);
        body.halt();

        if timeline.began_execute(&self.machine) {
            ctx.hooks.spawn_particles(body.position, 40, "#22d3ee");
            ctx.hooks.add_screen_shake(Fixed::from_num(12));
            if body.in_range(ctx.player, emp.radius) {
                ctx.hooks.damage_player(emp.damage);
                ctx.hooks.apply_player_status(PlayerStatus::Grounded {
                    duration: emp.grounded_duration,
                });
                ctx.hooks.spawn_floating_text(
                    "GROUNDED!",
                    ctx.player.position - Vec2Fixed::from_ints(0, 55),
                    "#22d3ee",
                    24,
                );
            }
        }
        if timeline.finished(&self.machine) {
            self.back_to_chase();
        }
    }
}

impl Archetype for FirstBrain {
    fn label(&self) -> StateLabel {
        match self.machine.state() {
            FirstState::Chase => StateLabel::Chase,
            FirstState::FreeFall => StateLabel::FreeFall,
            FirstState::SandwichToss => StateLabel::SandwichToss,
            FirstState::EmpPulse => StateLabel::EmpPulse,
            FirstState::Stunned => StateLabel::Stunned,
        }
    }

    fn state_timer(&self) -> Fixed {
        self.machine.timer()
    }

    fn tick(&mut self, body: &mut Body, ctx: &mut EncounterContext<'_>) {
        self.machine.advance(ctx.dt);

        match self.machine.state() {
            FirstState::Chase => self.chase(body, ctx),
            FirstState::FreeFall => self.free_fall(body, ctx),
            FirstState::SandwichToss => self.sandwich(body, ctx),
            FirstState::EmpPulse => self.emp(body, ctx),
            FirstState::Stunned => {
                body.halt();
                if self.machine.timer() >= self.stun_for {
                    self.back_to_chase();
                }
                return;
            }
        }

        body.integrate(ctx.dt);
        // No contact damage while airborne.
        if !body.invulnerable {
            body.apply_contact(ctx);
        }
    }

    fn on_phase_entered(&mut self, phase: u8, body: &mut Body, ctx: &mut EncounterContext<'_>) {
        if phase != 2 {
            return;
        }
        let first = &ctx.config.first;
        self.overclocked = true;
        body.skills.set_cooldown_scale(first.overclock_cooldown_scale);
        body.speed_multiplier = first.overclock_speed_multiplier;

        if self.machine.is(FirstState::FreeFall) {
            body.invulnerable = false;
            body.halt();
            self.back_to_chase();
        }

        ctx.hooks
            .spawn_floating_text("OVERCLOCK!", body.above(90), "#22d3ee", 40);
        ctx.hooks.add_screen_shake(Fixed::from_num(20));
        ctx.hooks.spawn_particles(body.position, 35, "#22d3ee");
        ctx.hooks.play_audio_cue(AudioCue::BossSpecial);
    }

    fn stagger(&mut self, body: &mut Body, ctx: &mut EncounterContext<'_>) -> bool {
        if body.invulnerable {
            return false;
        }
        body.halt();
        self.stun_for = ctx.config.first.stagger_duration;
        self.machine.transition(FirstState::Stunned);
        ctx.hooks
            .spawn_floating_text("STAGGERED!", body.above(60), "#94a3b8", 28);
        true
    }

    fn on_defeated(&mut self, body: &mut Body, ctx: &mut EncounterContext<'_>) {
        ctx.hooks.spawn_particles(body.position, 60, "#22d3ee");
        ctx.hooks
            .spawn_floating_text("EXPERIMENT OVER!", body.position, "#facc15", 35);
        ctx.hooks.play_audio_cue(AudioCue::BossDefeated);
    }

    fn hash_state(&self, state: &mut dyn Hasher) {
        state.write_u8(self.machine.state() as u8);
        state.write_i64(self.machine.timer().to_bits());
        state.write_i64(self.clock.next_at().to_bits());
        state.write_u8(u8::from(self.overclocked));
        state.write_i64(self.target.x.to_bits());
        state.write_i64(self.target.y.to_bits());
        state.write_i64(self.stun_for.to_bits());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archetypes::testing::Rig;
    use crate::archetypes::ArchetypeKind;
    use crate::config::EncounterConfig;
    use crate::context::PlayerSnapshot;
    use crate::death::DamageOutcome;
    use crate::math::ratio;

    fn only_skill(skill: SkillId) -> EncounterConfig {
        let mut config = EncounterConfig::default();
        for entry in &mut config.first.skills {
            entry.chance = if entry.id == skill { Fixed::ONE } else { Fixed::ZERO };
        }
        config
    }

    fn dt() -> Fixed {
        ratio(1, 20)
    }

    #[test]
    fn test_stagger_forces_stunned() {
        let mut rig = Rig::new(EncounterConfig::default());
        let mut boss = rig.spawn(ArchetypeKind::KruFirst, false, None);
        rig.run(&mut boss, ratio(1, 2), dt());

        let mut ctx = rig.ctx(Fixed::ZERO);
        assert!(boss.stagger(&mut ctx));
        assert_eq!(boss.state_label(), StateLabel::Stunned);

        rig.run(&mut boss, ratio(8, 5), dt());
        assert_eq!(boss.state_label(), StateLabel::Chase);
    }

    #[test]
    fn test_free_fall_is_invulnerable_and_lands_on_mark() {
        let mut rig = Rig::new(only_skill(SkillId::FreeFall));
        rig.player = PlayerSnapshot::at(Vec2Fixed::from_ints(0, 600));
        let mut boss = rig.spawn(ArchetypeKind::KruFirst, false, None);

        rig.run(&mut boss, Fixed::from_num(2) + dt(), dt());
        assert_eq!(boss.state_label(), StateLabel::FreeFall);
        let mark = rig.player.position;

        // Player walks away; the landing spot stays where it was marked.
        rig.player = PlayerSnapshot::at(Vec2Fixed::from_ints(0, 900));
        rig.run(&mut boss, ratio(1, 2), dt());
        assert!(boss.view().invulnerable);
        let mut ctx = rig.ctx(Fixed::ZERO);
        assert_eq!(boss.take_damage(Fixed::from_num(50), &mut ctx), DamageOutcome::Discarded);
        let mut ctx = rig.ctx(Fixed::ZERO);
        assert!(!boss.stagger(&mut ctx));

        rig.run(&mut boss, Fixed::ONE, dt());
        assert!(!boss.view().invulnerable);
        assert_eq!(boss.view().position, mark);
        // Player is 300 away, outside the landing radius.
        assert_eq!(rig.hooks.player_damage, Fixed::ZERO);
    }

    #[test]
    fn test_landing_hits_player_inside_radius() {
        let mut rig = Rig::new(only_skill(SkillId::FreeFall));
        rig.player = PlayerSnapshot::at(Vec2Fixed::from_ints(0, 600));
        let mut boss = rig.spawn(ArchetypeKind::KruFirst, false, None);
        rig.run(&mut boss, Fixed::from_num(2) + dt(), dt());
        rig.run(&mut boss, ratio(9, 5), dt());
        assert!(rig.hooks.player_damage >= Fixed::from_num(40));
    }

    #[test]
    fn test_sandwich_is_homing_and_hits_hard() {
        let mut rig = Rig::new(only_skill(SkillId::SandwichToss));
        rig.player = PlayerSnapshot::at(Vec2Fixed::from_ints(600, 0));
        let mut boss = rig.spawn(ArchetypeKind::KruFirst, false, None);
        rig.run(&mut boss, Fixed::from_num(2) + dt(), dt());
        rig.run(&mut boss, ratio(1, 2), dt());

        assert_eq!(rig.hooks.projectiles.len(), 1);
        let sandwich = rig.hooks.projectiles[0];
        assert!(sandwich.homing);
        assert_eq!(sandwich.visual, ProjectileVisual::Sandwich);
        assert_eq!(sandwich.damage, Fixed::from_num(125));
    }

    #[test]
    fn test_emp_grounds_player_in_radius() {
        let mut rig = Rig::new(only_skill(SkillId::EmpPulse));
        rig.player = PlayerSnapshot::at(Vec2Fixed::from_ints(0, 600));
        let mut boss = rig.spawn(ArchetypeKind::KruFirst, false, None);
        rig.run(&mut boss, Fixed::from_num(2) + dt(), dt());
        rig.run(&mut boss, Fixed::ONE, dt());

        assert!(matches!(rig.hooks.statuses.as_slice(), [PlayerStatus::Grounded { .. }]));
        assert_eq!(rig.hooks.player_damage, Fixed::from_num(15));
    }

    #[test]
    fn test_overclock_cancels_leap_and_scales_cooldowns() {
        let mut rig = Rig::new(only_skill(SkillId::FreeFall));
        rig.player = PlayerSnapshot::at(Vec2Fixed::from_ints(0, 600));
        let mut boss = rig.spawn(ArchetypeKind::KruFirst, false, None);
        rig.run(&mut boss, Fixed::from_num(2) + dt(), dt());
        assert_eq!(boss.state_label(), StateLabel::FreeFall);

        let mut ctx = rig.ctx(Fixed::ZERO);
        boss.take_damage(Fixed::from_num(1400), &mut ctx);
        assert_eq!(boss.view().phase, 2);
        assert_eq!(boss.state_label(), StateLabel::Chase);
        assert!(!boss.view().invulnerable);
        assert_eq!(boss.view().speed_multiplier, ratio(13, 10));
        assert_eq!(boss.body().skills.cooldown_scale(), ratio(7, 10));
    }
}
