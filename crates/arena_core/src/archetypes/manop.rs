//! Kru Manop, the math teacher who rides a dog.
//!
//! Pursues the player and every evaluation interval walks the skill bank in
//! declared order (log 4.57, deadly graph, bark, equation slam, then the
//! phase 3 goldfish skills). When nothing fires he falls back to a pop quiz
//! ring or a chalk volley.
//!
//! Log 4.57 is a three-part cycle: an invulnerable charge that heals, an
//! empowered window where the attack bonus keeps growing, and a crash into
//! a short stun when the bonus runs out.

use std::hash::Hasher;

use tracing::debug;

use crate::archetypes::{Archetype, ArchetypeKind, EvalClock};
use crate::combatant::{Body, StateLabel};
use crate::context::{
    AudioCue, EncounterContext, PlayerStatus, ProjectileSpec, ProjectileVisual, SpawnRequest,
};
use crate::encounter::SkillUse;
use crate::math::{ratio, wrap_angle, Fixed, Vec2Fixed, TAU};
use crate::skills::SkillId;
use crate::state_machine::{SkillTimeline, StateMachine};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ManopState {
    Chase,
    Volley,
    PopQuiz,
    EquationSlam,
    DeadlyGraph,
    Bark,
    GoldfishSwarm,
    BubblePrison,
    Charging,
    Stunned,
}

/// Kru Manop's state.
#[derive(Debug, Clone)]
pub struct ManopBrain {
    machine: StateMachine<ManopState>,
    clock: EvalClock,
    enraged: bool,
    empowered: Option<Fixed>,
    stun_for: Fixed,
    aim: Fixed,
}

impl ManopBrain {
    pub(crate) fn new(eval_interval: Fixed) -> Self {
        Self {
            machine: StateMachine::new(ManopState::Chase),
            clock: EvalClock::new(eval_interval),
            enraged: false,
            empowered: None,
            stun_for: Fixed::ZERO,
            aim: Fixed::ZERO,
        }
    }

    /// Whether phase 2 has been entered.
    #[must_use]
    pub fn is_enraged(&self) -> bool {
        self.enraged
    }

    /// Seconds of log 4.57 bonus left, if empowered.
    #[must_use]
    pub fn empowered_for(&self) -> Option<Fixed> {
        self.empowered
    }

    fn back_to_chase(&mut self, extra_delay: Fixed) {
        self.machine.transition(ManopState::Chase);
        self.clock.rearm(extra_delay);
    }

    fn stun(&mut self, body: &mut Body, duration: Fixed) {
        body.invulnerable = false;
        body.halt();
        self.stun_for = duration;
        self.machine.transition(ManopState::Stunned);
    }

    fn chase(&mut self, body: &mut Body, ctx: &mut EncounterContext<'_>) {
        body.pursue(ctx.player);
        if !self.clock.due(self.machine.timer()) {
            return;
        }
        self.machine.restart_timer();
        self.clock.rearm(Fixed::ZERO);

        let config = ctx.config;
        let bark_in_reach = body.rider && body.in_range(ctx.player, config.manop.bark.range);
        let picked = body
            .skills
            .select(&mut *ctx.rng, |id| id != SkillId::Bark || bark_in_reach);

        match picked {
            Some(skill) => self.begin_skill(skill, body, ctx),
            None if ctx.roll(config.manop.pop_quiz.chance) => {
                self.machine.transition(ManopState::PopQuiz);
            }
            None => self.machine.transition(ManopState::Volley),
        }
    }

    fn begin_skill(&mut self, skill: SkillId, body: &mut Body, ctx: &mut EncounterContext<'_>) {
        debug!(id = body.id, ?skill, "manop skill selected");
        ctx.events.skills_used.push(SkillUse { id: body.id, skill });
        self.aim = body.heading_to(ctx.player);

        let (state, banner, color) = match skill {
            SkillId::Log457 => (ManopState::Charging, Some("log 4.57 = ?"), "#ef4444"),
            SkillId::DeadlyGraph => (ManopState::DeadlyGraph, Some("DEADLY GRAPH!"), "#3b82f6"),
            SkillId::Bark => (ManopState::Bark, None, "#d97706"),
            SkillId::EquationSlam => (ManopState::EquationSlam, Some("EQUATION SLAM!"), "#facc15"),
            SkillId::GoldfishSwarm => {
                (ManopState::GoldfishSwarm, Some("GOLDFISH SWARM!"), "#fb923c")
            }
            SkillId::BubblePrison => (ManopState::BubblePrison, Some("BUBBLE PRISON!"), "#38bdf8"),
            SkillId::FreeFall | SkillId::SandwichToss | SkillId::EmpPulse | SkillId::Lunge => {
                return;
            }
        };

        if let Some(text) = banner {
            ctx.hooks.spawn_floating_text(text, body.above(80), color, 30);
            ctx.hooks.play_audio_cue(AudioCue::BossSpecial);
        }
        if state == ManopState::Charging {
            body.invulnerable = true;
        }
        body.halt();
        self.machine.transition(state);
    }

    fn charge(&mut self, body: &mut Body, ctx: &mut EncounterContext<'_>) {
        let config = ctx.config;
        let fortify = &config.manop.fortify;
        body.halt();
        body.invulnerable = true;
        let heal = body
            .vitals
            .max()
            .saturating_mul(fortify.heal_rate)
            .saturating_mul(ctx.dt);
        body.vitals.heal(heal);

        if self.machine.timer() >= fortify.charge_duration {
            body.invulnerable = false;
            body.attack_bonus = fortify.attack_bonus;
            self.empowered = Some(fortify.active_duration);
            ctx.hooks.add_screen_shake(Fixed::from_num(20));
            ctx.hooks
                .spawn_floating_text("67! 67! 67!", body.above(80), "#facc15", 35);
            self.back_to_chase(Fixed::ZERO);
        }
    }

    fn tick_empowered(&mut self, body: &mut Body, ctx: &mut EncounterContext<'_>) {
        let Some(left) = self.empowered else {
            return;
        };
        let config = ctx.config;
        let fortify = &config.manop.fortify;
        body.attack_bonus += fortify.attack_growth.saturating_mul(ctx.dt);

        let left = left - ctx.dt;
        if left > Fixed::ZERO {
            self.empowered = Some(left);
            return;
        }
        self.empowered = None;
        ctx.hooks
            .spawn_floating_text("STUNNED!", body.above(60), "#94a3b8", 30);
        self.stun(body, fortify.stun_duration);
    }

    fn volley(&mut self, body: &mut Body, ctx: &mut EncounterContext<'_>) {
        let config = ctx.config;
        let volley = &config.manop.volley;
        body.damp(ratio(9, 10));

        let base = if self.enraged {
            volley.enraged_fire_interval
        } else {
            volley.fire_interval
        };
        let interval = base / (Fixed::ONE + body.attack_bonus);
        if self.machine.timer() <= interval {
            return;
        }

        let angle = body.heading_to(ctx.player);
        let mut fire = |angle: Fixed| {
            ctx.hooks.spawn_projectile(ProjectileSpec::enemy(
                body.position,
                angle,
                volley.projectile_speed,
                volley.damage,
                ProjectileVisual::Chalk,
            ));
        };
        fire(angle);
        if self.enraged {
            fire(angle + volley.fan_angle);
            fire(angle - volley.fan_angle);
        }

        self.machine.restart_timer();
        if ctx.roll(volley.exit_chance) {
            self.back_to_chase(Fixed::ZERO);
        }
    }

    fn pop_quiz(&mut self, body: &mut Body, ctx: &mut EncounterContext<'_>) {
        let config = ctx.config;
        let quiz = &config.manop.pop_quiz;
        body.halt();
        if self.machine.timer() <= quiz.wind_up {
            return;
        }

        let bullets = if self.enraged {
            quiz.enraged_bullets
        } else {
            quiz.bullets
        };
        for i in 0..bullets {
            let angle = TAU * Fixed::from_num(i) / Fixed::from_num(bullets);
            ctx.hooks.spawn_projectile(
                ProjectileSpec::enemy(
                    body.position,
                    angle,
                    quiz.projectile_speed,
                    quiz.damage,
                    ProjectileVisual::PopQuiz,
                )
                .homing(),
            );
        }
        ctx.hooks.add_screen_shake(Fixed::from_num(15));
        ctx.hooks
            .spawn_floating_text("POP QUIZ!", body.above(80), "#facc15", 40);
        ctx.hooks.play_audio_cue(AudioCue::BossSpecial);
        self.back_to_chase(quiz.post_delay);
    }

    fn slam(&mut self, body: &mut Body, ctx: &mut EncounterContext<'_>) {
        let config = ctx.config;
        let slam = &config.manop.slam;
        let timeline = SkillTimeline::new(slam.wind_up, Fixed::ZERO, slam.recovery);
        body.halt();

        if timeline.began_execute(&self.machine) {
            ctx.hooks.add_screen_shake(Fixed::from_num(15));
            ctx.hooks.spawn_particles(body.position, 24, "#facc15");
            if body.in_range(ctx.player, slam.reach) {
                ctx.hooks.damage_player(slam.damage);
            }
        }
        if timeline.finished(&self.machine) {
            self.back_to_chase(Fixed::ZERO);
        }
    }

    fn graph(&mut self, body: &mut Body, ctx: &mut EncounterContext<'_>) {
        let config = ctx.config;
        let graph = &config.manop.graph;
        let timeline = SkillTimeline::new(graph.wind_up, Fixed::ZERO, graph.recovery);
        body.halt();

        if timeline.began_execute(&self.machine) {
            ctx.hooks.spawn_projectile(ProjectileSpec::enemy(
                body.position,
                self.aim,
                graph.reach,
                graph.damage,
                ProjectileVisual::Graph,
            ));
        }
        if timeline.finished(&self.machine) {
            self.back_to_chase(Fixed::ZERO);
        }
    }

    fn bark(&mut self, body: &mut Body, ctx: &mut EncounterContext<'_>) {
        let config = ctx.config;
        let bark = &config.manop.bark;
        let timeline = SkillTimeline::new(bark.wind_up, Fixed::ZERO, bark.recovery);
        body.halt();

        if timeline.began_execute(&self.machine) {
            ctx.hooks.spawn_particles(body.position, 12, "#d97706");
            ctx.hooks
                .spawn_floating_text("WOOF WOOF!", body.above(100), "#d97706", 30);
            ctx.hooks.play_audio_cue(AudioCue::Bark);

            let to_player = ctx.player.position - body.position;
            if to_player != Vec2Fixed::ZERO && body.in_range(ctx.player, bark.range) {
                let off_axis = wrap_angle(body.heading_to(ctx.player) - self.aim);
                if off_axis.abs() < bark.cone_half_angle {
                    ctx.hooks.damage_player(bark.damage);
                    ctx.hooks
                        .knock_back_player(to_player.normalize().scale(bark.knockback));
                    ctx.hooks.spawn_floating_text(
                        "BARK!",
                        ctx.player.position - Vec2Fixed::from_ints(0, 55),
                        "#f59e0b",
                        26,
                    );
                    ctx.hooks.add_screen_shake(Fixed::from_num(10));
                }
            }
        }
        if timeline.finished(&self.machine) {
            self.back_to_chase(Fixed::ZERO);
        }
    }

    fn swarm(&mut self, body: &mut Body, ctx: &mut EncounterContext<'_>) {
        let config = ctx.config;
        let swarm = &config.manop.swarm;
        let timeline = SkillTimeline::new(swarm.wind_up, Fixed::ZERO, swarm.recovery);
        body.halt();

        if timeline.began_execute(&self.machine) {
            let count = swarm.goldfish_count;
            for i in 0..count {
                let angle = self.aim + TAU * Fixed::from_num(i) / Fixed::from_num(count);
                let offset =
                    Vec2Fixed::from_angle(angle).scale(config.session.auxiliary_spawn_offset);
                ctx.spawns.push(SpawnRequest {
                    kind: ArchetypeKind::Goldfish,
                    owner: body.id,
                    position: body.position + offset,
                    difficulty: Fixed::ONE,
                });
            }
            ctx.hooks.spawn_particles(body.position, 16, "#fb923c");
        }
        if timeline.finished(&self.machine) {
            self.back_to_chase(Fixed::ZERO);
        }
    }

    fn bubbles(&mut self, body: &mut Body, ctx: &mut EncounterContext<'_>) {
        let config = ctx.config;
        let swarm = &config.manop.swarm;
        let timeline = SkillTimeline::new(swarm.wind_up, Fixed::ZERO, swarm.recovery);
        body.halt();

        if timeline.began_execute(&self.machine) {
            let count = swarm.bubble_count;
            let middle = Fixed::from_num(count.saturating_sub(1)) / Fixed::from_num(2);
            for i in 0..count {
                let angle = self.aim + (Fixed::from_num(i) - middle) * swarm.bubble_spread;
                ctx.hooks.spawn_projectile(
                    ProjectileSpec::enemy(
                        body.position,
                        angle,
                        swarm.bubble_speed,
                        swarm.bubble_damage,
                        ProjectileVisual::Bubble,
                    )
                    .with_status(PlayerStatus::Slowed {
                        factor: swarm.slow_factor,
                        duration: swarm.slow_duration,
                    }),
                );
            }
        }
        if timeline.finished(&self.machine) {
            self.back_to_chase(Fixed::ZERO);
        }
    }

    fn enrage(&mut self, body: &mut Body, ctx: &mut EncounterContext<'_>) {
        let config = ctx.config;
        let manop = &config.manop;
        self.enraged = true;
        body.speed_multiplier = manop.enrage_speed_multiplier;
        body.skills.set_chance(SkillId::Bark, manop.bark.enraged_chance);
        if self.machine.is(ManopState::Charging) {
            body.invulnerable = false;
            self.back_to_chase(Fixed::ZERO);
        }

        ctx.hooks
            .spawn_floating_text("ENRAGED!", body.above(80), "#ef4444", 40);
        ctx.hooks.add_screen_shake(Fixed::from_num(20));
        ctx.hooks.spawn_particles(body.position, 35, "#ef4444");
        ctx.hooks.play_audio_cue(AudioCue::BossSpecial);

        if body.rider {
            ctx.hooks
                .spawn_floating_text("DOG RIDER!", body.above(120), "#d97706", 32);
            ctx.hooks.spawn_particles(body.position, 20, "#d97706");
            ctx.spawns.push(SpawnRequest {
                kind: ArchetypeKind::BossDog,
                owner: body.id,
                position: body.position
                    + Vec2Fixed::new(config.session.auxiliary_spawn_offset, Fixed::ZERO),
                difficulty: Fixed::ONE,
            });
        }
    }
}

impl Archetype for ManopBrain {
    fn label(&self) -> StateLabel {
        match self.machine.state() {
            ManopState::Chase => StateLabel::Chase,
            ManopState::Volley => StateLabel::Volley,
            ManopState::PopQuiz => StateLabel::PopQuiz,
            ManopState::EquationSlam => StateLabel::EquationSlam,
            ManopState::DeadlyGraph => StateLabel::DeadlyGraph,
            ManopState::Bark => StateLabel::Bark,
            ManopState::GoldfishSwarm => StateLabel::GoldfishSwarm,
            ManopState::BubblePrison => StateLabel::BubblePrison,
            ManopState::Charging => StateLabel::Charging,
            ManopState::Stunned => StateLabel::Stunned,
        }
    }

    fn state_timer(&self) -> Fixed {
        self.machine.timer()
    }

    fn on_spawn(&mut self, body: &mut Body) {
        body.skills.enable(SkillId::Bark, body.rider);
    }

    fn tick(&mut self, body: &mut Body, ctx: &mut EncounterContext<'_>) {
        self.machine.advance(ctx.dt);
        self.tick_empowered(body, ctx);

        match self.machine.state() {
            ManopState::Chase => self.chase(body, ctx),
            ManopState::Volley => self.volley(body, ctx),
            ManopState::PopQuiz => self.pop_quiz(body, ctx),
            ManopState::EquationSlam => self.slam(body, ctx),
            ManopState::DeadlyGraph => self.graph(body, ctx),
            ManopState::Bark => self.bark(body, ctx),
            ManopState::GoldfishSwarm => self.swarm(body, ctx),
            ManopState::BubblePrison => self.bubbles(body, ctx),
            ManopState::Charging => self.charge(body, ctx),
            ManopState::Stunned => {
                body.halt();
                if self.machine.timer() >= self.stun_for {
                    body.attack_bonus = Fixed::ZERO;
                    self.back_to_chase(Fixed::ZERO);
                }
                return;
            }
        }

        body.integrate(ctx.dt);
        body.apply_contact(ctx);
    }

    fn on_phase_entered(&mut self, phase: u8, body: &mut Body, ctx: &mut EncounterContext<'_>) {
        match phase {
            2 => self.enrage(body, ctx),
            3 => {
                body.skills.enable(SkillId::GoldfishSwarm, true);
                body.skills.enable(SkillId::BubblePrison, true);
                ctx.hooks
                    .spawn_floating_text("GOLDFISH LOVER!", body.above(120), "#38bdf8", 36);
                ctx.hooks.spawn_particles(body.position, 30, "#38bdf8");
                ctx.hooks.add_screen_shake(Fixed::from_num(15));
            }
            _ => {}
        }
    }

    fn stagger(&mut self, body: &mut Body, ctx: &mut EncounterContext<'_>) -> bool {
        if body.invulnerable {
            return false;
        }
        ctx.hooks
            .spawn_floating_text("STAGGERED!", body.above(60), "#94a3b8", 28);
        // A stagger ends the fortify cycle; the crash stun never follows it.
        self.empowered = None;
        body.attack_bonus = Fixed::ZERO;
        self.stun(body, ctx.config.manop.stagger_duration);
        true
    }

    fn on_defeated(&mut self, body: &mut Body, ctx: &mut EncounterContext<'_>) {
        self.empowered = None;
        body.attack_bonus = Fixed::ZERO;
        ctx.hooks.spawn_particles(body.position, 60, "#dc2626");
        ctx.hooks
            .spawn_floating_text("CLASS DISMISSED!", body.position, "#facc15", 35);
        ctx.hooks.play_audio_cue(AudioCue::BossDefeated);
    }

    fn hash_state(&self, state: &mut dyn Hasher) {
        state.write_u8(self.machine.state() as u8);
        state.write_i64(self.machine.timer().to_bits());
        state.write_i64(self.clock.next_at().to_bits());
        state.write_u8(u8::from(self.enraged));
        state.write_i64(self.empowered.map_or(-1, Fixed::to_bits));
        state.write_i64(self.stun_for.to_bits());
        state.write_i64(self.aim.to_bits());
    }
}
