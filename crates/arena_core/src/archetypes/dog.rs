//! Boss Dog: fast melee auxiliary with a lunge.

use std::hash::Hasher;

use tracing::trace;

use crate::archetypes::{Archetype, EvalClock};
use crate::combatant::{Body, StateLabel};
use crate::context::EncounterContext;
use crate::encounter::SkillUse;
use crate::math::{Fixed, Vec2Fixed};
use crate::skills::SkillId;
use crate::state_machine::{SkillTimeline, Stage, StateMachine};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DogState {
    Chase,
    Lunge,
    Stunned,
}

/// Boss Dog state.
#[derive(Debug, Clone)]
pub struct DogBrain {
    machine: StateMachine<DogState>,
    clock: EvalClock,
    aim: Fixed,
    stun_for: Fixed,
}

impl DogBrain {
    pub(crate) fn new(eval_interval: Fixed) -> Self {
        Self {
            machine: StateMachine::new(DogState::Chase),
            clock: EvalClock::new(eval_interval),
            aim: Fixed::ZERO,
            stun_for: Fixed::ZERO,
        }
    }

    fn back_to_chase(&mut self) {
        self.machine.transition(DogState::Chase);
        self.clock.rearm(Fixed::ZERO);
    }

    fn chase(&mut self, body: &mut Body, ctx: &mut EncounterContext<'_>) {
        body.pursue(ctx.player);
        if !self.clock.due(self.machine.timer()) {
            return;
        }
        self.machine.restart_timer();
        self.clock.rearm(Fixed::ZERO);

        let range = ctx.config.dog.lunge.range;
        let in_reach = body.in_range(ctx.player, range);
        let picked = body
            .skills
            .select(&mut *ctx.rng, |id| id == SkillId::Lunge && in_reach);
        if let Some(skill) = picked {
            trace!(id = body.id, "dog lunge");
            ctx.events.skills_used.push(SkillUse { id: body.id, skill });
            self.aim = body.heading_to(ctx.player);
            body.halt();
            self.machine.transition(DogState::Lunge);
        }
    }

    fn lunge(&mut self, body: &mut Body, ctx: &mut EncounterContext<'_>) {
        let lunge = &ctx.config.dog.lunge;
        let timeline = SkillTimeline::new(lunge.wind_up, lunge.dash, lunge.recovery);

        match timeline.stage_at(self.machine.timer()) {
            Stage::Execute => {
                let speed = body.speed().saturating_mul(lunge.speed_multiplier);
                body.velocity = Vec2Fixed::from_angle(self.aim).scale(speed);
            }
            Stage::WindUp | Stage::Recovery | Stage::Done => body.halt(),
        }
        if timeline.finished(&self.machine) {
            self.back_to_chase();
        }
    }
}

impl Archetype for DogBrain {
    fn label(&self) -> StateLabel {
        match self.machine.state() {
            DogState::Chase => StateLabel::Chase,
            DogState::Lunge => StateLabel::Lunge,
            DogState::Stunned => StateLabel::Stunned,
        }
    }

    fn state_timer(&self) -> Fixed {
        self.machine.timer()
    }

    fn tick(&mut self, body: &mut Body, ctx: &mut EncounterContext<'_>) {
        self.machine.advance(ctx.dt);

        match self.machine.state() {
            DogState::Chase => self.chase(body, ctx),
            DogState::Lunge => self.lunge(body, ctx),
            DogState::Stunned => {
                body.halt();
                if self.machine.timer() >= self.stun_for {
                    self.back_to_chase();
                }
                return;
            }
        }

        body.integrate(ctx.dt);
        body.apply_contact(ctx);
    }

    fn stagger(&mut self, body: &mut Body, ctx: &mut EncounterContext<'_>) -> bool {
        body.halt();
        self.stun_for = ctx.config.dog.stagger_duration;
        self.machine.transition(DogState::Stunned);
        true
    }

    fn on_defeated(&mut self, body: &mut Body, ctx: &mut EncounterContext<'_>) {
        ctx.hooks.spawn_particles(body.position, 30, "#d97706");
        ctx.hooks.spawn_floating_text("YELP!", body.above(40), "#d97706", 24);
    }

    fn hash_state(&self, state: &mut dyn Hasher) {
        state.write_u8(self.machine.state() as u8);
        state.write_i64(self.machine.timer().to_bits());
        state.write_i64(self.clock.next_at().to_bits());
        state.write_i64(self.aim.to_bits());
        state.write_i64(self.stun_for.to_bits());
    }
}
