//! Goldfish: wobbling kamikaze minion.
//!
//! Swims at the player with a sideways wobble and explodes on contact.
//! Exploding is a self-destruct, not a defeat, so it grants nothing.

use std::hash::Hasher;

use tracing::trace;

use crate::archetypes::Archetype;
use crate::combatant::{Body, StateLabel};
use crate::context::{AudioCue, EncounterContext};
use crate::math::{fixed_sin, Fixed};

/// Goldfish state: it only ever swims.
#[derive(Debug, Clone, Default)]
pub struct GoldfishBrain {
    life: Fixed,
}

impl GoldfishBrain {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn explode(body: &mut Body, ctx: &mut EncounterContext<'_>) {
        if !body.self_destruct() {
            return;
        }
        trace!(id = body.id, "goldfish exploded");
        ctx.hooks.damage_player(body.contact_damage);
        ctx.hooks.spawn_particles(body.position, 15, "#fb923c");
        ctx.hooks.spawn_floating_text("SPLASH!", body.above(20), "#38bdf8", 22);
        ctx.hooks.add_screen_shake(Fixed::from_num(6));
        ctx.hooks.play_audio_cue(AudioCue::Splash);
        ctx.events.self_destructed.push(body.id);
    }
}

impl Archetype for GoldfishBrain {
    fn label(&self) -> StateLabel {
        StateLabel::Chase
    }

    fn state_timer(&self) -> Fixed {
        self.life
    }

    fn tick(&mut self, body: &mut Body, ctx: &mut EncounterContext<'_>) {
        self.life += ctx.dt;
        body.pursue(ctx.player);

        if !ctx.player.hidden {
            let fish = &ctx.config.goldfish;
            let heading = (ctx.player.position - body.position).normalize();
            let sway = fixed_sin(self.life.saturating_mul(fish.wobble_frequency))
                .saturating_mul(fish.wobble_amplitude);
            body.velocity += heading.perpendicular().scale(sway);
        }
        body.integrate(ctx.dt);

        if body.touching(ctx.player) {
            Self::explode(body, ctx);
        }
    }

    fn hash_state(&self, state: &mut dyn Hasher) {
        state.write_i64(self.life.to_bits());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archetypes::testing::Rig;
    use crate::archetypes::ArchetypeKind;
    use crate::combatant::Lifecycle;
    use crate::config::EncounterConfig;
    use crate::context::PlayerSnapshot;
    use crate::death::DamageOutcome;
    use crate::math::{ratio, Vec2Fixed};

    #[test]
    fn test_goldfish_explodes_once_without_reward() {
        let mut rig = Rig::new(EncounterConfig::default());
        rig.player = PlayerSnapshot::at(Vec2Fixed::from_ints(60, 0));
        let mut fish = rig.spawn(ArchetypeKind::Goldfish, false, None);

        rig.run(&mut fish, Fixed::ONE, ratio(1, 20));
        assert_eq!(fish.body().lifecycle, Lifecycle::SelfDestructed);
        assert_eq!(fish.state_label(), StateLabel::Gone);
        assert_eq!(rig.hooks.player_damage, Fixed::from_num(18));
        assert_eq!(rig.events.self_destructed, vec![1]);
        assert!(rig.hooks.rewards.is_empty());

        let mut ctx = rig.ctx(Fixed::ZERO);
        assert_eq!(fish.take_damage(Fixed::from_num(100), &mut ctx), DamageOutcome::Ignored);
        assert!(rig.hooks.rewards.is_empty());
    }

    #[test]
    fn test_goldfish_wobbles_off_the_straight_line() {
        let mut rig = Rig::new(EncounterConfig::default());
        rig.player = PlayerSnapshot::at(Vec2Fixed::from_ints(2000, 0));
        let mut fish = rig.spawn(ArchetypeKind::Goldfish, false, None);
        rig.run(&mut fish, ratio(1, 2), ratio(1, 20));
        assert!(fish.view().position.x > Fixed::ZERO);
        assert_ne!(fish.view().position.y, Fixed::ZERO);
    }

    #[test]
    fn test_killed_goldfish_grants_reward() {
        let mut rig = Rig::new(EncounterConfig::default());
        let mut fish = rig.spawn(ArchetypeKind::Goldfish, false, None);
        let mut ctx = rig.ctx(Fixed::ZERO);
        assert!(matches!(
            fish.take_damage(Fixed::from_num(60), &mut ctx),
            DamageOutcome::Defeated(_)
        ));
        assert_eq!(rig.hooks.rewards, vec![Fixed::from_num(50)]);
    }

    #[test]
    fn test_goldfish_ignores_stagger() {
        let mut rig = Rig::new(EncounterConfig::default());
        let mut fish = rig.spawn(ArchetypeKind::Goldfish, false, None);
        let mut ctx = rig.ctx(Fixed::ZERO);
        assert!(!fish.stagger(&mut ctx));
    }
}
