//! Collaborator interface and per-frame context.
//!
//! The engine never renders, plays sound or touches the player directly. It
//! asks an [`EncounterHooks`] implementation to do those things. Every hook
//! has a no-op default, so a host only implements what it cares about and a
//! missing collaborator simply does nothing.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::archetypes::ArchetypeKind;
use crate::combatant::CombatantId;
use crate::config::EncounterConfig;
use crate::encounter::EncounterEvents;
use crate::math::{decimal_serde, Fixed, Vec2Fixed};
use crate::skills;

/// Side a projectile belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    /// Hurts the player.
    Enemy,
    /// Hurts combatants (a parried sandwich).
    Player,
}

/// How a projectile should look.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectileVisual {
    /// White chalk.
    Chalk,
    /// Red pop-quiz bullet.
    PopQuiz,
    /// Deadly graph line.
    Graph,
    /// Slowing bubble.
    Bubble,
    /// Pork sandwich.
    Sandwich,
}

/// Lingering effect applied to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerStatus {
    /// Movement multiplied by `factor` for `duration` seconds.
    Slowed {
        /// Movement multiplier.
        #[serde(with = "decimal_serde")]
        factor: Fixed,
        /// Seconds.
        #[serde(with = "decimal_serde")]
        duration: Fixed,
    },
    /// No dashing or jumping for `duration` seconds.
    Grounded {
        /// Seconds.
        #[serde(with = "decimal_serde")]
        duration: Fixed,
    },
}

/// Sound cue names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioCue {
    /// A boss special attack.
    BossSpecial,
    /// A boss went down.
    BossDefeated,
    /// Dog bark.
    Bark,
    /// Goldfish explosion.
    Splash,
}

/// Request for the host to create a projectile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectileSpec {
    /// Launch point.
    pub origin: Vec2Fixed,
    /// Heading in radians.
    #[serde(with = "decimal_serde")]
    pub angle: Fixed,
    /// Units per second.
    #[serde(with = "decimal_serde")]
    pub speed: Fixed,
    /// Damage on hit.
    #[serde(with = "decimal_serde")]
    pub damage: Fixed,
    /// Appearance.
    pub visual: ProjectileVisual,
    /// Whether it steers toward the player.
    pub homing: bool,
    /// Owner side.
    pub team: Team,
    /// Status applied to the player on hit.
    pub on_hit: Option<PlayerStatus>,
}

impl ProjectileSpec {
    /// Plain enemy projectile.
    #[must_use]
    pub fn enemy(
        origin: Vec2Fixed,
        angle: Fixed,
        speed: Fixed,
        damage: Fixed,
        visual: ProjectileVisual,
    ) -> Self {
        Self {
            origin,
            angle,
            speed,
            damage,
            visual,
            homing: false,
            team: Team::Enemy,
            on_hit: None,
        }
    }

    /// Mark as homing.
    #[must_use]
    pub fn homing(mut self) -> Self {
        self.homing = true;
        self
    }

    /// Attach an on-hit status.
    #[must_use]
    pub fn with_status(mut self, status: PlayerStatus) -> Self {
        self.on_hit = Some(status);
        self
    }
}

/// Read-only view of the player, supplied once per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    /// World position.
    pub position: Vec2Fixed,
    /// Current HP.
    #[serde(with = "decimal_serde")]
    pub hp: Fixed,
    /// Collision radius.
    #[serde(with = "decimal_serde")]
    pub radius: Fixed,
    /// Invisible players are not pursued.
    pub hidden: bool,
}

impl PlayerSnapshot {
    /// A visible player at `position` with default stats.
    #[must_use]
    pub fn at(position: Vec2Fixed) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }
}

impl Default for PlayerSnapshot {
    fn default() -> Self {
        Self {
            position: Vec2Fixed::ZERO,
            hp: Fixed::from_num(100),
            radius: Fixed::from_num(20),
            hidden: false,
        }
    }
}

/// Outward effects the engine requests. All methods default to no-ops.
pub trait EncounterHooks {
    /// Create a projectile.
    fn spawn_projectile(&mut self, _spec: ProjectileSpec) {}

    /// Burst of particles.
    fn spawn_particles(&mut self, _at: Vec2Fixed, _count: u32, _color: &'static str) {}

    /// Floating combat text.
    fn spawn_floating_text(
        &mut self,
        _text: &str,
        _at: Vec2Fixed,
        _color: &'static str,
        _size: u32,
    ) {
    }

    /// Camera shake.
    fn add_screen_shake(&mut self, _magnitude: Fixed) {}

    /// Sound effect.
    fn play_audio_cue(&mut self, _cue: AudioCue) {}

    /// Hurt the player directly (melee, cones, area strikes).
    fn damage_player(&mut self, _amount: Fixed) {}

    /// Push the player.
    fn knock_back_player(&mut self, _impulse: Vec2Fixed) {}

    /// Apply a lingering status to the player.
    fn apply_player_status(&mut self, _status: PlayerStatus) {}

    /// Award score.
    fn grant_reward(&mut self, _amount: Fixed) {}

    /// Place a pickup in the world.
    fn drop_pickup(&mut self, _at: Vec2Fixed) {}
}

/// Hooks that ignore everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHooks;

impl EncounterHooks for NullHooks {}

/// Auxiliary combatant requested by a tick or damage handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnRequest {
    /// Archetype to create.
    pub kind: ArchetypeKind,
    /// Summoner; auxiliaries are dismissed with it.
    pub owner: CombatantId,
    /// Spawn position.
    pub position: Vec2Fixed,
    /// Difficulty inherited from the summoner.
    pub difficulty: Fixed,
}

/// Everything a combatant may touch during one tick or damage call.
pub struct EncounterContext<'a> {
    /// Seconds elapsed this frame (zero inside damage calls).
    pub dt: Fixed,
    /// Player as of this frame.
    pub player: &'a PlayerSnapshot,
    /// Outward effects.
    pub hooks: &'a mut dyn EncounterHooks,
    /// Session-owned seeded generator.
    pub rng: &'a mut ChaCha8Rng,
    /// Balance tables.
    pub config: &'a EncounterConfig,
    /// Auxiliary spawns to insert after the current pass.
    pub spawns: &'a mut Vec<SpawnRequest>,
    /// Event log returned to the host.
    pub events: &'a mut EncounterEvents,
}

impl EncounterContext<'_> {
    /// Roll an independent chance on the session generator.
    pub fn roll(&mut self, chance: Fixed) -> bool {
        skills::roll(&mut *self.rng, chance)
    }

    /// Uniform offset with each axis in `[-radius, radius]`.
    pub fn scatter(&mut self, radius: Fixed) -> Vec2Fixed {
        scatter(&mut *self.rng, radius)
    }
}

/// Uniform offset with each axis in `[-radius, radius]`.
pub(crate) fn scatter(rng: &mut ChaCha8Rng, radius: Fixed) -> Vec2Fixed {
    let bits = radius.abs().to_bits();
    if bits == 0 {
        return Vec2Fixed::ZERO;
    }
    let x = rng.gen_range(-bits..=bits);
    let y = rng.gen_range(-bits..=bits);
    Vec2Fixed::new(Fixed::from_bits(x), Fixed::from_bits(y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_null_hooks_accept_everything() {
        let mut hooks = NullHooks;
        hooks.spawn_projectile(ProjectileSpec::enemy(
            Vec2Fixed::ZERO,
            Fixed::ZERO,
            Fixed::ONE,
            Fixed::ONE,
            ProjectileVisual::Chalk,
        ));
        hooks.damage_player(Fixed::ONE);
        hooks.grant_reward(Fixed::ONE);
        hooks.drop_pickup(Vec2Fixed::ZERO);
    }

    #[test]
    fn test_scatter_stays_in_bounds() {
        let config = EncounterConfig::default();
        let player = PlayerSnapshot::default();
        let mut hooks = NullHooks;
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut spawns = Vec::new();
        let mut events = EncounterEvents::default();
        let mut ctx = EncounterContext {
            dt: Fixed::ZERO,
            player: &player,
            hooks: &mut hooks,
            rng: &mut rng,
            config: &config,
            spawns: &mut spawns,
            events: &mut events,
        };

        let radius = Fixed::from_num(50);
        for _ in 0..100 {
            let offset = ctx.scatter(radius);
            assert!(offset.x.abs() <= radius && offset.y.abs() <= radius);
        }
        assert_eq!(ctx.scatter(Fixed::ZERO), Vec2Fixed::ZERO);
    }

    #[test]
    fn test_projectile_builders() {
        let spec = ProjectileSpec::enemy(
            Vec2Fixed::ZERO,
            Fixed::ZERO,
            Fixed::from_num(100),
            Fixed::from_num(30),
            ProjectileVisual::Bubble,
        )
        .homing()
        .with_status(PlayerStatus::Grounded {
            duration: Fixed::ONE,
        });
        assert!(spec.homing);
        assert_eq!(spec.team, Team::Enemy);
        assert!(spec.on_hit.is_some());
    }
}
