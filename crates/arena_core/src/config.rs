//! Data-driven balance tables.
//!
//! Every tunable number the encounter engine uses lives here. Tables are
//! serde structs loaded from RON; anything missing from a file falls back to
//! the shipped defaults, so a balance file only needs the values it changes.
//!
//! # Example
//!
//! ```
//! use arena_core::config::EncounterConfig;
//!
//! let config =
//!     EncounterConfig::from_ron_str("(manop: (enrage_speed_multiplier: 2.0))", "<inline>")
//!         .unwrap();
//! assert_eq!(config.manop.enrage_speed_multiplier.to_num::<f64>(), 2.0);
//! assert!(config.validate().is_empty());
//! ```

use serde::{Deserialize, Serialize};

use crate::archetypes::ArchetypeKind;
use crate::error::{EncounterError, Result};
use crate::math::{decimal_serde, option_decimal_serde, ratio, Fixed, Vec2Fixed};
use crate::skills::SkillId;

/// Cooldown used when a skill entry omits its own.
pub const DEFAULT_SKILL_COOLDOWN: Fixed = Fixed::from_bits(10_i64 << 32);

fn default_true() -> bool {
    true
}

/// One entry in an archetype's ordered skill list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillConfig {
    /// Which skill.
    pub id: SkillId,
    /// Full cooldown in seconds. Missing values fall back to [`DEFAULT_SKILL_COOLDOWN`].
    #[serde(default, with = "option_decimal_serde")]
    pub cooldown: Option<Fixed>,
    /// Independent selection chance in `[0, 1]`.
    #[serde(with = "decimal_serde")]
    pub chance: Fixed,
    /// Whether the skill is available from the start (phase unlocks flip this later).
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl SkillConfig {
    fn new(id: SkillId, cooldown: Fixed, chance: Fixed) -> Self {
        Self {
            id,
            cooldown: Some(cooldown),
            chance,
            enabled: true,
        }
    }

    fn locked(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// HP gate that moves a combatant into a new phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseGateConfig {
    /// Phase number entered (2 or higher).
    pub phase: u8,
    /// HP ratio below which the gate crosses.
    #[serde(with = "decimal_serde")]
    pub threshold: Fixed,
    /// Default enablement; spawn requests may override it.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Stats shared by every archetype.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyConfig {
    /// HP at difficulty 1.
    #[serde(with = "decimal_serde")]
    pub base_hp: Fixed,
    /// Pursuit speed in units per second.
    #[serde(with = "decimal_serde")]
    pub move_speed: Fixed,
    /// Collision radius.
    #[serde(with = "decimal_serde")]
    pub radius: Fixed,
    /// Contact damage (per second for melee bodies, per hit for kamikazes).
    #[serde(with = "decimal_serde")]
    pub contact_damage: Fixed,
    /// Reward at difficulty 1, granted once on defeat.
    #[serde(with = "decimal_serde")]
    pub reward: Fixed,
}

impl BodyConfig {
    fn from_ints(
        base_hp: i32,
        move_speed: i32,
        radius: i32,
        contact_damage: i32,
        reward: i32,
    ) -> Self {
        Self {
            base_hp: Fixed::from_num(base_hp),
            move_speed: Fixed::from_num(move_speed),
            radius: Fixed::from_num(radius),
            contact_damage: Fixed::from_num(contact_damage),
            reward: Fixed::from_num(reward),
        }
    }
}

/// Session-wide timings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How often a pursuing combatant considers its skills.
    #[serde(with = "decimal_serde")]
    pub chase_eval_interval: Fixed,
    /// Delay between a primary's defeat and the wave advance.
    #[serde(with = "decimal_serde")]
    pub next_wave_delay: Fixed,
    /// Pickups dropped when a primary falls.
    pub pickup_count: u32,
    /// Seconds between consecutive pickup drops.
    #[serde(with = "decimal_serde")]
    pub pickup_stagger: Fixed,
    /// Maximum scatter of each pickup from the defeat position.
    #[serde(with = "decimal_serde")]
    pub pickup_scatter: Fixed,
    /// Where primaries appear unless the spawn request says otherwise.
    pub primary_spawn: Vec2Fixed,
    /// Distance from the summoner at which auxiliaries appear.
    #[serde(with = "decimal_serde")]
    pub auxiliary_spawn_offset: Fixed,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            chase_eval_interval: Fixed::from_num(2),
            next_wave_delay: Fixed::from_num(2),
            pickup_count: 3,
            pickup_stagger: ratio(1, 5),
            pickup_scatter: Fixed::from_num(50),
            primary_spawn: Vec2Fixed::from_ints(0, -600),
            auxiliary_spawn_offset: Fixed::from_num(80),
        }
    }
}

/// Ranged chalk volley (Kru Manop's fallback).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolleyConfig {
    /// Seconds between shots.
    #[serde(with = "decimal_serde")]
    pub fire_interval: Fixed,
    /// Seconds between shots once enraged.
    #[serde(with = "decimal_serde")]
    pub enraged_fire_interval: Fixed,
    /// Chalk speed.
    #[serde(with = "decimal_serde")]
    pub projectile_speed: Fixed,
    /// Chalk damage.
    #[serde(with = "decimal_serde")]
    pub damage: Fixed,
    /// Side-shot offset in radians once enraged.
    #[serde(with = "decimal_serde")]
    pub fan_angle: Fixed,
    /// Chance after each shot to go back to pursuit.
    #[serde(with = "decimal_serde")]
    pub exit_chance: Fixed,
}

impl Default for VolleyConfig {
    fn default() -> Self {
        Self {
            fire_interval: ratio(1, 10),
            enraged_fire_interval: ratio(1, 20),
            projectile_speed: Fixed::from_num(600),
            damage: Fixed::from_num(13),
            fan_angle: ratio(3, 10),
            exit_chance: ratio(8, 100),
        }
    }
}

/// Pop-quiz projectile ring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopQuizConfig {
    /// Chance the fallback picks the pop quiz over a volley.
    #[serde(with = "decimal_serde")]
    pub chance: Fixed,
    /// Stationary wind-up before the ring fires.
    #[serde(with = "decimal_serde")]
    pub wind_up: Fixed,
    /// Bullets in the ring.
    pub bullets: u32,
    /// Bullets in the ring once enraged.
    pub enraged_bullets: u32,
    /// Bullet speed.
    #[serde(with = "decimal_serde")]
    pub projectile_speed: Fixed,
    /// Bullet damage.
    #[serde(with = "decimal_serde")]
    pub damage: Fixed,
    /// Extra pursuit time before the next skill evaluation.
    #[serde(with = "decimal_serde")]
    pub post_delay: Fixed,
}

impl Default for PopQuizConfig {
    fn default() -> Self {
        Self {
            chance: ratio(3, 10),
            wind_up: Fixed::ONE,
            bullets: 18,
            enraged_bullets: 26,
            projectile_speed: Fixed::from_num(400),
            damage: Fixed::from_num(26),
            post_delay: Fixed::ONE,
        }
    }
}

/// Staged area or line attack (equation slam, deadly graph).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrikeConfig {
    /// Seconds before the strike lands.
    #[serde(with = "decimal_serde")]
    pub wind_up: Fixed,
    /// Seconds after the strike before pursuit resumes.
    #[serde(with = "decimal_serde")]
    pub recovery: Fixed,
    /// Damage on hit.
    #[serde(with = "decimal_serde")]
    pub damage: Fixed,
    /// Area radius, or travel speed for projectile strikes.
    #[serde(with = "decimal_serde")]
    pub reach: Fixed,
}

/// Kru Manop's cone bark (dog rider only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BarkConfig {
    /// Chance once enraged.
    #[serde(with = "decimal_serde")]
    pub enraged_chance: Fixed,
    /// Seconds before the bark.
    #[serde(with = "decimal_serde")]
    pub wind_up: Fixed,
    /// Seconds after the bark.
    #[serde(with = "decimal_serde")]
    pub recovery: Fixed,
    /// Damage to a player inside the cone.
    #[serde(with = "decimal_serde")]
    pub damage: Fixed,
    /// Cone length.
    #[serde(with = "decimal_serde")]
    pub range: Fixed,
    /// Cone half-angle in radians.
    #[serde(with = "decimal_serde")]
    pub cone_half_angle: Fixed,
    /// Knock-back impulse magnitude.
    #[serde(with = "decimal_serde")]
    pub knockback: Fixed,
}

impl Default for BarkConfig {
    fn default() -> Self {
        Self {
            enraged_chance: ratio(2, 5),
            wind_up: ratio(3, 10),
            recovery: ratio(3, 10),
            damage: Fixed::from_num(25),
            range: Fixed::from_num(600),
            // π / 3.5
            cone_half_angle: crate::math::PI * ratio(2, 7),
            knockback: Fixed::from_num(480),
        }
    }
}

/// The log 4.57 fortify cycle: invulnerable heal, attack bonus, crash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FortifyConfig {
    /// Invulnerable charge time.
    #[serde(with = "decimal_serde")]
    pub charge_duration: Fixed,
    /// Fraction of max HP healed per second while charging.
    #[serde(with = "decimal_serde")]
    pub heal_rate: Fixed,
    /// Attack bonus granted when the charge completes.
    #[serde(with = "decimal_serde")]
    pub attack_bonus: Fixed,
    /// Attack bonus growth per second while empowered.
    #[serde(with = "decimal_serde")]
    pub attack_growth: Fixed,
    /// How long the bonus lasts.
    #[serde(with = "decimal_serde")]
    pub active_duration: Fixed,
    /// Stun after the bonus wears off.
    #[serde(with = "decimal_serde")]
    pub stun_duration: Fixed,
}

impl Default for FortifyConfig {
    fn default() -> Self {
        Self {
            charge_duration: Fixed::from_num(2),
            heal_rate: ratio(1, 10),
            attack_bonus: ratio(9, 100),
            attack_growth: ratio(4, 100),
            active_duration: Fixed::from_num(5),
            stun_duration: ratio(6, 5),
        }
    }
}

/// Phase 3 goldfish swarm and bubble prison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwarmConfig {
    /// Wind-up before either phase 3 skill fires.
    #[serde(with = "decimal_serde")]
    pub wind_up: Fixed,
    /// Recovery after either phase 3 skill.
    #[serde(with = "decimal_serde")]
    pub recovery: Fixed,
    /// Goldfish summoned per swarm.
    pub goldfish_count: u32,
    /// Bubbles per prison volley.
    pub bubble_count: u32,
    /// Bubble speed.
    #[serde(with = "decimal_serde")]
    pub bubble_speed: Fixed,
    /// Bubble damage.
    #[serde(with = "decimal_serde")]
    pub bubble_damage: Fixed,
    /// Angle between neighbouring bubbles.
    #[serde(with = "decimal_serde")]
    pub bubble_spread: Fixed,
    /// Movement factor applied to a bubbled player.
    #[serde(with = "decimal_serde")]
    pub slow_factor: Fixed,
    /// Seconds the slow lasts.
    #[serde(with = "decimal_serde")]
    pub slow_duration: Fixed,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            wind_up: ratio(1, 2),
            recovery: ratio(2, 5),
            goldfish_count: 2,
            bubble_count: 3,
            bubble_speed: Fixed::from_num(100),
            bubble_damage: Fixed::from_num(30),
            bubble_spread: ratio(7, 20),
            slow_factor: ratio(1, 2),
            slow_duration: Fixed::from_num(2),
        }
    }
}

/// Kru Manop, the dog-rider math teacher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManopConfig {
    /// Shared stats.
    pub body: BodyConfig,
    /// Skills in priority order.
    pub skills: Vec<SkillConfig>,
    /// HP gates.
    pub phase_gates: Vec<PhaseGateConfig>,
    /// Speed multiplier applied on enrage.
    #[serde(with = "decimal_serde")]
    pub enrage_speed_multiplier: Fixed,
    /// Fallback volley.
    pub volley: VolleyConfig,
    /// Fallback pop quiz.
    pub pop_quiz: PopQuizConfig,
    /// Equation slam (reach is the area radius).
    pub slam: StrikeConfig,
    /// Deadly graph (reach is the projectile speed).
    pub graph: StrikeConfig,
    /// Rider bark.
    pub bark: BarkConfig,
    /// Log 4.57 cycle.
    pub fortify: FortifyConfig,
    /// Phase 3 skills.
    pub swarm: SwarmConfig,
    /// Stun applied by the stagger counter-mechanic.
    #[serde(with = "decimal_serde")]
    pub stagger_duration: Fixed,
}

impl Default for ManopConfig {
    fn default() -> Self {
        Self {
            body: BodyConfig::from_ints(2350, 125, 50, 25, 5000),
            skills: vec![
                SkillConfig::new(SkillId::Log457, Fixed::from_num(26), ratio(1, 5)),
                SkillConfig::new(SkillId::DeadlyGraph, Fixed::from_num(18), ratio(1, 4)),
                SkillConfig::new(SkillId::Bark, ratio(7, 2), ratio(18, 100)).locked(),
                SkillConfig::new(SkillId::EquationSlam, Fixed::from_num(16), ratio(3, 10)),
                SkillConfig::new(SkillId::GoldfishSwarm, ratio(11, 2), ratio(7, 20)).locked(),
                SkillConfig::new(SkillId::BubblePrison, ratio(15, 2), ratio(3, 10)).locked(),
            ],
            phase_gates: vec![
                PhaseGateConfig {
                    phase: 2,
                    threshold: ratio(1, 2),
                    enabled: true,
                },
                PhaseGateConfig {
                    phase: 3,
                    threshold: ratio(1, 4),
                    enabled: false,
                },
            ],
            enrage_speed_multiplier: ratio(33, 20),
            volley: VolleyConfig::default(),
            pop_quiz: PopQuizConfig::default(),
            slam: StrikeConfig {
                wind_up: ratio(1, 2),
                recovery: ratio(1, 2),
                damage: Fixed::from_num(35),
                reach: Fixed::from_num(320),
            },
            graph: StrikeConfig {
                wind_up: ratio(3, 5),
                recovery: ratio(3, 5),
                damage: Fixed::from_num(45),
                reach: Fixed::from_num(600),
            },
            bark: BarkConfig::default(),
            fortify: FortifyConfig::default(),
            swarm: SwarmConfig::default(),
            stagger_duration: ratio(6, 5),
        }
    }
}

/// Kru First leap (free fall).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FreeFallConfig {
    /// Grounded wind-up while the landing spot is marked.
    #[serde(with = "decimal_serde")]
    pub wind_up: Fixed,
    /// Invulnerable airborne time.
    #[serde(with = "decimal_serde")]
    pub airborne: Fixed,
    /// Recovery after landing.
    #[serde(with = "decimal_serde")]
    pub recovery: Fixed,
    /// Landing damage.
    #[serde(with = "decimal_serde")]
    pub damage: Fixed,
    /// Landing radius.
    #[serde(with = "decimal_serde")]
    pub radius: Fixed,
}

impl Default for FreeFallConfig {
    fn default() -> Self {
        Self {
            wind_up: ratio(2, 5),
            airborne: ratio(6, 5),
            recovery: ratio(3, 5),
            damage: Fixed::from_num(40),
            radius: Fixed::from_num(140),
        }
    }
}

/// Kru First sandwich toss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandwichConfig {
    /// Wind-up before the throw.
    #[serde(with = "decimal_serde")]
    pub wind_up: Fixed,
    /// Recovery after the throw.
    #[serde(with = "decimal_serde")]
    pub recovery: Fixed,
    /// Sandwich speed.
    #[serde(with = "decimal_serde")]
    pub speed: Fixed,
    /// Damage as a multiple of contact damage.
    #[serde(with = "decimal_serde")]
    pub damage_multiplier: Fixed,
}

impl Default for SandwichConfig {
    fn default() -> Self {
        Self {
            wind_up: ratio(7, 20),
            recovery: ratio(1, 2),
            speed: Fixed::from_num(500),
            damage_multiplier: Fixed::from_num(5),
        }
    }
}

/// Kru First EMP pulse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmpConfig {
    /// Charge time before the pulse.
    #[serde(with = "decimal_serde")]
    pub wind_up: Fixed,
    /// Recovery after the pulse.
    #[serde(with = "decimal_serde")]
    pub recovery: Fixed,
    /// Pulse radius.
    #[serde(with = "decimal_serde")]
    pub radius: Fixed,
    /// Pulse damage.
    #[serde(with = "decimal_serde")]
    pub damage: Fixed,
    /// Seconds the player stays grounded.
    #[serde(with = "decimal_serde")]
    pub grounded_duration: Fixed,
}

impl Default for EmpConfig {
    fn default() -> Self {
        Self {
            wind_up: ratio(4, 5),
            recovery: ratio(3, 5),
            radius: Fixed::from_num(420),
            damage: Fixed::from_num(15),
            grounded_duration: ratio(3, 2),
        }
    }
}

/// Kru First, the physics teacher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirstConfig {
    /// Shared stats.
    pub body: BodyConfig,
    /// Skills in priority order.
    pub skills: Vec<SkillConfig>,
    /// HP gates.
    pub phase_gates: Vec<PhaseGateConfig>,
    /// Cooldown scale applied on overclock.
    #[serde(with = "decimal_serde")]
    pub overclock_cooldown_scale: Fixed,
    /// Speed multiplier applied on overclock.
    #[serde(with = "decimal_serde")]
    pub overclock_speed_multiplier: Fixed,
    /// Leap.
    pub free_fall: FreeFallConfig,
    /// Sandwich toss.
    pub sandwich: SandwichConfig,
    /// EMP pulse.
    pub emp: EmpConfig,
    /// Stun applied by a parried sandwich.
    #[serde(with = "decimal_serde")]
    pub stagger_duration: Fixed,
}

impl Default for FirstConfig {
    fn default() -> Self {
        Self {
            body: BodyConfig::from_ints(2600, 140, 45, 25, 6000),
            skills: vec![
                SkillConfig::new(SkillId::FreeFall, Fixed::from_num(12), ratio(7, 20)),
                SkillConfig::new(SkillId::SandwichToss, Fixed::from_num(6), ratio(1, 2)),
                SkillConfig::new(SkillId::EmpPulse, Fixed::from_num(15), ratio(1, 4)),
            ],
            phase_gates: vec![PhaseGateConfig {
                phase: 2,
                threshold: ratio(1, 2),
                enabled: true,
            }],
            overclock_cooldown_scale: ratio(7, 10),
            overclock_speed_multiplier: ratio(13, 10),
            free_fall: FreeFallConfig::default(),
            sandwich: SandwichConfig::default(),
            emp: EmpConfig::default(),
            stagger_duration: ratio(3, 2),
        }
    }
}

/// Boss Dog lunge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LungeConfig {
    /// Crouch before the dash.
    #[serde(with = "decimal_serde")]
    pub wind_up: Fixed,
    /// Dash time.
    #[serde(with = "decimal_serde")]
    pub dash: Fixed,
    /// Recovery after the dash.
    #[serde(with = "decimal_serde")]
    pub recovery: Fixed,
    /// Dash speed as a multiple of move speed.
    #[serde(with = "decimal_serde")]
    pub speed_multiplier: Fixed,
    /// Maximum distance to the player for a lunge.
    #[serde(with = "decimal_serde")]
    pub range: Fixed,
}

impl Default for LungeConfig {
    fn default() -> Self {
        Self {
            wind_up: ratio(1, 4),
            dash: ratio(7, 20),
            recovery: ratio(2, 5),
            speed_multiplier: ratio(5, 2),
            range: Fixed::from_num(320),
        }
    }
}

/// Boss Dog, summoned by a rider on enrage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DogConfig {
    /// Shared stats.
    pub body: BodyConfig,
    /// Skills in priority order.
    pub skills: Vec<SkillConfig>,
    /// Lunge.
    pub lunge: LungeConfig,
    /// Stun applied by the stagger counter-mechanic.
    #[serde(with = "decimal_serde")]
    pub stagger_duration: Fixed,
}

impl Default for DogConfig {
    fn default() -> Self {
        Self {
            body: BodyConfig::from_ints(1000, 260, 20, 22, 500),
            skills: vec![SkillConfig::new(
                SkillId::Lunge,
                Fixed::from_num(4),
                ratio(1, 2),
            )],
            lunge: LungeConfig::default(),
            stagger_duration: Fixed::ONE,
        }
    }
}

/// Goldfish kamikaze minion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoldfishConfig {
    /// Shared stats (contact damage is the one-shot explosion).
    pub body: BodyConfig,
    /// Side-to-side wobble amplitude.
    #[serde(with = "decimal_serde")]
    pub wobble_amplitude: Fixed,
    /// Wobble frequency in radians per second.
    #[serde(with = "decimal_serde")]
    pub wobble_frequency: Fixed,
}

impl Default for GoldfishConfig {
    fn default() -> Self {
        Self {
            body: BodyConfig::from_ints(50, 165, 12, 18, 50),
            wobble_amplitude: Fixed::from_num(40),
            wobble_frequency: ratio(7, 2),
        }
    }
}

/// Wave progression rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveConfig {
    /// Waves before victory.
    pub max_waves: u32,
    /// A boss appears every N waves.
    pub boss_every: u32,
    /// Boss encounter number from which Kru Manop rides the dog.
    pub rider_from_encounter: u32,
    /// Boss encounter number from which phase 3 is enabled.
    pub phase3_from_encounter: u32,
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self {
            max_waves: 9,
            boss_every: 3,
            rider_from_encounter: 2,
            phase3_from_encounter: 3,
        }
    }
}

/// Complete balance table for an encounter session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncounterConfig {
    /// Session timings.
    pub session: SessionConfig,
    /// Kru Manop.
    pub manop: ManopConfig,
    /// Kru First.
    pub first: FirstConfig,
    /// Boss Dog.
    pub dog: DogConfig,
    /// Goldfish.
    pub goldfish: GoldfishConfig,
    /// Waves.
    pub waves: WaveConfig,
}

/// A non-fatal problem found by [`EncounterConfig::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigIssue {
    /// Dotted path to the field.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl EncounterConfig {
    /// Parse a balance table from RON text.
    ///
    /// # Errors
    ///
    /// Returns [`EncounterError::ConfigParse`] if the text is not a valid table.
    pub fn from_ron_str(text: &str, source_name: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| EncounterError::ConfigParse {
            source_name: source_name.to_string(),
            message: e.to_string(),
        })
    }

    /// Render the table as pretty RON.
    ///
    /// # Errors
    ///
    /// Returns [`EncounterError::InvalidConfig`] if serialization fails.
    pub fn to_ron_string(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default()).map_err(|e| {
            EncounterError::InvalidConfig {
                field: "<root>".to_string(),
                reason: e.to_string(),
            }
        })
    }

    /// Stats block for an archetype.
    #[must_use]
    pub fn body(&self, kind: ArchetypeKind) -> &BodyConfig {
        match kind {
            ArchetypeKind::KruManop => &self.manop.body,
            ArchetypeKind::KruFirst => &self.first.body,
            ArchetypeKind::BossDog => &self.dog.body,
            ArchetypeKind::Goldfish => &self.goldfish.body,
        }
    }

    /// Ordered skill list for an archetype.
    #[must_use]
    pub fn skills(&self, kind: ArchetypeKind) -> &[SkillConfig] {
        match kind {
            ArchetypeKind::KruManop => &self.manop.skills,
            ArchetypeKind::KruFirst => &self.first.skills,
            ArchetypeKind::BossDog => &self.dog.skills,
            ArchetypeKind::Goldfish => &[],
        }
    }

    /// HP gates for an archetype.
    #[must_use]
    pub fn phase_gates(&self, kind: ArchetypeKind) -> &[PhaseGateConfig] {
        match kind {
            ArchetypeKind::KruManop => &self.manop.phase_gates,
            ArchetypeKind::KruFirst => &self.first.phase_gates,
            ArchetypeKind::BossDog | ArchetypeKind::Goldfish => &[],
        }
    }

    /// Check the table for values that load fine but will misbehave.
    ///
    /// Returns an empty list when the table is sound.
    #[must_use]
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        let mut push = |field: String, message: &str| {
            issues.push(ConfigIssue {
                field,
                message: message.to_string(),
            });
        };

        if self.session.chase_eval_interval <= Fixed::ZERO {
            push("session.chase_eval_interval".into(), "must be positive");
        }
        if self.session.next_wave_delay < Fixed::ZERO {
            push("session.next_wave_delay".into(), "must not be negative");
        }

        for kind in ArchetypeKind::ALL {
            let name = kind.config_key();
            let body = self.body(kind);
            if body.base_hp <= Fixed::ZERO {
                push(format!("{name}.body.base_hp"), "must be positive");
            }
            if body.move_speed < Fixed::ZERO {
                push(format!("{name}.body.move_speed"), "must not be negative");
            }
            if body.radius <= Fixed::ZERO {
                push(format!("{name}.body.radius"), "must be positive");
            }

            for (i, skill) in self.skills(kind).iter().enumerate() {
                if skill.chance < Fixed::ZERO || skill.chance > Fixed::ONE {
                    push(format!("{name}.skills[{i}].chance"), "must lie in [0, 1]");
                }
                match skill.cooldown {
                    None => push(
                        format!("{name}.skills[{i}].cooldown"),
                        "missing, the default cooldown will be used",
                    ),
                    Some(cd) if cd < Fixed::ZERO => {
                        push(format!("{name}.skills[{i}].cooldown"), "must not be negative");
                    }
                    Some(_) => {}
                }
            }

            let gates = self.phase_gates(kind);
            for (i, gate) in gates.iter().enumerate() {
                if gate.threshold <= Fixed::ZERO || gate.threshold >= Fixed::ONE {
                    push(
                        format!("{name}.phase_gates[{i}].threshold"),
                        "must lie strictly between 0 and 1",
                    );
                }
                if gate.phase < 2 {
                    push(format!("{name}.phase_gates[{i}].phase"), "gates start at phase 2");
                }
                if i > 0 {
                    let prev = &gates[i - 1];
                    if gate.phase <= prev.phase {
                        push(
                            format!("{name}.phase_gates[{i}].phase"),
                            "phases must be listed in ascending order",
                        );
                    }
                    if gate.threshold >= prev.threshold {
                        push(
                            format!("{name}.phase_gates[{i}].threshold"),
                            "thresholds must descend as phases ascend",
                        );
                    }
                }
            }
        }

        if self.manop.pop_quiz.chance < Fixed::ZERO || self.manop.pop_quiz.chance > Fixed::ONE {
            push("manop.pop_quiz.chance".into(), "must lie in [0, 1]");
        }
        if self.manop.volley.fire_interval <= Fixed::ZERO
            || self.manop.volley.enraged_fire_interval <= Fixed::ZERO
        {
            push("manop.volley".into(), "fire intervals must be positive");
        }
        if self.waves.boss_every == 0 {
            push("waves.boss_every".into(), "must be at least 1");
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EncounterConfig::default();
        assert!(config.validate().is_empty(), "{:?}", config.validate());
    }

    #[test]
    fn test_manop_defaults_match_balance_sheet() {
        let manop = ManopConfig::default();
        assert_eq!(manop.body.base_hp, Fixed::from_num(2350));
        assert_eq!(manop.skills[0].id, SkillId::Log457);
        assert_eq!(manop.skills[0].chance, ratio(1, 5));
        assert_eq!(manop.enrage_speed_multiplier, ratio(165, 100));
        assert!(!manop.phase_gates[1].enabled);
    }

    #[test]
    fn test_partial_ron_keeps_defaults() {
        let config = EncounterConfig::from_ron_str(
            "(session: (next_wave_delay: 3.5), waves: (max_waves: 12))",
            "<test>",
        )
        .unwrap();
        assert_eq!(config.session.next_wave_delay, ratio(7, 2));
        assert_eq!(config.session.pickup_count, 3);
        assert_eq!(config.waves.max_waves, 12);
        assert_eq!(config.manop, ManopConfig::default());
    }

    #[test]
    fn test_missing_cooldown_parses_as_none() {
        let text = "(dog: (skills: [(id: Lunge, chance: 0.5)]))";
        let config = EncounterConfig::from_ron_str(text, "<test>").unwrap();
        assert_eq!(config.dog.skills[0].cooldown, None);
        assert!(config
            .validate()
            .iter()
            .any(|issue| issue.field == "dog.skills[0].cooldown"));
    }

    #[test]
    fn test_malformed_ron_is_typed_error() {
        let err = EncounterConfig::from_ron_str("(session: (", "broken.ron").unwrap_err();
        assert!(matches!(
            err,
            EncounterError::ConfigParse { ref source_name, .. } if source_name == "broken.ron"
        ));
    }

    #[test]
    fn test_validate_flags_bad_gates_and_chances() {
        let mut config = EncounterConfig::default();
        config.manop.phase_gates[1].threshold = ratio(3, 5);
        config.first.skills[0].chance = Fixed::from_num(2);
        config.first.phase_gates[0].threshold = Fixed::ONE;

        let fields: Vec<_> = config.validate().into_iter().map(|i| i.field).collect();
        assert!(fields.contains(&"manop.phase_gates[1].threshold".to_string()));
        assert!(fields.contains(&"first.skills[0].chance".to_string()));
        assert!(fields.contains(&"first.phase_gates[0].threshold".to_string()));
    }

    #[test]
    fn test_ron_round_trip_preserves_table() {
        let config = EncounterConfig::default();
        let text = config.to_ron_string().unwrap();
        let back = EncounterConfig::from_ron_str(&text, "<round-trip>").unwrap();
        assert_eq!(back.waves, config.waves);
        assert_eq!(back.session.pickup_count, config.session.pickup_count);
    }
}
