//! Unit-test harness for driving a single combatant without a session.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::archetypes::{ArchetypeKind, Role};
use crate::combatant::Combatant;
use crate::config::EncounterConfig;
use crate::context::{
    EncounterContext, EncounterHooks, PlayerSnapshot, PlayerStatus, ProjectileSpec, SpawnRequest,
};
use crate::encounter::EncounterEvents;
use crate::math::{Fixed, Vec2Fixed};
use crate::phase::PhaseFlags;

#[derive(Debug, Default)]
pub(crate) struct TallyHooks {
    pub projectiles: Vec<ProjectileSpec>,
    pub texts: Vec<String>,
    pub player_damage: Fixed,
    pub knockbacks: u32,
    pub statuses: Vec<PlayerStatus>,
    pub rewards: Vec<Fixed>,
}

impl EncounterHooks for TallyHooks {
    fn spawn_projectile(&mut self, spec: ProjectileSpec) {
        self.projectiles.push(spec);
    }

    fn spawn_floating_text(
        &mut self,
        text: &str,
        _at: Vec2Fixed,
        _color: &'static str,
        _size: u32,
    ) {
        self.texts.push(text.to_string());
    }

    fn damage_player(&mut self, amount: Fixed) {
        self.player_damage += amount;
    }

    fn knock_back_player(&mut self, _impulse: Vec2Fixed) {
        self.knockbacks += 1;
    }

    fn apply_player_status(&mut self, status: PlayerStatus) {
        self.statuses.push(status);
    }

    fn grant_reward(&mut self, amount: Fixed) {
        self.rewards.push(amount);
    }
}

pub(crate) struct Rig {
    pub config: EncounterConfig,
    pub player: PlayerSnapshot,
    pub hooks: TallyHooks,
    pub rng: ChaCha8Rng,
    pub spawns: Vec<SpawnRequest>,
    pub events: EncounterEvents,
}

impl Rig {
    pub fn new(config: EncounterConfig) -> Self {
        Self {
            config,
            player: PlayerSnapshot::at(Vec2Fixed::from_ints(0, 200)),
            hooks: TallyHooks::default(),
            rng: ChaCha8Rng::seed_from_u64(11),
            spawns: Vec::new(),
            events: EncounterEvents::default(),
        }
    }

    pub fn spawn(&self, kind: ArchetypeKind, rider: bool, flags: Option<PhaseFlags>) -> Combatant {
        Combatant::new(
            1,
            kind,
            Role::Primary,
            None,
            Vec2Fixed::ZERO,
            Fixed::ONE,
            rider,
            flags,
            &self.config,
        )
    }

    pub fn ctx(&mut self, dt: Fixed) -> EncounterContext<'_> {
        EncounterContext {
            dt,
            player: &self.player,
            hooks: &mut self.hooks,
            rng: &mut self.rng,
            config: &self.config,
            spawns: &mut self.spawns,
            events: &mut self.events,
        }
    }

    /// Tick `combatant` for `seconds` in steps of `dt`.
    pub fn run(&mut self, combatant: &mut Combatant, seconds: Fixed, dt: Fixed) {
        let mut elapsed = Fixed::ZERO;
        while elapsed < seconds {
            let mut ctx = self.ctx(dt);
            combatant.tick(&mut ctx);
            elapsed += dt;
        }
    }
}
