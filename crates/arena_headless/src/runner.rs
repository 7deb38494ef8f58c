//! Scripted duel runner.
//!
//! Plays the host's part of an encounter: a scripted player that hits the
//! boss on a fixed cadence, a simple projectile simulation for everything the
//! engine launches, and wave progression driven by the session's deferred
//! wave-advance callback.

use std::cell::Cell;
use std::rc::Rc;

use arena_core::math::fixed_sin;
use arena_core::phase::PhaseFlags;
use arena_core::prelude::{
    AudioCue, CombatantId, DamageOutcome, EncounterConfig, EncounterHooks, EncounterSession,
    Fixed, PlayerSnapshot, PlayerStatus, ProjectileSpec, Role, SpawnSpec, Team, Vec2Fixed,
    WaveOutcome, WaveProgression,
};
use tracing::{debug, info, trace};

use crate::protocol::{DuelOutcome, DuelReport, Frame, PlayerState};
use crate::scenario::{EncounterSetup, Scenario, ScenarioError};

/// Projectiles vanish after this many seconds.
const PROJECTILE_LIFETIME: i32 = 5;

/// Projectile hit radius added to the player's.
const PROJECTILE_RADIUS: i32 = 8;

/// How quickly homing projectiles turn toward the player, per second.
const HOMING_TURN_RATE: i32 = 2;

/// Output and bookkeeping switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerOptions {
    /// Emit a state frame every N ticks (0 = never).
    pub state_interval: u64,
    /// Keep the state hash of every tick in the report.
    pub record_hashes: bool,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            state_interval: 60,
            record_hashes: false,
        }
    }
}

/// Collaborator the engine talks to during a duel.
#[derive(Debug, Default)]
pub struct DuelHooks {
    launched: Vec<ProjectileSpec>,
    damage_taken: Fixed,
    statuses: u32,
    knockbacks: u32,
    rewards: Fixed,
    pickups: u32,
}

impl DuelHooks {
    /// Projectiles launched since the last drain.
    pub fn drain_projectiles(&mut self) -> Vec<ProjectileSpec> {
        std::mem::take(&mut self.launched)
    }

    /// Damage the player has taken so far.
    pub fn damage_taken(&self) -> Fixed {
        self.damage_taken
    }
}

impl EncounterHooks for DuelHooks {
    fn spawn_projectile(&mut self, spec: ProjectileSpec) {
        self.launched.push(spec);
    }

    fn spawn_floating_text(
        &mut self,
        text: &str,
        _at: Vec2Fixed,
        _color: &'static str,
        _size: u32,
    ) {
        trace!(text, "floating text");
    }

    fn play_audio_cue(&mut self, cue: AudioCue) {
        trace!(?cue, "audio cue");
    }

    fn damage_player(&mut self, amount: Fixed) {
        self.damage_taken = self.damage_taken.saturating_add(amount);
    }

    fn knock_back_player(&mut self, _impulse: Vec2Fixed) {
        self.knockbacks += 1;
    }

    fn apply_player_status(&mut self, status: PlayerStatus) {
        trace!(?status, "player status");
        self.statuses += 1;
    }

    fn grant_reward(&mut self, amount: Fixed) {
        self.rewards = self.rewards.saturating_add(amount);
    }

    fn drop_pickup(&mut self, _at: Vec2Fixed) {
        self.pickups += 1;
    }
}

/// A projectile in flight.
#[derive(Debug, Clone)]
struct Projectile {
    position: Vec2Fixed,
    velocity: Vec2Fixed,
    speed: Fixed,
    damage: Fixed,
    homing: bool,
    status: Option<PlayerStatus>,
    age: Fixed,
}

impl Projectile {
    fn launch(spec: &ProjectileSpec) -> Self {
        Self {
            position: spec.origin,
            velocity: Vec2Fixed::from_angle(spec.angle).scale(spec.speed),
            speed: spec.speed,
            damage: spec.damage,
            homing: spec.homing,
            status: spec.on_hit,
            age: Fixed::ZERO,
        }
    }

    fn step(&mut self, target: Vec2Fixed, dt: Fixed) {
        if self.homing {
            let desired = (target - self.position).normalize().scale(self.speed);
            let turn = (Fixed::from_num(HOMING_TURN_RATE) * dt).min(Fixed::ONE);
            self.velocity += (desired - self.velocity).scale(turn);
        }
        self.position += self.velocity.scale(dt);
        self.age += dt;
    }
}

/// The scripted player.
#[derive(Debug, Clone)]
struct Pilot {
    anchor: Vec2Fixed,
    position: Vec2Fixed,
    hp: Fixed,
    radius: Fixed,
    strafe: Fixed,
}

impl Pilot {
    fn new(scenario: &Scenario) -> Self {
        let (x, y) = scenario.player.position;
        let anchor = Vec2Fixed::from_ints(x, y);
        Self {
            anchor,
            position: anchor,
            hp: Fixed::saturating_from_num(scenario.player.hp),
            radius: Fixed::saturating_from_num(scenario.player.radius),
            strafe: Fixed::from_num(scenario.player.strafe),
        }
    }

    fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            position: self.position,
            hp: self.hp,
            radius: self.radius,
            hidden: false,
        }
    }

    fn strafe_to(&mut self, elapsed: Fixed) {
        let sway = fixed_sin(elapsed).saturating_mul(self.strafe);
        self.position = self.anchor + Vec2Fixed::new(sway, Fixed::ZERO);
    }

    fn state(&self) -> PlayerState {
        PlayerState {
            x: self.position.x.to_num(),
            y: self.position.y.to_num(),
            hp: self.hp.to_num(),
        }
    }
}

/// Runs one scenario against the engine.
#[derive(Debug, Clone)]
pub struct DuelRunner {
    scenario: Scenario,
    config: EncounterConfig,
    options: RunnerOptions,
}

impl DuelRunner {
    /// Prepare a runner, loading the scenario's balance tables.
    pub fn new(scenario: Scenario) -> Result<Self, ScenarioError> {
        scenario.check()?;
        let config = scenario.encounter_config()?;
        Ok(Self {
            scenario,
            config,
            options: RunnerOptions::default(),
        })
    }

    /// Replace the output options.
    #[must_use]
    pub fn with_options(mut self, options: RunnerOptions) -> Self {
        self.options = options;
        self
    }

    /// The scenario being run.
    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    /// Run without emitting frames.
    pub fn run_quiet(&self, seed: u64) -> Result<DuelReport, ScenarioError> {
        self.run(seed, &mut |_: &Frame| {})
    }

    /// Run one duel, handing every frame to `emit`.
    pub fn run(
        &self,
        seed: u64,
        emit: &mut dyn FnMut(&Frame),
    ) -> Result<DuelReport, ScenarioError> {
        let scenario = &self.scenario;
        let dt = Fixed::ONE / Fixed::from_num(scenario.tick_rate);
        let hit_interval = u64::from(scenario.player.hit_interval);
        let stagger_interval = u64::from(scenario.player.stagger_interval);

        let mut session = EncounterSession::new(self.config.clone(), seed);
        let advances = Rc::new(Cell::new(0_u32));
        {
            let advances = Rc::clone(&advances);
            session.on_wave_advance(move || advances.set(advances.get() + 1));
        }
        session.on_combatant_defeated(|report| {
            debug!(
                id = report.id,
                kind = ?report.kind,
                reward = %report.reward,
                "combatant defeated"
            );
        });

        let mut hooks = DuelHooks::default();
        let mut pilot = Pilot::new(scenario);
        let mut projectiles: Vec<Projectile> = Vec::new();
        let mut report = DuelReport::new(&scenario.name, seed);
        let mut waves = match scenario.encounter {
            EncounterSetup::Waves => Some(WaveProgression::new(self.config.waves.clone())),
            EncounterSetup::Duel { .. } => None,
        };

        emit(&Frame::ready(&scenario.name, seed));
        info!(scenario = %scenario.name, seed, "duel started");

        let mut outcome = None;

        match &scenario.encounter {
            EncounterSetup::Duel {
                boss,
                difficulty,
                rider,
                phase3,
            } => {
                let flags = PhaseFlags::from_gates(self.config.phase_gates(*boss)).with(3, *phase3);
                session.spawn(
                    SpawnSpec::primary(*boss)
                        .with_difficulty(Fixed::saturating_from_num(*difficulty))
                        .with_rider(*rider)
                        .with_phase_flags(flags),
                )?;
            }
            EncounterSetup::Waves => {
                if let Some(progression) = waves.as_mut() {
                    if !start_next_boss(progression, &mut session, 0, emit)? {
                        outcome = Some(DuelOutcome::Victory);
                    }
                }
            }
        }

        let mut tick = 0_u64;
        while outcome.is_none() && tick < scenario.max_ticks {
            tick += 1;

            if tick % hit_interval == 0 {
                if let Some(target) = pick_target(&session, scenario.player.focus_auxiliaries) {
                    let result =
                        session.take_damage(target, scenario.player.hit_damage, &mut hooks);
                    match result {
                        DamageOutcome::Applied { .. } | DamageOutcome::Defeated(_) => {
                            report.damage_dealt += scenario.player.hit_damage;
                        }
                        DamageOutcome::Discarded => report.hits_discarded += 1,
                        DamageOutcome::Ignored => {}
                    }
                }
            }
            if stagger_interval > 0 && tick % stagger_interval == 0 {
                if let Some(boss) = session.primary() {
                    if session.stagger(boss.id, &mut hooks) {
                        report.staggers_landed += 1;
                    }
                }
            }

            pilot.strafe_to(session.elapsed());
            let events = session.tick(dt, &pilot.snapshot(), &mut hooks);

            for spec in hooks.drain_projectiles() {
                report.projectiles_fired += 1;
                if spec.team == Team::Enemy {
                    projectiles.push(Projectile::launch(&spec));
                }
            }
            step_projectiles(&mut projectiles, &pilot, dt, &mut hooks, &mut report);

            pilot.hp = Fixed::saturating_from_num(scenario.player.hp) - hooks.damage_taken();
            report.record(&events);

            if self.options.record_hashes {
                report.hash_trace.push(session.state_hash());
            }
            let primary_fell = events
                .defeated
                .iter()
                .any(|defeat| defeat.role == Role::Primary);
            if !events.is_empty() {
                emit(&Frame::Events { tick, events });
            }
            if self.options.state_interval > 0 && tick % self.options.state_interval == 0 {
                emit(&Frame::State {
                    tick,
                    elapsed: session.elapsed().to_num(),
                    player: pilot.state(),
                    combatants: session.views(),
                    hash: session.state_hash(),
                });
            }

            if pilot.hp <= Fixed::ZERO {
                outcome = Some(DuelOutcome::PlayerDefeated);
                break;
            }
            match waves.as_mut() {
                None if primary_fell => {
                    outcome = Some(DuelOutcome::BossDefeated);
                    break;
                }
                None => {}
                Some(progression) => {
                    for _ in 0..advances.replace(0) {
                        if progression.advance() == WaveOutcome::Victory
                            || !start_next_boss(progression, &mut session, tick, emit)?
                        {
                            outcome = Some(DuelOutcome::Victory);
                            break;
                        }
                    }
                    if outcome.is_some() {
                        break;
                    }
                }
            }
        }
        session.end();

        report.outcome = outcome.unwrap_or(DuelOutcome::Timeout);
        report.ticks = tick;
        report.elapsed_seconds = session.elapsed().to_num();
        report.player_hp_left = pilot.hp.max(Fixed::ZERO).to_num();
        report.damage_taken = hooks.damage_taken().to_num();
        report.statuses_applied = hooks.statuses;
        report.knockbacks = hooks.knockbacks;
        report.rewards = hooks.rewards.to_num();
        report.pickups = hooks.pickups;
        if let Some(progression) = &waves {
            report.boss_encounters = progression.boss_encounters();
            report.final_wave = progression.wave();
        }
        report.final_hash = session.state_hash();

        info!(
            scenario = %scenario.name,
            seed,
            outcome = ?report.outcome,
            ticks = report.ticks,
            "duel finished"
        );
        emit(&Frame::Finished {
            report: report.clone(),
        });
        Ok(report)
    }
}

/// Skip regular waves until a boss wave, then spawn its boss.
///
/// Returns `false` when the run was won before another boss appeared.
fn start_next_boss(
    progression: &mut WaveProgression,
    session: &mut EncounterSession,
    tick: u64,
    emit: &mut dyn FnMut(&Frame),
) -> Result<bool, ScenarioError> {
    loop {
        if progression.is_finished() {
            return Ok(false);
        }
        if let Some(plan) = progression.plan_boss() {
            debug!(wave = plan.wave, encounter = plan.encounter, "boss wave");
            session.spawn(plan.spawn_spec())?;
            emit(&Frame::BossPlanned { tick, plan });
            return Ok(true);
        }
        let wave = progression.wave();
        emit(&Frame::WaveCleared { tick, wave });
        if progression.advance() == WaveOutcome::Victory {
            return Ok(false);
        }
    }
}

/// Who the scripted player swings at.
fn pick_target(session: &EncounterSession, focus_auxiliaries: bool) -> Option<CombatantId> {
    let primary = session.primary().map(|view| view.id);
    if !focus_auxiliaries {
        return primary;
    }
    session
        .views()
        .into_iter()
        .find(|view| {
            view.role == Role::Auxiliary
                && session.combatant(view.id).is_some_and(|c| c.is_active())
        })
        .map(|view| view.id)
        .or(primary)
}

fn step_projectiles(
    projectiles: &mut Vec<Projectile>,
    pilot: &Pilot,
    dt: Fixed,
    hooks: &mut DuelHooks,
    report: &mut DuelReport,
) {
    let lifetime = Fixed::from_num(PROJECTILE_LIFETIME);
    let reach = pilot.radius + Fixed::from_num(PROJECTILE_RADIUS);
    projectiles.retain_mut(|projectile| {
        projectile.step(pilot.position, dt);
        if projectile.position.within(pilot.position, reach) {
            hooks.damage_player(projectile.damage);
            if let Some(status) = projectile.status {
                hooks.apply_player_status(status);
            }
            report.projectiles_hit += 1;
            return false;
        }
        projectile.age < lifetime
    });
}
