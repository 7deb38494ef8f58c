//! The encounter session.
//!
//! An [`EncounterSession`] owns every active combatant of one boss fight and
//! is the only way to drive them: [`tick`](EncounterSession::tick) once per
//! frame, [`take_damage`](EncounterSession::take_damage) whenever the player
//! lands a hit, and [`stagger`](EncounterSession::stagger) for the
//! counter-mechanic.
//!
//! # Determinism
//!
//! The session draws every random number from its own seeded generator and
//! iterates combatants in ascending id order, so two sessions built from the
//! same config and seed and fed the same inputs end in the same state (see
//! [`EncounterSession::state_hash`]).
//!
//! # Example
//!
//! ```
//! use arena_core::prelude::*;
//!
//! let mut session = EncounterSession::new(EncounterConfig::default(), 7);
//! let boss = session.spawn(SpawnSpec::primary(ArchetypeKind::KruManop)).unwrap();
//! let player = PlayerSnapshot::at(Vec2Fixed::from_ints(0, 300));
//!
//! session.tick(Fixed::from_num(0.05), &player, &mut NullHooks);
//! let outcome = session.take_damage(boss, 500.0, &mut NullHooks);
//! assert!(outcome.landed());
//! ```

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::archetypes::{ArchetypeKind, Role};
use crate::combatant::{Combatant, CombatantId, CombatantView};
use crate::config::EncounterConfig;
use crate::context::{self, EncounterContext, EncounterHooks, PlayerSnapshot, SpawnRequest};
use crate::death::{sanitize_damage, DamageOutcome, DefeatReport};
use crate::error::{EncounterError, Result};
use crate::math::{Fixed, Vec2Fixed};
use crate::phase::PhaseFlags;
use crate::scheduler::{DeferredAction, TaskHandle, TaskQueue};
use crate::skills::SkillId;

/// A combatant entered a new phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseChange {
    /// Who.
    pub id: CombatantId,
    /// Phase entered.
    pub phase: u8,
}

/// A combatant picked a skill from its bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillUse {
    /// Who.
    pub id: CombatantId,
    /// Which skill.
    pub skill: SkillId,
}

/// Everything that happened since the previous tick.
///
/// Events raised by [`EncounterSession::take_damage`] and
/// [`EncounterSession::stagger`] between frames are buffered and returned by
/// the next [`EncounterSession::tick`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterEvents {
    /// Phase transitions, in the order they happened.
    pub phase_changes: Vec<PhaseChange>,
    /// Defeats, one per combatant.
    pub defeated: Vec<DefeatReport>,
    /// Combatants inserted into the session.
    pub spawned: Vec<CombatantId>,
    /// Kamikazes that exploded.
    pub self_destructed: Vec<CombatantId>,
    /// Auxiliaries removed because their summoner fell.
    pub dismissed: Vec<CombatantId>,
    /// Skill selections.
    pub skills_used: Vec<SkillUse>,
    /// Deferred wave advances that fired.
    pub waves_advanced: u32,
    /// Deferred pickups that dropped.
    pub pickups_dropped: u32,
}

impl EncounterEvents {
    /// Whether nothing happened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Request to put a combatant into a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnSpec {
    /// Archetype.
    pub kind: ArchetypeKind,
    /// Primary or auxiliary.
    pub role: Role,
    /// Summoner; required for auxiliaries.
    pub owner: Option<CombatantId>,
    /// Spawn point. Defaults to the configured primary spawn, or next to the owner.
    pub position: Option<Vec2Fixed>,
    /// HP and reward scalar. Must be positive.
    pub difficulty: Fixed,
    /// Kru Manop rides the dog.
    pub rider: bool,
    /// Phase enablement. Defaults to the balance table's gate flags.
    pub phase_flags: Option<PhaseFlags>,
}

impl SpawnSpec {
    /// A primary of `kind` at difficulty 1.
    #[must_use]
    pub fn primary(kind: ArchetypeKind) -> Self {
        Self {
            kind,
            role: Role::Primary,
            owner: None,
            position: None,
            difficulty: Fixed::ONE,
            rider: false,
            phase_flags: None,
        }
    }

    /// An auxiliary of `kind` owned by `owner`.
    #[must_use]
    pub fn auxiliary(kind: ArchetypeKind, owner: CombatantId) -> Self {
        Self {
            role: Role::Auxiliary,
            owner: Some(owner),
            ..Self::primary(kind)
        }
    }

    /// Set the difficulty scalar.
    #[must_use]
    pub fn with_difficulty(mut self, difficulty: Fixed) -> Self {
        self.difficulty = difficulty;
        self
    }

    /// Set the rider flag.
    #[must_use]
    pub fn with_rider(mut self, rider: bool) -> Self {
        self.rider = rider;
        self
    }

    /// Set the spawn point.
    #[must_use]
    pub fn at(mut self, position: Vec2Fixed) -> Self {
        self.position = Some(position);
        self
    }

    /// Override phase enablement.
    #[must_use]
    pub fn with_phase_flags(mut self, flags: PhaseFlags) -> Self {
        self.phase_flags = Some(flags);
        self
    }
}

/// Storage for the session's combatants.
///
/// Uses a `HashMap` for O(1) lookup by id, with deterministic iteration via
/// sorted keys.
#[derive(Debug, Clone)]
pub struct CombatantRegistry {
    combatants: HashMap<CombatantId, Combatant>,
    next_id: CombatantId,
}

impl Default for CombatantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CombatantRegistry {
    /// Empty registry. Ids start at 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            combatants: HashMap::new(),
            next_id: 1,
        }
    }

    /// Build a combatant with the next free id and store it.
    pub fn insert_with(&mut self, build: impl FnOnce(CombatantId) -> Combatant) -> CombatantId {
        let id = self.next_id;
        self.next_id += 1;
        self.combatants.insert(id, build(id));
        id
    }

    /// Remove a combatant by id.
    pub fn remove(&mut self, id: CombatantId) -> Option<Combatant> {
        self.combatants.remove(&id)
    }

    /// Get a combatant by id.
    #[must_use]
    pub fn get(&self, id: CombatantId) -> Option<&Combatant> {
        self.combatants.get(&id)
    }

    /// Get a mutable reference to a combatant by id.
    pub fn get_mut(&mut self, id: CombatantId) -> Option<&mut Combatant> {
        self.combatants.get_mut(&id)
    }

    /// Check if a combatant exists.
    #[must_use]
    pub fn contains(&self, id: CombatantId) -> bool {
        self.combatants.contains_key(&id)
    }

    /// Number of stored combatants, including ones awaiting the sweep.
    #[must_use]
    pub fn len(&self) -> usize {
        self.combatants.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.combatants.is_empty()
    }

    /// Sorted ids for deterministic iteration.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<CombatantId> {
        let mut ids: Vec<_> = self.combatants.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Iterate over all combatants (not in deterministic order).
    pub fn iter(&self) -> impl Iterator<Item = (&CombatantId, &Combatant)> {
        self.combatants.iter()
    }
}

type DefeatCallback = Box<dyn FnMut(&DefeatReport)>;
type WaveCallback = Box<dyn FnMut()>;

/// One boss fight.
pub struct EncounterSession {
    config: EncounterConfig,
    combatants: CombatantRegistry,
    tasks: TaskQueue,
    rng: ChaCha8Rng,
    elapsed: Fixed,
    tick_count: u64,
    player: PlayerSnapshot,
    /// Events raised between ticks.
    pending: EncounterEvents,
    wave_task: Option<TaskHandle>,
    on_defeated: Option<DefeatCallback>,
    on_wave_advance: Option<WaveCallback>,
    ended: bool,
}

impl fmt::Debug for EncounterSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncounterSession")
            .field("combatants", &self.combatants.len())
            .field("tasks", &self.tasks.len())
            .field("elapsed", &self.elapsed)
            .field("tick_count", &self.tick_count)
            .field("ended", &self.ended)
            .finish_non_exhaustive()
    }
}

impl EncounterSession {
    /// Empty session with a seeded generator.
    #[must_use]
    pub fn new(config: EncounterConfig, seed: u64) -> Self {
        Self {
            config,
            combatants: CombatantRegistry::new(),
            tasks: TaskQueue::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            elapsed: Fixed::ZERO,
            tick_count: 0,
            player: PlayerSnapshot::default(),
            pending: EncounterEvents::default(),
            wave_task: None,
            on_defeated: None,
            on_wave_advance: None,
            ended: false,
        }
    }

    /// Balance table in use.
    #[must_use]
    pub fn config(&self) -> &EncounterConfig {
        &self.config
    }

    /// Seconds simulated so far.
    #[must_use]
    pub fn elapsed(&self) -> Fixed {
        self.elapsed
    }

    /// Ticks run so far.
    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Register the callback invoked once per defeated combatant.
    pub fn on_combatant_defeated(&mut self, callback: impl FnMut(&DefeatReport) + 'static) {
        self.on_defeated = Some(Box::new(callback));
    }

    /// Register the callback invoked when a deferred wave advance fires.
    pub fn on_wave_advance(&mut self, callback: impl FnMut() + 'static) {
        self.on_wave_advance = Some(Box::new(callback));
    }

    /// Put a combatant into the fight.
    ///
    /// # Errors
    ///
    /// Returns [`EncounterError::InvalidSpawn`] if the difficulty is not
    /// positive or the session has ended, and
    /// [`EncounterError::CombatantNotFound`] if an auxiliary's owner is unknown.
    pub fn spawn(&mut self, spec: SpawnSpec) -> Result<CombatantId> {
        if self.ended {
            return Err(EncounterError::InvalidSpawn("session has ended".to_string()));
        }
        if spec.difficulty <= Fixed::ZERO {
            return Err(EncounterError::InvalidSpawn(format!(
                "difficulty must be positive, got {}",
                spec.difficulty
            )));
        }

        let owner_position = match (spec.role, spec.owner) {
            (Role::Auxiliary, None) => {
                return Err(EncounterError::InvalidSpawn(
                    "auxiliary spawn needs an owner".to_string(),
                ));
            }
            (_, Some(owner)) => Some(
                self.combatants
                    .get(owner)
                    .ok_or(EncounterError::CombatantNotFound(owner))?
                    .body()
                    .position,
            ),
            (Role::Primary, None) => None,
        };
        let position = spec.position.unwrap_or_else(|| match owner_position {
            Some(at) => {
                at + Vec2Fixed::new(self.config.session.auxiliary_spawn_offset, Fixed::ZERO)
            }
            None => self.config.session.primary_spawn,
        });

        let config = &self.config;
        let id = self.combatants.insert_with(|id| {
            Combatant::new(
                id,
                spec.kind,
                spec.role,
                spec.owner,
                position,
                spec.difficulty,
                spec.rider,
                spec.phase_flags,
                config,
            )
        });
        debug!(
            id,
            kind = ?spec.kind,
            role = ?spec.role,
            difficulty = %spec.difficulty,
            "combatant spawned"
        );
        self.pending.spawned.push(id);
        Ok(id)
    }

    /// Advance every combatant by `dt` seconds.
    ///
    /// Order: sweep combatants that left the fight last frame, fire due
    /// deferred tasks, tick combatants in ascending id order, then insert
    /// auxiliaries they summoned.
    pub fn tick(
        &mut self,
        dt: Fixed,
        player: &PlayerSnapshot,
        hooks: &mut dyn EncounterHooks,
    ) -> EncounterEvents {
        let mut events = std::mem::take(&mut self.pending);
        if self.ended {
            return events;
        }
        let dt = dt.max(Fixed::ZERO);
        self.player = *player;

        self.sweep();

        for action in self.tasks.tick(dt) {
            self.run_task(action, hooks, &mut events);
        }

        let mut spawns = Vec::new();
        for id in self.combatants.sorted_ids() {
            let Some(combatant) = self.combatants.get_mut(id) else {
                continue;
            };
            let mut ctx = EncounterContext {
                dt,
                player: &self.player,
                hooks: &mut *hooks,
                rng: &mut self.rng,
                config: &self.config,
                spawns: &mut spawns,
                events: &mut events,
            };
            combatant.tick(&mut ctx);
        }
        self.insert_spawns(spawns, &mut events);

        self.elapsed += dt;
        self.tick_count += 1;

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            trace!(tick = self.tick_count, state_hash = hash, "encounter state hash");
        }

        events
    }

    /// Apply player damage to one combatant.
    ///
    /// Raw amounts are sanitized first: negative, NaN and infinite values are
    /// ignored. Unknown ids are ignored. A defeat notifies
    /// [`on_combatant_defeated`](Self::on_combatant_defeated) and, for
    /// primaries, dismisses their auxiliaries and schedules the pickups and the
    /// deferred wave advance.
    pub fn take_damage(
        &mut self,
        id: CombatantId,
        amount: f64,
        hooks: &mut dyn EncounterHooks,
    ) -> DamageOutcome {
        let amount = sanitize_damage(amount);
        if self.ended || amount <= Fixed::ZERO {
            return DamageOutcome::Ignored;
        }
        let Some(combatant) = self.combatants.get_mut(id) else {
            trace!(id, "damage for unknown combatant ignored");
            return DamageOutcome::Ignored;
        };

        let mut events = std::mem::take(&mut self.pending);
        let mut spawns = Vec::new();
        let outcome = {
            let mut ctx = EncounterContext {
                dt: Fixed::ZERO,
                player: &self.player,
                hooks: &mut *hooks,
                rng: &mut self.rng,
                config: &self.config,
                spawns: &mut spawns,
                events: &mut events,
            };
            combatant.take_damage(amount, &mut ctx)
        };
        self.insert_spawns(spawns, &mut events);

        if let DamageOutcome::Defeated(report) = &outcome {
            self.handle_defeat(report, &mut events);
        }
        self.pending = events;
        outcome
    }

    /// Force a combatant into its disabled state. Returns `false` if it
    /// resisted, is gone, or is unknown.
    pub fn stagger(&mut self, id: CombatantId, hooks: &mut dyn EncounterHooks) -> bool {
        if self.ended {
            return false;
        }
        let Some(combatant) = self.combatants.get_mut(id) else {
            return false;
        };
        let mut spawns = Vec::new();
        let mut ctx = EncounterContext {
            dt: Fixed::ZERO,
            player: &self.player,
            hooks,
            rng: &mut self.rng,
            config: &self.config,
            spawns: &mut spawns,
            events: &mut self.pending,
        };
        let staggered = combatant.stagger(&mut ctx);
        debug!(id, staggered, "stagger");
        staggered
    }

    /// Stop the encounter: cancel every deferred task and ignore further input.
    pub fn end(&mut self) {
        if self.ended {
            return;
        }
        let dropped = self.tasks.cancel_all();
        self.wave_task = None;
        self.ended = true;
        debug!(dropped, "encounter ended");
    }

    /// Whether [`end`](Self::end) was called.
    #[must_use]
    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Cancel one deferred task. Returns `false` if it already fired.
    pub fn cancel_task(&mut self, handle: TaskHandle) -> bool {
        if self.wave_task == Some(handle) {
            self.wave_task = None;
        }
        self.tasks.cancel(handle)
    }

    /// Handle of the pending wave advance, if one is scheduled.
    #[must_use]
    pub fn wave_advance_task(&self) -> Option<TaskHandle> {
        self.wave_task
    }

    /// Number of deferred tasks still queued.
    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }

    /// Read-only view of one combatant, including ones awaiting the sweep.
    #[must_use]
    pub fn view(&self, id: CombatantId) -> Option<CombatantView> {
        self.combatants.get(id).map(Combatant::view)
    }

    /// Views of every stored combatant in ascending id order.
    #[must_use]
    pub fn views(&self) -> Vec<CombatantView> {
        self.combatants
            .sorted_ids()
            .into_iter()
            .filter_map(|id| self.view(id))
            .collect()
    }

    /// The active primary with the lowest id.
    #[must_use]
    pub fn primary(&self) -> Option<CombatantView> {
        self.combatants
            .sorted_ids()
            .into_iter()
            .filter_map(|id| self.combatants.get(id))
            .find(|c| c.is_active() && c.body().role == Role::Primary)
            .map(Combatant::view)
    }

    /// Direct access to a combatant.
    #[must_use]
    pub fn combatant(&self, id: CombatantId) -> Option<&Combatant> {
        self.combatants.get(id)
    }

    /// Number of combatants still fighting.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.combatants.iter().filter(|(_, c)| c.is_active()).count()
    }

    /// Whether nobody is left fighting.
    #[must_use]
    pub fn is_cleared(&self) -> bool {
        self.active_count() == 0
    }

    /// Hash of everything that drives future behaviour.
    ///
    /// Two sessions with identical state produce identical hashes.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.tick_count.hash(&mut hasher);
        self.elapsed.to_bits().hash(&mut hasher);
        self.ended.hash(&mut hasher);

        let ids = self.combatants.sorted_ids();
        ids.len().hash(&mut hasher);
        for id in ids {
            if let Some(combatant) = self.combatants.get(id) {
                combatant.hash_state(&mut hasher);
            }
        }

        for task in self.tasks.iter() {
            task.handle.hash(&mut hasher);
            task.remaining.to_bits().hash(&mut hasher);
        }
        hasher.finish()
    }

    fn sweep(&mut self) {
        let gone: Vec<_> = self
            .combatants
            .sorted_ids()
            .into_iter()
            .filter(|&id| self.combatants.get(id).is_some_and(|c| !c.is_active()))
            .collect();
        for id in gone {
            self.combatants.remove(id);
            trace!(id, "combatant swept");
        }
    }

    fn run_task(
        &mut self,
        action: DeferredAction,
        hooks: &mut dyn EncounterHooks,
        events: &mut EncounterEvents,
    ) {
        match action {
            DeferredAction::AdvanceWave => {
                self.wave_task = None;
                events.waves_advanced += 1;
                debug!(elapsed = %self.elapsed, "wave advance fired");
                if let Some(callback) = self.on_wave_advance.as_mut() {
                    callback();
                }
            }
            DeferredAction::DropPickup { at } => {
                hooks.drop_pickup(at);
                events.pickups_dropped += 1;
            }
        }
    }

    fn insert_spawns(&mut self, spawns: Vec<SpawnRequest>, events: &mut EncounterEvents) {
        for request in spawns {
            let config = &self.config;
            let id = self.combatants.insert_with(|id| {
                Combatant::new(
                    id,
                    request.kind,
                    Role::Auxiliary,
                    Some(request.owner),
                    request.position,
                    request.difficulty,
                    false,
                    None,
                    config,
                )
            });
            debug!(id, kind = ?request.kind, owner = request.owner, "auxiliary summoned");
            events.spawned.push(id);
        }
    }

    fn handle_defeat(&mut self, report: &DefeatReport, events: &mut EncounterEvents) {
        events.defeated.push(report.clone());
        if let Some(callback) = self.on_defeated.as_mut() {
            callback(report);
        }
        if !report.advances_wave {
            return;
        }

        for id in self.combatants.sorted_ids() {
            let Some(combatant) = self.combatants.get_mut(id) else {
                continue;
            };
            if combatant.body().owner == Some(report.id) && combatant.dismiss() {
                events.dismissed.push(id);
            }
        }

        let session = &self.config.session;
        for i in 0..session.pickup_count {
            let at = report.position + context::scatter(&mut self.rng, session.pickup_scatter);
            self.tasks.schedule(
                session.pickup_stagger.saturating_mul(Fixed::from_num(i)),
                DeferredAction::DropPickup { at },
            );
        }
        let handle = self
            .tasks
            .schedule(session.next_wave_delay, DeferredAction::AdvanceWave);
        self.wave_task = Some(handle);
        debug!(id = report.id, delay = %session.next_wave_delay, "wave advance scheduled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::NullHooks;
    use crate::math::ratio;
    use std::cell::Cell;
    use std::rc::Rc;

    fn player() -> PlayerSnapshot {
        PlayerSnapshot::at(Vec2Fixed::from_ints(0, 300))
    }

    #[test]
    fn test_registry_ids_start_at_one_and_sort() {
        let config = EncounterConfig::default();
        let mut registry = CombatantRegistry::new();
        for _ in 0..3 {
            registry.insert_with(|id| {
                Combatant::new(
                    id,
                    ArchetypeKind::Goldfish,
                    Role::Primary,
                    None,
                    Vec2Fixed::ZERO,
                    Fixed::ONE,
                    false,
                    None,
                    &config,
                )
            });
        }
        registry.remove(2);
        assert_eq!(registry.sorted_ids(), vec![1, 3]);
        assert!(!registry.contains(2));
        assert_eq!(registry.get(3).map(Combatant::id), Some(3));
    }

    #[test]
    fn test_spawn_rejects_bad_requests() {
        let mut session = EncounterSession::new(EncounterConfig::default(), 1);
        let zero = SpawnSpec::primary(ArchetypeKind::KruManop).with_difficulty(Fixed::ZERO);
        assert!(matches!(session.spawn(zero), Err(EncounterError::InvalidSpawn(_))));

        let orphan = SpawnSpec::auxiliary(ArchetypeKind::BossDog, 42);
        assert!(matches!(session.spawn(orphan), Err(EncounterError::CombatantNotFound(42))));
    }

    #[test]
    fn test_spawn_uses_configured_positions() {
        let mut session = EncounterSession::new(EncounterConfig::default(), 1);
        let boss = session.spawn(SpawnSpec::primary(ArchetypeKind::KruManop)).unwrap();
        let dog = session
            .spawn(SpawnSpec::auxiliary(ArchetypeKind::BossDog, boss))
            .unwrap();
        assert_eq!(session.view(boss).unwrap().position, Vec2Fixed::from_ints(0, -600));
        assert_eq!(session.view(dog).unwrap().position, Vec2Fixed::from_ints(80, -600));
    }

    #[test]
    fn test_unknown_and_garbage_damage_ignored() {
        let mut session = EncounterSession::new(EncounterConfig::default(), 1);
        let boss = session.spawn(SpawnSpec::primary(ArchetypeKind::KruManop)).unwrap();
        assert_eq!(session.take_damage(99, 10.0, &mut NullHooks), DamageOutcome::Ignored);
        assert_eq!(session.take_damage(boss, f64::NAN, &mut NullHooks), DamageOutcome::Ignored);
        assert_eq!(session.take_damage(boss, -3.0, &mut NullHooks), DamageOutcome::Ignored);
        assert_eq!(session.view(boss).unwrap().hp, Fixed::from_num(2350));
    }

    #[test]
    fn test_defeat_schedules_pickups_and_wave_advance() {
        let mut session = EncounterSession::new(EncounterConfig::default(), 5);
        let advances = Rc::new(Cell::new(0));
        let seen = Rc::clone(&advances);
        session.on_wave_advance(move || seen.set(seen.get() + 1));

        let boss = session.spawn(SpawnSpec::primary(ArchetypeKind::KruManop)).unwrap();
        let outcome = session.take_damage(boss, 10_000.0, &mut NullHooks);
        assert!(matches!(outcome, DamageOutcome::Defeated(_)));
        assert_eq!(session.pending_tasks(), 4);
        assert!(session.wave_advance_task().is_some());

        let dt = ratio(1, 10);
        let mut pickups = 0;
        let mut waves = 0;
        for _ in 0..30 {
            let events = session.tick(dt, &player(), &mut NullHooks);
            pickups += events.pickups_dropped;
            waves += events.waves_advanced;
        }
        assert_eq!(pickups, 3);
        assert_eq!(waves, 1);
        assert_eq!(advances.get(), 1);
        assert!(session.view(boss).is_none());
    }

    #[test]
    fn test_end_cancels_wave_advance() {
        let mut session = EncounterSession::new(EncounterConfig::default(), 5);
        let advances = Rc::new(Cell::new(0));
        let seen = Rc::clone(&advances);
        session.on_wave_advance(move || seen.set(seen.get() + 1));

        let boss = session.spawn(SpawnSpec::primary(ArchetypeKind::KruManop)).unwrap();
        session.take_damage(boss, 10_000.0, &mut NullHooks);
        session.end();
        assert_eq!(session.pending_tasks(), 0);
        for _ in 0..50 {
            session.tick(ratio(1, 10), &player(), &mut NullHooks);
        }
        assert_eq!(advances.get(), 0);
    }

    #[test]
    fn test_cancel_task_prevents_advance() {
        let mut session = EncounterSession::new(EncounterConfig::default(), 5);
        let boss = session.spawn(SpawnSpec::primary(ArchetypeKind::KruManop)).unwrap();
        session.take_damage(boss, 10_000.0, &mut NullHooks);
        let handle = session.wave_advance_task().unwrap();
        assert!(session.cancel_task(handle));
        assert!(!session.cancel_task(handle));

        let mut waves = 0;
        for _ in 0..40 {
            waves += session.tick(ratio(1, 10), &player(), &mut NullHooks).waves_advanced;
        }
        assert_eq!(waves, 0);
    }

    #[test]
    fn test_primary_defeat_dismisses_its_auxiliaries() {
        let mut session = EncounterSession::new(EncounterConfig::default(), 5);
        let boss = session.spawn(SpawnSpec::primary(ArchetypeKind::KruManop)).unwrap();
        let dog = session
            .spawn(SpawnSpec::auxiliary(ArchetypeKind::BossDog, boss))
            .unwrap();
        session.take_damage(boss, 10_000.0, &mut NullHooks);

        let events = session.tick(ratio(1, 20), &player(), &mut NullHooks);
        assert_eq!(events.dismissed, vec![dog]);
        assert_eq!(events.defeated.len(), 1);
        assert!(session.is_cleared());
        // Dismissal is not a defeat; a late hit does nothing.
        assert_eq!(session.take_damage(dog, 50.0, &mut NullHooks), DamageOutcome::Ignored);
    }

    #[test]
    fn test_events_between_ticks_are_buffered() {
        let mut session = EncounterSession::new(EncounterConfig::default(), 5);
        let boss = session.spawn(SpawnSpec::primary(ArchetypeKind::KruManop)).unwrap();
        session.take_damage(boss, 1300.0, &mut NullHooks);

        let events = session.tick(ratio(1, 20), &player(), &mut NullHooks);
        assert_eq!(events.spawned, vec![boss]);
        assert_eq!(events.phase_changes, vec![PhaseChange { id: boss, phase: 2 }]);

        let events = session.tick(ratio(1, 20), &player(), &mut NullHooks);
        assert!(events.spawned.is_empty());
        assert!(events.phase_changes.is_empty());
    }

    #[test]
    fn test_same_seed_same_hash() {
        let run = |seed| {
            let mut session = EncounterSession::new(EncounterConfig::default(), seed);
            let boss = session
                .spawn(SpawnSpec::primary(ArchetypeKind::KruManop).with_rider(true))
                .unwrap();
            for frame in 0..400 {
                session.tick(ratio(1, 20), &player(), &mut NullHooks);
                if frame % 40 == 0 {
                    session.take_damage(boss, 150.0, &mut NullHooks);
                }
            }
            session.state_hash()
        };
        assert_eq!(run(9), run(9));
    }
}
