//! Test fixtures and helpers.
//!
//! Pre-built sessions and player snapshots for consistent testing.

use arena_core::prelude::*;
use fixed::types::I32F32;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real encounter code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// One frame at 20 frames per second.
#[must_use]
pub fn frame_dt() -> Fixed {
    fixed(1) / fixed(20)
}

/// A visible player at `(x, y)` with default stats.
#[must_use]
pub fn player_at(x: i32, y: i32) -> PlayerSnapshot {
    PlayerSnapshot::at(Vec2Fixed::from_ints(x, y))
}

/// A player the bosses cannot see.
#[must_use]
pub fn hidden_player_at(x: i32, y: i32) -> PlayerSnapshot {
    PlayerSnapshot {
        hidden: true,
        ..player_at(x, y)
    }
}

/// Session with a single primary spawned from `spec`.
///
/// # Panics
///
/// Panics if the spawn request is rejected.
#[must_use]
pub fn session_with(
    seed: u64,
    config: EncounterConfig,
    spec: SpawnSpec,
) -> (EncounterSession, CombatantId) {
    let mut session = EncounterSession::new(config, seed);
    let id = session.spawn(spec).expect("fixture spawn should succeed");
    (session, id)
}

/// Session with a default Kru Manop at difficulty 1, phase 2 enabled.
#[must_use]
pub fn manop_session(seed: u64) -> (EncounterSession, CombatantId) {
    session_with(
        seed,
        EncounterConfig::default(),
        SpawnSpec::primary(ArchetypeKind::KruManop),
    )
}

/// Session with a default Kru First at difficulty 1.
#[must_use]
pub fn first_session(seed: u64) -> (EncounterSession, CombatantId) {
    session_with(
        seed,
        EncounterConfig::default(),
        SpawnSpec::primary(ArchetypeKind::KruFirst),
    )
}

/// Tick `session` for `frames` frames against a stationary player.
///
/// Returns every event raised along the way, concatenated.
pub fn run_frames(
    session: &mut EncounterSession,
    frames: u32,
    player: &PlayerSnapshot,
    hooks: &mut dyn EncounterHooks,
) -> EncounterEvents {
    let mut all = EncounterEvents::default();
    for _ in 0..frames {
        let events = session.tick(frame_dt(), player, hooks);
        all.phase_changes.extend(events.phase_changes);
        all.defeated.extend(events.defeated);
        all.spawned.extend(events.spawned);
        all.self_destructed.extend(events.self_destructed);
        all.dismissed.extend(events.dismissed);
        all.skills_used.extend(events.skills_used);
        all.waves_advanced += events.waves_advanced;
        all.pickups_dropped += events.pickups_dropped;
    }
    all
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_helpers() {
        assert_eq!(fixed(3), I32F32::from_num(3));
        assert_eq!(fixed_f(0.5) * fixed(2), fixed(1));
        assert!(frame_dt() > fixed_f(0.049) && frame_dt() < fixed_f(0.051));
    }

    #[test]
    fn test_manop_fixture_spawns_full_hp() {
        let (session, boss) = manop_session(1);
        let view = session.view(boss).unwrap();
        assert_eq!(view.hp, fixed(2350));
        assert_eq!(view.phase, 1);
    }
}
