//! Recording collaborators.
//!
//! [`RecordingHooks`] implements every [`EncounterHooks`] method and keeps
//! what it was asked to do, so tests can count rewards, projectiles and
//! pickups without a renderer.

use arena_core::prelude::*;

/// Hooks that remember every request.
#[derive(Debug, Clone, Default)]
pub struct RecordingHooks {
    /// Projectiles requested, in order.
    pub projectiles: Vec<ProjectileSpec>,
    /// Particle bursts requested.
    pub particle_bursts: u32,
    /// Floating texts requested, in order.
    pub texts: Vec<String>,
    /// Screen shakes requested.
    pub shakes: u32,
    /// Audio cues requested, in order.
    pub audio: Vec<AudioCue>,
    /// Total direct damage dealt to the player.
    pub player_damage: Fixed,
    /// Knock-back impulses, in order.
    pub knockbacks: Vec<Vec2Fixed>,
    /// Statuses applied to the player, in order.
    pub statuses: Vec<PlayerStatus>,
    /// Rewards granted, in order.
    pub rewards: Vec<Fixed>,
    /// Pickups dropped, in order.
    pub pickups: Vec<Vec2Fixed>,
}

impl RecordingHooks {
    /// Empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of reward dispatches.
    #[must_use]
    pub fn reward_count(&self) -> usize {
        self.rewards.len()
    }

    /// Sum of all rewards.
    #[must_use]
    pub fn total_reward(&self) -> Fixed {
        self.rewards.iter().copied().fold(Fixed::ZERO, |acc, r| acc + r)
    }

    /// How many times `text` was shown.
    #[must_use]
    pub fn text_count(&self, text: &str) -> usize {
        self.texts.iter().filter(|t| t.as_str() == text).count()
    }

    /// Forget everything recorded so far.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

impl EncounterHooks for RecordingHooks {
    fn spawn_projectile(&mut self, spec: ProjectileSpec) {
        self.projectiles.push(spec);
    }

    fn spawn_particles(&mut self, _at: Vec2Fixed, _count: u32, _color: &'static str) {
        self.particle_bursts += 1;
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

    fn add_screen_shake(&mut self, _magnitude: Fixed) {
        self.shakes += 1;
    }

    fn play_audio_cue(&mut self, cue: AudioCue) {
        self.audio.push(cue);
    }

    fn damage_player(&mut self, amount: Fixed) {
        self.player_damage += amount;
    }

    fn knock_back_player(&mut self, impulse: Vec2Fixed) {
        self.knockbacks.push(impulse);
    }

    fn apply_player_status(&mut self, status: PlayerStatus) {
        self.statuses.push(status);
    }

    fn grant_reward(&mut self, amount: Fixed) {
        self.rewards.push(amount);
    }

    fn drop_pickup(&mut self, at: Vec2Fixed) {
        self.pickups.push(at);
    }
}
