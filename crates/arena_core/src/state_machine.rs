//! State timers and staged skill timelines.
//!
//! Each archetype keeps its own state enum; [`StateMachine`] only tracks which
//! state is current and how long it has been active. Skill states that pass
//! through wind-up, execute and recovery describe those stages with a
//! [`SkillTimeline`] and react when the state timer crosses a stage boundary.

use crate::math::Fixed;

/// Current state plus seconds spent in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateMachine<S> {
    state: S,
    timer: Fixed,
    previous: Fixed,
}

impl<S: Copy + PartialEq> StateMachine<S> {
    /// Start in `initial` with a zero timer.
    #[must_use]
    pub fn new(initial: S) -> Self {
        Self {
            state: initial,
            timer: Fixed::ZERO,
            previous: Fixed::ZERO,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> S {
        self.state
    }

    /// Seconds since the current state was entered (or last restarted).
    #[must_use]
    pub fn timer(&self) -> Fixed {
        self.timer
    }

    /// Whether the machine is in `state`.
    #[must_use]
    pub fn is(&self, state: S) -> bool {
        self.state == state
    }

    /// Enter `next`, resetting the timer even if `next` is the current state.
    pub fn transition(&mut self, next: S) {
        self.state = next;
        self.restart_timer();
    }

    /// Reset the timer without leaving the state.
    pub fn restart_timer(&mut self) {
        self.timer = Fixed::ZERO;
        self.previous = Fixed::ZERO;
    }

    /// Advance the timer by `dt`.
    pub fn advance(&mut self, dt: Fixed) {
        self.previous = self.timer;
        self.timer += dt;
    }

    /// Whether the last [`advance`](Self::advance) carried the timer past `mark`.
    ///
    /// A mark is crossed exactly once per visit to a state, including a mark
    /// of zero on the first advance.
    #[must_use]
    pub fn crossed(&self, mark: Fixed) -> bool {
        self.previous <= mark && self.timer > mark
    }
}

/// Stage of a timed skill state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Telegraph; nothing has happened yet.
    WindUp,
    /// The skill's effect window.
    Execute,
    /// Cool-off before returning to the default state.
    Recovery,
    /// Timeline finished.
    Done,
}

/// Ordered stage thresholds for a skill state.
///
/// # Example
///
/// ```
/// use arena_core::math::Fixed;
/// use arena_core::state_machine::{SkillTimeline, Stage};
///
/// let slam = SkillTimeline::new(Fixed::from_num(1), Fixed::ZERO, Fixed::from_num(1));
/// assert_eq!(slam.stage_at(Fixed::from_num(0.5)), Stage::WindUp);
/// assert_eq!(slam.stage_at(Fixed::from_num(1.5)), Stage::Recovery);
/// assert_eq!(slam.stage_at(Fixed::from_num(2)), Stage::Done);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkillTimeline {
    wind_up: Fixed,
    execute: Fixed,
    recovery: Fixed,
}

impl SkillTimeline {
    /// Build a timeline from stage lengths in seconds.
    #[must_use]
    pub fn new(wind_up: Fixed, execute: Fixed, recovery: Fixed) -> Self {
        Self {
            wind_up: wind_up.max(Fixed::ZERO),
            execute: execute.max(Fixed::ZERO),
            recovery: recovery.max(Fixed::ZERO),
        }
    }

    /// Timer value at which execution begins.
    #[must_use]
    pub fn execute_at(&self) -> Fixed {
        self.wind_up
    }

    /// Timer value at which recovery begins.
    #[must_use]
    pub fn recovery_at(&self) -> Fixed {
        self.wind_up + self.execute
    }

    /// Total length.
    #[must_use]
    pub fn total(&self) -> Fixed {
        self.wind_up + self.execute + self.recovery
    }

    /// Stage active at timer value `t`.
    #[must_use]
    pub fn stage_at(&self, t: Fixed) -> Stage {
        if t < self.execute_at() {
            Stage::WindUp
        } else if t < self.recovery_at() {
            Stage::Execute
        } else if t < self.total() {
            Stage::Recovery
        } else {
            Stage::Done
        }
    }

    /// Whether the machine's last advance began execution.
    #[must_use]
    pub fn began_execute<S: Copy + PartialEq>(&self, machine: &StateMachine<S>) -> bool {
        machine.crossed(self.execute_at())
    }

    /// Whether the machine's last advance began recovery.
    #[must_use]
    pub fn began_recovery<S: Copy + PartialEq>(&self, machine: &StateMachine<S>) -> bool {
        machine.crossed(self.recovery_at())
    }

    /// Whether the machine has run the full timeline.
    #[must_use]
    pub fn finished<S: Copy + PartialEq>(&self, machine: &StateMachine<S>) -> bool {
        machine.timer() >= self.total()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::ratio;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Probe {
        Idle,
        Busy,
    }

    #[test]
    fn test_transition_resets_timer() {
        let mut machine = StateMachine::new(Probe::Idle);
        machine.advance(Fixed::from_num(3));
        assert_eq!(machine.timer(), Fixed::from_num(3));

        machine.transition(Probe::Busy);
        assert!(machine.is(Probe::Busy));
        assert_eq!(machine.timer(), Fixed::ZERO);

        machine.advance(Fixed::ONE);
        machine.transition(Probe::Busy);
        assert_eq!(machine.timer(), Fixed::ZERO);
    }

    #[test]
    fn test_crossed_fires_once() {
        let mut machine = StateMachine::new(Probe::Busy);
        let mark = ratio(1, 2);
        let dt = ratio(1, 4);
        let mut hits = 0;
        for _ in 0..8 {
            machine.advance(dt);
            if machine.crossed(mark) {
                hits += 1;
            }
        }
        assert_eq!(hits, 1);
    }

    #[test]
    fn test_zero_mark_fires_on_first_advance() {
        let mut machine = StateMachine::new(Probe::Busy);
        machine.advance(ratio(1, 60));
        assert!(machine.crossed(Fixed::ZERO));
        machine.advance(ratio(1, 60));
        assert!(!machine.crossed(Fixed::ZERO));
    }

    #[test]
    fn test_timeline_stages_in_order() {
        let timeline = SkillTimeline::new(ratio(2, 5), ratio(6, 5), ratio(3, 5));
        let mut machine = StateMachine::new(Probe::Busy);
        let dt = ratio(1, 10);

        let mut executes = 0;
        let mut recoveries = 0;
        let mut steps = 0;
        while !timeline.finished(&machine) {
            machine.advance(dt);
            steps += 1;
            if timeline.began_execute(&machine) {
                executes += 1;
            }
            if timeline.began_recovery(&machine) {
                recoveries += 1;
            }
        }
        assert_eq!((executes, recoveries), (1, 1));
        assert!(steps >= 22);
        assert_eq!(timeline.stage_at(ratio(1, 2)), Stage::Execute);
    }
}
