//! Deferred task queue ticked by simulated time.

use serde::{Deserialize, Serialize};

use crate::math::{Fixed, Vec2Fixed};

/// Handle returned by [`TaskQueue::schedule`], used to cancel a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskHandle(u64);

/// Work that runs after a delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeferredAction {
    /// Hand control to wave progression.
    AdvanceWave,
    /// Drop a pickup at a position.
    DropPickup {
        /// Where the pickup lands.
        at: Vec2Fixed,
    },
}

/// A queued action with its countdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask {
    /// Cancellation handle.
    pub handle: TaskHandle,
    /// Seconds until the task fires.
    pub remaining: Fixed,
    /// What happens when it fires.
    pub action: DeferredAction,
}

/// Per-session list of deferred actions. Each task fires at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskQueue {
    tasks: Vec<ScheduledTask>,
    next_handle: u64,
}

impl TaskQueue {
    /// Empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `action` to fire once `delay` seconds have been ticked.
    ///
    /// A task fires on the first [`tick`](Self::tick) after which the summed
    /// `dt` reaches `delay`. Frame steps that are not exact binary fractions
    /// truncate, so the sum can fall short by a few ulps: a 2 s delay ticked
    /// at `1/20` fires on frame 41, not 40. Schedule against the frame count
    /// the host actually steps with when the exact frame matters.
    pub fn schedule(&mut self, delay: Fixed, action: DeferredAction) -> TaskHandle {
        let handle = TaskHandle(self.next_handle);
        self.next_handle += 1;
        self.tasks.push(ScheduledTask {
            handle,
            remaining: delay.max(Fixed::ZERO),
            action,
        });
        handle
    }

    /// Count every task down by `dt` and remove the ones that came due.
    ///
    /// Due actions are returned ordered by how far past due they are, then by
    /// scheduling order.
    pub fn tick(&mut self, dt: Fixed) -> Vec<DeferredAction> {
        let mut due = Vec::new();
        self.tasks.retain_mut(|task| {
            task.remaining -= dt;
            if task.remaining <= Fixed::ZERO {
                due.push((task.remaining, task.handle, task.action));
                false
            } else {
                true
            }
        });
        due.sort_by_key(|&(remaining, handle, _)| (remaining, handle));
        due.into_iter().map(|(_, _, action)| action).collect()
    }

    /// Cancel one task. Returns `false` if it already fired or was cancelled.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.handle != handle);
        self.tasks.len() != before
    }

    /// Cancel everything. Returns how many tasks were dropped.
    pub fn cancel_all(&mut self) -> usize {
        let dropped = self.tasks.len();
        self.tasks.clear();
        dropped
    }

    /// Seconds until a task fires.
    #[must_use]
    pub fn remaining(&self, handle: TaskHandle) -> Option<Fixed> {
        self.tasks
            .iter()
            .find(|task| task.handle == handle)
            .map(|task| task.remaining)
    }

    /// Number of queued tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Queued tasks in scheduling order.
    pub fn iter(&self) -> impl Iterator<Item = &ScheduledTask> {
        self.tasks.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::ratio;

    #[test]
    fn test_task_fires_once_after_delay() {
        let mut queue = TaskQueue::new();
        queue.schedule(Fixed::from_num(2), DeferredAction::AdvanceWave);

        let dt = ratio(1, 2);
        let mut fired = 0;
        for _ in 0..10 {
            fired += queue.tick(dt).len();
        }
        assert_eq!(fired, 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_zero_delay_fires_on_next_tick() {
        let mut queue = TaskQueue::new();
        queue.schedule(Fixed::ZERO, DeferredAction::AdvanceWave);
        assert_eq!(queue.tick(ratio(1, 60)), vec![DeferredAction::AdvanceWave]);
    }

    #[test]
    fn test_truncated_frame_step_fires_one_frame_late() {
        let mut queue = TaskQueue::new();
        queue.schedule(Fixed::from_num(2), DeferredAction::AdvanceWave);

        let dt = ratio(1, 20);
        let mut fired_on = None;
        for frame in 1..=60 {
            if !queue.tick(dt).is_empty() {
                fired_on = Some(frame);
                break;
            }
        }
        assert_eq!(fired_on, Some(41));
    }

    #[test]
    fn test_exact_frame_step_fires_on_deadline() {
        let mut queue = TaskQueue::new();
        queue.schedule(Fixed::from_num(2), DeferredAction::AdvanceWave);

        let dt = ratio(1, 4);
        for _ in 0..7 {
            assert!(queue.tick(dt).is_empty());
        }
        assert_eq!(queue.tick(dt), vec![DeferredAction::AdvanceWave]);
    }

    #[test]
    fn test_cancel_prevents_firing() {
        let mut queue = TaskQueue::new();
        let wave = queue.schedule(Fixed::ONE, DeferredAction::AdvanceWave);
        assert!(queue.cancel(wave));
        assert!(!queue.cancel(wave));
        assert!(queue.tick(Fixed::from_num(5)).is_empty());
    }

    #[test]
    fn test_due_tasks_fire_in_due_order() {
        let mut queue = TaskQueue::new();
        let late = DeferredAction::DropPickup {
            at: Vec2Fixed::from_ints(2, 0),
        };
        let early = DeferredAction::DropPickup {
            at: Vec2Fixed::from_ints(1, 0),
        };
        queue.schedule(Fixed::ONE, late);
        queue.schedule(ratio(1, 2), early);
        assert_eq!(queue.tick(Fixed::from_num(3)), vec![early, late]);
    }

    #[test]
    fn test_cancel_all_reports_count() {
        let mut queue = TaskQueue::new();
        queue.schedule(Fixed::ONE, DeferredAction::AdvanceWave);
        queue.schedule(Fixed::ONE, DeferredAction::AdvanceWave);
        assert_eq!(queue.cancel_all(), 2);
        assert_eq!(queue.len(), 0);
    }
}
