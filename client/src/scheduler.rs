//! Central bookkeeping for periodic refresh tasks.
//!
//! Every polling interval lives here instead of being scattered across call
//! sites; the driving loop asks what is due, runs it, and marks it ran.

use std::time::{Duration, Instant};

/// Poll list refresh cadence.
pub const POLLS_REFRESH: Duration = Duration::from_secs(12);
/// Dashboard aggregate refresh cadence.
pub const DASHBOARD_REFRESH: Duration = Duration::from_secs(15);

struct Task {
    name: &'static str,
    every: Duration,
    last_run: Option<Instant>,
}

#[derive(Default)]
pub struct RefreshScheduler {
    tasks: Vec<Task>,
}

impl RefreshScheduler {
    pub fn new() -> Self {
        RefreshScheduler::default()
    }

    /// Registers a task; re-registering a name replaces its interval.
    pub fn register(&mut self, name: &'static str, every: Duration) {
        if let Some(task) = self.tasks.iter_mut().find(|t| t.name == name) {
            task.every = every;
            return;
        }
        self.tasks.push(Task {
            name,
            every,
            last_run: None,
        });
    }

    /// Tasks whose interval has elapsed, in registration order. A task that
    /// has never run is always due.
    pub fn due(&self, now: Instant) -> Vec<&'static str> {
        self.tasks
            .iter()
            .filter(|task| match task.last_run {
                None => true,
                Some(last) => now.duration_since(last) >= task.every,
            })
            .map(|task| task.name)
            .collect()
    }

    pub fn mark_ran(&mut self, name: &'static str, now: Instant) {
        if let Some(task) = self.tasks.iter_mut().find(|t| t.name == name) {
            task.last_run = Some(now);
        }
    }

    /// Time until the next task becomes due; `None` with no tasks, zero when
    /// something is due already.
    pub fn next_deadline(&self, now: Instant) -> Option<Duration> {
        self.tasks
            .iter()
            .map(|task| match task.last_run {
                None => Duration::from_secs(0),
                Some(last) => {
                    let elapsed = now.duration_since(last);
                    if elapsed >= task.every {
                        Duration::from_secs(0)
                    } else {
                        task.every - elapsed
                    }
                }
            })
            .min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrun_tasks_are_due_in_registration_order() {
        let mut scheduler = RefreshScheduler::new();
        scheduler.register("polls", POLLS_REFRESH);
        scheduler.register("dashboard", DASHBOARD_REFRESH);
        let now = Instant::now();
        assert_eq!(scheduler.due(now), vec!["polls", "dashboard"]);
        assert_eq!(scheduler.next_deadline(now), Some(Duration::from_secs(0)));
    }

    #[test]
    fn tasks_become_due_again_after_their_interval() {
        let mut scheduler = RefreshScheduler::new();
        scheduler.register("polls", Duration::from_secs(12));
        let start = Instant::now();
        scheduler.mark_ran("polls", start);
        assert!(scheduler.due(start + Duration::from_secs(5)).is_empty());
        assert_eq!(
            scheduler.due(start + Duration::from_secs(12)),
            vec!["polls"]
        );
        assert_eq!(
            scheduler.next_deadline(start + Duration::from_secs(5)),
            Some(Duration::from_secs(7))
        );
    }

    #[test]
    fn reregistering_updates_the_interval() {
        let mut scheduler = RefreshScheduler::new();
        scheduler.register("polls", Duration::from_secs(12));
        scheduler.register("polls", Duration::from_secs(30));
        let start = Instant::now();
        scheduler.mark_ran("polls", start);
        assert!(scheduler.due(start + Duration::from_secs(15)).is_empty());
        assert_eq!(
            scheduler.due(start + Duration::from_secs(30)),
            vec!["polls"]
        );
    }

    #[test]
    fn empty_scheduler_has_no_deadline() {
        let scheduler = RefreshScheduler::new();
        assert_eq!(scheduler.next_deadline(Instant::now()), None);
    }
}
