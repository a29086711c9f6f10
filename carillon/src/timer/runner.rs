/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Tokio wake-loop driver for [`RotateTimer`].
//!
//! [`spawn`] moves an engine onto its own task and returns a cloneable
//! [`TimerHandle`].  The task sleeps until the next rotation boundary; an
//! attach/detach command interrupts the sleep, and the loop re-derives the
//! wait afterwards (cancel-then-reschedule is just re-entering the loop).
//! Every wake calls [`RotateTimer::recompute`] with fresh wall-clock time,
//! so late wakes and suspended hosts cannot drift the rotation.
//!
//! Display ids are allocated on the handle side, before the command reaches
//! the task, so [`TimerHandle::attach`] can return the id without a round
//! trip.  A display the engine rejects is logged there; its id is simply
//! never attached.
//!
//! The task ends once every handle is dropped and the engine is dormant.
//! With displays still attached it keeps rotating even after the last
//! handle is gone.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::{DisplayId, RotateTimer, TimerDisplay};

enum Command {
    Attach {
        id: DisplayId,
        display: Box<dyn TimerDisplay + Send>,
    },
    Detach {
        id: DisplayId,
    },
}

/// Handle to a spawned timer task.
#[derive(Clone)]
pub struct TimerHandle {
    commands: mpsc::UnboundedSender<Command>,
    next_id: Arc<AtomicU64>,
}

impl TimerHandle {
    /// Attach a display to the running timer.  The id is allocated here;
    /// the attachment itself happens on the timer task.
    pub fn attach(&self, display: Box<dyn TimerDisplay + Send>) -> DisplayId {
        let id = DisplayId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let _ = self.commands.send(Command::Attach { id, display });
        id
    }

    /// Detach a display by id.  Unknown ids are logged by the engine and
    /// ignored.
    pub fn detach(&self, id: DisplayId) {
        let _ = self.commands.send(Command::Detach { id });
    }
}

/// Current wall-clock unix time in ms.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Move `timer` onto its own tokio task.
pub fn spawn(timer: RotateTimer) -> (TimerHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = TimerHandle {
        commands: tx,
        next_id: Arc::new(AtomicU64::new(0)),
    };
    let task = tokio::spawn(run(timer, rx));
    (handle, task)
}

async fn run(mut timer: RotateTimer, mut commands: mpsc::UnboundedReceiver<Command>) {
    info!(rule = %timer.plan().rule, "timer task started");
    let mut handles_open = true;

    loop {
        match (timer.next_wait(now_ms()), handles_open) {
            // dormant and unreachable: done
            (None, false) => break,

            // dormant: only a command can change anything
            (None, true) => match commands.recv().await {
                Some(command) => apply(&mut timer, command),
                None => handles_open = false,
            },

            (Some(wait), true) => {
                tokio::select! {
                    command = commands.recv() => match command {
                        Some(command) => apply(&mut timer, command),
                        None => handles_open = false,
                    },
                    () = tokio::time::sleep(Duration::from_millis(wait.max(1) as u64)) => {
                        timer.recompute(now_ms());
                    }
                }
            }

            (Some(wait), false) => {
                tokio::time::sleep(Duration::from_millis(wait.max(1) as u64)).await;
                timer.recompute(now_ms());
            }
        }
    }
    debug!("timer task ended");
}

fn apply(timer: &mut RotateTimer, command: Command) {
    match command {
        Command::Attach { id, display } => {
            // rejections are logged by the engine; the id stays unattached
            let _ = timer.attach_with_id(id, display, now_ms());
        }
        Command::Detach { id } => {
            let _ = timer.detach(id);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::item::{Item, Schedule, ScheduleEntry};
    use crate::rule::{RotationPlan, RotationRule};

    // ── Test helpers ──────────────────────────────────────────────────────────

    fn fast_plan(interval_ms: i64) -> RotationPlan {
        RotationPlan {
            epoch_ms: now_ms(),
            rule: RotationRule::Interval { interval_ms },
            compress: false,
            items: vec![Item::plain("A"), Item::plain("B")].into(),
        }
    }

    struct Recorder {
        depth: usize,
        seen: Arc<Mutex<Vec<Schedule>>>,
    }

    impl TimerDisplay for Recorder {
        fn depth(&self) -> usize {
            self.depth
        }
        fn query(&self) -> &[String] {
            &[]
        }
        fn receive_schedule(&mut self, schedule: &[ScheduleEntry]) {
            self.seen.lock().unwrap().push(schedule.to_vec());
        }
    }

    fn recorder(depth: usize) -> (Box<Recorder>, Arc<Mutex<Vec<Schedule>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        (
            Box::new(Recorder {
                depth,
                seen: Arc::clone(&seen),
            }),
            seen,
        )
    }

    // ── Cases ─────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn attach_delivers_a_schedule() {
        let (handle, task) = spawn(RotateTimer::new(fast_plan(60_000)));
        let (display, seen) = recorder(2);
        let id = handle.attach(display);

        tokio::time::sleep(Duration::from_millis(100)).await;
        {
            let seen = seen.lock().unwrap();
            assert!(!seen.is_empty(), "attach should trigger a delivery");
            assert_eq!(seen[0].len(), 2);
        }

        handle.detach(id);
        drop(handle);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn wakes_keep_delivering_fresh_schedules() {
        // 50 ms rotations; a generous window sees several wakes
        let (handle, task) = spawn(RotateTimer::new(fast_plan(50)));
        let (display, seen) = recorder(2);
        let id = handle.attach(display);

        tokio::time::sleep(Duration::from_millis(300)).await;
        {
            let seen = seen.lock().unwrap();
            assert!(seen.len() >= 3, "expected several wakes, saw {}", seen.len());
            let first = seen.first().unwrap();
            let last = seen.last().unwrap();
            assert!(
                last[0].activation_ms > first[0].activation_ms,
                "rotation advanced across wakes"
            );
        }

        handle.detach(id);
        drop(handle);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn detached_timer_stops_delivering() {
        let (handle, task) = spawn(RotateTimer::new(fast_plan(50)));
        let (display, seen) = recorder(2);
        let id = handle.attach(display);

        tokio::time::sleep(Duration::from_millis(120)).await;
        handle.detach(id);
        tokio::time::sleep(Duration::from_millis(60)).await;

        let after_detach = seen.lock().unwrap().len();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(seen.lock().unwrap().len(), after_detach);

        drop(handle);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn task_ends_when_dormant_and_unreachable() {
        let (handle, task) = spawn(RotateTimer::new(fast_plan(60_000)));
        drop(handle);
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("task should end promptly")
            .unwrap();
    }

    #[tokio::test]
    async fn handle_allocates_distinct_ids() {
        let (handle, task) = spawn(RotateTimer::new(fast_plan(60_000)));
        let (a, _) = recorder(2);
        let (b, _) = recorder(2);
        let id_a = handle.attach(a);
        let id_b = handle.attach(b);
        assert_ne!(id_a, id_b);

        handle.detach(id_a);
        handle.detach(id_b);
        drop(handle);
        task.await.unwrap();
    }
}
