//! A single per-frame dispatch point for the physics tick and the drift
//! callback. The orchestrator asks it once per frame which tasks are live,
//! runs them in a fixed order and composes the scene exactly once.

use tracing::trace;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Physics,
    Drift,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TaskHandle {
    id: u64,
    kind: TaskKind,
}

/// Which callbacks run this frame. Physics always precedes drift.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameTasks {
    pub physics: bool,
    pub drift: bool,
}

#[derive(Debug, Default)]
pub struct FrameScheduler {
    next_id: u64,
    physics: Option<TaskHandle>,
    drift: Option<TaskHandle>,
    frames_dispatched: u64,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a task of `kind`, replacing any live task of the same kind.
    pub fn schedule(&mut self, kind: TaskKind) -> TaskHandle {
        self.next_id += 1;
        let handle = TaskHandle {
            id: self.next_id,
            kind,
        };
        *self.slot(kind) = Some(handle);
        trace!(?kind, id = handle.id, "scheduled frame task");
        handle
    }

    /// Returns `true` if the handle was still live.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        if !self.is_active(handle) {
            return false;
        }
        *self.slot(handle.kind) = None;
        true
    }

    pub fn cancel_all(&mut self) {
        self.physics = None;
        self.drift = None;
    }

    pub fn is_active(&self, handle: TaskHandle) -> bool {
        match handle.kind {
            TaskKind::Physics => self.physics == Some(handle),
            TaskKind::Drift => self.drift == Some(handle),
        }
    }

    #[cfg(test)]
    pub fn is_scheduled(&self, kind: TaskKind) -> bool {
        match kind {
            TaskKind::Physics => self.physics.is_some(),
            TaskKind::Drift => self.drift.is_some(),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.physics.is_none() && self.drift.is_none()
    }

    /// Starts a frame. Returns `None` when nothing is scheduled, in which
    /// case no callback may run.
    pub fn begin_frame(&mut self) -> Option<FrameTasks> {
        if self.is_idle() {
            return None;
        }
        self.frames_dispatched += 1;
        Some(FrameTasks {
            physics: self.physics.is_some(),
            drift: self.drift.is_some(),
        })
    }

    pub fn frames_dispatched(&self) -> u64 {
        self.frames_dispatched
    }

    fn slot(&mut self, kind: TaskKind) -> &mut Option<TaskHandle> {
        match kind {
            TaskKind::Physics => &mut self.physics,
            TaskKind::Drift => &mut self.drift,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_reports_live_tasks() {
        let mut scheduler = FrameScheduler::new();
        assert_eq!(scheduler.begin_frame(), None);

        scheduler.schedule(TaskKind::Drift);
        assert_eq!(
            scheduler.begin_frame(),
            Some(FrameTasks {
                physics: false,
                drift: true,
            })
        );

        scheduler.schedule(TaskKind::Physics);
        assert_eq!(
            scheduler.begin_frame(),
            Some(FrameTasks {
                physics: true,
                drift: true,
            })
        );
        assert_eq!(scheduler.frames_dispatched(), 2);
    }

    #[test]
    fn rescheduling_invalidates_the_old_handle() {
        let mut scheduler = FrameScheduler::new();
        let first = scheduler.schedule(TaskKind::Physics);
        let second = scheduler.schedule(TaskKind::Physics);
        assert!(!scheduler.is_active(first));
        assert!(scheduler.is_active(second));
        assert!(!scheduler.cancel(first));
        assert!(scheduler.cancel(second));
        assert!(scheduler.is_idle());
    }

    #[test]
    fn cancel_all_stops_dispatch() {
        let mut scheduler = FrameScheduler::new();
        let physics = scheduler.schedule(TaskKind::Physics);
        let drift = scheduler.schedule(TaskKind::Drift);
        scheduler.begin_frame();

        scheduler.cancel_all();
        assert!(!scheduler.is_active(physics));
        assert!(!scheduler.is_active(drift));
        for _ in 0..10 {
            assert_eq!(scheduler.begin_frame(), None);
        }
        assert_eq!(scheduler.frames_dispatched(), 1);
    }
}
