//! Adaptive polling state machine.
//!
//! The scheduler never touches a clock. It tells the caller when to arm or
//! clear a timer and when to fetch; the caller reports timer fires and fetch
//! outcomes back. Timers are tagged with a generation so that a fire from a
//! timer that has since been cleared or replaced is ignored.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollIntervals {
    /// Used while any job is running.
    pub short: Duration,
    /// Used while everything is idle, and after a failed fetch.
    pub long: Duration,
}

impl Default for PollIntervals {
    fn default() -> Self {
        Self {
            short: Duration::from_secs(2),
            long: Duration::from_secs(8),
        }
    }
}

impl PollIntervals {
    pub fn for_activity(&self, any_running: bool) -> Duration {
        if any_running {
            self.short
        } else {
            self.long
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollPhase {
    #[default]
    Idle,
    Scheduled,
    Fetching,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollCommand {
    Arm { generation: u64, delay: Duration },
    Clear,
    Fetch,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PollScheduler {
    intervals: PollIntervals,
    phase: PollPhase,
    generation: u64,
    in_flight: bool,
    paused: bool,
}

impl PollScheduler {
    pub fn new(intervals: PollIntervals) -> Self {
        Self {
            intervals,
            ..Self::default()
        }
    }

    pub fn phase(&self) -> PollPhase {
        self.phase
    }

    pub fn intervals(&self) -> PollIntervals {
        self.intervals
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Arms the timer unless paused or a fetch is outstanding (the timer is
    /// re-armed when that fetch settles). `initial_delay` applies to the first
    /// tick only.
    pub fn ensure_polling(
        &mut self,
        initial_delay: Option<Duration>,
        any_running: bool,
    ) -> Vec<PollCommand> {
        if self.paused || self.in_flight {
            return Vec::new();
        }
        let delay = initial_delay.unwrap_or_else(|| self.intervals.for_activity(any_running));
        vec![self.arm(delay)]
    }

    /// A timer fired. Returns the commands to run; empty when the fire is stale
    /// or a fetch is still outstanding.
    pub fn on_timer(&mut self, generation: u64) -> Vec<PollCommand> {
        if generation != self.generation || self.paused || self.in_flight {
            return Vec::new();
        }
        self.begin_fetch();
        vec![PollCommand::Fetch]
    }

    /// Fetch immediately (manual refresh). No-op while a fetch is outstanding.
    pub fn request_fetch(&mut self) -> Vec<PollCommand> {
        if self.in_flight {
            return Vec::new();
        }
        let was_scheduled = self.phase == PollPhase::Scheduled;
        self.begin_fetch();
        if was_scheduled {
            vec![PollCommand::Clear, PollCommand::Fetch]
        } else {
            vec![PollCommand::Fetch]
        }
    }

    /// The outstanding fetch settled. `any_running` is `None` on failure, which
    /// is treated like "nothing running".
    pub fn on_fetch_settled(&mut self, any_running: Option<bool>) -> Vec<PollCommand> {
        self.in_flight = false;
        if self.paused {
            self.phase = PollPhase::Paused;
            return Vec::new();
        }
        let delay = self.intervals.for_activity(any_running.unwrap_or(false));
        vec![self.arm(delay)]
    }

    pub fn pause(&mut self) -> Vec<PollCommand> {
        if self.paused {
            return Vec::new();
        }
        self.paused = true;
        self.generation += 1;
        if !self.in_flight {
            self.phase = PollPhase::Paused;
        }
        vec![PollCommand::Clear]
    }

    /// Resumes with one immediate fetch; the timer is re-armed once it settles.
    pub fn resume(&mut self) -> Vec<PollCommand> {
        if !self.paused {
            return Vec::new();
        }
        self.paused = false;
        if self.in_flight {
            self.phase = PollPhase::Fetching;
            return Vec::new();
        }
        self.begin_fetch();
        vec![PollCommand::Fetch]
    }

    fn arm(&mut self, delay: Duration) -> PollCommand {
        self.generation += 1;
        self.phase = PollPhase::Scheduled;
        PollCommand::Arm {
            generation: self.generation,
            delay,
        }
    }

    fn begin_fetch(&mut self) {
        self.generation += 1;
        self.in_flight = true;
        self.phase = PollPhase::Fetching;
    }
}
