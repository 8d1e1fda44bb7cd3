use std::time::Duration;

/// Handle for one scheduled tick.
///
/// A token is only honored while its generation and deadline still match the timer; cancelling
/// or re-arming invalidates every token issued before.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickToken {
    generation: u64,
    due: Duration,
}

impl TickToken {
    pub fn due(self) -> Duration {
        self.due
    }
}

/// Single-shot, re-armable playback timer.
#[derive(Debug, Default)]
pub struct Timer {
    generation: u64,
    next_due: Option<Duration>,
}

impl Timer {
    /// Schedule the next tick at `now + interval`, replacing any pending one.
    pub fn arm(&mut self, now: Duration, interval: Duration) -> TickToken {
        self.schedule(now + interval)
    }

    /// Schedule the tick following `fired`, keeping a fixed cadence.
    pub(crate) fn rearm_after(&mut self, fired: TickToken, interval: Duration) -> TickToken {
        self.schedule(fired.due + interval)
    }

    fn schedule(&mut self, due: Duration) -> TickToken {
        self.generation += 1;
        self.next_due = Some(due);
        TickToken {
            generation: self.generation,
            due,
        }
    }

    pub fn cancel(&mut self) {
        self.generation += 1;
        self.next_due = None;
    }

    pub fn is_armed(&self) -> bool {
        self.next_due.is_some()
    }

    pub fn next_due(&self) -> Option<Duration> {
        self.next_due
    }

    /// Token for the pending tick if its deadline has passed.
    pub fn due(&self, now: Duration) -> Option<TickToken> {
        let due = self.next_due.filter(|&d| d <= now)?;
        Some(TickToken {
            generation: self.generation,
            due,
        })
    }

    pub fn accepts(&self, token: TickToken) -> bool {
        self.next_due == Some(token.due) && self.generation == token.generation
    }
}
