use std::time::Duration;

use crate::{
    foundation::error::{EngineError, ReplayError, ReplayResult},
    replay::{
        clock::{Clock, MonotonicClock},
        timer::{TickToken, Timer},
    },
    trace::model::{Action, Trace, TraceBundle},
};

/// Playback interval used until [`ReplayEngine::change_rate`] is called.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum PlaybackState {
    Idle,
    Playing,
    Paused,
    Finished,
}

/// Read-only view of the engine handed to observers after every committed transition.
#[derive(Clone, Copy, Debug)]
pub struct FrameView<'a> {
    /// Number of actions committed so far.
    pub position: usize,
    pub trace_len: usize,
    pub state: PlaybackState,
    pub array: &'a [f64],
    /// The action that produced this frame; `None` at position 0.
    pub action: Option<&'a Action>,
    /// Maximum of the original input, used for a stable vertical scale.
    pub fixed_max: f64,
}

/// Receives a [`FrameView`] after every committed state transition.
pub trait PlaybackObserver {
    fn on_commit(&mut self, view: &FrameView<'_>) -> ReplayResult<()>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NullObserver;

impl PlaybackObserver for NullObserver {
    fn on_commit(&mut self, _view: &FrameView<'_>) -> ReplayResult<()> {
        Ok(())
    }
}

struct Session {
    trace: Trace,
    original: Vec<f64>,
    fixed_max: f64,
}

/// Finite-state machine that replays a [`Trace`] against a working array.
///
/// The engine owns the position cursor, the working array and its timer. Ticks are driven by
/// the caller through [`poll`](Self::poll) (or [`run_until_idle`](Self::run_until_idle)); every
/// command is honored synchronously between ticks. Position counts committed actions, so
/// `position == trace_len` is the terminal state.
pub struct ReplayEngine<O = NullObserver, C = MonotonicClock> {
    clock: C,
    observer: O,
    session: Option<Session>,
    working: Vec<f64>,
    position: usize,
    state: PlaybackState,
    interval: Duration,
    timer: Timer,
    fault: Option<EngineError>,
}

impl ReplayEngine {
    pub fn new() -> Self {
        Self::with_parts(NullObserver, MonotonicClock::new())
    }
}

impl Default for ReplayEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: PlaybackObserver, C: Clock> ReplayEngine<O, C> {
    pub fn with_parts(observer: O, clock: C) -> Self {
        Self {
            clock,
            observer,
            session: None,
            working: Vec::new(),
            position: 0,
            state: PlaybackState::Idle,
            interval: DEFAULT_INTERVAL,
            timer: Timer::default(),
            fault: None,
        }
    }

    /// Replace the loaded trace. Valid from any state; always lands in `Idle` at position 0.
    pub fn load(&mut self, trace: Trace, original: Vec<f64>) -> ReplayResult<PlaybackState> {
        self.timer.cancel();
        self.fault = None;

        let fixed_max = if original.is_empty() {
            0.0
        } else {
            original.iter().copied().fold(f64::NEG_INFINITY, f64::max)
        };
        tracing::info!(
            len = original.len(),
            actions = trace.len(),
            fixed_max,
            "trace loaded into engine"
        );

        self.working = original.clone();
        self.session = Some(Session {
            trace,
            original,
            fixed_max,
        });
        self.position = 0;
        self.state = PlaybackState::Idle;
        self.notify()?;
        Ok(self.state)
    }

    pub fn load_bundle(&mut self, bundle: TraceBundle) -> ReplayResult<PlaybackState> {
        self.load(bundle.trace, bundle.original)
    }

    /// Start or resume playback.
    ///
    /// From `Finished` the working array is restored first. No-op while `Playing` and for an
    /// empty trace.
    pub fn play(&mut self) -> ReplayResult<PlaybackState> {
        self.check_fault()?;
        match self.state {
            PlaybackState::Playing => return Ok(self.state),
            PlaybackState::Finished => {
                tracing::debug!("restarting finished playback");
                self.restore();
            }
            PlaybackState::Idle | PlaybackState::Paused => {}
        }
        if self.trace_len() == 0 {
            return Ok(self.state);
        }

        self.state = PlaybackState::Playing;
        self.timer.arm(self.clock.now(), self.interval);
        tracing::debug!(position = self.position, interval = ?self.interval, "playing");
        self.notify()?;
        Ok(self.state)
    }

    /// Stop the timer and keep the current position. Only meaningful while `Playing`.
    pub fn pause(&mut self) -> ReplayResult<PlaybackState> {
        if self.state != PlaybackState::Playing {
            return Ok(self.state);
        }
        self.timer.cancel();
        self.state = PlaybackState::Paused;
        tracing::debug!(position = self.position, "paused");
        self.notify()?;
        Ok(self.state)
    }

    /// Restore the original array and rewind to position 0. Also clears a recorded fault.
    pub fn reset(&mut self) -> ReplayResult<PlaybackState> {
        self.timer.cancel();
        self.fault = None;
        self.restore();
        self.state = PlaybackState::Idle;
        tracing::debug!("reset");
        self.notify()?;
        Ok(self.state)
    }

    /// Commit exactly one action by hand. Valid from `Idle` and `Paused`.
    pub fn step(&mut self) -> ReplayResult<PlaybackState> {
        self.check_fault()?;
        if !matches!(self.state, PlaybackState::Idle | PlaybackState::Paused)
            || self.position >= self.trace_len()
        {
            return Ok(self.state);
        }

        if let Err(e) = self.advance_one() {
            return Err(self.halt(e));
        }
        self.state = if self.position >= self.trace_len() {
            PlaybackState::Finished
        } else {
            PlaybackState::Paused
        };
        self.notify()?;
        Ok(self.state)
    }

    /// Change the tick interval. While playing, the next tick is one new interval from now.
    pub fn change_rate(&mut self, interval: Duration) -> ReplayResult<PlaybackState> {
        if interval.is_zero() {
            return Err(EngineError::InvalidInterval.into());
        }
        self.interval = interval;
        if self.state == PlaybackState::Playing {
            self.timer.arm(self.clock.now(), interval);
        }
        tracing::debug!(?interval, state = ?self.state, "rate changed");
        Ok(self.state)
    }

    /// Fire every tick whose deadline has passed, one at a time. Returns the number fired.
    pub fn poll(&mut self) -> ReplayResult<usize> {
        let mut fired = 0;
        while let Some(token) = self.timer.due(self.clock.now()) {
            if !self.fire(token)? {
                break;
            }
            fired += 1;
        }
        Ok(fired)
    }

    /// Fire one scheduled tick. Tokens from a cancelled or re-armed timer are ignored.
    pub fn fire(&mut self, token: TickToken) -> ReplayResult<bool> {
        if self.state != PlaybackState::Playing || !self.timer.accepts(token) {
            tracing::trace!(?token, "stale tick ignored");
            return Ok(false);
        }

        if let Err(e) = self.advance_one() {
            return Err(self.halt(e));
        }

        if self.position >= self.trace_len() {
            self.timer.cancel();
            self.state = PlaybackState::Finished;
            tracing::info!(position = self.position, "playback finished");
        } else {
            self.timer.rearm_after(token, self.interval);
        }
        self.notify()?;
        Ok(true)
    }

    /// Sleep through deadlines until playback leaves `Playing`. Returns the number of ticks fired.
    pub fn run_until_idle(&mut self) -> ReplayResult<usize> {
        let mut fired = 0;
        while self.state == PlaybackState::Playing {
            let Some(due) = self.timer.next_due() else {
                break;
            };
            self.clock.sleep_until(due);
            fired += self.poll()?;
        }
        Ok(fired)
    }

    /// Re-notify observers without changing state, e.g. after the output surface was resized.
    pub fn refresh(&mut self) -> ReplayResult<()> {
        self.notify()
    }

    pub fn current_position(&self) -> usize {
        self.position
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn working_array(&self) -> &[f64] {
        &self.working
    }

    pub fn original_array(&self) -> &[f64] {
        self.session
            .as_ref()
            .map(|s| s.original.as_slice())
            .unwrap_or(&[])
    }

    pub fn fixed_max(&self) -> f64 {
        self.session.as_ref().map(|s| s.fixed_max).unwrap_or(0.0)
    }

    pub fn trace_len(&self) -> usize {
        self.session.as_ref().map(|s| s.trace.len()).unwrap_or(0)
    }

    /// The action that produced the current frame.
    pub fn current_action(&self) -> Option<&Action> {
        let s = self.session.as_ref()?;
        s.trace.get(self.position.checked_sub(1)?)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.timer.next_due()
    }

    pub fn fault(&self) -> Option<&EngineError> {
        self.fault.as_ref()
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    pub fn into_observer(self) -> O {
        self.observer
    }

    fn check_fault(&self) -> ReplayResult<()> {
        match &self.fault {
            Some(e) => Err(e.clone().into()),
            None => Ok(()),
        }
    }

    fn restore(&mut self) {
        self.working.clear();
        if let Some(s) = &self.session {
            self.working.extend_from_slice(&s.original);
        }
        self.position = 0;
    }

    /// Stop on a fault and show the halted state. The engine error wins over an observer error.
    fn halt(&mut self, err: EngineError) -> ReplayError {
        self.timer.cancel();
        self.state = PlaybackState::Paused;
        tracing::warn!(position = self.position, error = %err, "playback halted");
        self.fault = Some(err.clone());
        if let Err(notify_err) = self.notify() {
            tracing::warn!(error = %notify_err, "observer failed on halt");
        }
        err.into()
    }

    /// Commit the action at the cursor. Bounds are checked before any cell is written.
    fn advance_one(&mut self) -> Result<(), EngineError> {
        let Some(session) = &self.session else {
            return Ok(());
        };
        let Some(&action) = session.trace.get(self.position) else {
            return Ok(());
        };
        apply_action(&mut self.working, action, self.position)?;
        self.position += 1;
        tracing::debug!(position = self.position, ?action, "committed");
        Ok(())
    }

    fn notify(&mut self) -> ReplayResult<()> {
        let (action, fixed_max, trace_len) = match &self.session {
            Some(s) => (
                self.position.checked_sub(1).and_then(|p| s.trace.get(p)),
                s.fixed_max,
                s.trace.len(),
            ),
            None => (None, 0.0, 0),
        };
        let view = FrameView {
            position: self.position,
            trace_len,
            state: self.state,
            array: &self.working,
            action,
            fixed_max,
        };
        self.observer.on_commit(&view)
    }
}

/// Apply one action to `array`, failing without mutation if any index is out of range.
pub fn apply_action(array: &mut [f64], action: Action, position: usize) -> Result<(), EngineError> {
    let len = array.len();
    if let Some(&index) = action.positions().as_slice().iter().find(|&&i| i >= len) {
        return Err(EngineError::IndexOutOfRange {
            position,
            index,
            len,
        });
    }
    match action {
        Action::Compare(..) => {}
        Action::Swap(i, j) => array.swap(i, j),
        Action::Set { index, value } => array[index] = value,
    }
    Ok(())
}
