//! Inactivity-driven session lifecycle with a warning phase

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::{
    config::SessionConfig,
    models::session::{ExpireReason, SessionPhase, SessionSnapshot},
    services::timer::InactivityTimer,
};

pub type WarnHook = Arc<dyn Fn(Duration) + Send + Sync>;
pub type DismissHook = Arc<dyn Fn() + Send + Sync>;
pub type ExpireHook = Arc<dyn Fn(ExpireReason) + Send + Sync>;

/// Timing rules for one session
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Time from last activity to the warning
    pub inactivity_timeout: Duration,
    /// Time from the warning to forced logout
    pub warning_duration: Duration,
    /// Hard cap counted from login
    pub max_session_duration: Option<Duration>,
    /// When off, inactivity expires the session without a warning phase
    pub enable_warning: bool,
    /// When off, no countdown runs and only explicit logout ends the session
    pub enable_auto_logout: bool,
}

impl SessionSettings {
    pub fn new(inactivity_timeout: Duration, warning_duration: Duration) -> Self {
        Self {
            inactivity_timeout,
            warning_duration,
            max_session_duration: None,
            enable_warning: true,
            enable_auto_logout: true,
        }
    }

    pub fn with_max_session_duration(mut self, max: Duration) -> Self {
        self.max_session_duration = Some(max);
        self
    }
}

impl From<&SessionConfig> for SessionSettings {
    fn from(config: &SessionConfig) -> Self {
        Self {
            inactivity_timeout: config.inactivity_timeout(),
            warning_duration: config.warning_duration(),
            max_session_duration: Some(config.max_session_duration()).filter(|d| !d.is_zero()),
            enable_warning: config.enable_warning,
            enable_auto_logout: config.enable_auto_logout,
        }
    }
}

/// Side effects fired on phase changes. Hooks run outside the controller's
/// lock and may call back into it.
#[derive(Clone)]
pub struct SessionHooks {
    on_warn: WarnHook,
    on_dismiss: DismissHook,
    on_expire: ExpireHook,
}

impl Default for SessionHooks {
    fn default() -> Self {
        Self {
            on_warn: Arc::new(|_| {}),
            on_dismiss: Arc::new(|| {}),
            on_expire: Arc::new(|_| {}),
        }
    }
}

impl SessionHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called on entering Warning with the length of the countdown
    pub fn on_warn(mut self, hook: impl Fn(Duration) + Send + Sync + 'static) -> Self {
        self.on_warn = Arc::new(hook);
        self
    }

    /// Called when activity or `extend()` clears a warning
    pub fn on_dismiss(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_dismiss = Arc::new(hook);
        self
    }

    pub fn on_expire(mut self, hook: impl Fn(ExpireReason) + Send + Sync + 'static) -> Self {
        self.on_expire = Arc::new(hook);
        self
    }
}

struct SessionState {
    phase: SessionPhase,
    /// Bumped whenever a countdown is armed or the phase changes; timer
    /// callbacks carrying an older epoch are ignored.
    epoch: u64,
    login_at: Instant,
    last_activity_at: Instant,
    deadline: Option<Instant>,
}

enum Transition {
    None,
    Warned(Duration),
    Dismissed,
    Expired(ExpireReason),
}

struct Inner {
    settings: SessionSettings,
    hooks: SessionHooks,
    timer: InactivityTimer,
    state: Mutex<SessionState>,
}

/// Governs one login session: `Active -> Warning -> {Active, Expired}`.
///
/// All activity must go through [`SessionController::activity`] (or an
/// [`ActivityHandle`]) so that warning dismissal and timer resets stay
/// coordinated. Requires a tokio runtime.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Inner>,
}

impl SessionController {
    /// Create the controller and log in, starting in Active
    pub fn start(settings: SessionSettings, hooks: SessionHooks) -> Self {
        let now = Instant::now();
        let controller = Self {
            inner: Arc::new(Inner {
                settings,
                hooks,
                timer: InactivityTimer::new(),
                state: Mutex::new(SessionState {
                    phase: SessionPhase::Active,
                    epoch: 0,
                    login_at: now,
                    last_activity_at: now,
                    deadline: None,
                }),
            }),
        };
        controller.login();
        controller
    }

    /// Re-initialize into Active with a fresh login time. This is the only
    /// way out of Expired. A pending warning is dismissed.
    pub fn login(&self) {
        let transition = {
            let mut state = self.inner.lock();
            let now = Instant::now();
            let transition = match state.phase {
                SessionPhase::Warning => Transition::Dismissed,
                _ => Transition::None,
            };
            state.phase = SessionPhase::Active;
            state.login_at = now;
            state.last_activity_at = now;
            self.inner.arm_inactivity(&mut state, now);
            transition
        };
        tracing::debug!("Session started");
        self.inner.dispatch(transition);
    }

    /// Observed user activity. Resets the inactivity countdown and clears a
    /// pending warning. Ignored once expired.
    pub fn activity(&self) -> SessionPhase {
        let (phase, transition) = {
            let mut state = self.inner.lock();
            let transition = self.inner.touch(&mut state);
            (state.phase, transition)
        };
        self.inner.dispatch(transition);
        phase
    }

    /// Explicit "stay logged in". Same effect as activity.
    pub fn extend(&self) -> SessionPhase {
        let phase = self.activity();
        if phase == SessionPhase::Active {
            tracing::debug!("Session extended");
        }
        phase
    }

    /// End the session now. No-op if already expired.
    pub fn logout_now(&self) {
        let transition = {
            let mut state = self.inner.lock();
            if state.phase == SessionPhase::Expired {
                Transition::None
            } else {
                self.inner.expire(&mut state, ExpireReason::Logout)
            }
        };
        self.inner.dispatch(transition);
    }

    pub fn phase(&self) -> SessionPhase {
        self.inner.lock().phase
    }

    /// Time until the next transition. Zero once expired; `None` when auto
    /// logout is disabled.
    pub fn time_remaining(&self) -> Option<Duration> {
        let state = self.inner.lock();
        Self::remaining(&state, Instant::now())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.inner.lock();
        let now = Instant::now();
        SessionSnapshot {
            phase: state.phase,
            remaining_ms: Self::remaining(&state, now).map(|d| d.as_millis() as u64),
            idle_ms: now.saturating_duration_since(state.last_activity_at).as_millis() as u64,
            age_ms: now.saturating_duration_since(state.login_at).as_millis() as u64,
        }
    }

    /// Write-only trigger for activity sources
    pub fn activity_handle(&self) -> ActivityHandle {
        ActivityHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }

    fn remaining(state: &SessionState, now: Instant) -> Option<Duration> {
        match (state.phase, state.deadline) {
            (SessionPhase::Expired, _) => Some(Duration::ZERO),
            (_, Some(deadline)) => Some(deadline.saturating_duration_since(now)),
            (_, None) => None,
        }
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn max_age_reached(&self, state: &SessionState, now: Instant) -> bool {
        self.settings
            .max_session_duration
            .is_some_and(|max| now.saturating_duration_since(state.login_at) >= max)
    }

    fn touch(self: &Arc<Self>, state: &mut SessionState) -> Transition {
        let now = Instant::now();
        match state.phase {
            SessionPhase::Expired => Transition::None,
            _ if self.max_age_reached(state, now) => self.expire(state, ExpireReason::MaxSessionAge),
            SessionPhase::Active => {
                state.last_activity_at = now;
                self.arm_inactivity(state, now);
                Transition::None
            }
            SessionPhase::Warning => {
                state.last_activity_at = now;
                state.phase = SessionPhase::Active;
                self.arm_inactivity(state, now);
                Transition::Dismissed
            }
        }
    }

    fn arm_inactivity(self: &Arc<Self>, state: &mut SessionState, now: Instant) {
        state.epoch += 1;
        if !self.settings.enable_auto_logout {
            state.deadline = None;
            self.timer.cancel();
            return;
        }

        let mut duration = self.settings.inactivity_timeout;
        if let Some(max) = self.settings.max_session_duration {
            let left = max.saturating_sub(now.saturating_duration_since(state.login_at));
            duration = duration.min(left);
        }

        let epoch = state.epoch;
        let weak = Arc::downgrade(self);
        state.deadline = Some(now + duration);
        self.timer.arm(
            duration,
            Arc::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.inactivity_elapsed(epoch);
                }
            }),
        );
    }

    fn inactivity_elapsed(self: &Arc<Self>, epoch: u64) {
        let transition = {
            let mut state = self.lock();
            if state.epoch != epoch || state.phase != SessionPhase::Active {
                return;
            }
            let now = Instant::now();
            if self.max_age_reached(&state, now) {
                self.expire(&mut state, ExpireReason::MaxSessionAge)
            } else if self.settings.enable_warning {
                self.enter_warning(&mut state, now)
            } else {
                self.expire(&mut state, ExpireReason::Inactivity)
            }
        };
        self.dispatch(transition);
    }

    fn enter_warning(self: &Arc<Self>, state: &mut SessionState, now: Instant) -> Transition {
        state.phase = SessionPhase::Warning;
        state.epoch += 1;

        let duration = self.settings.warning_duration;
        let epoch = state.epoch;
        let weak = Arc::downgrade(self);
        state.deadline = Some(now + duration);
        // Replaces the inactivity arming, so only one countdown is pending
        self.timer.arm(
            duration,
            Arc::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.warning_elapsed(epoch);
                }
            }),
        );
        Transition::Warned(duration)
    }

    fn warning_elapsed(self: &Arc<Self>, epoch: u64) {
        let transition = {
            let mut state = self.lock();
            if state.epoch != epoch || state.phase != SessionPhase::Warning {
                return;
            }
            self.expire(&mut state, ExpireReason::Inactivity)
        };
        self.dispatch(transition);
    }

    fn expire(&self, state: &mut SessionState, reason: ExpireReason) -> Transition {
        state.phase = SessionPhase::Expired;
        state.epoch += 1;
        state.deadline = None;
        self.timer.cancel();
        Transition::Expired(reason)
    }

    fn dispatch(&self, transition: Transition) {
        match transition {
            Transition::None => {}
            Transition::Warned(countdown) => {
                tracing::info!(countdown_secs = countdown.as_secs(), "Session inactive, warning raised");
                (self.hooks.on_warn)(countdown);
            }
            Transition::Dismissed => {
                tracing::debug!("Session warning dismissed");
                (self.hooks.on_dismiss)();
            }
            Transition::Expired(reason) => {
                tracing::info!(?reason, "Session expired");
                (self.hooks.on_expire)(reason);
            }
        }
    }
}

/// Write-only activity trigger. Holds no session state and does not keep
/// the controller alive.
#[derive(Clone)]
pub struct ActivityHandle {
    inner: Weak<Inner>,
}

impl ActivityHandle {
    /// Report activity. Returns `false` once the controller is gone or the
    /// session has expired.
    pub fn signal(&self) -> bool {
        match self.inner.upgrade() {
            Some(inner) => SessionController { inner }.activity() != SessionPhase::Expired,
            None => false,
        }
    }

    /// Forward every message from `events` as activity until the channel
    /// closes or the controller is dropped.
    pub fn listen<T: Send + 'static>(self, mut events: mpsc::Receiver<T>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while events.recv().await.is_some() {
                if self.inner.strong_count() == 0 {
                    break;
                }
                self.signal();
            }
        })
    }
}
