// ── Debounced device-id availability check ──
//
// A single actor task owns the input, the debounce deadline and at most one
// in-flight remote check. Every input change restarts the deadline; when it
// fires, any older check is cancelled and a new one starts. Only the newest
// check can move the state to a terminal value.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bmsdash_api::{ConfigApiClient, Protocol};
use futures_util::future::BoxFuture;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(400);

// ── AvailabilityState ────────────────────────────────────────────

/// Status of the bound input field.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AvailabilityState {
    /// Nothing to check (empty input, disabled, or no protocol).
    #[default]
    Idle,
    Checking,
    Available,
    Taken,
    /// The check failed; the message is for display only.
    Error(String),
}

impl AvailabilityState {
    /// Submission is allowed only for a confirmed-free id.
    pub fn can_save(&self) -> bool {
        matches!(self, Self::Available)
    }
}

// ── AvailabilityCheck ────────────────────────────────────────────

/// Remote predicate: is `device_id` already registered for `protocol`?
pub trait AvailabilityCheck: Send + Sync + 'static {
    fn exists(
        &self,
        protocol: Protocol,
        device_id: &str,
    ) -> impl Future<Output = Result<bool, bmsdash_api::Error>> + Send;
}

impl AvailabilityCheck for ConfigApiClient {
    async fn exists(&self, protocol: Protocol, device_id: &str) -> Result<bool, bmsdash_api::Error> {
        self.device_id_exists(protocol, device_id).await
    }
}

// ── Options ──────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ValidatorOptions {
    pub debounce: Duration,
    pub protocol: Option<Protocol>,
    pub enabled: bool,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            protocol: None,
            enabled: true,
        }
    }
}

// ── DebouncedValidator ───────────────────────────────────────────

enum Input {
    Value(String),
    Protocol(Option<Protocol>),
    Enabled(bool),
}

/// Handle to a validator actor bound to one input field.
///
/// Setters never block. Dropping the handle stops the actor and cancels
/// any in-flight check.
pub struct DebouncedValidator {
    input: mpsc::UnboundedSender<Input>,
    state: watch::Receiver<AvailabilityState>,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl DebouncedValidator {
    /// Spawn the actor onto the current runtime. Starts `Idle`.
    pub fn spawn<C: AvailabilityCheck>(checker: Arc<C>, options: ValidatorOptions) -> Self {
        let (input, rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(AvailabilityState::Idle);
        let cancel = CancellationToken::new();

        let actor = Actor {
            checker,
            debounce: options.debounce,
            value: String::new(),
            protocol: options.protocol,
            enabled: options.enabled,
            deadline: None,
            inflight: None,
            state: state_tx,
        };
        let handle = tokio::spawn(actor.run(rx, cancel.clone()));

        Self {
            input,
            state,
            cancel,
            handle: Some(handle),
        }
    }

    pub fn set_input(&self, value: impl Into<String>) {
        let _ = self.input.send(Input::Value(value.into()));
    }

    pub fn set_protocol(&self, protocol: Option<Protocol>) {
        let _ = self.input.send(Input::Protocol(protocol));
    }

    pub fn set_enabled(&self, enabled: bool) {
        let _ = self.input.send(Input::Enabled(enabled));
    }

    pub fn state(&self) -> AvailabilityState {
        self.state.borrow().clone()
    }

    pub fn can_save(&self) -> bool {
        self.state.borrow().can_save()
    }

    /// Reactive view of the state; `can_save` follows from each value.
    pub fn subscribe(&self) -> watch::Receiver<AvailabilityState> {
        self.state.clone()
    }

    /// Stop the actor and wait for it to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for DebouncedValidator {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── Actor ────────────────────────────────────────────────────────

type CheckOutcome = Result<bool, bmsdash_api::Error>;

struct InFlight {
    device_id: String,
    token: CancellationToken,
    future: BoxFuture<'static, Option<CheckOutcome>>,
}

struct Actor<C> {
    checker: Arc<C>,
    debounce: Duration,
    value: String,
    protocol: Option<Protocol>,
    enabled: bool,
    deadline: Option<Instant>,
    inflight: Option<InFlight>,
    state: watch::Sender<AvailabilityState>,
}

impl<C: AvailabilityCheck> Actor<C> {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Input>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                msg = rx.recv() => match msg {
                    Some(msg) => self.on_input(msg),
                    None => break,
                },
                () = sleep_until(self.deadline.unwrap_or_else(Instant::now)), if self.deadline.is_some() => {
                    self.fire();
                }
                outcome = in_flight(&mut self.inflight), if self.inflight.is_some() => {
                    self.finish(outcome);
                }
            }
        }

        self.cancel_inflight();
        trace!("validator actor exiting");
    }

    fn on_input(&mut self, msg: Input) {
        match msg {
            Input::Value(value) => self.value = value,
            Input::Protocol(protocol) => self.protocol = protocol,
            Input::Enabled(enabled) => self.enabled = enabled,
        }

        if self.idle_reason().is_some() {
            self.deadline = None;
            self.cancel_inflight();
            self.publish(AvailabilityState::Idle);
        } else {
            self.deadline = Some(Instant::now() + self.debounce);
        }
    }

    fn idle_reason(&self) -> Option<&'static str> {
        if !self.enabled {
            Some("disabled")
        } else if self.protocol.is_none() {
            Some("no protocol")
        } else if self.value.trim().is_empty() {
            Some("empty input")
        } else {
            None
        }
    }

    /// Debounce elapsed: supersede any running check with one for the
    /// current value.
    fn fire(&mut self) {
        self.deadline = None;
        let Some(protocol) = self.protocol else {
            return;
        };
        let device_id = self.value.trim().to_owned();

        self.cancel_inflight();
        debug!(%protocol, device_id = %device_id, "checking device id");

        let token = CancellationToken::new();
        let checker = Arc::clone(&self.checker);
        let check_token = token.clone();
        let id = device_id.clone();
        let future = Box::pin(async move {
            tokio::select! {
                biased;
                () = check_token.cancelled() => None,
                outcome = checker.exists(protocol, &id) => Some(outcome),
            }
        });

        self.inflight = Some(InFlight {
            device_id,
            token,
            future,
        });
        self.publish(AvailabilityState::Checking);
    }

    fn finish(&mut self, outcome: Option<CheckOutcome>) {
        let Some(done) = self.inflight.take() else {
            return;
        };
        let next = match outcome {
            // Cancelled checks are silent.
            None => return,
            Some(Ok(true)) => AvailabilityState::Taken,
            Some(Ok(false)) => AvailabilityState::Available,
            Some(Err(e)) => {
                debug!(error = %e, device_id = %done.device_id, "availability check failed");
                AvailabilityState::Error(e.to_string())
            }
        };
        trace!(device_id = %done.device_id, state = ?next, "check finished");
        self.publish(next);
    }

    fn cancel_inflight(&mut self) {
        if let Some(prev) = self.inflight.take() {
            trace!(device_id = %prev.device_id, "cancelling superseded check");
            prev.token.cancel();
        }
    }

    fn publish(&self, next: AvailabilityState) {
        self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

async fn in_flight(slot: &mut Option<InFlight>) -> Option<CheckOutcome> {
    match slot {
        Some(check) => (&mut check.future).await,
        None => std::future::pending().await,
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use super::*;

    /// Scripted backend: fixed latency, a set of taken ids, optional
    /// failure. Records every request.
    struct FakeBackend {
        latency: Duration,
        taken: HashSet<String>,
        fail: bool,
        calls: Mutex<Vec<(Protocol, String, Instant)>>,
    }

    impl FakeBackend {
        fn new(latency: Duration, taken: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                latency,
                taken: taken.iter().map(|s| (*s).to_owned()).collect(),
                fail: false,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn failing(latency: Duration) -> Arc<Self> {
            Arc::new(Self {
                latency,
                taken: HashSet::new(),
                fail: true,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<(Protocol, String, Instant)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl AvailabilityCheck for FakeBackend {
        async fn exists(&self, protocol: Protocol, device_id: &str) -> Result<bool, bmsdash_api::Error> {
            self.calls
                .lock()
                .unwrap()
                .push((protocol, device_id.to_owned(), Instant::now()));
            tokio::time::sleep(self.latency).await;
            if self.fail {
                return Err(bmsdash_api::Error::Http {
                    status: 503,
                    message: "maintenance".into(),
                });
            }
            Ok(self.taken.contains(device_id))
        }
    }

    fn bacnet() -> ValidatorOptions {
        ValidatorOptions {
            protocol: Some(Protocol::Bacnet),
            ..ValidatorOptions::default()
        }
    }

    async fn settle(validator: &DebouncedValidator) -> AvailabilityState {
        let mut rx = validator.subscribe();
        rx.wait_for(|s| !matches!(s, AvailabilityState::Checking | AvailabilityState::Idle))
            .await
            .unwrap()
            .clone()
    }

    #[tokio::test(start_paused = true)]
    async fn starts_idle() {
        let backend = FakeBackend::new(Duration::ZERO, &[]);
        let validator = DebouncedValidator::spawn(backend, bacnet());
        assert_eq!(validator.state(), AvailabilityState::Idle);
        assert!(!validator.can_save());
    }

    #[tokio::test(start_paused = true)]
    async fn typing_burst_issues_one_check_for_final_value() {
        let backend = FakeBackend::new(Duration::from_millis(50), &[]);
        let validator = DebouncedValidator::spawn(Arc::clone(&backend), bacnet());
        let start = Instant::now();

        // "12345" typed over 200 ms.
        for (i, prefix) in ["1", "12", "123", "1234", "12345"].into_iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            validator.set_input(prefix);
        }

        assert_eq!(settle(&validator).await, AvailabilityState::Available);
        assert!(validator.can_save());

        let calls = backend.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, Protocol::Bacnet);
        assert_eq!(calls[0].1, "12345");
        // Last keystroke at +200 ms, check at +600 ms.
        assert_eq!(calls[0].2 - start, Duration::from_millis(600));
    }

    #[tokio::test(start_paused = true)]
    async fn taken_id_blocks_save() {
        let backend = FakeBackend::new(Duration::from_millis(10), &["777"]);
        let validator = DebouncedValidator::spawn(backend, bacnet());

        validator.set_input("777");
        assert_eq!(settle(&validator).await, AvailabilityState::Taken);
        assert!(!validator.can_save());
    }

    #[tokio::test(start_paused = true)]
    async fn backend_failure_is_error_state() {
        let backend = FakeBackend::failing(Duration::from_millis(10));
        let validator = DebouncedValidator::spawn(backend, bacnet());

        validator.set_input("12345");
        match settle(&validator).await {
            AvailabilityState::Error(msg) => assert!(msg.contains("503")),
            other => panic!("expected error state, got {other:?}"),
        }
        assert!(!validator.can_save());
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_check_never_sets_terminal_state() {
        // "111" is taken but slow; "222" is free. A's answer must not land.
        let backend = FakeBackend::new(Duration::from_secs(2), &["111"]);
        let validator = DebouncedValidator::spawn(Arc::clone(&backend), bacnet());
        let mut states = validator.subscribe();

        validator.set_input("111");
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(validator.state(), AvailabilityState::Checking);

        validator.set_input("222");
        let mut seen = Vec::new();
        loop {
            states.changed().await.unwrap();
            let s = states.borrow_and_update().clone();
            seen.push(s.clone());
            if !matches!(s, AvailabilityState::Checking) {
                break;
            }
        }

        assert_eq!(seen.last(), Some(&AvailabilityState::Available));
        assert!(!seen.contains(&AvailabilityState::Taken));

        // Let A's original deadline pass as well.
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(validator.state(), AvailabilityState::Available);
        assert_eq!(backend.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn clearing_input_cancels_pending_and_inflight() {
        let backend = FakeBackend::new(Duration::from_secs(1), &["12345"]);
        let validator = DebouncedValidator::spawn(Arc::clone(&backend), bacnet());

        validator.set_input("12345");
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(validator.state(), AvailabilityState::Checking);

        validator.set_input("   ");
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(validator.state(), AvailabilityState::Idle);
        assert_eq!(backend.calls().len(), 1);

        // A pending debounce is dropped too.
        validator.set_input("9");
        tokio::time::sleep(Duration::from_millis(100)).await;
        validator.set_input("");
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(backend.calls().len(), 1);
        assert_eq!(validator.state(), AvailabilityState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_or_missing_protocol_stays_idle() {
        let backend = FakeBackend::new(Duration::ZERO, &[]);
        let validator = DebouncedValidator::spawn(
            Arc::clone(&backend),
            ValidatorOptions {
                protocol: None,
                ..ValidatorOptions::default()
            },
        );

        validator.set_input("12345");
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(validator.state(), AvailabilityState::Idle);

        validator.set_protocol(Some(Protocol::Bacnet));
        assert_eq!(settle(&validator).await, AvailabilityState::Available);

        validator.set_enabled(false);
        let mut rx = validator.subscribe();
        rx.wait_for(|s| *s == AvailabilityState::Idle).await.unwrap();
        assert!(!validator.can_save());
        assert_eq!(backend.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_inflight_check() {
        let backend = FakeBackend::new(Duration::from_secs(5), &[]);
        let validator = DebouncedValidator::spawn(Arc::clone(&backend), bacnet());
        let rx = validator.subscribe();

        validator.set_input("42");
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(backend.calls().len(), 1);

        validator.shutdown().await;
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(*rx.borrow(), AvailabilityState::Checking);
    }
}
