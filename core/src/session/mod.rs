//! # Authorization Session
//!
//! The single-use state machine that sequences the whole pipeline. One
//! session is one complete attempt to authorize one payment:
//!
//! ```text
//! Idle → Authenticating → {AuthFailed | AuthOk}
//!                            AuthOk → ScanningCode → {CodeTimeout | CodeReceived}
//!                                       CodeReceived → Validating → {Invalid | Signing}
//!                                                        Signing → {Signed | SignFailed}
//! ```
//!
//! Every step blocks on the previous one; the only suspension points are
//! the bounded frame polls, and the cancellation flag is checked at each.
//! The session owns its terminal outcome: transient conditions (no face
//! yet, ambiguous match, undecodable frame, malformed payload) are
//! absorbed inside the polling budgets and never escape except as a
//! terminal state. Validation and signing failures are never retried.
//!
//! Invariants enforced here:
//! - a signed artifact exists only after a positive match in the same
//!   session, and at most one is ever produced (`run` consumes the
//!   session);
//! - the camera handle is released on every exit path, including
//!   cancellation;
//! - no network side effect happens before the `Signing` state is
//!   explicitly reached;
//! - every terminal state emits exactly one indicator event and one
//!   narration.

pub mod events;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::biometric::{match_frame, EnrollmentSet, FaceEngine, MatchOutcome, MatchPolicy, MatchResult};
use crate::capture::{CameraHandle, CaptureError, ExclusiveCamera, Frame, FrameSource};
use crate::config::{DEFAULT_AUTH_ATTEMPTS, DEFAULT_FRAME_TIMEOUT, DEFAULT_SCAN_ATTEMPTS};
use crate::ledger::LedgerRpc;
use crate::transaction::{RequestError, SignedArtifact, TransactionSigner, ValidRequest};
use crate::transport::{GridCodec, SignedPayload, TransactionRequest};

pub use events::{IndicatorEvent, IndicatorSink, NotificationSink, NullSink};

// ---------------------------------------------------------------------------
// States & Outcomes
// ---------------------------------------------------------------------------

/// The session's position in the pipeline. Transitions are logged; the
/// state is never exposed mutably.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Constructed, not yet run.
    Idle,
    /// Polling frames for an authorized face.
    Authenticating,
    /// Terminal: the attempt budget ran out without a match.
    AuthFailed,
    /// A face cleared the policy; moving on.
    AuthOk,
    /// Polling frames for a decodable payment code.
    ScanningCode,
    /// Terminal: the scan budget ran out.
    CodeTimeout,
    /// A structurally valid request was decoded.
    CodeReceived,
    /// Checking amount and recipient.
    Validating,
    /// Terminal: the request failed validation. Nothing was signed.
    Invalid,
    /// Fetching the anchor and signing.
    Signing,
    /// Terminal: artifact produced and rendered.
    Signed,
    /// Terminal: anchor fetch or the signing step failed.
    SignFailed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Authenticating => "authenticating",
            Self::AuthFailed => "auth_failed",
            Self::AuthOk => "auth_ok",
            Self::ScanningCode => "scanning_code",
            Self::CodeTimeout => "code_timeout",
            Self::CodeReceived => "code_received",
            Self::Validating => "validating",
            Self::Invalid => "invalid",
            Self::Signing => "signing",
            Self::Signed => "signed",
            Self::SignFailed => "sign_failed",
        };
        f.write_str(s)
    }
}

/// How a session ended. Exactly one of these per run.
#[derive(Debug)]
pub enum SessionOutcome {
    /// Authorized, signed, and rendered.
    Signed {
        /// The signed transaction.
        artifact: SignedArtifact,
        /// The rendered output code carrying the signed payload.
        code: Frame,
        /// Who authorized the spend.
        identity: String,
    },
    /// No authorized face within the attempt budget.
    AuthFailed,
    /// No decodable payment code within the scan budget.
    CodeTimeout,
    /// A received request failed validation.
    Invalid(RequestError),
    /// The anchor fetch, the signing step, or the output render failed.
    SignFailed(String),
}

// ---------------------------------------------------------------------------
// Configuration & Context
// ---------------------------------------------------------------------------

/// Per-session policy knobs. Defaults come from `config`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    /// Matching policy for the authentication gate.
    pub policy: MatchPolicy,
    /// Frame polls allowed while authenticating.
    pub auth_attempts: u32,
    /// Frame polls allowed while scanning for a code.
    pub scan_attempts: u32,
    /// How long one frame poll may block.
    pub frame_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            policy: MatchPolicy::default(),
            auth_attempts: DEFAULT_AUTH_ATTEMPTS,
            scan_attempts: DEFAULT_SCAN_ATTEMPTS,
            frame_timeout: DEFAULT_FRAME_TIMEOUT,
        }
    }
}

/// Everything a session needs, passed in at the door. No statics, no
/// globals: the process constructs this once and hands it to each session.
pub struct SessionContext<'a> {
    /// The camera, wrapped for single-reader enforcement.
    pub camera: &'a ExclusiveCamera,
    /// Face detection and embedding.
    pub engine: &'a dyn FaceEngine,
    /// The read-only enrollment set.
    pub enrollment: &'a EnrollmentSet,
    /// The visual code codec.
    pub codec: GridCodec,
    /// The signing capability.
    pub signer: &'a dyn TransactionSigner,
    /// The ledger collaborator, consulted once, right before signing.
    pub ledger: &'a dyn LedgerRpc,
    /// The indicator lamp sink.
    pub indicator: &'a dyn IndicatorSink,
    /// The narration sink.
    pub narrator: &'a dyn NotificationSink,
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// A clonable handle that can stop a running session from another thread.
/// The session notices at its next suspension point and falls to the
/// nearest terminal failure state, releasing the camera on the way.
#[derive(Clone)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// AuthorizationSession
// ---------------------------------------------------------------------------

/// One single-use run of the authorization pipeline.
///
/// `run` consumes the session; a new authorization needs a new session.
pub struct AuthorizationSession {
    id: Uuid,
    config: SessionConfig,
    state: SessionState,
    cancel: Arc<AtomicBool>,
}

impl AuthorizationSession {
    /// Creates a session in `Idle`.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            config,
            state: SessionState::Idle,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The session's unique id, for log correlation.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// A handle that can cancel this session from outside.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle(Arc::clone(&self.cancel))
    }

    /// Runs the session to a terminal state.
    ///
    /// # Errors
    ///
    /// Fails fast with the capture error if the camera cannot be opened at
    /// all (another session holds it, or the device is gone). That is a
    /// precondition failure, not a session outcome — nothing has been
    /// emitted and no state was consumed.
    pub fn run(mut self, ctx: &SessionContext<'_>) -> Result<SessionOutcome, CaptureError> {
        self.transition(SessionState::Authenticating);
        ctx.narrator.notify("Look at the camera to authorize.");
        let mut camera = ctx.camera.open()?;

        let result = match self.authenticate(ctx, &mut camera) {
            Some(result) => result,
            None => {
                drop(camera);
                return Ok(self.fail(
                    ctx,
                    SessionState::AuthFailed,
                    "Authentication failed.",
                    SessionOutcome::AuthFailed,
                ));
            }
        };
        let identity = result.identity.clone().unwrap_or_default();

        self.transition(SessionState::AuthOk);
        ctx.indicator.indicate(IndicatorEvent::AuthOk);
        ctx.narrator
            .notify(&format!("Welcome, {identity}. Show the payment code."));

        self.transition(SessionState::ScanningCode);
        let request = match self.scan_code(ctx, &mut camera) {
            Some(request) => request,
            None => {
                drop(camera);
                return Ok(self.fail(
                    ctx,
                    SessionState::CodeTimeout,
                    "No payment code received.",
                    SessionOutcome::CodeTimeout,
                ));
            }
        };
        // Capture is over for this session; free the device before the
        // validation and signing work.
        drop(camera);

        self.transition(SessionState::CodeReceived);
        ctx.indicator.indicate(IndicatorEvent::CodeReceived);
        ctx.narrator.notify("Payment code received.");

        self.transition(SessionState::Validating);
        if self.cancelled() {
            return Ok(self.fail(
                ctx,
                SessionState::SignFailed,
                "Session cancelled.",
                SessionOutcome::SignFailed("session cancelled".into()),
            ));
        }
        let valid = match ValidRequest::from_request(&request) {
            Ok(valid) => valid,
            Err(e) => {
                tracing::warn!(session = %self.id, error = %e, "request rejected");
                return Ok(self.fail(
                    ctx,
                    SessionState::Invalid,
                    "Payment request rejected.",
                    SessionOutcome::Invalid(e),
                ));
            }
        };

        self.transition(SessionState::Signing);
        if self.cancelled() {
            return Ok(self.fail(
                ctx,
                SessionState::SignFailed,
                "Session cancelled.",
                SessionOutcome::SignFailed("session cancelled".into()),
            ));
        }
        let anchor = match ctx.ledger.recent_anchor() {
            Ok(anchor) => anchor,
            Err(e) => {
                tracing::error!(session = %self.id, error = %e, "anchor fetch failed");
                return Ok(self.fail(
                    ctx,
                    SessionState::SignFailed,
                    "Could not reach the ledger.",
                    SessionOutcome::SignFailed(e.to_string()),
                ));
            }
        };
        let artifact = match ctx.signer.build_and_sign(&valid, &anchor) {
            Ok(artifact) => artifact,
            Err(e) => {
                tracing::error!(session = %self.id, error = %e, "signing failed");
                return Ok(self.fail(
                    ctx,
                    SessionState::SignFailed,
                    "Signing failed.",
                    SessionOutcome::SignFailed(e.to_string()),
                ));
            }
        };

        let payload = SignedPayload {
            signed_transaction: artifact.encoded.clone(),
            recipient: artifact.recipient.to_base58(),
        };
        let code = match ctx.codec.encode(&payload.to_bytes()) {
            Ok(code) => code,
            Err(e) => {
                tracing::error!(session = %self.id, error = %e, "output render failed");
                return Ok(self.fail(
                    ctx,
                    SessionState::SignFailed,
                    "Could not render the signed code.",
                    SessionOutcome::SignFailed(e.to_string()),
                ));
            }
        };

        self.transition(SessionState::Signed);
        ctx.indicator.indicate(IndicatorEvent::Signed);
        ctx.narrator.notify("Payment authorized and signed.");
        tracing::info!(
            session = %self.id,
            identity = %identity,
            recipient = %artifact.recipient,
            lamports = artifact.lamports,
            "session signed"
        );

        Ok(SessionOutcome::Signed {
            artifact,
            code,
            identity,
        })
    }

    /// Polls frames for an authorized face, up to the attempt budget.
    fn authenticate(
        &mut self,
        ctx: &SessionContext<'_>,
        camera: &mut CameraHandle,
    ) -> Option<MatchResult> {
        for attempt in 1..=self.config.auth_attempts {
            if self.cancelled() {
                tracing::info!(session = %self.id, "cancelled while authenticating");
                return None;
            }
            let frame = match camera.next_frame(self.config.frame_timeout) {
                Ok(frame) => frame,
                Err(CaptureError::CaptureTimeout(_)) => continue,
                Err(e) => {
                    tracing::warn!(session = %self.id, error = %e, "capture failed while authenticating");
                    return None;
                }
            };
            match match_frame(ctx.engine, &frame, ctx.enrollment, &self.config.policy) {
                MatchOutcome::Matched(result) => {
                    tracing::info!(
                        session = %self.id,
                        attempt,
                        identity = result.identity.as_deref().unwrap_or(""),
                        distance = result.distance,
                        "face matched"
                    );
                    return Some(result);
                }
                MatchOutcome::NoMatch { best_distance } => {
                    tracing::trace!(session = %self.id, attempt, ?best_distance, "no match");
                }
                MatchOutcome::NoFace => {}
            }
        }
        None
    }

    /// Polls frames for a structurally valid payment request, up to the
    /// scan budget. Undecodable frames and malformed payloads both count
    /// as "not yet received".
    fn scan_code(
        &mut self,
        ctx: &SessionContext<'_>,
        camera: &mut CameraHandle,
    ) -> Option<TransactionRequest> {
        for attempt in 1..=self.config.scan_attempts {
            if self.cancelled() {
                tracing::info!(session = %self.id, "cancelled while scanning");
                return None;
            }
            let frame = match camera.next_frame(self.config.frame_timeout) {
                Ok(frame) => frame,
                Err(CaptureError::CaptureTimeout(_)) => continue,
                Err(e) => {
                    tracing::warn!(session = %self.id, error = %e, "capture failed while scanning");
                    return None;
                }
            };
            let Some(bytes) = ctx.codec.decode(&frame) else {
                continue;
            };
            match TransactionRequest::parse(&bytes) {
                Ok(request) => {
                    tracing::info!(session = %self.id, attempt, "payment code decoded");
                    return Some(request);
                }
                Err(e) => {
                    tracing::trace!(session = %self.id, attempt, error = %e, "payload not yet valid");
                }
            }
        }
        None
    }

    /// Lands on a terminal failure state, emitting its one indicator event
    /// and one narration.
    fn fail(
        &mut self,
        ctx: &SessionContext<'_>,
        state: SessionState,
        message: &str,
        outcome: SessionOutcome,
    ) -> SessionOutcome {
        self.transition(state);
        ctx.indicator.indicate(IndicatorEvent::AuthFailed);
        ctx.narrator.notify(message);
        outcome
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    fn transition(&mut self, to: SessionState) {
        tracing::debug!(session = %self.id, from = %self.state, to = %to, "state");
        self.state = to;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicU32;
    use std::sync::Mutex;

    use crate::biometric::{EnrollmentRecord, FaceRegion, Template};
    use crate::capture::{CaptureDevice, PixelFormat};
    use crate::config::{ANCHOR_LENGTH, PUBKEY_LENGTH, TEMPLATE_DIM};
    use crate::ledger::{Anchor, LedgerError};
    use crate::transaction::{Pubkey, SignError, WalletKeypair};

    // -- scripted collaborators ---------------------------------------------

    struct ScriptedDevice {
        frames: Mutex<VecDeque<Frame>>,
    }

    impl ScriptedDevice {
        fn with_frames(frames: Vec<Frame>) -> Arc<Self> {
            Arc::new(Self {
                frames: Mutex::new(frames.into()),
            })
        }
    }

    struct ScriptedSource {
        frames: VecDeque<Frame>,
    }

    impl FrameSource for ScriptedSource {
        fn next_frame(&mut self, timeout: Duration) -> Result<Frame, CaptureError> {
            self.frames
                .pop_front()
                .ok_or(CaptureError::CaptureTimeout(timeout))
        }
    }

    impl CaptureDevice for ScriptedDevice {
        fn open(&self) -> Result<Box<dyn FrameSource>, CaptureError> {
            let frames = self.frames.lock().unwrap().drain(..).collect();
            Ok(Box::new(ScriptedSource { frames }))
        }
    }

    /// Engine that sees one face in every frame and embeds it as the
    /// all-zero template.
    struct AlwaysFaceEngine;

    impl FaceEngine for AlwaysFaceEngine {
        fn detect(&self, _frame: &Frame) -> Vec<FaceRegion> {
            vec![FaceRegion {
                x: 0,
                y: 0,
                width: 4,
                height: 4,
            }]
        }

        fn embed(&self, _frame: &Frame, _region: &FaceRegion) -> Template {
            Template::new(vec![0.0; TEMPLATE_DIM]).unwrap()
        }
    }

    /// Engine that never sees a face.
    struct BlindEngine;

    impl FaceEngine for BlindEngine {
        fn detect(&self, _frame: &Frame) -> Vec<FaceRegion> {
            vec![]
        }

        fn embed(&self, _frame: &Frame, _region: &FaceRegion) -> Template {
            unreachable!("blind engine never detects")
        }
    }

    struct FakeLedger {
        fail: bool,
    }

    impl LedgerRpc for FakeLedger {
        fn recent_anchor(&self) -> Result<Anchor, LedgerError> {
            if self.fail {
                Err(LedgerError::AnchorFetchFailed("connection refused".into()))
            } else {
                Ok(Anchor::from_bytes([7u8; ANCHOR_LENGTH]))
            }
        }
    }

    /// Records every invocation; delegates to a real wallet.
    struct SpySigner {
        wallet: WalletKeypair,
        calls: AtomicU32,
    }

    impl SpySigner {
        fn new() -> Self {
            Self {
                wallet: WalletKeypair::from_base58(&bs58::encode([1u8; 32]).into_string())
                    .unwrap(),
                calls: AtomicU32::new(0),
            }
        }

        fn call_count(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl TransactionSigner for SpySigner {
        fn build_and_sign(
            &self,
            request: &ValidRequest,
            anchor: &Anchor,
        ) -> Result<SignedArtifact, SignError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(crate::transaction::builder::build_and_sign(
                request,
                &self.wallet,
                anchor,
            ))
        }
    }

    #[derive(Default)]
    struct CollectingIndicator {
        events: Mutex<Vec<IndicatorEvent>>,
    }

    impl IndicatorSink for CollectingIndicator {
        fn indicate(&self, event: IndicatorEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[derive(Default)]
    struct CollectingNarrator {
        prompts: Mutex<Vec<String>>,
    }

    impl NotificationSink for CollectingNarrator {
        fn notify(&self, message: &str) {
            self.prompts.lock().unwrap().push(message.to_string());
        }
    }

    // -- fixtures -----------------------------------------------------------

    fn enrollment() -> EnrollmentSet {
        let mut values = vec![0.0f32; TEMPLATE_DIM];
        values[0] = 0.2; // 0.2 from the all-zero probe
        EnrollmentSet::new(vec![EnrollmentRecord {
            name: "alice".to_string(),
            template: Template::new(values).unwrap(),
        }])
        .unwrap()
    }

    fn blank_frame() -> Frame {
        Frame::new(16, 16, PixelFormat::Luma8, vec![0u8; 256]).unwrap()
    }

    fn request_frame(recipient: &Pubkey, amount: &str) -> Frame {
        let json = format!(r#"{{"recipient":"{}","amount":{}}}"#, recipient, amount);
        GridCodec::new().encode(json.as_bytes()).unwrap()
    }

    fn config(auth: u32, scan: u32) -> SessionConfig {
        SessionConfig {
            auth_attempts: auth,
            scan_attempts: scan,
            frame_timeout: Duration::from_millis(1),
            ..SessionConfig::default()
        }
    }

    struct Harness {
        camera: ExclusiveCamera,
        enrollment: EnrollmentSet,
        signer: SpySigner,
        indicator: CollectingIndicator,
        narrator: CollectingNarrator,
    }

    impl Harness {
        fn new(frames: Vec<Frame>) -> Self {
            Self {
                camera: ExclusiveCamera::new(ScriptedDevice::with_frames(frames)),
                enrollment: enrollment(),
                signer: SpySigner::new(),
                indicator: CollectingIndicator::default(),
                narrator: CollectingNarrator::default(),
            }
        }

        fn run(&self, engine: &dyn FaceEngine, ledger: &FakeLedger, config: SessionConfig) -> SessionOutcome {
            let ctx = SessionContext {
                camera: &self.camera,
                engine,
                enrollment: &self.enrollment,
                codec: GridCodec::new(),
                signer: &self.signer,
                ledger,
                indicator: &self.indicator,
                narrator: &self.narrator,
            };
            AuthorizationSession::new(config).run(&ctx).unwrap()
        }

        fn events(&self) -> Vec<IndicatorEvent> {
            self.indicator.events.lock().unwrap().clone()
        }
    }

    // -- tests --------------------------------------------------------------

    #[test]
    fn full_session_signs_and_renders() {
        let recipient = Pubkey::from_bytes([9u8; PUBKEY_LENGTH]);
        let harness = Harness::new(vec![blank_frame(), request_frame(&recipient, "1.5")]);

        let outcome = harness.run(&AlwaysFaceEngine, &FakeLedger { fail: false }, config(3, 3));

        match outcome {
            SessionOutcome::Signed {
                artifact, identity, ..
            } => {
                assert_eq!(identity, "alice");
                assert_eq!(artifact.lamports, 1_500_000_000);
                assert_eq!(artifact.recipient, recipient);
            }
            other => panic!("expected signed, got {:?}", other),
        }
        assert_eq!(harness.signer.call_count(), 1);
        assert_eq!(
            harness.events(),
            vec![
                IndicatorEvent::AuthOk,
                IndicatorEvent::CodeReceived,
                IndicatorEvent::Signed
            ]
        );
    }

    #[test]
    fn output_code_round_trips_the_signed_payload() {
        let recipient = Pubkey::from_bytes([9u8; PUBKEY_LENGTH]);
        let harness = Harness::new(vec![blank_frame(), request_frame(&recipient, "0.25")]);

        let outcome = harness.run(&AlwaysFaceEngine, &FakeLedger { fail: false }, config(3, 3));

        let SessionOutcome::Signed { artifact, code, .. } = outcome else {
            panic!("expected signed");
        };
        let bytes = GridCodec::new().decode(&code).expect("output code decodes");
        let payload = SignedPayload::parse(&bytes).unwrap();
        assert_eq!(payload.signed_transaction, artifact.encoded);
        assert_eq!(payload.recipient, recipient.to_base58());
    }

    #[test]
    fn auth_budget_exhaustion_never_signs() {
        let harness = Harness::new(vec![blank_frame(), blank_frame()]);

        let outcome = harness.run(&BlindEngine, &FakeLedger { fail: false }, config(2, 2));

        assert!(matches!(outcome, SessionOutcome::AuthFailed));
        assert_eq!(harness.signer.call_count(), 0);
        assert_eq!(harness.events(), vec![IndicatorEvent::AuthFailed]);
    }

    #[test]
    fn scan_budget_exhaustion_never_signs() {
        // Face matches, but no frame ever carries a code.
        let harness = Harness::new(vec![blank_frame(), blank_frame(), blank_frame()]);

        let outcome = harness.run(&AlwaysFaceEngine, &FakeLedger { fail: false }, config(3, 2));

        assert!(matches!(outcome, SessionOutcome::CodeTimeout));
        assert_eq!(harness.signer.call_count(), 0);
        assert_eq!(
            harness.events(),
            vec![IndicatorEvent::AuthOk, IndicatorEvent::AuthFailed]
        );
    }

    #[test]
    fn malformed_payload_keeps_scanning_until_timeout() {
        // A decodable code whose payload is missing the recipient: "not
        // yet received", so the scan budget runs out.
        let malformed = GridCodec::new().encode(br#"{"amount":1.5}"#).unwrap();
        let harness = Harness::new(vec![blank_frame(), malformed]);

        let outcome = harness.run(&AlwaysFaceEngine, &FakeLedger { fail: false }, config(3, 2));

        assert!(matches!(outcome, SessionOutcome::CodeTimeout));
        assert_eq!(harness.signer.call_count(), 0);
    }

    #[test]
    fn invalid_amount_is_terminal_and_unsigned() {
        let recipient = Pubkey::from_bytes([9u8; PUBKEY_LENGTH]);
        let harness = Harness::new(vec![blank_frame(), request_frame(&recipient, "-2")]);

        let outcome = harness.run(&AlwaysFaceEngine, &FakeLedger { fail: false }, config(3, 3));

        assert!(matches!(
            outcome,
            SessionOutcome::Invalid(RequestError::InvalidAmount { .. })
        ));
        assert_eq!(harness.signer.call_count(), 0);
        // CodeReceived fires (the request was structurally valid), then the
        // failure lamp.
        assert_eq!(
            harness.events(),
            vec![
                IndicatorEvent::AuthOk,
                IndicatorEvent::CodeReceived,
                IndicatorEvent::AuthFailed
            ]
        );
    }

    #[test]
    fn anchor_fetch_failure_is_sign_failed_without_signed_event() {
        let recipient = Pubkey::from_bytes([9u8; PUBKEY_LENGTH]);
        let harness = Harness::new(vec![blank_frame(), request_frame(&recipient, "1.0")]);

        let outcome = harness.run(&AlwaysFaceEngine, &FakeLedger { fail: true }, config(3, 3));

        assert!(matches!(outcome, SessionOutcome::SignFailed(_)));
        assert_eq!(harness.signer.call_count(), 0);
        assert!(!harness.events().contains(&IndicatorEvent::Signed));
    }

    #[test]
    fn busy_camera_fails_fast_before_any_event() {
        let harness = Harness::new(vec![blank_frame()]);
        let _held = harness.camera.open().unwrap();

        let ctx = SessionContext {
            camera: &harness.camera,
            engine: &AlwaysFaceEngine,
            enrollment: &harness.enrollment,
            codec: GridCodec::new(),
            signer: &harness.signer,
            ledger: &FakeLedger { fail: false },
            indicator: &harness.indicator,
            narrator: &harness.narrator,
        };
        let result = AuthorizationSession::new(config(1, 1)).run(&ctx);

        assert!(matches!(result, Err(CaptureError::DeviceBusy)));
        assert!(harness.events().is_empty());
        assert_eq!(harness.signer.call_count(), 0);
    }

    #[test]
    fn camera_is_released_on_every_terminal() {
        let harness = Harness::new(vec![]);

        let outcome = harness.run(&BlindEngine, &FakeLedger { fail: false }, config(1, 1));

        assert!(matches!(outcome, SessionOutcome::AuthFailed));
        assert!(!harness.camera.is_busy());
    }

    #[test]
    fn cancellation_while_authenticating_fails_auth() {
        let harness = Harness::new(vec![blank_frame()]);
        let session = AuthorizationSession::new(config(100, 100));
        session.cancel_handle().cancel();

        let ctx = SessionContext {
            camera: &harness.camera,
            engine: &AlwaysFaceEngine,
            enrollment: &harness.enrollment,
            codec: GridCodec::new(),
            signer: &harness.signer,
            ledger: &FakeLedger { fail: false },
            indicator: &harness.indicator,
            narrator: &harness.narrator,
        };
        let outcome = session.run(&ctx).unwrap();

        assert!(matches!(outcome, SessionOutcome::AuthFailed));
        assert_eq!(harness.signer.call_count(), 0);
        assert!(!harness.camera.is_busy());
    }

    #[test]
    fn every_terminal_emits_exactly_one_narration_beyond_progress() {
        let harness = Harness::new(vec![]);

        let _ = harness.run(&BlindEngine, &FakeLedger { fail: false }, config(1, 1));

        let prompts = harness.narrator.prompts.lock().unwrap();
        // Opening prompt plus exactly one terminal narration.
        assert_eq!(prompts.len(), 2);
        assert_eq!(prompts[1], "Authentication failed.");
    }
}
