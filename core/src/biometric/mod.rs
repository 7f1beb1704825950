//! # Biometric Matching
//!
//! Templates, enrollment, and the matching policy that gates every
//! authorization. This is the module that decides who may spend, so the
//! rules are few and written down:
//!
//! - A comparison is a candidate match only if its distance is strictly
//!   below the threshold.
//! - A candidate wins only if the runner-up is at least the margin behind.
//!   Ambiguity — two enrolled identities, or two faces in frame, scoring
//!   within the margin of each other — is a refusal, never a coin flip.
//! - "No face in frame" is an ordinary poll result, not an error. The
//!   session's bounded retry loop decides when patience runs out.
//!
//! ## Architecture
//!
//! ```text
//! template.rs   — Fixed-length feature vectors and their distance metric
//! enrollment.rs — The read-only-after-load enrollment store
//! matcher.rs    — FaceEngine capability trait and the pure matching pass
//! ```
//!
//! The detection/embedding engine is a capability trait: production plugs
//! in a real recognizer, tests plug in scripted engines, and the matching
//! policy in `matcher.rs` stays a pure function either way.

pub mod enrollment;
pub mod matcher;
pub mod template;

pub use enrollment::{EnrollmentError, EnrollmentRecord, EnrollmentSet};
pub use matcher::{match_frame, FaceEngine, FaceRegion, MatchOutcome, MatchPolicy, MatchResult};
pub use template::Template;
