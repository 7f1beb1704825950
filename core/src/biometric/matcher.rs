//! The matching pass: one frame in, one explicit outcome out.
//!
//! [`match_frame`] is a pure function over a frame, an engine, an
//! enrollment set, and a policy. It performs no I/O, retries nothing, and
//! raises nothing for expected conditions — the session's driver loop owns
//! timeout and attempt-count policy, this module owns only the decision.
//!
//! The ambiguity rule deserves a note: the original deployment simply took
//! the single minimum-distance match. We instead require the runner-up to
//! trail the winner by a configured margin, and require a strictly-best
//! region when several faces are in frame. That is a policy choice — the
//! safer, testable interpretation — not an inherited behavior.

use serde::{Deserialize, Serialize};

use crate::capture::Frame;
use crate::config::{DEFAULT_MATCH_MARGIN, DEFAULT_MATCH_THRESHOLD, DOWNSAMPLE_DIVISOR};

use super::enrollment::EnrollmentSet;
use super::template::Template;

// ---------------------------------------------------------------------------
// Engine Capability
// ---------------------------------------------------------------------------

/// A rectangular region of a frame containing a detected face.
///
/// Coordinates are in the downsampled frame the detector actually ran on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceRegion {
    /// Left edge, pixels.
    pub x: u32,
    /// Top edge, pixels.
    pub y: u32,
    /// Region width, pixels.
    pub width: u32,
    /// Region height, pixels.
    pub height: u32,
}

/// Detection and embedding capability.
///
/// Production plugs in a real face recognizer; tests plug in scripted
/// engines. Either way the matching policy below does not change.
pub trait FaceEngine: Send + Sync {
    /// Detects zero or more face regions in a (downsampled) frame.
    fn detect(&self, frame: &Frame) -> Vec<FaceRegion>;

    /// Computes the feature vector for one detected region.
    fn embed(&self, frame: &Frame, region: &FaceRegion) -> Template;
}

// ---------------------------------------------------------------------------
// Policy & Results
// ---------------------------------------------------------------------------

/// The two knobs that decide who gets to spend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchPolicy {
    /// Distances strictly below this are candidate matches. The boundary
    /// itself is a refusal.
    pub threshold: f32,
    /// The runner-up enrollment template within a region must trail the
    /// winner by at least this much. Across regions the rule is
    /// strictly-best, with no margin: a tie between regions is a refusal.
    pub margin: f32,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_MATCH_THRESHOLD,
            margin: DEFAULT_MATCH_MARGIN,
        }
    }
}

/// The per-frame verdict. Derived, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Whether this frame authorizes the session.
    pub matched: bool,
    /// The winning identity, when matched.
    pub identity: Option<String>,
    /// The winning distance (or the best distance seen, when not matched).
    pub distance: f32,
}

/// Explicit poll outcome for one frame. "Not yet" is a value here, not an
/// exception — the caller's retry loop is the only place patience lives.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// Exactly one unambiguous identity cleared the policy.
    Matched(MatchResult),
    /// Faces were present but none cleared the policy (too distant, or
    /// ambiguous within the margin).
    NoMatch {
        /// Best distance observed, if any comparison happened.
        best_distance: Option<f32>,
    },
    /// No face regions detected in this frame.
    NoFace,
}

// ---------------------------------------------------------------------------
// Matching Pass
// ---------------------------------------------------------------------------

/// One candidate: a region whose best enrollment comparison cleared both
/// the threshold and the intra-region margin.
struct Candidate {
    identity: String,
    distance: f32,
}

/// Runs one matching pass over a single frame.
///
/// Steps: downsample by the fixed factor, detect regions, embed each,
/// score each region against every enrollment template, then apply the
/// policy. A region is a candidate only if its best distance is strictly
/// below `policy.threshold` and its runner-up (second-best template)
/// trails by at least `policy.margin`. With several candidate regions,
/// only a strictly-best one is accepted.
pub fn match_frame(
    engine: &dyn FaceEngine,
    frame: &Frame,
    enrollment: &EnrollmentSet,
    policy: &MatchPolicy,
) -> MatchOutcome {
    let small = frame.downsample(DOWNSAMPLE_DIVISOR);
    let regions = engine.detect(&small);
    if regions.is_empty() {
        return MatchOutcome::NoFace;
    }

    let mut candidates: Vec<Candidate> = Vec::new();
    let mut best_seen: Option<f32> = None;

    for region in &regions {
        let probe = engine.embed(&small, region);
        let Some((identity, best, runner_up)) = score_region(&probe, enrollment) else {
            continue;
        };

        best_seen = Some(best_seen.map_or(best, |b| b.min(best)));

        if best < policy.threshold && runner_up - best >= policy.margin {
            candidates.push(Candidate {
                identity,
                distance: best,
            });
        }
    }

    candidates.sort_by(|a, b| a.distance.total_cmp(&b.distance));

    match candidates.as_slice() {
        [] => MatchOutcome::NoMatch {
            best_distance: best_seen,
        },
        [winner] => MatchOutcome::Matched(MatchResult {
            matched: true,
            identity: Some(winner.identity.clone()),
            distance: winner.distance,
        }),
        [winner, runner_up, ..] => {
            if winner.distance < runner_up.distance {
                MatchOutcome::Matched(MatchResult {
                    matched: true,
                    identity: Some(winner.identity.clone()),
                    distance: winner.distance,
                })
            } else {
                // Two regions scored identically. Nobody wins.
                MatchOutcome::NoMatch {
                    best_distance: best_seen,
                }
            }
        }
    }
}

/// Scores one probe against the full enrollment set.
///
/// Returns the winning identity, its distance, and the runner-up distance
/// (`f32::INFINITY` when only one identity is enrolled). `None` if the set
/// is empty.
fn score_region(probe: &Template, enrollment: &EnrollmentSet) -> Option<(String, f32, f32)> {
    let mut best: Option<(String, f32)> = None;
    let mut runner_up = f32::INFINITY;

    for record in enrollment.records() {
        let d = probe.distance(&record.template);
        match &best {
            Some((_, b)) if d >= *b => runner_up = runner_up.min(d),
            _ => {
                if let Some((_, b)) = &best {
                    runner_up = runner_up.min(*b);
                }
                best = Some((record.name.clone(), d));
            }
        }
    }

    best.map(|(name, d)| (name, d, runner_up))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
