// THEORY:
// The `pipeline` module is the top-level API for the engine. It wires the
// per-class stages together and owns all of the state that survives between
// frames, so callers only ever deal with one object.
//
// One pass per frame, once per semantic class:
//   filter -> score -> select -> estimate -> track -> message
//
// Key architectural principles:
// 1.  **Tagged Classes**: each tracked class is a `TargetClass` variant that
//     carries its own calibration and scoring policy. The variant is matched
//     once per class per frame; the stages below it never ask "is this a goal".
// 2.  **Owned Track State**: every class has exactly one `TrackState`, built
//     when the pipeline is built and mutated only inside `process_frame`.
//     There are no globals; two pipelines never share memory.
// 3.  **Silent Degradation**: nothing in a frame pass can fail. An empty or
//     fully rejected candidate list is a miss, the tracker records it, and the
//     class simply produces no message for that frame.

use crate::config::{BallProfile, GoalProfile, OutputConfig, BALL_LABEL};
use crate::error::ConfigError;
use crate::core_modules::blob::{Blob, FrameGeometry};
use crate::core_modules::candidate_filter::{filter_candidates, FilterConfig};
use crate::core_modules::kinematics::{self, Calibration, SizeModel};
use crate::core_modules::scorer::{score_rectangles, score_spheres};
use crate::core_modules::selector::select_best;
use crate::core_modules::tracker::TrackState;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

// Re-export key data structures for the public API.
pub use crate::config::PipelineConfig;
pub use crate::core_modules::emitter::Message;
pub use crate::core_modules::goal_zone::GoalZone;
pub use crate::core_modules::kinematics::Estimate;
pub use crate::core_modules::scorer::ScoredCandidate;
pub use crate::core_modules::tracker::TrackPhase;

/// A semantic class and everything needed to process it.
#[derive(Debug, Clone)]
pub enum TargetClass {
    Ball(BallProfile),
    Goal(GoalProfile),
}

impl TargetClass {
    /// Blob-source key and log label.
    pub fn label(&self) -> &str {
        match self {
            TargetClass::Ball(_) => BALL_LABEL,
            TargetClass::Goal(profile) => &profile.name,
        }
    }

    fn filter(&self) -> &FilterConfig {
        match self {
            TargetClass::Ball(profile) => &profile.filter,
            TargetClass::Goal(profile) => &profile.filter,
        }
    }

    fn calibration(&self) -> Calibration {
        match self {
            TargetClass::Ball(profile) => Calibration {
                distance_constant: profile.distance_constant,
                size: SizeModel::Fixed {
                    diameter_cm: profile.diameter_cm,
                },
                track_velocity: true,
            },
            TargetClass::Goal(profile) => Calibration {
                distance_constant: profile.distance_constant,
                size: SizeModel::Proportional {
                    divisor: profile.size_divisor,
                },
                track_velocity: false,
            },
        }
    }
}

/// One frame of blob-source output: a timestamp and, per class key, the
/// candidate blobs in the order they were found.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameBlobs {
    /// Wall-clock time of capture, in milliseconds since any fixed origin.
    pub timestamp_ms: u64,
    #[serde(default)]
    pub blobs: HashMap<String, Vec<Blob>>,
}

impl FrameBlobs {
    pub fn new(timestamp_ms: u64) -> Self {
        Self {
            timestamp_ms,
            blobs: HashMap::new(),
        }
    }

    pub fn with_class(mut self, label: &str, blobs: Vec<Blob>) -> Self {
        self.blobs.insert(label.to_string(), blobs);
        self
    }
}

/// The decision made for one class in one frame.
#[derive(Debug, Clone, Serialize)]
pub struct Detection {
    pub label: String,
    pub candidate: ScoredCandidate,
    pub estimate: Estimate,
    /// Track confidence after this hit, 0..=100.
    pub confidence: u8,
    /// Track phase before this hit; `Idle` marks a fresh acquisition.
    pub phase_before: TrackPhase,
    /// Horizontal zone, goals only.
    pub zone: Option<GoalZone>,
}

/// The primary output of the vision pipeline for a single frame.
#[derive(Debug, Clone, Default)]
pub struct FrameReport {
    pub frame_index: u64,
    pub detections: Vec<Detection>,
    /// Lines to send, in class order.
    pub messages: Vec<Message>,
    /// Classes whose track dropped to Idle this frame.
    pub lost: Vec<String>,
}

impl FrameReport {
    pub fn detection(&self, label: &str) -> Option<&Detection> {
        self.detections.iter().find(|d| d.label == label)
    }
}

struct ClassChannel {
    class: TargetClass,
    track: TrackState,
}

/// The main, top-level struct for the engine.
pub struct VisionPipeline {
    frame: FrameGeometry,
    output: OutputConfig,
    channels: Vec<ClassChannel>,
    frame_count: u64,
}

impl VisionPipeline {
    /// Builds one track per configured class.
    ///
    /// The config is validated first: goal names key the blob map, so a
    /// duplicate would leave its second channel permanently empty.
    pub fn new(config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let grace_window = config.tracking.grace_window;
        let mut classes = Vec::with_capacity(config.goals.len() + 1);
        if config.ball.enabled {
            classes.push(TargetClass::Ball(config.ball));
        }
        classes.extend(config.goals.into_iter().map(TargetClass::Goal));

        let channels = classes
            .into_iter()
            .map(|class| ClassChannel {
                class,
                track: TrackState::new(grace_window),
            })
            .collect();

        Ok(Self {
            frame: config.frame,
            output: config.output,
            channels,
            frame_count: 0,
        })
    }

    /// Runs every class through one frame.
    pub fn process_frame(&mut self, mut frame_blobs: FrameBlobs) -> FrameReport {
        self.frame_count += 1;
        let at = Duration::from_millis(frame_blobs.timestamp_ms);
        let mut report = FrameReport {
            frame_index: self.frame_count,
            ..FrameReport::default()
        };

        for channel in &mut self.channels {
            let blobs = frame_blobs.blobs.remove(channel.class.label()).unwrap_or_default();
            match process_class(channel, blobs, &self.frame, at) {
                ClassOutcome::Hit(detection) => {
                    if let Some(message) = compose_message(&channel.class, &detection, &self.output) {
                        report.messages.push(message);
                    }
                    report.detections.push(detection);
                }
                ClassOutcome::Lost => report.lost.push(channel.class.label().to_string()),
                ClassOutcome::Miss => {}
            }
        }

        report
    }

    /// Track state for a class, by label.
    pub fn track(&self, label: &str) -> Option<&TrackState> {
        self.channels
            .iter()
            .find(|c| c.class.label() == label)
            .map(|c| &c.track)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.channels.iter().map(|c| c.class.label())
    }

    pub fn frame_geometry(&self) -> FrameGeometry {
        self.frame
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

enum ClassOutcome {
    Hit(Detection),
    Miss,
    Lost,
}

fn process_class(channel: &mut ClassChannel, blobs: Vec<Blob>, frame: &FrameGeometry, at: Duration) -> ClassOutcome {
    let class = &channel.class;
    let track = &mut channel.track;
    let label = class.label();

    // --- 1. Filtering ---
    let candidates = filter_candidates(blobs, frame, class.filter());

    // --- 2. Scoring ---
    let scored = match class {
        TargetClass::Ball(profile) => score_spheres(&candidates, &profile.sphere),
        TargetClass::Goal(profile) => score_rectangles(&candidates, &profile.rectangle, frame, track.last_selection()),
    };

    // --- 3. Selection & Estimation ---
    let selected = select_best(scored).and_then(|best| {
        kinematics::estimate(&best.blob, frame, &class.calibration(), track.last_fix(), at)
            .map(|estimate| (best, estimate))
    });

    // --- 4. Tracking ---
    let Some((candidate, estimate)) = selected else {
        if track.record_miss() {
            log::info!("{label}: track lost after {} missed frames", track.misses());
            return ClassOutcome::Lost;
        }
        return ClassOutcome::Miss;
    };

    let phase_before = track.record_hit(&candidate, estimate.position, at);
    if phase_before == TrackPhase::Idle {
        log::info!(
            "{label}: acquired at ({:.0}, {:.0}), score {:.2}",
            candidate.blob.cx,
            candidate.blob.cy,
            candidate.score
        );
    }
    log::debug!(
        "{label}: selected ({:.0}, {:.0}) score {:.3} {:?} -> {:.1} cm @ {:.3} rad",
        candidate.blob.cx,
        candidate.blob.cy,
        candidate.score,
        candidate.parts,
        estimate.distance_cm,
        estimate.theta
    );

    let zone = match class {
        TargetClass::Goal(_) => Some(GoalZone::classify(candidate.blob.cx, frame)),
        TargetClass::Ball(_) => None,
    };

    ClassOutcome::Hit(Detection {
        label: label.to_string(),
        candidate,
        estimate,
        confidence: track.confidence(),
        phase_before,
        zone,
    })
}

fn compose_message(class: &TargetClass, detection: &Detection, output: &OutputConfig) -> Option<Message> {
    let pixels = detection.candidate.blob.pixels;
    match class {
        TargetClass::Ball(_) => Message::ball(output.grammar, &detection.estimate, detection.confidence, pixels),
        TargetClass::Goal(profile) => Some(Message::goal(
            output.grammar,
            output.goal_fields,
            &profile.name,
            &detection.estimate,
            detection.confidence,
            pixels,
        )),
    }
}
