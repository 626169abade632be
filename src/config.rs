// THEORY:
// Every constant the source tuned by trial and error lives here: filter bounds,
// scoring weights, distance constants, the grace window and the choice of wire
// grammar. A deployment is one TOML file; anything it leaves out falls back to
// the values observed on the field robots, so an empty file is a valid config.

use crate::core_modules::blob::FrameGeometry;
use crate::core_modules::candidate_filter::FilterConfig;
use crate::core_modules::emitter::{GoalFields, Grammar};
use crate::core_modules::scorer::{RectangleWeights, SphereWeights};
use crate::core_modules::tracker::DEFAULT_GRACE_WINDOW;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Key under which the blob source supplies ball candidates.
pub const BALL_LABEL: &str = "ball";

const DEFAULT_BALL_DISTANCE_CONSTANT: f64 = 400.0;
const DEFAULT_GOAL_DISTANCE_CONSTANT: f64 = 700.0;
const DEFAULT_BALL_DIAMETER_CM: f64 = 4.3;
const DEFAULT_GOAL_SIZE_DIVISOR: f64 = 100.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Consecutive misses tolerated before a track drops to Idle.
    pub grace_window: u32,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            grace_window: DEFAULT_GRACE_WINDOW,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub grammar: Grammar,
    pub goal_fields: GoalFields,
}

/// Ball (sphere policy) settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BallProfile {
    pub enabled: bool,
    pub distance_constant: f64,
    pub diameter_cm: f64,
    pub filter: FilterConfig,
    pub sphere: SphereWeights,
}

impl Default for BallProfile {
    fn default() -> Self {
        Self {
            enabled: true,
            distance_constant: DEFAULT_BALL_DISTANCE_CONSTANT,
            diameter_cm: DEFAULT_BALL_DIAMETER_CM,
            filter: FilterConfig::sphere(),
            sphere: SphereWeights::default(),
        }
    }
}

/// One goal (rectangle policy) class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoalProfile {
    /// Wire name and blob-source key, e.g. "blue".
    pub name: String,
    pub distance_constant: f64,
    /// Divisor in `distance * pixels / divisor` for physical size.
    pub size_divisor: f64,
    pub filter: FilterConfig,
    pub rectangle: RectangleWeights,
}

impl GoalProfile {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }
}

impl Default for GoalProfile {
    fn default() -> Self {
        Self {
            name: String::new(),
            distance_constant: DEFAULT_GOAL_DISTANCE_CONSTANT,
            size_divisor: DEFAULT_GOAL_SIZE_DIVISOR,
            filter: FilterConfig::rectangle(),
            rectangle: RectangleWeights::default(),
        }
    }
}

/// Configuration for the VisionPipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub frame: FrameGeometry,
    pub tracking: TrackingConfig,
    pub output: OutputConfig,
    pub ball: BallProfile,
    pub goals: Vec<GoalProfile>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            frame: FrameGeometry::default(),
            tracking: TrackingConfig::default(),
            output: OutputConfig::default(),
            ball: BallProfile::default(),
            goals: vec![GoalProfile::named("blue"), GoalProfile::named("yellow")],
        }
    }
}

impl PipelineConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame.width == 0 || self.frame.height == 0 {
            return Err(invalid(format!(
                "frame dimensions must be non-zero, got {}x{}",
                self.frame.width, self.frame.height
            )));
        }

        check_positive("ball.distance_constant", self.ball.distance_constant)?;
        check_positive("ball.diameter_cm", self.ball.diameter_cm)?;
        check_sphere(&self.ball.sphere)?;

        let mut seen = HashSet::new();
        for goal in &self.goals {
            check_goal_name(&goal.name)?;
            if !seen.insert(goal.name.as_str()) {
                return Err(invalid(format!("duplicate goal name {:?}", goal.name)));
            }
            check_positive(&format!("{}.distance_constant", goal.name), goal.distance_constant)?;
            check_positive(&format!("{}.size_divisor", goal.name), goal.size_divisor)?;
            check_rectangle(&goal.name, &goal.rectangle)?;
        }
        Ok(())
    }
}

fn invalid(message: String) -> ConfigError {
    ConfigError::Invalid(message)
}

fn check_positive(name: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{name} must be positive and finite, got {value}")))
    }
}

fn check_non_negative(name: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{name} must be non-negative and finite, got {value}")))
    }
}

fn check_sphere(weights: &SphereWeights) -> Result<(), ConfigError> {
    check_non_negative("ball.sphere.roundness_weight", weights.roundness_weight)?;
    check_non_negative("ball.sphere.aspect_weight", weights.aspect_weight)?;
    check_non_negative("ball.sphere.roundness_floor", weights.roundness_floor)
}

fn check_rectangle(name: &str, w: &RectangleWeights) -> Result<(), ConfigError> {
    for (field, value) in [
        ("rect_weight", w.rect_weight),
        ("size_weight", w.size_weight),
        ("density_weight", w.density_weight),
        ("position_weight", w.position_weight),
        ("continuity_bonus", w.continuity_bonus),
        ("continuity_radius_px", w.continuity_radius_px),
        ("small_area_ratio", w.small_area_ratio),
    ] {
        check_non_negative(&format!("{name}.rectangle.{field}"), value)?;
    }
    if w.small_area_ratio > 1.0 {
        return Err(invalid(format!(
            "{name}.rectangle.small_area_ratio must be at most 1, got {}",
            w.small_area_ratio
        )));
    }
    check_positive(&format!("{name}.rectangle.size_reference_area"), w.size_reference_area)?;
    check_positive(&format!("{name}.rectangle.rect_falloff"), w.rect_falloff)?;
    if w.rect_min_aspect > w.rect_max_aspect {
        return Err(invalid(format!(
            "{name}.rectangle aspect range is empty: [{}, {}]",
            w.rect_min_aspect, w.rect_max_aspect
        )));
    }
    Ok(())
}

/// Goal names travel as the first field of a comma-separated line, so they
/// must not be confused with a number, a compact tag or the ball key.
fn check_goal_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(invalid("goal name must not be empty".to_string()));
    }
    if name.contains(',') || name.chars().any(char::is_whitespace) {
        return Err(invalid(format!("goal name {name:?} must not contain commas or whitespace")));
    }
    if name == BALL_LABEL || name == "BALL" || name == "GOAL" {
        return Err(invalid(format!("goal name {name:?} is reserved")));
    }
    if name.parse::<f64>().is_ok() {
        return Err(invalid(format!("goal name {name:?} must not be numeric")));
    }
    Ok(())
}
