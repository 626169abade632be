use striker_vision::config::PipelineConfig;
use striker_vision::core_modules::blob::Blob;
use striker_vision::pipeline::{FrameBlobs, Message, TrackPhase, VisionPipeline};

fn blob(cx: f64, cy: f64, w: u32, h: u32, density: f64, roundness: f64) -> Blob {
    Blob {
        x: (cx - w as f64 / 2.0) as u32,
        y: (cy - h as f64 / 2.0) as u32,
        w,
        h,
        pixels: ((w * h) as f64 * density) as u32,
        area: w * h,
        cx,
        cy,
        density,
        roundness,
    }
}

fn goal_only_pipeline() -> VisionPipeline {
    let mut config = PipelineConfig::default();
    config.ball.enabled = false;
    VisionPipeline::new(config).expect("valid config")
}

#[test]
fn irregular_ball_candidate_is_never_selected() {
    let mut pipeline = VisionPipeline::new(PipelineConfig::default()).expect("default config is valid");
    let lone = blob(150.0, 100.0, 12, 12, 0.9, 0.55);
    let report = pipeline.process_frame(FrameBlobs::new(0).with_class("ball", vec![lone]));
    assert!(report.detection("ball").is_none());
    assert!(report.messages.is_empty());
    assert_eq!(pipeline.track("ball").map(|t| t.phase()), Some(TrackPhase::Idle));
}

#[test]
fn oversized_highlight_loses_to_the_real_ball() {
    let mut pipeline = VisionPipeline::new(PipelineConfig::default()).expect("default config is valid");
    let highlight = blob(160.0, 120.0, 80, 80, 0.9, 0.95);
    let ball = blob(100.0, 150.0, 14, 14, 0.8, 0.8);
    let report = pipeline.process_frame(FrameBlobs::new(0).with_class("ball", vec![highlight, ball.clone()]));
    assert_eq!(report.detection("ball").map(|d| d.candidate.blob.clone()), Some(ball));
}

#[test]
fn larger_goal_panel_dominates_similar_clutter() {
    let mut pipeline = goal_only_pipeline();
    // Same shape and density; one has three times the area. Square-ish and
    // sparse, so the small one fails the strict admission gate.
    let small = blob(80.0, 120.0, 30, 30, 0.4, 0.0);
    let large = blob(220.0, 120.0, 52, 52, 0.4, 0.0);
    let report = pipeline.process_frame(FrameBlobs::new(0).with_class("blue", vec![small, large.clone()]));
    assert_eq!(report.detection("blue").map(|d| d.candidate.blob.clone()), Some(large));
}

#[test]
fn small_but_goal_shaped_candidate_can_win() {
    let mut pipeline = goal_only_pipeline();
    // Under half the area of the largest blob, but panel-shaped and solid, so
    // it is admitted. The large blob is a thin, sparse streak near the top.
    let panel = blob(160.0, 120.0, 54, 26, 0.9, 0.0);
    let smear = blob(160.0, 20.0, 160, 20, 0.1, 0.0);
    let report = pipeline.process_frame(FrameBlobs::new(0).with_class("yellow", vec![smear, panel.clone()]));
    let detection = report.detection("yellow").expect("a goal is selected");
    assert_eq!(detection.candidate.blob, panel);
}

#[test]
fn velocity_appears_on_second_consecutive_hit() {
    let mut pipeline = VisionPipeline::new(PipelineConfig::default()).expect("default config is valid");

    // Distance 400 / sqrt(100) = 40 cm straight ahead, then 40 cm at a quarter turn.
    let first = pipeline.process_frame(FrameBlobs::new(0).with_class("ball", vec![blob(200.0, 120.0, 10, 10, 0.8, 0.9)]));
    let first = first.detection("ball").expect("ball selected");
    assert!(first.estimate.velocity.is_none());
    assert!((first.estimate.position.x - 40.0).abs() < 1e-9);
    assert!(first.estimate.position.y.abs() < 1e-9);

    let second = pipeline.process_frame(FrameBlobs::new(100).with_class("ball", vec![blob(160.0, 80.0, 10, 10, 0.8, 0.9)]));
    assert_eq!(second.messages.len(), 1);
    let detection = second.detection("ball").expect("ball selected");
    let velocity = detection.estimate.velocity.expect("velocity on second hit");
    assert!((velocity.x + 400.0).abs() < 1e-6);
    assert!((velocity.y - 400.0).abs() < 1e-6);

    let line = second.messages[0].to_string();
    let fields: Vec<&str> = line.split(',').collect();
    assert_eq!(fields.len(), 6);
    assert_eq!(fields[5], detection.confidence.to_string());
}

#[test]
fn duplicate_timestamp_suppresses_ball_line_but_keeps_estimate() {
    let mut pipeline = VisionPipeline::new(PipelineConfig::default()).expect("default config is valid");
    let ball = blob(200.0, 120.0, 10, 10, 0.8, 0.9);
    pipeline.process_frame(FrameBlobs::new(500).with_class("ball", vec![ball.clone()]));
    let report = pipeline.process_frame(FrameBlobs::new(500).with_class("ball", vec![ball]));
    let detection = report.detection("ball").expect("still selected");
    assert!(detection.estimate.velocity.is_none());
    assert!((detection.estimate.distance_cm - 40.0).abs() < 1e-9);
    assert!(report.messages.is_empty());
}

#[test]
fn backwards_timestamp_keeps_the_previous_fix() {
    let mut pipeline = VisionPipeline::new(PipelineConfig::default()).expect("default config is valid");
    let ahead = blob(200.0, 120.0, 10, 10, 0.8, 0.9);
    pipeline.process_frame(FrameBlobs::new(500).with_class("ball", vec![ahead.clone()]));

    // A frame stamped before the last fix yields no velocity and must not
    // become the new differencing baseline.
    let stale = pipeline.process_frame(FrameBlobs::new(400).with_class("ball", vec![blob(160.0, 80.0, 10, 10, 0.8, 0.9)]));
    assert!(stale.detection("ball").expect("selected").estimate.velocity.is_none());
    assert!(stale.messages.is_empty());

    let report = pipeline.process_frame(FrameBlobs::new(600).with_class("ball", vec![ahead]));
    let velocity = report.detection("ball").expect("selected").estimate.velocity.expect("difference against t=500");
    assert!(velocity.x.abs() < 1e-9 && velocity.y.abs() < 1e-9);
    assert_eq!(report.messages.len(), 1);
}

#[test]
fn reacquisition_after_loss_is_a_first_detection() {
    let mut pipeline = VisionPipeline::new(PipelineConfig::default()).expect("default config is valid");
    let ball = blob(200.0, 120.0, 10, 10, 0.8, 0.9);
    pipeline.process_frame(FrameBlobs::new(0).with_class("ball", vec![ball.clone()]));
    for i in 1..=6 {
        pipeline.process_frame(FrameBlobs::new(i * 100));
    }
    assert_eq!(pipeline.track("ball").map(|t| t.confidence()), Some(0));

    let report = pipeline.process_frame(FrameBlobs::new(800).with_class("ball", vec![ball]));
    let detection = report.detection("ball").expect("reacquired");
    assert_eq!(detection.phase_before, TrackPhase::Idle);
    assert!(detection.estimate.velocity.is_none());
}

#[test]
fn coasting_ball_keeps_its_last_fix() {
    let mut pipeline = VisionPipeline::new(PipelineConfig::default()).expect("default config is valid");
    let ball = blob(200.0, 120.0, 10, 10, 0.8, 0.9);
    pipeline.process_frame(FrameBlobs::new(0).with_class("ball", vec![ball.clone()]));
    pipeline.process_frame(FrameBlobs::new(100));
    let report = pipeline.process_frame(FrameBlobs::new(200).with_class("ball", vec![ball]));
    let detection = report.detection("ball").expect("selected");
    assert_eq!(detection.phase_before, TrackPhase::Coasting);
    let velocity = detection.estimate.velocity.expect("difference against the fix before the miss");
    assert!(velocity.x.abs() < 1e-9 && velocity.y.abs() < 1e-9);
}

#[test]
fn frames_decode_from_json_lines() {
    let line = r#"{"timestamp_ms":40,"blobs":{"blue":[{"x":130,"y":105,"w":60,"h":30,"pixels":1500,"area":1800,"cx":160.0,"cy":120.0,"density":0.83}]}}"#;
    let frame: FrameBlobs = serde_json::from_str(line).expect("valid frame");
    let mut pipeline = goal_only_pipeline();
    let report = pipeline.process_frame(frame);
    assert!(matches!(&report.messages[..], [Message::Goal { name, .. }] if name == "blue"));
}
