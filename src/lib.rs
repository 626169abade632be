// THEORY:
// This file is the main entry point for the `striker_vision` library crate.
// It exposes the `VisionPipeline` and its associated data structures
// (`PipelineConfig`, `FrameBlobs`, `FrameReport`, `Message`) as the high-level
// interface of the engine, while the individual stages live in `core_modules`.
//
// The engine sits between a color-segmentation blob source and a motor
// controller on a serial link. Per frame and per semantic class (the ball and
// each goal) it picks the one blob most likely to be the real object, keeps
// a small amount of track memory for stability, turns the pixel geometry into
// distance, bearing, size and velocity, and formats a line for the controller.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod pipeline;
