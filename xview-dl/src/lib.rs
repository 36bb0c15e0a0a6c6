//! Data preparation blocks for satellite-image object detection.

mod common;

pub mod classes;
pub mod config;
pub mod dataset;
pub mod label;
pub mod processor;
pub mod profiling;
