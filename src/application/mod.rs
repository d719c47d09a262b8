pub mod calibrator;
pub mod decision_gate;
pub mod indicators;
pub mod pattern_scanner;
pub mod pipeline;
pub mod probability;
pub mod resampler;
pub mod structure_analyzer;
