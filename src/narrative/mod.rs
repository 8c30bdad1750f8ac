//! Narrative engine: deterministic bucket selection, randomized phrasing.

pub mod generator;

pub use generator::NarrativeGenerator;
