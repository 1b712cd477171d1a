// src/core/mod.rs — Core iteration engine

pub mod assessor;
pub mod classifier;
pub mod executor;
pub mod orchestrator;
pub mod strategy;
pub mod synthesizer;
pub mod types;
