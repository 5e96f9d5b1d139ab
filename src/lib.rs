//! Subweave - subtitle pipeline for Matroska libraries
//!
//! Renames media with FileBot, extracts subtitle tracks with MKVToolNix,
//! cleans them, machine-translates them and muxes the translations back
//! into the containers.

pub mod clean;
pub mod cli;
pub mod config;
pub mod error;
pub mod language;
pub mod media;
pub mod report;
pub mod subtitle;
pub mod translate;
pub mod workflow;
