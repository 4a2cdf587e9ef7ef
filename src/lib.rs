//! Assemble looping background videos from stock footage.
//!
//! The pipeline searches a stock-footage catalog for clips matching a query,
//! downloads and normalizes the candidates concurrently, repeats the footage
//! if it falls short of the requested duration, concatenates it into one
//! stream and trims the result to the exact target length.

pub mod actors;
pub mod cli;
pub mod config;
pub mod io;
pub mod logging;
pub mod outside;
pub mod pipeline;
pub mod planner;
pub mod progress;
pub mod result;
pub mod types;
