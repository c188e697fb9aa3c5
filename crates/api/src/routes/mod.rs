//! Route handlers

pub mod classifier;
pub mod readings;
pub mod samples;
pub mod sensors;
