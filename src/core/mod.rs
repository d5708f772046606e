// src/core/mod.rs

pub mod allocation;
pub mod anticheat;
pub mod scoring;
pub mod session;
