// src/models/mod.rs

pub mod admin_log;
pub mod attempt;
pub mod exam_config;
pub mod question;
