// src/models/mod.rs

pub mod actor;
pub mod attempt;
pub mod enrollment;
pub mod progress;
pub mod question;
pub mod submission;
