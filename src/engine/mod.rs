// src/engine/mod.rs

pub mod assessment;
pub mod gate;
pub mod session;
