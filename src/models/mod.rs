// src/models/mod.rs

pub mod attempt;
pub mod media;
pub mod question;
pub mod quiz;
pub mod session;
pub mod topic;
pub mod user;
