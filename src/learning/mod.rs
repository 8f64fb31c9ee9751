// src/learning/mod.rs

//! Learning flow: scoring, the pre-assessment gate, session progression and
//! certificate eligibility. Handlers pass the store in explicitly.

pub mod certificate;
pub mod gate;
pub mod scoring;
pub mod session;
