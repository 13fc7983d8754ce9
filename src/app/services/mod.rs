//! Core business logic services

pub mod encoder;
pub mod export;
pub mod result_set;
