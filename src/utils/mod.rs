//! Terminal logging and external command helpers.

pub mod exec;
pub mod log;
