//! CLI Commands

pub mod config;
pub mod db;
pub mod probe;
