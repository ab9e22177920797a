// Core infrastructure modules
pub mod core;

// Configuration
pub mod config;
