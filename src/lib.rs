//! vasop — voice-agent onboarding backend.

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod notify;
pub mod onboarding;
pub mod speech;
pub mod store;
