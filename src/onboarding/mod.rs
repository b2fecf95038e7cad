//! The onboarding wizard: drafts, autosave, and final submission.

pub mod manager;
pub mod model;
pub mod routes;

pub use manager::OnboardingManager;
