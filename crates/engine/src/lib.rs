//! Visual DM engine library.
//!
//! Faction services, competing quest groups and inter-faction tension.
//!
//! ## Structure
//!
//! - `entities/` - Faction and faction quest services
//! - `use_cases/` - Competing quest orchestration across entities
//! - `infrastructure/` - External dependency implementations (ports + adapters)
//! - `app` - Application composition

pub mod app;
pub mod entities;
pub mod infrastructure;
pub mod use_cases;

pub use app::App;
