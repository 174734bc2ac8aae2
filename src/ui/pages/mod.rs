//! Page components for the Dioxus-based web UI.
//!
//! Each page is a Dioxus component that renders a full page using the Layout component.

pub mod dashboard;
pub mod manual;
pub mod medicine;
pub mod schedule;
pub mod settings;

pub use dashboard::DashboardPage;
pub use manual::ManualPage;
pub use medicine::MedicinePage;
pub use schedule::SchedulePage;
pub use settings::SettingsPage;
