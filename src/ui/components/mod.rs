//! Page chrome shared by every console tab.

pub mod layout;
pub mod nav;

pub use layout::Layout;
pub use nav::Nav;
