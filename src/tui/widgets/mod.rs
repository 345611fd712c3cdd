//! TUI widgets for Giant.

pub mod confirm;
pub mod editor;
pub mod header;
pub mod job_info;
pub mod prompt;
pub mod settings;
pub mod sidebar;
pub mod table;
pub mod tabs;
pub mod toast;
