// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{load_rules_file, resolve_db_path};

// Re-export capture functionality from sitekeep-core
pub use sitekeep_core::capture::{
    CaptureSummary, SiteCaptureJob, execute_site_capture, generate_capture_report,
};
