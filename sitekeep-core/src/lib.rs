pub mod capture;
pub mod data;
pub mod model;

pub use capture::{
    CaptureSummary, SiteCaptureJob, SqliteArchiveSink, execute_site_capture,
    extract_url_path, generate_capture_report,
};
pub use data::Database;
pub use model::{ArchivedPage, BookmarkNode, NodeType};

pub fn print_banner() {
    println!(
        r#"
       _ __       __
  ___ (_) /____  / /_____ ___ ___
 (_-</ / __/ -_) '_/ -_) -_) _ \
/___/_/\__/\__/_/\_\\__/\__/ .__/
                          /_/     v{}
  keep whole sites, not just links
"#,
        env!("CARGO_PKG_VERSION")
    );
}
