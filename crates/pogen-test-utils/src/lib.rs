pub mod catalog_server;
pub mod sandbox;

pub use catalog_server::{CatalogServer, Page};
pub use sandbox::Sandbox;

/// Normalize line endings so snapshots compare the same on every platform
pub fn normalize_newlines(s: &str) -> String {
    s.replace("\r\n", "\n")
}
