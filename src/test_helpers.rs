//! Shared test utilities for the docsite test suite.
//!
//! ```rust,ignore
//! use crate::test_helpers::*;
//!
//! let tmp = setup_project();
//! let manifest = scan(&tmp.path().join("source"), &AssetsConfig::default()).unwrap();
//! let page = find_page(&manifest, "/index.html");
//! assert_eq!(page.title, "Skinny Framework");
//! ```

use std::path::Path;
use tempfile::TempDir;

use crate::scan::{Manifest, Page};

/// Copy `fixtures/site/` to a temp directory and return it.
///
/// Tests get an isolated project (config.toml + source/) they can mutate
/// without affecting other tests or the fixtures.
pub fn setup_project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Find a page by request path. Panics with the available paths on a miss.
pub fn find_page<'a>(manifest: &'a Manifest, request_path: &str) -> &'a Page {
    manifest
        .pages
        .iter()
        .find(|p| p.request_path == request_path)
        .unwrap_or_else(|| {
            let paths: Vec<&str> = manifest
                .pages
                .iter()
                .map(|p| p.request_path.as_str())
                .collect();
            panic!("page '{request_path}' not found. Available: {paths:?}")
        })
}
