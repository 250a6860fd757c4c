#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};

pub const FULL_HEADER: &str = "Product Category,Inventory Level,Supplier,Lead Time,Order Quantity,Sales,Quality Rating,On-Time Delivery Rate,Date,Warehouse/Location,Shipping Cost,Delivery Time,COGS (Cost of Goods Sold)";

/// Header with the supplier column renamed to `Vendor`.
pub const VENDOR_HEADER: &str = "Product Category,Inventory Level,Vendor,Lead Time,Order Quantity,Sales,Quality Rating,On-Time Delivery Rate,Date,Warehouse/Location,Shipping Cost,Delivery Time,COGS (Cost of Goods Sold)";

/// Builds one data row in `FULL_HEADER` order.
pub fn row(category: &str, supplier: &str, date: &str, sales: &str) -> String {
    format!("{category},100,{supplier},4,60,{sales},0.9,95%,{date},North,10,2,90")
}

/// Joins a header and rows into CSV text with a trailing newline.
pub fn csv(header: &str, rows: &[String]) -> String {
    let mut out = String::from(header);
    out.push('\n');
    for row in rows {
        out.push_str(row);
        out.push('\n');
    }
    out
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}
