pub const APP_NAME: &str = "nuvai";

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_MAX_BYTES: u64 = 1024 * 1024;

pub const SCAN_PATH: &str = "/scan";
pub const UPLOAD_FIELD: &str = "file";

/// Lowercase, without the leading dot.
pub const ALLOWED_EXTENSIONS: &[&str] = &["py", "js", "jsx", "html", "php", "ts", "cpp"];

pub const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "text/plain",
    "text/html",
    "text/x-python",
    "text/javascript",
    "application/javascript",
    "text/jsx",
    "application/typescript",
    "application/x-php",
    "application/json",
    "text/x-c++src",
];

pub const EXPORT_FILE_STEM: &str = "nuvai_scan_results";

pub const DIAGNOSTIC_SLOT_KEY: &str = "nuvai_last_error";
pub const DIAGNOSTIC_KIND: &str = "render_fault";

pub const HOME_ROUTE: &str = "/";
