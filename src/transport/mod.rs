//! Remote side of the pipeline: the HTTP client and content-type sniffing.

pub mod detect;
pub mod http;

pub use detect::{detect_content_type, SNIFF_LEN};
pub use http::{BoxStream, Download, HttpClient};
