// Adapters layer: concrete implementations for external systems (http, zip, index cache)

pub mod http;
pub mod index;
pub mod zip;

pub use self::http::HttpArchiveFetcher;
pub use self::index::IndexClient;
pub use self::zip::ZipExtractor;
