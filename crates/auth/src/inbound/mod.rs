pub mod extractor;
pub mod http;
pub mod model;
pub mod router;
pub mod state;
