// Worktime API Library
//
// HTTP surface for work session tracking

pub mod http;

// Re-export commonly used types
pub use http::{create_router, AppState};
