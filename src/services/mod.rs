pub mod checkpoint_store;
pub mod session_service;

pub use checkpoint_store::CheckpointStore;
pub use session_service::{is_login_url, SessionManager};
