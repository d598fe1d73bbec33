pub mod launcher;

pub use launcher::{launch_driver, launch_persistent_browser};
