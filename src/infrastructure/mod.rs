pub mod console;
pub mod driver;
pub mod executor;
pub mod js_executor;
pub mod locator;

#[cfg(test)]
pub(crate) mod test_support;

pub use console::{restore_terminal, Console, Key, TerminalConsole};
pub use driver::{CdpDriver, ElementRef, PageDriver};
pub use executor::{Action, ActionExecutor, Performed};
pub use js_executor::JsExecutor;
pub use locator::{Candidate, LocatorSpec, Predicate};
