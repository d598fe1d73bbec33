pub mod command;
pub mod dispatcher;
pub mod menu;

pub use command::{Command, CommandParser, Library, Parsed, Prefix};
pub use dispatcher::{Control, Dispatcher, CSV_BATCH_ID};
