pub mod loader;
pub mod types;
pub mod utils;

pub use loader::load_sheet;
pub use types::{RawSheet, SheetSource, SheetTable};
