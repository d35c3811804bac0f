pub mod commands;
pub mod ui;
pub mod util;

pub use util::{CommandContext, document_path, load_config, persist_outcome, write_document};
