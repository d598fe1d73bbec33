pub mod checkpoint;
pub mod loaders;
pub mod work_item;

pub use checkpoint::{folder_key, CheckpointMap, CheckpointRecord, ItemOutcome};
pub use loaders::{count_pdfs, find_pdf_by_name, load_csv_records, load_pdf_folder};
pub use work_item::{derive_display_name, ItemPayload, WorkItem};
