pub mod csv_loader;
pub mod pdf_loader;

pub use csv_loader::load_csv_records;
pub use pdf_loader::{count_pdfs, find_pdf_by_name, load_pdf_folder};
