pub mod index;
pub mod ocr;

pub use index::*;
pub use ocr::*;
