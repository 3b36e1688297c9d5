pub mod document;
pub mod io;
pub mod parsing;
pub mod tree;
pub mod values;

// Re-export key types for easier usage
pub use document::Document;
pub use tree::{Comments, SectionId, SectionTree};
pub use values::ValueError;
