pub mod csv_export;
pub mod markdown;

pub use markdown::MarkdownCompiler;
