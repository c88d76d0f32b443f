pub mod summary;

pub use summary::{render_summary, write_summary, SummaryEntry, SummaryInput};
