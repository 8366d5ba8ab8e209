//! Source-agnostic aggregation over the ingestion backends: merged session
//! listings, batched summary building, and chunked keyword search that a
//! caller resumes with an explicit cursor.

pub mod batch;
pub mod cursor;
pub mod repository;
pub mod score;
pub mod stats;

pub use batch::build_summaries;
pub use cursor::FileCursor;
pub use repository::{Repository, SearchHit, SearchPage, SessionPage};
pub use score::{normalize_terms, score_text, TermScore};
pub use stats::FileStats;
