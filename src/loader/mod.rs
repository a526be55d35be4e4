// Loading normalized records into the store, verifying them, and ad-hoc CRUD
pub mod bulk;
pub mod crud;
pub mod verifier;

#[cfg(test)]
mod tests;

pub use bulk::{load_records, LoadSummary};
pub use crud::{CrudSession, LenientExt};
pub use verifier::{verify_collection, verify_documents, VerificationReport};
