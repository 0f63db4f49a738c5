//! Request persistence and the query dialect used by the chat workflow.

mod memory;
pub mod query;

pub use memory::InMemoryRequestStore;
pub use query::{clean_model_query, QueryError, RecordQuery};
