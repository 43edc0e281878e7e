pub mod store;
pub use store::{Collection, Direction, Document, DocumentStore, Query};
pub mod pg_store;
pub use pg_store::PgDocumentStore;
pub mod memory_store;
pub use memory_store::MemoryDocumentStore;
pub mod repository;
pub use repository::{Record, Repository};
pub mod quote_document;
pub mod quote_repo;
pub use quote_repo::QuoteRepository;
