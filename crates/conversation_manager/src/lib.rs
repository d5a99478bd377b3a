//! conversation_manager - the conversation tree
//!
//! A conversation is a tree of messages with sibling versioning: edits
//! and resends create new siblings under the same parent, and a chain of
//! `active_child` selectors marks the branch currently shown. This crate
//! owns the tree algorithms (`append`, `switch_branch`, `regenerate`,
//! branch walks), the storage collaborator contract, and an in-memory
//! reference store.

pub mod error;
pub mod graph;
pub mod store;
pub mod tree;

pub use error::{StoreError, TreeError};
pub use store::{AppendOp, MemoryStore, Store};
pub use tree::ConversationTree;
