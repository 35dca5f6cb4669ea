pub mod access_control;
pub mod database;
pub mod memory;
pub mod store;

pub use access_control::{AccessControlEngine, AccessPolicyBuilder, Action, ResourceType};
pub use database::Database;
pub use memory::MemoryStore;
pub use store::{ClassStore, Directory, SessionStore};
