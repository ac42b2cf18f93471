// Adapters layer: concrete auth/store backends behind the domain ports.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreBackend;
pub use memory::MemoryStore;
