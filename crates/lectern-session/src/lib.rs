pub mod manager;
pub mod session;
pub mod store;

pub use manager::SessionManager;
pub use session::Session;
pub use store::{InMemorySessionStore, SessionStore};
