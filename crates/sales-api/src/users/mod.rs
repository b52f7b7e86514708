//! Users: model, validation and storage.

mod model;
mod store;

pub use model::{NewUser, UpdateUser, User, UserRecord};
pub use store::{MemoryUserStore, StoreError, UserStore};
