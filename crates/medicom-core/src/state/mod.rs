//! Client-side state containers.
//!
//! Plain reducers over the last server response: no validation beyond
//! what each operation documents, last write wins.

mod auth;
mod cart;
mod products;

pub use auth::*;
pub use cart::*;
pub use products::*;
