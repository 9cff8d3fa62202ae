//! Domain models for the medicom storefront.

mod catalog;
mod order;
mod prescription;
mod user;

pub use catalog::*;
pub use order::*;
pub use prescription::*;
pub use user::*;
