//! Domain models shared by the client and its tests.
//!
//! These types represent validated domain objects. Wire shapes from the REST
//! backend are converted into them before any other logic sees them.

pub mod address;
pub mod cart;
pub mod design;
pub mod user;

pub use address::ShippingAddress;
pub use cart::{Cart, LineItem};
pub use design::Design;
pub use user::User;
