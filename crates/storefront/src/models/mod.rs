//! Domain models for storefront.

pub mod session;
pub mod user;

pub use session::CurrentUser;
pub use user::User;
