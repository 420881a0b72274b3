//! Client authentication.

mod middleware;

pub use middleware::{authorize_token, AuthUser};
