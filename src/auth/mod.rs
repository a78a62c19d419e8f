pub mod routes;

mod helpers;

pub use helpers::{get_user_id, validate_session};
