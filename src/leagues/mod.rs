pub mod models;
pub mod routes;

pub use models::{League, Member, FINAL_WEEK};
