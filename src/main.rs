//! Seasonal NFL pick'em backend: leagues, weekly picks, provider game sync
//! and a grade-and-advance lifecycle.
#![warn(missing_debug_implementations, rust_2018_idioms)]

#[macro_use]
extern crate diesel;

#[macro_use]
extern crate diesel_migrations;

#[macro_use]
extern crate lazy_static;

#[macro_use]
extern crate log;

#[macro_use]
extern crate serde_derive;

use anyhow::Error;
use dotenv::dotenv;

#[macro_use]
mod macros;

mod auth;
mod config;
mod db;
mod errors;
mod games;
mod leagues;
mod lifecycle;
mod picks;
mod schema;
mod scoreboard;
mod server;
mod users;
mod validator;
mod weeks;

#[actix_web::main]
async fn main() -> anyhow::Result<(), Error> {
    init().await?;

    Ok(())
}

async fn init() -> anyhow::Result<(), Error> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    db::migrate(config::Config::database_url())?;

    let pool = db::build_connection_pool(config::Config::database_url())?;

    debug!("launching the actix webserver");
    server::launch(pool).await?;

    Ok(())
}
