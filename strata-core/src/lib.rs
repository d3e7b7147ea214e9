mod as_value;
mod config;
mod connection;
mod driver;
mod entity;
mod error;
mod executor;
mod hydrated;
mod mapper;
mod metadata;
mod proxy;
mod query;
mod query_builder;
mod relations;
mod sql_writer;
mod transaction;
mod unit_of_work;
mod util;
mod value;

pub use ::anyhow::Context as ErrorContext;
pub use as_value::*;
pub use config::*;
pub use connection::*;
pub use driver::*;
pub use entity::*;
pub use error::*;
pub use executor::*;
pub use hydrated::*;
pub use mapper::*;
pub use metadata::*;
pub use proxy::*;
pub use query::*;
pub use query_builder::*;
pub use relations::*;
pub use sql_writer::*;
pub use transaction::*;
pub use unit_of_work::*;
pub use util::*;
pub use value::*;
pub mod stream {
    pub use ::futures::stream::*;
}
pub use ::futures::future;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
