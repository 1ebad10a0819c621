//! A read-only GraphQL service over a library of authors, books and quotations.
//!
//! The request pipeline is:
//!
//! * [`spec`] parses a query document and normalizes the selected operation,
//! * [`execution`] validates the normalized fields against the [`TypeGraph`]
//!   and resolves them through a [`store::RecordStore`],
//! * [`GraphService`] ties both together and [`axum_factory`] serves it over HTTP.

pub mod axum_factory;
pub mod configuration;
mod executable;
pub mod execution;
pub mod graphql;
mod introspection;
mod json_ext;
pub mod schema;
mod service;
pub mod spec;
pub mod store;

pub use configuration::Configuration;
pub use executable::main;
pub use schema::TypeGraph;
pub use service::GraphService;
