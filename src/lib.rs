pub mod analysis;
pub mod binder;
pub mod cli;
pub mod driver;
pub mod errors;
pub mod expr;
pub mod layout;
pub mod messages;
pub mod model;
pub mod span;
pub mod store;
pub mod strutils;
pub mod writer;
