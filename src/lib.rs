pub mod client;
pub mod config;
pub mod controller;
pub mod data_models;
pub mod pagination;
pub mod query;
pub mod repl;
pub mod session;
pub mod terminal;
