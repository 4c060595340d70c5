pub mod capture;
pub mod cli;
pub mod config;
pub mod db;
pub mod detail;
pub mod directory;
pub mod error;
pub mod form;
pub mod map;
pub mod models;
pub mod photo;
pub mod session;

pub use db::Database;
pub use error::{Error, Result};
