//! Database utilities shared across lineup services

pub mod init;

pub use init::init_database;
