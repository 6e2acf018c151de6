pub mod repository;
pub mod source;
pub mod sqlite;
