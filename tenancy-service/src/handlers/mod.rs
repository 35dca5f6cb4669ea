pub mod auth;
pub mod classes;
pub mod org;
