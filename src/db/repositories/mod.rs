pub mod actor;
pub mod crud;
pub mod filter;
pub mod movie;
pub mod relations;
pub mod review;
pub mod user;
