pub mod rest;

pub use rest::{bind, create_router, serve};
