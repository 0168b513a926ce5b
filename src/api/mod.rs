pub mod endpoints;
pub mod middleware;
