pub mod routes;

pub use routes::rules_routes;
