pub mod routes;

pub use routes::search_routes;
