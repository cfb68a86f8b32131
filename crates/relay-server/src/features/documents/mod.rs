pub mod routes;

pub use routes::documents_routes;
