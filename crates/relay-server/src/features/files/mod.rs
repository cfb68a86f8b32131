pub mod routes;

pub use routes::files_routes;
