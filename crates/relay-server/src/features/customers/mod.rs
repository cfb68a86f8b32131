pub mod commands;
pub mod routes;

pub use commands::ImportCustomersCommand;
pub use routes::customers_routes;
