pub mod convert;
pub mod handlers;
pub mod links;
pub mod middleware;
pub mod routes;
pub mod users;

pub use routes::create_router;
