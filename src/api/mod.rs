// HTTP surface: country CRUD, refresh trigger, status and summary image

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;
pub mod state;
pub mod validation;


pub use error::ApiError;
pub use server::ApiServer;
pub use state::AppState;
