//! HTTP API handlers for ecowatch-api

pub mod health;
pub mod images;
pub mod root;
pub mod upload;
pub mod users;

pub use health::health_routes;
pub use images::image_routes;
pub use root::root_routes;
pub use upload::upload_routes;
pub use users::user_routes;
