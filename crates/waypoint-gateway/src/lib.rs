//! HTTP front end for the Waypoint resolution engine.

pub mod app;
pub mod client_ip;
pub mod error;
pub mod handlers;
pub mod model;
pub mod state;

pub use app::App;
pub use state::AppState;
