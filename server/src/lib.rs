pub mod handlers;
pub mod security;
pub mod state;
pub mod store;
pub mod tower_middle;

pub use state::AppState;
