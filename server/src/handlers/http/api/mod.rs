pub mod csrf_token;
pub mod health;
pub mod products;
