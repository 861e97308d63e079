pub mod auth;
pub mod diagnosis;
pub mod doctors;
pub mod health;
pub mod reports;
