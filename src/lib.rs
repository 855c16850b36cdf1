pub mod config;
pub mod dtos;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod services;
pub mod startup;

pub use error::AppError;
pub use startup::{AppState, Application};
