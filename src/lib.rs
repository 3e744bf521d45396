mod database {
    pub mod actions;
    pub mod error;
    pub mod form;
    pub mod memory;
    pub mod postgres;
    pub mod schema;
    pub mod store;
}
mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
pub mod api;
pub mod config;
mod constants;
pub mod state;
pub mod wait;

pub use authentication::*;
pub use constants::*;
pub use database::*;
