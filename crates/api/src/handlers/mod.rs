pub mod exports;
pub mod health;

pub(crate) use super::AppState;
