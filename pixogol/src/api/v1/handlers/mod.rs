pub mod analyses;
pub(crate) mod health;

pub use health::health_check;
