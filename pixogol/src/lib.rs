pub mod api;
pub mod audit;
pub mod config;
pub mod error;
pub mod llm;
pub mod models;
pub mod ocr;
pub mod services;
