//! OCR (Optical Character Recognition) Module
//!
//! Pulls the text out of an uploaded image before it is assessed.
//!
//! # Backends
//!
//! `OcrProvider` selects one backend from `OcrConfig::model`:
//! - `local/tesseract` runs Tesseract through leptess on a binarized
//!   grayscale copy of the image (blur, Otsu threshold, morphological close)
//! - `openai/<model>` and `mistral/<model>` send a colour PNG to a hosted
//!   vision model
//!
//! A backend that cannot start leaves the provider unavailable. Calls then
//! fail with `PixogolError::OcrUnavailable` instead of the process refusing
//! to boot.
//!
//! Whatever the backend returns goes through `clean_extracted_text`, so the
//! rest of the pipeline only ever sees single-spaced text.
//!
//! # Usage
//!
//! ```rust,ignore
//! let ocr = OcrProvider::new(&config.ocr)?;
//! let output = ocr.extract_text(&upload.bytes).await?;
//! ```

mod api;
mod preprocessing;
mod provider;
mod text;

pub use preprocessing::{normalize_image, preprocess_image};
pub use provider::OcrProvider;
pub use text::clean_extracted_text;
