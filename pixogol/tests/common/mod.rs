// Common test utilities for integration tests
#![allow(dead_code)]

use std::io::Cursor;
use std::path::Path;
use std::sync::{Arc, Once};

use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use serde_json::json;
use wiremock::MockServer;

use pixogol::audit::AuditLog;
use pixogol::config::{AuditConfig, LlmConfig, OcrConfig};
use pixogol::llm::LlmProvider;
use pixogol::ocr::OcrProvider;
use pixogol::services::{AnalysisService, RiskAnalyzer};

static INIT: Once = Once::new();

/// Initialize tracing subscriber once for tests
pub fn init_test_logger() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub const OCR_PATH: &str = "/ocr/chat/completions";
pub const LLM_PATH: &str = "/llm/chat/completions";

/// A light page with a dark bar across it, encoded in `format`.
pub fn sample_image(format: ImageFormat) -> Vec<u8> {
    let img = GrayImage::from_fn(160, 80, |x, y| {
        if (20..140).contains(&x) && (30..50).contains(&y) {
            Luma([20])
        } else {
            Luma([235])
        }
    });
    let img = DynamicImage::ImageLuma8(img).to_rgb8();
    let mut out = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut out), format)
        .expect("encode sample image");
    out
}

pub fn sample_png() -> Vec<u8> {
    sample_image(ImageFormat::Png)
}

pub fn completion_body(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1,
        "model": "gpt-4o",
        "choices": [
            {
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": content
                },
                "finish_reason": "stop"
            }
        ],
        "usage": {
            "prompt_tokens": 1,
            "completion_tokens": 1,
            "total_tokens": 2
        }
    })
}

pub fn api_error_body(message: &str, error_type: &str) -> serde_json::Value {
    json!({
        "error": {
            "message": message,
            "type": error_type,
            "param": serde_json::Value::Null,
            "code": serde_json::Value::Null
        }
    })
}

/// A model reply flagging a well-known trademark.
pub fn trademark_reply() -> serde_json::Value {
    json!({
        "overall_risk_level": "HIGH",
        "confidence_score": 0.85,
        "risk_categories": {
            "copyright": {
                "level": "LOW",
                "explanation": "Short slogan, unlikely to be protected by copyright.",
                "identified_elements": [],
                "recommendations": []
            },
            "trademark": {
                "level": "HIGH",
                "explanation": "\"Coca-Cola\" is a registered trademark.",
                "identified_elements": ["Coca-Cola"],
                "recommendations": ["Do not use the mark commercially without a licence."]
            },
            "brand": {
                "level": "MEDIUM",
                "explanation": "References a globally recognised brand.",
                "identified_elements": ["Coca-Cola"],
                "recommendations": ["Avoid implying endorsement."]
            }
        },
        "general_recommendations": ["Consult trademark counsel before publication."],
        "legal_disclaimer": "This is an AI-generated assessment and should not replace professional legal advice."
    })
}

/// OCR through a mocked vision model at `<server>/ocr`.
pub fn vision_ocr_config(server: &MockServer) -> OcrConfig {
    OcrConfig {
        model: "openai/gpt-4o".to_string(),
        api_key: Some("ocr-test-key".to_string()),
        base_url: Some(format!("{}/ocr", server.uri())),
        timeout_secs: 5,
        ..OcrConfig::default()
    }
}

/// Risk model mocked at `<server>/llm`. `api_key: None` simulates a missing key.
pub fn llm_config(server: &MockServer, api_key: Option<&str>) -> LlmConfig {
    LlmConfig {
        api_key: api_key.map(String::from),
        base_url: Some(format!("{}/llm", server.uri())),
        timeout_secs: 5,
        ..LlmConfig::default()
    }
}

pub fn audit_config(dir: &Path) -> AuditConfig {
    AuditConfig {
        log_dir: dir.to_path_buf(),
        write_snapshots: true,
    }
}

pub fn analysis_service(
    ocr: &OcrConfig,
    llm: &LlmConfig,
    audit: &AuditConfig,
) -> AnalysisService {
    let ocr = OcrProvider::new(ocr).expect("ocr provider");
    let risk = RiskAnalyzer::new(LlmProvider::new(llm), llm);
    AnalysisService::new(ocr, risk, Arc::new(AuditLog::new(audit)))
}

/// Non-empty lines of every `.jsonl` file under `dir`.
pub fn audit_lines(dir: &Path) -> Vec<serde_json::Value> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut lines = Vec::new();
    for entry in entries {
        let path = entry.expect("dir entry").path();
        if path.extension().and_then(|e| e.to_str()) != Some("jsonl") {
            continue;
        }
        let contents = std::fs::read_to_string(&path).expect("read audit log");
        for line in contents.lines().filter(|l| !l.is_empty()) {
            lines.push(serde_json::from_str(line).expect("audit line is valid JSON"));
        }
    }
    lines
}

// Re-export commonly used crates for convenience
pub use serial_test::serial;
pub use tempfile;
pub use wiremock;
