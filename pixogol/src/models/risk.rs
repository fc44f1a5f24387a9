use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_LEGAL_DISCLAIMER: &str =
    "This is an AI-generated assessment and should not replace professional legal advice.";

const MISSING_CATEGORY_EXPLANATION: &str = "No specific risks identified in this category.";
const MISSING_EXPLANATION: &str = "No detailed analysis available.";

/// Severity label attached to the overall assessment and to each category.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, utoipa::ToSchema,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }

    /// Traffic-light marker used in terminal output.
    pub fn indicator(&self) -> &'static str {
        match self {
            Self::Low => "🟢",
            Self::Medium => "🟡",
            Self::High | Self::Critical => "🔴",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            "CRITICAL" => Ok(Self::Critical),
            _ => Err(format!("Unknown risk level: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RiskCategory {
    Copyright,
    Trademark,
    Brand,
}

impl RiskCategory {
    pub const ALL: [RiskCategory; 3] = [Self::Copyright, Self::Trademark, Self::Brand];

    /// Key used in the model reply and in the audit record.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Copyright => "copyright",
            Self::Trademark => "trademark",
            Self::Brand => "brand",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Copyright => "Copyright",
            Self::Trademark => "Trademark",
            Self::Brand => "Brand",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CategoryAssessment {
    pub level: RiskLevel,
    pub explanation: String,
    pub identified_elements: Vec<String>,
    pub recommendations: Vec<String>,
}

impl CategoryAssessment {
    fn missing() -> Self {
        Self {
            level: RiskLevel::Low,
            explanation: MISSING_CATEGORY_EXPLANATION.to_string(),
            identified_elements: Vec::new(),
            recommendations: vec!["Continue monitoring for potential risks.".to_string()],
        }
    }

    fn from_reply(value: &Value) -> Self {
        let level = value
            .get("level")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or(RiskLevel::Low);

        let explanation = value
            .get("explanation")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| MISSING_EXPLANATION.to_string());

        let identified_elements = string_list(value.get("identified_elements")).unwrap_or_default();

        let recommendations = string_list(value.get("recommendations"))
            .unwrap_or_else(|| vec!["Consult with legal counsel if needed.".to_string()]);

        Self {
            level,
            explanation,
            identified_elements,
            recommendations,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RiskCategories {
    pub copyright: CategoryAssessment,
    pub trademark: CategoryAssessment,
    pub brand: CategoryAssessment,
}

impl RiskCategories {
    pub fn get(&self, category: RiskCategory) -> &CategoryAssessment {
        match category {
            RiskCategory::Copyright => &self.copyright,
            RiskCategory::Trademark => &self.trademark,
            RiskCategory::Brand => &self.brand,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (RiskCategory, &CategoryAssessment)> {
        RiskCategory::ALL.into_iter().map(move |c| (c, self.get(c)))
    }
}

/// Structured copyright/trademark/brand assessment of the text found in an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RiskAssessment {
    pub overall_risk_level: RiskLevel,
    /// Model's self-reported confidence in `[0, 1]`.
    pub confidence_score: f64,
    pub risk_categories: RiskCategories,
    pub general_recommendations: Vec<String>,
    pub legal_disclaimer: String,
    /// Set when the image contained no text and the model was not consulted.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub no_text_detected: bool,
}

impl RiskAssessment {
    /// Normalise a model reply into the fixed assessment shape.
    ///
    /// The model is asked for a specific JSON layout but nothing forces it to
    /// comply, so every field is checked and replaced with a conservative
    /// default when missing or out of range:
    /// - unknown overall level becomes `MEDIUM`, unknown category level `LOW`
    /// - a confidence outside `[0, 1]` (or not a number) becomes `0.5`
    /// - missing categories, lists and texts get fixed placeholder content
    pub fn from_model_reply(reply: &Value) -> Self {
        let overall_risk_level = reply
            .get("overall_risk_level")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or(RiskLevel::Medium);

        let confidence_score = reply
            .get("confidence_score")
            .and_then(Value::as_f64)
            .filter(|c| (0.0..=1.0).contains(c))
            .unwrap_or(0.5);

        let categories = reply.get("risk_categories").and_then(Value::as_object);
        let category = |c: RiskCategory| {
            categories
                .and_then(|map| map.get(c.key()))
                .filter(|v| v.is_object())
                .map(CategoryAssessment::from_reply)
                .unwrap_or_else(CategoryAssessment::missing)
        };

        let general_recommendations = string_list(reply.get("general_recommendations"))
            .unwrap_or_else(|| {
                vec![
                    "Review content carefully before publication or use.".to_string(),
                    "Consider consulting with intellectual property counsel for high-risk content."
                        .to_string(),
                    "Maintain documentation of content sources and permissions.".to_string(),
                ]
            });

        let legal_disclaimer = reply
            .get("legal_disclaimer")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| DEFAULT_LEGAL_DISCLAIMER.to_string());

        Self {
            overall_risk_level,
            confidence_score,
            risk_categories: RiskCategories {
                copyright: category(RiskCategory::Copyright),
                trademark: category(RiskCategory::Trademark),
                brand: category(RiskCategory::Brand),
            },
            general_recommendations,
            legal_disclaimer,
            no_text_detected: false,
        }
    }

    /// Assessment for an image in which OCR found no text.
    pub fn no_text_found() -> Self {
        let category = |c: RiskCategory| CategoryAssessment {
            level: RiskLevel::Low,
            explanation: format!(
                "No text was found in the image, so no {} elements could be identified from text.",
                c.key()
            ),
            identified_elements: Vec::new(),
            recommendations: vec![
                "Review visual elements such as logos, characters and artwork manually."
                    .to_string(),
            ],
        };

        Self {
            overall_risk_level: RiskLevel::Low,
            confidence_score: 0.5,
            risk_categories: RiskCategories {
                copyright: category(RiskCategory::Copyright),
                trademark: category(RiskCategory::Trademark),
                brand: category(RiskCategory::Brand),
            },
            general_recommendations: vec![
                "No text found in the image; the assessment covers text only.".to_string(),
                "Check the image for logos, mascots or other visual trademarks before use."
                    .to_string(),
            ],
            legal_disclaimer: DEFAULT_LEGAL_DISCLAIMER.to_string(),
            no_text_detected: true,
        }
    }

    /// Human-readable rendering for terminals and plain-text reports.
    pub fn summary_text(&self) -> String {
        let mut summary = format!(
            "{} Overall Risk Level: {} (Confidence: {:.1}%)\n\n",
            self.overall_risk_level.indicator(),
            self.overall_risk_level,
            self.confidence_score * 100.0
        );

        for (category, details) in self.risk_categories.iter() {
            summary.push_str(&format!(
                "{} Risk: {}\n{}\n",
                category.title(),
                details.level,
                details.explanation
            ));
            if !details.identified_elements.is_empty() {
                summary.push_str(&format!(
                    "Identified elements: {}\n",
                    details.identified_elements.join(", ")
                ));
            }
            summary.push('\n');
        }

        if !self.general_recommendations.is_empty() {
            summary.push_str("Recommendations:\n");
            for (i, rec) in self.general_recommendations.iter().enumerate() {
                summary.push_str(&format!("{}. {}\n", i + 1, rec));
            }
        }

        summary
    }
}

/// Strings from a JSON array; `None` when the value is absent or not an array.
fn string_list(value: Option<&Value>) -> Option<Vec<String>> {
    let items = value?.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
    )
}
