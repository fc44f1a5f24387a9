//! Prompt templates for the risk assessment model
//!
//! These templates use basic `format!()` interpolation for type safety.

/// System message framing the model as an intellectual property reviewer.
///
/// Lists what counts as copyright, trademark and brand risk and the four
/// allowed risk levels.
pub fn risk_system_prompt() -> &'static str {
    r#"You are a legal risk assessment expert specializing in intellectual property law.
Analyze the provided text for potential copyright, trademark, and brand risks.

Consider the following risk factors:

COPYRIGHT RISKS:
- Copyrighted text, quotes, or excerpts from books, articles, songs, etc.
- Creative works like poems, stories, or artistic expressions
- Proprietary content from websites, marketing materials, or publications

TRADEMARK RISKS:
- Brand names, product names, or service marks
- Company names and business identifiers
- Slogans, taglines, or marketing phrases
- Logo text or branded terminology

BRAND RISKS:
- References to well-known companies or brands
- Celebrity names or public figures
- Sports teams, leagues, or organizations
- Educational institutions or government entities

Provide a structured JSON response with risk levels (LOW, MEDIUM, HIGH, CRITICAL) and detailed explanations."#
}

/// Generate the user message asking for an assessment of `text`
///
/// # Arguments
/// * `text` - Cleaned OCR output
/// * `filename` - Name of the uploaded image, given to the model as context
///
/// # Example
/// ```
/// use pixogol::llm::prompts::risk_assessment_prompt;
///
/// let prompt = risk_assessment_prompt("JUST DO IT", "poster.png");
/// assert!(prompt.contains("JUST DO IT"));
/// assert!(prompt.contains("\"poster.png\""));
/// ```
pub fn risk_assessment_prompt(text: &str, filename: &str) -> String {
    format!(
        r#"Analyze this text extracted from an image file named "{filename}":

TEXT TO ANALYZE:
{text}

Please provide a comprehensive legal risk assessment in JSON format with the following structure:
{{
    "overall_risk_level": "LOW/MEDIUM/HIGH/CRITICAL",
    "confidence_score": 0.0-1.0,
    "risk_categories": {{
        "copyright": {{
            "level": "LOW/MEDIUM/HIGH/CRITICAL",
            "explanation": "detailed explanation",
            "identified_elements": ["list of specific copyrighted elements found"],
            "recommendations": ["specific actions to take"]
        }},
        "trademark": {{
            "level": "LOW/MEDIUM/HIGH/CRITICAL",
            "explanation": "detailed explanation",
            "identified_elements": ["list of specific trademark elements found"],
            "recommendations": ["specific actions to take"]
        }},
        "brand": {{
            "level": "LOW/MEDIUM/HIGH/CRITICAL",
            "explanation": "detailed explanation",
            "identified_elements": ["list of specific brand elements found"],
            "recommendations": ["specific actions to take"]
        }}
    }},
    "general_recommendations": ["overall recommendations for risk mitigation"],
    "legal_disclaimer": "This is an AI-generated assessment and should not replace professional legal advice."
}}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_names_all_levels_and_categories() {
        let prompt = risk_system_prompt();
        for needle in ["COPYRIGHT", "TRADEMARK", "BRAND", "LOW, MEDIUM, HIGH, CRITICAL"] {
            assert!(prompt.contains(needle), "missing {needle}");
        }
        assert!(prompt.contains("JSON"));
    }

    #[test]
    fn test_assessment_prompt_embeds_text_and_shape() {
        let prompt = risk_assessment_prompt("Coca-Cola\nEnjoy", "can.jpg");
        assert!(prompt.contains("file named \"can.jpg\""));
        assert!(prompt.contains("Coca-Cola\nEnjoy"));
        assert!(prompt.contains("\"overall_risk_level\""));
        assert!(prompt.contains("\"identified_elements\""));
        assert!(prompt.contains("\"legal_disclaimer\""));
    }

    #[test]
    fn test_braces_are_literal() {
        let prompt = risk_assessment_prompt("x", "y.png");
        assert!(prompt.contains("{\n    \"overall_risk_level\""));
        assert!(!prompt.contains("{{"));
    }
}
