//! Fixed instructions and per-report prompts for the two analysis stages

use ecowatch_common::models::{Report, VerificationResult};
use serde::Serialize;

/// System instruction for the verification stage
pub const VERIFICATION_INSTRUCTION: &str = r#"You are an AI model whose task is to analyze mangrove monitoring data. You will be given user input as a JSON object containing latitude, longitude, a category, and a description, along with an image of the site. Your responsibilities are:
1. Verify whether the provided latitude and longitude falls inside or near a known mangrove region based on your knowledge.
2. Analyze the uploaded image and check if it is consistent with the given category and description.
3. Provide structured output in JSON format with confidence levels.
Return the output in the following format only, without any markdown formatting:
{
 "location_verification": "Location Verified / Not in Mangrove Region / Unclear",
 "location_confidence": "XX%",
 "image_category_verification": "Consistent / Inconsistent / Unclear",
 "category_confidence": "XX%",
 "location_remarks": "Short explanation of reasoning for location verification",
 "category_remarks": "Short explanation of reasoning for category verification"
}
"#;

/// System instruction for the scoring stage
pub const SCORING_INSTRUCTION: &str = r#"You are an AI model that scores citizen reports about mangrove ecosystems for a gamified monitoring app. You will be given a JSON object containing the verification result already produced for a report (location verification, image/category consistency, confidence levels and remarks) together with the report's original description and category. You do not see the image; judge it only through the verification result.
Apply this rubric exactly, using whole numbers:
1. image_score (0 to 50): how well the image matched the category and description. "Consistent" with high category_confidence scores high, "Unclear" scores in the middle, "Inconsistent" scores low.
2. description_score (0 to 20): clarity, specificity and usefulness of the description.
3. category_score (0 to 10): whether the chosen category fits the evidence.
4. geo_score (0 to 10): confidence that the site lies in or near a mangrove region, based on location_verification and location_confidence.
5. bonus (-10 to +10): reward especially valuable reports such as clear evidence of illegal activity, penalize suspected spam or misleading submissions.
total_score must equal image_score + description_score + category_score + geo_score + bonus.
Return the output in the following format only, without any markdown formatting:
{
 "image_score": 0,
 "description_score": 0,
 "category_score": 0,
 "geo_score": 0,
 "bonus": 0,
 "total_score": 0,
 "remarks": "Short explanation of the score"
}
"#;

#[derive(Serialize)]
struct VerificationPrompt<'a> {
    lat: f64,
    lon: f64,
    category: &'a str,
    description: &'a str,
}

#[derive(Serialize)]
struct ScoringPrompt<'a> {
    verification: &'a VerificationResult,
    description: &'a str,
    category: &'a str,
}

/// Inline JSON carrying the report's text fields and coordinates
pub fn verification_prompt(report: &Report) -> Result<String, serde_json::Error> {
    serde_json::to_string(&VerificationPrompt {
        lat: report.latitude,
        lon: report.longitude,
        category: &report.category,
        description: &report.description,
    })
}

/// Inline JSON carrying the verification result and the original text fields
pub fn scoring_prompt(
    verification: &VerificationResult,
    description: &str,
    category: &str,
) -> Result<String, serde_json::Error> {
    serde_json::to_string(&ScoringPrompt {
        verification,
        description,
        category,
    })
}
