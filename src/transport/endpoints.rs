//! Endpoint paths for the Gemini API.

/// Base path for models endpoints.
pub const MODELS: &str = "/models";

/// Path for the generateContent endpoint.
///
/// ```
/// use integrations_tutor::transport::endpoints;
///
/// assert_eq!(endpoints::generate_content("gemini-2.5-flash"), "/models/gemini-2.5-flash:generateContent");
/// ```
pub fn generate_content(model: &str) -> String {
    format!("{}/{}:generateContent", MODELS, model)
}

/// Path for the streamGenerateContent endpoint.
///
/// The response body is a JSON array of `GenerateContentResponse` objects
/// delivered incrementally.
pub fn stream_generate_content(model: &str) -> String {
    format!("{}/{}:streamGenerateContent", MODELS, model)
}
