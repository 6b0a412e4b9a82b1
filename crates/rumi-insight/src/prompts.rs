//! Prompt templates for the seven analyses.

use rumi_models::AnalysisType;

/// The six blocks every analysis response must contain.
pub const CANONICAL_BLOCKS: [&str; 6] =
    ["CoreMetrics", "Dynamics", "Interactions", "KeyEvents", "Patterns", "Quality"];

/// Analysis-specific focus instructions.
pub fn template(analysis: AnalysisType) -> &'static str {
    match analysis {
        AnalysisType::CreativeDensity => {
            "Analyze the creative density and visual complexity of this TikTok video.\n\
             Focus on:\n\
             1. Text overlay frequency and positioning\n\
             2. Visual effects and transitions\n\
             3. Information density over time\n\
             4. Creative element patterns\n\n\
             Provide insights on how the creative elements contribute to viewer engagement."
        }
        AnalysisType::EmotionalJourney => {
            "Analyze the emotional journey and narrative arc of this TikTok video.\n\
             Focus on:\n\
             1. Emotional progression throughout the video\n\
             2. Key emotional peaks and valleys\n\
             3. How visuals, speech, and music create emotional impact\n\
             4. Viewer emotional engagement patterns\n\n\
             Provide insights on the emotional storytelling techniques used."
        }
        AnalysisType::PersonFraming => {
            "Analyze the person framing and human presence in this TikTok video.\n\
             Focus on:\n\
             1. Screen time and positioning\n\
             2. Eye contact and engagement\n\
             3. Body language and gestures\n\
             4. Person-to-content balance\n\n\
             Provide insights on how human presence affects viewer connection."
        }
        AnalysisType::ScenePacing => {
            "Analyze the scene pacing and visual rhythm of this TikTok video.\n\
             Focus on:\n\
             1. Cut frequency and timing\n\
             2. Scene duration patterns\n\
             3. Visual flow and transitions\n\
             4. Pacing impact on retention\n\n\
             Provide insights on the video's editing rhythm and viewer attention management."
        }
        AnalysisType::SpeechAnalysis => {
            "Analyze the speech patterns and verbal content of this TikTok video.\n\
             Focus on:\n\
             1. Speaking pace and rhythm\n\
             2. Key topics and themes\n\
             3. Verbal hooks and memorable phrases\n\
             4. Speech-to-action synchronization\n\n\
             Provide insights on how speech contributes to the video's effectiveness."
        }
        AnalysisType::VisualOverlay => {
            "Analyze the visual overlay strategy and text placement in this TikTok video.\n\
             Focus on:\n\
             1. Text timing and duration\n\
             2. Visual hierarchy and readability\n\
             3. Text-to-action coordination\n\
             4. Information delivery patterns\n\n\
             Provide insights on the visual communication strategy."
        }
        AnalysisType::MetadataAnalysis => {
            "Analyze how the video's metadata (caption, hashtags) aligns with its content.\n\
             Focus on:\n\
             1. Hashtag relevance to content\n\
             2. Caption effectiveness\n\
             3. SEO optimization\n\
             4. Discoverability factors\n\n\
             Provide insights on metadata optimization opportunities."
        }
    }
}

/// The response-format contract appended to every prompt.
pub fn output_contract() -> String {
    format!(
        "IMPORTANT: You must strictly follow this output format.\n\
         Return ONLY a single JSON object with exactly these six blocks:\n\
         {}\n\
         Each block must be a JSON object and must contain a numeric \"confidence\" field between 0 and 1.\n\
         Return ONLY the JSON object and nothing else.",
        CANONICAL_BLOCKS.join(", ")
    )
}

/// Assemble the full prompt: context data, then the analysis request, then
/// the output contract.
pub fn build_prompt(analysis: AnalysisType, context_json: &str) -> String {
    format!(
        "CONTEXT DATA:\n{}\n\nANALYSIS REQUEST:\n{}\n\n{}",
        context_json,
        template(analysis),
        output_contract()
    )
}
