// Prompt text sent to the video provider.

use crate::models::preferences::PreferenceConfig;

/// Used when the questionnaire selected no highlight tags.
const NO_HIGHLIGHTS: &str = "overall profile";

/// Builds the natural-language generation prompt from the questionnaire answers
/// and an already-truncated CV excerpt.
pub fn video_prompt(prefs: &PreferenceConfig, cv_excerpt: &str) -> String {
    let highlights = if prefs.highlights.is_empty() {
        NO_HIGHLIGHTS.to_string()
    } else {
        prefs
            .highlights
            .iter()
            .map(|h| h.label())
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!(
        "Create a video CV presentation ({video_type}) for a {job_goal} position.\n\
         Style: {style}, Tone: {tone}.\n\
         Highlight: {highlights}.\n\
         Duration: {duration} seconds.\n\
         CV Content: {cv_excerpt}",
        video_type = prefs.video_type.as_str(),
        job_goal = prefs.job_goal,
        style = prefs.style.as_str(),
        tone = prefs.tone.as_str(),
        duration = prefs.duration.secs(),
    )
}
