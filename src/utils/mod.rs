use anyhow::Result;
use regex::Regex;
use url::Url;

lazy_static::lazy_static! {
    static ref VIDEO_ID_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?:youtube\.com/watch\?(?:[^#\s]*&)?v=|youtu\.be/)([^&\n?#/]+)").unwrap(),
        Regex::new(r"youtube\.com/embed/([^&\n?#/]+)").unwrap(),
        Regex::new(r"youtube\.com/v/([^&\n?#/]+)").unwrap(),
        Regex::new(r"youtube\.com/shorts/([^&\n?#/]+)").unwrap(),
    ];
}

/// Extract a video id from a watch, short, embed or shorts URL.
/// Anything unrecognized is returned unchanged.
pub fn extract_video_id(input: &str) -> String {
    let input = input.trim();
    VIDEO_ID_PATTERNS
        .iter()
        .find_map(|re| re.captures(input).and_then(|caps| caps.get(1)))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| input.to_string())
}

/// Validate a URL and return normalized version
pub fn validate_and_normalize_url(url: &str) -> Result<String> {
    let parsed = Url::parse(url)
        .map_err(|_| anyhow::anyhow!("Invalid URL format: {}", url))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        anyhow::bail!("URL must use HTTP or HTTPS protocol");
    }

    Ok(parsed.to_string())
}

/// Truncate `text` to at most `max_chars` characters, marking the cut
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }

    let cut: String = trimmed.chars().take(max_chars).collect();
    format!("{}...", cut)
}

/// Display name for a language code, falling back to the code itself
pub fn language_display_name(code: &str) -> String {
    let base = code.split(['-', '_']).next().unwrap_or(code);
    let name = match base.to_lowercase().as_str() {
        "en" => "English",
        "es" => "Spanish",
        "fr" => "French",
        "de" => "German",
        "it" => "Italian",
        "pt" => "Portuguese",
        "ja" => "Japanese",
        "ko" => "Korean",
        "zh" => "Chinese",
        "ar" => "Arabic",
        "hi" => "Hindi",
        "ru" => "Russian",
        _ => return code.to_string(),
    };

    name.to_string()
}
