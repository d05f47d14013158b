use anyhow::Result;

use crate::cli::OutputFormat;
use crate::normalize::TranscriptResult;
use crate::providers::TranscriptListing;
use crate::utils::language_display_name;

/// Render a transcript in the requested format
pub fn format_transcript(result: &TranscriptResult, format: &OutputFormat) -> Result<String> {
    let content = match format {
        OutputFormat::Text => {
            let kind = if result.is_generated { "auto-generated" } else { "manual" };
            format!(
                "Video: {}\nLanguage: {} ({}, {})\nSnippets: {}\nMethod: {}\n\n{}",
                result.video_id,
                language_display_name(&result.language),
                result.language_code,
                kind,
                result.snippet_count,
                result.method,
                result.transcript
            )
        }
        OutputFormat::Json => serde_json::to_string_pretty(result)?,
    };

    Ok(content)
}

/// Print transcript result to console
pub fn print_transcript(result: &TranscriptResult, format: &OutputFormat) -> Result<()> {
    println!("{}", format_transcript(result, format)?);
    Ok(())
}

/// Print available caption tracks to console
pub fn print_listings(video_id: &str, listings: &[TranscriptListing]) {
    println!("Transcripts for {}:", video_id);
    for listing in listings {
        println!(
            "  • {} [{}]{}{}",
            listing.language,
            listing.language_code,
            if listing.is_generated { " auto-generated" } else { "" },
            if listing.is_translatable { " translatable" } else { "" }
        );
    }
}
