use serde::{Deserialize, Serialize, Serializer};

use crate::providers::ProviderKind;

/// Canonical, provider-independent transcript
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TranscriptResult {
    pub video_id: String,

    /// Fragment texts joined by single spaces, in provider order
    pub transcript: String,

    /// Display name of the language
    pub language: String,

    pub language_code: String,

    /// Auto-generated captions rather than human-authored ones
    pub is_generated: bool,

    /// Number of fragments joined into `transcript`
    pub snippet_count: usize,

    pub method: ProviderKind,
}

impl Serialize for TranscriptResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Body<'a> {
            success: bool,
            video_id: &'a str,
            transcript: &'a str,
            language: &'a str,
            language_code: &'a str,
            is_generated: bool,
            snippet_count: usize,
            method: ProviderKind,
        }

        Body {
            success: true,
            video_id: &self.video_id,
            transcript: &self.transcript,
            language: &self.language,
            language_code: &self.language_code,
            is_generated: self.is_generated,
            snippet_count: self.snippet_count,
            method: self.method,
        }
        .serialize(serializer)
    }
}

/// One caption fragment as the paid APIs return it
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Fragment {
    #[serde(default)]
    pub text: String,

    #[serde(default)]
    pub lang: Option<String>,
}

/// Providers return either a fragment list or a single flattened string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FragmentPayload {
    List(Vec<Fragment>),
    Flat(String),
}

/// Normalize a provider payload into a `TranscriptResult`.
///
/// `language_hint` is used when fragments carry no language of their own;
/// the result falls back to `"en"` when neither is known.
pub fn normalize_fragments(
    video_id: &str,
    payload: FragmentPayload,
    language_hint: Option<&str>,
    is_generated: bool,
    method: ProviderKind,
) -> TranscriptResult {
    let (transcript, snippet_count, fragment_lang) = match payload {
        FragmentPayload::List(fragments) => {
            let lang = fragments.first().and_then(|f| f.lang.clone());
            let texts: Vec<&str> = fragments.iter().map(|f| f.text.as_str()).collect();
            (texts.join(" "), fragments.len(), lang)
        }
        FragmentPayload::Flat(text) => (text, 0, None),
    };

    let code = fragment_lang
        .filter(|l| !l.is_empty())
        .or_else(|| language_hint.filter(|l| !l.is_empty()).map(String::from))
        .unwrap_or_else(|| "en".to_string());

    TranscriptResult {
        video_id: video_id.to_string(),
        transcript,
        language: code.clone(),
        language_code: code,
        is_generated,
        snippet_count,
        method,
    }
}

/// Build a result from already-decoded caption texts with a known display name
pub fn from_texts(
    video_id: &str,
    texts: &[String],
    language: &str,
    language_code: &str,
    is_generated: bool,
    method: ProviderKind,
) -> TranscriptResult {
    TranscriptResult {
        video_id: video_id.to_string(),
        transcript: texts.join(" "),
        language: language.to_string(),
        language_code: language_code.to_string(),
        is_generated,
        snippet_count: texts.len(),
        method,
    }
}
