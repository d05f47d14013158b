use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{http, Failure, ProviderKind, TranscriptProvider};
use crate::normalize::{from_texts, TranscriptResult};
use crate::utils::{excerpt, language_display_name};

const INNERTUBE_CLIENT_NAME: &str = "ANDROID";
const INNERTUBE_CLIENT_VERSION: &str = "20.10.38";

lazy_static::lazy_static! {
    static ref API_KEY_RE: Regex = Regex::new(r#""INNERTUBE_API_KEY":\s*"([a-zA-Z0-9_-]+)""#).unwrap();
    static ref TEXT_RE: Regex = Regex::new(r"(?s)<text[^>]*>(.*?)</text>").unwrap();
    static ref TAG_RE: Regex = Regex::new(r"<[^>]*>").unwrap();
    static ref ENTITY_RE: Regex = Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);").unwrap();
}

/// Fetches captions straight from YouTube over the anonymizing proxy.
///
/// This is the last link of the chain and the only provider whose
/// "no transcript" answer is trusted, since it enumerates every track.
pub struct DirectFetcher {
    client: Client,
    base_url: String,
}

/// One caption track advertised by the player
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionTrack {
    pub base_url: String,
    pub language: String,
    pub language_code: String,
    pub is_generated: bool,
    pub is_translatable: bool,
}

/// Entry in the `/api/list-transcripts` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptListing {
    pub language: String,
    pub language_code: String,
    pub is_generated: bool,
    pub is_translatable: bool,
}

impl From<&CaptionTrack> for TranscriptListing {
    fn from(track: &CaptionTrack) -> Self {
        Self {
            language: track.language.clone(),
            language_code: track.language_code.clone(),
            is_generated: track.is_generated,
            is_translatable: track.is_translatable,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerResponse {
    playability_status: Option<PlayabilityStatus>,
    captions: Option<Captions>,
}

#[derive(Debug, Deserialize)]
struct PlayabilityStatus {
    status: String,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Captions {
    player_captions_tracklist_renderer: Option<TracklistRenderer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TracklistRenderer {
    #[serde(default)]
    caption_tracks: Vec<RawTrack>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTrack {
    base_url: String,
    language_code: String,
    name: Option<TrackName>,
    kind: Option<String>,
    #[serde(default)]
    is_translatable: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackName {
    simple_text: Option<String>,
    #[serde(default)]
    runs: Vec<TextRun>,
}

#[derive(Debug, Deserialize)]
struct TextRun {
    text: String,
}

impl TrackName {
    fn display(&self) -> Option<String> {
        self.simple_text.clone().or_else(|| {
            let joined: String = self.runs.iter().map(|r| r.text.as_str()).collect();
            (!joined.is_empty()).then_some(joined)
        })
    }
}

impl DirectFetcher {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Enumerate every caption track available for the video
    pub async fn list(&self, video_id: &str) -> Result<Vec<TranscriptListing>, Failure> {
        let tracks = self.caption_tracks(video_id).await?;
        Ok(tracks.iter().map(TranscriptListing::from).collect())
    }

    async fn caption_tracks(&self, video_id: &str) -> Result<Vec<CaptionTrack>, Failure> {
        let html = self.fetch_watch_html(video_id).await?;
        let api_key = extract_api_key(&html)?;
        let player = self.fetch_player(video_id, &api_key).await?;
        tracks_from_player(video_id, player)
    }

    async fn fetch_watch_html(&self, video_id: &str) -> Result<String, Failure> {
        let response = self
            .client
            .get(format!("{}/watch", self.base()))
            .query(&[("v", video_id)])
            .header("Accept-Language", "en-US")
            .send()
            .await?;

        let response = http::error_for_status(response, "YouTube watch page").await?;
        Ok(response.text().await?)
    }

    async fn fetch_player(&self, video_id: &str, api_key: &str) -> Result<PlayerResponse, Failure> {
        let body = json!({
            "context": {
                "client": {
                    "clientName": INNERTUBE_CLIENT_NAME,
                    "clientVersion": INNERTUBE_CLIENT_VERSION,
                }
            },
            "videoId": video_id,
        });

        let response = self
            .client
            .post(format!("{}/youtubei/v1/player", self.base()))
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await?;

        let response = http::error_for_status(response, "YouTube player").await?;
        Ok(response.json().await?)
    }

    async fn fetch_fragments(&self, track: &CaptionTrack) -> Result<Vec<String>, Failure> {
        let url = track.base_url.replace("&fmt=srv3", "");
        let response = self.client.get(&url).send().await?;
        let response = http::error_for_status(response, "YouTube timedtext").await?;
        let xml = response.text().await?;

        let texts = parse_timedtext(&xml);
        if texts.is_empty() {
            return Err(Failure::Transient(format!(
                "Unexpected timedtext response: {}",
                excerpt(&xml, 200)
            )));
        }
        Ok(texts)
    }
}

#[async_trait]
impl TranscriptProvider for DirectFetcher {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Direct
    }

    fn is_authoritative(&self) -> bool {
        true
    }

    async fn fetch(&self, video_id: &str, languages: &[String]) -> Result<TranscriptResult, Failure> {
        let tracks = self.caption_tracks(video_id).await?;
        let track = select_track(&tracks, languages).ok_or_else(|| {
            Failure::Permanent(format!("No transcript found for video {}", video_id))
        })?;

        tracing::debug!(
            provider = "direct",
            video_id,
            language_code = %track.language_code,
            is_generated = track.is_generated,
            "Selected caption track"
        );

        let texts = self.fetch_fragments(track).await?;
        Ok(from_texts(
            video_id,
            &texts,
            &track.language,
            &track.language_code,
            track.is_generated,
            ProviderKind::Direct,
        ))
    }
}

/// Pick a track for the requested languages.
///
/// For each requested code in order, a manually created track beats a
/// generated one. Without any code match, the first manually created track
/// wins, then the first track of any kind.
pub fn select_track<'a>(tracks: &'a [CaptionTrack], languages: &[String]) -> Option<&'a CaptionTrack> {
    for lang in languages {
        let mut matching = tracks.iter().filter(|t| &t.language_code == lang);
        let manual = matching.clone().find(|t| !t.is_generated);
        if let Some(track) = manual.or_else(|| matching.next()) {
            return Some(track);
        }
    }

    tracks
        .iter()
        .find(|t| !t.is_generated)
        .or_else(|| tracks.first())
}

fn extract_api_key(html: &str) -> Result<String, Failure> {
    if html.contains("class=\"g-recaptcha\"") {
        return Err(Failure::Transient(
            "YouTube is blocking requests from this IP (captcha challenge)".to_string(),
        ));
    }

    API_KEY_RE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| Failure::Transient("Could not find innertube API key in watch page".to_string()))
}

fn tracks_from_player(video_id: &str, player: PlayerResponse) -> Result<Vec<CaptionTrack>, Failure> {
    if let Some(status) = player.playability_status {
        if status.status != "OK" {
            let reason = status.reason.unwrap_or_default();
            let lower = reason.to_lowercase();
            if lower.contains("bot") || lower.contains("sign in to confirm") {
                return Err(Failure::Transient(format!("Request blocked by YouTube: {}", reason)));
            }
            return Err(Failure::Permanent(format!(
                "Video unavailable ({}): {}",
                video_id,
                if reason.is_empty() { status.status } else { reason }
            )));
        }
    }

    let renderer = player
        .captions
        .and_then(|c| c.player_captions_tracklist_renderer)
        .ok_or_else(|| {
            Failure::Permanent(format!("Transcripts are disabled for video {}", video_id))
        })?;

    if renderer.caption_tracks.is_empty() {
        return Err(Failure::Permanent(format!("No transcript found for video {}", video_id)));
    }

    Ok(renderer
        .caption_tracks
        .into_iter()
        .map(|raw| {
            let language = raw
                .name
                .as_ref()
                .and_then(TrackName::display)
                .unwrap_or_else(|| language_display_name(&raw.language_code));
            CaptionTrack {
                base_url: raw.base_url,
                language,
                language_code: raw.language_code,
                is_generated: raw.kind.as_deref() == Some("asr"),
                is_translatable: raw.is_translatable,
            }
        })
        .collect())
}

/// Extract the text of every `<text>` element, skipping empty ones.
///
/// Caption text is escaped twice: the XML layer wraps HTML that may carry
/// formatting tags and its own character references.
fn parse_timedtext(xml: &str) -> Vec<String> {
    TEXT_RE
        .captures_iter(xml)
        .filter_map(|caps| caps.get(1))
        .map(|m| {
            let markup = unescape_html(m.as_str());
            let text = TAG_RE.replace_all(&markup, "");
            unescape_html(&text).replace('\n', " ").trim().to_string()
        })
        .filter(|text| !text.is_empty())
        .collect()
}

/// Decode character references in a single pass. Unknown names are kept.
fn unescape_html(text: &str) -> String {
    ENTITY_RE
        .replace_all(text, |caps: &regex::Captures| match decode_entity(&caps[1]) {
            Some(c) => c.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

fn decode_entity(entity: &str) -> Option<char> {
    let code = if let Some(hex) = entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X")) {
        u32::from_str_radix(hex, 16).ok()?
    } else if let Some(decimal) = entity.strip_prefix('#') {
        decimal.parse().ok()?
    } else {
        return match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some(' '),
            _ => None,
        };
    };
    char::from_u32(code)
}
