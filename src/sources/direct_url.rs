use anyhow::Result;
use async_trait::async_trait;
use reqwest::{header, Client};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::{SongMetadata, SourceKind, StreamProbe};

/// Tipos de contenido aceptados como audio reproducible
const AUDIO_CONTENT_TYPES: [&str; 4] = [
    "audio/",
    "application/ogg",
    "mpegurl",
    "application/octet-stream",
];

/// Sondeo de streams HTTP (radios Icecast/Shoutcast y archivos de audio)
pub struct HttpStreamProbe {
    http: Client,
}

impl HttpStreamProbe {
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { http })
    }
}

fn is_audio_content(content_type: &str) -> bool {
    let lowered = content_type.to_lowercase();
    AUDIO_CONTENT_TYPES
        .iter()
        .any(|accepted| lowered.contains(accepted))
}

/// Título a mostrar: nombre de la radio, último segmento de la ruta o la URL
fn stream_title(url: &str, icy_name: Option<&str>) -> String {
    if let Some(name) = icy_name.map(str::trim).filter(|name| !name.is_empty()) {
        return name.to_string();
    }

    Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
                .map(|segment| segment.to_string())
        })
        .unwrap_or_else(|| url.to_string())
}

#[async_trait]
impl StreamProbe for HttpStreamProbe {
    async fn probe(&self, url: &str) -> Result<Option<SongMetadata>> {
        debug!("📻 Sondeando stream: {}", url);

        let response = match self
            .http
            .get(url)
            .header("Icy-MetaData", "1")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("⚠️ Stream inaccesible {}: {}", url, e);
                return Ok(None);
            }
        };

        if !response.status().is_success() {
            debug!("❌ Stream respondió {}", response.status());
            return Ok(None);
        }

        let headers = response.headers();
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();

        if !is_audio_content(content_type) {
            debug!("❌ Contenido no reproducible ({}): {}", content_type, url);
            return Ok(None);
        }

        let icy_name = headers
            .get("icy-name")
            .and_then(|value| value.to_str().ok());

        Ok(Some(SongMetadata {
            kind: SourceKind::DirectStream,
            url: url.to_string(),
            title: stream_title(url, icy_name),
            artist: None,
            duration: None,
            thumbnail: None,
            playlist: None,
            chapter: None,
        }))
    }
}
