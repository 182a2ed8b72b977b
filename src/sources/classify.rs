use url::Url;

/// Resultado de intentar interpretar una consulta como URL.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryKind {
    DirectUrl(Url),
    Unparseable,
}

/// Estrategia de resolución para una URL.
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    VideoPlaylist(String),
    Video(String),
    Catalog(String),
    Stream(String),
    Unsupported(String),
}

const CATALOG_HOST: &str = "open.spotify.com";
const CATALOG_SCHEME: &str = "spotify";

/// Clasifica una consulta sin lanzar errores.
///
/// Solo cuenta como URL lo que tiene esquema http(s) con host, el esquema
/// `spotify:` o una autoridad explícita (`esquema://host`). Textos como
/// `"artista: canción"` se tratan como búsqueda.
pub fn classify(query: &str) -> QueryKind {
    let trimmed = query.trim();

    let Ok(url) = Url::parse(trimmed) else {
        return QueryKind::Unparseable;
    };

    let is_url = match url.scheme() {
        "http" | "https" => url.host_str().is_some(),
        CATALOG_SCHEME => true,
        _ => url.has_authority() && url.host_str().is_some_and(|host| !host.is_empty()),
    };

    if is_url {
        QueryKind::DirectUrl(url)
    } else {
        QueryKind::Unparseable
    }
}

/// Decide la ruta de una URL ya clasificada.
pub fn route(url: &Url, video_hosts: &[String]) -> Route {
    if url.scheme() == CATALOG_SCHEME {
        return Route::Catalog(url.to_string());
    }

    if !matches!(url.scheme(), "http" | "https") {
        return Route::Unsupported(url.scheme().to_string());
    }

    let host = url.host_str().unwrap_or_default().to_lowercase();

    if video_hosts.iter().any(|known| *known == host) {
        return match playlist_id(url) {
            Some(list_id) => Route::VideoPlaylist(list_id),
            None => Route::Video(url.to_string()),
        };
    }

    if host == CATALOG_HOST {
        return Route::Catalog(url.to_string());
    }

    Route::Stream(url.to_string())
}

fn playlist_id(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(key, value)| key == "list" && !value.is_empty())
        .map(|(_, value)| value.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn hosts() -> Vec<String> {
        crate::config::Config::default().video_hosts
    }

    fn route_of(query: &str) -> Route {
        match classify(query) {
            QueryKind::DirectUrl(url) => route(&url, &hosts()),
            QueryKind::Unparseable => panic!("{query} no se clasificó como URL"),
        }
    }

    #[test]
    fn test_free_text_is_unparseable() {
        assert_eq!(classify("never gonna give you up"), QueryKind::Unparseable);
        assert_eq!(classify("Queen: Bohemian Rhapsody"), QueryKind::Unparseable);
        assert_eq!(classify("youtube.com/watch?v=abc"), QueryKind::Unparseable);
    }

    #[test]
    fn test_video_and_playlist_routes() {
        assert_eq!(
            route_of("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Route::Video("https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            route_of("https://youtube.com/playlist?list=PL123"),
            Route::VideoPlaylist("PL123".to_string())
        );
        assert_eq!(
            route_of("https://music.youtube.com/watch?v=abc&list=RD42"),
            Route::VideoPlaylist("RD42".to_string())
        );
    }

    #[test]
    fn test_catalog_routes() {
        assert!(matches!(
            route_of("https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M"),
            Route::Catalog(_)
        ));
        assert!(matches!(route_of("spotify:album:4aawyAB9vmqN3uQ7FjRGTy"), Route::Catalog(_)));
    }

    #[test]
    fn test_generic_and_unsupported_routes() {
        assert_eq!(
            route_of("http://radio.example.com:8000/live"),
            Route::Stream("http://radio.example.com:8000/live".to_string())
        );
        assert_eq!(
            route_of("ftp://files.example.com/song.mp3"),
            Route::Unsupported("ftp".to_string())
        );
    }
}
