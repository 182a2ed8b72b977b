use serenity::{
    all::Timestamp,
    builder::{CreateEmbed, CreateEmbedFooter},
};
use std::time::Duration;

use crate::{
    audio::player::{NowPlaying, PlayerStatus},
    sources::Song,
    ui::messages::Locale,
};

/// Paleta de colores del bot
pub mod colors {
    use serenity::all::Colour;

    pub const SUCCESS_GREEN: Colour = Colour::from_rgb(67, 181, 129);
    pub const ERROR_RED: Colour = Colour::from_rgb(220, 53, 69);
    pub const MUSIC_PURPLE: Colour = Colour::from_rgb(138, 43, 226);
    pub const NEUTRAL_GRAY: Colour = Colour::from_rgb(108, 117, 125);
}

const STANDARD_FOOTER: &str = "🎵 Muse";

struct Labels {
    now_playing: &'static str,
    nothing: &'static str,
    artist: &'static str,
    duration: &'static str,
    live: &'static str,
    chapter: &'static str,
    requested_by: &'static str,
    status: &'static str,
    up_next: &'static str,
    more: &'static str,
    error: &'static str,
}

fn labels(locale: Locale) -> Labels {
    match locale {
        Locale::Pt => Labels {
            now_playing: "🎵 Tocando agora",
            nothing: "Nada tocando no momento",
            artist: "🎤 Artista",
            duration: "⏱️ Duração",
            live: "🔴 Ao vivo",
            chapter: "📑 Capítulo",
            requested_by: "👤 Pedido por",
            status: "📻 Estado",
            up_next: "📜 A seguir",
            more: "mais",
            error: "❌ Erro",
        },
        Locale::En => Labels {
            now_playing: "🎵 Now playing",
            nothing: "Nothing is playing right now",
            artist: "🎤 Artist",
            duration: "⏱️ Duration",
            live: "🔴 Live",
            chapter: "📑 Chapter",
            requested_by: "👤 Requested by",
            status: "📻 Status",
            up_next: "📜 Up next",
            more: "more",
            error: "❌ Error",
        },
    }
}

fn status_label(locale: Locale, status: PlayerStatus) -> &'static str {
    match (locale, status) {
        (Locale::Pt, PlayerStatus::Playing) => "▶️ Tocando",
        (Locale::Pt, PlayerStatus::Paused) => "⏸️ Pausado",
        (Locale::Pt, PlayerStatus::Idle) => "💤 Ocioso",
        (Locale::Pt, PlayerStatus::Stopped) => "⏹️ Parado",
        (Locale::En, PlayerStatus::Playing) => "▶️ Playing",
        (Locale::En, PlayerStatus::Paused) => "⏸️ Paused",
        (Locale::En, PlayerStatus::Idle) => "💤 Idle",
        (Locale::En, PlayerStatus::Stopped) => "⏹️ Stopped",
    }
}

/// Embed con la canción actual, el estado y un adelanto de la cola
pub fn now_playing_embed(view: &NowPlaying, locale: Locale) -> CreateEmbed {
    let text = labels(locale);

    let Some(song) = &view.current else {
        return CreateEmbed::default()
            .title(text.now_playing)
            .description(text.nothing)
            .color(colors::NEUTRAL_GRAY)
            .field(text.status, status_label(locale, view.status), true)
            .footer(CreateEmbedFooter::new(STANDARD_FOOTER));
    };

    let mut embed = CreateEmbed::default()
        .title(text.now_playing)
        .description(format!("**{}**", song.title()))
        .url(song.url())
        .color(colors::MUSIC_PURPLE);

    if let Some(artist) = &song.metadata.artist {
        embed = embed.field(text.artist, artist, true);
    }

    embed = embed.field(text.duration, duration_label(song, text.live), true);

    if let Some(chapter) = song.metadata.chapter {
        embed = embed.field(
            text.chapter,
            format!(
                "{} - {}",
                format_duration(chapter.offset),
                format_duration(chapter.offset + chapter.length)
            ),
            true,
        );
    }

    embed = embed
        .field(text.requested_by, format!("<@{}>", song.requested_by), true)
        .field(text.status, status_label(locale, view.status), true);

    if !view.queued.is_empty() {
        let mut preview: Vec<String> = view
            .queued
            .iter()
            .enumerate()
            .map(|(index, queued)| {
                format!("`{}.` {} ({})", index + 1, queued.title(), duration_label(queued, text.live))
            })
            .collect();

        let hidden = view.queue_len.saturating_sub(view.queued.len());
        if hidden > 0 {
            preview.push(format!("… +{hidden} {}", text.more));
        }

        embed = embed.field(
            format!("{} ({}, {})", text.up_next, view.queue_len, format_duration(view.queue_duration)),
            preview.join("\n"),
            false,
        );
    }

    if let Some(thumbnail) = &song.metadata.thumbnail {
        embed = embed.thumbnail(thumbnail);
    }

    embed
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Embed de error con el texto para el usuario
pub fn error_embed(locale: Locale, description: &str) -> CreateEmbed {
    CreateEmbed::default()
        .title(labels(locale).error)
        .description(description)
        .color(colors::ERROR_RED)
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Embed de confirmación simple
pub fn success_embed(description: &str) -> CreateEmbed {
    CreateEmbed::default()
        .description(description)
        .color(colors::SUCCESS_GREEN)
}

fn duration_label(song: &Song, live: &str) -> String {
    match song.duration() {
        Some(duration) => format_duration(duration),
        None => live.to_string(),
    }
}

pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::test_support::song;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(59)), "0:59");
        assert_eq!(format_duration(Duration::from_secs(200)), "3:20");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1:02:05");
    }

    #[test]
    fn test_live_songs_show_live_marker() {
        let mut live = song("Rádio");
        live.metadata.duration = None;

        assert_eq!(duration_label(&live, "🔴 Ao vivo"), "🔴 Ao vivo");
        assert_eq!(duration_label(&song("Faixa"), "🔴 Ao vivo"), "3:20");
    }
}
