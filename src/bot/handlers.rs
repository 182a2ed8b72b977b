use anyhow::Result;
use serenity::{
    builder::{CreateInteractionResponse, CreateInteractionResponseMessage, EditInteractionResponse},
    model::{
        application::{CommandDataOptionValue, CommandInteraction},
        channel::ChannelType,
        id::{ChannelId, GuildId, UserId},
    },
    prelude::Context,
};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::{
    bot::{enqueue::AddRequest, MuseBot},
    error::{PlayerError, PlayerResult},
    ui::{
        embeds,
        messages::{self, ControlAction, Locale},
    },
};

/// Maneja comandos slash
pub async fn handle_command(ctx: &Context, command: CommandInteraction, bot: &MuseBot) -> Result<()> {
    let guild_id = command
        .guild_id
        .ok_or_else(|| anyhow::anyhow!("Comando usado fuera de un servidor"))?;

    info!(
        "📝 Comando /{} usado por {} en guild {}",
        command.data.name, command.user.name, guild_id
    );

    let locale = bot.locale();

    let reply = match command.data.name.as_str() {
        "play" => return handle_play(ctx, &command, guild_id, bot).await,
        "pause" => handle_pause(guild_id, bot).await,
        "resume" => handle_resume(ctx, &command, guild_id, bot).await,
        "skip" => handle_skip(guild_id, bot).await,
        "stop" => handle_stop(guild_id, bot).await,
        "clear" => handle_clear(guild_id, bot).await,
        "shuffle" => handle_shuffle(guild_id, bot).await,
        "now-playing" => return handle_now_playing(ctx, &command, guild_id, bot).await,
        "config" => handle_config(&command, guild_id, bot).await,
        _ => {
            command
                .create_response(
                    &ctx.http,
                    CreateInteractionResponse::Message(
                        CreateInteractionResponseMessage::new()
                            .content("❌ Comando não reconhecido")
                            .ephemeral(true),
                    ),
                )
                .await?;
            return Ok(());
        }
    };

    respond(ctx, &command, locale, reply).await
}

// Handlers específicos para cada comando

async fn handle_play(
    ctx: &Context,
    command: &CommandInteraction,
    guild_id: GuildId,
    bot: &MuseBot,
) -> Result<()> {
    let query = string_option(command, "query")
        .ok_or_else(|| anyhow::anyhow!("Query no proporcionado"))?
        .to_string();

    // La resolución puede tardar varios segundos
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new()),
        )
        .await?;

    let playlist_limit = bot.storage.lock().await.settings(guild_id.get()).playlist_limit;

    let request = AddRequest {
        query,
        add_to_front: bool_option(command, "immediate"),
        shuffle_additions: bool_option(command, "shuffle"),
        split_chapters: bool_option(command, "split"),
        guild_id,
        requested_by: command.user.id,
        origin_channel: command.channel_id,
        target_voice_channel: target_voice_channel(ctx, guild_id, command.user.id),
        playlist_limit,
    };

    let locale = bot.locale();
    let response = match bot.queue_service.add_query(request).await {
        Ok(outcome) => {
            let mut response = EditInteractionResponse::new().content(outcome.message);
            if let Some(view) = &outcome.now_playing {
                response = response.embed(embeds::now_playing_embed(view, locale));
            }
            response
        }
        Err(e) => {
            warn!("⚠️ /play falló en guild {}: {}", guild_id, e);
            EditInteractionResponse::new().embed(embeds::error_embed(locale, &e.user_message()))
        }
    };

    command.edit_response(&ctx.http, response).await?;

    Ok(())
}

async fn handle_pause(guild_id: GuildId, bot: &MuseBot) -> PlayerResult<String> {
    let session = bot.registry.get(guild_id);
    session.pause().await?;
    Ok(messages::control_message(bot.locale(), ControlAction::Paused))
}

async fn handle_resume(
    ctx: &Context,
    command: &CommandInteraction,
    guild_id: GuildId,
    bot: &MuseBot,
) -> PlayerResult<String> {
    let session = bot.registry.get(guild_id);
    let epoch = session.epoch().await;

    if !session.has_handle().await {
        let channel = target_voice_channel(ctx, guild_id, command.user.id)
            .ok_or_else(|| PlayerError::Connection("no hay canal de voz destino".to_string()))?;
        session.connect_guarded(channel, epoch).await?;
    }

    session.play_guarded(epoch).await?;
    Ok(messages::control_message(bot.locale(), ControlAction::Resumed))
}

async fn handle_skip(guild_id: GuildId, bot: &MuseBot) -> PlayerResult<String> {
    let locale = bot.locale();
    let Some(session) = bot.registry.find(guild_id) else {
        return Ok(messages::control_message(locale, ControlAction::NothingToSkip));
    };

    Ok(match session.skip().await? {
        Some(song) => messages::skipped_message(locale, song.title()),
        None => messages::control_message(locale, ControlAction::NothingToSkip),
    })
}

async fn handle_stop(guild_id: GuildId, bot: &MuseBot) -> PlayerResult<String> {
    if let Some(session) = bot.registry.find(guild_id) {
        session.stop().await?;
        if let Err(e) = bot.registry.remove(guild_id) {
            debug!("Sesión de guild {} no removida: {}", guild_id, e);
        }
    }

    Ok(messages::control_message(bot.locale(), ControlAction::Stopped))
}

async fn handle_clear(guild_id: GuildId, bot: &MuseBot) -> PlayerResult<String> {
    let removed = match bot.registry.find(guild_id) {
        Some(session) => session.clear().await,
        None => 0,
    };

    Ok(messages::cleared_message(bot.locale(), removed))
}

async fn handle_shuffle(guild_id: GuildId, bot: &MuseBot) -> PlayerResult<String> {
    let count = match bot.registry.find(guild_id) {
        Some(session) => session.shuffle().await,
        None => 0,
    };

    Ok(messages::shuffled_message(bot.locale(), count))
}

async fn handle_now_playing(
    ctx: &Context,
    command: &CommandInteraction,
    guild_id: GuildId,
    bot: &MuseBot,
) -> Result<()> {
    let locale = bot.locale();

    let message = match bot.registry.find(guild_id) {
        Some(session) => {
            let view = session.now_playing().await;
            CreateInteractionResponseMessage::new().embed(embeds::now_playing_embed(&view, locale))
        }
        None => CreateInteractionResponseMessage::new()
            .content(messages::control_message(locale, ControlAction::NothingToSkip))
            .ephemeral(true),
    };

    command
        .create_response(&ctx.http, CreateInteractionResponse::Message(message))
        .await?;

    Ok(())
}

async fn handle_config(command: &CommandInteraction, guild_id: GuildId, bot: &MuseBot) -> PlayerResult<String> {
    let limit = command
        .data
        .options
        .iter()
        .find(|opt| opt.name == "playlist-limit")
        .and_then(|opt| match &opt.value {
            CommandDataOptionValue::SubCommand(options) => options
                .iter()
                .find(|sub| sub.name == "limit")
                .and_then(|sub| sub.value.as_i64()),
            _ => None,
        });
    let limit = parse_playlist_limit(limit)?;

    let settings = bot
        .storage
        .lock()
        .await
        .set_playlist_limit(guild_id.get(), limit)
        .await?;

    Ok(messages::playlist_limit_message(bot.locale(), settings.playlist_limit))
}

/// Límite de playlist válido: entero positivo
fn parse_playlist_limit(raw: Option<i64>) -> PlayerResult<usize> {
    raw.and_then(|limit| usize::try_from(limit).ok())
        .filter(|limit| *limit > 0)
        .ok_or(PlayerError::InvalidArgument("o limite de playlist"))
}

/// Responde con texto o con un embed de error efímero
async fn respond(
    ctx: &Context,
    command: &CommandInteraction,
    locale: Locale,
    reply: PlayerResult<String>,
) -> Result<()> {
    let message = match reply {
        Ok(content) => CreateInteractionResponseMessage::new().embed(embeds::success_embed(&content)),
        Err(e) => {
            if e.is_retriable() {
                warn!("⚠️ /{} falló: {}", command.data.name, e);
            } else {
                debug!("/{} rechazado: {}", command.data.name, e);
            }
            CreateInteractionResponseMessage::new()
                .embed(embeds::error_embed(locale, &e.user_message()))
                .ephemeral(true)
        }
    };

    command
        .create_response(&ctx.http, CreateInteractionResponse::Message(message))
        .await?;

    Ok(())
}

// Funciones auxiliares

fn string_option<'a>(command: &'a CommandInteraction, name: &str) -> Option<&'a str> {
    command
        .data
        .options
        .iter()
        .find(|opt| opt.name == name)
        .and_then(|opt| opt.value.as_str())
}

fn bool_option(command: &CommandInteraction, name: &str) -> bool {
    command
        .data
        .options
        .iter()
        .find(|opt| opt.name == name)
        .and_then(|opt| opt.value.as_bool())
        .unwrap_or(false)
}

/// Canal de voz del usuario o, si no está en ninguno, el más poblado de la guild
fn target_voice_channel(ctx: &Context, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
    let bot_id = ctx.cache.current_user().id;
    let guild = guild_id.to_guild_cached(&ctx.cache)?;

    let requester = guild
        .voice_states
        .get(&user_id)
        .and_then(|voice_state| voice_state.channel_id);

    let mut occupancy: HashMap<ChannelId, usize> = guild
        .channels
        .values()
        .filter(|channel| channel.kind == ChannelType::Voice)
        .map(|channel| (channel.id, 0))
        .collect();

    for voice_state in guild.voice_states.values() {
        if voice_state.user_id == bot_id {
            continue;
        }
        if let Some(channel_id) = voice_state.channel_id {
            *occupancy.entry(channel_id).or_insert(0) += 1;
        }
    }

    pick_voice_channel(requester, &occupancy)
}

fn pick_voice_channel(
    requester: Option<ChannelId>,
    occupancy: &HashMap<ChannelId, usize>,
) -> Option<ChannelId> {
    // Empates a favor del canal con id menor
    requester.or_else(|| {
        occupancy
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
            .map(|(channel_id, _)| *channel_id)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_requester_channel_wins() {
        let occupancy = HashMap::from([(ChannelId::new(1), 5), (ChannelId::new(2), 0)]);
        assert_eq!(
            pick_voice_channel(Some(ChannelId::new(2)), &occupancy),
            Some(ChannelId::new(2))
        );
    }

    #[test]
    fn test_most_populated_channel_is_fallback() {
        let occupancy = HashMap::from([
            (ChannelId::new(1), 1),
            (ChannelId::new(2), 4),
            (ChannelId::new(3), 4),
        ]);
        assert_eq!(pick_voice_channel(None, &occupancy), Some(ChannelId::new(2)));
        assert_eq!(pick_voice_channel(None, &HashMap::new()), None);
    }

    #[test]
    fn test_playlist_limit_must_be_positive() {
        assert_eq!(parse_playlist_limit(Some(25)).unwrap(), 25);
        for raw in [Some(0), Some(-3), None] {
            let error = parse_playlist_limit(raw).unwrap_err();
            assert!(matches!(error, PlayerError::InvalidArgument(_)), "{raw:?}");
            assert_eq!(error.user_message(), "valor inválido para o limite de playlist");
        }
    }
}
