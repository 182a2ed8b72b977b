use anyhow::Result;
use serenity::{
    builder::{CreateCommand, CreateCommandOption},
    model::{application::CommandOptionType, id::GuildId},
    prelude::Context,
};

/// Registra comandos globales
pub async fn register_global_commands(ctx: &Context) -> Result<()> {
    for command in all_commands() {
        ctx.http.create_global_command(&command).await?;
    }

    Ok(())
}

/// Registra comandos para una guild específica (desarrollo)
pub async fn register_guild_commands(ctx: &Context, guild_id: GuildId) -> Result<()> {
    guild_id.set_commands(&ctx.http, all_commands()).await?;

    Ok(())
}

fn all_commands() -> Vec<CreateCommand> {
    vec![
        play_command(),
        pause_command(),
        resume_command(),
        skip_command(),
        stop_command(),
        clear_command(),
        shuffle_command(),
        now_playing_command(),
        config_command(),
    ]
}

// Comandos de reproducción

fn play_command() -> CreateCommand {
    CreateCommand::new("play")
        .description("Toca uma música, playlist ou stream")
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::String,
                "query",
                "URL ou termo de busca",
            )
            .required(true),
        )
        .add_option(CreateCommandOption::new(
            CommandOptionType::Boolean,
            "immediate",
            "Adicionar à frente da fila",
        ))
        .add_option(CreateCommandOption::new(
            CommandOptionType::Boolean,
            "shuffle",
            "Embaralhar as músicas adicionadas",
        ))
        .add_option(CreateCommandOption::new(
            CommandOptionType::Boolean,
            "split",
            "Dividir vídeos em capítulos",
        ))
}

// Comandos de control

fn pause_command() -> CreateCommand {
    CreateCommand::new("pause").description("Pausa a música atual")
}

fn resume_command() -> CreateCommand {
    CreateCommand::new("resume").description("Retoma a reprodução")
}

fn skip_command() -> CreateCommand {
    CreateCommand::new("skip").description("Pula para a próxima música")
}

fn stop_command() -> CreateCommand {
    CreateCommand::new("stop").description("Para a reprodução, limpa a fila e sai do canal")
}

// Comandos de cola

fn clear_command() -> CreateCommand {
    CreateCommand::new("clear").description("Limpa a fila, mantendo a música atual")
}

fn shuffle_command() -> CreateCommand {
    CreateCommand::new("shuffle").description("Embaralha a fila")
}

fn now_playing_command() -> CreateCommand {
    CreateCommand::new("now-playing").description("Mostra a música atual e a fila")
}

// Ajustes del servidor

fn config_command() -> CreateCommand {
    CreateCommand::new("config")
        .description("Ajustes do servidor")
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::SubCommand,
                "playlist-limit",
                "Máximo de músicas adicionadas de uma playlist",
            )
            .add_sub_option(
                CreateCommandOption::new(CommandOptionType::Integer, "limit", "Novo limite")
                    .min_int_value(1)
                    .required(true),
            ),
        )
}
