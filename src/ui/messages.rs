use serde::{Deserialize, Serialize};

/// Idioma de los mensajes mostrados en el chat
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Pt,
    En,
}

impl Locale {
    /// `en`, `en-US`, ... seleccionan inglés; cualquier otro valor, portugués
    pub fn from_tag(tag: &str) -> Self {
        if tag.trim().to_lowercase().starts_with("en") {
            Locale::En
        } else {
            Locale::Pt
        }
    }
}

/// Datos para el resumen de una canción o lote agregado a la cola
#[derive(Debug, Clone, Default)]
pub struct AddedSummary<'a> {
    pub first_title: &'a str,
    /// Canciones agregadas además de la primera
    pub extra: usize,
    pub to_front: bool,
    pub sampled: Option<usize>,
    pub not_found: usize,
    pub resuming: bool,
}

/// Nota sobre el muestreo de catálogo y las canciones no encontradas
pub fn catalog_annotation(locale: Locale, sampled: Option<usize>, not_found: usize) -> Option<String> {
    let sample = sampled.map(|count| match locale {
        Locale::Pt => format!("uma amostra aleatória de {count} músicas foi coletada"),
        Locale::En => format!("random sample of {count} songs collected"),
    });

    let missing = match (not_found, locale) {
        (0, _) => None,
        (1, Locale::Pt) => Some("1 música não foi encontrada".to_string()),
        (1, Locale::En) => Some("1 song not found".to_string()),
        (count, Locale::Pt) => Some(format!("{count} músicas não foram encontradas")),
        (count, Locale::En) => Some(format!("{count} songs not found")),
    };

    let joiner = match locale {
        Locale::Pt => " e ",
        Locale::En => " and ",
    };

    match (sample, missing) {
        (Some(sample), Some(missing)) => Some(format!("{sample}{joiner}{missing}")),
        (sample, missing) => sample.or(missing),
    }
}

fn resuming_note(locale: Locale) -> &'static str {
    match locale {
        Locale::Pt => "retomando a reprodução",
        Locale::En => "resuming playback",
    }
}

/// Respuesta en texto plano tras agregar canciones
pub fn added_message(locale: Locale, summary: &AddedSummary<'_>) -> String {
    let mut notes = Vec::new();
    if summary.resuming {
        notes.push(resuming_note(locale).to_string());
    }
    if let Some(catalog) = catalog_annotation(locale, summary.sampled, summary.not_found) {
        notes.push(catalog);
    }

    let annotation = if notes.is_empty() {
        String::new()
    } else {
        format!(" ({})", notes.join(", "))
    };

    let title = summary.first_title;
    match (locale, summary.extra, summary.to_front) {
        (Locale::Pt, 0, false) => format!("Jaé, **{title}** foi adicionada à fila{annotation}"),
        (Locale::Pt, 0, true) => {
            format!("Jaé, **{title}** foi adicionada à frente da fila{annotation}")
        }
        (Locale::Pt, extra, false) => format!(
            "Jaé, **{title}** e {extra} outras músicas foram adicionadas à fila{annotation}"
        ),
        (Locale::Pt, extra, true) => format!(
            "Jaé, **{title}** e {extra} outras músicas foram adicionadas à frente da fila{annotation}"
        ),
        (Locale::En, 0, false) => format!("**{title}** added to the queue{annotation}"),
        (Locale::En, 0, true) => format!("**{title}** added to the front of the queue{annotation}"),
        (Locale::En, extra, false) => {
            format!("**{title}** and {extra} other songs added to the queue{annotation}")
        }
        (Locale::En, extra, true) => format!(
            "**{title}** and {extra} other songs added to the front of the queue{annotation}"
        ),
    }
}

/// Confirmaciones cortas de los comandos de control
pub fn control_message(locale: Locale, action: ControlAction) -> String {
    let text = match (locale, action) {
        (Locale::Pt, ControlAction::Paused) => "⏸️ pausado",
        (Locale::Pt, ControlAction::Resumed) => "▶️ retomando",
        (Locale::Pt, ControlAction::Stopped) => "⏹️ parei e saí do canal",
        (Locale::Pt, ControlAction::NothingToSkip) => "não tem nada tocando",
        (Locale::En, ControlAction::Paused) => "⏸️ paused",
        (Locale::En, ControlAction::Resumed) => "▶️ resuming",
        (Locale::En, ControlAction::Stopped) => "⏹️ stopped and left the channel",
        (Locale::En, ControlAction::NothingToSkip) => "nothing is playing",
    };
    text.to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Paused,
    Resumed,
    Stopped,
    NothingToSkip,
}

pub fn skipped_message(locale: Locale, title: &str) -> String {
    match locale {
        Locale::Pt => format!("⏭️ pulei **{title}**"),
        Locale::En => format!("⏭️ skipped **{title}**"),
    }
}

pub fn cleared_message(locale: Locale, removed: usize) -> String {
    match locale {
        Locale::Pt => format!("🗑️ fila limpa ({removed} músicas removidas)"),
        Locale::En => format!("🗑️ queue cleared ({removed} songs removed)"),
    }
}

pub fn shuffled_message(locale: Locale, count: usize) -> String {
    match locale {
        Locale::Pt => format!("🔀 {count} músicas embaralhadas"),
        Locale::En => format!("🔀 shuffled {count} songs"),
    }
}

pub fn playlist_limit_message(locale: Locale, limit: usize) -> String {
    match locale {
        Locale::Pt => format!("⚙️ limite de playlist ajustado para {limit} músicas"),
        Locale::En => format!("⚙️ playlist limit set to {limit} songs"),
    }
}
