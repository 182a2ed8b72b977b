use rand::{seq::SliceRandom, Rng};
use std::{collections::VecDeque, time::Duration};
use tracing::{debug, info};

use crate::sources::Song;

/// Cola FIFO de una sesión. La canción actual nunca vive aquí.
#[derive(Debug, Clone)]
pub struct Queue {
    items: VecDeque<Song>,
    max_size: usize,
}

impl Queue {
    pub fn new(max_size: usize) -> Self {
        Self {
            items: VecDeque::new(),
            max_size,
        }
    }

    /// Espacio libre antes de alcanzar `max_size`
    pub fn remaining_capacity(&self) -> usize {
        self.max_size.saturating_sub(self.items.len())
    }

    pub fn append(&mut self, song: Song) {
        debug!("➕ Agregado al final: {}", song.title());
        self.items.push_back(song);
    }

    /// Inserta al frente ("reproducir a continuación")
    pub fn prepend(&mut self, song: Song) {
        debug!("⏫ Agregado al frente: {}", song.title());
        self.items.push_front(song);
    }

    /// Inserta varias canciones al frente conservando su orden relativo
    pub fn prepend_all(&mut self, songs: Vec<Song>) {
        for song in songs.into_iter().rev() {
            self.items.push_front(song);
        }
    }

    pub fn extend(&mut self, songs: Vec<Song>) {
        for song in songs {
            self.append(song);
        }
    }

    /// Vacía la cola sin tocar la canción actual
    pub fn clear(&mut self) {
        self.items.clear();
        info!("🗑️ Cola limpiada");
    }

    /// Permutación uniforme (Fisher-Yates) de todo lo que está en cola
    pub fn shuffle_remaining<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.items.make_contiguous().shuffle(rng);
        info!("🔀 Cola mezclada ({} canciones)", self.items.len());
    }

    /// Próxima canción sin sacarla de la cola
    pub fn peek_next(&self) -> Option<&Song> {
        self.items.front()
    }

    pub fn pop_next(&mut self) -> Option<Song> {
        self.items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Song> {
        self.items.iter()
    }

    /// Duración conocida de la cola; los streams en vivo no suman
    pub fn total_duration(&self) -> Duration {
        self.items.iter().filter_map(Song::duration).sum()
    }
}
