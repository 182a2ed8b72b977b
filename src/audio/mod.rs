//! # Audio Module
//!
//! Per-guild playback orchestration for Muse.
//!
//! ## Architecture
//!
//! ### [`queue`] - Queue
//! - Strict FIFO of resolved songs with front insertion ("play next")
//! - Uniform shuffle of the remaining entries with an injected RNG
//!
//! ### [`player`] - Playback Session
//! - Idle / playing / paused / stopped state machine
//! - Owns the queue, the current song and the voice handle
//! - Auto-advance on stream completion guarded by a generation counter,
//!   `stop()` bumps an epoch that invalidates in-flight resolutions
//!
//! ### [`voice`] - Voice Transport
//! - `join` / `play_stream` / `leave` seam between sessions and Discord
//! - [`voice::SongbirdTransport`] streams yt-dlp and HTTP inputs through songbird
//!
//! ### [`manager`] - Session Registry
//! - One session per guild, created lazily in a sharded concurrent map
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! let registry = SessionRegistry::new(transport, config.max_queue_size);
//! let session = registry.get(guild_id);
//!
//! session.add(songs, AddOptions::default()).await?;
//! session.connect(channel_id).await?;
//! session.play().await?;
//! ```

pub mod manager;
pub mod player;
pub mod queue;
pub mod voice;
