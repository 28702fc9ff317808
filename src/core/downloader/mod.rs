mod cache;
mod client;
mod lock;
mod transport;

pub use cache::{ArtifactCache, CachedArtifact};
pub use client::ArtifactFetcher;
pub use transport::Transport;
