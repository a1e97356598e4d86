//! HTTP adapters: the REST API client and the asset downloader.

pub mod client;
pub mod download;
pub mod transport;

pub use client::FigmaClient;
pub use download::HttpDownloader;
pub use transport::Transport;
