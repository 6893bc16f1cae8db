use crate::error::Result;
pub use clap::Parser;
use url::Url;

#[derive(Debug, Clone, clap::Parser)]
pub struct ServerConfig {
    #[arg(
        short,
        long,
        default_value_t = 3000,
        env = "FILMES_LISTEN_PORT",
        help = "Port to listen on"
    )]
    pub port: u16,

    #[arg(
        short,
        long,
        default_value = "127.0.0.1",
        env = "FILMES_LISTEN_ADDRESS",
        help = "Address to listen on"
    )]
    pub listen_address: String,

    #[arg(
        long,
        env = "FILMES_BASE_URL",
        default_value = "http://localhost:3000",
        help = "Base URL of the server as visible to clients, used for Location headers"
    )]
    pub base_url: Url,

    #[arg(
        long,
        env = "FILMES_DATABASE_URL",
        default_value = "sqlite://filmes.db?mode=rwc",
        help = "Database URL e.g. sqlite://file.db or sqlite::memory:"
    )]
    database_url: String,

    #[arg(long, env = "FILMES_CORS", help = "Enable permissive CORS")]
    pub cors: bool,
}

impl ServerConfig {
    pub fn load() -> Result<Self> {
        ServerConfig::try_parse().map_err(|e| e.into())
    }

    pub fn database_url(&self) -> String {
        self.database_url.clone()
    }
}
