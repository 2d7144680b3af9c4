use clap::Parser;

use framefetch_lib::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    framefetch_lib::run(ServerConfig::parse()).await
}
