//! # Flare Message Center 入口

use anyhow::Result;
use flare_message_center::ApplicationBootstrap;

#[tokio::main]
async fn main() -> Result<()> {
    // 配置路径可通过 FLARE_CONFIG 指定，默认依次尝试 config/ 与 config.toml
    let config_path = std::env::var("FLARE_CONFIG").ok();
    ApplicationBootstrap::run(config_path.as_deref()).await
}
