//  Copyright 2024 Warren Project Authors
//
//  Licensed under the Apache License, Version 2.0 (the "License");
//  you may not use this file except in compliance with the License.
//  You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.

mod dispatch;
mod protocol;
mod server;

use std::path::PathBuf;

use clap::Parser;
use warren_common::config::ServerConfig;

#[derive(Debug, Parser)]
#[command(name = "warren-server", about = "A single-threaded in-memory key/value collection server")]
struct Cli {
    /// Path to a TOML config file. CLI flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    bind: Option<String>,

    #[arg(long)]
    port: Option<u16>,
}

fn load_config(cli: &Cli) -> anyhow::Result<ServerConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            toml::from_str(&text)?
        }
        None => ServerConfig::default(),
    };
    if let Some(bind) = &cli.bind {
        config.bind = bind.clone();
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    warren_common::logging::init();
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    runtime.block_on(server::run(config))
}
