/*
 * Copyright 2025 by Block Harvester Contributors
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */
use clap::Parser;
use harvester_lib::{
    connect, BlockNumber, Harvester, RecordLog, DEFAULT_NODE_URL, GENESIS_HEIGHT,
};
use std::path::PathBuf;

/// the record log file location
/// in future, make configurable per network
pub const STORE_FILEPATH: &str = "extrinsics.jsonl";

/// Command line
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Websocket endpoint of the chain node; full backfill needs a node
    /// retaining historical state (archive pruning)
    #[arg(long, default_value = DEFAULT_NODE_URL)]
    url: String,
    /// Height to start backfilling from when the record log is empty
    #[arg(long, default_value_t = GENESIS_HEIGHT)]
    genesis: BlockNumber,
    /// Record log path
    #[arg(long, default_value = STORE_FILEPATH)]
    store: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = tracing_subscriber::EnvFilter::builder().parse_lossy(
        std::env::var(tracing_subscriber::EnvFilter::DEFAULT_ENV)
            .unwrap_or("info".to_string()),
    );
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .compact()
        .init();

    let cli = Cli::parse();

    let (client, rpc) = connect(&cli.url).await?;
    let store = RecordLog::open(&cli.store)?;

    let mut harvester = Harvester::new(client, rpc, store);
    harvester.run(cli.genesis).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_runs_parameterless_with_the_compiled_in_defaults() {
        let cli = Cli::parse_from(["harvester"]);
        assert_eq!(cli.url, DEFAULT_NODE_URL);
        assert_eq!(cli.genesis, GENESIS_HEIGHT);
        assert_eq!(cli.store, PathBuf::from(STORE_FILEPATH));
    }

    #[test]
    fn it_accepts_overrides() {
        let cli = Cli::parse_from([
            "harvester",
            "--url",
            "ws://localhost:9944",
            "--genesis",
            "0",
            "--store",
            "/tmp/records.jsonl",
        ]);
        assert_eq!(cli.url, "ws://localhost:9944");
        assert_eq!(cli.genesis, 0);
        assert_eq!(cli.store, PathBuf::from("/tmp/records.jsonl"));
    }
}
