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

//! Node-facing half of the harvester: connects to a chain over subxt,
//! renders blocks and events into their human-readable form, and drives
//! the backfill-then-subscribe harvest loop.

use futures::StreamExt;
use harvester_core::store::StoreError;
use harvester_core::types::{DecodedEvent, DecodedExtrinsic, EventPhase};
use subxt::backend::legacy::{rpc_methods::NumberOrHex, LegacyRpcMethods};
use subxt::backend::rpc::RpcClient;
use subxt::blocks::Extrinsics;
use subxt::client::OnlineClient;
use subxt::config::{Hasher, SubstrateConfig};
use subxt::events::{Events, Phase};
use subxt::ext::scale_value::Composite;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub use harvester_core::merge::merge_block;
pub use harvester_core::store::RecordLog;
pub use harvester_core::types::{BlockNumber, BlockRecord};

/// The default chain endpoint.
///
/// A node pruning historical state cannot serve the full backfill; point at
/// an archive node when harvesting from genesis.
pub const DEFAULT_NODE_URL: &str = "wss://commune.api.onfinality.io/public-ws";

/// The height backfill starts from when the record log is empty.
pub const GENESIS_HEIGHT: BlockNumber = 22_576;

/// New-head heights buffered between the subscription and the worker.
const NEW_BLOCK_QUEUE_DEPTH: usize = 64;

#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("rpc failure: {0}")]
    Rpc(#[from] subxt::Error),
    #[error("no block hash known for height {0}")]
    UnknownBlock(BlockNumber),
    #[error("could not render decoded value: {0}")]
    Render(#[from] serde_json::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("new block subscription terminated")]
    SubscriptionClosed,
}

/// Async connection to the chain node
/// if successful then returns the block client and the legacy rpc methods
/// else error if unreachable
pub async fn connect(
    url: &str,
) -> Result<(OnlineClient<SubstrateConfig>, LegacyRpcMethods<SubstrateConfig>), HarvestError> {
    let rpc_client = RpcClient::from_url(url).await?;
    let client = OnlineClient::<SubstrateConfig>::from_rpc_client(rpc_client.clone()).await?;
    let rpc = LegacyRpcMethods::<SubstrateConfig>::new(rpc_client);
    info!(url, "rpc connection established");
    Ok((client, rpc))
}

/// Fetches blocks one height at a time and appends the merged records to
/// the log. Backfills from the resume height to the chain head, then keeps
/// harvesting every newly produced block.
pub struct Harvester {
    client: OnlineClient<SubstrateConfig>,
    rpc: LegacyRpcMethods<SubstrateConfig>,
    store: RecordLog,
}

impl Harvester {
    pub fn new(
        client: OnlineClient<SubstrateConfig>,
        rpc: LegacyRpcMethods<SubstrateConfig>,
        store: RecordLog,
    ) -> Self {
        Harvester { client, rpc, store }
    }

    /// Fetch, merge and persist a single block.
    ///
    /// Every failure surfaces here; the caller decides whether to skip the
    /// height or abort.
    pub async fn process_block(&mut self, height: BlockNumber) -> Result<(), HarvestError> {
        let hash = self
            .rpc
            .chain_get_block_hash(Some(NumberOrHex::Number(height.into())))
            .await?
            .ok_or(HarvestError::UnknownBlock(height))?;

        let block = self.client.blocks().at(hash).await?;
        let extrinsics = decode_extrinsics(&block.extrinsics().await?)?;
        let events = decode_events(&block.events().await?)?;

        let record = merge_block(height, format!("{hash:?}"), extrinsics, events);
        debug!(
            height,
            extrinsics = record.extrinsics.len(),
            "harvested block"
        );
        self.store.append(&record)?;
        Ok(())
    }

    /// Backfill every height from the resume point to the current chain
    /// head, then follow new blocks until the subscription dies.
    ///
    /// Failed blocks are logged and skipped; the loop keeps going. Gaps are
    /// visible afterwards as missing heights in the record log.
    pub async fn run(&mut self, genesis: BlockNumber) -> Result<(), HarvestError> {
        let head = self.client.blocks().at_latest().await?.header().number;
        let start = start_height(genesis, self.store.last_height()?);

        info!(start, head, "backfilling historical blocks");
        for height in start..=head {
            if let Err(error) = self.process_block(height).await {
                warn!(height, %error, "skipping block");
            }
        }

        info!("backfill complete, following new blocks");
        let mut subscription = self.client.blocks().subscribe_best().await?;
        let (queue, mut heights) = mpsc::channel::<BlockNumber>(NEW_BLOCK_QUEUE_DEPTH);

        // The producer only enqueues heights; all fetching and log appends
        // stay on this task, so live notifications can never interleave
        // their read-modify-write cycles.
        tokio::spawn(async move {
            while let Some(next) = subscription.next().await {
                match next {
                    Ok(block) => {
                        if queue.send(block.header().number).await.is_err() {
                            break;
                        }
                    }
                    Err(error) => warn!(%error, "new block notification failed"),
                }
            }
        });

        while let Some(height) = heights.recv().await {
            if let Err(error) = self.process_block(height).await {
                warn!(height, %error, "skipping block");
            }
        }

        Err(HarvestError::SubscriptionClosed)
    }
}

/// Where backfill begins: one past the highest recorded height, never below
/// genesis.
fn start_height(genesis: BlockNumber, last_recorded: Option<BlockNumber>) -> BlockNumber {
    match last_recorded {
        Some(last) => genesis.max(last + 1),
        None => genesis,
    }
}

fn decode_extrinsics(
    extrinsics: &Extrinsics<SubstrateConfig, OnlineClient<SubstrateConfig>>,
) -> Result<Vec<DecodedExtrinsic>, HarvestError> {
    let mut decoded = Vec::new();
    for details in extrinsics.iter() {
        let details = details?;
        let Ok(meta) = details.extrinsic_metadata() else {
            // Without the pallet and call name there is nothing useful to
            // persist for this extrinsic.
            warn!(index = details.index(), "extrinsic pallet/call unavailable, skipping");
            continue;
        };
        let fields = details.field_values().unwrap_or_else(|_| {
            warn!(
                index = details.index(),
                pallet = meta.pallet.name(),
                call = %meta.variant.name,
                "extrinsic fields unavailable"
            );
            Composite::unnamed(Vec::new())
        });
        let tx_hash = <SubstrateConfig as subxt::Config>::Hasher::hash(details.bytes());
        decoded.push(DecodedExtrinsic {
            index: details.index(),
            tx_hash: format!("{tx_hash:?}"),
            pallet: meta.pallet.name().to_string(),
            call: meta.variant.name.to_string(),
            fields: serde_json::to_value(&fields)?,
        });
    }
    Ok(decoded)
}

fn decode_events(events: &Events<SubstrateConfig>) -> Result<Vec<DecodedEvent>, HarvestError> {
    let mut decoded = Vec::new();
    for details in events.iter() {
        let details = details?;
        let data = match details.field_values() {
            Ok(values) => serde_json::to_value(&values)?,
            Err(_) => {
                warn!(
                    pallet = details.pallet_name(),
                    event = details.variant_name(),
                    "event fields unavailable"
                );
                serde_json::Value::Null
            }
        };
        decoded.push(DecodedEvent {
            phase: convert_phase(details.phase()),
            pallet: details.pallet_name().to_string(),
            event: details.variant_name().to_string(),
            data,
        });
    }
    Ok(decoded)
}

fn convert_phase(phase: Phase) -> EventPhase {
    match phase {
        Phase::ApplyExtrinsic(index) => EventPhase::ApplyExtrinsic(index),
        Phase::Finalization => EventPhase::Finalization,
        Phase::Initialization => EventPhase::Initialization,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harvester_test_utils::{sample_block_record, transfer_event, transfer_extrinsic};

    #[test]
    fn it_resumes_past_recorded_heights() {
        assert_eq!(start_height(GENESIS_HEIGHT, None), GENESIS_HEIGHT);
        assert_eq!(start_height(100, Some(250)), 251);
        // a log populated below genesis never pulls the start backwards
        assert_eq!(start_height(100, Some(40)), 100);
    }

    #[test]
    fn it_converts_every_subxt_phase() {
        assert_eq!(
            convert_phase(Phase::ApplyExtrinsic(3)),
            EventPhase::ApplyExtrinsic(3)
        );
        assert_eq!(convert_phase(Phase::Finalization), EventPhase::Finalization);
        assert_eq!(
            convert_phase(Phase::Initialization),
            EventPhase::Initialization
        );
    }

    #[test]
    fn merged_records_keep_the_legacy_json_key_shape() {
        let record = sample_block_record(100);
        let json = serde_json::to_value(&record).unwrap();

        assert!(json.get("blockNumber").is_some());
        assert!(json.get("blockHash").is_some());
        let ext = &json["extrinsics"][0];
        assert!(ext.get("blockNumber").is_some());
        assert!(ext.get("txHash").is_some());
        assert!(ext["extrinsic"]["events"].is_array());
    }

    #[test]
    fn it_round_trips_a_merged_record_through_the_log() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = RecordLog::open(dir.path().join("extrinsics.jsonl")).unwrap();

        let record = merge_block(
            GENESIS_HEIGHT,
            "0xabc".into(),
            vec![transfer_extrinsic(0)],
            vec![transfer_event(0)],
        );
        log.append(&record).unwrap();

        let records = log.read_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0], record);
        assert_eq!(log.last_height().unwrap(), Some(GENESIS_HEIGHT));
    }
}
