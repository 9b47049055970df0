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

//! Correlating runtime events to the extrinsics that produced them.
//!

use crate::types::*;

/// Merge a block's events onto its extrinsics by execution phase and
/// assemble the result into a [`BlockRecord`].
///
/// An event matches the extrinsic at position `i` exactly when its phase is
/// `ApplyExtrinsic(i)`; block-level (initialization/finalization) events
/// match nothing and are dropped. Extrinsics left without a single matched
/// event are filtered out, not persisted. The block itself is always kept,
/// even when every extrinsic was filtered.
pub fn merge_block(
    block_number: BlockNumber,
    block_hash: String,
    extrinsics: Vec<DecodedExtrinsic>,
    events: Vec<DecodedEvent>,
) -> BlockRecord {
    let extrinsics = extrinsics
        .into_iter()
        .filter_map(|ext| {
            let matched: Vec<EventRecord> = events
                .iter()
                .filter(|ev| ev.phase == EventPhase::ApplyExtrinsic(ext.index))
                .map(|ev| EventRecord {
                    pallet: ev.pallet.clone(),
                    event: ev.event.clone(),
                    data: ev.data.clone(),
                })
                .collect();

            if matched.is_empty() {
                return None;
            }

            Some(ExtrinsicRecord {
                block_number,
                index: ext.index,
                tx_hash: ext.tx_hash,
                extrinsic: ExtrinsicBody {
                    pallet: ext.pallet,
                    call: ext.call,
                    fields: ext.fields,
                    events: matched,
                },
            })
        })
        .collect();

    BlockRecord {
        block_number,
        block_hash,
        extrinsics,
    }
}
