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

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// the type to represent a block number
pub type BlockNumber = u32;

/// The execution phase a runtime event was recorded in.
///
/// Only `ApplyExtrinsic` events belong to an extrinsic; initialization and
/// finalization events are block-level and never attach to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPhase {
    /// Recorded while applying the extrinsic at this index.
    ApplyExtrinsic(u32),
    /// Recorded while finalizing the block.
    Finalization,
    /// Recorded while initializing the block.
    Initialization,
}

/// One extrinsic rendered into human-readable form, before event matching.
#[derive(Debug, Clone)]
pub struct DecodedExtrinsic {
    /// Position within the block.
    pub index: u32,
    pub tx_hash: String,
    /// The pallet name, also known as section.
    pub pallet: String,
    /// The call name, also known as method.
    pub call: String,
    /// Decoded call arguments.
    pub fields: Value,
}

/// One runtime event rendered into human-readable form.
#[derive(Debug, Clone)]
pub struct DecodedEvent {
    pub phase: EventPhase,
    pub pallet: String,
    pub event: String,
    /// Decoded event fields.
    pub data: Value,
}

/// A runtime event attached to an extrinsic, as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub pallet: String,
    pub event: String,
    pub data: Value,
}

/// The call payload of a persisted extrinsic, merged with its events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtrinsicBody {
    pub pallet: String,
    pub call: String,
    pub fields: Value,
    pub events: Vec<EventRecord>,
}

/// An extrinsic retained in a block record.
///
/// Only constructed when at least one event matched the extrinsic's
/// execution phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtrinsicRecord {
    pub block_number: BlockNumber,
    /// Position within the block.
    pub index: u32,
    pub tx_hash: String,
    pub extrinsic: ExtrinsicBody,
}

/// One processed block, the unit the record log stores.
///
/// Built once per block and never mutated afterwards. A block whose
/// extrinsics all lacked events still yields a record with an empty
/// `extrinsics` sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRecord {
    pub block_number: BlockNumber,
    pub block_hash: String,
    pub extrinsics: Vec<ExtrinsicRecord>,
}
