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

//! Fixture builders for harvester tests: pre-decoded extrinsics and events
//! shaped like the ones a live chain produces.

use harvester_core::merge::merge_block;
use harvester_core::types::{
    BlockNumber, BlockRecord, DecodedEvent, DecodedExtrinsic, EventPhase,
};
use serde_json::json;

/// A balance transfer extrinsic at the given position.
pub fn transfer_extrinsic(index: u32) -> DecodedExtrinsic {
    DecodedExtrinsic {
        index,
        tx_hash: format!("0x{index:064x}"),
        pallet: "Balances".into(),
        call: "transfer_allow_death".into(),
        fields: json!({
            "dest": { "Id": "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY" },
            "value": "1000000000000"
        }),
    }
}

/// The inherent timestamp extrinsic, which typically gets no events.
pub fn timestamp_extrinsic(index: u32) -> DecodedExtrinsic {
    DecodedExtrinsic {
        index,
        tx_hash: format!("0x{index:064x}"),
        pallet: "Timestamp".into(),
        call: "set".into(),
        fields: json!({ "now": "1722470406000" }),
    }
}

/// A `Balances.Transfer` event applied during the extrinsic at `index`.
pub fn transfer_event(index: u32) -> DecodedEvent {
    DecodedEvent {
        phase: EventPhase::ApplyExtrinsic(index),
        pallet: "Balances".into(),
        event: "Transfer".into(),
        data: json!({
            "from": "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY",
            "to": "5FHneW46xGXgs5mUiveU4sbTyGBzmstUspZC92UhjJM694ty",
            "amount": "1000000000000"
        }),
    }
}

/// A fee payment event applied during the extrinsic at `index`.
pub fn fee_paid_event(index: u32) -> DecodedEvent {
    DecodedEvent {
        phase: EventPhase::ApplyExtrinsic(index),
        pallet: "TransactionPayment".into(),
        event: "TransactionFeePaid".into(),
        data: json!({
            "who": "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY",
            "actual_fee": "125000000",
            "tip": "0"
        }),
    }
}

/// A block-level event from the finalization phase.
pub fn finalization_event() -> DecodedEvent {
    DecodedEvent {
        phase: EventPhase::Finalization,
        pallet: "Session".into(),
        event: "NewSession".into(),
        data: json!({ "session_index": 42 }),
    }
}

/// A block-level event from the initialization phase.
pub fn initialization_event() -> DecodedEvent {
    DecodedEvent {
        phase: EventPhase::Initialization,
        pallet: "System".into(),
        event: "NewAccount".into(),
        data: json!({ "account": "5FHneW46xGXgs5mUiveU4sbTyGBzmstUspZC92UhjJM694ty" }),
    }
}

/// A fully merged record for `height`: a timestamp inherent with no events
/// (filtered) and one transfer with its two events (retained).
pub fn sample_block_record(height: BlockNumber) -> BlockRecord {
    merge_block(
        height,
        format!("0x{height:064x}"),
        vec![timestamp_extrinsic(0), transfer_extrinsic(1)],
        vec![
            initialization_event(),
            transfer_event(1),
            fee_paid_event(1),
            finalization_event(),
        ],
    )
}
