// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Durable records for harvest: checkpoints, item lists, heal sessions, contacts.
//!
//! Every record is a standalone JSON file so a successor process (or an
//! operator) can read it without any live process holding state.

mod checkpoint;
mod contacts;
mod fsutil;
mod heal;

pub use checkpoint::{
    enumeration_list_ref, remainder_list_ref, CheckpointError, CheckpointStore,
    FileCheckpointStore, CURRENT_CHECKPOINT_VERSION,
};
pub use contacts::{ContactLog, ContactLogError};
pub use heal::{AutoApprovePolicy, HealStore, HealStoreError};
