// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The status-document subsystem: parsing and serializing the indented
//! checklist wire format, the virtual-ID-addressed tree with its CRUD and
//! invariant layer, and on-disk custody of the file via a content-hash
//! sidecar and rotated backups.

pub mod document;
pub mod error;
pub mod integrity;
pub mod tree;

pub use document::{Status, StatusDocument, Task};
pub use error::{StatusError, StatusResult};
pub use integrity::IntegrityStore;
pub use tree::StatusTree;
