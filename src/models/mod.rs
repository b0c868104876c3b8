// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod meeting;
pub mod party;

pub use meeting::{Meeting, MeetingPatch, MeetingStatus, Partition, PartyRole};
pub use party::{OAuthCredential, PartyRecord};
