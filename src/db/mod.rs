// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Local persistence.

pub mod session_store;

pub use session_store::{FileSessionStore, MemorySessionStore, SessionStore, StoredSession};
