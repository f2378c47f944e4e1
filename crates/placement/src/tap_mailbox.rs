//! Single-slot tap mailbox.
//!
//! Input arrives from whatever context the host delivers it on. The latest
//! tap overwrites any unconsumed one and the frame loop drains at most one
//! per cycle. Clones share the slot, so a host thread can keep its own copy.

use std::sync::Arc;

use bevy::prelude::*;
use parking_lot::Mutex;

use crate::frame::Tap;

#[derive(Resource, Clone, Default)]
pub struct TapMailbox {
    slot: Arc<Mutex<Option<Tap>>>,
}

impl TapMailbox {
    /// Store `tap`. Returns `true` if it replaced a tap nobody drained.
    pub fn post(&self, tap: Tap) -> bool {
        self.slot.lock().replace(tap).is_some()
    }

    pub fn take(&self) -> Option<Tap> {
        self.slot.lock().take()
    }

    pub fn is_pending(&self) -> bool {
        self.slot.lock().is_some()
    }
}
