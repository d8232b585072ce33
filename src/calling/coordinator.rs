//! Call session coordination.
//!
//! Two clients rendezvous on a single signaling record per room. The caller
//! writes `{kind, active: true}` and pushes an invite; the callee observes
//! the record and attaches to the media channel named after the room. Either
//! side ends the call by flipping `active` to false, and every observer
//! treats that as an unconditional teardown signal. Writes are
//! last-write-wins: both sides re-derive their state from what they observe,
//! never from having been the writer.

use std::sync::Arc;
use std::time::Duration;

use crate::calling::device::{ensure_devices, DeviceProbe};
use crate::calling::rtc::MediaChannel;
use crate::chat::room::room_id;
use crate::error::ChatError;
use crate::models::{CallKind, CallSession, Participant};
use crate::push::{Notify, PushPayload};
use crate::store::watch::{poll_watch, Feed};
use crate::store::DocumentStore;

/// Per-room call lifecycle. `Ringing -> Active` is implicit: there is no
/// answered flag, both clients move to in-call when they attach to the
/// channel. `Ended -> Idle` is implicit too; a new call writes a fresh
/// record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Idle,
    Ringing,
    Active,
    Ended,
}

/// What a watcher observes on the signaling record.
#[derive(Debug, Clone, PartialEq)]
pub enum CallSignal {
    /// An active record exists; attach to the media channel to take the call.
    Incoming(CallSession),
    /// No active record. Leave the media channel and reset to idle.
    Clear,
}

pub type CallFeed = Feed<CallSignal>;

pub struct CallCoordinator {
    store: Arc<dyn DocumentStore>,
    notifier: Arc<dyn Notify>,
    media: Arc<dyn MediaChannel>,
    devices: Arc<dyn DeviceProbe>,
    poll_interval: Duration,
}

impl CallCoordinator {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        notifier: Arc<dyn Notify>,
        media: Arc<dyn MediaChannel>,
        devices: Arc<dyn DeviceProbe>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            store,
            notifier,
            media,
            devices,
            poll_interval,
        }
    }

    /// Start a call with `callee`, or join the one already ringing in this
    /// room. Device checks run before anything is written. Returns the
    /// session in effect, which may carry a different kind than requested
    /// when joining an existing call.
    pub async fn start_call(
        &self,
        caller: &Participant,
        callee: &str,
        kind: CallKind,
    ) -> Result<CallSession, ChatError> {
        ensure_devices(kind, self.devices.as_ref())?;
        let room = room_id(&caller.id, callee)?;

        // Check-then-write: a concurrent second call must join, not replace.
        // The store offers no compare-and-set here, so a small race window
        // remains and last write wins.
        if let Some(existing) = self.store.call_session(&room).await? {
            if existing.active {
                tracing::info!("call already active in {}, joining it", room);
                self.media.join(&room).await?;
                return Ok(existing);
            }
        }

        let session = CallSession { kind, active: true };
        self.store.put_call_session(&room, &session).await?;

        let payload = PushPayload::Call {
            room_id: room.clone(),
            call_kind: kind,
            caller_id: caller.id.clone(),
            caller_name: caller.display_name.clone(),
        };
        let body = match kind {
            CallKind::Audio => "Incoming voice call",
            CallKind::Video => "Incoming video call",
        };
        // The record is already durable; the callee can still discover the
        // call without the push, so dispatch failure is not fatal.
        if let Err(e) = self
            .notifier
            .notify(callee, &caller.display_name, body, &payload)
            .await
        {
            tracing::warn!("call invite dispatch failed: {}", e);
        }

        self.media.join(&room).await?;
        Ok(session)
    }

    /// Attach to the ringing call in a room, as the callee. `None` means no
    /// call is ringing there; it is an ordinary outcome, not a store failure.
    pub async fn join_call(&self, room: &str) -> Result<Option<CallSession>, ChatError> {
        let Some(session) = self.store.call_session(room).await?.filter(|s| s.active) else {
            return Ok(None);
        };
        ensure_devices(session.kind, self.devices.as_ref())?;
        self.media.join(room).await?;
        Ok(Some(session))
    }

    /// Flip the room's record inactive and detach from the media channel.
    /// Idempotent: ending an already-ended call rewrites `active: false` and
    /// succeeds. A room that never had a call is left without a record, so
    /// ending it writes nothing and the room stays idle.
    pub async fn end_call(&self, room: &str) -> Result<(), ChatError> {
        if let Some(session) = self.store.call_session(room).await? {
            self.store
                .put_call_session(
                    room,
                    &CallSession {
                        kind: session.kind,
                        active: false,
                    },
                )
                .await?;
            tracing::info!("call in {} ended", room);
        }
        self.media.leave().await?;
        Ok(())
    }

    /// Coarse state of a room's record. The record alone cannot tell ringing
    /// from in-call (there is no answered flag), so an active record reads
    /// as `Ringing`; clients refine it to `Active` once they attach to the
    /// media channel.
    pub async fn call_state(&self, room: &str) -> Result<CallState, ChatError> {
        Ok(match self.store.call_session(room).await? {
            None => CallState::Idle,
            Some(session) if session.active => CallState::Ringing,
            Some(_) => CallState::Ended,
        })
    }

    /// Live view of the room's signaling record. Emits `Incoming` when an
    /// active record appears and `Clear` when it goes inactive (or was never
    /// there); consumers must treat `Clear` as teardown regardless of who
    /// flipped the record.
    pub fn watch(&self, room: &str) -> CallFeed {
        let store = self.store.clone();
        let room = room.to_string();
        poll_watch(self.poll_interval, move || {
            let store = store.clone();
            let room = room.clone();
            async move {
                Ok(match store.call_session(&room).await? {
                    Some(session) if session.active => CallSignal::Incoming(session),
                    _ => CallSignal::Clear,
                })
            }
        })
    }
}
