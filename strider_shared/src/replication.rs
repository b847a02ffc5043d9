//! Field replication.
//!
//! Replicated state travels as explicit `(character, field, value)` updates.
//! The owning instance queues them in a [`ReplicationOutbox`]; a transport
//! drains the queue once per tick. Delivery is best effort: a lost update only
//! means a stale value until the next one.

use std::collections::VecDeque;

use async_trait::async_trait;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Identifies a replicated character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CharacterId(pub u32);

/// Replicated field identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldId {
    ForwardAmount,
}

impl FieldId {
    pub const ALL: [FieldId; 1] = [FieldId::ForwardAmount];

    pub fn flag(self) -> ReplicatedFields {
        match self {
            FieldId::ForwardAmount => ReplicatedFields::FORWARD_AMOUNT,
        }
    }
}

bitflags! {
    /// Set of fields, e.g. the ones changed since the last broadcast.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ReplicatedFields: u8 {
        const FORWARD_AMOUNT = 1 << 0;
    }
}

/// One field value for one character.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldUpdate {
    pub character: CharacterId,
    pub field: FieldId,
    pub value: f32,
}

/// Pending outbound updates. A newer value for the same field replaces the
/// queued one.
#[derive(Debug, Default)]
pub struct ReplicationOutbox {
    pending: VecDeque<FieldUpdate>,
}

impl ReplicationOutbox {
    pub fn push(&mut self, update: FieldUpdate) {
        if let Some(queued) = self
            .pending
            .iter_mut()
            .find(|u| u.character == update.character && u.field == update.field)
        {
            queued.value = update.value;
        } else {
            self.pending.push_back(update);
        }
    }

    pub fn drain(&mut self) -> impl Iterator<Item = FieldUpdate> + '_ {
        self.pending.drain(..)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Sends field-set requests toward the authority relay.
#[async_trait]
pub trait ReplicationTransport: Send + Sync {
    async fn send_update(&self, update: FieldUpdate) -> anyhow::Result<()>;
}

/// Drains `outbox` through `transport`, returning how many updates were sent.
pub async fn flush_outbox(
    outbox: &mut ReplicationOutbox,
    transport: &dyn ReplicationTransport,
) -> anyhow::Result<usize> {
    let updates: Vec<FieldUpdate> = outbox.drain().collect();
    for update in &updates {
        transport.send_update(*update).await?;
    }
    Ok(updates.len())
}
