//! Label-keyed registry of host buffers.
//!
//! [`BufferRegistry`] owns every host buffer the exchange graph refers
//! to during one cycle. Buffers are grouped by label: the first buffer
//! in a group is the one registered with [`set`](BufferRegistry::set),
//! further ones (masks, coordinates, attribute arrays) are attached to
//! it. [`clear`](BufferRegistry::clear) is the only point where buffer
//! lifetime ends for a cycle.

use std::sync::Arc;

use indexmap::IndexMap;
use smallvec::SmallVec;

use situ_core::Label;

use crate::buffer::HostBuffer;
use crate::error::ArenaError;
use crate::handle::BufferHandle;

/// Owner of all host buffers referenced by one cycle's exchange graph.
///
/// Single-threaded; the orchestrator holds it by value.
#[derive(Debug)]
pub struct BufferRegistry {
    epoch: u32,
    slots: Vec<Option<Arc<HostBuffer>>>,
    labels: IndexMap<Label, SmallVec<[u32; 4]>>,
    fenced: bool,
}

impl BufferRegistry {
    /// Create an empty registry at epoch 0.
    pub fn new() -> Self {
        Self {
            epoch: 0,
            slots: Vec::new(),
            labels: IndexMap::new(),
            fenced: true,
        }
    }

    /// Register `buffer` as the primary buffer for `label`.
    ///
    /// Any buffers previously registered under `label` are released and
    /// their handles stop resolving.
    pub fn set(&mut self, label: impl Into<Label>, buffer: impl Into<Arc<HostBuffer>>) -> BufferHandle {
        let label = label.into();
        if let Some(old) = self.labels.get(&label) {
            for &slot in old {
                self.slots[slot as usize] = None;
            }
        }
        let handle = self.push_slot(buffer.into());
        let mut group = SmallVec::new();
        group.push(handle.slot);
        self.labels.insert(label, group);
        handle
    }

    /// Attach an auxiliary buffer to an existing label group.
    pub fn attach(
        &mut self,
        label: &str,
        buffer: impl Into<Arc<HostBuffer>>,
    ) -> Result<BufferHandle, ArenaError> {
        if !self.labels.contains_key(label) {
            return Err(ArenaError::UnknownLabel {
                label: Label::from(label),
            });
        }
        let handle = self.push_slot(buffer.into());
        if let Some(group) = self.labels.get_mut(label) {
            group.push(handle.slot);
        }
        Ok(handle)
    }

    /// A scope that attaches buffers under `label`.
    ///
    /// Fails if nothing has been [`set`](Self::set) for `label` yet.
    pub fn scope(&mut self, label: &str) -> Result<BufferScope<'_>, ArenaError> {
        let label = match self.labels.get_key_value(label) {
            Some((key, _)) => key.clone(),
            None => {
                return Err(ArenaError::UnknownLabel {
                    label: Label::from(label),
                })
            }
        };
        Ok(BufferScope {
            registry: self,
            label,
        })
    }

    /// Whether `label` has been marshaled this cycle.
    pub fn contains(&self, label: &str) -> bool {
        self.labels.contains_key(label)
    }

    /// Resolve a handle to its buffer.
    pub fn resolve(&self, handle: BufferHandle) -> Result<&Arc<HostBuffer>, ArenaError> {
        if handle.epoch != self.epoch {
            return Err(ArenaError::StaleHandle {
                handle_epoch: handle.epoch,
                current: self.epoch,
            });
        }
        self.slots
            .get(handle.slot as usize)
            .and_then(Option::as_ref)
            .ok_or(ArenaError::ReleasedSlot { handle })
    }

    /// Handles of every buffer registered under `label`, primary first.
    pub fn handles(&self, label: &str) -> Vec<BufferHandle> {
        self.labels
            .get(label)
            .map(|group| {
                group
                    .iter()
                    .map(|&slot| BufferHandle::new(self.epoch, slot))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Labels in registration order.
    pub fn labels(&self) -> impl Iterator<Item = &Label> {
        self.labels.keys()
    }

    /// Mark all staged transfers as complete.
    ///
    /// Transfers in this crate are synchronous, so fencing only records
    /// that no further writes will be staged before the backend reads.
    pub fn fence(&mut self) {
        self.fenced = true;
    }

    /// Whether the registry has been fenced since the last registration.
    pub fn is_fenced(&self) -> bool {
        self.fenced
    }

    /// `Ok` if fenced, [`ArenaError::NotFenced`] otherwise.
    pub fn ensure_fenced(&self) -> Result<(), ArenaError> {
        if self.fenced {
            Ok(())
        } else {
            Err(ArenaError::NotFenced)
        }
    }

    /// Release every buffer and start a new epoch.
    pub fn clear(&mut self) {
        let released = self.len();
        self.slots.clear();
        self.labels.clear();
        self.epoch = self.epoch.wrapping_add(1);
        self.fenced = true;
        tracing::trace!(released, epoch = self.epoch, "buffer registry cleared");
    }

    /// Current epoch.
    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    /// Number of live buffers.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Whether no buffers are live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of registered labels.
    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    /// Total bytes held by live buffers.
    pub fn total_bytes(&self) -> usize {
        self.slots.iter().flatten().map(|b| b.byte_len()).sum()
    }

    fn push_slot(&mut self, buffer: Arc<HostBuffer>) -> BufferHandle {
        let slot = self.slots.len() as u32;
        self.slots.push(Some(buffer));
        self.fenced = false;
        BufferHandle::new(self.epoch, slot)
    }
}

impl Default for BufferRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Attaches buffers under one label.
///
/// Handed to particle attribute hooks so they can register their own
/// host copies without seeing the rest of the registry.
#[derive(Debug)]
pub struct BufferScope<'r> {
    registry: &'r mut BufferRegistry,
    label: Label,
}

impl BufferScope<'_> {
    /// The label buffers are attached under.
    pub fn label(&self) -> &Label {
        &self.label
    }

    /// Attach a buffer under this scope's label.
    pub fn attach(&mut self, buffer: impl Into<Arc<HostBuffer>>) -> BufferHandle {
        let handle = self.registry.push_slot(buffer.into());
        if let Some(group) = self.registry.labels.get_mut(&self.label) {
            group.push(handle.slot);
        }
        handle
    }
}
