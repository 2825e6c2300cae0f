//! Label-keyed registry of heterogeneous entries.
//!
//! [`EntryRegistry`] holds borrows of simulation state in insertion
//! order. Consumers walk it with an [`EntryVisitor`], which has one
//! callback per category; a visitor that does not care about a category
//! leaves the default no-op in place.

use indexmap::map::Entry as MapEntry;
use indexmap::IndexMap;

use situ_core::Label;

use crate::entry::{Entry, ScalarSlot};
use crate::field::FieldSource;
use crate::particle::ParticleSource;

/// Per-category callbacks invoked by [`EntryRegistry::for_each`].
pub trait EntryVisitor {
    /// Error that aborts the walk.
    type Error;

    /// Called for every scalar entry.
    fn visit_scalar(&mut self, _label: &Label, _slot: &mut ScalarSlot<'_>) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Called for every particle entry.
    fn visit_particles(
        &mut self,
        _label: &Label,
        _particles: &dyn ParticleSource,
    ) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Called for every field entry.
    fn visit_field(&mut self, _label: &Label, _field: &dyn FieldSource) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Ordered map from label to [`Entry`].
///
/// Adding a label that already exists replaces its entry but keeps its
/// position.
#[derive(Debug, Default)]
pub struct EntryRegistry<'a> {
    entries: IndexMap<Label, Entry<'a>>,
}

impl<'a> EntryRegistry<'a> {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Register `entry` under `label`, returning the entry it replaced.
    pub fn add(&mut self, label: impl Into<Label>, entry: Entry<'a>) -> Option<Entry<'a>> {
        let label = label.into();
        match self.entries.entry(label) {
            MapEntry::Occupied(mut slot) => {
                tracing::debug!(label = %slot.key(), "entry replaced");
                Some(slot.insert(entry))
            }
            MapEntry::Vacant(slot) => {
                slot.insert(entry);
                None
            }
        }
    }

    /// Register a steerable scalar.
    pub fn add_scalar(
        &mut self,
        label: impl Into<Label>,
        slot: impl Into<ScalarSlot<'a>>,
    ) -> Option<Entry<'a>> {
        self.add(label, Entry::Scalar(slot.into()))
    }

    /// Register a field.
    pub fn add_field(&mut self, label: impl Into<Label>, field: &'a dyn FieldSource) -> Option<Entry<'a>> {
        self.add(label, Entry::Field(field))
    }

    /// Register a particle collection.
    pub fn add_particles(
        &mut self,
        label: impl Into<Label>,
        particles: &'a dyn ParticleSource,
    ) -> Option<Entry<'a>> {
        self.add(label, Entry::Particles(particles))
    }

    /// Visit every entry in insertion order, stopping at the first error.
    pub fn for_each<V: EntryVisitor + ?Sized>(&mut self, visitor: &mut V) -> Result<(), V::Error> {
        for (label, entry) in self.entries.iter_mut() {
            dispatch(visitor, label, entry)?;
        }
        Ok(())
    }

    /// Visit the entry under `label`. Returns `Ok(false)` if there is none.
    pub fn for_one<V: EntryVisitor + ?Sized>(
        &mut self,
        label: &str,
        visitor: &mut V,
    ) -> Result<bool, V::Error> {
        match self.entries.get_full_mut(label) {
            Some((_, key, entry)) => {
                dispatch(visitor, key, entry)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Whether `label` is registered.
    pub fn contains(&self, label: &str) -> bool {
        self.entries.contains_key(label)
    }

    /// The entry under `label`.
    pub fn get(&self, label: &str) -> Option<&Entry<'a>> {
        self.entries.get(label)
    }

    /// Labels in insertion order.
    pub fn labels(&self) -> impl Iterator<Item = &Label> {
        self.entries.keys()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn dispatch<V: EntryVisitor + ?Sized>(
    visitor: &mut V,
    label: &Label,
    entry: &mut Entry<'_>,
) -> Result<(), V::Error> {
    match entry {
        Entry::Scalar(slot) => visitor.visit_scalar(label, slot),
        Entry::Particles(p) => visitor.visit_particles(label, *p),
        Entry::Field(f) => visitor.visit_field(label, *f),
    }
}
