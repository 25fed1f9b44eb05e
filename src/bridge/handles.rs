//! Handle table: native tokens for managed objects.
//!
//! Every managed object that crosses to the native side is represented by a
//! [`ManagedHandle`]. The table memoizes handles per object identity, so exposing the
//! same object twice yields the same handle, and keeps a reference count per handle.
//!
//! # Lifetime
//!
//! The first [`HandleTable::acquire`] of an object roots it on the
//! [`ManagedHeap`]; every further acquire only bumps the count. When
//! [`HandleTable::release`] drops the count to zero the object is unrooted exactly once,
//! the slot goes back to the free list and its generation is incremented, so the stale
//! handle value is recognized as released instead of aliasing the next occupant.
//!
//! # Thread Safety
//!
//! All state sits behind one `Mutex`. The table lock is always taken before the heap
//! lock, never the other way around.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use crate::{
    bridge::ManagedHandle,
    config::DEFAULT_MAX_HANDLES,
    runtime::{ManagedHeap, ObjectRef},
    Error, Result,
};

#[derive(Debug)]
struct Slot {
    object: Option<ObjectRef>,
    class: Arc<str>,
    refs: usize,
    generation: u32,
}

#[derive(Debug, Default)]
struct TableState {
    slots: Vec<Slot>,
    free: Vec<u32>,
    by_object: HashMap<ObjectRef, ManagedHandle>,
}

impl TableState {
    fn slot(&self, handle: ManagedHandle) -> Result<&Slot> {
        let index = handle.index().ok_or(Error::NullHandle)?;
        let slot = self
            .slots
            .get(index)
            .ok_or(Error::InvalidHandle(handle.raw()))?;
        if slot.generation != handle.generation() || slot.object.is_none() {
            return Err(Error::HandleReleased(handle.raw()));
        }
        Ok(slot)
    }
}

/// Registry of live handles with per-handle reference counts.
#[derive(Debug)]
pub struct HandleTable {
    state: Mutex<TableState>,
    max_handles: usize,
}

impl Default for HandleTable {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HANDLES)
    }
}

impl HandleTable {
    /// Creates an empty table that refuses to hold more than `max_handles` live handles.
    #[must_use]
    pub fn new(max_handles: usize) -> Self {
        HandleTable {
            state: Mutex::new(TableState::default()),
            max_handles,
        }
    }

    /// Returns the handle for `object`, issuing one if it has none.
    ///
    /// An object that already has a live handle gets the same handle back with its
    /// reference count incremented. A fresh handle roots the object.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HandleTableFull`] when the budget is exhausted and propagates heap
    /// errors if the object is not on the heap.
    pub fn acquire(
        &self,
        heap: &ManagedHeap,
        object: ObjectRef,
        class: Arc<str>,
    ) -> Result<ManagedHandle> {
        let mut state = lock!(self.state);

        if let Some(handle) = state.by_object.get(&object).copied() {
            if let Some(index) = handle.index() {
                state.slots[index].refs += 1;
            }
            return Ok(handle);
        }

        let live = state.by_object.len();
        if live >= self.max_handles {
            return Err(Error::HandleTableFull(live));
        }

        heap.root(object)?;

        let handle = match state.free.pop() {
            Some(index) => {
                let slot = &mut state.slots[index as usize];
                slot.object = Some(object);
                slot.class = class;
                slot.refs = 1;
                ManagedHandle::from_parts(index, slot.generation)
            }
            None => {
                let index = u32::try_from(state.slots.len())
                    .map_err(|_| Error::HandleTableFull(live))?;
                state.slots.push(Slot {
                    object: Some(object),
                    class,
                    refs: 1,
                    generation: 0,
                });
                ManagedHandle::from_parts(index, 0)
            }
        };
        state.by_object.insert(object, handle);

        tracing::debug!(%handle, %object, "handle issued");
        Ok(handle)
    }

    /// Resolves a handle to its object and the class it was issued for.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NullHandle`], [`Error::InvalidHandle`] for values never issued by
    /// this table, and [`Error::HandleReleased`] for stale handles.
    pub fn resolve(&self, handle: ManagedHandle) -> Result<(ObjectRef, Arc<str>)> {
        let state = lock!(self.state);
        let slot = state.slot(handle)?;
        match slot.object {
            Some(object) => Ok((object, slot.class.clone())),
            None => Err(Error::HandleReleased(handle.raw())),
        }
    }

    /// Drops one reference and returns the number of references left.
    ///
    /// At zero the object is unrooted and the handle becomes stale.
    ///
    /// # Errors
    ///
    /// Fails like [`HandleTable::resolve`]; releasing a stale handle again is reported as
    /// [`Error::HandleReleased`] and leaves the table untouched.
    pub fn release(&self, heap: &ManagedHeap, handle: ManagedHandle) -> Result<usize> {
        let mut state = lock!(self.state);
        state.slot(handle)?;
        let Some(index) = handle.index() else {
            return Err(Error::NullHandle);
        };

        let slot = &mut state.slots[index];
        slot.refs -= 1;
        if slot.refs > 0 {
            return Ok(slot.refs);
        }

        let object = slot.object.take();
        slot.generation = slot.generation.wrapping_add(1);
        state.free.push(u32::try_from(index).map_err(|_| Error::InvalidHandle(handle.raw()))?);
        if let Some(object) = object {
            state.by_object.remove(&object);
            heap.unroot(object)?;
            tracing::debug!(%handle, %object, "handle released");
        }
        Ok(0)
    }

    /// Returns `true` if both handles refer to the same live object.
    ///
    /// # Errors
    ///
    /// Fails like [`HandleTable::resolve`] for either handle.
    pub fn same_object(&self, a: ManagedHandle, b: ManagedHandle) -> Result<bool> {
        let (left, _) = self.resolve(a)?;
        let (right, _) = self.resolve(b)?;
        Ok(left == right)
    }

    /// Current reference count of a handle.
    ///
    /// # Errors
    ///
    /// Fails like [`HandleTable::resolve`].
    pub fn ref_count(&self, handle: ManagedHandle) -> Result<usize> {
        let state = lock!(self.state);
        Ok(state.slot(handle)?.refs)
    }

    /// Number of live handles.
    #[must_use]
    pub fn live(&self) -> usize {
        self.state.lock().map_or(0, |state| state.by_object.len())
    }

    /// Configured handle budget.
    #[must_use]
    pub fn max_handles(&self) -> usize {
        self.max_handles
    }
}

/// A construction-time reference to a new object, dropped when the construction ends.
///
/// The object is rooted and has a handle while its constructor runs, so re-entrant calls
/// can observe it. If the constructor throws, dropping the guard releases the only
/// reference and the object is never exposed. On success the result conversion takes
/// its own reference before the guard goes away.
pub(crate) struct PendingHandle<'a> {
    table: &'a HandleTable,
    heap: &'a ManagedHeap,
    handle: ManagedHandle,
}

impl<'a> PendingHandle<'a> {
    pub(crate) fn new(
        table: &'a HandleTable,
        heap: &'a ManagedHeap,
        handle: ManagedHandle,
    ) -> Self {
        PendingHandle { table, heap, handle }
    }
}

impl Drop for PendingHandle<'_> {
    fn drop(&mut self) {
        if let Err(error) = self.table.release(self.heap, self.handle) {
            tracing::debug!(handle = %self.handle, %error, "pending handle already gone");
        }
    }
}
