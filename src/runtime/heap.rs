//! Managed heap with explicit rooting and mark/sweep collection.
//!
//! The heap owns every reference-typed managed object: class instances, boxed value
//! types, arrays and sequence instances. Objects are addressed through [`ObjectRef`]
//! ids that are never reused.
//!
//! # Rooting
//!
//! Each object carries a root count. The handle table roots an object when the first
//! native handle for it is issued and unroots it when the last one is released. A
//! [`ManagedHeap::collect`] pass keeps everything reachable from rooted objects and from
//! the additional roots supplied by the caller (static fields), and frees the rest.
//!
//! # Interior Mutability
//!
//! State lives behind an `RwLock`, so all accessors take `&self`. Object ids come from an
//! `AtomicU64` and need no lock.

use std::{
    collections::{HashMap, HashSet},
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, RwLock,
    },
};

use crate::{
    metadata::typedesc::TypeDescriptor,
    runtime::{ManagedValue, ObjectRef, StructValue},
    Result,
};

/// Object stored on the managed heap.
#[derive(Clone, Debug, PartialEq)]
pub enum HeapObject {
    /// A class instance. Fields are in layout order, base class fields first.
    Instance {
        /// Fully qualified class name
        class: Arc<str>,
        /// Field values in layout order
        fields: Vec<ManagedValue>,
    },

    /// A boxed value type.
    Boxed(StructValue),

    /// A single dimensional array.
    Array {
        /// The declared element type
        element: TypeDescriptor,
        /// The array elements
        elements: Vec<ManagedValue>,
    },

    /// An instance of a sequence type (an ordered, growable managed collection).
    List {
        /// Fully qualified class name of the sequence type
        class: Arc<str>,
        /// The declared element type
        element: TypeDescriptor,
        /// Current items in order
        items: Vec<ManagedValue>,
    },
}

impl HeapObject {
    /// Returns a human-readable description of the object kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            HeapObject::Instance { .. } => "instance",
            HeapObject::Boxed(_) => "boxed value",
            HeapObject::Array { .. } => "array",
            HeapObject::List { .. } => "sequence",
        }
    }

    /// The managed type name of the object.
    #[must_use]
    pub fn type_name(&self) -> String {
        match self {
            HeapObject::Instance { class, .. } | HeapObject::List { class, .. } => {
                class.to_string()
            }
            HeapObject::Boxed(value) => value.type_name().to_string(),
            HeapObject::Array { element, .. } => format!("{}[]", element.type_name()),
        }
    }

    /// Every heap reference held directly by this object.
    fn references(&self) -> Vec<ObjectRef> {
        let mut refs = Vec::new();
        let values: &[ManagedValue] = match self {
            HeapObject::Instance { fields, .. } => fields,
            HeapObject::Boxed(value) => value.fields(),
            HeapObject::Array { elements, .. } => elements,
            HeapObject::List { items, .. } => items,
        };
        for value in values {
            value.references(&mut refs);
        }
        refs
    }
}

impl fmt::Display for HeapObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeapObject::Instance { class, .. } => write!(f, "instance({class})"),
            HeapObject::Boxed(value) => write!(f, "boxed({})", value.type_name()),
            HeapObject::Array { element, elements } => {
                write!(f, "{}[{}]", element, elements.len())
            }
            HeapObject::List { class, items, .. } => write!(f, "{class}(count={})", items.len()),
        }
    }
}

#[derive(Debug)]
struct HeapEntry {
    object: HeapObject,
    roots: usize,
}

#[derive(Debug, Default)]
struct HeapState {
    objects: HashMap<u64, HeapEntry>,
}

/// Garbage collected storage for reference-typed managed objects.
///
/// # Example
///
/// ```rust
/// use dotbridge::runtime::{HeapObject, ManagedHeap, ManagedValue};
/// use std::sync::Arc;
///
/// let heap = ManagedHeap::new();
/// let obj = heap
///     .alloc(HeapObject::Instance { class: Arc::from("A"), fields: vec![ManagedValue::I4(1)] })
///     .unwrap();
///
/// heap.root(obj).unwrap();
/// assert_eq!(heap.collect(&[]).unwrap(), 0);
///
/// heap.unroot(obj).unwrap();
/// assert_eq!(heap.collect(&[]).unwrap(), 1);
/// assert!(!heap.contains(obj));
/// ```
#[derive(Debug)]
pub struct ManagedHeap {
    state: RwLock<HeapState>,
    next_id: AtomicU64,
}

impl Default for ManagedHeap {
    fn default() -> Self {
        Self::new()
    }
}

impl ManagedHeap {
    /// Creates an empty heap.
    #[must_use]
    pub fn new() -> Self {
        ManagedHeap {
            state: RwLock::new(HeapState::default()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Allocates an object and returns its reference. The object starts unrooted.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::LockError`] if the heap lock is poisoned.
    pub fn alloc(&self, object: HeapObject) -> Result<ObjectRef> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);

        let mut state = write_lock!(self.state);
        state.objects.insert(id, HeapEntry { object, roots: 0 });

        Ok(ObjectRef(id))
    }

    /// Returns `true` if the object is still on the heap.
    #[must_use]
    pub fn contains(&self, object: ObjectRef) -> bool {
        self.state
            .read()
            .is_ok_and(|state| state.objects.contains_key(&object.0))
    }

    /// Number of live objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().map_or(0, |state| state.objects.len())
    }

    /// Returns `true` if no objects are allocated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a copy of the object.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the object was collected.
    pub fn get(&self, object: ObjectRef) -> Result<HeapObject> {
        self.with(object, Clone::clone)
    }

    /// Runs `f` with shared access to the object.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the object was collected.
    pub fn with<R>(&self, object: ObjectRef, f: impl FnOnce(&HeapObject) -> R) -> Result<R> {
        let state = read_lock!(self.state);
        match state.objects.get(&object.0) {
            Some(entry) => Ok(f(&entry.object)),
            None => Err(malformed_error!("{} is not on the heap", object)),
        }
    }

    /// Runs `f` with exclusive access to the object.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the object was collected.
    pub fn with_mut<R>(
        &self,
        object: ObjectRef,
        f: impl FnOnce(&mut HeapObject) -> R,
    ) -> Result<R> {
        let mut state = write_lock!(self.state);
        match state.objects.get_mut(&object.0) {
            Some(entry) => Ok(f(&mut entry.object)),
            None => Err(malformed_error!("{} is not on the heap", object)),
        }
    }

    /// Increments the root count of the object and returns the new count.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the object was collected.
    pub fn root(&self, object: ObjectRef) -> Result<usize> {
        let mut state = write_lock!(self.state);
        match state.objects.get_mut(&object.0) {
            Some(entry) => {
                entry.roots += 1;
                Ok(entry.roots)
            }
            None => Err(malformed_error!("Can not root {}, it is not on the heap", object)),
        }
    }

    /// Decrements the root count of the object and returns the new count.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the object was collected or is not rooted.
    pub fn unroot(&self, object: ObjectRef) -> Result<usize> {
        let mut state = write_lock!(self.state);
        match state.objects.get_mut(&object.0) {
            Some(entry) if entry.roots > 0 => {
                entry.roots -= 1;
                Ok(entry.roots)
            }
            Some(_) => Err(malformed_error!("{} is not rooted", object)),
            None => Err(malformed_error!("Can not unroot {}, it is not on the heap", object)),
        }
    }

    /// Current root count of the object.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the object was collected.
    pub fn root_count(&self, object: ObjectRef) -> Result<usize> {
        let state = read_lock!(self.state);
        match state.objects.get(&object.0) {
            Some(entry) => Ok(entry.roots),
            None => Err(malformed_error!("{} is not on the heap", object)),
        }
    }

    /// Frees every object not reachable from a rooted object or from `extra_roots`.
    ///
    /// Returns the number of objects freed.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::LockError`] if the heap lock is poisoned.
    pub fn collect(&self, extra_roots: &[ManagedValue]) -> Result<usize> {
        let mut state = write_lock!(self.state);

        let mut pending: Vec<ObjectRef> = state
            .objects
            .iter()
            .filter(|(_, entry)| entry.roots > 0)
            .map(|(id, _)| ObjectRef(*id))
            .collect();
        for value in extra_roots {
            value.references(&mut pending);
        }

        let mut marked = HashSet::new();
        while let Some(object) = pending.pop() {
            if !marked.insert(object.0) {
                continue;
            }
            if let Some(entry) = state.objects.get(&object.0) {
                pending.extend(entry.object.references());
            }
        }

        let before = state.objects.len();
        state.objects.retain(|id, _| marked.contains(id));
        Ok(before - state.objects.len())
    }
}
