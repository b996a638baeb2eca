//! Named, dynamically typed per-element property arrays.
//!
//! A [`PropRegistry`] stores an arbitrary number of [`PropArray`]s, each with
//! a unique name and its own element type. All arrays of one registry have
//! the same length: the number of elements (e.g. vertices) of the mesh that
//! owns the registry. When the mesh adds an element, every array grows by one
//! default value; when the mesh compacts its storage, every array is
//! permuted the same way.
//!
//! The registry itself does not know the element types of its arrays. Typed
//! access happens through [`Prop`] handles that are returned when adding a
//! property. Bulk operations that don't care about the type (like copying
//! all properties of one vertex to another vertex) work on all arrays at
//! once.
//!
//! # Example
//!
//! ```
//! use manifold_builder::{
//!     VertexHandle,
//!     handle::Handle,
//!     prop::PropRegistry,
//! };
//!
//! let mut props = PropRegistry::<VertexHandle>::new();
//! props.push();
//! props.push();
//!
//! let weight = props.add("v:weight", 1.0f32).unwrap();
//! let v1 = VertexHandle::new(1);
//! props.array_mut(weight)[v1] = 3.5;
//!
//! // Copy all properties of `v1` to `v0`.
//! props.copy(v1, VertexHandle::new(0));
//! assert_eq!(props.array(weight)[VertexHandle::new(0)], 3.5);
//! ```

use std::{
    any,
    fmt,
    marker::PhantomData,
};

use failure::Fail;

use crate::handle::Handle;
use self::array::ErasedArray;


mod array;
#[cfg(test)]
mod tests;

pub use self::array::{Iter, PropArray};


/// Names that can't be used for properties. Connectivity and deletion flags
/// are stored outside of the registries, which means that they are never
/// copied along with other properties.
pub const RESERVED_NAMES: &[&str] = &[
    "v:connectivity",
    "v:deleted",
    "h:connectivity",
    "f:connectivity",
];


/// Errors that can occur when adding or looking up a property.
#[derive(Debug, Clone, PartialEq, Eq, Fail)]
pub enum PropError {
    #[fail(display = "a property named '{}' already exists", _0)]
    DuplicateName(String),

    #[fail(display = "the property name '{}' is reserved for connectivity data", _0)]
    ReservedName(String),

    #[fail(
        display = "property '{}' stores values of type `{}`, but `{}` was requested",
        name, actual, requested
    )]
    TypeMismatch {
        name: String,
        actual: &'static str,
        requested: &'static str,
    },
}


/// Typed handle to one array inside a [`PropRegistry`].
///
/// This is only a key: it doesn't borrow the registry. Using it after the
/// property was removed (or with a different registry) panics.
pub struct Prop<H: Handle, T> {
    slot: usize,
    _marker: PhantomData<fn(H) -> T>,
}

impl<H: Handle, T> Prop<H, T> {
    fn new(slot: usize) -> Self {
        Self {
            slot,
            _marker: PhantomData,
        }
    }

    /// Returns `true` if both handles refer to the same array, regardless of
    /// the value type they claim.
    pub(crate) fn slot_eq<U>(self, other: Prop<H, U>) -> bool {
        self.slot == other.slot
    }
}

impl<H: Handle, T> Clone for Prop<H, T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<H: Handle, T> Copy for Prop<H, T> {}

impl<H: Handle, T> PartialEq for Prop<H, T> {
    fn eq(&self, other: &Self) -> bool {
        self.slot == other.slot
    }
}
impl<H: Handle, T> Eq for Prop<H, T> {}

impl<H: Handle, T> fmt::Debug for Prop<H, T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Prop<{}>#{}", any::type_name::<T>(), self.slot)
    }
}


/// A collection of named property arrays of equal length.
///
/// Slots of removed properties are never reused, so a stale [`Prop`] can
/// never silently alias a newer property.
pub struct PropRegistry<H: Handle> {
    arrays: Vec<Option<Box<dyn ErasedArray>>>,
    len: usize,
    _handle: PhantomData<fn(H)>,
}

impl<H: Handle> PropRegistry<H> {
    /// Creates an empty registry for zero elements.
    pub fn new() -> Self {
        Self {
            arrays: Vec::new(),
            len: 0,
            _handle: PhantomData,
        }
    }

    /// Number of elements (the length of each array).
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of properties currently registered.
    pub fn num_props(&self) -> usize {
        self.live().count()
    }

    /// Names of all registered properties, in the order they were added.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.live().map(|a| a.name())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find_slot(name).is_some()
    }

    /// Adds a new property array named `name`. Every existing element gets
    /// the value `default`, as does every element added later.
    pub fn add<T: Clone + 'static>(
        &mut self,
        name: &str,
        default: T,
    ) -> Result<Prop<H, T>, PropError> {
        if RESERVED_NAMES.contains(&name) {
            return Err(PropError::ReservedName(name.into()));
        }
        if self.contains(name) {
            return Err(PropError::DuplicateName(name.into()));
        }

        let array = PropArray::<H, T>::new(name.into(), default, self.len);
        self.arrays.push(Some(Box::new(array)));

        Ok(Prop::new(self.arrays.len() - 1))
    }

    /// Looks up the property named `name`. Returns `None` if no property with
    /// that name exists or if it stores a different type than `T`.
    pub fn get<T: Clone + 'static>(&self, name: &str) -> Option<Prop<H, T>> {
        self.find::<T>(name).ok().flatten()
    }

    /// Returns the property named `name`, adding it with `default` if it
    /// does not exist yet.
    pub fn get_or_add<T: Clone + 'static>(
        &mut self,
        name: &str,
        default: T,
    ) -> Result<Prop<H, T>, PropError> {
        match self.find::<T>(name)? {
            Some(prop) => Ok(prop),
            None => self.add(name, default),
        }
    }

    /// Removes the given property. Returns `false` if it was already removed.
    pub fn remove<T>(&mut self, prop: Prop<H, T>) -> bool {
        match self.arrays.get_mut(prop.slot) {
            Some(slot) => slot.take().is_some(),
            None => false,
        }
    }

    /// Returns the array of the given property.
    ///
    /// Panics if the property was removed or belongs to another registry.
    pub fn array<T: 'static>(&self, prop: Prop<H, T>) -> &PropArray<H, T> {
        self.arrays.get(prop.slot)
            .and_then(|slot| slot.as_ref())
            .and_then(|a| a.as_any().downcast_ref())
            .unwrap_or_else(|| panic!("{:?} does not refer to a live property", prop))
    }

    /// Returns the array of the given property mutably.
    ///
    /// Panics if the property was removed or belongs to another registry.
    pub fn array_mut<T: 'static>(&mut self, prop: Prop<H, T>) -> &mut PropArray<H, T> {
        self.arrays.get_mut(prop.slot)
            .and_then(|slot| slot.as_mut())
            .and_then(|a| a.as_any_mut().downcast_mut())
            .unwrap_or_else(|| panic!("{:?} does not refer to a live property", prop))
    }


    // ----- Bulk operations on all arrays ------------------------------------

    /// Appends one element with default values to all arrays.
    pub fn push(&mut self) {
        for a in self.live_mut() {
            a.push();
        }
        self.len += 1;
    }

    /// Resizes all arrays to `len` elements, filling with default values.
    pub fn resize(&mut self, len: usize) {
        for a in self.live_mut() {
            a.resize(len);
        }
        self.len = len;
    }

    /// Swaps the values of elements `a` and `b` in all arrays.
    pub fn swap(&mut self, a: H, b: H) {
        for array in self.live_mut() {
            array.swap(a.to_usize(), b.to_usize());
        }
    }

    /// Copies the values of element `from` to element `to` in all arrays.
    pub fn copy(&mut self, from: H, to: H) {
        for array in self.live_mut() {
            array.copy(from.to_usize(), to.to_usize());
        }
    }

    pub fn shrink_to_fit(&mut self) {
        for a in self.live_mut() {
            a.shrink_to_fit();
        }
    }


    // ----- Internal helpers --------------------------------------------------

    fn live(&self) -> impl Iterator<Item = &dyn ErasedArray> + '_ {
        self.arrays.iter().filter_map(|a| a.as_deref())
    }

    fn live_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn ErasedArray>> + '_ {
        self.arrays.iter_mut().filter_map(|a| a.as_mut())
    }

    fn find_slot(&self, name: &str) -> Option<usize> {
        self.arrays.iter().position(|a| a.as_ref().map_or(false, |a| a.name() == name))
    }

    /// `Ok(None)` if there is no such property, `Err` if there is one with a
    /// different type.
    fn find<T: Clone + 'static>(&self, name: &str) -> Result<Option<Prop<H, T>>, PropError> {
        let slot = match self.find_slot(name) {
            None => return Ok(None),
            Some(slot) => slot,
        };

        let array = self.arrays[slot].as_deref().expect("slot found by `find_slot` is live");
        if array.as_any().is::<PropArray<H, T>>() {
            Ok(Some(Prop::new(slot)))
        } else {
            Err(PropError::TypeMismatch {
                name: name.into(),
                actual: array.type_name(),
                requested: any::type_name::<T>(),
            })
        }
    }
}

impl<H: Handle> Default for PropRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Handle> Clone for PropRegistry<H> {
    fn clone(&self) -> Self {
        Self {
            arrays: self.arrays.iter()
                .map(|a| a.as_ref().map(|a| a.clone_boxed()))
                .collect(),
            len: self.len,
            _handle: PhantomData,
        }
    }
}

impl<H: Handle> fmt::Debug for PropRegistry<H> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PropRegistry")
            .field("len", &self.len)
            .field("props", &self.names().collect::<Vec<_>>())
            .finish()
    }
}
