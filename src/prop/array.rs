use std::{
    any::{self, Any},
    fmt,
    marker::PhantomData,
    ops::{Index, IndexMut},
    slice,
};

use crate::handle::Handle;


/// The operations a registry needs from its arrays without knowing their
/// element type.
pub(super) trait ErasedArray: Any {
    fn name(&self) -> &str;
    fn type_name(&self) -> &'static str;
    fn len(&self) -> usize;

    /// Appends one default value.
    fn push(&mut self);
    fn resize(&mut self, len: usize);
    fn swap(&mut self, a: usize, b: usize);

    /// Overwrites the element at `to` with a clone of the element at `from`.
    fn copy(&mut self, from: usize, to: usize);
    fn shrink_to_fit(&mut self);

    fn clone_boxed(&self) -> Box<dyn ErasedArray>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}


/// A named array storing one value of type `T` per element of kind `H`.
///
/// Arrays are owned by a [`PropRegistry`][super::PropRegistry] which keeps
/// their length in sync with the number of elements. You get access to an
/// array via its [`Prop`][super::Prop] handle. The array can then be indexed
/// by element handles.
#[derive(Clone)]
pub struct PropArray<H: Handle, T> {
    name: String,
    data: Vec<T>,
    default: T,
    _handle: PhantomData<fn(H)>,
}

impl<H: Handle, T: Clone> PropArray<H, T> {
    pub(super) fn new(name: String, default: T, len: usize) -> Self {
        Self {
            name,
            data: vec![default.clone(); len],
            default,
            _handle: PhantomData,
        }
    }
}

impl<H: Handle, T> PropArray<H, T> {
    /// The name this array was registered with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The value newly added elements get.
    pub fn default_value(&self) -> &T {
        &self.default
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, handle: H) -> Option<&T> {
        self.data.get(handle.to_usize())
    }

    pub fn get_mut(&mut self, handle: H) -> Option<&mut T> {
        self.data.get_mut(handle.to_usize())
    }

    /// All values, indexed by handle index. Includes values of deleted
    /// elements that were not yet garbage collected.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn iter(&self) -> Iter<'_, H, T> {
        Iter {
            inner: self.data.iter().enumerate(),
            _handle: PhantomData,
        }
    }
}

impl<H: Handle, T: Clone + 'static> ErasedArray for PropArray<H, T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_name(&self) -> &'static str {
        any::type_name::<T>()
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn push(&mut self) {
        self.data.push(self.default.clone());
    }

    fn resize(&mut self, len: usize) {
        self.data.resize(len, self.default.clone());
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.data.swap(a, b);
    }

    fn copy(&mut self, from: usize, to: usize) {
        let value = self.data[from].clone();
        self.data[to] = value;
    }

    fn shrink_to_fit(&mut self) {
        self.data.shrink_to_fit();
    }

    fn clone_boxed(&self) -> Box<dyn ErasedArray> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl<H: Handle, T> Index<H> for PropArray<H, T> {
    type Output = T;
    fn index(&self, handle: H) -> &Self::Output {
        match self.data.get(handle.to_usize()) {
            Some(v) => v,
            None => panic!("no value for {:?} in property '{}'", handle, self.name),
        }
    }
}

impl<H: Handle, T> IndexMut<H> for PropArray<H, T> {
    fn index_mut(&mut self, handle: H) -> &mut Self::Output {
        let name = &self.name;
        match self.data.get_mut(handle.to_usize()) {
            Some(v) => v,
            None => panic!("no value for {:?} in property '{}'", handle, name),
        }
    }
}

impl<H: Handle, T: fmt::Debug> fmt::Debug for PropArray<H, T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_map()
            .entries(self.data.iter().enumerate().map(|(i, v)| (H::from_usize(i), v)))
            .finish()
    }
}

/// Iterator over `(handle, &value)` pairs of a [`PropArray`].
#[derive(Debug, Clone)]
pub struct Iter<'a, H: Handle, T> {
    inner: std::iter::Enumerate<slice::Iter<'a, T>>,
    _handle: PhantomData<fn(H)>,
}

impl<'a, H: Handle, T> Iterator for Iter<'a, H, T> {
    type Item = (H, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(i, v)| (H::from_usize(i), v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<H: Handle, T> ExactSizeIterator for Iter<'_, H, T> {}
