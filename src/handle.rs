//! Handles to refer to mesh elements.
//!
//! A handle is just an index into the element arrays of a mesh. It does not
//! borrow the mesh and is `Copy`. Whether or not a handle refers to an
//! existing element is only known by the mesh that created it.

use std::{
    fmt,
    hash::Hash,
};

use static_assertions::assert_eq_size;


/// The integer type used inside handles.
///
/// This is `u32` by default. With the `large-handle` feature, it is `u64`.
/// The maximum value is reserved to represent "no handle" (see
/// [`optional::Noned`]).
#[cfg(not(feature = "large-handle"))]
#[allow(non_camel_case_types)]
pub type hsize = u32;

/// The integer type used inside handles.
#[cfg(feature = "large-handle")]
#[allow(non_camel_case_types)]
pub type hsize = u64;


/// Types that can be used to refer to some element of a mesh.
///
/// Handles are simple newtype wrappers around an `hsize` index. Each element
/// kind has its own handle type so that handles of different kinds cannot be
/// confused.
pub trait Handle: 'static + Copy + fmt::Debug + Eq + Ord + Hash {
    /// Creates a handle from the given index.
    fn new(idx: hsize) -> Self;

    /// Returns the index of this handle.
    fn idx(&self) -> hsize;

    /// Helper method to create a handle directly from a `usize`.
    ///
    /// Panics if `raw` does not fit into `hsize` or is the reserved "none"
    /// value.
    #[inline(always)]
    fn from_usize(raw: usize) -> Self {
        assert!(
            raw < hsize::max_value() as usize,
            "handle index {} does not fit into `hsize`",
            raw,
        );
        Self::new(raw as hsize)
    }

    /// Helper method to get the index of this handle as `usize`.
    #[inline(always)]
    fn to_usize(&self) -> usize {
        self.idx() as usize
    }
}

macro_rules! make_handle_type {
    ($(#[$attr:meta])* $name:ident = $short:expr;) => {
        $(#[$attr])*
        #[derive(
            Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash,
            derive_more::From, derive_more::Into,
        )]
        pub struct $name(hsize);

        impl Handle for $name {
            #[inline(always)]
            fn new(idx: hsize) -> Self {
                $name(idx)
            }

            #[inline(always)]
            fn idx(&self) -> hsize {
                self.0
            }
        }

        impl optional::Noned for $name {
            #[inline(always)]
            fn is_none(&self) -> bool {
                self.0 == hsize::max_value()
            }

            #[inline(always)]
            fn get_none() -> Self {
                $name(hsize::max_value())
            }
        }

        impl optional::OptEq for $name {
            #[inline(always)]
            fn opt_eq(&self, other: &Self) -> bool {
                self == other
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}{}", $short, self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                fmt::Debug::fmt(self, f)
            }
        }
    }
}

make_handle_type! {
    /// A handle that refers to a vertex.
    VertexHandle = "V";
}
make_handle_type! {
    /// A handle that refers to one directed half of an edge.
    HalfedgeHandle = "H";
}
make_handle_type! {
    /// A handle that refers to a full (undirected) edge.
    EdgeHandle = "E";
}
make_handle_type! {
    /// A handle that refers to a face.
    FaceHandle = "F";
}

assert_eq_size!(VertexHandle, hsize);
assert_eq_size!(optional::Optioned<VertexHandle>, VertexHandle);
assert_eq_size!(optional::Optioned<HalfedgeHandle>, HalfedgeHandle);
assert_eq_size!(optional::Optioned<FaceHandle>, FaceHandle);

impl HalfedgeHandle {
    /// Returns the halfedge pointing in the opposite direction.
    ///
    /// The two halves of an edge are always stored next to one another with
    /// the lower one at an even index. Flipping the last bit gives the twin.
    #[inline(always)]
    pub fn opposite(self) -> Self {
        HalfedgeHandle(self.0 ^ 1)
    }

    /// Returns the full edge this halfedge belongs to.
    #[inline(always)]
    pub fn edge(self) -> EdgeHandle {
        EdgeHandle(self.0 / 2)
    }
}

impl EdgeHandle {
    /// Returns the `i`th halfedge of this edge. `i` has to be 0 or 1.
    #[inline(always)]
    pub fn halfedge(self, i: hsize) -> HalfedgeHandle {
        debug_assert!(i <= 1);
        HalfedgeHandle(self.0 * 2 + i)
    }
}


#[cfg(test)]
mod tests {
    use optional::{Noned, Optioned};
    use super::*;

    #[test]
    fn debug_output() {
        assert_eq!(format!("{:?}", VertexHandle::new(3)), "V3");
        assert_eq!(format!("{:?}", HalfedgeHandle::new(7)), "H7");
        assert_eq!(format!("{}", EdgeHandle::new(2)), "E2");
        assert_eq!(format!("{}", FaceHandle::new(0)), "F0");
    }

    #[test]
    fn twins_are_adjacent() {
        let h = HalfedgeHandle::new(4);
        assert_eq!(h.opposite(), HalfedgeHandle::new(5));
        assert_eq!(h.opposite().opposite(), h);
        assert_eq!(h.edge(), h.opposite().edge());
        assert_eq!(EdgeHandle::new(2).halfedge(0), h);
        assert_eq!(EdgeHandle::new(2).halfedge(1), h.opposite());
    }

    #[test]
    fn none_value() {
        assert!(VertexHandle::get_none().is_none());
        assert!(!VertexHandle::new(0).is_none());

        let o: Optioned<FaceHandle> = Optioned::none();
        assert_eq!(o.into_option(), None);
        let o = Optioned::some(FaceHandle::new(9));
        assert_eq!(o.into_option(), Some(FaceHandle::new(9)));
    }
}
