use crate::{
    FaceHandle, VertexHandle,
    handle::Handle,
};
use super::*;


fn v(i: usize) -> VertexHandle {
    VertexHandle::from_usize(i)
}

#[test]
fn empty() {
    let r = PropRegistry::<VertexHandle>::new();
    assert_eq!(r.len(), 0);
    assert_eq!(r.num_props(), 0);
    assert!(r.names().next().is_none());
}

#[test]
fn add_fills_existing_elements() {
    let mut r = PropRegistry::<VertexHandle>::new();
    r.push();
    r.push();

    let p = r.add("v:label", "x").unwrap();
    assert_eq!(r.array(p).as_slice(), &["x", "x"]);

    r.push();
    assert_eq!(r.len(), 3);
    assert_eq!(r.array(p)[v(2)], "x");
}

#[test]
fn duplicate_and_reserved_names() {
    let mut r = PropRegistry::<VertexHandle>::new();
    r.add("v:a", 0u8).unwrap();

    assert_eq!(r.add("v:a", 1u32), Err(PropError::DuplicateName("v:a".into())));
    assert_eq!(
        r.add("v:connectivity", ()),
        Err(PropError::ReservedName("v:connectivity".into())),
    );
    assert_eq!(r.add("v:deleted", false), Err(PropError::ReservedName("v:deleted".into())));
}

#[test]
fn get_checks_type() {
    let mut r = PropRegistry::<FaceHandle>::new();
    let p = r.add("f:area", 0.0f64).unwrap();

    assert_eq!(r.get::<f64>("f:area"), Some(p));
    assert_eq!(r.get::<f32>("f:area"), None);
    assert_eq!(r.get::<f64>("f:nope"), None);

    match r.get_or_add("f:area", 0u32) {
        Err(PropError::TypeMismatch { name, .. }) => assert_eq!(name, "f:area"),
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(r.get_or_add("f:area", 1.0f64), Ok(p));
    assert_eq!(r.num_props(), 1);
}

#[test]
fn remove() {
    let mut r = PropRegistry::<VertexHandle>::new();
    let a = r.add("v:a", 1i32).unwrap();
    let b = r.add("v:b", 2i32).unwrap();

    assert!(r.remove(a));
    assert!(!r.remove(a));
    assert!(!r.contains("v:a"));
    assert_eq!(r.names().collect::<Vec<_>>(), ["v:b"]);

    // Re-adding the name gives a new slot, the old handle stays dead.
    let a2 = r.add("v:a", 3i32).unwrap();
    assert_ne!(a, a2);
    assert_eq!(r.array(b).len(), 0);
}

#[test]
#[should_panic(expected = "does not refer to a live property")]
fn stale_handle_panics() {
    let mut r = PropRegistry::<VertexHandle>::new();
    let a = r.add("v:a", 1i32).unwrap();
    r.remove(a);
    r.array(a);
}

#[test]
fn bulk_operations() {
    let mut r = PropRegistry::<VertexHandle>::new();
    let name = r.add("v:name", String::new()).unwrap();
    let id = r.add("v:id", 0usize).unwrap();

    for i in 0..4 {
        r.push();
        r.array_mut(name)[v(i)] = format!("v{}", i);
        r.array_mut(id)[v(i)] = i;
    }

    r.copy(v(1), v(3));
    assert_eq!(r.array(name)[v(3)], "v1");
    assert_eq!(r.array(id)[v(3)], 1);

    r.swap(v(0), v(2));
    assert_eq!(r.array(name).as_slice(), &["v2", "v1", "v0", "v1"]);
    assert_eq!(r.array(id).as_slice(), &[2, 1, 0, 1]);

    r.resize(2);
    assert_eq!(r.len(), 2);
    assert_eq!(r.array(id).as_slice(), &[2, 1]);

    r.resize(3);
    assert_eq!(r.array(name)[v(2)], "");
}

#[test]
fn clone_is_deep() {
    let mut r = PropRegistry::<VertexHandle>::new();
    r.push();
    let p = r.add("v:x", 5u8).unwrap();

    let mut c = r.clone();
    c.array_mut(p)[v(0)] = 7;

    assert_eq!(r.array(p)[v(0)], 5);
    assert_eq!(c.array(p)[v(0)], 7);
}
