#![allow(unused)]

macro_rules! hashset {
    (@single $($x:tt)*) => (());
    (@count $($rest:expr),*) => (<[()]>::len(&[$(hashset!(@single $rest)),*]));

    ($($key:expr,)+) => { hashset!($($key),+) };
    ($($key:expr),*) => {
        {
            let _cap = hashset!(@count $($key),*);
            let mut _set = ::std::collections::HashSet::with_capacity_and_hasher(_cap, ::fxhash::FxBuildHasher::default());
            $(
                let _ = _set.insert($key);
            )*
            _set
        }
    };
}

#[test]
fn test_hashset() {
    let names: fxhash::FxHashSet<&str> = hashset! {
        "one",
        "two",
        "one",
    };
    assert_eq!(names.len(), 2);
    assert!(names.contains("one"));
    assert!(!names.contains("three"));

    let empty: fxhash::FxHashSet<i32> = hashset! {};
    assert!(empty.is_empty());
}
