//! KeyPath: a named, copyable accessor from a root value to one of its parts.

use std::fmt;

/// Accessor from `Root` to a contained `Value`.
///
/// A `KeyPath` is a plain function pointer, so it is `Copy`, `Send` and `Sync`
/// regardless of `Root` and `Value`. Derive them per field with
/// `#[derive(KeyPaths)]` (the `macros` feature), or build one by hand:
///
/// ```
/// use ufos::KeyPath;
///
/// struct Pair { left: i32, right: i32 }
///
/// const LEFT: KeyPath<Pair, i32> = KeyPath::new(|p| &p.left);
/// assert_eq!(*LEFT.get(&Pair { left: 1, right: 2 }), 1);
/// ```
pub struct KeyPath<Root, Value> {
    get: fn(&Root) -> &Value,
}

impl<Root, Value> KeyPath<Root, Value> {
    /// Wrap an accessor function.
    pub const fn new(get: fn(&Root) -> &Value) -> Self {
        Self { get }
    }

    /// Borrow the part of `root` this path points at.
    pub fn get<'a>(&self, root: &'a Root) -> &'a Value {
        (self.get)(root)
    }
}

impl<Root> KeyPath<Root, Root> {
    /// The path to the root value itself.
    pub const fn identity() -> Self {
        Self { get: itself }
    }
}

fn itself<T>(value: &T) -> &T {
    value
}

impl<Root, Value> Clone for KeyPath<Root, Value> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Root, Value> Copy for KeyPath<Root, Value> {}

impl<Root, Value> fmt::Debug for KeyPath<Root, Value> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "KeyPath<{}, {}>",
            std::any::type_name::<Root>(),
            std::any::type_name::<Value>()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pair {
        value1: i32,
        value2: String,
    }

    const VALUE1: KeyPath<Pair, i32> = KeyPath::new(|p| &p.value1);
    const VALUE2: KeyPath<Pair, String> = KeyPath::new(|p| &p.value2);

    #[test]
    fn get_borrows_field() {
        let pair = Pair {
            value1: 3,
            value2: "nine".into(),
        };
        assert_eq!(*VALUE1.get(&pair), 3);
        assert_eq!(VALUE2.get(&pair), "nine");
    }

    #[test]
    fn identity_returns_root() {
        let id = KeyPath::<i32, i32>::identity();
        assert_eq!(*id.get(&42), 42);
    }

    #[test]
    fn copy_keeps_accessor() {
        let a = VALUE1;
        let b = a;
        let pair = Pair {
            value1: 8,
            value2: String::new(),
        };
        assert_eq!(a.get(&pair), b.get(&pair));
    }

    #[test]
    fn debug_names_types() {
        let dbg = format!("{:?}", VALUE1);
        assert!(dbg.starts_with("KeyPath<"));
        assert!(dbg.contains("i32"));
    }
}
