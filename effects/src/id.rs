use core::{
    any::{Any, TypeId},
    fmt,
    hash::{Hash, Hasher},
};

use super::*;

trait Key: Any + Send + Sync + fmt::Debug {
    fn as_any(&self) -> &dyn Any;
    fn key_eq(&self, other: &dyn Key) -> bool;
    fn key_hash(&self, state: &mut dyn Hasher);
}

impl<T> Key for T
where
    T: Hash + Eq + fmt::Debug + Send + Sync + 'static,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn key_eq(&self, other: &dyn Key) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| other == self)
    }

    fn key_hash(&self, mut state: &mut dyn Hasher) {
        // Equal values of different types must not collide into one id
        TypeId::of::<T>().hash(&mut state);
        self.hash(&mut state);
    }
}

#[derive(Clone, Copy)]
struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Identifies a family of in-flight effects.
///
/// Any value that is `Hash + Eq + Debug + Send + Sync + 'static` can be used.
/// Two ids are equal only when they wrap values of the same type that compare
/// equal, so `1u32` and `1u64` are distinct ids. String slices are stored as
/// `String`, making `"x"` and `String::from("x")` the same id.
#[derive(Clone)]
pub struct EffectId(Arc<dyn Key>);

impl EffectId {
    pub fn new<T>(value: T) -> Self
    where
        T: Hash + Eq + fmt::Debug + Send + Sync + 'static,
    {
        if let Some(id) = (&value as &dyn Any).downcast_ref::<EffectId>() {
            return id.clone();
        }
        Self(Arc::new(value))
    }

    /// An id derived from a type, for the common pattern of declaring a unit
    /// struct per cancellable operation.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self(Arc::new(TypeKey {
            id: TypeId::of::<T>(),
            name: core::any::type_name::<T>(),
        }))
    }

    /// Returns the wrapped value if it is a `T`.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }
}

impl PartialEq for EffectId {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.key_eq(other.0.as_ref())
    }
}

impl Eq for EffectId {}

impl Hash for EffectId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.key_hash(state);
    }
}

impl fmt::Debug for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl From<&str> for EffectId {
    fn from(value: &str) -> Self {
        Self::new(value.to_string())
    }
}

impl From<String> for EffectId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for EffectId {
                fn from(value: $t) -> Self {
                    Self::new(value)
                }
            }
        )*
    };
}

impl_from_int!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize);

#[cfg(test)]
mod tests {
    use super::*;
    use hashbrown::HashSet;

    #[derive(Debug, Hash, PartialEq, Eq)]
    enum Request {
        Search,
        Load(u32),
    }

    struct SearchId;

    #[test]
    fn str_and_string_match() {
        assert_eq!(EffectId::from("x"), EffectId::from(String::from("x")));
        assert_ne!(EffectId::from("x"), EffectId::from("y"));
    }

    #[test]
    fn types_are_distinct() {
        assert_ne!(EffectId::from(1u32), EffectId::from(1u64));
        assert_eq!(EffectId::from(1u32), EffectId::new(1u32));
    }

    #[test]
    fn enum_ids() {
        let mut ids = HashSet::new();
        ids.insert(EffectId::new(Request::Search));
        ids.insert(EffectId::new(Request::Load(1)));
        ids.insert(EffectId::new(Request::Load(1)));
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&EffectId::new(Request::Load(1))));
        assert!(!ids.contains(&EffectId::new(Request::Load(2))));
    }

    #[test]
    fn type_ids() {
        assert_eq!(EffectId::of::<SearchId>(), EffectId::of::<SearchId>());
        assert_ne!(EffectId::of::<SearchId>(), EffectId::of::<Request>());
        assert!(format!("{:?}", EffectId::of::<SearchId>()).ends_with("SearchId"));
    }

    #[test]
    fn wrapping_an_id_is_transparent() {
        let id = EffectId::from("x");
        assert_eq!(EffectId::new(id.clone()), id);
        assert_eq!(id.downcast_ref::<String>().map(String::as_str), Some("x"));
    }
}
