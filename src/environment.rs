//! Read-only values carried down the view tree with the graphics context.
//!
//! Values are keyed by their concrete type, one value per type, the same way
//! app-wide context is stored. Storage is a `Vec<(TypeId, Rc<dyn Any>)>` with a
//! linear scan: a context carries a handful of values (theme, locale, scale),
//! so a map would only add overhead. Setting a value copies the list, which
//! leaves every context that still holds the old list unchanged.

use std::any::{Any, TypeId};
use std::fmt;
use std::rc::Rc;

#[derive(Clone, Default)]
pub struct EnvironmentValues {
    entries: Rc<Vec<(TypeId, Rc<dyn Any>)>>,
}

impl EnvironmentValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a copy with `value` stored under its type, replacing any
    /// existing value of the same type.
    pub fn with_value<T: 'static>(&self, value: T) -> Self {
        let type_id = TypeId::of::<T>();
        let mut entries: Vec<(TypeId, Rc<dyn Any>)> = self
            .entries
            .iter()
            .filter(|(id, _)| *id != type_id)
            .cloned()
            .collect();
        entries.push((type_id, Rc::new(value)));
        Self {
            entries: Rc::new(entries),
        }
    }

    pub fn get<T: 'static>(&self) -> Option<&T> {
        let type_id = TypeId::of::<T>();
        self.entries
            .iter()
            .find(|(id, _)| *id == type_id)
            .and_then(|(_, value)| value.downcast_ref::<T>())
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.get::<T>().is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for EnvironmentValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvironmentValues")
            .field("len", &self.entries.len())
            .finish()
    }
}
