use std::{
    any::{Any, TypeId},
    marker::PhantomData,
};

use dashmap::{
    mapref::one::{Ref, RefMut},
    DashMap,
};

/// Per request storage shared by every instrumentation, one value per type.
///
/// Created when a request starts and dropped with it. Instrumentations seed
/// their entries in `Instrumentation::init_state`.
#[derive(Default)]
pub struct InstrumentationState {
    inner: DashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

pub struct StateRefEntry<'a, T> {
    entry: Option<Ref<'a, TypeId, Box<dyn Any + Send + Sync>>>,
    phantom: PhantomData<T>,
}

impl<'a, T: Any + Send + Sync> StateRefEntry<'a, T> {
    pub fn get_ref(&self) -> Option<&T> {
        self.entry.as_ref()?.value().downcast_ref::<T>()
    }
}

pub struct StateMutEntry<'a, T> {
    entry: Option<RefMut<'a, TypeId, Box<dyn Any + Send + Sync>>>,
    phantom: PhantomData<T>,
}

impl<'a, T: Any + Send + Sync> StateMutEntry<'a, T> {
    pub fn get_ref_mut(&mut self) -> Option<&mut T> {
        self.entry.as_mut()?.value_mut().downcast_mut::<T>()
    }
}

impl InstrumentationState {
    pub fn contains<T: Any + Send + Sync>(&self) -> bool {
        self.inner.contains_key(&TypeId::of::<T>())
    }

    /// Stores `value`, returning the previous value of the same type.
    pub fn insert<T: Any + Send + Sync>(&self, value: T) -> Option<Box<T>> {
        self.inner
            .insert(TypeId::of::<T>(), Box::new(value))
            .and_then(|previous| previous.downcast::<T>().ok())
    }

    pub fn get_ref_entry<T: Any + Send + Sync>(&self) -> StateRefEntry<'_, T> {
        StateRefEntry {
            entry: self.inner.get(&TypeId::of::<T>()),
            phantom: PhantomData,
        }
    }

    pub fn get_mut_entry<T: Any + Send + Sync>(&self) -> StateMutEntry<'_, T> {
        StateMutEntry {
            entry: self.inner.get_mut(&TypeId::of::<T>()),
            phantom: PhantomData,
        }
    }

    /// Clone of the stored value of type `T`.
    pub fn get_cloned<T: Any + Send + Sync + Clone>(&self) -> Option<T> {
        self.get_ref_entry::<T>().get_ref().cloned()
    }
}
