//! Object recycling pool
//!
//! Values are kept in per-kind free lists and reset before they are handed
//! out again, so a recycled value is indistinguishable from a fresh one.

use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::OnceLock;

/// A type the pool can recycle
pub trait Recycle: Default + Send + 'static {
    /// Free-list key, unique per recycled type
    const KIND: &'static str;

    /// Return the value to its default state
    fn reset(&mut self);
}

/// Free lists keyed by [`Recycle::KIND`]
#[derive(Default)]
pub struct PoolRegistry {
    free: Mutex<HashMap<&'static str, Vec<Box<dyn Any + Send>>>>,
}

static GLOBAL: OnceLock<PoolRegistry> = OnceLock::new();

impl PoolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry
    pub fn global() -> &'static PoolRegistry {
        GLOBAL.get_or_init(PoolRegistry::new)
    }

    /// Take a recycled value, or a new default one
    pub fn acquire<T: Recycle>(&self) -> Pooled<'_, T> {
        let recycled = self
            .free
            .lock()
            .get_mut(T::KIND)
            .and_then(Vec::pop)
            .and_then(|boxed| boxed.downcast::<T>().ok());

        let value = match recycled {
            Some(mut value) => {
                value.reset();
                *value
            }
            None => T::default(),
        };
        Pooled {
            value: Some(value),
            registry: self,
        }
    }

    /// Number of free values of a kind
    pub fn available<T: Recycle>(&self) -> usize {
        self.free.lock().get(T::KIND).map_or(0, Vec::len)
    }

    fn release<T: Recycle>(&self, value: T) {
        self.free
            .lock()
            .entry(T::KIND)
            .or_default()
            .push(Box::new(value));
    }
}

impl std::fmt::Debug for PoolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let free = self.free.lock();
        let mut map = f.debug_map();
        for (kind, values) in free.iter() {
            map.entry(kind, &values.len());
        }
        map.finish()
    }
}

/// Take a value from the process-wide registry
pub fn acquire<T: Recycle>() -> Pooled<'static, T> {
    PoolRegistry::global().acquire()
}

/// A value borrowed from a pool.
///
/// It goes back to the pool only through [`Pooled::free`]; dropping it
/// discards the value.
#[derive(Debug)]
pub struct Pooled<'a, T: Recycle> {
    value: Option<T>,
    registry: &'a PoolRegistry,
}

impl<T: Recycle> Pooled<'_, T> {
    /// Return the value to its free list
    pub fn free(mut self) {
        if let Some(value) = self.value.take() {
            self.registry.release(value);
        }
    }

    /// Keep the value and detach it from the pool
    pub fn into_inner(mut self) -> T {
        self.value.take().unwrap_or_default()
    }
}

impl<T: Recycle> Deref for Pooled<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        match &self.value {
            Some(value) => value,
            None => unreachable!("pooled value is only taken by value-consuming methods"),
        }
    }
}

impl<T: Recycle> DerefMut for Pooled<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        match &mut self.value {
            Some(value) => value,
            None => unreachable!("pooled value is only taken by value-consuming methods"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Buffer {
        data: Vec<u8>,
        label: Option<String>,
    }

    impl Recycle for Buffer {
        const KIND: &'static str = "buffer";

        fn reset(&mut self) {
            self.data.clear();
            self.label = None;
        }
    }

    #[derive(Debug, Default)]
    struct Counter(u32);

    impl Recycle for Counter {
        const KIND: &'static str = "counter";

        fn reset(&mut self) {
            self.0 = 0;
        }
    }

    #[test]
    fn test_recycled_value_is_reset() {
        let pool = PoolRegistry::new();
        let mut buf = pool.acquire::<Buffer>();
        buf.data.extend_from_slice(b"dirty");
        buf.label = Some("used".to_string());
        let capacity = buf.data.capacity();
        buf.free();
        assert_eq!(pool.available::<Buffer>(), 1);

        let again = pool.acquire::<Buffer>();
        assert!(again.data.is_empty());
        assert!(again.label.is_none());
        assert_eq!(again.data.capacity(), capacity);
        assert_eq!(pool.available::<Buffer>(), 0);
    }

    #[test]
    fn test_kinds_are_kept_apart() {
        let pool = PoolRegistry::new();
        let mut counter = pool.acquire::<Counter>();
        counter.0 = 7;
        counter.free();

        assert_eq!(pool.available::<Buffer>(), 0);
        assert_eq!(pool.available::<Counter>(), 1);
        assert_eq!(pool.acquire::<Counter>().0, 0);
    }

    #[test]
    fn test_dropped_value_is_not_recycled() {
        let pool = PoolRegistry::new();
        {
            let _buf = pool.acquire::<Buffer>();
        }
        assert_eq!(pool.available::<Buffer>(), 0);

        let kept = pool.acquire::<Buffer>().into_inner();
        assert!(kept.data.is_empty());
    }

    #[test]
    fn test_global_registry() {
        let mut counter = acquire::<Counter>();
        counter.0 += 1;
        counter.free();
        assert!(PoolRegistry::global().available::<Counter>() >= 1);
    }
}
