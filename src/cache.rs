use std::{collections::HashMap, sync::{Arc, RwLock}};

use kstring::KString;


/// Read-through cache of immutable values shared as `Arc<T>`, keyed
/// by source text or file name. Readers only take the read lock; the
/// write lock is taken on the first use of a key. Values are never
/// replaced once inserted (a racing second insert of the same key
/// loses and gets the first value).
pub struct Cache<T> {
    map: RwLock<HashMap<KString, Arc<T>>>,
}

impl<T> Default for Cache<T> {
    fn default() -> Self {
        Cache { map: RwLock::new(HashMap::new()) }
    }
}

impl<T> Cache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Arc<T>> {
        // A poisoned lock still holds a consistent map, as values are
        // only ever inserted whole.
        let map = self.map.read().unwrap_or_else(|e| e.into_inner());
        map.get(key).cloned()
    }

    pub fn get_or_try_insert<E>(
        &self,
        key: &str,
        build: impl FnOnce() -> Result<T, E>
    ) -> Result<Arc<T>, E> {
        if let Some(v) = self.get(key) {
            return Ok(v)
        }
        let v = Arc::new(build()?);
        let mut map = self.map.write().unwrap_or_else(|e| e.into_inner());
        Ok(map.entry(KString::from_ref(key)).or_insert(v).clone())
    }

    pub fn get_or_insert(&self, key: &str, build: impl FnOnce() -> T) -> Arc<T> {
        if let Some(v) = self.get(key) {
            return v
        }
        let v = Arc::new(build());
        let mut map = self.map.write().unwrap_or_else(|e| e.into_inner());
        map.entry(KString::from_ref(key)).or_insert(v).clone()
    }

    pub fn len(&self) -> usize {
        self.map.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.map.write().unwrap_or_else(|e| e.into_inner()).clear();
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn t_first_insert_wins() {
        let c: Cache<String> = Cache::new();
        let a = c.get_or_try_insert("k", || Ok::<_, ()>("a".to_string())).unwrap();
        let b = c.get_or_try_insert("k", || Ok::<_, ()>("b".to_string())).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(*b, "a");
        assert!(c.get_or_try_insert("e", || Err::<String, _>("nope")).is_err());
        assert_eq!(c.len(), 1);
        let d = c.get_or_insert("k", || "d".to_string());
        assert!(Arc::ptr_eq(&a, &d));
        assert_eq!(*c.get_or_insert("f", || "f".to_string()), "f");
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn t_concurrent() {
        let c: Arc<Cache<usize>> = Arc::new(Cache::new());
        let handles: Vec<_> = (0..8).map(|i| {
            let c = c.clone();
            thread::spawn(move || {
                *c.get_or_try_insert("shared", || Ok::<_, ()>(i)).unwrap()
            })
        }).collect();
        let results: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(results.iter().all(|r| *r == results[0]));
    }
}
