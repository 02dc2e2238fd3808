use crate::jvm::class_file::ClassFile;
use crate::jvm::{BinaryName, Error};
use log::{debug, info};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Name-keyed source of decoded classes
///
/// Names are in internal form (`a/b/Foo`). A class which can't be found is `Ok(None)`, while a
/// class which is found but can't be decoded is an error.
pub trait ClassRepository {
    fn lookup_class(&self, name: &str) -> Result<Option<Arc<ClassFile>>, Error>;
}

/// Repository over class file bytes held in memory
///
/// Names may be given in either internal (`a/b/Foo`) or dotted (`a.b.Foo`) form. Classes are
/// decoded the first time they are looked up and then cached until they are
/// explicitly evicted. Decoded classes are shared (and never mutated), so verifiers running on
/// different threads can use the same repository.
#[derive(Default)]
pub struct InMemoryRepository {
    sources: RwLock<HashMap<String, Arc<[u8]>>>,
    cache: RwLock<HashMap<String, Arc<ClassFile>>>,
}

impl InMemoryRepository {
    pub fn new() -> InMemoryRepository {
        InMemoryRepository::default()
    }

    /// Register (or replace) the bytes of a class
    ///
    /// Replacing a class also evicts its decoded form.
    pub fn add_class_bytes(&self, name: &str, bytes: impl Into<Vec<u8>>) -> Result<(), Error> {
        let name = BinaryName::internal_form(name);
        let bytes: Vec<u8> = bytes.into();
        self.evict(&name);
        self.sources
            .write()
            .map_err(|_| Self::poisoned())?
            .insert(name.into_owned(), Arc::from(bytes));
        Ok(())
    }

    /// Drop the decoded form of a class (it will be decoded again on the next lookup)
    pub fn evict(&self, name: &str) -> bool {
        let name = BinaryName::internal_form(name);
        let evicted = self
            .cache
            .write()
            .map(|mut cache| cache.remove(&*name).is_some())
            .unwrap_or(false);
        if evicted {
            debug!("Evicted {} from class cache", name);
        }
        evicted
    }

    /// Drop every decoded class
    pub fn clear(&self) {
        if let Ok(mut cache) = self.cache.write() {
            debug!("Clearing {} classes from class cache", cache.len());
            cache.clear();
        }
    }

    pub fn is_cached(&self, name: &str) -> bool {
        let name = BinaryName::internal_form(name);
        self.cache
            .read()
            .map(|cache| cache.contains_key(&*name))
            .unwrap_or(false)
    }

    fn poisoned() -> Error {
        Error::Format(String::from("class repository lock is poisoned"))
    }
}

impl ClassRepository for InMemoryRepository {
    fn lookup_class(&self, name: &str) -> Result<Option<Arc<ClassFile>>, Error> {
        let internal = BinaryName::internal_form(name);
        let name: &str = &internal;
        if let Some(class) = self.cache.read().map_err(|_| Self::poisoned())?.get(name) {
            return Ok(Some(class.clone()));
        }

        let bytes = match self.sources.read().map_err(|_| Self::poisoned())?.get(name) {
            Some(bytes) => bytes.clone(),
            None => return Ok(None),
        };
        let class = Arc::new(ClassFile::parse(&bytes)?);
        info!("Loaded {} ({} bytes)", name, bytes.len());

        let mut cache = self.cache.write().map_err(|_| Self::poisoned())?;
        Ok(Some(cache.entry(name.to_owned()).or_insert(class).clone()))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::class_file::Version;
    use crate::jvm::{ClassAccessFlags, Serialize};

    fn class_bytes(name: &str) -> Vec<u8> {
        ClassFile::new(
            Version::JAVA8,
            ClassAccessFlags::PUBLIC,
            name,
            Some("java/lang/Object"),
        )
        .unwrap()
        .to_bytes()
        .unwrap()
    }

    #[test]
    fn caches_until_evicted() {
        let repository = InMemoryRepository::new();
        repository.add_class_bytes("a/Foo", class_bytes("a/Foo")).unwrap();
        assert!(!repository.is_cached("a/Foo"));

        let first = repository.lookup_class("a/Foo").unwrap().unwrap();
        assert!(repository.is_cached("a/Foo"));
        let second = repository.lookup_class("a/Foo").unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        assert!(repository.evict("a/Foo"));
        assert!(!repository.evict("a/Foo"));
        let third = repository.lookup_class("a/Foo").unwrap().unwrap();
        assert!(!Arc::ptr_eq(&first, &third));

        repository.clear();
        assert!(!repository.is_cached("a/Foo"));
    }

    #[test]
    fn missing_and_malformed() {
        let repository = InMemoryRepository::new();
        assert!(repository.lookup_class("a/Missing").unwrap().is_none());

        repository.add_class_bytes("a/Broken", vec![0xca, 0xfe]).unwrap();
        assert!(matches!(
            repository.lookup_class("a/Broken"),
            Err(Error::Format(_))
        ));
        assert!(!repository.is_cached("a/Broken"));
    }

    #[test]
    fn dotted_and_internal_names_agree() {
        let repository = InMemoryRepository::new();
        repository
            .add_class_bytes("a.b.Foo", class_bytes("a/b/Foo"))
            .unwrap();
        let class = repository.lookup_class("a/b/Foo").unwrap().unwrap();
        assert_eq!(class.class_name().unwrap(), "a/b/Foo");
        assert!(repository.is_cached("a.b.Foo"));
        assert!(repository.evict("a.b.Foo"));
        assert!(repository.lookup_class("a.b.Foo").unwrap().is_some());
    }

    #[test]
    fn poisoned_lock_is_an_error() {
        let repository = InMemoryRepository::new();
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = repository.sources.write().unwrap();
            panic!("poison the sources");
        }));
        assert!(repository
            .add_class_bytes("a/Foo", class_bytes("a/Foo"))
            .is_err());
        assert!(repository.lookup_class("a/Foo").is_err());
    }
}
