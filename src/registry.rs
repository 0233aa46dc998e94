// 🗂️ Service Registry - typed singleton lookup
//
// One instance per type, created once. Looking a type up before it was
// registered is a wiring bug and fails with the type's name.
//
// `Depot::open` is the composition root and fills a registry explicitly;
// `global()` exists for code that can only reach a process-wide handle.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use log::debug;
use once_cell::sync::Lazy;

use crate::error::RegistryError;

type Service = Arc<dyn Any + Send + Sync>;

#[derive(Default)]
pub struct ServiceRegistry {
    services: RwLock<HashMap<TypeId, Service>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the instance for `T`. A type can be registered only once.
    pub fn register<T>(&self, instance: T) -> Result<Arc<T>, RegistryError>
    where
        T: Send + Sync + 'static,
    {
        self.register_arc(Arc::new(instance))
    }

    /// Register an instance that is already shared elsewhere.
    pub fn register_arc<T>(&self, instance: Arc<T>) -> Result<Arc<T>, RegistryError>
    where
        T: Send + Sync + 'static,
    {
        let mut services = self.services.write().unwrap_or_else(PoisonError::into_inner);
        if services.contains_key(&TypeId::of::<T>()) {
            return Err(RegistryError::AlreadyRegistered {
                type_name: type_name::<T>(),
            });
        }

        services.insert(TypeId::of::<T>(), instance.clone());
        debug!("registered service {}", type_name::<T>());
        Ok(instance)
    }

    /// The singleton for `T`; the same `Arc` on every call.
    pub fn get<T>(&self) -> Result<Arc<T>, RegistryError>
    where
        T: Send + Sync + 'static,
    {
        let services = self.services.read().unwrap_or_else(PoisonError::into_inner);
        services
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|service| service.downcast::<T>().ok())
            .ok_or(RegistryError::NotRegistered {
                type_name: type_name::<T>(),
            })
    }

    pub fn is_registered<T>(&self) -> bool
    where
        T: Send + Sync + 'static,
    {
        self.services
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&TypeId::of::<T>())
    }

    /// Lookup that creates the instance on first use.
    ///
    /// `init` runs at most once and under the registry's write lock, so it
    /// must not call back into this registry.
    pub fn get_or_register_with<T, F>(&self, init: F) -> Arc<T>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        if let Ok(existing) = self.get::<T>() {
            return existing;
        }

        let mut services = self.services.write().unwrap_or_else(PoisonError::into_inner);
        // Another thread may have won the race between the two locks
        if let Some(service) = services.get(&TypeId::of::<T>()) {
            if let Ok(existing) = service.clone().downcast::<T>() {
                return existing;
            }
        }

        let instance = Arc::new(init());
        services.insert(TypeId::of::<T>(), instance.clone());
        debug!("created service {} on first use", type_name::<T>());
        instance
    }

    pub fn len(&self) -> usize {
        self.services.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

static GLOBAL: Lazy<ServiceRegistry> = Lazy::new(ServiceRegistry::new);

/// Process-wide registry, created on first access and never torn down.
pub fn global() -> &'static ServiceRegistry {
    &GLOBAL
}
