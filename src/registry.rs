//! Driver identity and registration.
//!
//! The registry is an explicit object rather than process-global state,
//! but the keys it holds live in one namespace: two independently
//! configured wrapped drivers must never share a key, so keys are
//! generated with a random suffix and re-registration under a used key
//! is a startup configuration error, never a silent overwrite.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use uuid::Uuid;

use crate::connection::TracedConnection;
use crate::driver::TracedDriver;
use crate::error::DriverError;

/// Fixed prefix of generated registration keys.
pub const DRIVER_KEY_PREFIX: &str = "sql-wrapper";

/// Generate a fresh unique registration key:
/// `sql-wrapper-<random uuid>`.
pub fn driver_key() -> String {
    format!("{DRIVER_KEY_PREFIX}-{}", Uuid::new_v4())
}

/// A name-keyed registry of wrapped drivers.
#[derive(Default)]
pub struct DriverRegistry {
    drivers: RwLock<HashMap<String, Arc<TracedDriver>>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a wrapped driver under `key`.
    ///
    /// Fails with [`DriverError::AlreadyRegistered`] if the key is
    /// taken; the existing driver is left untouched.
    pub fn register(&self, key: &str, driver: TracedDriver) -> Result<(), DriverError> {
        let mut drivers = self.drivers.write().expect("driver registry lock poisoned");
        if drivers.contains_key(key) {
            return Err(DriverError::AlreadyRegistered(key.to_string()));
        }
        drivers.insert(key.to_string(), Arc::new(driver));
        Ok(())
    }

    /// Open a connection through the driver registered under `key`.
    pub async fn connect(&self, key: &str, dsn: &str) -> Result<TracedConnection, DriverError> {
        let driver = {
            let drivers = self.drivers.read().expect("driver registry lock poisoned");
            drivers
                .get(key)
                .cloned()
                .ok_or_else(|| DriverError::UnknownDriver(key.to_string()))?
        };
        driver.connect(dsn).await
    }

    /// Whether a driver is registered under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.drivers
            .read()
            .expect("driver registry lock poisoned")
            .contains_key(key)
    }

    /// Number of registered drivers.
    pub fn len(&self) -> usize {
        self.drivers
            .read()
            .expect("driver registry lock poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_keys_are_unique() {
        let a = driver_key();
        let b = driver_key();
        assert_ne!(a, b);
        assert!(a.starts_with("sql-wrapper-"));
        assert!(b.starts_with("sql-wrapper-"));
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let registry = DriverRegistry::new();
        let key = driver_key();

        registry
            .register(&key, TracedDriver::new(Box::new(NopDriver), crate::hooks::Hooks::noop()))
            .unwrap();
        let err = registry
            .register(&key, TracedDriver::new(Box::new(NopDriver), crate::hooks::Hooks::noop()))
            .unwrap_err();
        assert!(matches!(err, DriverError::AlreadyRegistered(k) if k == key));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_connect_with_unknown_key_fails() {
        let registry = DriverRegistry::new();
        let err = registry.connect("sql-wrapper-missing", "dsn").await.unwrap_err();
        assert!(matches!(err, DriverError::UnknownDriver(_)));
    }

    struct NopDriver;

    #[async_trait::async_trait]
    impl crate::native::NativeDriver for NopDriver {
        async fn connect(
            &self,
            _dsn: &str,
        ) -> Result<Box<dyn crate::native::NativeConnection>, DriverError> {
            Err(DriverError::Connect("nop".into()))
        }
    }
}
