//! Fault-injecting in-memory object-store client.
//!
//! Symbols may carry a fault descriptor appended by
//! [`MockObjectStoreClient::fault_trigger`]:
//!
//! ```text
//! {symbol}#Failure_{OPERATION}_{code}_{retryable}
//! ```
//!
//! for example `sym#Failure_GET_3_0`. Because the symbol is part of every
//! object name, the client finds the descriptor on each call and fails with
//! the described error when the call's operation is the target operation.
//! All other calls behave like a plain object map.

use parking_lot::Mutex;
use std::collections::HashMap;

use super::client::{
    ClientResult, ObjectOperation, ObjectStoreClient, ObjectStoreClientError, ObjectStoreErrorCode,
};

const FAILURE_MARKER: &str = "#Failure_";

/// A decoded fault descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultDescriptor {
    /// The operation that fails.
    pub operation: ObjectOperation,
    /// The native code it fails with.
    pub code: ObjectStoreErrorCode,
    /// The retryable flag reported with the code.
    pub retryable: bool,
}

impl FaultDescriptor {
    /// Finds the last descriptor embedded in `name`.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let start = name.rfind(FAILURE_MARKER)? + FAILURE_MARKER.len();
        let mut fields = name[start..].splitn(3, '_');

        let operation = ObjectOperation::from_name(fields.next()?)?;
        let code = ObjectStoreErrorCode::from_code(fields.next()?.parse().ok()?);
        let retryable = match fields.next()?.chars().next()? {
            '0' => false,
            '1' => true,
            _ => return None,
        };

        Some(Self {
            operation,
            code,
            retryable,
        })
    }

    fn into_error(self) -> ObjectStoreClientError {
        ObjectStoreClientError::new(
            self.code,
            format!("simulated {} failure on {}", self.code, self.operation),
            self.retryable,
        )
    }
}

/// In-memory object map that fails on demand.
///
/// Used by tests, and by [`crate::StorageConfig`] when
/// `use_mock_storage_for_testing` is set.
#[derive(Debug, Default)]
pub struct MockObjectStoreClient {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
}

impl MockObjectStoreClient {
    /// Creates an empty client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a fault descriptor to `symbol`.
    ///
    /// Keys built with the returned symbol make `operation` fail with `code`.
    #[must_use]
    pub fn fault_trigger(
        symbol: &str,
        operation: ObjectOperation,
        code: ObjectStoreErrorCode,
        retryable: bool,
    ) -> String {
        format!(
            "{symbol}{FAILURE_MARKER}{}_{}_{}",
            operation.as_str(),
            code.code(),
            u8::from(retryable)
        )
    }

    /// Number of stored objects across all buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.lock().len()
    }

    /// Returns true if no object is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.lock().is_empty()
    }

    fn check_fault(operation: ObjectOperation, name: &str) -> ClientResult<()> {
        match FaultDescriptor::parse(name) {
            Some(fault) if fault.operation == operation => Err(fault.into_error()),
            _ => Ok(()),
        }
    }

    fn no_such_key(bucket: &str, name: &str) -> ObjectStoreClientError {
        ObjectStoreClientError::new(
            ObjectStoreErrorCode::NoSuchKey,
            format!("{bucket}/{name} does not exist"),
            false,
        )
    }
}

fn object_id(bucket: &str, name: &str) -> (String, String) {
    (bucket.to_string(), name.to_string())
}

impl ObjectStoreClient for MockObjectStoreClient {
    fn put_object(&self, bucket: &str, name: &str, body: Vec<u8>) -> ClientResult<()> {
        Self::check_fault(ObjectOperation::Put, name)?;
        self.objects.lock().insert(object_id(bucket, name), body);
        Ok(())
    }

    fn get_object(&self, bucket: &str, name: &str) -> ClientResult<Vec<u8>> {
        Self::check_fault(ObjectOperation::Get, name)?;
        self.objects
            .lock()
            .get(&object_id(bucket, name))
            .cloned()
            .ok_or_else(|| Self::no_such_key(bucket, name))
    }

    fn delete_object(&self, bucket: &str, name: &str) -> ClientResult<()> {
        Self::check_fault(ObjectOperation::Delete, name)?;
        self.objects
            .lock()
            .remove(&object_id(bucket, name))
            .map(|_| ())
            .ok_or_else(|| Self::no_such_key(bucket, name))
    }

    fn head_object(&self, bucket: &str, name: &str) -> ClientResult<()> {
        Self::check_fault(ObjectOperation::Head, name)?;
        if self.objects.lock().contains_key(&object_id(bucket, name)) {
            Ok(())
        } else {
            Err(Self::no_such_key(bucket, name))
        }
    }
}
