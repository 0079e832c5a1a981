//! Property-based test generators using proptest.
//!
//! Provides strategies for keys, segments and operation sequences that
//! respect the key invariants (non-empty symbol, known key type).

use proptest::prelude::*;
use tessera_storage::{AtomKey, KeyBuilder, KeySegmentPair, KeyType, Segment, SegmentHeader};

/// Strategy for generating key types.
pub fn key_type_strategy() -> impl Strategy<Value = KeyType> {
    prop::sample::select(KeyType::ALL.to_vec())
}

/// Strategy for generating symbols.
///
/// Symbols never contain the fault-trigger marker.
pub fn symbol_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z][a-zA-Z0-9_.]{0,23}").expect("Invalid regex")
}

/// Strategy for generating valid atom keys.
pub fn atom_key_strategy() -> impl Strategy<Value = AtomKey> {
    (
        key_type_strategy(),
        any::<u64>(),
        symbol_strategy(),
        prop::option::of(any::<i64>()),
        prop::option::of(any::<u64>()),
    )
        .prop_map(|(key_type, version_id, symbol, ts, hash)| {
            let mut builder = KeyBuilder::new(key_type)
                .version_id(version_id)
                .symbol(symbol);
            if let Some(ts) = ts {
                builder = builder.creation_ts(ts);
            }
            if let Some(hash) = hash {
                builder = builder.content_hash(hash);
            }
            builder.build().expect("generated key is valid")
        })
}

/// Strategy for generating segment payloads.
pub fn payload_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..1024)
}

/// Strategy for generating segments with arbitrary headers.
pub fn segment_strategy() -> impl Strategy<Value = Segment> {
    (any::<i64>(), any::<i64>(), any::<u16>(), payload_strategy()).prop_map(
        |(start_ts, end_ts, encoding_version, payload)| {
            let mut segment = Segment::with_buffer(payload);
            *segment.header_mut() = SegmentHeader {
                start_ts,
                end_ts,
                encoding_version,
            };
            segment
        },
    )
}

/// Strategy for generating key/segment pairs.
pub fn pair_strategy() -> impl Strategy<Value = KeySegmentPair> {
    (atom_key_strategy(), segment_strategy())
        .prop_map(|(key, segment)| KeySegmentPair::with_segment(key, segment))
}

/// A storage operation for model-based testing.
#[derive(Debug, Clone)]
pub enum StorageOperation {
    /// Write a new key.
    Write {
        /// Symbol of the version-0 key.
        symbol: String,
        /// Payload.
        payload: Vec<u8>,
    },
    /// Update a key, optionally creating it.
    Update {
        /// Symbol of the version-0 key.
        symbol: String,
        /// Payload.
        payload: Vec<u8>,
        /// Create the key if absent.
        upsert: bool,
    },
    /// Remove a key.
    Remove {
        /// Symbol of the version-0 key.
        symbol: String,
        /// Succeed even if the key is absent.
        ignores_missing_key: bool,
    },
    /// Read a key.
    Read {
        /// Symbol of the version-0 key.
        symbol: String,
    },
}

impl StorageOperation {
    /// The symbol the operation targets.
    #[must_use]
    pub fn symbol(&self) -> &str {
        match self {
            Self::Write { symbol, .. }
            | Self::Update { symbol, .. }
            | Self::Remove { symbol, .. }
            | Self::Read { symbol } => symbol,
        }
    }
}

/// Strategy for symbols drawn from a small pool, so operations collide.
fn pooled_symbol_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["alpha", "beta", "gamma", "delta"]).prop_map(String::from)
}

/// Strategy for generating storage operations.
pub fn storage_operation_strategy() -> impl Strategy<Value = StorageOperation> {
    prop_oneof![
        3 => (pooled_symbol_strategy(), payload_strategy())
            .prop_map(|(symbol, payload)| StorageOperation::Write { symbol, payload }),
        2 => (pooled_symbol_strategy(), payload_strategy(), any::<bool>())
            .prop_map(|(symbol, payload, upsert)| StorageOperation::Update { symbol, payload, upsert }),
        2 => (pooled_symbol_strategy(), any::<bool>())
            .prop_map(|(symbol, ignores_missing_key)| StorageOperation::Remove { symbol, ignores_missing_key }),
        2 => pooled_symbol_strategy().prop_map(|symbol| StorageOperation::Read { symbol }),
    ]
}

/// Strategy for generating a sequence of operations.
pub fn operation_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<StorageOperation>> {
    prop::collection::vec(storage_operation_strategy(), min_ops..max_ops)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn symbol_is_non_empty(symbol in symbol_strategy()) {
            prop_assert!(!symbol.is_empty());
            prop_assert!(!symbol.contains('#'));
        }

        #[test]
        fn key_survives_binary_form(key in atom_key_strategy()) {
            let decoded = AtomKey::decode(&key.encode()).unwrap();
            prop_assert_eq!(decoded, key);
        }

        #[test]
        fn segment_survives_persisted_form(segment in segment_strategy()) {
            let decoded = Segment::decode(&segment.encode()).unwrap();
            prop_assert_eq!(decoded, segment);
        }

        #[test]
        fn operations_target_pooled_symbols(ops in operation_sequence_strategy(1, 20)) {
            for op in &ops {
                prop_assert!(["alpha", "beta", "gamma", "delta"].contains(&op.symbol()));
            }
        }
    }
}
