//! Lock-guarded accumulation of segment buffers.

use parking_lot::Mutex;

use crate::segment::Segment;

/// Handle to a buffer inside a [`BufferHolder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(usize);

/// Buffers being filled by several threads before they become segments.
///
/// Every creation and append goes through one mutex. Buffers are only
/// reachable through [`BufferId`] handles, never as a shared container.
///
/// ```rust
/// use tessera_storage::BufferHolder;
///
/// let holder = BufferHolder::new();
/// let id = holder.add(b"head".to_vec());
/// holder.append(id, b"-tail");
/// assert_eq!(holder.get(id).unwrap(), b"head-tail");
/// ```
#[derive(Debug, Default)]
pub struct BufferHolder {
    buffers: Mutex<Vec<Vec<u8>>>,
}

impl BufferHolder {
    /// Creates an empty holder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new buffer and returns its handle.
    pub fn add(&self, initial: Vec<u8>) -> BufferId {
        let mut buffers = self.buffers.lock();
        buffers.push(initial);
        BufferId(buffers.len() - 1)
    }

    /// Appends `bytes` to buffer `id`, returning its new length.
    ///
    /// Returns `None` if `id` was not issued by this holder.
    pub fn append(&self, id: BufferId, bytes: &[u8]) -> Option<usize> {
        let mut buffers = self.buffers.lock();
        let buffer = buffers.get_mut(id.0)?;
        buffer.extend_from_slice(bytes);
        Some(buffer.len())
    }

    /// Returns a copy of buffer `id`.
    #[must_use]
    pub fn get(&self, id: BufferId) -> Option<Vec<u8>> {
        self.buffers.lock().get(id.0).cloned()
    }

    /// Number of buffers registered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffers.lock().len()
    }

    /// Returns true if no buffer was registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffers.lock().is_empty()
    }

    /// Consumes the holder, returning the buffers in registration order.
    #[must_use]
    pub fn take_all(self) -> Vec<Vec<u8>> {
        self.buffers.into_inner()
    }

    /// Consumes the holder, wrapping each buffer in a segment.
    #[must_use]
    pub fn into_segments(self) -> Vec<Segment> {
        self.take_all().into_iter().map(Segment::with_buffer).collect()
    }
}
