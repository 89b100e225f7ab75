//! Per-connection decoder registry.
//!
//! `DecoderRegistry` owns one [`FrameDecoder`] per live connection so that
//! chunks from different connections never share a stream buffer. Decoders
//! are created lazily on first use and dropped when the connection closes,
//! returning their buffers to the pool.

use std::sync::Arc;

use dashmap::DashMap;
use log::debug;

use crate::{
    config::DecoderConfig,
    decoder::FrameDecoder,
    frame::Frame,
    metrics,
    pool::BufferPool,
    session::ConnectionId,
};

/// Concurrent map of decoders keyed by [`ConnectionId`].
#[derive(Debug)]
pub struct DecoderRegistry {
    decoders: DashMap<ConnectionId, Arc<FrameDecoder>>,
    config: DecoderConfig,
    pool: Arc<BufferPool>,
}

impl DecoderRegistry {
    /// Create a registry whose decoders use `config` and the shared pool.
    #[must_use]
    pub fn new(config: DecoderConfig) -> Self { Self::with_pool(config, BufferPool::shared()) }

    /// Create a registry whose decoders draw buffers from `pool`.
    #[must_use]
    pub fn with_pool(config: DecoderConfig, pool: Arc<BufferPool>) -> Self {
        Self {
            decoders: DashMap::new(),
            config,
            pool,
        }
    }

    /// Decoder for `id`, creating it if this is the connection's first chunk.
    #[must_use]
    pub fn get_or_create(&self, id: ConnectionId) -> Arc<FrameDecoder> {
        let entry = self.decoders.entry(id).or_insert_with(|| {
            debug!("creating decoder: connection_id={id}");
            metrics::inc_decoders();
            Arc::new(
                FrameDecoder::with_pool(self.config, Arc::clone(&self.pool)).for_connection(id),
            )
        });
        Arc::clone(entry.value())
    }

    /// Decoder for `id`, if one exists.
    #[must_use]
    pub fn get(&self, id: ConnectionId) -> Option<Arc<FrameDecoder>> {
        self.decoders.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// Append `bytes` to the decoder for `id` and return completed frames.
    ///
    /// The map shard lock is released before decoding so connections hashed
    /// to the same shard do not block each other.
    #[must_use]
    pub fn append(&self, id: ConnectionId, bytes: &[u8]) -> Vec<Frame> {
        self.get_or_create(id).append(bytes)
    }

    /// Discard buffered bytes for `id` without forgetting the connection.
    ///
    /// Returns `false` if no decoder exists for `id`.
    pub fn reset(&self, id: ConnectionId) -> bool {
        match self.get(id) {
            Some(decoder) => {
                decoder.clear();
                true
            }
            None => false,
        }
    }

    /// Drop the decoder for `id`. Returns `true` if one was removed.
    pub fn remove(&self, id: ConnectionId) -> bool {
        let removed = self.decoders.remove(&id).is_some();
        if removed {
            debug!("removed decoder: connection_id={id}");
            metrics::dec_decoders();
        }
        removed
    }

    /// Connections that currently own a decoder.
    #[must_use]
    pub fn active_ids(&self) -> Vec<ConnectionId> {
        self.decoders.iter().map(|entry| *entry.key()).collect()
    }

    /// Number of live decoders.
    #[must_use]
    pub fn len(&self) -> usize { self.decoders.len() }

    /// Whether no decoder is live.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.decoders.is_empty() }
}

impl Default for DecoderRegistry {
    fn default() -> Self { Self::new(DecoderConfig::default()) }
}

impl Drop for DecoderRegistry {
    fn drop(&mut self) {
        for _ in 0..self.decoders.len() {
            metrics::dec_decoders();
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;

    fn frame_bytes(method_id: u16, body: &[u8]) -> Vec<u8> {
        Frame::new(method_id, body.to_vec()).to_bytes().to_vec()
    }

    #[fixture]
    fn registry() -> DecoderRegistry {
        DecoderRegistry::with_pool(DecoderConfig::default(), Arc::new(BufferPool::new(1)))
    }

    #[rstest]
    fn connections_do_not_share_buffers(registry: DecoderRegistry) {
        let a = ConnectionId::new(1);
        let b = ConnectionId::new(2);
        let first = frame_bytes(10, b"from a");
        let second = frame_bytes(20, b"from b");

        assert!(registry.append(a, &first[..5]).is_empty());
        assert!(registry.append(b, &second[..5]).is_empty());
        let from_a = registry.append(a, &first[5..]);
        let from_b = registry.append(b, &second[5..]);

        assert_eq!(from_a[0].method_id(), 10);
        assert_eq!(from_b[0].method_id(), 20);
        assert_eq!(registry.len(), 2);
    }

    #[rstest]
    fn get_or_create_reuses_decoder(registry: DecoderRegistry) {
        let id = ConnectionId::new(3);
        let first = registry.get_or_create(id);
        let second = registry.get_or_create(id);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.connection(), Some(id));
    }

    #[rstest]
    fn reset_keeps_connection(registry: DecoderRegistry) {
        let id = ConnectionId::new(4);
        let _ = registry.append(id, &frame_bytes(1, b"partial")[..4]);

        assert!(registry.reset(id));
        assert_eq!(registry.get(id).map(|d| d.buffered_len()), Some(0));
        assert!(!registry.reset(ConnectionId::new(99)));
    }

    #[rstest]
    fn remove_forgets_connection(registry: DecoderRegistry) {
        let id = ConnectionId::new(5);
        let _ = registry.get_or_create(id);

        assert!(registry.remove(id));
        assert!(!registry.remove(id));
        assert!(registry.is_empty());
        assert!(registry.active_ids().is_empty());
    }
}
