//! ID and attachment key generation.

use uuid::Uuid;

use crate::storage::MediaKind;

/// Generator for opaque identifiers handed to external services.
///
/// Conversation and message ids are assigned by the database; this type only
/// produces the collision-resistant keys under which binaries are stored in
/// the blob service.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    _private: (),
}

impl IdGenerator {
    /// Create a new ID generator.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }

    /// Generate an opaque attachment key with the extension matching the
    /// media kind, e.g. `8f14e45f-....jpg`.
    #[must_use]
    pub fn attachment_key(&self, kind: MediaKind) -> String {
        format!("{}.{}", Uuid::new_v4(), kind.extension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_key_extension() {
        let id_gen = IdGenerator::new();
        assert!(id_gen.attachment_key(MediaKind::Image).ends_with(".jpg"));
        assert!(id_gen.attachment_key(MediaKind::Video).ends_with(".mp4"));
    }

    #[test]
    fn test_attachment_keys_are_unique() {
        let id_gen = IdGenerator::new();
        let a = id_gen.attachment_key(MediaKind::Image);
        let b = id_gen.attachment_key(MediaKind::Image);
        assert_ne!(a, b);
    }
}
