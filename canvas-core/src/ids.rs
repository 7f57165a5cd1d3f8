//! Identifier and nonce generation.
//!
//! Transforms never reach for a global random source; they take an
//! [`IdGenerator`] so hosts decide where ids come from and tests can use
//! [`SequentialIds`] for deterministic output.

use uuid::Uuid;

/// Source of fresh element ids, group ids and version nonces.
pub trait IdGenerator {
    /// A fresh element id.
    fn element_id(&mut self) -> String;

    /// A fresh group id.
    fn group_id(&mut self) -> String;

    /// A fresh `versionNonce`.
    fn nonce(&mut self) -> u32;
}

/// Random ids backed by UUID v4. Not meant to be unguessable.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn element_id(&mut self) -> String {
        Uuid::new_v4().simple().to_string()
    }

    fn group_id(&mut self) -> String {
        Uuid::new_v4().simple().to_string()
    }

    fn nonce(&mut self) -> u32 {
        let bytes = Uuid::new_v4().into_bytes();
        u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }
}

/// Deterministic ids: `el-1`, `el-2`, ... / `group-1`, ... and counting nonces.
#[derive(Debug, Clone, Default)]
pub struct SequentialIds {
    elements: u64,
    groups: u64,
    nonces: u32,
}

impl SequentialIds {
    /// Start all counters at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for SequentialIds {
    fn element_id(&mut self) -> String {
        self.elements += 1;
        format!("el-{}", self.elements)
    }

    fn group_id(&mut self) -> String {
        self.groups += 1;
        format!("group-{}", self.groups)
    }

    fn nonce(&mut self) -> u32 {
        self.nonces = self.nonces.wrapping_add(1);
        self.nonces
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_ids_are_deterministic() {
        let mut ids = SequentialIds::new();
        assert_eq!(ids.element_id(), "el-1");
        assert_eq!(ids.element_id(), "el-2");
        assert_eq!(ids.group_id(), "group-1");
        assert_eq!(ids.nonce(), 1);
        assert_eq!(ids.nonce(), 2);
    }

    #[test]
    fn test_random_ids_differ() {
        let mut ids = RandomIds;
        assert_ne!(ids.element_id(), ids.element_id());
        assert_ne!(ids.group_id(), ids.group_id());
    }
}
