use crate::header::MAX_PAYLOAD;

/// Default number of framing instances a registry can hold.
pub const DEFAULT_MAX_INSTANCES: usize = 8;

/// Hard ceiling on instances, so every handle fits in one byte.
pub const MAX_INSTANCES_LIMIT: usize = u8::MAX as usize;

/// Controls registry capacity and receive-side allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolConfig {
    /// Maximum number of instances. Clamped to [`MAX_INSTANCES_LIMIT`].
    pub max_instances: usize,
    /// Largest payload a receiver will allocate a buffer for. A validated
    /// header announcing more than this is reported as a packet length error.
    pub max_payload_size: usize,
}

impl ProtocolConfig {
    /// Instance capacity after clamping.
    pub fn instance_capacity(&self) -> usize {
        self.max_instances.min(MAX_INSTANCES_LIMIT)
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            max_instances: DEFAULT_MAX_INSTANCES,
            max_payload_size: MAX_PAYLOAD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_accepts_every_payload_length() {
        let config = ProtocolConfig::default();
        assert_eq!(config.max_payload_size, usize::from(u16::MAX));
        assert_eq!(config.instance_capacity(), DEFAULT_MAX_INSTANCES);
    }

    #[test]
    fn capacity_is_clamped_to_one_byte_handles() {
        let config = ProtocolConfig {
            max_instances: 10_000,
            ..ProtocolConfig::default()
        };
        assert_eq!(config.instance_capacity(), 255);
    }
}
