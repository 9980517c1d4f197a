//! Registry configuration

use std::time::Duration;

/// Largest power of two a `usize` can hold
const MAX_WRITE_QUEUE_SIZE: usize = 1 << (usize::BITS - 1);

/// Runtime settings shared by the registry and every path it creates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Read timeout applied by path sources and readers
    pub read_timeout: Duration,

    /// Write timeout applied by path sources and readers
    pub write_timeout: Duration,

    /// Number of packets buffered per reader before dropping
    pub write_queue_size: usize,

    /// Maximum payload size of outgoing UDP packets
    pub udp_max_payload_size: usize,

    /// Address of the RTSP server, used when paths build redirect URLs
    pub rtsp_address: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_secs(10),
            write_timeout: Duration::from_secs(10),
            write_queue_size: 512,
            udp_max_payload_size: 1472, // 1500 MTU - IPv4/UDP headers
            rtsp_address: ":8554".into(),
        }
    }
}

impl RegistryConfig {
    /// Set the read timeout
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the write timeout
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set the per-reader write queue size (rounded up to a power of two)
    pub fn write_queue_size(mut self, size: usize) -> Self {
        self.write_queue_size = size
            .max(1)
            .checked_next_power_of_two()
            .unwrap_or(MAX_WRITE_QUEUE_SIZE);
        self
    }

    /// Set the maximum UDP payload size
    pub fn udp_max_payload_size(mut self, size: usize) -> Self {
        self.udp_max_payload_size = size;
        self
    }

    /// Set the RTSP server address
    pub fn rtsp_address(mut self, addr: impl Into<String>) -> Self {
        self.rtsp_address = addr.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RegistryConfig::default();

        assert_eq!(config.read_timeout, Duration::from_secs(10));
        assert_eq!(config.write_timeout, Duration::from_secs(10));
        assert_eq!(config.write_queue_size, 512);
        assert_eq!(config.udp_max_payload_size, 1472);
        assert_eq!(config.rtsp_address, ":8554");
    }

    #[test]
    fn test_builder_write_queue_size_rounded() {
        let config = RegistryConfig::default().write_queue_size(300);
        assert_eq!(config.write_queue_size, 512);

        let config = RegistryConfig::default().write_queue_size(0);
        assert_eq!(config.write_queue_size, 1);

        let config = RegistryConfig::default().write_queue_size(usize::MAX);
        assert_eq!(config.write_queue_size, MAX_WRITE_QUEUE_SIZE);
    }

    #[test]
    fn test_builder_chaining() {
        let config = RegistryConfig::default()
            .read_timeout(Duration::from_secs(5))
            .write_timeout(Duration::from_secs(3))
            .udp_max_payload_size(1200)
            .rtsp_address("127.0.0.1:8554");

        assert_eq!(config.read_timeout, Duration::from_secs(5));
        assert_eq!(config.write_timeout, Duration::from_secs(3));
        assert_eq!(config.udp_max_payload_size, 1200);
        assert_eq!(config.rtsp_address, "127.0.0.1:8554");
    }
}
