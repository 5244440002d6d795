//! Message pool configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Routing counter written by `set_routing_count` unless configured otherwise
pub const DEFAULT_ROUTING_COUNT: u8 = 6;

/// Highest value the 3-bit routing counter can hold
pub const MAX_ROUTING_COUNT: u8 = 7;

/// Configuration for message pools
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePoolConfig {
    /// Name of the pool, used in log output
    pub name: String,
    /// How long `allocate_blocking` waits for a slot; `None` tries once
    pub allocation_timeout: Option<Duration>,
    /// Value written into the npci routing counter by `set_routing_count`
    pub routing_count: u8,
}

impl Default for MessagePoolConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            allocation_timeout: Some(Duration::from_millis(100)),
            routing_count: DEFAULT_ROUTING_COUNT,
        }
    }
}

impl MessagePoolConfig {
    /// Create a new configuration with custom name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set allocation timeout
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.allocation_timeout = timeout;
        self
    }

    /// Set routing count
    pub fn with_routing_count(mut self, count: u8) -> Self {
        self.routing_count = count;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::MsgError;

        if self.name.is_empty() {
            return Err(MsgError::invalid_parameter(
                "name",
                "Pool name cannot be empty",
            ));
        }

        if self.routing_count > MAX_ROUTING_COUNT {
            return Err(MsgError::invalid_parameter(
                "routing_count",
                format!("Routing count must not exceed {}", MAX_ROUTING_COUNT),
            ));
        }

        Ok(())
    }
}

/// Builder pattern for message pool configuration
pub struct MessagePoolConfigBuilder {
    config: MessagePoolConfig,
}

impl MessagePoolConfigBuilder {
    /// Create a new builder
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            config: MessagePoolConfig::new(name),
        }
    }

    /// Set timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.allocation_timeout = Some(timeout);
        self
    }

    /// No timeout
    pub fn no_timeout(mut self) -> Self {
        self.config.allocation_timeout = None;
        self
    }

    pub fn routing_count(mut self, count: u8) -> Self {
        self.config.routing_count = count;
        self
    }

    /// Build the configuration
    pub fn build(self) -> crate::error::Result<MessagePoolConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
