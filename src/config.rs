//! Configuration primitives for the BMM050 binding.

use crate::params::Preset;

/// Number of attempts each transaction phase gets before it is abandoned.
pub const DEFAULT_MAX_ATTEMPTS: u16 = 100;

/// User-facing configuration for the SPI transport and sensor core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Upper bound on attempts per transaction phase (address, payload).
    pub max_attempts: u16,
    /// Byte clocked out on MOSI while reading the payload.
    pub read_dummy: u8,
    /// Repetition preset programmed during sensor init.
    pub preset: Preset,
}

impl Config {
    /// Begins building a [`Config`] using the builder pattern.
    pub fn new() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Checks whether this configuration is usable.
    pub fn validate(&self) -> core::result::Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }

        Ok(())
    }

    /// Extracts the transport-level retry settings.
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            read_dummy: self.read_dummy,
        }
    }
}

/// Builder for [`Config`] allowing piecemeal construction.
#[derive(Debug, Clone, Copy)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Creates a new builder seeded with [`Config::default()`].
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Overrides the per-phase attempt bound.
    pub fn max_attempts(mut self, max_attempts: u16) -> Self {
        self.config.max_attempts = max_attempts;
        self
    }

    /// Overrides the dummy byte sent during reads.
    pub fn read_dummy(mut self, read_dummy: u8) -> Self {
        self.config.read_dummy = read_dummy;
        self
    }

    /// Selects the repetition preset.
    pub fn preset(mut self, preset: Preset) -> Self {
        self.config.preset = preset;
        self
    }

    /// Finalizes the builder and returns the [`Config`].
    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            read_dummy: 0x00,
            preset: Preset::Regular,
        }
    }
}

/// Retry settings consumed by [`SpiInterface`](crate::interface::spi::SpiInterface).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Upper bound on attempts per phase. A phase always runs at least once,
    /// so zero behaves like one.
    pub max_attempts: u16,
    /// Byte clocked out while reading.
    pub read_dummy: u8,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Config::default().retry_policy()
    }
}

/// Validation errors generated while verifying a [`Config`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A retry bound of zero would never attempt a transfer.
    ZeroAttempts,
}
