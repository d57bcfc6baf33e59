pub mod amount;
pub mod config;

pub use amount::{AmountError, DEFAULT_DECIMALS};
pub use config::{
    Config, ConfigError, DeployConfig, InProcessConfig, JsonRpcConfig, NetworkConfig,
};
