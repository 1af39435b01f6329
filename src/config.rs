use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub cluster: ClusterConfig,
    pub node: NodeConfig,
    /// How long a write waits for its command to be committed and applied
    pub write_timeout_ms: u64,
    /// Number of recent apply outcomes kept for the submitting request
    pub outcome_capacity: usize,
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub bind_address: String,
    pub data_dir: String,
    pub id: String,
}

#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// TCP port for inter-node cluster communication
    pub cluster_port: u16,
    pub discovery: DiscoveryConfig,
    pub election_timeout_ms: u64,
    pub heartbeat_interval_ms: u64,
    pub peers: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// DNS name to resolve for peer discovery (e.g., a Kubernetes headless service).
    pub dns_name: Option<String>,
    /// How often to poll for peer changes (seconds)
    pub poll_interval_seconds: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            dns_name: None,
            poll_interval_seconds: 5,
        }
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            cluster_port: 12000,
            discovery: DiscoveryConfig::default(),
            election_timeout_ms: 3000,
            heartbeat_interval_ms: 300,
            peers: Vec::new(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let node_id = std::env::var("NODE_ID").unwrap_or_else(|_| uuid::Uuid::new_v4().to_string());

        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let data_dir =
            std::env::var("DATA_DIR").unwrap_or_else(|_| format!("./raft-data/{node_id}"));

        let peers: Vec<String> = std::env::var("PEERS")
            .map(|p| {
                p.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .filter(|s| !s.starts_with(&format!("{node_id}:")) && s != &node_id)
                    .collect()
            })
            .unwrap_or_default();

        let defaults = ClusterConfig::default();

        let config = Config {
            node: NodeConfig {
                id: node_id,
                bind_address,
                data_dir,
            },
            cluster: ClusterConfig {
                cluster_port: env_parse("CLUSTER_PORT").unwrap_or(defaults.cluster_port),
                peers,
                discovery: DiscoveryConfig {
                    dns_name: std::env::var("DISCOVERY_DNS_NAME").ok(),
                    poll_interval_seconds: env_parse("DISCOVERY_POLL_INTERVAL").unwrap_or(5),
                },
                election_timeout_ms: env_parse("ELECTION_TIMEOUT_MS")
                    .unwrap_or(defaults.election_timeout_ms),
                heartbeat_interval_ms: env_parse("HEARTBEAT_INTERVAL_MS")
                    .unwrap_or(defaults.heartbeat_interval_ms),
            },
            write_timeout_ms: env_parse("WRITE_TIMEOUT_MS").unwrap_or(5000),
            outcome_capacity: env_parse("OUTCOME_CAPACITY").unwrap_or(1024),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.node.id.is_empty() {
            return Err(ConfigError::ValidationError(
                "NODE_ID cannot be empty".to_string(),
            ));
        }

        if self.write_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "WRITE_TIMEOUT_MS must be greater than 0".to_string(),
            ));
        }

        if self.outcome_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "OUTCOME_CAPACITY must be greater than 0".to_string(),
            ));
        }

        if self.cluster.heartbeat_interval_ms >= self.cluster.election_timeout_ms {
            return Err(ConfigError::ValidationError(format!(
                "HEARTBEAT_INTERVAL_MS ({}) must be less than ELECTION_TIMEOUT_MS ({})",
                self.cluster.heartbeat_interval_ms, self.cluster.election_timeout_ms
            )));
        }

        let cluster_size = self.cluster.peers.len() + 1;
        if cluster_size > 1 && cluster_size.is_multiple_of(2) {
            tracing::warn!(
                "Cluster size {} is even. This may lead to split-brain scenarios. \
                 Consider using an odd number of nodes.",
                cluster_size
            );
        }

        Ok(())
    }

    /// Check if running in single-node mode.
    pub fn is_single_node(&self) -> bool {
        self.cluster.peers.is_empty() && self.cluster.discovery.dns_name.is_none()
    }

    pub fn write_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.write_timeout_ms)
    }
}
