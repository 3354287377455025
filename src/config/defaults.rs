use super::*;

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            host: "192.168.1.100".to_string(),
            password: String::new(),
            request_timeout_ms: 10_000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            console_level: None,
            file_level: None,
            file: "/tmp/pracht-alpha.log".to_string(),
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: 8089,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device: DeviceConfig::default(),
            poll_interval_ms: 15_000,
            logging: LoggingConfig::default(),
            web: WebConfig::default(),
        }
    }
}
