use super::RequestsLoggingLevel;

#[derive(Clone)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub port: u16,
    /// Shared secret checked by the admin access gate.
    pub admin_key: String,
    /// Per-file ceiling for uploaded payloads, in bytes.
    pub max_file_size: u64,
    /// If true, dependency failures are reported with a generic message
    /// instead of the underlying error detail.
    pub production_errors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            port: 3001,
            admin_key: String::new(),
            max_file_size: 10 * 1024 * 1024,
            production_errors: false,
        }
    }
}
