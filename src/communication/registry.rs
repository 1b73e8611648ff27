use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Well-known service identifiers
pub mod services {
    /// The agent daemon itself
    pub const AGENT: &str = "";
    /// Query analytics
    pub const QAN: &str = "qan";
    /// Metrics monitor
    pub const MM: &str = "mm";
}

/// Well-known command names
pub mod commands {
    pub const SET_LOG_FILE: &str = "SetLogFile";
    pub const SET_LOG_LEVEL: &str = "SetLogLevel";
    pub const SET_DATA_DIR: &str = "SetDataDir";
    pub const START_SERVICE: &str = "StartService";
    pub const STOP_SERVICE: &str = "StopService";
    pub const STATUS: &str = "Status";
    pub const UPDATE: &str = "Update";
    pub const STOP: &str = "Stop";
    pub const ABORT: &str = "Abort";
    pub const START_MONITOR: &str = "StartMonitor";
    pub const STOP_MONITOR: &str = "StopMonitor";
}

/// Read-only table of the commands each service accepts.
///
/// A service present with an empty command list is known but rejects every
/// command. There are no mutating operations: build the table once at start-up
/// and share it by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRegistry {
    services: BTreeMap<String, Vec<String>>,
}

impl CommandRegistry {
    /// Build a registry from an explicit service table
    pub fn from_table(services: BTreeMap<String, Vec<String>>) -> Self {
        Self { services }
    }

    /// Process-wide default registry
    pub fn global() -> &'static CommandRegistry {
        static REGISTRY: OnceLock<CommandRegistry> = OnceLock::new();
        REGISTRY.get_or_init(CommandRegistry::default)
    }

    /// Commands accepted by `service`, or `None` if the service is unknown
    pub fn lookup(&self, service: &str) -> Option<&[String]> {
        self.services.get(service).map(Vec::as_slice)
    }

    /// Exact, case-sensitive membership test
    pub fn accepts(&self, service: &str, cmd: &str) -> bool {
        self.lookup(service)
            .map_or(false, |cmds| cmds.iter().any(|c| c == cmd))
    }

    pub fn services(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        use commands::*;

        let table = [
            (
                services::AGENT,
                vec![
                    SET_LOG_FILE,
                    SET_LOG_LEVEL,
                    SET_DATA_DIR,
                    START_SERVICE,
                    STOP_SERVICE,
                    STATUS,
                    UPDATE,
                    STOP,
                    ABORT,
                ],
            ),
            // No commands defined yet
            (services::QAN, vec![]),
            (services::MM, vec![START_MONITOR, STOP_MONITOR]),
        ];

        let services = table
            .into_iter()
            .map(|(service, cmds)| {
                (
                    service.to_string(),
                    cmds.into_iter().map(str::to_string).collect(),
                )
            })
            .collect();

        Self { services }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_services() {
        let registry = CommandRegistry::default();
        let known: Vec<&str> = registry.services().collect();
        assert_eq!(known, vec!["", "mm", "qan"]);
    }

    #[test]
    fn test_agent_commands_keep_order() {
        let registry = CommandRegistry::default();
        let cmds = registry.lookup(services::AGENT).unwrap();
        assert_eq!(cmds.len(), 9);
        assert_eq!(cmds.first().map(String::as_str), Some("SetLogFile"));
        assert_eq!(cmds.last().map(String::as_str), Some("Abort"));
    }

    #[test]
    fn test_qan_is_known_but_empty() {
        let registry = CommandRegistry::default();
        assert_eq!(registry.lookup(services::QAN).map(|c| c.is_empty()), Some(true));
        assert!(!registry.accepts(services::QAN, "Status"));
    }

    #[test]
    fn test_unknown_service() {
        let registry = CommandRegistry::default();
        assert!(registry.lookup("nope").is_none());
        assert!(!registry.accepts("nope", "Status"));
    }

    #[test]
    fn test_accepts_is_case_sensitive() {
        let registry = CommandRegistry::default();
        assert!(registry.accepts(services::AGENT, "Status"));
        assert!(!registry.accepts(services::AGENT, "status"));
        assert!(registry.accepts(services::MM, "StartMonitor"));
        assert!(!registry.accepts(services::MM, "StartService"));
    }

    #[test]
    fn test_global_matches_default() {
        assert_eq!(CommandRegistry::global(), &CommandRegistry::default());
    }

    #[test]
    fn test_from_table() {
        let mut table = BTreeMap::new();
        table.insert("qan".to_string(), vec!["StartQan".to_string()]);
        let registry = CommandRegistry::from_table(table);

        assert!(registry.accepts("qan", "StartQan"));
        assert!(registry.lookup("").is_none());
    }
}
