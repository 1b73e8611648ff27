use super::registry::CommandRegistry;
use super::types::{Cmd, Reply};
use crate::utils::error_handling::ProtoError;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::Arc;

/// Executes the commands of one service.
///
/// Handlers only ever see commands that already passed validation. The
/// returned value, if any, becomes the reply payload.
pub trait ServiceHandler: Send + Sync {
    fn handle(&self, cmd: &Cmd) -> anyhow::Result<Option<serde_json::Value>>;
}

impl<F> ServiceHandler for F
where
    F: Fn(&Cmd) -> anyhow::Result<Option<serde_json::Value>> + Send + Sync,
{
    fn handle(&self, cmd: &Cmd) -> anyhow::Result<Option<serde_json::Value>> {
        self(cmd)
    }
}

/// Validates commands and routes them to the handler of their service
pub struct Dispatcher {
    registry: Arc<CommandRegistry>,
    handlers: HashMap<String, Box<dyn ServiceHandler>>,
}

impl Dispatcher {
    pub fn new(registry: Arc<CommandRegistry>) -> Self {
        Self {
            registry,
            handlers: HashMap::new(),
        }
    }

    /// Register the handler for `service`, replacing any previous one
    pub fn register<H>(&mut self, service: &str, handler: H) -> &mut Self
    where
        H: ServiceHandler + 'static,
    {
        if self.registry.lookup(service).is_none() {
            warn!("Registering handler for service missing from registry: {:?}", service);
        }
        self.handlers.insert(service.to_string(), Box::new(handler));
        self
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Validate, route and wrap the outcome into the reply for `cmd`.
    ///
    /// Rejected commands get a reply carrying the error text and no data.
    pub fn dispatch(&self, cmd: &Cmd) -> Reply {
        debug!("Dispatching {}", cmd);

        if let Err(e) = cmd.validate_against(&self.registry) {
            warn!("Rejected {}: {}", cmd, e);
            return cmd.reply_err(&e);
        }

        let Some(handler) = self.handlers.get(&cmd.service) else {
            let e = ProtoError::NoHandler {
                service: cmd.service.clone(),
            };
            warn!("Rejected {}: {}", cmd, e);
            return cmd.reply_err(&e);
        };

        match handler.handle(cmd) {
            Ok(data) => {
                info!("Handled {}", cmd);
                cmd.reply_ok(data.as_ref())
            }
            Err(e) => {
                warn!("Handler failed for {}: {:#}", cmd, e);
                cmd.reply_err(&format!("{:#}", e))
            }
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(Arc::new(CommandRegistry::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::communication::registry::{commands, services};
    use crate::communication::types::{LogLevel, StatusData};
    use serde_json::json;

    fn agent_handler(cmd: &Cmd) -> anyhow::Result<Option<serde_json::Value>> {
        match cmd.cmd.as_str() {
            commands::STATUS => {
                let status = StatusData {
                    agent: "Ready".to_string(),
                    ..Default::default()
                };
                Ok(Some(serde_json::to_value(status)?))
            }
            commands::SET_LOG_LEVEL => {
                let level: LogLevel = cmd
                    .decode_data()?
                    .ok_or_else(|| anyhow::anyhow!("missing LogLevel data"))?;
                Ok(Some(json!({ "level": level.level })))
            }
            other => anyhow::bail!("{} not implemented", other),
        }
    }

    fn dispatcher() -> Dispatcher {
        let mut dispatcher = Dispatcher::default();
        dispatcher.register(services::AGENT, agent_handler);
        dispatcher
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_shared_types_are_send_sync() {
        assert_send_sync::<Cmd>();
        assert_send_sync::<Reply>();
        assert_send_sync::<CommandRegistry>();
        assert_send_sync::<Dispatcher>();
        assert_send_sync::<ProtoError>();
    }

    #[test]
    fn test_dispatch_from_many_threads() {
        let dispatcher = dispatcher();

        std::thread::scope(|scope| {
            for i in 0..8 {
                let dispatcher = &dispatcher;
                scope.spawn(move || {
                    let mut cmd = Cmd::new("u", "a", services::AGENT, commands::STATUS);
                    cmd.relay_id = format!("R{}", i);

                    let reply = dispatcher.dispatch(&cmd);
                    assert!(reply.is_success());
                    assert_eq!(reply.relay_id, format!("R{}", i));
                });
            }
        });
    }

    #[test]
    fn test_dispatch_success() {
        let mut cmd = Cmd::new("u", "a", services::AGENT, commands::STATUS);
        cmd.relay_id = "R7".to_string();

        let reply = dispatcher().dispatch(&cmd);
        assert!(reply.is_success());
        assert_eq!(reply.relay_id, "R7");

        let status: StatusData = reply.decode_data().unwrap().unwrap();
        assert_eq!(status.agent, "Ready");
    }

    #[test]
    fn test_dispatch_decodes_command_data() {
        let cmd = Cmd::new("u", "a", services::AGENT, commands::SET_LOG_LEVEL)
            .with_data(&LogLevel { level: 2 })
            .unwrap();

        let reply = dispatcher().dispatch(&cmd);
        assert!(reply.is_success());
        assert_eq!(
            reply.decode_data::<serde_json::Value>().unwrap(),
            Some(json!({ "level": 2 }))
        );
    }

    #[test]
    fn test_dispatch_rejects_invalid_command() {
        let cmd = Cmd::new("u", "a", services::AGENT, "status");
        let reply = dispatcher().dispatch(&cmd);

        assert_eq!(reply.cmd, "status");
        assert_eq!(reply.error, "Invalid command for : status");
        assert!(reply.data.is_none());
    }

    #[test]
    fn test_dispatch_rejects_unknown_service() {
        let cmd = Cmd::new("u", "a", "nope", commands::STATUS);
        let reply = dispatcher().dispatch(&cmd);
        assert_eq!(reply.error, "Invalid service: nope");
    }

    #[test]
    fn test_dispatch_without_handler() {
        let cmd = Cmd::new("u", "a", services::MM, commands::START_MONITOR);
        let reply = dispatcher().dispatch(&cmd);

        assert_eq!(reply.error, "No handler registered for service: mm");
        assert!(reply.data.is_none());
    }

    #[test]
    fn test_dispatch_handler_error() {
        let cmd = Cmd::new("u", "a", services::AGENT, commands::ABORT);
        let reply = dispatcher().dispatch(&cmd);

        assert_eq!(reply.error, "Abort not implemented");
        assert!(reply.data.is_none());
    }

    #[test]
    fn test_register_closure() {
        let mut dispatcher = Dispatcher::default();
        dispatcher.register(services::MM, |_: &Cmd| -> anyhow::Result<Option<serde_json::Value>> {
            Ok(None)
        });

        let cmd = Cmd::new("u", "a", services::MM, commands::STOP_MONITOR);
        let reply = dispatcher.dispatch(&cmd);
        assert!(reply.is_success());
        assert!(reply.data.is_none());
    }
}
