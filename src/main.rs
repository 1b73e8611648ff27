use agent_proto::{JsonProtocol, Settings};
use anyhow::Result;
use log::info;
use std::io;

fn main() -> Result<()> {
    let settings = Settings::from_env()?;

    // Log to stderr so stdout stays a clean reply stream
    env_logger::Builder::new()
        .filter_level(settings.log_filter()?)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .init();

    let registry = settings.registry();
    info!(
        "Checking commands against services: {:?}",
        registry.services().collect::<Vec<_>>()
    );

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut protocol = JsonProtocol::new();

    protocol.serve(stdin.lock(), stdout.lock(), |cmd| {
        match cmd.validate_against(&registry) {
            Ok(()) => cmd.reply_ok::<()>(None),
            Err(e) => cmd.reply_err(&e),
        }
    })?;

    info!(
        "Input closed after {} commands ({} malformed)",
        protocol.handled_count(),
        protocol.malformed_count()
    );
    Ok(())
}
