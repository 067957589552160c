use std::io::{BufRead, Write};

use anyhow::Context;

use tokenledger_events::EventBus;
use tokenledger_host::Session;
use tokenledger_infra::config::HostConfig;

fn main() -> anyhow::Result<()> {
    tokenledger_observability::init();

    let config = HostConfig::from_env().context("invalid host configuration")?;
    let session = Session::new(&config).context("ledger bootstrap failed")?;

    // Stand-in for an external consumer of committed events.
    let subscription = session.bus().subscribe();
    std::thread::spawn(move || {
        while let Ok(env) = subscription.recv() {
            tracing::info!(
                tx_id = %env.tx_id(),
                commit_sequence = env.commit_sequence(),
                event = env.name(),
                "committed event delivered"
            );
        }
    });

    tracing::info!(key_schema = ?config.key_schema, "token ledger host ready; reading invocations from stdin");

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = line.context("failed to read stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        let response = session.handle_line(&line);
        writeln!(stdout, "{response}").context("failed to write response")?;
        stdout.flush().context("failed to flush stdout")?;
    }

    Ok(())
}
