use anyhow::Result;

mod backfill;
mod cities;
mod config;
mod errors;
mod history;
mod initialization;
mod manager_open_meteo;
mod manager_open_weather;
mod models;
mod sources;
mod trend;
mod worker;

/// Attempts granted to one upstream call guarded by the retry macro
pub const RETRY_ATTEMPTS: u32 = 5;

/// First backoff delay in milliseconds, doubled after every failed attempt
pub const RETRY_BACKOFF_MS: u64 = 200;

/// Retries a fallible upstream call with bounded exponential backoff
#[macro_export]
macro_rules! retry {
    ($f:expr) => {{
        let mut attempt: u32 = 0;
        loop {
            match $f() {
                Ok(v) => break Ok(v),
                Err(e) => {
                    attempt += 1;
                    if attempt >= $crate::RETRY_ATTEMPTS {
                        break Err(e);
                    }
                    log::warn!("upstream call failed ({}), retrying", e);
                    std::thread::sleep(std::time::Duration::from_millis(
                        $crate::RETRY_BACKOFF_MS << (attempt - 1),
                    ));
                }
            }
        }
    }};
}

fn main() -> Result<()> {
    let (config, mgr) = initialization::init()?;

    worker::run(config, &mgr);

    Ok(())
}
