use std::time::Duration;

use syncpad::prelude::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_ADDR: &str = "0.0.0.0:8080";

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// Parses `SYNCPAD_SNAPSHOT_TIMEOUT_MS`. Unset keeps the room default,
/// `0` disables the timeout.
fn snapshot_timeout(
    raw: Option<&str>,
    default: Option<Duration>,
) -> Result<Option<Duration>, String> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    let millis: u64 = raw.trim().parse().map_err(|_| {
        format!("SYNCPAD_SNAPSHOT_TIMEOUT_MS must be a number of milliseconds, got {raw:?}")
    })?;
    Ok((millis > 0).then(|| Duration::from_millis(millis)))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "syncpad=info,syncpad_room=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr =
        std::env::var("SYNCPAD_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.into());
    let defaults = RoomConfig::default();
    let room_config = RoomConfig {
        snapshot_timeout: snapshot_timeout(
            std::env::var("SYNCPAD_SNAPSHOT_TIMEOUT_MS").ok().as_deref(),
            defaults.snapshot_timeout,
        )?,
        ..defaults
    };
    tracing::info!(%addr, ?room_config, "starting relay server");

    let server = SyncpadServer::builder()
        .bind(&addr)
        .room_config(room_config)
        .build()
        .await?;

    server.run().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIVE: Option<Duration> = Some(Duration::from_secs(5));

    #[test]
    fn test_snapshot_timeout_unset_keeps_default() {
        assert_eq!(snapshot_timeout(None, FIVE), Ok(FIVE));
    }

    #[test]
    fn test_snapshot_timeout_millis() {
        assert_eq!(
            snapshot_timeout(Some("1500"), FIVE),
            Ok(Some(Duration::from_millis(1500)))
        );
    }

    #[test]
    fn test_snapshot_timeout_zero_disables() {
        assert_eq!(snapshot_timeout(Some("0"), FIVE), Ok(None));
    }

    #[test]
    fn test_snapshot_timeout_rejects_garbage() {
        assert!(snapshot_timeout(Some("soon"), FIVE).is_err());
    }
}
