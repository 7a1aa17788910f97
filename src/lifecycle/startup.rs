//! Startup readiness.
//!
//! Before the gateway takes traffic the backend is polled until it answers,
//! so the first callers do not all burn their retry budgets on a cold backend.

use thiserror::Error;

use crate::config::StartupConfig;
use crate::health::HealthProbe;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StartupError {
    #[error("backend did not become ready after {attempts} attempts")]
    BackendUnavailable { attempts: u32 },
}

/// Probe until the backend answers or `max_attempts` probes have failed.
pub async fn wait_for_backend(probe: &HealthProbe, config: &StartupConfig) -> Result<(), StartupError> {
    let interval = std::time::Duration::from_secs(config.interval_secs);

    for attempt in 1..=config.max_attempts {
        match probe.check().await {
            Ok(()) => {
                tracing::info!(url = %probe.url(), attempt, "Backend is ready");
                return Ok(());
            }
            Err(e) => {
                tracing::info!(
                    url = %probe.url(),
                    attempt,
                    max_attempts = config.max_attempts,
                    error = %e,
                    "Waiting for backend"
                );
            }
        }
        if attempt < config.max_attempts {
            tokio::time::sleep(interval).await;
        }
    }

    Err(StartupError::BackendUnavailable {
        attempts: config.max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HealthCheckConfig;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn probe(url: String) -> HealthProbe {
        HealthProbe::new(&HealthCheckConfig {
            url,
            timeout_secs: 1,
        })
        .unwrap()
    }

    fn startup(max_attempts: u32) -> StartupConfig {
        StartupConfig {
            wait_for_backend: true,
            max_attempts,
            interval_secs: 0,
        }
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = wait_for_backend(&probe(format!("http://{addr}/api/tags")), &startup(2)).await;
        assert_eq!(result, Err(StartupError::BackendUnavailable { attempts: 2 }));
    }

    #[tokio::test]
    async fn returns_once_backend_answers() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 2\r\nconnection: close\r\n\r\n{}")
                    .await;
            }
        });

        let result = wait_for_backend(&probe(format!("http://{addr}/api/tags")), &startup(3)).await;
        assert!(result.is_ok());
    }
}
