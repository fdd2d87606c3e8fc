use std::{net::SocketAddr, time::Duration};

use anyhow::{Context, Result, ensure};

use crate::web::WebSettings;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub default_page_size: u32,
    pub max_page_size: u32,
    pub max_buffered_bytes: usize,
    pub slow_request_ms: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let bind_addr = env_string("RUSTCRUD_BIND_ADDR", "127.0.0.1:8080")
            .parse::<SocketAddr>()
            .context("RUSTCRUD_BIND_ADDR must be a valid host:port")?;

        let default_page_size = env_string("RUSTCRUD_DEFAULT_PAGE_SIZE", "10")
            .parse::<u32>()
            .context("RUSTCRUD_DEFAULT_PAGE_SIZE must be a positive integer")?;

        let max_page_size = env_string("RUSTCRUD_MAX_PAGE_SIZE", "100")
            .parse::<u32>()
            .context("RUSTCRUD_MAX_PAGE_SIZE must be a positive integer")?;

        let max_buffered_bytes = env_string("RUSTCRUD_MAX_BUFFERED_BYTES", "4194304")
            .parse::<usize>()
            .context("RUSTCRUD_MAX_BUFFERED_BYTES must be a byte count")?;

        let slow_request_ms = env_string("RUSTCRUD_SLOW_REQUEST_MS", "1000")
            .parse::<u64>()
            .context("RUSTCRUD_SLOW_REQUEST_MS must be a number of milliseconds")?;

        let config = Self {
            bind_addr,
            default_page_size,
            max_page_size,
            max_buffered_bytes,
            slow_request_ms,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        ensure!(self.max_page_size >= 1, "RUSTCRUD_MAX_PAGE_SIZE must be at least 1");
        ensure!(
            (1..=self.max_page_size).contains(&self.default_page_size),
            "RUSTCRUD_DEFAULT_PAGE_SIZE must be between 1 and RUSTCRUD_MAX_PAGE_SIZE"
        );
        ensure!(
            self.max_buffered_bytes > 0,
            "RUSTCRUD_MAX_BUFFERED_BYTES must be greater than zero"
        );
        Ok(())
    }

    pub fn web_settings(&self) -> WebSettings {
        WebSettings {
            default_page_size: self.default_page_size,
            max_page_size: self.max_page_size,
            max_buffered_bytes: self.max_buffered_bytes,
            slow_request_threshold: Duration::from_millis(self.slow_request_ms),
        }
    }
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
