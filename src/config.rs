use std::time::Duration;

use clap::Parser;

use crate::listener::BackOffConfig;
use crate::messages::ORDER_CREATED_TOPIC;

// ============================================================================
// Dispatch Configuration
// ============================================================================
//
// Every setting can be given as a command line flag or as a DISPATCH_*
// environment variable. Defaults target a local Redpanda and stock service.
//
// ============================================================================

#[derive(Debug, Clone, Parser)]
#[command(name = "order_dispatch", about = "Order dispatch stage: order.created -> dispatch events")]
pub struct DispatchConfig {
    /// Broker bootstrap servers
    #[arg(long, env = "DISPATCH_BOOTSTRAP_SERVERS", default_value = "127.0.0.1:9092")]
    pub bootstrap_servers: String,

    /// Consumer group for the order.created listener
    #[arg(long, env = "DISPATCH_CONSUMER_GROUP", default_value = "dispatch.order.created.consumer")]
    pub consumer_group: String,

    /// Inbound topic
    #[arg(long, env = "DISPATCH_ORDER_CREATED_TOPIC", default_value = ORDER_CREATED_TOPIC)]
    pub order_created_topic: String,

    /// Stock service availability endpoint; the item is passed as `?item=`
    #[arg(long, env = "DISPATCH_STOCK_SERVICE_ENDPOINT", default_value = "http://127.0.0.1:9001/api/stock")]
    pub stock_service_endpoint: String,

    /// Stock service request timeout in milliseconds
    #[arg(long, env = "DISPATCH_STOCK_SERVICE_TIMEOUT_MS", default_value_t = 5_000)]
    pub stock_service_timeout_ms: u64,

    /// Producer delivery timeout (message.timeout.ms)
    #[arg(long, env = "DISPATCH_PRODUCER_TIMEOUT_MS", default_value_t = 5_000)]
    pub producer_timeout_ms: u64,

    /// Total delivery attempts per record, first attempt included
    #[arg(long, env = "DISPATCH_RETRY_MAX_ATTEMPTS", default_value_t = 4)]
    pub retry_max_attempts: u32,

    /// Delay before the first redelivery in milliseconds
    #[arg(long, env = "DISPATCH_RETRY_INITIAL_DELAY_MS", default_value_t = 100)]
    pub retry_initial_delay_ms: u64,

    /// Upper bound for any redelivery delay in milliseconds
    #[arg(long, env = "DISPATCH_RETRY_MAX_DELAY_MS", default_value_t = 10_000)]
    pub retry_max_delay_ms: u64,

    /// Backoff multiplier; 1.0 gives a fixed backoff
    #[arg(long, env = "DISPATCH_RETRY_MULTIPLIER", default_value_t = 1.0)]
    pub retry_multiplier: f64,

    /// Consumer max.poll.interval.ms; a record must reach its outcome, retries
    /// included, before this runs out or the consumer leaves the group
    #[arg(long, env = "DISPATCH_MAX_POLL_INTERVAL_MS", default_value_t = 300_000)]
    pub max_poll_interval_ms: u64,

    /// Number of consumers started in the group
    #[arg(long, env = "DISPATCH_CONCURRENCY", default_value_t = 1)]
    pub concurrency: usize,

    /// Port for the /metrics and /health endpoints
    #[arg(long, env = "DISPATCH_METRICS_PORT", default_value_t = 9090)]
    pub metrics_port: u16,
}

impl DispatchConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.bootstrap_servers.is_empty(), "bootstrap servers must not be empty");
        anyhow::ensure!(!self.stock_service_endpoint.is_empty(), "stock service endpoint must not be empty");
        anyhow::ensure!(self.retry_max_attempts >= 1, "retry max attempts must be at least 1");
        anyhow::ensure!(self.retry_multiplier >= 1.0, "retry multiplier must be >= 1.0");
        anyhow::ensure!(self.concurrency >= 1, "concurrency must be at least 1");

        let worst_case = self.worst_case_record_time();
        anyhow::ensure!(
            worst_case < self.max_poll_interval(),
            "retry budget can hold a record for {:?}, longer than max poll interval {:?}; \
             lower retry attempts/delays or raise the poll interval",
            worst_case,
            self.max_poll_interval()
        );
        Ok(())
    }

    /// Longest a single record can keep its listener away from the consumer:
    /// every attempt timing out on the stock check and all three emissions,
    /// every backoff delay, then a dead-letter publish that also times out.
    pub fn worst_case_record_time(&self) -> Duration {
        // queue wait plus message.timeout.ms
        let publish = self.producer_timeout() * 2;
        let attempt = self.stock_service_timeout() + publish * 3;
        attempt * self.retry_max_attempts + self.backoff().total_delay() + publish
    }

    pub fn max_poll_interval(&self) -> Duration {
        Duration::from_millis(self.max_poll_interval_ms)
    }

    pub fn stock_service_timeout(&self) -> Duration {
        Duration::from_millis(self.stock_service_timeout_ms)
    }

    pub fn producer_timeout(&self) -> Duration {
        Duration::from_millis(self.producer_timeout_ms)
    }

    pub fn backoff(&self) -> BackOffConfig {
        let initial_delay = Duration::from_millis(self.retry_initial_delay_ms);
        if self.retry_multiplier == 1.0 {
            BackOffConfig::fixed(initial_delay, self.retry_max_attempts)
        } else {
            BackOffConfig::exponential(
                initial_delay,
                Duration::from_millis(self.retry_max_delay_ms),
                self.retry_multiplier,
                self.retry_max_attempts,
            )
        }
    }
}
