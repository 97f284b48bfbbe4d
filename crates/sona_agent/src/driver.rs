//! Subscription sync driver.

use crate::config::DriverConfig;
use crate::error::{AgentError, AgentResult};
use crate::registry::SubscriptionRegistry;
use crate::ticker::{CancelHandle, IntervalTicker, Tick, Ticker};
use crate::transport::{BrokerClient, ConnectionListener};
use parking_lot::RwLock;
use sona_protocol::{BrokerMessage, PullServiceConfigRequest};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;
use tracing::{debug, info};

/// Statistics about driver activity.
#[derive(Debug, Clone, Default)]
pub struct DriverStats {
    /// Poll cycles completed.
    pub cycles_completed: u64,
    /// Poll cycles that found nothing subscribed.
    pub idle_cycles: u64,
    /// Resyncs performed after (re)connects.
    pub resyncs: u64,
    /// Pull requests handed to the client.
    pub requests_emitted: u64,
    /// When the last poll cycle ran.
    pub last_cycle_time: Option<Instant>,
}

/// Result of one poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleOutcome {
    /// Pull requests emitted.
    pub emitted: usize,
}

impl CycleOutcome {
    /// Returns true if the registry was empty, so the idle delay applies.
    pub fn is_idle(&self) -> bool {
        self.emitted == 0
    }
}

/// Announces the agent's subscriptions to the broker.
///
/// Every pass reads a snapshot of the registry and sends one
/// [`PullServiceConfigRequest`] per key, carrying the version the agent holds.
/// Passes run on connect ([`SyncDriver::resync`]) and periodically
/// ([`SyncDriver::run`]).
pub struct SyncDriver<R: SubscriptionRegistry, C: BrokerClient> {
    config: DriverConfig,
    registry: Arc<R>,
    client: Arc<C>,
    stats: RwLock<DriverStats>,
}

impl<R: SubscriptionRegistry, C: BrokerClient> SyncDriver<R, C> {
    /// Creates a new driver.
    pub fn new(config: DriverConfig, registry: Arc<R>, client: Arc<C>) -> Self {
        Self {
            config,
            registry,
            client,
            stats: RwLock::new(DriverStats::default()),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Returns the current stats.
    pub fn stats(&self) -> DriverStats {
        self.stats.read().clone()
    }

    /// Announces every subscription right after a (re)connect.
    ///
    /// Returns the number of pull requests emitted.
    pub fn resync(&self) -> usize {
        let emitted = self.announce();

        let mut stats = self.stats.write();
        stats.resyncs += 1;
        stats.requests_emitted += emitted as u64;
        drop(stats);

        info!(emitted, "resynced subscriptions after connect");
        emitted
    }

    /// Runs a single poll cycle without sleeping.
    pub fn poll_cycle(&self) -> CycleOutcome {
        let outcome = CycleOutcome {
            emitted: self.announce(),
        };

        let mut stats = self.stats.write();
        stats.cycles_completed += 1;
        stats.requests_emitted += outcome.emitted as u64;
        if outcome.is_idle() {
            stats.idle_cycles += 1;
        }
        stats.last_cycle_time = Some(Instant::now());

        outcome
    }

    /// Runs the poll loop on the calling thread until the ticker is cancelled.
    ///
    /// Each cycle sleeps `poll_interval`, then announces every subscription.
    /// A cycle that finds nothing subscribed sleeps `idle_delay` as well.
    pub fn run<T: Ticker>(&self, mut ticker: T) {
        info!(
            poll_interval = ?self.config.poll_interval,
            idle_delay = ?self.config.idle_delay,
            "periodic pull started"
        );

        loop {
            if ticker.sleep(self.config.poll_interval) == Tick::Cancelled {
                break;
            }
            let outcome = self.poll_cycle();
            if outcome.is_idle() {
                debug!("no subscriptions, backing off");
                if ticker.sleep(self.config.idle_delay) == Tick::Cancelled {
                    break;
                }
            }
        }

        info!("periodic pull stopped");
    }

    fn announce(&self) -> usize {
        let tracked = self.registry.all_tracked();
        let count = tracked.len();

        for (service_key, version) in tracked {
            debug!(%service_key, version, "pulling service configuration");
            let request = PullServiceConfigRequest::new(service_key, version);
            self.client.send(BrokerMessage::from(request));
        }

        count
    }
}

impl<R, C> SyncDriver<R, C>
where
    R: SubscriptionRegistry + 'static,
    C: BrokerClient + 'static,
{
    /// Starts the poll loop on a background thread, sleeping in real time.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Spawn`] if the thread cannot be started.
    pub fn spawn(self: &Arc<Self>) -> AgentResult<PollerHandle> {
        self.spawn_with(IntervalTicker::new())
    }

    /// Starts the poll loop on a background thread with the given ticker.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Spawn`] if the thread cannot be started.
    pub fn spawn_with<T: Ticker + 'static>(self: &Arc<Self>, ticker: T) -> AgentResult<PollerHandle> {
        let cancel = ticker.cancel_handle();
        let driver = Arc::clone(self);
        let thread = std::thread::Builder::new()
            .name(self.config.thread_name.clone())
            .spawn(move || driver.run(ticker))?;

        Ok(PollerHandle { cancel, thread })
    }
}

impl<R: SubscriptionRegistry, C: BrokerClient> ConnectionListener for SyncDriver<R, C> {
    fn on_connected(&self) {
        self.resync();
    }

    fn on_disconnected(&self) {
        debug!("broker connection lost, waiting for reconnect");
    }
}

/// Handle to a running poll loop.
#[derive(Debug)]
pub struct PollerHandle {
    cancel: CancelHandle,
    thread: JoinHandle<()>,
}

impl PollerHandle {
    /// Asks the loop to stop. It exits at its next sleep.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns true once the loop has exited.
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Waits for the loop to exit.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::PollerPanicked`] if the loop panicked.
    pub fn join(self) -> AgentResult<()> {
        self.thread.join().map_err(|_| AgentError::PollerPanicked)
    }

    /// Cancels the loop and waits for it to exit.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::PollerPanicked`] if the loop panicked.
    pub fn stop(self) -> AgentResult<()> {
        self.cancel();
        self.join()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MemorySubscriptionRegistry;
    use crate::ticker::ManualTicker;
    use crate::transport::RecordingClient;
    use std::collections::HashMap;
    use std::time::Duration;

    type TestDriver = SyncDriver<MemorySubscriptionRegistry, RecordingClient>;

    fn driver() -> (
        TestDriver,
        Arc<MemorySubscriptionRegistry>,
        Arc<RecordingClient>,
    ) {
        let registry = Arc::new(MemorySubscriptionRegistry::new());
        let client = Arc::new(RecordingClient::new());
        let driver = SyncDriver::new(
            DriverConfig::default(),
            Arc::clone(&registry),
            Arc::clone(&client),
        );
        (driver, registry, client)
    }

    fn emitted(client: &RecordingClient) -> HashMap<String, u64> {
        client
            .pull_requests()
            .into_iter()
            .map(|r| (r.service_key, r.version))
            .collect()
    }

    #[test]
    fn cycle_emits_one_request_per_key() {
        let (driver, registry, client) = driver();
        registry.track("A", 3);
        registry.track("B", 7);

        let outcome = driver.poll_cycle();
        assert_eq!(outcome.emitted, 2);
        assert!(!outcome.is_idle());
        assert_eq!(client.len(), 2);
        assert_eq!(
            emitted(&client),
            HashMap::from([("A".to_string(), 3), ("B".to_string(), 7)])
        );
    }

    #[test]
    fn cycle_uses_version_at_emission_time() {
        let (driver, registry, client) = driver();
        registry.track("A", 3);
        driver.poll_cycle();

        registry.set_version("A", 4);
        client.clear();
        driver.poll_cycle();

        assert_eq!(client.pull_requests()[0].version, 4);
    }

    #[test]
    fn empty_registry_is_idle() {
        let (driver, _, client) = driver();
        let outcome = driver.poll_cycle();

        assert!(outcome.is_idle());
        assert!(client.is_empty());
        assert_eq!(driver.stats().idle_cycles, 1);
    }

    #[test]
    fn resync_announces_everything() {
        let (driver, registry, client) = driver();
        registry.track("A", 0);
        registry.track("B", 12);
        registry.track("C", 1);

        assert_eq!(driver.resync(), 3);
        assert_eq!(emitted(&client).len(), 3);

        let stats = driver.stats();
        assert_eq!(stats.resyncs, 1);
        assert_eq!(stats.cycles_completed, 0);
        assert_eq!(stats.requests_emitted, 3);
    }

    #[test]
    fn on_connected_resyncs() {
        let (driver, registry, client) = driver();
        registry.track("A", 5);

        driver.on_connected();
        driver.on_disconnected();
        driver.on_connected();

        assert_eq!(client.len(), 2);
        assert_eq!(driver.stats().resyncs, 2);
    }

    #[test]
    fn run_sleeps_poll_interval_between_cycles() {
        let (driver, registry, client) = driver();
        registry.track("A", 3);
        registry.track("B", 7);

        let ticker = ManualTicker::cancel_after(3);
        driver.run(ticker.clone());

        // Three poll sleeps granted, three cycles ran, the fourth sleep stopped the loop.
        assert_eq!(ticker.sleeps(), vec![Duration::from_secs(50); 3]);
        assert_eq!(driver.stats().cycles_completed, 3);
        assert_eq!(client.len(), 6);
    }

    #[test]
    fn run_adds_idle_delay_when_empty() {
        let (driver, _, client) = driver();

        let ticker = ManualTicker::cancel_after(4);
        driver.run(ticker.clone());

        assert_eq!(
            ticker.sleeps(),
            vec![
                Duration::from_secs(50),
                Duration::from_secs(10),
                Duration::from_secs(50),
                Duration::from_secs(10),
            ]
        );
        assert_eq!(driver.stats().idle_cycles, 2);
        assert!(client.is_empty());
    }

    #[test]
    fn run_stops_immediately_when_cancelled() {
        let (driver, registry, client) = driver();
        registry.track("A", 1);

        let ticker = ManualTicker::new();
        ticker.cancel_handle().cancel();
        driver.run(ticker);

        assert!(client.is_empty());
        assert_eq!(driver.stats().cycles_completed, 0);
    }

    #[test]
    fn spawned_poller_runs_until_stopped() {
        let registry = Arc::new(MemorySubscriptionRegistry::new());
        let client = Arc::new(RecordingClient::new());
        registry.track("A", 1);

        let config = DriverConfig::new()
            .with_poll_interval(Duration::from_millis(5))
            .with_idle_delay(Duration::from_millis(1))
            .with_thread_name("poller-test");
        let driver = Arc::new(SyncDriver::new(
            config,
            Arc::clone(&registry),
            Arc::clone(&client),
        ));

        let handle = driver.spawn().unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while driver.stats().cycles_completed < 2 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        handle.stop().unwrap();

        let stats = driver.stats();
        assert!(stats.cycles_completed >= 2);
        assert!(stats.last_cycle_time.is_some());

        // No cycles after the loop exits.
        let sent = client.len();
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(client.len(), sent);
    }

    #[test]
    fn spawned_manual_poller_finishes_on_its_own() {
        let (driver, registry, client) = driver();
        registry.track("A", 1);
        let driver = Arc::new(driver);

        let handle = driver.spawn_with(ManualTicker::cancel_after(5)).unwrap();
        handle.join().unwrap();

        assert_eq!(driver.stats().cycles_completed, 5);
        assert_eq!(client.len(), 5);
    }
}
