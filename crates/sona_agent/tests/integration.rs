//! Integration tests for the sync driver against an in-process broker.

use parking_lot::Mutex;
use sona_agent::{
    BrokerClient, ChannelClient, ConnectionListener, DriverConfig, ManualTicker,
    MemorySubscriptionRegistry, SubscriptionRegistry, SyncDriver,
};
use sona_broker::{ConfigStore, MemoryDurableStore};
use sona_protocol::BrokerMessage;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

type Broker = ConfigStore<MemoryDurableStore>;

/// A client wired straight to a broker store.
///
/// When a pull carries a stale version, the broker's answer is applied to the
/// agent's registry right away, standing in for the push a real broker sends.
struct LoopbackClient {
    broker: Arc<Broker>,
    registry: Arc<MemorySubscriptionRegistry>,
    connected: AtomicBool,
    dropped: AtomicU64,
    pushes: Mutex<Vec<(String, u64)>>,
}

impl LoopbackClient {
    fn new(broker: Arc<Broker>, registry: Arc<MemorySubscriptionRegistry>) -> Self {
        Self {
            broker,
            registry,
            connected: AtomicBool::new(true),
            dropped: AtomicU64::new(0),
            pushes: Mutex::new(Vec::new()),
        }
    }

    fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    fn pushes(&self) -> Vec<(String, u64)> {
        self.pushes.lock().clone()
    }
}

impl BrokerClient for LoopbackClient {
    fn send(&self, message: BrokerMessage) {
        if !self.connected.load(Ordering::SeqCst) {
            self.dropped.fetch_add(1, Ordering::SeqCst);
            return;
        }

        let BrokerMessage::PullServiceConfig(request) = message else {
            return;
        };
        if let Some(snapshot) = self.broker.get_data(&request.service_key) {
            if snapshot.version > request.version {
                self.registry
                    .set_version(&request.service_key, snapshot.version);
                self.pushes
                    .lock()
                    .push((request.service_key, snapshot.version));
            }
        }
    }
}

fn entries(pairs: &[(&str, &str)]) -> (Vec<String>, Vec<String>) {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .unzip()
}

fn setup() -> (
    Arc<Broker>,
    Arc<MemorySubscriptionRegistry>,
    Arc<LoopbackClient>,
    SyncDriver<MemorySubscriptionRegistry, LoopbackClient>,
) {
    let broker = Arc::new(ConfigStore::new(MemoryDurableStore::new()));
    let registry = Arc::new(MemorySubscriptionRegistry::new());
    let client = Arc::new(LoopbackClient::new(
        Arc::clone(&broker),
        Arc::clone(&registry),
    ));
    let driver = SyncDriver::new(
        DriverConfig::default(),
        Arc::clone(&registry),
        Arc::clone(&client),
    );
    (broker, registry, client, driver)
}

#[test]
fn reconnect_recovers_missed_updates() {
    let (broker, registry, client, driver) = setup();

    let (keys, values) = entries(&[("timeout", "30")]);
    let v0 = broker.add_config("svcA", keys, values).unwrap();
    registry.track("svcA", v0);

    // Updates land while the agent is offline; their pushes are lost.
    client.set_connected(false);
    let (keys, values) = entries(&[("timeout", "45")]);
    let v1 = broker.update_data("svcA", v0, keys, values).unwrap();
    let (keys, values) = entries(&[("timeout", "60")]);
    let v2 = broker.update_data("svcA", v1, keys, values).unwrap();
    driver.poll_cycle();
    assert_eq!(registry.version("svcA"), Some(v0));

    client.set_connected(true);
    driver.on_connected();

    assert_eq!(registry.version("svcA"), Some(v2));
    assert_eq!(client.pushes(), vec![("svcA".to_string(), 2)]);
    assert_eq!(client.dropped.load(Ordering::SeqCst), 1);
}

#[test]
fn periodic_cycles_converge_without_reconnect() {
    let (broker, registry, client, driver) = setup();

    let (keys, values) = entries(&[("a", "1")]);
    broker.add_config("svcA", keys, values).unwrap();
    let (keys, values) = entries(&[("b", "1")]);
    broker.add_config("svcB", keys, values).unwrap();
    registry.track("svcA", 0);
    registry.track("svcB", 0);

    driver.poll_cycle();
    assert!(client.pushes().is_empty());

    let (keys, values) = entries(&[("b", "2")]);
    broker.update_data("svcB", 0, keys, values).unwrap();

    driver.run(ManualTicker::cancel_after(2));

    assert_eq!(registry.version("svcA"), Some(0));
    assert_eq!(registry.version("svcB"), Some(1));
    assert_eq!(client.pushes(), vec![("svcB".to_string(), 1)]);

    // Subsequent cycles keep asking but get nothing new.
    assert_eq!(driver.stats().cycles_completed, 3);
    assert_eq!(driver.stats().requests_emitted, 6);
}

#[test]
fn deleted_service_reports_bumped_version() {
    let (broker, registry, client, driver) = setup();

    let (keys, values) = entries(&[("a", "1")]);
    broker.add_config("svcA", keys, values).unwrap();
    registry.track("svcA", 0);

    let version = broker.delete_data("svcA", 0).unwrap();
    driver.resync();

    assert_eq!(registry.version("svcA"), Some(version));
    assert!(broker.get_data("svcA").unwrap().is_deleted());
    assert_eq!(client.pushes().len(), 1);
}

#[test]
fn channel_frames_reach_a_broker_thread() {
    let broker = Arc::new(ConfigStore::new(MemoryDurableStore::new()));
    let (keys, values) = entries(&[("a", "1")]);
    let v0 = broker.add_config("svcA", keys, values).unwrap();
    let (keys, values) = entries(&[("a", "2")]);
    broker.update_data("svcA", v0, keys, values).unwrap();

    let registry = Arc::new(MemorySubscriptionRegistry::new());
    registry.track("svcA", 0);
    registry.track("svcB", 4);

    let (client, frames) = ChannelClient::pair();
    let client = Arc::new(client);
    let driver = SyncDriver::new(
        DriverConfig::default(),
        Arc::clone(&registry),
        Arc::clone(&client),
    );

    let broker_side = {
        let broker = Arc::clone(&broker);
        thread::spawn(move || {
            let mut stale = Vec::new();
            for frame in frames {
                let BrokerMessage::PullServiceConfig(request) =
                    BrokerMessage::decode_frame(&frame).unwrap()
                else {
                    continue;
                };
                let current = broker.get_data_or_default(&request.service_key).version;
                if current > request.version {
                    stale.push((request.service_key, current));
                }
            }
            stale
        })
    };

    assert_eq!(driver.resync(), 2);
    drop(driver);
    drop(client);

    let stale = broker_side.join().unwrap();
    assert_eq!(stale, vec![("svcA".to_string(), 1)]);
    assert_eq!(registry.all_tracked().len(), 2);
}
