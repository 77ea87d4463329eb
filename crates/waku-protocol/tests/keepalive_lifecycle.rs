/// Integration tests: keep-alive timers driven by connection lifecycle.
///
/// A `WakuNode` over `MemoryNetwork`; peers connect and disconnect and the
/// recording probe/publisher show which timers fired. Time is paused, so
/// every period elapses instantly and deterministically.
use std::sync::{Arc, Mutex};
use std::time::Duration;

use waku_protocol::{
    LivenessProbe, PeerId, RelayPublisher, WakuConfig, WakuError, WakuMessage, WakuNode,
    RELAY_CODEC, RELAY_PING_CONTENT_TOPIC,
};
use waku_transport::MemoryNetwork;

const SEC: Duration = Duration::from_secs(1);

#[derive(Default)]
struct Recorder {
    pings: Mutex<Vec<PeerId>>,
    published: Mutex<Vec<WakuMessage>>,
}

impl Recorder {
    fn pings_for(&self, peer: PeerId) -> usize {
        self.pings.lock().unwrap().iter().filter(|p| **p == peer).count()
    }

    fn heartbeats(&self) -> usize {
        self.published.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl LivenessProbe for Recorder {
    async fn ping(&self, peer: PeerId) -> Result<Duration, WakuError> {
        self.pings.lock().unwrap().push(peer);
        Ok(Duration::from_millis(3))
    }
}

#[async_trait::async_trait]
impl RelayPublisher for Recorder {
    async fn publish(&self, message: WakuMessage) -> Result<(), WakuError> {
        self.published.lock().unwrap().push(message);
        Ok(())
    }
}

async fn setup(ping: u64, relay: u64) -> (MemoryNetwork, WakuNode, Arc<Recorder>) {
    let _ = tracing_subscriber::fmt().with_env_filter("warn").try_init();
    let net = MemoryNetwork::new();
    let recorder = Arc::new(Recorder::default());
    let config = WakuConfig::new()
        .ping_keep_alive(Duration::from_secs(ping))
        .relay_keep_alive(Duration::from_secs(relay));
    let node = WakuNode::new(
        Arc::new(net.clone()),
        recorder.clone(),
        recorder.clone(),
        config,
    );
    (net, node, recorder)
}

async fn connect(net: &MemoryNetwork, peer: PeerId) {
    net.add_peer(peer, [RELAY_CODEC]).await;
    net.connect(peer).await.unwrap();
}

/// Connect → timers run; disconnect → nothing more fires.
#[tokio::test(start_paused = true)]
async fn lifecycle_start_and_stop() {
    let (net, node, rec) = setup(10, 30).await;
    let peer = PeerId::random();

    connect(&net, peer).await;
    tokio::time::sleep(61 * SEC).await;
    assert_eq!(rec.pings_for(peer), 6);
    assert_eq!(rec.heartbeats(), 2);

    let published = rec.published.lock().unwrap().clone();
    assert!(published
        .iter()
        .all(|m| m.payload.is_empty() && m.content_topic == RELAY_PING_CONTENT_TOPIC));

    net.disconnect(peer).await;
    tokio::time::sleep(SEC).await;
    assert!(node.keep_alive().active_peers().await.is_empty());

    tokio::time::sleep(300 * SEC).await;
    assert_eq!(rec.pings_for(peer), 6);
    assert_eq!(rec.heartbeats(), 2);

    node.shutdown().await;
}

/// Disconnect/reconnect churn never stacks timers.
#[tokio::test(start_paused = true)]
async fn reconnect_churn_does_not_leak() {
    let (net, node, rec) = setup(10, 0).await;
    let peer = PeerId::random();
    connect(&net, peer).await;

    for _ in 0..10 {
        net.disconnect(peer).await;
        net.connect(peer).await.unwrap();
    }
    tokio::time::sleep(SEC / 2).await;
    assert_eq!(node.keep_alive().timer_count().await, 1);
    assert_eq!(node.keep_alive_metrics().active_timers.get(), 1);

    // The last (re)start happened at ~0s: one ping per period from there.
    tokio::time::sleep(30 * SEC).await;
    assert_eq!(rec.pings_for(peer), 3);

    node.shutdown().await;
}

/// Timers of one peer are unaffected by another peer leaving.
#[tokio::test(start_paused = true)]
async fn peers_are_independent() {
    let (net, node, rec) = setup(5, 0).await;
    let a = PeerId::random();
    let b = PeerId::random();
    connect(&net, a).await;
    connect(&net, b).await;

    tokio::time::sleep(6 * SEC).await;
    net.disconnect(a).await;
    tokio::time::sleep(20 * SEC).await;

    assert_eq!(rec.pings_for(a), 1);
    assert_eq!(rec.pings_for(b), 5);
    assert_eq!(node.keep_alive().active_peers().await, vec![b]);

    node.shutdown().await;
}

/// Both periods zero: connections are tracked by nobody.
#[tokio::test(start_paused = true)]
async fn disabled_keep_alive_schedules_nothing() {
    let (net, node, rec) = setup(0, 0).await;
    let peer = PeerId::random();
    connect(&net, peer).await;

    tokio::time::sleep(3600 * SEC).await;
    assert_eq!(rec.pings_for(peer), 0);
    assert_eq!(rec.heartbeats(), 0);
    assert_eq!(node.keep_alive().timer_count().await, 0);

    node.shutdown().await;
}

/// Shutdown stops all timers; later connects are ignored.
#[tokio::test(start_paused = true)]
async fn shutdown_silences_everything() {
    let (net, node, rec) = setup(5, 5).await;
    let peer = PeerId::random();
    connect(&net, peer).await;
    tokio::time::sleep(SEC).await;

    node.shutdown().await;
    let late = PeerId::random();
    connect(&net, late).await;

    tokio::time::sleep(60 * SEC).await;
    assert_eq!(rec.pings_for(peer), 0);
    assert_eq!(rec.pings_for(late), 0);
    assert_eq!(rec.heartbeats(), 0);
    assert!(matches!(
        node.keep_alive().stop(peer).await,
        Err(WakuError::Shutdown)
    ));
}
