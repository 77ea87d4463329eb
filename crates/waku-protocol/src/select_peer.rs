use rand::seq::IndexedRandom;
use waku_transport::{Peer, PeerDirectory};

/// Pick one peer uniformly at random.
pub fn select_random_peer(peers: &[Peer]) -> Option<Peer> {
    peers.choose(&mut rand::rng()).cloned()
}

/// Random peer among those advertising `protocol`.
pub async fn select_peer_for_protocol(
    directory: &dyn PeerDirectory,
    protocol: &str,
) -> Option<Peer> {
    let peers = directory.peers_for_protocol(protocol).await;
    select_random_peer(&peers)
}
