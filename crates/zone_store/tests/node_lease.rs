use std::net::SocketAddr;
use std::time::Duration;

use client_core::ZoneStoreClient;
use data_runtime::configs::index_server::IndexServerCfg;
use data_runtime::configs::zone_store::ZoneStoreCfg;
use index_server::{IndexServer, IndexServerHandle};
use net_core::frame::{read_packet, write_packet};
use net_core::zone_db::PLAYER_STATE_BYTES;
use tokio::net::TcpStream;
use tokio::time::timeout;
use world_core::{generate_grid_world, KILOMETER};
use zone_store::ZoneStoreNode;

async fn start_index(zones: u32) -> IndexServerHandle {
    let cfg = IndexServerCfg { reap_grace_secs: 0, ..Default::default() };
    let server = IndexServer::new(generate_grid_world(zones, 1, 1, KILOMETER), cfg).unwrap();
    server.bind("127.0.0.1:0".parse().unwrap()).await.unwrap()
}

fn store_cfg(index_addr: SocketAddr, requested_zone: u32) -> ZoneStoreCfg {
    ZoneStoreCfg {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        index_addr,
        requested_zone,
        history_size: 8,
        ..Default::default()
    }
}

#[tokio::test]
async fn stores_lease_distinct_zones_and_release_on_shutdown() {
    let index = start_index(2).await;
    let a = ZoneStoreNode::start(&store_cfg(index.local_addr(), 0)).await.unwrap();
    let b = ZoneStoreNode::start(&store_cfg(index.local_addr(), 0)).await.unwrap();
    assert_eq!((a.zone_id(), b.zone_id()), (1, 2));
    assert!(ZoneStoreNode::start(&store_cfg(index.local_addr(), 0)).await.is_err());

    a.shutdown().await.unwrap();
    assert!(index.registry().zone_owner(1).await.is_none());
    let c = ZoneStoreNode::start(&store_cfg(index.local_addr(), 1)).await.unwrap();
    assert_eq!(c.zone_id(), 1);

    b.shutdown().await.unwrap();
    c.shutdown().await.unwrap();
    assert_eq!(index.registry().lease_count().await, 0);
    index.shutdown().await;
}

#[tokio::test]
async fn pushed_states_land_in_the_history() {
    let index = start_index(1).await;
    let node = ZoneStoreNode::start(&store_cfg(index.local_addr(), 0)).await.unwrap();
    let mut client = ZoneStoreClient::connect(node.local_addr()).await.unwrap();
    client.ping().await.unwrap();
    for frame in 0..10u64 {
        client.push_state(42, frame, frame * 16, &[frame as u8; PLAYER_STATE_BYTES]).await.unwrap();
    }
    // a ping after the pushes means the handler has read them all
    client.ping().await.unwrap();

    let store = node.store().clone();
    assert_eq!(store.session_count(), 1);
    let latest = store.latest(42).unwrap();
    assert_eq!((latest.frame, latest.sim_time, latest.state[0]), (9, 144, 9));
    assert!(store.state_at(42, 1).is_none());
    assert_eq!(store.state_at(42, 2).map(|e| e.frame), Some(2));

    client.close().await.unwrap();
    node.shutdown().await.unwrap();
    index.shutdown().await;
}

#[tokio::test]
async fn short_player_state_closes_the_connection() {
    let index = start_index(1).await;
    let node = ZoneStoreNode::start(&store_cfg(index.local_addr(), 0)).await.unwrap();
    let mut s = TcpStream::connect(node.local_addr()).await.unwrap();
    // PlayerState tag followed by only a session id
    let mut bad = vec![2u8];
    bad.extend_from_slice(&5u64.to_le_bytes());
    write_packet(&mut s, &bad).await.unwrap();
    let closed = timeout(Duration::from_secs(5), read_packet(&mut s)).await.expect("closed in time");
    assert!(matches!(closed, Ok(None) | Err(_)));
    assert_eq!(node.store().session_count(), 0);

    // other connections are unaffected
    let mut ok = ZoneStoreClient::connect(node.local_addr()).await.unwrap();
    ok.ping().await.unwrap();
    node.shutdown().await.unwrap();
    index.shutdown().await;
}

#[tokio::test]
async fn idle_player_histories_are_dropped_by_the_node() {
    let index = start_index(1).await;
    let cfg = ZoneStoreCfg { idle_timeout_secs: 1, sweep_interval_ms: 50, ..store_cfg(index.local_addr(), 0) };
    let node = ZoneStoreNode::start(&cfg).await.unwrap();
    let mut client = ZoneStoreClient::connect(node.local_addr()).await.unwrap();
    client.push_state(7, 0, 0, &[1; PLAYER_STATE_BYTES]).await.unwrap();
    client.ping().await.unwrap();
    assert_eq!(node.store().session_count(), 1);

    let store = node.store().clone();
    timeout(Duration::from_secs(5), async {
        while store.session_count() != 0 {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await
    .expect("idle history evicted");

    client.close().await.unwrap();
    node.shutdown().await.unwrap();
    index.shutdown().await;
}
