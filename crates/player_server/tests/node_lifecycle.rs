use std::net::SocketAddr;
use std::time::Duration;

use data_runtime::configs::index_server::IndexServerCfg;
use data_runtime::configs::player_server::PlayerServerCfg;
use index_server::{IndexServer, IndexServerHandle};
use net_core::frame::{read_packet, write_packet};
use net_core::zone_db::PlayerServerMessage;
use player_server::PlayerServerNode;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use world_core::{generate_grid_world, Vector, KILOMETER};

async fn start_index() -> IndexServerHandle {
    let cfg = IndexServerCfg { reap_grace_secs: 0, ..Default::default() };
    let server = IndexServer::new(generate_grid_world(2, 1, 2, KILOMETER), cfg).unwrap();
    server.bind("127.0.0.1:0".parse().unwrap()).await.unwrap()
}

fn node_cfg(index_addr: SocketAddr) -> PlayerServerCfg {
    PlayerServerCfg {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        udp_addr: "127.0.0.1:0".parse().unwrap(),
        index_addr,
        refresh_interval_ms: 20,
        lookup_cell_m: 500,
    }
}

async fn wait_for_peers(node: &PlayerServerNode, n: usize) {
    timeout(Duration::from_secs(5), async {
        while node.peers().len() != n {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("peer list converged");
}

#[tokio::test]
async fn nodes_register_see_each_other_and_deregister() {
    let index = start_index().await;
    let a = PlayerServerNode::connect(&node_cfg(index.local_addr())).await.unwrap();
    assert_ne!(a.id(), 0);
    assert_eq!(a.world().len(), 4);
    let mid = KILOMETER / 2;
    assert_eq!(a.zone_for(Vector::new(mid, mid, mid)), Some(1));
    assert_eq!(a.zone_for(Vector::new(KILOMETER + mid, mid, KILOMETER + mid)), Some(4));
    assert_eq!(a.zone_for(Vector::new(-1, 0, 0)), None);

    let b = PlayerServerNode::connect(&node_cfg(index.local_addr())).await.unwrap();
    assert_ne!(a.id(), b.id());
    wait_for_peers(&a, 2).await;
    assert!(b.peers().iter().any(|p| p.id == a.id()));

    b.shutdown().await.unwrap();
    wait_for_peers(&a, 1).await;
    assert_eq!(index.registry().player_server_count().await, 1);

    a.shutdown().await.unwrap();
    assert_eq!(index.registry().player_server_count().await, 0);
    index.shutdown().await;
}

#[tokio::test]
async fn node_answers_ping_on_its_tcp_port() {
    let index = start_index().await;
    let node = PlayerServerNode::connect(&node_cfg(index.local_addr())).await.unwrap();
    let mut s = TcpStream::connect(node.local_addr()).await.unwrap();
    write_packet(&mut s, &PlayerServerMessage::Ping.to_payload()).await.unwrap();
    let reply = read_packet(&mut s).await.unwrap().unwrap();
    assert_eq!(PlayerServerMessage::from_payload(&reply).unwrap(), PlayerServerMessage::Pong);
    node.shutdown().await.unwrap();
    index.shutdown().await;
}

#[tokio::test]
async fn connect_fails_without_a_registry() {
    let gone = {
        let l = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        l.local_addr().unwrap()
    };
    assert!(PlayerServerNode::connect(&node_cfg(gone)).await.is_err());
}
