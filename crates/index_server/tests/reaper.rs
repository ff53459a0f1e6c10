use std::time::Duration;

use client_core::IndexClient;
use data_runtime::configs::index_server::IndexServerCfg;
use index_server::IndexServer;
use tokio::time::{sleep, timeout};
use world_core::{generate_grid_world, KILOMETER};

#[tokio::test]
async fn dropped_peers_are_reaped_after_the_grace_period() {
    let cfg = IndexServerCfg { reap_grace_secs: 1, reap_interval_ms: 20, ..Default::default() };
    let server = IndexServer::new(generate_grid_world(2, 1, 1, KILOMETER), cfg)
        .unwrap()
        .bind("127.0.0.1:0".parse().unwrap())
        .await
        .unwrap();
    let registry = server.registry().clone();

    let mut store = IndexClient::connect(server.local_addr()).await.unwrap();
    assert_eq!(store.lease_zone(0).await.unwrap(), 1);
    let mut player = IndexClient::connect(server.local_addr()).await.unwrap();
    player.connect_player_server().await.unwrap();
    let mut alive = IndexClient::connect(server.local_addr()).await.unwrap();
    assert_eq!(alive.lease_zone(0).await.unwrap(), 2);

    drop(store);
    drop(player);
    timeout(Duration::from_secs(5), async {
        while registry.lease_count().await != 1 || registry.player_server_count().await != 0 {
            sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("dropped peers reaped");

    // the open connection keeps its lease
    assert!(registry.zone_owner(2).await.is_some());
    alive.ping().await.unwrap();
    server.shutdown().await;
}

#[tokio::test]
async fn short_lived_connections_leave_nothing_behind_without_a_reaper() {
    let cfg = IndexServerCfg { reap_grace_secs: 0, ..Default::default() };
    let server = IndexServer::new(generate_grid_world(1, 1, 1, KILOMETER), cfg)
        .unwrap()
        .bind("127.0.0.1:0".parse().unwrap())
        .await
        .unwrap();
    for _ in 0..20 {
        let mut c = IndexClient::connect(server.local_addr()).await.unwrap();
        c.ping().await.unwrap();
    }
    sleep(Duration::from_millis(100)).await;
    assert_eq!(server.registry().closed_peers(), 0);
    server.shutdown().await;
}
