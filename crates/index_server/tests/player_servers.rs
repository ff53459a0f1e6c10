use std::collections::HashSet;

use client_core::{ClientError, IndexClient};
use data_runtime::configs::index_server::IndexServerCfg;
use index_server::IndexServer;
use world_core::{generate_grid_world, KILOMETER};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_connects_get_unique_nonzero_ids() {
    let cfg = IndexServerCfg { reap_grace_secs: 0, ..Default::default() };
    let server = IndexServer::new(generate_grid_world(2, 1, 2, KILOMETER), cfg)
        .unwrap()
        .bind("127.0.0.1:0".parse().unwrap())
        .await
        .unwrap();
    let addr = server.local_addr();

    let mut tasks = Vec::new();
    for _ in 0..32 {
        tasks.push(tokio::spawn(async move {
            let mut c = IndexClient::connect(addr).await.unwrap();
            let id = c.connect_player_server().await.unwrap();
            (id, c)
        }));
    }
    let mut ids = HashSet::new();
    let mut clients = Vec::new();
    for t in tasks {
        let (id, c) = t.await.unwrap();
        assert_ne!(id, 0);
        assert!(ids.insert(id), "id {id:#x} handed out twice");
        clients.push(c);
    }
    assert_eq!(server.registry().player_server_count().await, 32);

    let listed = clients[0].update_player_servers().await.unwrap();
    assert_eq!(listed.iter().map(|s| s.id).collect::<HashSet<_>>(), ids);
    server.shutdown().await;
}

#[tokio::test]
async fn update_and_disconnect_require_registration() {
    let cfg = IndexServerCfg { reap_grace_secs: 0, ..Default::default() };
    let server = IndexServer::new(generate_grid_world(1, 1, 1, KILOMETER), cfg)
        .unwrap()
        .bind("127.0.0.1:0".parse().unwrap())
        .await
        .unwrap();
    let mut c = IndexClient::connect(server.local_addr()).await.unwrap();
    assert!(matches!(c.update_player_servers().await, Err(ClientError::Refused { .. })));

    let id = c.connect_player_server().await.unwrap();
    // registering again from the same connection keeps the id
    assert_eq!(c.connect_player_server().await.unwrap(), id);
    c.disconnect_player_server().await.unwrap();
    assert!(c.disconnect_player_server().await.unwrap_err().is_refusal());
    assert_eq!(server.registry().player_server_count().await, 0);
    server.shutdown().await;
}
