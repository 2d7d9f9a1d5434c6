//! Replay semantics: what a late subscriber sees first, and who else sees it.

use std::time::Duration;

use anyhow::{ensure, Result};
use lib_planetwatch::protocol::{FrameEnd, PlanetMessage};
use lib_planetwatch::{ConnectionStatus, EventData, Topic};
use project_tests::{expect_silence, game_server, node, object, recv, wait_for_status, watcher, FakePlanet};

fn object_ids(data: &EventData) -> Vec<i64> {
    match data {
        EventData::ObjectStatus(objects) => objects.iter().map(|o| o.network_id).collect(),
        other => panic!("unexpected payload {other:?}"),
    }
}

#[tokio::test]
async fn node_replay_holds_latest_entry_per_cell() -> Result<()> {
    let planet = FakePlanet::bind().await?;
    let watcher = watcher(&[("tatooine", &planet)]);

    let mut first = watcher.subscribe(Topic::NodeStatusUpdate, "tatooine", None)?;
    assert_eq!(recv(&mut first).await?.data, EventData::NodeStatus(vec![]));

    let mut peer = planet.accept().await?;
    // Cell 5 twice, then cell 9.
    peer.send(&PlanetMessage::PlanetNodeStatus(vec![node(-8000, -7500, 0)])).await?;
    peer.send(&PlanetMessage::PlanetNodeStatus(vec![node(-8000, -7500, 1)])).await?;
    peer.send(&PlanetMessage::PlanetNodeStatus(vec![node(-8000, -7100, 1)])).await?;
    for _ in 0..3 {
        recv(&mut first).await?;
    }

    let mut late = watcher.subscribe(Topic::NodeStatusUpdate, "tatooine", Some("late".into()))?;
    let replay = recv(&mut late).await?;
    assert_eq!(replay.client_id.as_deref(), Some("late"));
    match &replay.data {
        EventData::NodeStatus(nodes) => {
            let cells: Vec<i64> = nodes.iter().map(|n| n.cell_index()).collect();
            assert_eq!(cells, vec![5, 9]);
            assert!(nodes.iter().all(|n| n.is_loaded == 1));
        }
        other => panic!("unexpected replay payload {other:?}"),
    }

    // The late subscriber's replay is not delivered to the first subscriber.
    expect_silence(&mut first, Duration::from_millis(200)).await?;
    Ok(())
}

#[tokio::test]
async fn deleted_object_is_not_replayed() -> Result<()> {
    let planet = FakePlanet::bind().await?;
    let watcher = watcher(&[("naboo", &planet)]);

    let mut live = watcher.subscribe(Topic::ObjectUpdate, "naboo", None)?;
    recv(&mut live).await?;
    let mut peer = planet.accept().await?;

    peer.send(&PlanetMessage::PlanetObjectStatus(vec![object(42, 0), object(43, 0)])).await?;
    peer.send(&PlanetMessage::PlanetObjectStatus(vec![object(42, 1)])).await?;
    recv(&mut live).await?;
    let deletion = recv(&mut live).await?;
    // The deleting update is still broadcast.
    assert_eq!(deletion.data, EventData::ObjectStatus(vec![object(42, 1)]));

    let mut late = watcher.subscribe(Topic::ObjectUpdate, "naboo", None)?;
    assert_eq!(object_ids(&recv(&mut late).await?.data), vec![43]);
    Ok(())
}

#[tokio::test]
async fn replay_precedes_broadcasts() -> Result<()> {
    let planet = FakePlanet::bind().await?;
    let watcher = watcher(&[("endor", &planet)]);

    let mut first = watcher.subscribe(Topic::GameServerStatus, "endor", None)?;
    recv(&mut first).await?;
    let mut peer = planet.accept().await?;
    peer.send(&PlanetMessage::GameServerStatus(game_server(1, 1))).await?;
    recv(&mut first).await?;

    let mut second = watcher.subscribe(Topic::GameServerStatus, "endor", Some("ops".into()))?;
    peer.send(&PlanetMessage::GameServerStatus(game_server(2, 1))).await?;

    let replay = recv(&mut second).await?;
    assert_eq!(replay.client_id.as_deref(), Some("ops"));
    assert_eq!(replay.data, EventData::GameServerStatus(vec![game_server(1, 1)]));

    let update = recv(&mut second).await?;
    assert_eq!(update.client_id, None);
    assert_eq!(update.data, EventData::GameServerStatus(vec![game_server(2, 1)]));
    Ok(())
}

#[tokio::test]
async fn frame_end_streams_without_replay() -> Result<()> {
    let planet = FakePlanet::bind().await?;
    let watcher = watcher(&[("hoth", &planet)]);

    let mut frames = watcher.subscribe(Topic::FrameEnd, "hoth", None)?;
    let mut peer = planet.accept().await?;
    let frame = FrameEnd {
        server_id: 4,
        frame_time: 33,
        profiler_data: "tick".to_string(),
    };
    peer.send(&PlanetMessage::FrameEnd(frame.clone())).await?;

    // The first thing seen is the live frame, not a replay.
    let event = recv(&mut frames).await?;
    assert_eq!(event.topic, Topic::FrameEnd);
    assert_eq!(event.data, EventData::FrameEnd(frame));
    assert_eq!(event.client_id, None);
    Ok(())
}

#[tokio::test]
async fn topics_are_routed_independently() -> Result<()> {
    let planet = FakePlanet::bind().await?;
    let watcher = watcher(&[("dantooine", &planet)]);

    let mut objects = watcher.subscribe(Topic::ObjectUpdate, "dantooine", None)?;
    let mut servers = watcher.subscribe(Topic::GameServerStatus, "dantooine", None)?;
    recv(&mut objects).await?;
    recv(&mut servers).await?;
    assert_eq!(watcher.pool().refcount("dantooine"), Some(2));

    let mut peer = planet.accept().await?;
    peer.send(&PlanetMessage::GameServerStatus(game_server(7, 0))).await?;

    assert_eq!(recv(&mut servers).await?.topic, Topic::GameServerStatus);
    expect_silence(&mut objects, Duration::from_millis(200)).await?;
    Ok(())
}

#[tokio::test]
async fn events_serialize_for_downstream_clients() -> Result<()> {
    let planet = FakePlanet::bind().await?;
    let watcher = watcher(&[("rodia", &planet)]);

    let mut sub = watcher.subscribe(Topic::ObjectUpdate, "rodia", Some("dash".into()))?;
    let mut peer = planet.accept().await?;
    peer.send(&PlanetMessage::PlanetObjectStatus(vec![object(i64::MIN, 0)])).await?;

    let replay = serde_json::to_value(&*recv(&mut sub).await?)?;
    assert_eq!(replay["clientId"], "dash");
    assert_eq!(replay["topic"], "OBJECT_UPDATE");

    let update = serde_json::to_value(&*recv(&mut sub).await?)?;
    assert!(update.get("clientId").is_none());
    let entry = &update["data"][0];
    assert_eq!(entry["networkId"], i64::MIN.to_string());
    assert_eq!(entry["authoritativeServer"], 1);
    assert_eq!(entry["templateCrc"], 0x1234_5678);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn joiners_mid_stream_see_every_update_exactly_once() -> Result<()> {
    const UPDATES: i64 = 400;
    const JOINERS: u64 = 40;

    let planet = FakePlanet::bind().await?;
    let watcher = watcher(&[("mustafar", &planet)]);
    let mut anchor = watcher.subscribe(Topic::ObjectUpdate, "mustafar", None)?;
    recv(&mut anchor).await?;
    let mut peer = planet.accept().await?;
    wait_for_status(&watcher, "mustafar", ConnectionStatus::Connected).await?;

    let writer = tokio::spawn(async move {
        for id in 1..=UPDATES {
            peer.send(&PlanetMessage::PlanetObjectStatus(vec![object(id, 0)])).await?;
            if id % 8 == 0 {
                tokio::task::yield_now().await;
            }
        }
        anyhow::Ok(peer)
    });

    let mut joiners = Vec::new();
    for i in 0..JOINERS {
        let watcher = watcher.clone();
        joiners.push(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_micros(100 * i)).await;
            let client_id = format!("joiner-{i}");
            let mut sub = watcher.subscribe(Topic::ObjectUpdate, "mustafar", Some(client_id.clone()))?;

            let replay = recv(&mut sub).await?;
            ensure!(replay.client_id.as_deref() == Some(client_id.as_str()), "replay for {client_id} was not scoped");
            let mut seen = object_ids(&replay.data);
            while seen.len() < UPDATES as usize {
                let event = recv(&mut sub).await?;
                ensure!(event.client_id.is_none(), "{client_id} received another subscriber's replay");
                seen.extend(object_ids(&event.data));
            }
            expect_silence(&mut sub, Duration::from_millis(100)).await?;
            seen.sort_unstable();
            anyhow::Ok(seen)
        }));
    }

    let _peer = writer.await??;
    let expected: Vec<i64> = (1..=UPDATES).collect();
    for joiner in joiners {
        assert_eq!(joiner.await??, expected);
    }
    Ok(())
}
