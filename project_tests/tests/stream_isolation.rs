//! Segmentation, malformed input and per-planet isolation over real sockets.

use std::time::Duration;

use anyhow::Result;
use lib_planetwatch::protocol::encoder::{encode_frame, frame};
use lib_planetwatch::protocol::{MessageKind, PlanetMessage};
use lib_planetwatch::{ConnectionStatus, EventData, Topic};
use project_tests::{expect_silence, game_server, node, object, recv, wait_for_status, watcher, FakePlanet, WAIT};

/// A frame whose header names a known kind but whose body is cut short.
fn truncated_game_server_frame() -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&MessageKind::GameServerStatus.operand_count().to_le_bytes());
    payload.extend_from_slice(&MessageKind::GameServerStatus.type_code().to_le_bytes());
    payload.push(1); // isOnline, then nothing
    frame(&payload).to_vec()
}

#[tokio::test]
async fn byte_at_a_time_delivery_decodes() -> Result<()> {
    let planet = FakePlanet::bind().await?;
    let watcher = watcher(&[("tatooine", &planet)]);
    let mut sub = watcher.subscribe(Topic::NodeStatusUpdate, "tatooine", None)?;
    recv(&mut sub).await?;

    let mut peer = planet.accept().await?;
    let message = PlanetMessage::PlanetNodeStatus(vec![node(0, 0, 1), node(150, -250, 0)]);
    peer.send_trickle(&encode_frame(&message)).await?;

    let event = recv(&mut sub).await?;
    assert_eq!(event.data, EventData::NodeStatus(vec![node(0, 0, 1), node(150, -250, 0)]));
    Ok(())
}

#[tokio::test]
async fn many_frames_in_one_write_arrive_in_order() -> Result<()> {
    let planet = FakePlanet::bind().await?;
    let watcher = watcher(&[("naboo", &planet)]);
    let mut sub = watcher.subscribe(Topic::ObjectUpdate, "naboo", None)?;
    recv(&mut sub).await?;

    let mut peer = planet.accept().await?;
    let mut batch = Vec::new();
    for id in 1..=20 {
        batch.extend_from_slice(&encode_frame(&PlanetMessage::PlanetObjectStatus(vec![object(id, 0)])));
    }
    peer.send_raw(&batch).await?;

    for id in 1..=20 {
        assert_eq!(recv(&mut sub).await?.data, EventData::ObjectStatus(vec![object(id, 0)]));
    }
    Ok(())
}

#[tokio::test]
async fn unknown_type_codes_are_skipped() -> Result<()> {
    let planet = FakePlanet::bind().await?;
    let watcher = watcher(&[("endor", &planet)]);
    let mut sub = watcher.subscribe(Topic::GameServerStatus, "endor", None)?;
    recv(&mut sub).await?;

    let mut peer = planet.accept().await?;
    let mut unknown = Vec::new();
    unknown.extend_from_slice(&3u16.to_le_bytes());
    unknown.extend_from_slice(&0x0BAD_F00Di32.to_le_bytes());
    unknown.extend_from_slice(&[0xAA; 12]);

    let mut bytes = frame(&unknown).to_vec();
    bytes.extend_from_slice(&encode_frame(&PlanetMessage::GameServerStatus(game_server(5, 1))));
    peer.send_raw(&bytes).await?;

    assert_eq!(recv(&mut sub).await?.data, EventData::GameServerStatus(vec![game_server(5, 1)]));
    assert_eq!(watcher.connection_status("endor"), Some(ConnectionStatus::Connected));
    Ok(())
}

#[tokio::test]
async fn malformed_stream_is_isolated_to_its_planet() -> Result<()> {
    let planet_a = FakePlanet::bind().await?;
    let planet_b = FakePlanet::bind().await?;
    let watcher = watcher(&[("alderaan", &planet_a), ("bespin", &planet_b)]);

    let mut sub_a = watcher.subscribe(Topic::GameServerStatus, "alderaan", None)?;
    let mut sub_b = watcher.subscribe(Topic::GameServerStatus, "bespin", None)?;
    recv(&mut sub_a).await?;
    recv(&mut sub_b).await?;
    let mut peer_a = planet_a.accept().await?;
    let mut peer_b = planet_b.accept().await?;

    peer_b.send(&PlanetMessage::GameServerStatus(game_server(1, 1))).await?;
    recv(&mut sub_b).await?;

    peer_a.send_raw(&truncated_game_server_frame()).await?;
    expect_silence(&mut sub_a, Duration::from_millis(200)).await?;

    // B is untouched: still connected, cache intact, still streaming.
    assert_eq!(watcher.connection_status("bespin"), Some(ConnectionStatus::Connected));
    peer_b.send(&PlanetMessage::GameServerStatus(game_server(2, 1))).await?;
    assert_eq!(recv(&mut sub_b).await?.data, EventData::GameServerStatus(vec![game_server(2, 1)]));
    let bespin = watcher.pool().connection("bespin").expect("pooled");
    assert_eq!(bespin.with_cache(|cache| cache.game_server_count()), 2);

    // A resumes on a later chunk.
    wait_for_status(&watcher, "alderaan", ConnectionStatus::Connected).await?;
    let recovered = tokio::time::timeout(WAIT, async {
        loop {
            peer_a.send(&PlanetMessage::GameServerStatus(game_server(3, 1))).await?;
            if let Ok(event) = tokio::time::timeout(Duration::from_millis(100), sub_a.next()).await {
                return anyhow::Ok(event);
            }
        }
    })
    .await??;
    let event = recovered.expect("subscription open");
    assert_eq!(event.data, EventData::GameServerStatus(vec![game_server(3, 1)]));
    Ok(())
}

#[tokio::test]
async fn oversized_length_prefix_is_discarded() -> Result<()> {
    let planet = FakePlanet::bind().await?;
    let watcher = watcher(&[("kessel", &planet)]);
    let mut sub = watcher.subscribe(Topic::ObjectUpdate, "kessel", None)?;
    recv(&mut sub).await?;

    let mut peer = planet.accept().await?;
    peer.send_raw(&u32::MAX.to_le_bytes()).await?;
    expect_silence(&mut sub, Duration::from_millis(200)).await?;

    let recovered = tokio::time::timeout(WAIT, async {
        loop {
            peer.send(&PlanetMessage::PlanetObjectStatus(vec![object(9, 0)])).await?;
            if let Ok(event) = tokio::time::timeout(Duration::from_millis(100), sub.next()).await {
                return anyhow::Ok(event);
            }
        }
    })
    .await??;
    assert_eq!(recovered.expect("subscription open").data, EventData::ObjectStatus(vec![object(9, 0)]));
    Ok(())
}
