//! Connection sharing, teardown and socket failure handling.

use std::time::Duration;

use anyhow::Result;
use lib_planetwatch::protocol::PlanetMessage;
use lib_planetwatch::{ConnectionStatus, EventData, Topic, WatcherError};
use project_tests::{game_server, object, recv, wait_for_status, watcher, FakePlanet};

#[tokio::test]
async fn subscribers_share_one_socket() -> Result<()> {
    let planet = FakePlanet::bind().await?;
    let watcher = watcher(&[("tatooine", &planet)]);

    let mut a = watcher.subscribe(Topic::ObjectUpdate, "tatooine", Some("a".into()))?;
    let mut b = watcher.subscribe(Topic::ObjectUpdate, "tatooine", Some("b".into()))?;
    assert_eq!(watcher.pool().refcount("tatooine"), Some(2));

    let mut peer = planet.accept().await?;
    planet.expect_no_connection(Duration::from_millis(200)).await?;
    wait_for_status(&watcher, "tatooine", ConnectionStatus::Connected).await?;

    recv(&mut a).await?;
    recv(&mut b).await?;
    peer.send(&PlanetMessage::PlanetObjectStatus(vec![object(1, 0)])).await?;
    assert_eq!(recv(&mut a).await?.data, EventData::ObjectStatus(vec![object(1, 0)]));
    assert_eq!(recv(&mut b).await?.data, EventData::ObjectStatus(vec![object(1, 0)]));

    let connection = watcher.pool().connection("tatooine").expect("pooled");
    a.close();
    assert_eq!(watcher.pool().refcount("tatooine"), Some(1));
    assert_eq!(connection.status(), ConnectionStatus::Connected);

    b.close();
    b.close();
    assert_eq!(watcher.pool().refcount("tatooine"), None);
    assert_eq!(connection.status(), ConnectionStatus::Closed);
    assert!(connection.with_cache(|cache| cache.is_empty()));
    peer.expect_eof().await?;
    Ok(())
}

#[tokio::test]
async fn resubscribe_after_teardown_opens_new_socket() -> Result<()> {
    let planet = FakePlanet::bind().await?;
    let watcher = watcher(&[("naboo", &planet)]);

    let mut first = watcher.subscribe(Topic::GameServerStatus, "naboo", None)?;
    let mut peer = planet.accept().await?;
    recv(&mut first).await?;
    peer.send(&PlanetMessage::GameServerStatus(game_server(1, 1))).await?;
    recv(&mut first).await?;
    drop(first);
    peer.expect_eof().await?;

    // Cached state went with the old connection.
    let mut second = watcher.subscribe(Topic::GameServerStatus, "naboo", None)?;
    let _peer = planet.accept().await?;
    assert_eq!(recv(&mut second).await?.data, EventData::GameServerStatus(vec![]));
    Ok(())
}

#[tokio::test]
async fn unknown_planet_fails_only_that_subscribe() -> Result<()> {
    let planet = FakePlanet::bind().await?;
    let watcher = watcher(&[("endor", &planet)]);
    let mut ok = watcher.subscribe(Topic::ObjectUpdate, "endor", None)?;

    let err = watcher.subscribe(Topic::ObjectUpdate, "kashyyyk", None).err();
    assert_eq!(err, Some(WatcherError::UnknownPlanet("kashyyyk".to_string())));
    assert_eq!(watcher.pool().active_planets(), vec!["endor".to_string()]);

    recv(&mut ok).await?;
    assert_eq!(watcher.pool().refcount("endor"), Some(1));
    Ok(())
}

#[tokio::test]
async fn refused_connection_ends_closed() -> Result<()> {
    let planet = FakePlanet::bind().await?;
    let address = planet.address();
    drop(planet);

    let directory = lib_planetwatch::StaticPlanetDirectory::new().with_planet("yavin4", address);
    let watcher = lib_planetwatch::PlanetWatcher::new(std::sync::Arc::new(directory));

    // Subscribe succeeds; the failure shows up as status.
    let mut sub = watcher.subscribe(Topic::NodeStatusUpdate, "yavin4", None)?;
    wait_for_status(&watcher, "yavin4", ConnectionStatus::Closed).await?;
    assert_eq!(recv(&mut sub).await?.data, EventData::NodeStatus(vec![]));
    assert_eq!(watcher.pool().refcount("yavin4"), Some(1));

    sub.close();
    assert!(watcher.pool().active_planets().is_empty());
    Ok(())
}

#[tokio::test]
async fn remote_close_keeps_last_known_state() -> Result<()> {
    let planet = FakePlanet::bind().await?;
    let watcher = watcher(&[("dagobah", &planet)]);

    let mut first = watcher.subscribe(Topic::ObjectUpdate, "dagobah", None)?;
    recv(&mut first).await?;
    let mut peer = planet.accept().await?;
    peer.send(&PlanetMessage::PlanetObjectStatus(vec![object(77, 0)])).await?;
    recv(&mut first).await?;
    drop(peer);

    wait_for_status(&watcher, "dagobah", ConnectionStatus::Closed).await?;
    // No reconnect attempt.
    planet.expect_no_connection(Duration::from_millis(300)).await?;

    let mut late = watcher.subscribe(Topic::ObjectUpdate, "dagobah", None)?;
    assert_eq!(recv(&mut late).await?.data, EventData::ObjectStatus(vec![object(77, 0)]));
    Ok(())
}

#[tokio::test]
async fn overlapping_subscribe_and_close_balance_out() -> Result<()> {
    let planet = FakePlanet::bind().await?;
    let watcher = watcher(&[("corellia", &planet)]);
    let _anchor = watcher.subscribe(Topic::FrameEnd, "corellia", None)?;

    let mut tasks = Vec::new();
    for i in 0..32 {
        let watcher = watcher.clone();
        tasks.push(tokio::spawn(async move {
            let topic = if i % 2 == 0 { Topic::ObjectUpdate } else { Topic::FrameEnd };
            let mut sub = watcher.subscribe(topic, "corellia", Some(format!("c{i}")))?;
            tokio::task::yield_now().await;
            sub.close();
            Ok::<_, WatcherError>(())
        }));
    }
    for task in tasks {
        task.await??;
    }

    assert_eq!(watcher.pool().refcount("corellia"), Some(1));
    assert_eq!(watcher.subscriber_count("corellia", Topic::ObjectUpdate), 0);
    assert_eq!(watcher.subscriber_count("corellia", Topic::FrameEnd), 1);
    let _peer = planet.accept().await?;
    planet.expect_no_connection(Duration::from_millis(200)).await?;
    Ok(())
}
