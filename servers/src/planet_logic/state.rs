use lib_planetwatch::PlanetWatcher;
use tokio::sync::broadcast;

#[derive(Clone)]
pub struct AppState {
    pub watcher: PlanetWatcher,
    // Fired once on shutdown so open WebSocket sessions can close cleanly
    pub shutdown: broadcast::Sender<()>,
}

impl AppState {
    pub fn new(watcher: PlanetWatcher, shutdown: broadcast::Sender<()>) -> Self {
        Self { watcher, shutdown }
    }
}
