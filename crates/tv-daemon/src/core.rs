/// DaemonCore: single-owner event loop for all catalog and cursor changes.
///
/// Socket clients, the HTTP API, load tasks and the watchdog ticker all send
/// `DaemonEvent`s here; nothing else mutates the `StateManager`.  After any
/// event that changed state, a `BroadcastMessage::StateUpdated` goes out to
/// every listener.
///
/// Loads run as spawned tasks so zapping stays responsive while playlists
/// download.  A load's result is applied by the `StateManager` only if no
/// newer load was started in the meantime.
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use tv_proto::config::Config;
use tv_proto::fetch::CatalogFetcher;
use tv_proto::health::BufferingWatchdog;
use tv_proto::protocol::{Command, PlayerEvent};
use tv_proto::state::StateManager;

use crate::BroadcastMessage;

const WATCHDOG_TICK_MS: u64 = 250;

/// All inputs into the DaemonCore loop.
#[derive(Debug)]
pub enum DaemonEvent {
    /// A command from a socket client or the HTTP API.
    ClientCommand(Command),
    /// A spawned load task finished; `applied` is false for stale loads.
    LoadFinished { generation: u64, applied: bool },
    /// Periodic check of the buffering watchdog.
    WatchdogTick,
    /// Stop the loop (sent on Ctrl-C).
    Shutdown,
}

pub struct DaemonCore {
    config: Config,
    state_manager: Arc<StateManager>,
    fetcher: Arc<CatalogFetcher>,
    watchdog: BufferingWatchdog,
    event_tx: mpsc::Sender<DaemonEvent>,
    broadcast_tx: broadcast::Sender<BroadcastMessage>,
    /// Last revision broadcast (to avoid redundant StateUpdated).
    last_rev: u64,
}

impl DaemonCore {
    pub fn new(
        config: Config,
        broadcast_tx: broadcast::Sender<BroadcastMessage>,
        event_tx: mpsc::Sender<DaemonEvent>,
    ) -> anyhow::Result<Self> {
        let fetcher = Arc::new(CatalogFetcher::new(&config.catalog)?);
        let state_manager = Arc::new(StateManager::new(&config.playback));
        let watchdog = BufferingWatchdog::from_config(&config.playback);

        Ok(Self {
            config,
            state_manager,
            fetcher,
            watchdog,
            event_tx,
            broadcast_tx,
            last_rev: 0,
        })
    }

    /// Borrow the state manager (for the socket and HTTP servers).
    pub fn state_manager(&self) -> Arc<StateManager> {
        Arc::clone(&self.state_manager)
    }

    /// Run the core event loop.  Returns when a `Shutdown` event is received
    /// or every sender has been dropped.
    pub async fn run(mut self, mut event_rx: mpsc::Receiver<DaemonEvent>) -> anyhow::Result<()> {
        info!("DaemonCore: starting event loop");

        let ticker_tx = self.event_tx.clone();
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(tokio::time::Duration::from_millis(WATCHDOG_TICK_MS));
            loop {
                interval.tick().await;
                if ticker_tx.send(DaemonEvent::WatchdogTick).await.is_err() {
                    break;
                }
            }
        });

        let initial_region = self.config.catalog.initial_region.clone();
        self.start_load(&initial_region).await;

        while let Some(evt) = event_rx.recv().await {
            if !self.handle_event(evt).await {
                break;
            }
        }

        info!("DaemonCore: event loop stopped");
        Ok(())
    }

    /// Apply one event.  Returns false once the loop should stop.
    async fn handle_event(&mut self, evt: DaemonEvent) -> bool {
        match evt {
            DaemonEvent::Shutdown => {
                info!("DaemonCore: shutdown requested");
                return false;
            }
            DaemonEvent::ClientCommand(cmd) => {
                debug!("DaemonCore: command {:?}", cmd);
                self.handle_command(cmd).await;
            }
            DaemonEvent::LoadFinished {
                generation,
                applied,
            } => {
                if applied {
                    info!("DaemonCore: load #{} applied", generation);
                } else {
                    debug!("DaemonCore: load #{} superseded", generation);
                }
            }
            DaemonEvent::WatchdogTick => self.check_watchdog().await,
        }

        self.sync_watchdog().await;
        self.broadcast_if_changed().await;
        true
    }

    async fn handle_command(&mut self, cmd: Command) {
        let sm = Arc::clone(&self.state_manager);
        match cmd {
            Command::SelectRegion { code } => self.start_load(&code).await,
            Command::SelectCategory { label } => sm.select_category(&label).await,
            Command::Select { stream_url } => {
                if !sm.select_by_url(&stream_url).await {
                    warn!("Select: no loaded channel streams from {}", stream_url);
                }
            }
            Command::Next => {
                sm.next().await;
            }
            Command::Prev => {
                sm.prev().await;
            }
            Command::MarkBroken { stream_url } => {
                sm.mark_broken(&stream_url).await;
            }
            Command::Player { event } => self.on_player_event(event),
            Command::ToggleAutoSkip => {
                let enabled = sm.toggle_auto_skip().await;
                info!("Auto-skip broken channels: {}", enabled);
            }
            Command::ToggleSubtitles => {
                let enabled = sm.toggle_subtitles().await;
                info!("Subtitles: {}", enabled);
            }
            // Answered by the socket server from a fresh snapshot
            Command::GetState => {}
        }
    }

    /// Reset the catalog for `region` and fetch it in the background.
    async fn start_load(&mut self, region: &str) {
        let ticket = self.state_manager.begin_load(region).await;
        let generation = ticket.generation;

        let sm = Arc::clone(&self.state_manager);
        let fetcher = Arc::clone(&self.fetcher);
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let channels = fetcher.fetch_region(&ticket.region).await;
            let applied = sm.finish_load(ticket, channels).await;
            let _ = tx
                .send(DaemonEvent::LoadFinished {
                    generation,
                    applied,
                })
                .await;
        });
    }

    fn on_player_event(&mut self, event: PlayerEvent) {
        debug!("Player event: {:?}", event);
        self.watchdog.on_event(event, Instant::now());
    }

    /// Point the watchdog at whatever is selected now.
    async fn sync_watchdog(&mut self) {
        let current = self.state_manager.current().await;
        self.watchdog
            .channel_switched(current.as_ref().map(|c| c.stream_url.as_str()), Instant::now());
    }

    async fn check_watchdog(&mut self) {
        let Some(stream_url) = self.watchdog.poll(Instant::now()) else {
            return;
        };

        if !self.state_manager.auto_skip_broken().await {
            info!("Stream stalled but auto-skip is off: {}", stream_url);
            return;
        }
        warn!("Stream stalled past grace period, skipping: {}", stream_url);
        self.state_manager.mark_broken(&stream_url).await;
    }

    async fn broadcast_if_changed(&mut self) {
        let rev = self.state_manager.rev().await;
        if rev != self.last_rev {
            self.last_rev = rev;
            let _ = self.broadcast_tx.send(BroadcastMessage::StateUpdated);
        }
    }
}
