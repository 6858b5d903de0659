// Players by view id

use crate::codec::{self, MethodCall, Reply};
use crate::events::{HostMessenger, ViewEventForwarder};
use nvp_core::{EngineConfig, NativePlayerBackend, PlayerError, Result};
use nvp_engine::Player;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Owns one engine per embedded view and routes channel calls to it.
pub struct ViewRegistry {
    players: Mutex<HashMap<i64, Arc<Player>>>,
    messenger: Arc<dyn HostMessenger>,
}

impl ViewRegistry {
    pub fn new(messenger: Arc<dyn HostMessenger>) -> Self {
        Self {
            players: Mutex::new(HashMap::new()),
            messenger,
        }
    }

    /// Create the engine for a new view. `config_json` is an optional
    /// `EngineConfig` object; missing fields keep their defaults.
    pub fn create(
        &self,
        view_id: i64,
        backend: Box<dyn NativePlayerBackend>,
        config_json: Option<&str>,
    ) -> Result<Arc<Player>> {
        let config = parse_config(config_json)?;

        let mut players = self.players.lock();
        if players.contains_key(&view_id) {
            return Err(PlayerError::invalid_argument(format!(
                "View {} already has a player",
                view_id
            )));
        }

        let player = Arc::new(Player::with_config(backend, config)?);
        player.add_event_sink(Arc::new(ViewEventForwarder::new(
            view_id,
            self.messenger.clone(),
        )));
        players.insert(view_id, player.clone());
        log::info!("[bridge] view {} created", view_id);
        Ok(player)
    }

    pub fn get(&self, view_id: i64) -> Option<Arc<Player>> {
        self.players.lock().get(&view_id).cloned()
    }

    /// Route one method-channel call. `reply` is called exactly once,
    /// either right away or from the engine thread.
    pub fn handle_call<F>(&self, view_id: i64, call: &MethodCall, reply: F)
    where
        F: FnOnce(Reply) + Send + 'static,
    {
        let command = match codec::decode_call(call) {
            Ok(command) => command,
            Err(err) => {
                log::warn!("[bridge] view {} {}: {}", view_id, call.method, err);
                reply(Reply::from_error(&err));
                return;
            }
        };

        match self.get(view_id) {
            Some(player) => {
                log::debug!("[bridge] view {} {}", view_id, call.method);
                player.dispatch(command, Box::new(move |result| reply(Reply::from_result(result))));
            }
            None => {
                let err = PlayerError::invalid_argument(format!("Unknown view {}", view_id));
                reply(Reply::from_error(&err));
            }
        }
    }

    /// Dispose and forget a view's engine. Returns false if unknown.
    pub fn dispose(&self, view_id: i64) -> bool {
        let player = self.players.lock().remove(&view_id);
        match player {
            Some(player) => {
                player.dispose();
                log::info!("[bridge] view {} disposed", view_id);
                true
            }
            None => false,
        }
    }

    pub fn dispose_all(&self) {
        let players: Vec<_> = self.players.lock().drain().collect();
        for (view_id, player) in players {
            player.dispose();
            log::info!("[bridge] view {} disposed", view_id);
        }
    }

    pub fn len(&self) -> usize {
        self.players.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.lock().is_empty()
    }
}

impl Drop for ViewRegistry {
    fn drop(&mut self) {
        self.dispose_all();
    }
}

fn parse_config(config_json: Option<&str>) -> Result<EngineConfig> {
    match config_json {
        None => Ok(EngineConfig::default()),
        Some(text) => serde_json::from_str(text)
            .map_err(|e| PlayerError::invalid_argument(format!("Invalid engine config: {}", e))),
    }
}
