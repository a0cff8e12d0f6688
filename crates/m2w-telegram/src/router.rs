use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};
use tokio::sync::Mutex;
use tracing::{info, warn};

use m2w_core::{config::Config, dedup::MessageDeduplicator, Resolver};

use crate::handlers;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub resolver: Arc<Resolver>,
    pub dedup: Arc<Mutex<MessageDeduplicator>>,
}

impl AppState {
    pub fn new(cfg: Arc<Config>, resolver: Arc<Resolver>) -> Self {
        let dedup = MessageDeduplicator::new(cfg.dedup_capacity, cfg.dedup_window);
        Self {
            cfg,
            resolver,
            dedup: Arc::new(Mutex::new(dedup)),
        }
    }

    pub fn place_lookup_available(&self) -> bool {
        self.cfg.google_maps_api_key.is_some()
    }
}

pub async fn run_polling(cfg: Arc<Config>, resolver: Arc<Resolver>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.require_bot_token()?);

    match bot.get_me().await {
        Ok(me) => info!("m2w started: @{}", me.username()),
        Err(e) => warn!("get_me failed, continuing: {e}"),
    }
    if cfg.google_maps_api_key.is_none() {
        info!("GOOGLE_MAPS_API_KEY not set; place lookup disabled");
    }

    let state = Arc::new(AppState::new(cfg, resolver));

    let handler =
        dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    Ok(())
}
