mod catalog;
mod config;
mod dispatch;
mod error;
mod http;
mod media;
mod observability;
mod parse;
mod publish;
mod scrape;
mod server;
mod shorten;
mod util;

pub use crate::error::*;
pub use config::*;
pub use media::{prepare_pool, PreparePoolArgs};
pub use observability::*;

#[allow(unused_imports)]
mod prelude {
    pub(crate) use crate::error::ResultExt as _;
    pub(crate) use crate::http::prelude::*;
    pub(crate) use crate::observability::logging::prelude::*;
    pub(crate) use crate::util::prelude::*;
}

use catalog::ServerCatalog;
use dispatch::{Dispatcher, DispatcherParts};
use media::{Compositor, ImagePool};
use publish::ChatPublisher;
use scrape::Scraper;
use shorten::Shortener;
use std::sync::Arc;

/// Run the HTTP server that accepts bulk posting requests
pub async fn run(config: Config) -> Result {
    let assets = config.assets;

    util::fs::empty_dir(&assets.uploads_dir)
        .await
        .fatal_ctx(|| {
            format!(
                "Failed to prepare the uploads directory {}",
                assets.uploads_dir.display()
            )
        })?;

    let catalog = ServerCatalog::load(&assets.servers_file).await?;

    let http = http::create_client();

    let dispatcher = Dispatcher::new(DispatcherParts {
        catalog,
        scraper: Scraper::new(http.clone()),
        shortener: Shortener::new(config.shorten, http),
        compositor: Compositor::new(&assets),
        pool: ImagePool::new(&assets),
        publisher: Arc::new(ChatPublisher::new(config.discord, config.tg)),
        config: config.dispatch,
    });

    let state = server::AppState {
        dispatcher: Arc::new(dispatcher),
        uploads_dir: assets.uploads_dir,
    };

    server::serve(config.http, state).await
}
