use std::{env, sync::Arc};

use anyhow::{anyhow, Result};
use chrono::Local;
use log::{info, warn};
use pokesuri_events::{load_event_set, CalendarController, EventSet, PageConfig, Source};
use reqwest::Client;
use tokio::{net::TcpListener, signal};

use pokesuri_calendar::{
    cache::CacheStorage,
    cli::{self, Args},
    server::{self, AppState},
    source::{DirSource, HttpSource},
    upstream::Upstream,
    worker::{CacheWorker, WorkerConfig},
};

fn setup_logging() {
    if env::var("LOG").is_err() {
        env::set_var("LOG", "pokesuri_calendar=info,pokesuri_events=info");
    }

    pretty_env_logger::init_custom_env("LOG");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::parse(env::args().skip(1).collect());
    setup_logging();

    let client = Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let mut page = args.variant.config();
    if let Some(manifest) = &args.manifest {
        page.manifest = manifest.clone();
    }

    let source: Box<dyn Source> = match (&args.data_dir, &args.origin) {
        (Some(dir), _) => Box::new(DirSource::new(dir)),
        (None, Some(origin)) => Box::new(HttpSource::new(client.clone(), origin.join(&args.base)?)),
        (None, None) => return Err(anyhow!("no event source configured")),
    };

    let events = Arc::new(load_event_set(source.as_ref(), &page).await);

    if let Some(category) = args.print {
        let today = Local::now().date_naive();
        let mut controller = CalendarController::new(events, page, today);
        controller.set_category(category);

        for item in controller.event_list(today) {
            println!("{}\t{}", item.period, item.title);
        }
        return Ok(());
    }

    serve(args, page, events, client).await
}

async fn serve(
    args: Args,
    page: PageConfig,
    events: Arc<EventSet>,
    client: Client,
) -> Result<()> {
    let network = Arc::new(Upstream::new(client.clone()));

    let worker = match &args.origin {
        Some(origin) => {
            let worker = CacheWorker::new(
                WorkerConfig {
                    origin: origin.clone(),
                    base: args.base.clone(),
                    version: args.cache_version.clone(),
                    extra_assets: args.precache.clone(),
                },
                CacheStorage::new(args.cache_capacity),
                network.clone(),
            );

            match worker.install().await {
                Ok(()) => {
                    worker.activate().await?;
                    Some(Arc::new(worker))
                }
                Err(err) => {
                    warn!("Offline cache disabled: {err}");
                    None
                }
            }
        }
        None => None,
    };

    let state = Arc::new(AppState {
        events,
        page,
        origin: args.origin,
        worker,
        network,
        client,
        preview_timeout: args.preview_timeout,
    });

    let listener = TcpListener::bind(args.address).await?;
    info!("Listening at http://{}", args.address);

    axum::serve(listener, server::router(state))
        .with_graceful_shutdown(async {
            let _ = signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;

    Ok(())
}
