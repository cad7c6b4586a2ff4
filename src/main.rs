use std::{net::SocketAddr, sync::Arc};

use mongodb::Client;
use tracing_subscriber::EnvFilter;

use pricewatch::{
    AppState, config, routes,
    services::{
        aggregator::AggregatorClient,
        alert_monitor,
        alert_store::{AlertStore, MongoAlertStore},
        db_init,
        finnhub::FinnhubClient,
        notifications::{Dispatcher, EmailChannel, InAppChannel, SmsChannel, WebhookChannel},
        quote_cache::{CachePolicy, QuoteCache},
        trigger_engine::TriggerEngine,
        user_directory::MongoUserDirectory,
    },
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = config::load();

    // Mongo connection
    let client = Client::with_uri_str(&settings.mongodb_uri).await?;
    let db = client.database(&settings.mongodb_db);
    if let Err(e) = db_init::ensure_indexes(&db).await {
        tracing::warn!(error = %e, "could not ensure indexes");
    }

    let primary = Arc::new(AggregatorClient::new(
        settings.aggregator_base_url.clone(),
        settings.aggregator_api_key.clone(),
        settings.quote_currency.clone(),
    ));
    let secondary = Arc::new(FinnhubClient::new(settings.finnhub_api_key.clone()));
    let quotes = Arc::new(QuoteCache::new(
        primary,
        secondary,
        CachePolicy::from_settings(&settings),
    ));

    let (events_tx, _events_rx) = tokio::sync::broadcast::channel::<String>(256);

    let dispatcher = Dispatcher::new(settings.channel_timeout)
        .register(Arc::new(InAppChannel::new(events_tx.clone())))
        .register(Arc::new(WebhookChannel::new()))
        .register(Arc::new(EmailChannel::new(
            settings.email_api_url.clone(),
            settings.email_api_key.clone(),
            settings.email_from.clone(),
        )))
        .register(Arc::new(SmsChannel::new(
            settings.sms_api_url.clone(),
            settings.sms_api_key.clone(),
            settings.sms_from.clone(),
        )));

    tracing::info!(
        channels = ?dispatcher.registered().collect::<Vec<_>>(),
        "notification channels registered"
    );

    let store: Arc<dyn AlertStore> = Arc::new(MongoAlertStore::new(db.clone()));
    let engine = Arc::new(TriggerEngine::new(
        store.clone(),
        quotes.clone(),
        Arc::new(dispatcher),
        Arc::new(MongoUserDirectory::new(db)),
        settings.eq_tolerance,
    ));

    let _monitor =
        alert_monitor::spawn_price_alert_monitor(engine.clone(), settings.alert_eval_interval);

    let state = AppState {
        settings: settings.clone(),
        quotes,
        engine,
        store,
        events_tx,
    };

    let app = routes::app(state);

    let ip: std::net::IpAddr = settings.host.parse()?;
    let addr = SocketAddr::from((ip, settings.port));
    tracing::info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
