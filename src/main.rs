//! Wiring & DI. Entry point: bootstrap adapters, inject into services, run UI.
//! No business logic here.

use dotenv::dotenv;
use newsletter_cycle::adapters::clock::SystemClock;
use newsletter_cycle::adapters::compiler::MarkdownCompiler;
use newsletter_cycle::adapters::imaging::JpegImageEncoder;
use newsletter_cycle::adapters::membership::RosterMembership;
use newsletter_cycle::adapters::persistence::{json_store::JsonStore, sqlite_store::SqliteStore};
use newsletter_cycle::adapters::rest::{ApiClient, RestCompiler, RestMembership};
use newsletter_cycle::adapters::ui::tui::TuiInputPort;
use newsletter_cycle::ports::{
    Clock, CycleStore, ImageEncoder, InputPort, MembershipProvider, NewsletterCompiler,
};
use newsletter_cycle::shared::config::{AppConfig, StoreKind};
use newsletter_cycle::usecases::{
    AnswerCodec, GroupLocks, QuestionnaireService, ReleaseCycleEngine, SchemaService,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let env_loaded = dotenv();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &env_loaded {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(_) => info!(cwd = %cwd.display(), "no .env found (check CWD)"),
    }

    newsletter_cycle::adapters::ui::init_ui();

    let cfg = match AppConfig::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(error = %e, "config could not be loaded, using defaults");
            AppConfig::default()
        }
    };

    let data_path = cfg.data_dir_or_default();
    let data_dir_abs = data_path
        .canonicalize()
        .unwrap_or_else(|_| data_path.clone());
    info!(path = %data_dir_abs.display(), "data directory");

    // --- Store ---
    let store: Arc<dyn CycleStore> = match cfg.store_or_default() {
        StoreKind::Sqlite => Arc::new(
            SqliteStore::connect(&data_path)
                .await
                .map_err(|e| anyhow::anyhow!("SQLite connect failed: {}", e))?,
        ),
        StoreKind::Json => {
            let store = JsonStore::new(data_path.join("newsletter.json"));
            store.load().await.map_err(|e| anyhow::anyhow!("{}", e))?;
            info!("using JSON store");
            Arc::new(store)
        }
    };

    // --- Collaborators: REST API when configured, local roster + Markdown otherwise ---
    let roster = cfg.roster_or_default();
    let (members, compiler): (Arc<dyn MembershipProvider>, Arc<dyn NewsletterCompiler>) =
        match cfg.api_url() {
            Some(url) => {
                info!(url = %url, "membership and compilation via REST API");
                let api = ApiClient::new(url, cfg.api_token());
                (
                    Arc::new(RestMembership::new(api.clone())),
                    Arc::new(RestCompiler::new(api)),
                )
            }
            None => {
                let newsletter_dir = cfg.newsletter_dir_or_default();
                info!(
                    groups = roster.len(),
                    newsletter_dir = %newsletter_dir.display(),
                    "membership from roster, newsletters as Markdown"
                );
                if roster.is_empty() {
                    warn!("roster is empty; set NEWSLETTER_CONFIG to a file with a [roster] table");
                }
                (
                    Arc::new(RosterMembership::new(roster.clone())),
                    Arc::new(MarkdownCompiler::new(newsletter_dir)),
                )
            }
        };
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let images: Arc<dyn ImageEncoder> = Arc::new(JpegImageEncoder::new());

    // --- Services ---
    let min_interval_days = cfg.min_interval_days_or_default();
    info!(min_interval_days, "minimum interval between releases");
    let locks = Arc::new(GroupLocks::new());
    let engine = Arc::new(ReleaseCycleEngine::new(
        Arc::clone(&store),
        members,
        compiler,
        clock,
        Arc::clone(&locks),
        min_interval_days,
    ));
    let schemas = Arc::new(SchemaService::new(Arc::clone(&store), locks));
    let questionnaire = Arc::new(QuestionnaireService::new(
        Arc::clone(&engine),
        Arc::clone(&store),
        AnswerCodec::new(images),
    ));

    let mut groups: Vec<String> = roster.into_keys().collect();
    groups.sort();
    let input_port: Arc<dyn InputPort> =
        Arc::new(TuiInputPort::new(groups, schemas, engine, questionnaire));

    input_port
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    Ok(())
}
