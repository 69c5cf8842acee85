mod app;

use anyhow::Context;
use app::ReviewApp;
use lingua_review::config::Config;
use lingua_review::database::SqliteStore;
use lingua_review::models::deck::item_id;
use lingua_review::ReviewItem;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SAMPLE_DECK: &str = "Spanish Basics";
const SAMPLE_ITEMS: &[(&str, &str)] = &[
    ("hola", "hello"),
    ("gracias", "thank you"),
    ("por favor", "please"),
    ("¿Dónde está la estación?", "where is the station"),
    ("buenos días", "good morning"),
];

fn main() -> anyhow::Result<()> {
    let config = Config::load();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.filter.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Lingua Review v{}", env!("CARGO_PKG_VERSION"));

    let db_path = config.db_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating data directory {}", parent.display()))?;
    }
    let store = SqliteStore::open(&db_path).context("failed to initialize database")?;

    if store.deck_names()?.is_empty() {
        store.create_deck(SAMPLE_DECK, "es-ES")?;
        for (front, back) in SAMPLE_ITEMS {
            let id = item_id(front).with_context(|| format!("sample item '{front}' has no id"))?;
            store.add_item(SAMPLE_DECK, &ReviewItem::new(id, *front, *back))?;
        }
        tracing::info!(deck = SAMPLE_DECK, "sample data created");
    }

    let deck_set = store.load_all_decks().context("failed to load decks from database")?;
    tracing::info!(decks = deck_set.decks.len(), "decks loaded");
    for deck in &deck_set.decks {
        tracing::debug!(deck = %deck.name, items = deck.items.len(), "deck");
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([520.0, 720.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Lingua Review",
        options,
        Box::new(|_cc| Ok(Box::new(ReviewApp::new(deck_set, store, config)))),
    )
    .map_err(|e| anyhow::anyhow!("UI error: {e}"))
}
