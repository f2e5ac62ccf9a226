use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;

use crate::cli::{RunArgs, ServeArgs, SourceArg, SummarizerArg, TrackedAddArgs, TrackedListArgs};
use crate::config::{self, Config, SourceSettings};
use crate::explorer::Explorer;
use crate::http::{self, Fetcher, Pacer};
use crate::metrics::CallCounter;
use crate::mirrors::MirrorSet;
use crate::render::{self, DocumentStyle};
use crate::server;
use crate::source::BoardSource;
use crate::source::fivechan::FiveChanSource;
use crate::source::fourchan::FourChanSource;
use crate::storage::MarkdownStore;
use crate::summarize::{ExcerptSummarizer, OpenAiSummarizer, Summarizer, ThreadSummarizer};
use crate::tracked::{self, TrackedThreads};

const LLM_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    FourChan,
    FiveChan,
}

impl SourceKind {
    fn selected(arg: SourceArg) -> Vec<Self> {
        match arg {
            SourceArg::FourChan => vec![Self::FourChan],
            SourceArg::FiveChan => vec![Self::FiveChan],
            SourceArg::All => vec![Self::FourChan, Self::FiveChan],
        }
    }

    fn settings(self, config: &Config) -> SourceSettings {
        match self {
            Self::FourChan => config.fourchan_settings(),
            Self::FiveChan => config.fivechan_settings(),
        }
    }

    fn display_name(self) -> &'static str {
        match self {
            Self::FourChan => "4chan",
            Self::FiveChan => "5ch",
        }
    }

    fn style(self) -> DocumentStyle<'static> {
        match self {
            Self::FourChan => DocumentStyle {
                heading: "4chan AI threads",
                link_text: "4chan link",
            },
            Self::FiveChan => DocumentStyle {
                heading: "5ch AI threads",
                link_text: "5ch link",
            },
        }
    }

    fn build(
        self,
        config: &Config,
        settings: &SourceSettings,
        counter: &Arc<CallCounter>,
    ) -> anyhow::Result<Arc<dyn BoardSource>> {
        let client = http::build_client(settings.timeout)?;
        let fetcher = Fetcher::new(
            client,
            Pacer::new(settings.request_delay),
            Arc::clone(counter),
            settings.category,
        );
        let source: Arc<dyn BoardSource> = match self {
            Self::FourChan => Arc::new(FourChanSource::new(
                fetcher,
                &config.fourchan.api_base,
                &config.fourchan.boards_base,
            )),
            Self::FiveChan => Arc::new(FiveChanSource::new(
                fetcher,
                &config.fivechan.menu_url,
                config.fivechan.board_labels.clone(),
                MirrorSet::new(config.fivechan.mirrors.clone()),
            )),
        };
        Ok(source)
    }
}

fn load_config(path: &std::path::Path, data_dir: Option<PathBuf>) -> anyhow::Result<Config> {
    let mut config = config::load_config(path)?;
    if let Some(data_dir) = data_dir {
        config.data_dir = data_dir;
    }
    Ok(config)
}

/// Store contents plus the entries the config declares.
async fn load_store(settings: &SourceSettings) -> TrackedThreads {
    let mut store = tracked::load(&settings.store_path).await;
    for seed in &settings.tracked {
        if store.seed(&seed.name, &seed.board) {
            tracing::info!(name = %seed.name, board = %seed.board, "tracking new thread from config");
        }
    }
    store
}

fn build_summarizer(arg: SummarizerArg) -> anyhow::Result<Arc<dyn Summarizer>> {
    let summarizer: Arc<dyn Summarizer> = match arg {
        SummarizerArg::Openai => {
            let client = http::build_client(LLM_TIMEOUT)?;
            Arc::new(OpenAiSummarizer::from_env(client).context("configure openai summarizer")?)
        }
        SummarizerArg::Excerpt => Arc::new(ExcerptSummarizer),
    };
    Ok(summarizer)
}

pub async fn run(args: RunArgs) -> anyhow::Result<()> {
    let config = load_config(&args.config, args.data_dir)?;
    let backend = build_summarizer(args.summarizer)?;
    let counter = Arc::new(CallCounter::new());
    let markdown = MarkdownStore::new(&config.data_dir);
    let date = chrono::Local::now().date_naive();

    for kind in SourceKind::selected(args.source) {
        let settings = kind.settings(&config);
        let source = kind.build(&config, &settings, &counter)?;
        let store = load_store(&settings).await;
        tracing::info!(category = settings.category, tracked = store.len(), "explorer starting");

        let mut explorer = Explorer::new(
            Arc::clone(&source),
            settings.discovery.clone(),
            settings.store_path.clone(),
        );
        let mut outcome = explorer.run(store).await;

        let summarizer = ThreadSummarizer::new(
            Arc::clone(&backend),
            Arc::clone(&counter),
            settings.category,
            kind.display_name(),
        );
        summarizer
            .summarize_all(&mut outcome.threads, |board| source.board_label(board))
            .await;

        if outcome.threads.is_empty() {
            tracing::info!(category = settings.category, "no threads to save");
            continue;
        }
        let content = render::render_markdown(kind.style(), date, &outcome.threads, |board| {
            source.board_label(board)
        });
        if let Err(err) = markdown.save(&content, settings.category, date).await {
            tracing::error!(category = settings.category, err = %format!("{err:#}"), "failed to save markdown");
        }
    }

    counter.report();
    Ok(())
}

pub async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = load_config(&args.config, args.data_dir)?;
    server::serve(args.addr, MarkdownStore::new(config.data_dir)).await
}

pub async fn tracked_list(args: TrackedListArgs) -> anyhow::Result<()> {
    let config = load_config(&args.config, args.data_dir)?;
    for kind in SourceKind::selected(args.source) {
        let settings = kind.settings(&config);
        let store = load_store(&settings).await;
        for record in store.iter() {
            println!(
                "{}\t{}\t/{}/\t{}\t{}\t{}",
                kind.display_name(),
                record.name,
                record.board,
                display(record.thread_id),
                display(record.last_post_no),
                record
                    .last_update
                    .map(|time| time.to_rfc3339())
                    .unwrap_or_else(|| "-".to_owned()),
            );
        }
    }
    Ok(())
}

pub async fn tracked_add(args: TrackedAddArgs) -> anyhow::Result<()> {
    let kind = match args.source {
        SourceArg::FourChan => SourceKind::FourChan,
        SourceArg::FiveChan => SourceKind::FiveChan,
        SourceArg::All => anyhow::bail!("--source must name a single source"),
    };
    if args.name.trim().is_empty() || args.board.trim().is_empty() {
        anyhow::bail!("--name and --board must not be empty");
    }

    let config = load_config(&args.config, args.data_dir)?;
    let settings = kind.settings(&config);
    let mut store = tracked::load(&settings.store_path).await;
    if !store.seed(args.name.trim(), args.board.trim()) {
        println!("already tracked: {}", args.name.trim());
        return Ok(());
    }
    tracked::save(&store, &settings.store_path)
        .await
        .context("save tracked threads")?;
    println!("tracking: {} (/{}/)", args.name.trim(), args.board.trim());
    Ok(())
}

fn display(value: Option<u64>) -> String {
    value.map(|value| value.to_string()).unwrap_or_else(|| "-".to_owned())
}
