use crate::model::{CatalogEntry, LocatedThread};
use crate::source::BoardSource;

/// Current live identity of the thread tracked as `name` on `board`.
///
/// Live titles carry part and count suffixes ("★6", "(728)"), so matching is
/// case-insensitive containment of `name` in the title. The first match in
/// listing order wins. A failed listing is reported as not found.
pub async fn locate(source: &dyn BoardSource, board: &str, name: &str) -> Option<LocatedThread> {
    let catalog = match source.catalog(board).await {
        Ok(catalog) => catalog,
        Err(err) => {
            tracing::warn!(board, name, err = %format!("{err:#}"), "catalog unavailable; thread not located");
            return None;
        }
    };

    let located = find_in_catalog(&catalog, name);
    match &located {
        Some(thread) => tracing::info!(board, name, thread_id = thread.thread_id, title = %thread.title, "located tracked thread"),
        None => tracing::info!(board, name, candidates = catalog.len(), "tracked thread not in catalog"),
    }
    located
}

pub fn find_in_catalog(catalog: &[CatalogEntry], name: &str) -> Option<LocatedThread> {
    let needle = name.to_lowercase();
    catalog
        .iter()
        .find(|entry| entry.title.to_lowercase().contains(&needle))
        .map(LocatedThread::from)
}
