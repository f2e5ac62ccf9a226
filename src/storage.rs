//! Dated Markdown documents under `<data_dir>/<category>/<YYYY-MM-DD>.md`.

use std::path::PathBuf;

use anyhow::Context as _;
use chrono::NaiveDate;
use tokio::fs;

#[derive(Debug, Clone)]
pub struct MarkdownStore {
    root: PathBuf,
}

impl MarkdownStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn document_path(&self, category: &str, date: NaiveDate) -> PathBuf {
        self.root
            .join(category)
            .join(format!("{}.md", date.format("%Y-%m-%d")))
    }

    /// Writes (or overwrites) the document for `date`.
    pub async fn save(&self, content: &str, category: &str, date: NaiveDate) -> anyhow::Result<PathBuf> {
        let path = self.document_path(category, date);
        let dir = self.root.join(category);
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("create dir: {}", dir.display()))?;

        let tmp_path = path.with_extension(format!("md.tmp.{}", uuid::Uuid::new_v4().simple()));
        fs::write(&tmp_path, content)
            .await
            .with_context(|| format!("write: {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &path)
            .await
            .with_context(|| format!("rename {} -> {}", tmp_path.display(), path.display()))?;

        tracing::info!(path = %path.display(), bytes = content.len(), "markdown saved");
        Ok(path)
    }

    /// `None` when no document exists for `date`.
    pub async fn load(&self, category: &str, date: NaiveDate) -> anyhow::Result<Option<String>> {
        let path = self.document_path(category, date);
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("read: {}", path.display())),
        }
    }

    /// Dates with a document for `category`, ascending.
    pub async fn list_dates(&self, category: &str) -> anyhow::Result<Vec<NaiveDate>> {
        let dir = self.root.join(category);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err).with_context(|| format!("read dir: {}", dir.display())),
        };

        let mut dates = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .with_context(|| format!("read dir entry: {}", dir.display()))?
        {
            let name = entry.file_name();
            let Some(stem) = name.to_str().and_then(|name| name.strip_suffix(".md")) else {
                continue;
            };
            if let Ok(date) = NaiveDate::parse_from_str(stem, "%Y-%m-%d") {
                dates.push(date);
            }
        }
        dates.sort();
        Ok(dates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_load_and_list() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let store = MarkdownStore::new(temp.path());
        let day1 = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let day2 = NaiveDate::from_ymd_opt(2025, 3, 2).unwrap();

        assert_eq!(store.load("fourchan_explorer", day1).await?, None);
        assert!(store.list_dates("fourchan_explorer").await?.is_empty());

        store.save("# later", "fourchan_explorer", day2).await?;
        let path = store.save("# first", "fourchan_explorer", day1).await?;
        std::fs::write(temp.path().join("fourchan_explorer/notes.txt"), "x")?;

        assert_eq!(path, temp.path().join("fourchan_explorer/2025-03-01.md"));
        assert_eq!(store.load("fourchan_explorer", day1).await?.as_deref(), Some("# first"));
        assert_eq!(store.list_dates("fourchan_explorer").await?, vec![day1, day2]);
        Ok(())
    }
}
