use rusqlite::{OptionalExtension, Row};
use wiki_types::Article;

use crate::{Database, Error, Result, Tx};

const ARTICLE_COLUMNS: &str = "article_id, title, body, created, updated";

impl Database {
    pub fn articles(&self) -> Result<Vec<Article>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ARTICLE_COLUMNS} FROM articles ORDER BY article_id"
            ))?;
            let rows = stmt
                .query_map([], article_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn article(&self, id: i64) -> Result<Article> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE article_id = ?1"),
                [id],
                article_from_row,
            )
            .optional()?
            .ok_or(Error::NotFound)
        })
    }

    pub fn article_count(&self) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))?)
        })
    }
}

/// Insert a new article and return the id the store assigned.
pub fn insert_article(tx: &Tx<'_>, title: &str, body: &str) -> Result<i64> {
    tx.execute(
        "INSERT INTO articles (title, body) VALUES (?1, ?2)",
        (title, body),
    )?;
    tx.last_insert_rowid()
}

/// Full-row update by id. Returns the number of rows touched (0 if the id is unknown).
pub fn update_article(tx: &Tx<'_>, article: &Article) -> Result<usize> {
    tx.execute(
        "UPDATE articles SET title = ?1, body = ?2, updated = datetime('now') WHERE article_id = ?3",
        (&article.title, &article.body, article.id),
    )
}

/// Physical delete by id. Deleting an unknown id affects zero rows and is not an error.
pub fn delete_article(tx: &Tx<'_>, id: i64) -> Result<usize> {
    tx.execute("DELETE FROM articles WHERE article_id = ?1", [id])
}

fn article_from_row(row: &Row<'_>) -> rusqlite::Result<Article> {
    Ok(Article {
        id: row.get(0)?,
        title: row.get(1)?,
        body: row.get(2)?,
        created: row.get(3)?,
        updated: row.get(4)?,
    })
}
