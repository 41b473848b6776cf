//! SQLite storage backend for treescape

use super::traits::{
    AggregateId, AttributeStore, AttributeTx, OpenStore, StorageError, StorageResult, TaxonStore,
};
use crate::attributes::{AttributeAggregate, CategoryAssociation, StoredRange};
use crate::catalog::{PropertyCatalog, RangeProperty, SubField};
use crate::category::{default_categories, CategoryRegistry, CategoryValue, Slug, Taxonomy};
use crate::provenance::{NewSource, Source};
use crate::taxon::{Taxon, TaxonId};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// SQLite-backed attribute, registry and taxon store
///
/// Uses a single SQLite database file. Range properties are stored as
/// `<property>_<part>` TEXT columns on `attribute_aggregates`; categorical
/// properties share one association table keyed by (aggregate, taxonomy, slug).
/// Thread-safe via internal mutex on the connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Initialize the database schema
    ///
    /// 1. Create base tables (without range columns) - safe for existing DBs
    /// 2. Add range-property columns missing from the aggregate table
    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.execute_batch(
            r#"
            -- Taxa known to the engine (provided by the taxonomic subsystem)
            CREATE TABLE IF NOT EXISTS taxa (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                rank TEXT NOT NULL,
                reference_text TEXT
            );

            -- Category registry: closed sets of allowed values
            CREATE TABLE IF NOT EXISTS category_values (
                taxonomy TEXT NOT NULL,
                slug TEXT NOT NULL,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                PRIMARY KEY (taxonomy, slug),
                UNIQUE (taxonomy, name)
            );

            -- Citations, unique by URL
            CREATE TABLE IF NOT EXISTS sources (
                id INTEGER PRIMARY KEY,
                url TEXT NOT NULL UNIQUE,
                source_type TEXT NOT NULL,
                name TEXT NOT NULL,
                date TEXT NOT NULL
            );

            -- One aggregate per taxon (range columns added via migration)
            CREATE TABLE IF NOT EXISTS attribute_aggregates (
                id INTEGER PRIMARY KEY,
                taxon_id TEXT NOT NULL UNIQUE,
                updated_at TEXT NOT NULL
            );

            -- Categorical associations, one per (aggregate, value)
            CREATE TABLE IF NOT EXISTS category_associations (
                aggregate_id INTEGER NOT NULL,
                taxonomy TEXT NOT NULL,
                slug TEXT NOT NULL,
                confidence TEXT NOT NULL,
                PRIMARY KEY (aggregate_id, taxonomy, slug),
                FOREIGN KEY (aggregate_id) REFERENCES attribute_aggregates(id) ON DELETE CASCADE,
                FOREIGN KEY (taxonomy, slug) REFERENCES category_values(taxonomy, slug)
                    ON DELETE RESTRICT ON UPDATE RESTRICT
            );

            CREATE TABLE IF NOT EXISTS association_sources (
                aggregate_id INTEGER NOT NULL,
                taxonomy TEXT NOT NULL,
                slug TEXT NOT NULL,
                source_id INTEGER NOT NULL,
                PRIMARY KEY (aggregate_id, taxonomy, slug, source_id),
                FOREIGN KEY (aggregate_id, taxonomy, slug)
                    REFERENCES category_associations(aggregate_id, taxonomy, slug) ON DELETE CASCADE,
                FOREIGN KEY (source_id) REFERENCES sources(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_associations_value
                ON category_associations(taxonomy, slug);

            -- Enable foreign keys
            PRAGMA foreign_keys = ON;

            -- Enable WAL mode for concurrent reads during writes
            PRAGMA journal_mode = WAL;
            "#,
        )?;

        Self::migrate_add_range_columns(conn)?;

        Ok(())
    }

    /// Migration: add columns for range properties the database lacks
    ///
    /// SQLite doesn't support ALTER TABLE ADD COLUMN IF NOT EXISTS,
    /// so we check existing columns first using the table_info pragma.
    fn migrate_add_range_columns(conn: &Connection) -> StorageResult<()> {
        let existing = Self::table_columns(conn, "attribute_aggregates")?;

        for property in RangeProperty::ALL {
            for field in SubField::ALL {
                let column = property.column(field);
                if !existing.contains(&column) {
                    conn.execute(
                        &format!("ALTER TABLE attribute_aggregates ADD COLUMN {} TEXT", column),
                        [],
                    )?;
                }
            }

            let source_column = property.source_column();
            if !existing.contains(&source_column) {
                conn.execute(
                    &format!(
                        "ALTER TABLE attribute_aggregates ADD COLUMN {} INTEGER REFERENCES sources(id) ON DELETE SET NULL",
                        source_column
                    ),
                    [],
                )?;
            }
        }

        Ok(())
    }

    fn table_columns(conn: &Connection, table: &str) -> StorageResult<HashSet<String>> {
        let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1)")?;
        let columns = stmt
            .query_map(params![table], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(columns)
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    fn from_connection(conn: Connection) -> StorageResult<Self> {
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    // === Registry administration ===

    /// Install the default taxonomy contents. Existing slugs are left
    /// untouched. Returns the number of values inserted.
    pub fn seed_default_categories(&self) -> StorageResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut inserted = 0;
        for value in default_categories() {
            inserted += tx.execute(
                r#"
                INSERT OR IGNORE INTO category_values (taxonomy, slug, name, description)
                VALUES (?1, ?2, ?3, ?4)
                "#,
                params![value.taxonomy.as_str(), value.slug.as_str(), value.name, value.description],
            )?;
        }
        tx.commit()?;
        Ok(inserted)
    }

    /// Add a value to a taxonomy, deriving its slug from the name.
    /// Fails if the slug or name already exists, or if the name has no
    /// letter or digit to build a slug from.
    pub fn add_value(&self, taxonomy: Taxonomy, name: &str, description: &str) -> StorageResult<CategoryValue> {
        let value = CategoryValue::new(taxonomy, name, description);
        if value.slug.as_str().is_empty() {
            return Err(StorageError::InvalidCategoryName { name: name.to_string() });
        }
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO category_values (taxonomy, slug, name, description) VALUES (?1, ?2, ?3, ?4)",
            params![value.taxonomy.as_str(), value.slug.as_str(), value.name, value.description],
        )?;
        Ok(value)
    }

    /// Change a value's display name. Slugs never change.
    pub fn rename_value(&self, taxonomy: Taxonomy, slug: &str, name: &str) -> StorageResult<()> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE category_values SET name = ?1 WHERE taxonomy = ?2 AND slug = ?3",
            params![name, taxonomy.as_str(), slug],
        )?;
        if updated == 0 {
            return Err(StorageError::CategoryNotFound {
                taxonomy,
                slug: slug.to_string(),
            });
        }
        Ok(())
    }

    /// Remove a value that no association references.
    pub fn remove_value(&self, taxonomy: Taxonomy, slug: &str) -> StorageResult<()> {
        let conn = self.lock()?;
        let references: i64 = conn.query_row(
            "SELECT COUNT(*) FROM category_associations WHERE taxonomy = ?1 AND slug = ?2",
            params![taxonomy.as_str(), slug],
            |row| row.get(0),
        )?;
        if references > 0 {
            return Err(StorageError::CategoryInUse {
                taxonomy,
                slug: slug.to_string(),
            });
        }

        let deleted = conn.execute(
            "DELETE FROM category_values WHERE taxonomy = ?1 AND slug = ?2",
            params![taxonomy.as_str(), slug],
        )?;
        if deleted == 0 {
            return Err(StorageError::CategoryNotFound {
                taxonomy,
                slug: slug.to_string(),
            });
        }
        Ok(())
    }

    // === Row helpers ===

    fn row_to_category(taxonomy: String, slug: String, name: String, description: String) -> StorageResult<CategoryValue> {
        Ok(CategoryValue {
            taxonomy: parse_taxonomy(&taxonomy)?,
            slug: Slug::new(slug),
            name,
            description,
        })
    }

    fn row_to_taxon(id: String, name: String, rank: String, reference_text: Option<String>) -> StorageResult<Taxon> {
        Ok(Taxon {
            id: id
                .parse()
                .map_err(|e: uuid::Error| StorageError::Internal(format!("bad taxon id {}: {}", id, e)))?,
            name,
            rank: rank.parse().map_err(StorageError::Internal)?,
            reference_text,
        })
    }

    fn row_to_source(id: i64, source_type: String, name: String, date: String, url: String) -> StorageResult<Source> {
        Ok(Source {
            id,
            source_type,
            name,
            date: NaiveDate::parse_from_str(&date, DATE_FORMAT)
                .map_err(|e| StorageError::DateParse(e.to_string()))?,
            url,
        })
    }
}

fn parse_taxonomy(raw: &str) -> StorageResult<Taxonomy> {
    Taxonomy::from_str(raw).map_err(|_| StorageError::UnknownTaxonomy(raw.to_string()))
}

fn parse_decimal(raw: Option<String>) -> StorageResult<Option<Decimal>> {
    raw.map(|text| Decimal::from_str(&text).map_err(|e| StorageError::DecimalParse(format!("{}: {}", text, e))))
        .transpose()
}

impl OpenStore for SqliteStore {
    fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        Self::from_connection(Connection::open(path)?)
    }

    fn open_in_memory() -> StorageResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }
}

impl CategoryRegistry for SqliteStore {
    fn list(&self, taxonomy: Taxonomy) -> StorageResult<Vec<CategoryValue>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT taxonomy, slug, name, description FROM category_values WHERE taxonomy = ?1 ORDER BY name",
        )?;
        let rows = stmt
            .query_map(params![taxonomy.as_str()], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })?
            .collect::<Result<Vec<(String, String, String, String)>, _>>()?;

        rows.into_iter()
            .map(|(t, s, n, d)| Self::row_to_category(t, s, n, d))
            .collect()
    }

    fn resolve(&self, taxonomy: Taxonomy, slug: &str) -> StorageResult<Option<CategoryValue>> {
        let conn = self.lock()?;
        SqliteTx { conn: &*conn }.resolve_category(taxonomy, slug)
    }
}

/// Write scope over one open SQLite transaction.
struct SqliteTx<'a> {
    conn: &'a Connection,
}

impl AttributeTx for SqliteTx<'_> {
    fn get_or_create_aggregate(&self, taxon: &TaxonId) -> StorageResult<AggregateId> {
        self.conn.execute(
            r#"
            INSERT INTO attribute_aggregates (taxon_id, updated_at)
            VALUES (?1, ?2)
            ON CONFLICT(taxon_id) DO UPDATE SET updated_at = excluded.updated_at
            "#,
            params![taxon.to_string(), Utc::now().to_rfc3339()],
        )?;
        let id = self.conn.query_row(
            "SELECT id FROM attribute_aggregates WHERE taxon_id = ?1",
            params![taxon.to_string()],
            |row| row.get(0),
        )?;
        Ok(AggregateId(id))
    }

    fn set_range_value(
        &self,
        aggregate: AggregateId,
        property: RangeProperty,
        field: SubField,
        value: Decimal,
    ) -> StorageResult<()> {
        self.conn.execute(
            &format!(
                "UPDATE attribute_aggregates SET {} = ?1 WHERE id = ?2",
                property.column(field)
            ),
            params![value.to_string(), aggregate.0],
        )?;
        Ok(())
    }

    fn link_range_source(
        &self,
        aggregate: AggregateId,
        property: RangeProperty,
        source: &Source,
    ) -> StorageResult<()> {
        self.conn.execute(
            &format!(
                "UPDATE attribute_aggregates SET {} = ?1 WHERE id = ?2",
                property.source_column()
            ),
            params![source.id, aggregate.0],
        )?;
        Ok(())
    }

    fn resolve_category(&self, taxonomy: Taxonomy, slug: &str) -> StorageResult<Option<CategoryValue>> {
        let row = self
            .conn
            .query_row(
                "SELECT taxonomy, slug, name, description FROM category_values WHERE taxonomy = ?1 AND slug = ?2",
                params![taxonomy.as_str(), slug],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;

        match row {
            Some((t, s, n, d)) => Ok(Some(SqliteStore::row_to_category(t, s, n, d)?)),
            None => Ok(None),
        }
    }

    fn upsert_association(
        &self,
        aggregate: AggregateId,
        value: &CategoryValue,
        confidence: Decimal,
        sources: &[Source],
    ) -> StorageResult<()> {
        let taxonomy = value.taxonomy.as_str();
        let slug = value.slug.as_str();

        self.conn.execute(
            r#"
            INSERT INTO category_associations (aggregate_id, taxonomy, slug, confidence)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(aggregate_id, taxonomy, slug) DO UPDATE SET
                confidence = excluded.confidence
            "#,
            params![aggregate.0, taxonomy, slug, confidence.to_string()],
        )?;

        self.conn.execute(
            "DELETE FROM association_sources WHERE aggregate_id = ?1 AND taxonomy = ?2 AND slug = ?3",
            params![aggregate.0, taxonomy, slug],
        )?;
        for source in sources {
            self.conn.execute(
                r#"
                INSERT OR IGNORE INTO association_sources (aggregate_id, taxonomy, slug, source_id)
                VALUES (?1, ?2, ?3, ?4)
                "#,
                params![aggregate.0, taxonomy, slug, source.id],
            )?;
        }

        Ok(())
    }

    fn get_or_create_source(&self, source: &NewSource) -> StorageResult<Source> {
        self.conn.execute(
            r#"
            INSERT INTO sources (url, source_type, name, date)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(url) DO NOTHING
            "#,
            params![
                source.url,
                source.source_type,
                source.name,
                source.date.format(DATE_FORMAT).to_string()
            ],
        )?;

        let (id, source_type, name, date, url) = self.conn.query_row(
            "SELECT id, source_type, name, date, url FROM sources WHERE url = ?1",
            params![source.url],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
        )?;
        SqliteStore::row_to_source(id, source_type, name, date, url)
    }

    fn aggregate_is_empty(&self, aggregate: AggregateId) -> StorageResult<bool> {
        let value_columns: Vec<String> = RangeProperty::ALL
            .iter()
            .flat_map(|p| SubField::VALUES.iter().map(move |f| p.column(*f)))
            .map(|column| format!("{} IS NOT NULL", column))
            .collect();

        let with_values: i64 = self.conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM attribute_aggregates WHERE id = ?1 AND ({})",
                value_columns.join(" OR ")
            ),
            params![aggregate.0],
            |row| row.get(0),
        )?;
        if with_values > 0 {
            return Ok(false);
        }

        let associations: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM category_associations WHERE aggregate_id = ?1",
            params![aggregate.0],
            |row| row.get(0),
        )?;
        Ok(associations == 0)
    }

    fn delete_aggregate(&self, aggregate: AggregateId) -> StorageResult<()> {
        self.conn.execute(
            "DELETE FROM attribute_aggregates WHERE id = ?1",
            params![aggregate.0],
        )?;
        Ok(())
    }
}

impl AttributeStore for SqliteStore {
    fn catalog(&self) -> StorageResult<PropertyCatalog> {
        let conn = self.lock()?;
        let columns = Self::table_columns(&conn, "attribute_aggregates")?;

        let ranges = RangeProperty::ALL
            .into_iter()
            .filter(|p| {
                SubField::ALL.iter().all(|f| columns.contains(&p.column(*f)))
                    && columns.contains(&p.source_column())
            })
            .collect();

        let categories = if Self::table_columns(&conn, "category_associations")?.is_empty() {
            Vec::new()
        } else {
            Taxonomy::ALL.to_vec()
        };

        Ok(PropertyCatalog::new(ranges, categories))
    }

    fn atomically(&self, work: &mut dyn FnMut(&dyn AttributeTx) -> StorageResult<()>) -> StorageResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        work(&SqliteTx { conn: &*tx })?;
        tx.commit()?;
        Ok(())
    }

    fn load_aggregate(&self, taxon: &TaxonId) -> StorageResult<Option<AttributeAggregate>> {
        let conn = self.lock()?;

        // id, then per property: 4 parts + source url
        let mut select = vec!["a.id".to_string()];
        let mut joins = Vec::new();
        for (i, property) in RangeProperty::ALL.iter().enumerate() {
            for field in SubField::ALL {
                select.push(format!("a.{}", property.column(field)));
            }
            select.push(format!("s{}.url", i));
            joins.push(format!(
                "LEFT JOIN sources s{i} ON s{i}.id = a.{col}",
                i = i,
                col = property.source_column()
            ));
        }
        let sql = format!(
            "SELECT {} FROM attribute_aggregates a {} WHERE a.taxon_id = ?1",
            select.join(", "),
            joins.join(" ")
        );

        let per_property = SubField::ALL.len() + 1;
        let row = conn
            .query_row(&sql, params![taxon.to_string()], |row| {
                let id: i64 = row.get(0)?;
                let mut cells = Vec::with_capacity(RangeProperty::ALL.len() * per_property);
                for index in 1..=RangeProperty::ALL.len() * per_property {
                    cells.push(row.get::<_, Option<String>>(index)?);
                }
                Ok((id, cells))
            })
            .optional()?;

        let Some((aggregate_id, cells)) = row else {
            return Ok(None);
        };

        let mut ranges = BTreeMap::new();
        for (property, chunk) in RangeProperty::ALL.iter().zip(cells.chunks(per_property)) {
            let mut range = StoredRange::default();
            for (field, cell) in SubField::ALL.iter().zip(chunk) {
                range.set(*field, parse_decimal(cell.clone())?);
            }
            range.source = chunk[SubField::ALL.len()].clone();
            if range != StoredRange::default() {
                ranges.insert(*property, range);
            }
        }

        let mut stmt = conn.prepare(
            r#"
            SELECT taxonomy, slug, confidence FROM category_associations
            WHERE aggregate_id = ?1
            ORDER BY taxonomy, slug
            "#,
        )?;
        let rows = stmt
            .query_map(params![aggregate_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut sources_stmt = conn.prepare(
            r#"
            SELECT s.url FROM association_sources a
            JOIN sources s ON s.id = a.source_id
            WHERE a.aggregate_id = ?1 AND a.taxonomy = ?2 AND a.slug = ?3
            ORDER BY s.url
            "#,
        )?;

        let mut associations = Vec::with_capacity(rows.len());
        for (taxonomy, slug, confidence) in rows {
            let sources = sources_stmt
                .query_map(params![aggregate_id, taxonomy, slug], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            associations.push(CategoryAssociation {
                taxonomy: parse_taxonomy(&taxonomy)?,
                slug: Slug::new(slug),
                confidence: parse_decimal(Some(confidence))?.unwrap_or_default(),
                sources,
            });
        }

        Ok(Some(AttributeAggregate {
            taxon_id: *taxon,
            ranges,
            associations,
        }))
    }
}

impl TaxonStore for SqliteStore {
    fn add_taxon(&self, taxon: &Taxon) -> StorageResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO taxa (id, name, rank, reference_text) VALUES (?1, ?2, ?3, ?4)",
            params![
                taxon.id.to_string(),
                taxon.name,
                taxon.rank.as_str(),
                taxon.reference_text
            ],
        )?;
        Ok(())
    }

    fn get_taxon(&self, id: &TaxonId) -> StorageResult<Option<Taxon>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT id, name, rank, reference_text FROM taxa WHERE id = ?1",
                params![id.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;
        row.map(|(i, n, r, t)| Self::row_to_taxon(i, n, r, t)).transpose()
    }

    fn find_taxon_by_name(&self, name: &str) -> StorageResult<Option<Taxon>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT id, name, rank, reference_text FROM taxa WHERE name = ?1",
                params![name],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;
        row.map(|(i, n, r, t)| Self::row_to_taxon(i, n, r, t)).transpose()
    }

    fn list_unenriched(&self) -> StorageResult<Vec<Taxon>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT t.id, t.name, t.rank, t.reference_text FROM taxa t
            LEFT JOIN attribute_aggregates a ON a.taxon_id = t.id
            WHERE a.id IS NULL
            ORDER BY t.name
            "#,
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)))?
            .collect::<Result<Vec<(String, String, String, Option<String>)>, _>>()?;

        rows.into_iter()
            .map(|(i, n, r, t)| Self::row_to_taxon(i, n, r, t))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store.seed_default_categories().unwrap();
        store
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn new_source(url: &str) -> NewSource {
        NewSource::from_citation("Perplexity", url, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
    }

    #[test]
    fn test_seed_is_idempotent() {
        let store = SqliteStore::open_in_memory().unwrap();
        let first = store.seed_default_categories().unwrap();
        let second = store.seed_default_categories().unwrap();
        assert_eq!(first, default_categories().len());
        assert_eq!(second, 0);
    }

    #[test]
    fn test_registry_list_and_resolve() {
        let store = create_test_store();
        let habits = store.list(Taxonomy::GrowthHabit).unwrap();
        assert_eq!(habits.len(), 7);
        assert_eq!(habits[0].name, "Fern"); // ordered by name

        let tree = store.resolve(Taxonomy::GrowthHabit, "tree").unwrap().unwrap();
        assert_eq!(tree.name, "Tree");
        assert!(store.resolve(Taxonomy::GrowthHabit, "epiphyte").unwrap().is_none());
        // slugs are scoped per taxonomy
        assert!(store.resolve(Taxonomy::SoilTexture, "tree").unwrap().is_none());
    }

    #[test]
    fn test_added_value_visible_in_next_snapshot() {
        let store = create_test_store();
        assert!(!store.snapshot().unwrap().contains(Taxonomy::GrowthHabit, "epiphyte"));

        let added = store
            .add_value(Taxonomy::GrowthHabit, "Epiphyte", "Grows on another plant.")
            .unwrap();
        assert_eq!(added.slug.as_str(), "epiphyte");

        assert!(store.snapshot().unwrap().contains(Taxonomy::GrowthHabit, "epiphyte"));
    }

    #[test]
    fn test_add_value_folds_accents_and_rejects_empty_slug() {
        let store = create_test_store();

        let added = store.add_value(Taxonomy::GrowthHabit, "Épiphyte", "").unwrap();
        assert_eq!(added.slug.as_str(), "epiphyte");
        assert_eq!(added.name, "Épiphyte");

        let err = store.add_value(Taxonomy::GrowthHabit, "???", "").unwrap_err();
        assert!(matches!(err, StorageError::InvalidCategoryName { .. }));
        assert!(!store.snapshot().unwrap().contains(Taxonomy::GrowthHabit, ""));
    }

    #[test]
    fn test_rename_keeps_slug() {
        let store = create_test_store();
        store.rename_value(Taxonomy::GrowthHabit, "tree", "Tall tree").unwrap();
        let value = store.resolve(Taxonomy::GrowthHabit, "tree").unwrap().unwrap();
        assert_eq!(value.name, "Tall tree");

        let err = store
            .rename_value(Taxonomy::GrowthHabit, "nope", "x")
            .unwrap_err();
        assert!(matches!(err, StorageError::CategoryNotFound { .. }));
    }

    #[test]
    fn test_catalog_reflects_declared_columns() {
        let store = create_test_store();
        let catalog = store.catalog().unwrap();
        assert_eq!(catalog.ranges(), RangeProperty::ALL.as_slice());
        assert_eq!(catalog.categories(), Taxonomy::ALL.as_slice());
    }

    #[test]
    fn test_migration_adds_missing_range_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.db");

        // A database created before any range columns existed
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE attribute_aggregates (id INTEGER PRIMARY KEY, taxon_id TEXT NOT NULL UNIQUE, updated_at TEXT NOT NULL, height_minimum TEXT);",
            )
            .unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        let catalog = store.catalog().unwrap();
        assert!(catalog.ranges().contains(&RangeProperty::Lifetime));
        assert!(catalog.ranges().contains(&RangeProperty::Height));
    }

    #[test]
    fn test_range_values_persist_as_exact_decimals() {
        let store = create_test_store();
        let taxon = TaxonId::new();

        store
            .atomically(&mut |tx| {
                let aggregate = tx.get_or_create_aggregate(&taxon)?;
                tx.set_range_value(aggregate, RangeProperty::Height, SubField::Minimum, dec("25"))?;
                tx.set_range_value(aggregate, RangeProperty::Height, SubField::Typical, dec("32.5"))?;
                tx.set_range_value(aggregate, RangeProperty::Height, SubField::Confidence, dec("0.1"))?;
                let source = tx.get_or_create_source(&new_source("https://example.org/oak"))?;
                tx.link_range_source(aggregate, RangeProperty::Height, &source)
            })
            .unwrap();

        let aggregate = store.load_aggregate(&taxon).unwrap().unwrap();
        let height = aggregate.range(RangeProperty::Height).unwrap();
        assert_eq!(height.minimum, Some(dec("25")));
        assert_eq!(height.typical, Some(dec("32.5")));
        assert_eq!(height.maximum, None);
        assert_eq!(height.confidence, Some(dec("0.1")));
        assert_eq!(height.source.as_deref(), Some("https://example.org/oak"));
        assert!(aggregate.range(RangeProperty::Width).is_none());
    }

    #[test]
    fn test_association_upsert_overwrites_confidence_and_sources() {
        let store = create_test_store();
        let taxon = TaxonId::new();
        let tree = store.resolve(Taxonomy::GrowthHabit, "tree").unwrap().unwrap();

        store
            .atomically(&mut |tx| {
                let aggregate = tx.get_or_create_aggregate(&taxon)?;
                let a = tx.get_or_create_source(&new_source("https://a.example"))?;
                let b = tx.get_or_create_source(&new_source("https://b.example"))?;
                tx.upsert_association(aggregate, &tree, dec("0.5"), &[a, b])
            })
            .unwrap();

        store
            .atomically(&mut |tx| {
                let aggregate = tx.get_or_create_aggregate(&taxon)?;
                let c = tx.get_or_create_source(&new_source("https://c.example"))?;
                tx.upsert_association(aggregate, &tree, dec("0.9"), &[c])
            })
            .unwrap();

        let aggregate = store.load_aggregate(&taxon).unwrap().unwrap();
        assert_eq!(aggregate.associations.len(), 1);
        let association = aggregate.association(Taxonomy::GrowthHabit, "tree").unwrap();
        assert_eq!(association.confidence, dec("0.9"));
        assert_eq!(association.sources, vec!["https://c.example".to_string()]);
    }

    #[test]
    fn test_sources_unique_by_url() {
        let store = create_test_store();
        let first = store.get_or_create_source(&new_source("https://example.org/x")).unwrap();
        let mut again = new_source("https://example.org/x");
        again.source_type = "Wikipedia".to_string();
        let second = store.get_or_create_source(&again).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.source_type, "Perplexity");
    }

    #[test]
    fn test_failed_work_rolls_back() {
        let store = create_test_store();
        let taxon = TaxonId::new();

        let result = store.atomically(&mut |tx| {
            let aggregate = tx.get_or_create_aggregate(&taxon)?;
            tx.set_range_value(aggregate, RangeProperty::Width, SubField::Typical, dec("4"))?;
            Err(StorageError::Internal("boom".to_string()))
        });

        assert!(result.is_err());
        assert!(store.load_aggregate(&taxon).unwrap().is_none());
    }

    #[test]
    fn test_empty_check_and_delete() {
        let store = create_test_store();
        let taxon = TaxonId::new();

        store
            .atomically(&mut |tx| {
                let aggregate = tx.get_or_create_aggregate(&taxon)?;
                // confidence alone is not a usable value
                tx.set_range_value(aggregate, RangeProperty::Width, SubField::Confidence, dec("0.4"))?;
                assert!(tx.aggregate_is_empty(aggregate)?);
                tx.set_range_value(aggregate, RangeProperty::Width, SubField::Maximum, dec("6"))?;
                assert!(!tx.aggregate_is_empty(aggregate)?);
                tx.delete_aggregate(aggregate)
            })
            .unwrap();

        assert!(store.load_aggregate(&taxon).unwrap().is_none());
    }

    #[test]
    fn test_referenced_value_cannot_be_removed() {
        let store = create_test_store();
        let taxon = TaxonId::new();
        let sandy = store.resolve(Taxonomy::SoilTexture, "sandy").unwrap().unwrap();

        store
            .atomically(&mut |tx| {
                let aggregate = tx.get_or_create_aggregate(&taxon)?;
                tx.upsert_association(aggregate, &sandy, dec("0.7"), &[])
            })
            .unwrap();

        let err = store.remove_value(Taxonomy::SoilTexture, "sandy").unwrap_err();
        assert!(matches!(err, StorageError::CategoryInUse { .. }));

        store.remove_value(Taxonomy::SoilTexture, "chalky").unwrap();
        assert!(store.resolve(Taxonomy::SoilTexture, "chalky").unwrap().is_none());
    }

    #[test]
    fn test_list_unenriched_skips_taxa_with_aggregate() {
        let store = create_test_store();
        let oak = Taxon::species("Quercus robur");
        let walnut = Taxon::species("Juglans regia");
        store.add_taxon(&oak).unwrap();
        store.add_taxon(&walnut).unwrap();

        store
            .atomically(&mut |tx| {
                let aggregate = tx.get_or_create_aggregate(&oak.id)?;
                tx.set_range_value(aggregate, RangeProperty::Height, SubField::Typical, dec("30"))
            })
            .unwrap();

        let pending = store.list_unenriched().unwrap();
        assert_eq!(pending, vec![walnut.clone()]);
        assert_eq!(store.find_taxon_by_name("Quercus robur").unwrap(), Some(oak.clone()));
        assert_eq!(store.get_taxon(&walnut.id).unwrap(), Some(walnut));
    }
}
