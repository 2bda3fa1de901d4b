use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::error::MenuError;
use crate::models::LocalizedName;

/// Raw category record as the data source stores it, names unresolved.
#[derive(Debug, Clone)]
pub struct CategoryRow {
    pub id: i64,
    pub name: LocalizedName,
    pub icon: String,
}

/// Raw dish record with category/allergen associations flattened to id lists.
#[derive(Debug, Clone)]
pub struct DishRow {
    pub id: i64,
    pub name: LocalizedName,
    pub price: f64,
    pub image: String,
    pub category_ids: Vec<i64>,
    pub allergen_ids: Vec<i64>,
}

#[derive(Debug, Clone)]
pub struct AllergenRow {
    pub id: i64,
    pub name: LocalizedName,
    pub icon: String,
}

/// The opaque backing store. Exactly one round-trip per operation; the menu
/// aggregator issues two of them per language per cache miss.
#[async_trait]
pub trait MenuSource: Send + Sync {
    async fn list_categories(&self) -> Result<Vec<CategoryRow>, MenuError>;
    async fn list_dishes(&self) -> Result<Vec<DishRow>, MenuError>;
    async fn list_allergens(&self) -> Result<Vec<AllergenRow>, MenuError>;
}

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn init_tables(&self) -> Result<(), MenuError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS categories (
                category_id INTEGER PRIMARY KEY,
                name_es TEXT,
                name_en TEXT,
                name_de TEXT,
                icon TEXT DEFAULT ''
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS dishes (
                dish_id INTEGER PRIMARY KEY,
                name_es TEXT,
                name_en TEXT,
                name_de TEXT,
                price REAL NOT NULL DEFAULT 0,
                image TEXT DEFAULT ''
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS allergens (
                allergen_id INTEGER PRIMARY KEY,
                name_es TEXT,
                name_en TEXT,
                name_de TEXT,
                icon TEXT DEFAULT ''
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS dishes_categories (
                dish_id INTEGER NOT NULL REFERENCES dishes(dish_id),
                category_id INTEGER NOT NULL REFERENCES categories(category_id),
                PRIMARY KEY (dish_id, category_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS dishes_allergens (
                dish_id INTEGER NOT NULL REFERENCES dishes(dish_id),
                allergen_id INTEGER NOT NULL REFERENCES allergens(allergen_id),
                PRIMARY KEY (dish_id, allergen_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_dishes_categories_category ON dishes_categories(category_id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

}

fn parse_id_list(raw: Option<String>) -> Vec<i64> {
    let mut ids: Vec<i64> = raw
        .unwrap_or_default()
        .split(',')
        .filter_map(|part| part.trim().parse().ok())
        .collect();
    ids.sort_unstable();
    ids
}

fn localized_name(row: &sqlx::sqlite::SqliteRow) -> LocalizedName {
    LocalizedName {
        es: row.get("name_es"),
        en: row.get("name_en"),
        de: row.get("name_de"),
    }
}

#[async_trait]
impl MenuSource for Database {
    async fn list_categories(&self) -> Result<Vec<CategoryRow>, MenuError> {
        let rows = sqlx::query(
            r#"
            SELECT category_id, name_es, name_en, name_de, icon
            FROM categories
            ORDER BY category_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| CategoryRow {
                id: row.get("category_id"),
                name: localized_name(row),
                icon: row.get::<Option<String>, _>("icon").unwrap_or_default(),
            })
            .collect())
    }

    // One statement; associations come back as comma-joined id lists so the
    // whole dish set is a single round-trip.
    async fn list_dishes(&self) -> Result<Vec<DishRow>, MenuError> {
        let rows = sqlx::query(
            r#"
            SELECT
                d.dish_id,
                d.name_es,
                d.name_en,
                d.name_de,
                d.price,
                d.image,
                (SELECT group_concat(dc.category_id) FROM dishes_categories dc
                 WHERE dc.dish_id = d.dish_id) AS category_ids,
                (SELECT group_concat(da.allergen_id) FROM dishes_allergens da
                 WHERE da.dish_id = d.dish_id) AS allergen_ids
            FROM dishes d
            ORDER BY d.dish_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| DishRow {
                id: row.get("dish_id"),
                name: localized_name(row),
                price: row.get("price"),
                image: row.get::<Option<String>, _>("image").unwrap_or_default(),
                category_ids: parse_id_list(row.get("category_ids")),
                allergen_ids: parse_id_list(row.get("allergen_ids")),
            })
            .collect())
    }

    async fn list_allergens(&self) -> Result<Vec<AllergenRow>, MenuError> {
        let rows = sqlx::query(
            r#"
            SELECT allergen_id, name_es, name_en, name_de, icon
            FROM allergens
            ORDER BY allergen_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| AllergenRow {
                id: row.get("allergen_id"),
                name: localized_name(row),
                icon: row.get::<Option<String>, _>("icon").unwrap_or_default(),
            })
            .collect())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn seeded_database() -> Database {
        // A single connection keeps every query on the same in-memory store.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let db = Database::new(pool.clone());
        db.init_tables().await.unwrap();

        sqlx::query(
            "INSERT INTO categories (category_id, name_es, name_en, name_de, icon) VALUES
             (1, 'Entrantes', 'Starters', 'Vorspeisen', 'salad'),
             (2, 'Lunes', 'Monday', 'Montag', '')",
        )
        .execute(&pool)
        .await
        .unwrap();

        sqlx::query(
            "INSERT INTO dishes (dish_id, name_es, name_en, name_de, price, image) VALUES
             (1, 'Ensalada', 'Salad', 'Salat', 8.5, ''),
             (2, 'Menú Lunes', 'Monday Menu', 'Montagsmenü', 12.0, 'monday.webp')",
        )
        .execute(&pool)
        .await
        .unwrap();

        sqlx::query("INSERT INTO dishes_categories (dish_id, category_id) VALUES (1, 1), (2, 2)")
            .execute(&pool)
            .await
            .unwrap();

        sqlx::query(
            "INSERT INTO allergens (allergen_id, name_es, name_en, name_de, icon) VALUES
             (3, 'Gluten', 'Gluten', 'Gluten', 'wheat')",
        )
        .execute(&pool)
        .await
        .unwrap();

        sqlx::query("INSERT INTO dishes_allergens (dish_id, allergen_id) VALUES (1, 3)")
            .execute(&pool)
            .await
            .unwrap();

        db
    }

    #[tokio::test]
    async fn test_list_categories_reads_all_languages() {
        let db = seeded_database().await;
        let categories = db.list_categories().await.unwrap();

        assert_eq!(categories.len(), 2);
        assert_eq!(categories[0].id, 1);
        assert_eq!(categories[0].name.es.as_deref(), Some("Entrantes"));
        assert_eq!(categories[0].name.de.as_deref(), Some("Vorspeisen"));
        assert_eq!(categories[1].name.en.as_deref(), Some("Monday"));
    }

    #[tokio::test]
    async fn test_list_dishes_flattens_associations() {
        let db = seeded_database().await;
        let dishes = db.list_dishes().await.unwrap();

        assert_eq!(dishes.len(), 2);
        assert_eq!(dishes[0].category_ids, vec![1]);
        assert_eq!(dishes[0].allergen_ids, vec![3]);
        assert_eq!(dishes[1].category_ids, vec![2]);
        assert!(dishes[1].allergen_ids.is_empty());
        assert_eq!(dishes[1].price, 12.0);
    }

    #[tokio::test]
    async fn test_list_allergens() {
        let db = seeded_database().await;
        let allergens = db.list_allergens().await.unwrap();
        assert_eq!(allergens.len(), 1);
        assert_eq!(allergens[0].id, 3);
        assert_eq!(allergens[0].icon, "wheat");
    }

    #[test]
    fn test_parse_id_list() {
        assert_eq!(parse_id_list(Some("3,1,2".to_string())), vec![1, 2, 3]);
        assert_eq!(parse_id_list(Some("7".to_string())), vec![7]);
        assert!(parse_id_list(None).is_empty());
        assert!(parse_id_list(Some(String::new())).is_empty());
    }
}
