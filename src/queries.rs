use crate::database::MenuSource;
use crate::error::MenuError;
use crate::models::{Allergen, Category, Dish, Lang};

/// Read all categories with display names resolved for `lang`, ordered by id.
pub async fn fetch_categories(
    source: &dyn MenuSource,
    lang: Lang,
) -> Result<Vec<Category>, MenuError> {
    let mut rows = source.list_categories().await.map_err(|err| {
        tracing::error!("Error fetching categories: {}", err);
        err.with_context("query", "categories")
    })?;
    rows.sort_by_key(|row| row.id);

    Ok(rows
        .into_iter()
        .map(|row| Category {
            id: row.id,
            name: row.name.resolve(lang),
            icon: row.icon,
        })
        .collect())
}

/// Read all dishes with their associations flattened, names resolved for
/// `lang`, ordered by id.
pub async fn fetch_dishes(source: &dyn MenuSource, lang: Lang) -> Result<Vec<Dish>, MenuError> {
    let mut rows = source.list_dishes().await.map_err(|err| {
        tracing::error!("Error fetching dishes: {}", err);
        err.with_context("query", "dishes")
    })?;
    rows.sort_by_key(|row| row.id);

    Ok(rows
        .into_iter()
        .map(|row| Dish {
            id: row.id,
            name: row.name.resolve(lang),
            price: row.price,
            image: row.image,
            category_ids: row.category_ids,
            allergen_ids: row.allergen_ids,
        })
        .collect())
}

pub async fn fetch_allergens(
    source: &dyn MenuSource,
    lang: Lang,
) -> Result<Vec<Allergen>, MenuError> {
    let mut rows = source.list_allergens().await.map_err(|err| {
        tracing::error!("Error fetching allergens: {}", err);
        err.with_context("query", "allergens")
    })?;
    rows.sort_by_key(|row| row.id);

    Ok(rows
        .into_iter()
        .map(|row| Allergen {
            id: row.id,
            name: row.name.resolve(lang),
            icon: row.icon,
        })
        .collect())
}
