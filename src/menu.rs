use chrono::{Datelike, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{cache_key, TtlCache, MENU_OF_THE_DAY_TTL};
use crate::database::MenuSource;
use crate::error::{ErrorHandler, MenuError};
use crate::models::{Category, Dish, Lang, MenuData};
use crate::monitor::PerformanceMonitor;
use crate::queries;

// Weekday names per language, Monday-first (presentation order for the week
// menu).
const DAYS_ORDER_ES: [&str; 7] = [
    "Lunes",
    "Martes",
    "Miércoles",
    "Jueves",
    "Viernes",
    "Sábado",
    "Domingo",
];
const DAYS_ORDER_EN: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];
const DAYS_ORDER_DE: [&str; 7] = [
    "Montag",
    "Dienstag",
    "Mittwoch",
    "Donnerstag",
    "Freitag",
    "Samstag",
    "Sonntag",
];

// Same names Sunday-first, indexed by chrono's days-from-Sunday weekday
// number.
const WEEK_DAYS_ES: [&str; 7] = [
    "Domingo",
    "Lunes",
    "Martes",
    "Miércoles",
    "Jueves",
    "Viernes",
    "Sábado",
];
const WEEK_DAYS_EN: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];
const WEEK_DAYS_DE: [&str; 7] = [
    "Sonntag",
    "Montag",
    "Dienstag",
    "Mittwoch",
    "Donnerstag",
    "Freitag",
    "Samstag",
];

pub fn days_order(lang: Lang) -> &'static [&'static str; 7] {
    match lang {
        Lang::Es => &DAYS_ORDER_ES,
        Lang::En => &DAYS_ORDER_EN,
        Lang::De => &DAYS_ORDER_DE,
    }
}

fn weekday_name(lang: Lang, days_from_sunday: usize) -> &'static str {
    let table = match lang {
        Lang::Es => &WEEK_DAYS_ES,
        Lang::En => &WEEK_DAYS_EN,
        Lang::De => &WEEK_DAYS_DE,
    };
    table[days_from_sunday % 7]
}

fn lang_context(lang: Lang) -> HashMap<String, String> {
    HashMap::from([("language".to_string(), lang.code().to_string())])
}

/// Assembles the full menu payload from one category list and one dish list.
///
/// Categories whose resolved name is a weekday name mark daily specials:
/// dishes tagged with any of them leave `dishes` and land in the matching
/// `week_menu` group (and in `menu_of_the_day` when the day is today).
/// `today` is chrono's days-from-Sunday weekday number.
pub fn build_menu_data(
    categories: Vec<Category>,
    all_dishes: Vec<Dish>,
    lang: Lang,
    today: usize,
) -> MenuData {
    let order = days_order(lang);

    let day_category_ids: HashSet<i64> = categories
        .iter()
        .filter(|cat| order.contains(&cat.name.as_str()))
        .map(|cat| cat.id)
        .collect();

    let dishes: Vec<Dish> = all_dishes
        .iter()
        .filter(|dish| {
            !dish
                .category_ids
                .iter()
                .any(|id| day_category_ids.contains(id))
        })
        .cloned()
        .collect();

    let today_name = weekday_name(lang, today);
    let menu_of_the_day = categories
        .iter()
        .find(|cat| cat.name == today_name)
        .map(|cat| {
            all_dishes
                .iter()
                .filter(|dish| dish.category_ids.contains(&cat.id))
                .cloned()
                .collect()
        })
        .unwrap_or_default();

    let mut week_menu: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for day in order {
        let names = categories
            .iter()
            .find(|cat| cat.name == *day)
            .map(|cat| {
                all_dishes
                    .iter()
                    .filter(|dish| dish.category_ids.contains(&cat.id))
                    .map(|dish| dish.name.clone())
                    .collect()
            })
            .unwrap_or_default();
        week_menu.insert((*day).to_string(), names);
    }

    MenuData {
        categories,
        dishes,
        menu_of_the_day,
        week_menu,
    }
}

/// Orchestrates cache, queries and partitioning for menu requests.
///
/// The in-process contract is `get_menu_data`: it always yields a well-formed
/// `MenuData`, degrading to the canonical empty payload on any failure. The
/// HTTP layer uses `try_get_menu_data` so it can still surface a diagnostic
/// 500.
pub struct MenuService {
    source: Arc<dyn MenuSource>,
    cache: Arc<TtlCache>,
    handler: ErrorHandler,
    monitor: Arc<PerformanceMonitor>,
    menu_data_ttl: Duration,
}

impl MenuService {
    pub fn new(
        source: Arc<dyn MenuSource>,
        cache: Arc<TtlCache>,
        handler: ErrorHandler,
        monitor: Arc<PerformanceMonitor>,
        menu_data_ttl: Duration,
    ) -> Self {
        Self {
            source,
            cache,
            handler,
            monitor,
            menu_data_ttl,
        }
    }

    /// Fetches the aggregated menu for `lang`. Never fails: any error on the
    /// way resolves to the canonical empty payload.
    pub async fn get_menu_data(&self, lang: Lang) -> MenuData {
        match self.try_get_menu_data(lang).await {
            Ok(data) => data,
            Err(_) => ErrorHandler::canonical_fallback(),
        }
    }

    /// Same as `get_menu_data` but surfaces the failure instead of absorbing
    /// it. Errors are already classified, logged and recorded by the time the
    /// caller sees them.
    pub async fn try_get_menu_data(&self, lang: Lang) -> Result<MenuData, MenuError> {
        let token = self
            .monitor
            .start_measure(&format!("menu-data-fetch-{}", lang), Some(lang_context(lang)));

        let result = self.load_menu_data(lang).await;
        self.monitor.end_measure(&token);

        if let Err(err) = &result {
            self.monitor
                .record_error("menu-data-fetch", err, Some(lang_context(lang)));
        }

        result
    }

    async fn load_menu_data(&self, lang: Lang) -> Result<MenuData, MenuError> {
        let key = cache_key::menu_data(lang);

        let cached = self
            .handler
            .with_cache_first(
                || self.cache.get(&key),
                async {
                    tracing::info!("Cache miss for menu data ({}), fetching from source", lang);

                    let categories_fut = async {
                        let token = self.monitor.start_measure("query-categories", None);
                        let result = queries::fetch_categories(self.source.as_ref(), lang).await;
                        self.monitor.end_measure(&token);
                        result
                    };
                    let dishes_fut = async {
                        let token = self.monitor.start_measure("query-dishes", None);
                        let result = queries::fetch_dishes(self.source.as_ref(), lang).await;
                        self.monitor.end_measure(&token);
                        result
                    };
                    let (categories, all_dishes) = tokio::try_join!(categories_fut, dishes_fut)?;

                    let today = Utc::now().weekday().num_days_from_sunday() as usize;
                    let data = build_menu_data(categories, all_dishes, lang, today);

                    let value = serde_json::to_value(&data).map_err(|err| {
                        MenuError::validation(format!("Failed to serialize menu data: {}", err))
                    })?;
                    self.cache.set(&key, value.clone(), self.menu_data_ttl);
                    tracing::info!(
                        "Menu data cached for {} with TTL {}s",
                        lang,
                        self.menu_data_ttl.as_secs()
                    );

                    Ok(value)
                },
            )
            .await?;

        serde_json::from_value(cached).map_err(|err| {
            MenuError::validation(format!("Cached menu data has unexpected shape: {}", err))
        })
    }

    /// Today's dishes only, cached separately with a short TTL.
    pub async fn try_menu_of_the_day(&self, lang: Lang) -> Result<Vec<Dish>, MenuError> {
        let key = cache_key::menu_of_the_day(lang);

        let cached = self
            .handler
            .with_cache_first(
                || self.cache.get(&key),
                async {
                    let (categories, all_dishes) = tokio::try_join!(
                        queries::fetch_categories(self.source.as_ref(), lang),
                        queries::fetch_dishes(self.source.as_ref(), lang),
                    )?;

                    let today = Utc::now().weekday().num_days_from_sunday() as usize;
                    let today_name = weekday_name(lang, today);

                    let dishes: Vec<Dish> = categories
                        .iter()
                        .find(|cat| cat.name == today_name)
                        .map(|cat| {
                            all_dishes
                                .iter()
                                .filter(|dish| dish.category_ids.contains(&cat.id))
                                .cloned()
                                .collect()
                        })
                        .unwrap_or_default();

                    let value = serde_json::to_value(&dishes).map_err(|err| {
                        MenuError::validation(format!(
                            "Failed to serialize menu of the day: {}",
                            err
                        ))
                    })?;
                    self.cache.set(&key, value.clone(), MENU_OF_THE_DAY_TTL);

                    Ok(value)
                },
            )
            .await?;

        serde_json::from_value(cached).map_err(|err| {
            MenuError::validation(format!("Cached menu of the day has unexpected shape: {}", err))
        })
    }

    /// Pre-loads menu data for every supported language.
    pub async fn warm_all(&self) {
        let _ = tokio::join!(
            self.get_menu_data(Lang::Es),
            self.get_menu_data(Lang::En),
            self.get_menu_data(Lang::De),
        );
        tracing::info!("Cache warmed for all languages");
    }

    /// Drops every cached entry for one language.
    pub fn invalidate(&self, lang: Lang) {
        self.cache.delete(&cache_key::menu_data(lang));
        self.cache.delete(&cache_key::categories(lang));
        self.cache.delete(&cache_key::dishes(lang));
        self.cache.delete(&cache_key::menu_of_the_day(lang));
        self.cache.delete(&cache_key::week_menu(lang));
        tracing::info!("Invalidated menu cache for {}", lang);
    }

    pub fn invalidate_all(&self) {
        for lang in Lang::ALL {
            self.invalidate(lang);
        }
        tracing::info!("Invalidated menu cache for all languages");
    }

    /// Empties the whole store, including entries other callers may share.
    pub fn clear(&self) {
        self.cache.clear();
        tracing::info!("Cleared entire menu cache");
    }

    pub fn source(&self) -> &dyn MenuSource {
        self.source.as_ref()
    }

    pub fn handler(&self) -> &ErrorHandler {
        &self.handler
    }
}
