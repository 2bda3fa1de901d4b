use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Languages the menu is published in. `Es` is the default/fallback language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    Es,
    En,
    De,
}

impl Lang {
    pub const ALL: [Lang; 3] = [Lang::Es, Lang::En, Lang::De];

    pub fn code(&self) -> &'static str {
        match self {
            Lang::Es => "es",
            Lang::En => "en",
            Lang::De => "de",
        }
    }
}

impl FromStr for Lang {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "es" => Ok(Lang::Es),
            "en" => Ok(Lang::En),
            "de" => Ok(Lang::De),
            other => Err(format!(
                "Invalid language '{}'. Must be es, en, or de.",
                other
            )),
        }
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A display string stored once per supported language.
///
/// Resolution follows a fixed fallback chain: requested language, then
/// Spanish, then empty string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalizedName {
    pub es: Option<String>,
    pub en: Option<String>,
    pub de: Option<String>,
}

impl LocalizedName {
    pub fn new(es: &str, en: &str, de: &str) -> Self {
        Self {
            es: Some(es.to_string()),
            en: Some(en.to_string()),
            de: Some(de.to_string()),
        }
    }

    pub fn resolve(&self, lang: Lang) -> String {
        let requested = match lang {
            Lang::Es => &self.es,
            Lang::En => &self.en,
            Lang::De => &self.de,
        };

        requested
            .as_deref()
            .or(self.es.as_deref())
            .unwrap_or_default()
            .to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dish {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub image: String,
    #[serde(rename = "categories")]
    pub category_ids: Vec<i64>,
    #[serde(rename = "allergens")]
    pub allergen_ids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allergen {
    pub id: i64,
    pub name: String,
    pub icon: String,
}

/// The aggregator's output contract.
///
/// `dishes` excludes anything tagged with a weekday category; those dishes
/// live in `menu_of_the_day` / `week_menu` instead. `week_menu` carries all
/// seven weekday names for the requested language when real data was loaded,
/// and is empty only in the canonical fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuData {
    pub categories: Vec<Category>,
    pub dishes: Vec<Dish>,
    pub menu_of_the_day: Vec<Dish>,
    pub week_menu: BTreeMap<String, Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lang_parsing() {
        assert_eq!("es".parse::<Lang>().unwrap(), Lang::Es);
        assert_eq!("en".parse::<Lang>().unwrap(), Lang::En);
        assert_eq!("de".parse::<Lang>().unwrap(), Lang::De);
        assert!("fr".parse::<Lang>().is_err());
        assert!("ES".parse::<Lang>().is_err());
    }

    #[test]
    fn test_lang_roundtrip() {
        for lang in Lang::ALL {
            assert_eq!(lang.code().parse::<Lang>().unwrap(), lang);
        }
    }

    #[test]
    fn test_localized_name_resolution() {
        let name = LocalizedName::new("Entrantes", "Starters", "Vorspeisen");
        assert_eq!(name.resolve(Lang::Es), "Entrantes");
        assert_eq!(name.resolve(Lang::En), "Starters");
        assert_eq!(name.resolve(Lang::De), "Vorspeisen");
    }

    #[test]
    fn test_localized_name_falls_back_to_spanish() {
        let name = LocalizedName {
            es: Some("Ensalada".to_string()),
            en: None,
            de: None,
        };
        assert_eq!(name.resolve(Lang::En), "Ensalada");
        assert_eq!(name.resolve(Lang::De), "Ensalada");
    }

    #[test]
    fn test_localized_name_empty_when_nothing_set() {
        let name = LocalizedName::default();
        assert_eq!(name.resolve(Lang::Es), "");
    }

    #[test]
    fn test_menu_data_json_field_names() {
        let data = MenuData {
            categories: vec![],
            dishes: vec![],
            menu_of_the_day: vec![],
            week_menu: BTreeMap::new(),
        };
        let json = serde_json::to_value(&data).unwrap();
        assert!(json.get("menuOfTheDay").is_some());
        assert!(json.get("weekMenu").is_some());
        assert!(json.get("menu_of_the_day").is_none());
    }
}
