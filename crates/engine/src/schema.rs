use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::model::Column;

/// Maximum numeric columns a descriptor may declare (the hour column is extra).
pub const MAX_DATA_COLUMNS: usize = 9;

// ---------------------------------------------------------------------------
// Descriptor
// ---------------------------------------------------------------------------

/// How the extraction prompt asks the engine to label its fields.
///
/// Only affects the prompt. The mapper accepts keyed and positional rows
/// under every style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyStyle {
    /// Canonical Spanish keys (`"Totalizador de Vapor": 52863.5`).
    #[default]
    Named,
    /// Compact codes (`"vapor_tot": 52863.5`).
    ShortCodes,
    /// Array of arrays, one value per column in descriptor order.
    Positional,
}

impl std::fmt::Display for KeyStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Named => write!(f, "named"),
            Self::ShortCodes => write!(f, "short_codes"),
            Self::Positional => write!(f, "positional"),
        }
    }
}

/// Extraction schema descriptor: ordered canonical columns plus an alias table.
///
/// The single adaptation point between whatever vocabulary the extraction
/// engine uses and the canonical columns.
#[derive(Debug, Clone)]
pub struct ExtractionSchema {
    pub name: String,
    pub key_style: KeyStyle,
    columns: Vec<Column>,
    aliases: HashMap<String, Column>,
}

/// On-disk TOML form.
#[derive(Debug, Deserialize)]
struct SchemaFile {
    name: String,
    #[serde(default)]
    key_style: KeyStyle,
    columns: Vec<String>,
    #[serde(default)]
    aliases: BTreeMap<String, String>,
}

impl Default for ExtractionSchema {
    fn default() -> Self {
        Self::named()
    }
}

impl ExtractionSchema {
    pub const PRESETS: [&'static str; 3] = ["named", "short_codes", "positional"];

    /// Canonical Spanish keys, hour first.
    pub fn named() -> Self {
        Self::builtin("named", KeyStyle::Named)
    }

    pub fn short_codes() -> Self {
        Self::builtin("short_codes", KeyStyle::ShortCodes)
    }

    pub fn positional() -> Self {
        Self::builtin("positional", KeyStyle::Positional)
    }

    pub fn preset(name: &str) -> Result<Self, SchemaError> {
        match name.trim().to_lowercase().replace('-', "_").as_str() {
            "named" => Ok(Self::named()),
            "short_codes" | "short" => Ok(Self::short_codes()),
            "positional" => Ok(Self::positional()),
            _ => Err(SchemaError::UnknownPreset(name.to_string())),
        }
    }

    fn builtin(name: &str, key_style: KeyStyle) -> Self {
        Self {
            name: name.to_string(),
            key_style,
            columns: Column::ALL.to_vec(),
            aliases: builtin_aliases(),
        }
    }

    /// Build a descriptor from an explicit column order and extra aliases.
    ///
    /// Built-in aliases (canonical keys, short codes, ids) are always present.
    pub fn new(
        name: impl Into<String>,
        key_style: KeyStyle,
        columns: Vec<Column>,
        extra_aliases: impl IntoIterator<Item = (String, Column)>,
    ) -> Result<Self, SchemaError> {
        let mut aliases = builtin_aliases();
        for (alias, column) in extra_aliases {
            let key = normalize_key(&alias);
            if key.is_empty() {
                return Err(SchemaError::Validation("alias keys must not be empty".into()));
            }
            aliases.insert(key, column);
        }
        let schema = Self { name: name.into(), key_style, columns, aliases };
        schema.validate()?;
        Ok(schema)
    }

    pub fn from_toml(input: &str) -> Result<Self, SchemaError> {
        let file: SchemaFile =
            toml::from_str(input).map_err(|e| SchemaError::Parse(e.to_string()))?;

        let columns = file
            .columns
            .iter()
            .map(|name| resolve_name(name))
            .collect::<Result<Vec<_>, _>>()?;

        let mut extra = Vec::with_capacity(file.aliases.len());
        for (alias, target) in &file.aliases {
            extra.push((alias.clone(), resolve_name(target)?));
        }

        Self::new(file.name, file.key_style, columns, extra)
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.columns.is_empty() {
            return Err(SchemaError::Validation("at least one column is required".into()));
        }

        let mut seen = HashSet::new();
        for col in &self.columns {
            if !seen.insert(*col) {
                return Err(SchemaError::Validation(format!(
                    "column '{}' is listed more than once",
                    col.key()
                )));
            }
        }

        let data_columns = self.columns.iter().filter(|c| c.is_numeric()).count();
        if data_columns > MAX_DATA_COLUMNS {
            return Err(SchemaError::Validation(format!(
                "at most {MAX_DATA_COLUMNS} data columns are allowed, found {data_columns}"
            )));
        }

        Ok(())
    }

    /// Columns in extraction order (positional index `i` maps to `columns()[i]`).
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_at(&self, position: usize) -> Option<Column> {
        self.columns.get(position).copied()
    }

    /// Resolve an engine field name. Unknown names return `None`.
    pub fn resolve(&self, key: &str) -> Option<Column> {
        self.aliases.get(&normalize_key(key)).copied()
    }

    /// The field name the prompt asks the engine to use for `column`.
    pub fn prompt_key(&self, column: Column) -> &'static str {
        match self.key_style {
            KeyStyle::ShortCodes => column.short_code(),
            KeyStyle::Named | KeyStyle::Positional => column.key(),
        }
    }
}

fn builtin_aliases() -> HashMap<String, Column> {
    let mut aliases = HashMap::new();
    for col in Column::ALL {
        aliases.insert(normalize_key(col.key()), col);
        aliases.insert(normalize_key(col.short_code()), col);
        aliases.insert(normalize_key(col.id()), col);
        aliases.insert(normalize_key(col.description()), col);
    }
    aliases.insert("hour".into(), Column::Hora);
    aliases
}

fn resolve_name(name: &str) -> Result<Column, SchemaError> {
    Column::from_name(name.trim())
        .or_else(|| builtin_aliases().get(&normalize_key(name)).copied())
        .ok_or_else(|| SchemaError::UnknownColumn(name.to_string()))
}

/// Lowercase, trim, collapse inner whitespace.
pub fn normalize_key(key: &str) -> String {
    key.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const CUSTOM: &str = r#"
name = "Caldera 2"
key_style = "positional"
columns = ["HORA", "vapor_tot", "agua_tot", "bagazo_in"]

[aliases]
"Vapor Tot." = "steam_total"
"Agua" = "Totalizador agua alimentación"
"#;

    #[test]
    fn presets_resolve_every_variant() {
        for preset in ExtractionSchema::PRESETS {
            let schema = ExtractionSchema::preset(preset).unwrap();
            assert_eq!(schema.resolve("vapor_tot"), Some(Column::SteamTotal));
            assert_eq!(schema.resolve("Totalizador de Vapor"), Some(Column::SteamTotal));
            assert_eq!(schema.resolve("HORA"), Some(Column::Hora));
            assert_eq!(schema.columns().len(), 10);
        }
    }

    #[test]
    fn resolve_is_case_and_space_insensitive() {
        let schema = ExtractionSchema::named();
        assert_eq!(schema.resolve("  hora "), Some(Column::Hora));
        assert_eq!(schema.resolve("TOTALIZADOR  DE   VAPOR"), Some(Column::SteamTotal));
        assert_eq!(schema.resolve("Presión de vapor"), Some(Column::SteamPressure));
        assert_eq!(schema.resolve("flujo"), None);
    }

    #[test]
    fn unknown_preset_is_rejected() {
        let err = ExtractionSchema::preset("csv").unwrap_err();
        assert!(err.to_string().contains("'csv'"));
        assert!(ExtractionSchema::preset("Short-Codes").is_ok());
    }

    #[test]
    fn parse_custom_descriptor() {
        let schema = ExtractionSchema::from_toml(CUSTOM).unwrap();
        assert_eq!(schema.name, "Caldera 2");
        assert_eq!(schema.key_style, KeyStyle::Positional);
        assert_eq!(
            schema.columns(),
            &[Column::Hora, Column::SteamTotal, Column::WaterTotal, Column::BagasseInTotal]
        );
        assert_eq!(schema.resolve("vapor tot."), Some(Column::SteamTotal));
        assert_eq!(schema.resolve("agua"), Some(Column::WaterTotal));
        // Built-ins survive custom aliases.
        assert_eq!(schema.resolve("bagazo_ret"), Some(Column::BagasseOutTotal));
    }

    #[test]
    fn reject_duplicate_columns() {
        let input = r#"
name = "dup"
columns = ["HORA", "vapor_tot", "steam_total"]
"#;
        let err = ExtractionSchema::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn reject_unknown_column() {
        let input = r#"
name = "bad"
columns = ["HORA", "caudal"]
"#;
        let err = ExtractionSchema::from_toml(input).unwrap_err();
        assert_eq!(err, SchemaError::UnknownColumn("caudal".into()));
    }

    #[test]
    fn reject_unknown_alias_target() {
        let input = r#"
name = "bad"
columns = ["HORA"]
[aliases]
"x" = "nothing"
"#;
        assert!(matches!(
            ExtractionSchema::from_toml(input),
            Err(SchemaError::UnknownColumn(_))
        ));
    }

    #[test]
    fn reject_empty_columns_and_bad_toml() {
        let err = ExtractionSchema::from_toml("name = \"e\"\ncolumns = []\n").unwrap_err();
        assert!(err.to_string().contains("at least one column"));

        let err = ExtractionSchema::from_toml("columns = [").unwrap_err();
        assert!(matches!(err, SchemaError::Parse(_)));
    }

    #[test]
    fn reject_invalid_key_style() {
        let input = r#"
name = "bad"
key_style = "tabular"
columns = ["HORA"]
"#;
        assert!(matches!(ExtractionSchema::from_toml(input), Err(SchemaError::Parse(_))));
    }

    #[test]
    fn prompt_keys_follow_style() {
        assert_eq!(ExtractionSchema::short_codes().prompt_key(Column::WaterTotal), "agua_tot");
        assert_eq!(
            ExtractionSchema::named().prompt_key(Column::WaterTotal),
            "Totalizador agua alimentación"
        );
    }
}
