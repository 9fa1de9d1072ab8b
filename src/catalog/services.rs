use anyhow::Context;
use sqlx::PgPool;
use tracing::info;

use super::repo;
use super::repo_types::IngredientSeed;

pub fn parse_ingredient_seeds(raw: &str) -> anyhow::Result<Vec<IngredientSeed>> {
    let mut seeds: Vec<IngredientSeed> =
        serde_json::from_str(raw).context("ingredient catalog is not a JSON array")?;
    for s in &mut seeds {
        s.name = s.name.trim().to_string();
        s.measurement_unit = s.measurement_unit.trim().to_string();
    }
    seeds.retain(|s| !s.name.is_empty() && !s.measurement_unit.is_empty());
    Ok(seeds)
}

/// Load `{name, measurement_unit}` entries from `path` into the ingredients table.
pub async fn import_ingredients_file(db: &PgPool, path: &str) -> anyhow::Result<u64> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("read {path}"))?;
    let seeds = parse_ingredient_seeds(&raw)?;
    let inserted = repo::import_ingredients(db, &seeds).await?;
    info!(path, total = seeds.len(), inserted, "ingredient catalog imported");
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_trims_catalog() {
        let raw = r#"[
            {"name": " абрикосовое варенье ", "measurement_unit": "г"},
            {"name": "salt", "measurement_unit": "g"},
            {"name": "", "measurement_unit": "g"}
        ]"#;
        let seeds = parse_ingredient_seeds(raw).unwrap();
        assert_eq!(seeds.len(), 2);
        assert_eq!(seeds[0].name, "абрикосовое варенье");
        assert_eq!(seeds[1].measurement_unit, "g");
    }

    #[test]
    fn rejects_non_array() {
        assert!(parse_ingredient_seeds(r#"{"name": "salt"}"#).is_err());
    }
}
