use crate::utils::{AppError, Result};
use std::env;
use std::str::FromStr;

/// Récupère une variable d'environnement (Optionnel).
/// Une valeur vide est traitée comme absente.
pub fn get_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Récupère une variable d'environnement avec valeur par défaut.
pub fn get_or(key: &str, default: &str) -> String {
    get_optional(key).unwrap_or_else(|| default.to_string())
}

/// Récupère et parse une variable optionnelle (ex: entier, booléen).
pub fn get_parsed<T: FromStr>(key: &str) -> Result<Option<T>> {
    match get_optional(key) {
        None => Ok(None),
        Some(val) => val
            .parse::<T>()
            .map(Some)
            .map_err(|_| AppError::Config(format!("Impossible de parser la variable : {}", key))),
    }
}

/// Indique si un flag est actif (ex: "true", "1", "yes").
pub fn is_enabled(key: &str) -> bool {
    matches!(
        get_optional(key).as_deref(),
        Some("true") | Some("1") | Some("yes") | Some("on")
    )
}
