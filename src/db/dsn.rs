//! Connection string templates.

use strum_macros::{AsRefStr, Display};

use super::{DbError, Target};

/// Placeholder replaced by the target identifier in the DSN template.
pub const TARGET_PLACEHOLDER: &str = "{target}";

const HANA_SCHEMES: &[&str] = &["hdbsql", "hdbsqls"];
const SQLX_SCHEMES: &[&str] = &["postgres", "postgresql", "mysql", "sqlite"];

/// Driver selected by the template's URL scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum Backend {
    /// Native HANA protocol (`hdbsql://`, `hdbsqls://` for TLS).
    Hana,
    /// sqlx `Any` (`postgres://`, `mysql://`, `sqlite:`).
    Sqlx,
}

impl Backend {
    /// # Errors
    /// Returns `DbError::InvalidDsn` if the scheme has no driver.
    pub fn for_template(template: &str) -> Result<Self, DbError> {
        let scheme = template
            .split_once(':')
            .map(|(scheme, _)| scheme.to_ascii_lowercase())
            .ok_or_else(|| DbError::InvalidDsn(format!("'{template}' has no scheme")))?;

        if HANA_SCHEMES.contains(&scheme.as_str()) {
            Ok(Self::Hana)
        } else if SQLX_SCHEMES.contains(&scheme.as_str()) {
            Ok(Self::Sqlx)
        } else {
            Err(DbError::InvalidDsn(format!(
                "no driver for scheme '{scheme}', expected one of: {}",
                HANA_SCHEMES
                    .iter()
                    .chain(SQLX_SCHEMES)
                    .copied()
                    .collect::<Vec<_>>()
                    .join(", ")
            )))
        }
    }
}

/// Build the connection string for `target`.
///
/// When the target's credentials carry a user, it is written into the URL
/// userinfo together with the password, with the escaping the URL requires.
pub fn render(template: &str, target: &Target) -> Result<String, DbError> {
    let dsn = template.replace(TARGET_PLACEHOLDER, &target.name);
    let credentials = &target.credentials;
    if credentials.user.is_empty() {
        return Ok(dsn);
    }

    let mut url = url::Url::parse(&dsn)
        .map_err(|e| DbError::InvalidDsn(format!("target '{}': {e}", target.name)))?;
    url.set_username(&credentials.user)
        .and_then(|()| url.set_password(Some(&credentials.password)))
        .map_err(|()| {
            DbError::InvalidDsn(format!(
                "target '{}': dsn does not accept credentials",
                target.name
            ))
        })?;
    Ok(url.into())
}
