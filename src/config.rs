//! Adjudicator policy.
//!
//! ```
//! # use paychan::config::{Config, IdReuse};
//! let config: Config = serde_json::from_str(r#"{ "id_reuse": "after_settlement" }"#).unwrap();
//! assert_eq!(config.id_reuse, IdReuse::AfterSettlement);
//! assert_eq!(config.max_challenge_period, None);
//! ```

use serde::Deserialize;

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdReuse {
    /// A channel id can only ever be used once.
    #[default]
    Forbid,
    /// The id of a settled channel may be opened again, replacing the old
    /// record.
    AfterSettlement,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub id_reuse: IdReuse,
    /// Upper bound in seconds for the challenge period of new channels.
    pub max_challenge_period: Option<u64>,
}
