use serde::Deserialize;

const MAX_LIMIT: i64 = 500;

pub(crate) const fn default_limit() -> i64 {
    100
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListParams {
    #[serde(default)]
    pub(crate) skip: i64,
    #[serde(default = "default_limit")]
    pub(crate) limit: i64,
}

impl ListParams {
    /// `(skip, limit)` clamped to sane bounds.
    pub(crate) fn bounds(&self) -> (i64, i64) {
        (self.skip.max(0), self.limit.clamp(1, MAX_LIMIT))
    }
}
