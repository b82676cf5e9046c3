//! Per-call leaderboard policy
//!
//! Options are applied on every call and never stored: a call without an
//! expiry field persists the leaderboard, a call with `idle_expire` slides its
//! deadline forward.

use crate::{Result, TallyError};
use serde::{Deserialize, Serialize};

/// Policy bundle supplied with every operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Options {
    /// Logical key to clone from when this leaderboard does not exist yet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub construct_from: Option<String>,

    /// Upper bound on member count; lowest scores are evicted first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<i64>,

    /// Absolute deadline, epoch milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expire_at: Option<i64>,

    /// Sliding lifetime in milliseconds, refreshed on every call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_expire: Option<i64>,
}

/// Expiry action resolved from [`Options`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    At(i64),
    Idle(i64),
    Persist,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_construct_from(mut self, source: impl Into<String>) -> Self {
        self.construct_from = Some(source.into());
        self
    }

    pub fn with_capacity(mut self, capacity: i64) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn with_expire_at(mut self, at_ms: i64) -> Self {
        self.expire_at = Some(at_ms);
        self
    }

    pub fn with_idle_expire(mut self, ttl_ms: i64) -> Self {
        self.idle_expire = Some(ttl_ms);
        self
    }

    /// Reject contradictory or out-of-range settings before any write
    pub fn validate(&self) -> Result<()> {
        if self.expire_at.is_some() && self.idle_expire.is_some() {
            return Err(TallyError::InvalidOptions(
                "expire_at and idle_expire are mutually exclusive".into(),
            ));
        }
        if let Some(capacity) = self.capacity {
            if capacity < 0 {
                return Err(TallyError::InvalidOptions(format!(
                    "capacity must be non-negative, got {}",
                    capacity
                )));
            }
        }
        if let Some(ttl) = self.idle_expire {
            if ttl <= 0 {
                return Err(TallyError::InvalidOptions(format!(
                    "idle_expire must be positive, got {}",
                    ttl
                )));
            }
        }
        if matches!(self.construct_from.as_deref(), Some("")) {
            return Err(TallyError::InvalidOptions(
                "construct_from must name a leaderboard".into(),
            ));
        }
        Ok(())
    }

    /// Decode a JSON options payload
    ///
    /// An empty payload means "no options": the preamble only initializes.
    pub fn decode(payload: &[u8]) -> Result<Option<Options>> {
        if payload.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        let options: Options = serde_json::from_slice(payload)
            .map_err(|e| TallyError::MalformedPayload(format!("options: {}", e)))?;
        options.validate()?;
        Ok(Some(options))
    }

    pub fn expiry(&self) -> Expiry {
        match (self.expire_at, self.idle_expire) {
            (Some(at), _) => Expiry::At(at),
            (None, Some(ttl)) => Expiry::Idle(ttl),
            (None, None) => Expiry::Persist,
        }
    }

    /// Capacity as a member count
    pub fn capacity_limit(&self) -> Option<usize> {
        self.capacity.map(|c| c.max(0) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_empty_payload() {
        assert_eq!(Options::decode(b"").unwrap(), None);
        assert_eq!(Options::decode(b"  \n").unwrap(), None);
        assert_eq!(Options::decode(b"{}").unwrap(), Some(Options::default()));
    }

    #[test]
    fn test_decode_fields() {
        let options = Options::decode(br#"{"construct_from":"season1","capacity":10,"idle_expire":1000}"#)
            .unwrap()
            .unwrap();
        assert_eq!(options.construct_from.as_deref(), Some("season1"));
        assert_eq!(options.capacity_limit(), Some(10));
        assert_eq!(options.expiry(), Expiry::Idle(1000));
    }

    #[test]
    fn test_malformed_payload() {
        assert!(matches!(
            Options::decode(b"{not json"),
            Err(TallyError::MalformedPayload(_))
        ));
        assert!(matches!(
            Options::decode(br#"{"capacity":"ten"}"#),
            Err(TallyError::MalformedPayload(_))
        ));
        assert!(matches!(
            Options::decode(br#"{"capcity":10}"#),
            Err(TallyError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_policy_violations() {
        let both = Options::new().with_expire_at(1).with_idle_expire(1);
        assert!(matches!(both.validate(), Err(TallyError::InvalidOptions(_))));
        assert!(Options::new().with_capacity(-1).validate().is_err());
        assert!(Options::new().with_idle_expire(0).validate().is_err());
        assert!(Options::new().with_construct_from("").validate().is_err());
        assert!(Options::new().with_capacity(0).validate().is_ok());
    }

    #[test]
    fn test_no_expiry_field_persists() {
        assert_eq!(Options::default().expiry(), Expiry::Persist);
        assert_eq!(Options::new().with_expire_at(5).expiry(), Expiry::At(5));
    }
}
