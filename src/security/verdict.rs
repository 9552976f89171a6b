//! Classification verdict.

use serde::Serialize;

/// Outcome of proxy/bot classification for one request. Never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub is_proxy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

impl Verdict {
    pub fn clean() -> Self {
        Self::default()
    }

    pub fn flagged(reason: impl Into<String>) -> Self {
        Self {
            is_proxy: true,
            reason: Some(reason.into()),
            service: None,
        }
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_camel_case() {
        let v = Verdict::flagged("via header present").with_service("header_analysis");
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["isProxy"], true);
        assert_eq!(json["service"], "header_analysis");

        let clean = serde_json::to_string(&Verdict::clean()).unwrap();
        assert_eq!(clean, r#"{"isProxy":false}"#);
    }
}
