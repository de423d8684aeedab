use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Default reason stored when a parent rejects without typing one.
pub const DEFAULT_REJECTION_REASON: &str = "보호자가 요청을 거절했어요.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkRequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl LinkRequestStatus {
    /// A request only ever moves pending → approved or pending → rejected.
    pub fn can_transition_to(self, next: LinkRequestStatus) -> bool {
        matches!(
            (self, next),
            (LinkRequestStatus::Pending, LinkRequestStatus::Approved)
                | (LinkRequestStatus::Pending, LinkRequestStatus::Rejected)
        )
    }
}

impl std::fmt::Display for LinkRequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LinkRequestStatus::Pending => "pending",
            LinkRequestStatus::Approved => "approved",
            LinkRequestStatus::Rejected => "rejected",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for LinkRequestStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(LinkRequestStatus::Pending),
            "approved" => Ok(LinkRequestStatus::Approved),
            "rejected" => Ok(LinkRequestStatus::Rejected),
            _ => Err(anyhow::anyhow!("Unknown link request status: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalMode {
    Manual,
    Auto,
}

impl std::fmt::Display for ApprovalMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApprovalMode::Manual => write!(f, "manual"),
            ApprovalMode::Auto => write!(f, "auto"),
        }
    }
}

/// DB row struct — status is kept as TEXT and parsed where the transition
/// rules are enforced.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LinkRequest {
    pub id: Uuid,
    pub family_code: String,
    pub child_nickname: String,
    pub child_avatar: String,
    pub child_age: Option<i32>,
    pub status: String,
    pub rejection_reason: Option<String>,
    pub parent_id: Option<Uuid>,
    pub child_id: Option<Uuid>,
    /// Snapshot of the approval payload, stamped at approval time.
    pub parent_approval: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateLinkRequestRequest {
    pub family_code: String,
    pub child_nickname: String,
    pub child_avatar: String,
    pub child_age: Option<i32>,
    /// When set, the new request id is stored as this device's single-slot
    /// active-request pointer.
    pub device_id: Option<String>,
}

/// The bundle of confirmation + settings a parent attaches when approving.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParentApprovalPayload {
    pub confirmed_nickname: String,
    pub confirmed_age: i32,
    pub service_terms_agreed: bool,
    pub privacy_agreed: bool,
    pub push_agreed: bool,
    pub reward_enabled: bool,
    pub base_coin_reward: i32,
    pub approval_mode: ApprovalMode,
    pub recovery_email: Option<String>,
    pub usage_start_time: String,
    pub usage_end_time: String,
    pub daily_max_completion: i32,
}

impl ParentApprovalPayload {
    /// Validates the payload before any write. Both consent flags are
    /// mandatory; the rest guards against nonsense numbers and times.
    pub fn validate(&self) -> Result<(), String> {
        if !self.service_terms_agreed || !self.privacy_agreed {
            return Err("service terms and privacy consent are required".into());
        }
        if self.confirmed_nickname.trim().is_empty() {
            return Err("nickname must not be empty".into());
        }
        if !(1..=19).contains(&self.confirmed_age) {
            return Err("age must be between 1 and 19".into());
        }
        if self.base_coin_reward < 0 {
            return Err("base coin reward must not be negative".into());
        }
        if self.daily_max_completion < 1 {
            return Err("daily max completion must be at least 1".into());
        }
        if !is_valid_hhmm(&self.usage_start_time) || !is_valid_hhmm(&self.usage_end_time) {
            return Err("usage times must be HH:MM".into());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct RejectLinkRequestRequest {
    pub reason: Option<String>,
}

/// Validates a HH:MM clock time (e.g. "07:00", "20:30").
pub fn is_valid_hhmm(s: &str) -> bool {
    let parts: Vec<&str> = s.split(':').collect();
    parts.len() == 2
        && parts[0].len() == 2
        && parts[1].len() == 2
        && parts[0].parse::<u32>().map(|h| h <= 23).unwrap_or(false)
        && parts[1].parse::<u32>().map(|m| m <= 59).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> ParentApprovalPayload {
        ParentApprovalPayload {
            confirmed_nickname: "토토".into(),
            confirmed_age: 5,
            service_terms_agreed: true,
            privacy_agreed: true,
            push_agreed: false,
            reward_enabled: true,
            base_coin_reward: 10,
            approval_mode: ApprovalMode::Manual,
            recovery_email: None,
            usage_start_time: "07:00".into(),
            usage_end_time: "20:00".into(),
            daily_max_completion: 10,
        }
    }

    #[test]
    fn status_roundtrip() {
        for s in ["pending", "approved", "rejected"] {
            let parsed: LinkRequestStatus = s.parse().unwrap();
            assert_eq!(parsed.to_string(), s);
        }
        assert!("cancelled".parse::<LinkRequestStatus>().is_err());
    }

    #[test]
    fn status_only_moves_forward_from_pending() {
        use LinkRequestStatus::*;
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(!Approved.can_transition_to(Rejected));
        assert!(!Rejected.can_transition_to(Approved));
        assert!(!Approved.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn valid_payload_passes() {
        assert!(payload().validate().is_ok());
    }

    #[test]
    fn consent_flags_are_mandatory() {
        let mut p = payload();
        p.service_terms_agreed = false;
        assert!(p.validate().is_err());

        let mut p = payload();
        p.privacy_agreed = false;
        assert!(p.validate().is_err());
    }

    #[test]
    fn blank_nickname_rejected() {
        let mut p = payload();
        p.confirmed_nickname = "   ".into();
        assert!(p.validate().is_err());
    }

    #[test]
    fn numeric_bounds_checked() {
        let mut p = payload();
        p.base_coin_reward = -1;
        assert!(p.validate().is_err());

        let mut p = payload();
        p.daily_max_completion = 0;
        assert!(p.validate().is_err());

        let mut p = payload();
        p.confirmed_age = 0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn usage_window_must_be_hhmm() {
        assert!(is_valid_hhmm("07:00"));
        assert!(is_valid_hhmm("23:59"));
        assert!(!is_valid_hhmm("24:00"));
        assert!(!is_valid_hhmm("7:00"));
        assert!(!is_valid_hhmm("07:60"));
        assert!(!is_valid_hhmm("0700"));

        let mut p = payload();
        p.usage_end_time = "25:00".into();
        assert!(p.validate().is_err());
    }

    #[test]
    fn approval_mode_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ApprovalMode::Manual).unwrap(),
            "\"manual\""
        );
        let parsed: ApprovalMode = serde_json::from_str("\"auto\"").unwrap();
        assert_eq!(parsed, ApprovalMode::Auto);
    }
}
