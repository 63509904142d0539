use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config;
use crate::error::ApiError;

/// Resource types that can be gated by a capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Garden,
    Seed,
    Farm,
    FarmNote,
}

impl Resource {
    pub fn as_str(self) -> &'static str {
        match self {
            Resource::Garden => "garden",
            Resource::Seed => "seed",
            Resource::Farm => "farm",
            Resource::FarmNote => "farm_note",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "garden" => Some(Resource::Garden),
            "seed" => Some(Resource::Seed),
            "farm" => Some(Resource::Farm),
            "farm_note" => Some(Resource::FarmNote),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Create,
    List,
    Retrieve,
    Update,
    Delete,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::List => "list",
            Action::Retrieve => "retrieve",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "create" => Some(Action::Create),
            "list" => Some(Action::List),
            "retrieve" => Some(Action::Retrieve),
            "update" => Some(Action::Update),
            "delete" => Some(Action::Delete),
            _ => None,
        }
    }
}

/// A permitted `(resource, action)` pair. Round-trips through the
/// `"<resource>:<action>"` token form carried in JWT claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Capability {
    pub resource: Resource,
    pub action: Action,
}

impl Capability {
    pub fn new(resource: Resource, action: Action) -> Self {
        Self { resource, action }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource.as_str(), self.action.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown capability token: {0}")]
pub struct CapabilityParseError(pub String);

impl FromStr for Capability {
    type Err = CapabilityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (resource, action) = s
            .split_once(':')
            .ok_or_else(|| CapabilityParseError(s.to_string()))?;
        match (Resource::parse(resource), Action::parse(action)) {
            (Some(resource), Some(action)) => Ok(Capability { resource, action }),
            _ => Err(CapabilityParseError(s.to_string())),
        }
    }
}

/// Authenticated caller with its capability set. Checks are exact set
/// membership; there is no hierarchy or wildcard matching.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user: String,
    pub user_id: Uuid,
    capabilities: HashSet<Capability>,
}

impl Principal {
    pub fn new(
        user: impl Into<String>,
        user_id: Uuid,
        capabilities: impl IntoIterator<Item = Capability>,
    ) -> Self {
        Self {
            user: user.into(),
            user_id,
            capabilities: capabilities.into_iter().collect(),
        }
    }

    pub fn allows(&self, resource: Resource, action: Action) -> bool {
        self.capabilities.contains(&Capability { resource, action })
    }

    pub fn require(&self, resource: Resource, action: Action) -> Result<(), ApiError> {
        if self.allows(resource, action) {
            Ok(())
        } else {
            Err(ApiError::forbidden(format!(
                "missing capability {}",
                Capability { resource, action }
            )))
        }
    }

    /// Capability tokens in stable order, for serialization.
    pub fn capability_tokens(&self) -> Vec<String> {
        let mut tokens: Vec<String> = self.capabilities.iter().map(|c| c.to_string()).collect();
        tokens.sort();
        tokens
    }
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        // Tokens that fail to parse can never match a check; drop them here
        // so the set holds typed capabilities only.
        let capabilities = claims
            .permissions
            .iter()
            .filter_map(|token| match token.parse::<Capability>() {
                Ok(capability) => Some(capability),
                Err(err) => {
                    tracing::warn!(user = %claims.sub, "{} in token, ignored", err);
                    None
                }
            })
            .collect();

        Self {
            user: claims.sub,
            user_id: claims.user_id,
            capabilities,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub user_id: Uuid,
    pub permissions: Vec<String>,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user: String, user_id: Uuid, capabilities: &[Capability]) -> Self {
        let now = Utc::now();
        let expiry_hours = config::config().security.jwt_expiry_hours;
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub: user,
            user_id,
            permissions: capabilities.iter().map(|c| c.to_string()).collect(),
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),
    #[error("invalid JWT secret")]
    InvalidSecret,
}

pub fn issue_token(claims: &Claims) -> Result<String, JwtError> {
    let secret = &config::config().security.jwt_secret;

    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    let header = Header::default();

    encode(&header, claims, &encoding_key).map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_round_trips_through_token_form() {
        let capability: Capability = "farm:create".parse().unwrap();
        assert_eq!(capability.resource, Resource::Farm);
        assert_eq!(capability.action, Action::Create);
        assert_eq!(capability.to_string(), "farm:create");

        let nested: Capability = "farm_note:retrieve".parse().unwrap();
        assert_eq!(nested.resource, Resource::FarmNote);
    }

    #[test]
    fn unknown_tokens_fail_to_parse() {
        assert!("tractor:create".parse::<Capability>().is_err());
        assert!("farm:prune".parse::<Capability>().is_err());
        assert!("farm".parse::<Capability>().is_err());
        // No wildcard matching, token must name one concrete action
        assert!("farm:*".parse::<Capability>().is_err());
    }

    #[test]
    fn principal_checks_are_exact_membership() {
        let principal = Principal::new(
            "alice",
            Uuid::new_v4(),
            [Capability::new(Resource::Garden, Action::Create)],
        );

        assert!(principal.allows(Resource::Garden, Action::Create));
        assert!(!principal.allows(Resource::Garden, Action::Delete));
        assert!(!principal.allows(Resource::Farm, Action::Create));
        assert!(principal.require(Resource::Garden, Action::Create).is_ok());
        assert!(principal.require(Resource::Farm, Action::Create).is_err());
    }

    #[test]
    fn claims_with_bad_tokens_resolve_to_reduced_principal() {
        let claims = Claims {
            sub: "bob".to_string(),
            user_id: Uuid::new_v4(),
            permissions: vec!["seed:list".to_string(), "gradem:create".to_string()],
            exp: 0,
            iat: 0,
        };

        let principal = Principal::from(claims);
        assert!(principal.allows(Resource::Seed, Action::List));
        assert_eq!(principal.capability_tokens(), vec!["seed:list"]);
    }
}
