use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Fixed permission vocabulary answered by the identity service. Role and
/// permission resolution happens at token issuance; this backend only reads
/// the result out of the claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    TestCreate,
    TestAssign,
    TestTake,
    TestEvaluate,
    TestReport,
    ManageGroups,
    ManageRoles,
}

impl Permission {
    pub fn as_str(self) -> &'static str {
        match self {
            Permission::TestCreate => "test.create",
            Permission::TestAssign => "test.assign",
            Permission::TestTake => "test.take",
            Permission::TestEvaluate => "test.evaluate",
            Permission::TestReport => "test.report",
            Permission::ManageGroups => "test.manage_groups",
            Permission::ManageRoles => "test.manage_roles",
        }
    }

    pub const ALL: [Permission; 7] = [
        Permission::TestCreate,
        Permission::TestAssign,
        Permission::TestTake,
        Permission::TestEvaluate,
        Permission::TestReport,
        Permission::ManageGroups,
        Permission::ManageRoles,
    ];
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl Claims {
    pub fn principal_id(&self) -> Result<Uuid> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| Error::Unauthorized("Malformed principal id in token".to_string()))
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.iter().any(|p| p == permission.as_str())
    }

    /// Single authorization guard used at the top of every protected handler.
    pub fn require(&self, permission: Permission) -> Result<()> {
        if self.has_permission(permission) {
            Ok(())
        } else {
            Err(Error::Forbidden(format!(
                "Missing permission: {}",
                permission.as_str()
            )))
        }
    }
}

pub async fn require_bearer_auth(mut req: Request, next: Next) -> Response {
    let Some(auth_header) = req.headers().get(axum::http::header::AUTHORIZATION) else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error":"missing_authorization"})),
        )
            .into_response();
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error":"bad_authorization"})),
        )
            .into_response();
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error":"unsupported_scheme"})),
        )
            .into_response();
    };

    let config = crate::config::get_config();
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    match decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    ) {
        Ok(data) => {
            req.extensions_mut().insert(data.claims);
            next.run(req).await
        }
        Err(_) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error":"invalid_token"})),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(permissions: &[&str]) -> Claims {
        Claims {
            sub: Uuid::new_v4().to_string(),
            exp: 4102444800,
            roles: vec!["employee".into()],
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn vocabulary_round_trips() {
        let expected = [
            "test.create",
            "test.assign",
            "test.take",
            "test.evaluate",
            "test.report",
            "test.manage_groups",
            "test.manage_roles",
        ];
        let got: Vec<&str> = Permission::ALL.iter().map(|p| p.as_str()).collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn require_rejects_missing_permission() {
        let c = claims(&["test.take"]);
        assert!(c.require(Permission::TestTake).is_ok());
        assert!(matches!(
            c.require(Permission::TestEvaluate),
            Err(Error::Forbidden(_))
        ));
    }

    #[test]
    fn principal_id_must_be_a_uuid() {
        let mut c = claims(&[]);
        assert!(c.principal_id().is_ok());
        c.sub = "not-a-uuid".into();
        assert!(matches!(c.principal_id(), Err(Error::Unauthorized(_))));
    }

    #[test]
    fn claims_decode_from_signed_token() {
        use jsonwebtoken::{encode, EncodingKey, Header};

        let original = claims(&["test.take", "test.report"]);
        let token = encode(
            &Header::default(),
            &original,
            &EncodingKey::from_secret(b"unit-secret"),
        )
        .unwrap();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        let decoded = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"unit-secret"),
            &validation,
        )
        .unwrap();
        assert_eq!(decoded.claims.sub, original.sub);
        assert_eq!(decoded.claims.permissions, original.permissions);
    }
}
