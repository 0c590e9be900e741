use std::{collections::HashSet, fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Debug, Hash, PartialEq, Eq, Serialize, Deserialize, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(anyhow::anyhow!("unknown role {other}")),
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::User => write!(f, "user"),
        }
    }
}

pub trait Authorization {
    fn has_role(&self, role: Role) -> bool;

    fn has_any_role<I>(&self, roles: I) -> bool
    where
        I: IntoIterator<Item = Role>,
    {
        roles.into_iter().any(|role| self.has_role(role))
    }
}

/// Acting identity stored in the session after login.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UserClaim {
    pub id: i64,
    pub username: String,
    pub first_name: Option<String>,
    pub roles: HashSet<Role>,
}

impl Authorization for UserClaim {
    fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role() {
        let claim = UserClaim {
            id: 1,
            username: "jasur".to_string(),
            first_name: None,
            roles: HashSet::from([Role::Admin]),
        };
        assert!(claim.has_role(Role::Admin));
        assert!(!claim.has_role(Role::User));
        assert!(claim.has_any_role([Role::User, Role::Admin]));

        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert!("librarian".parse::<Role>().is_err());
        assert_eq!(Role::User.to_string(), "user");
    }
}
