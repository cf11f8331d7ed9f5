use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier (e.g. "inventory.write").
///
/// The wildcard `"*"` grants everything within the active business.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const WILDCARD: Permission = Permission::from_static("*");

    pub const INVENTORY_READ: Permission = Permission::from_static("inventory.read");
    pub const INVENTORY_WRITE: Permission = Permission::from_static("inventory.write");
    pub const SALES_READ: Permission = Permission::from_static("sales.read");
    pub const SALES_RECORD: Permission = Permission::from_static("sales.record");
    pub const SALES_VOID: Permission = Permission::from_static("sales.void");
    pub const COMMISSIONS_READ: Permission = Permission::from_static("commissions.read");
    pub const COMMISSIONS_MANAGE: Permission = Permission::from_static("commissions.manage");
    pub const GOALS_READ: Permission = Permission::from_static("goals.read");
    pub const GOALS_MANAGE: Permission = Permission::from_static("goals.manage");
    pub const WORKFLOWS_READ: Permission = Permission::from_static("workflows.read");
    pub const WORKFLOWS_MANAGE: Permission = Permission::from_static("workflows.manage");

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }

    /// Read-only permissions.
    pub fn reads() -> Vec<Permission> {
        vec![
            Self::INVENTORY_READ,
            Self::SALES_READ,
            Self::COMMISSIONS_READ,
            Self::GOALS_READ,
            Self::WORKFLOWS_READ,
        ]
    }

    /// Every named domain permission (excludes the wildcard).
    pub fn all_domain() -> Vec<Permission> {
        let mut all = Self::reads();
        all.extend([
            Self::INVENTORY_WRITE,
            Self::SALES_RECORD,
            Self::SALES_VOID,
            Self::COMMISSIONS_MANAGE,
            Self::GOALS_MANAGE,
            Self::WORKFLOWS_MANAGE,
        ]);
        all
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
