use keystone_core::{Audit, TenantId};

/// Tenant (organization) record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    /// Short unique code.
    pub code: String,
    pub description: Option<String>,
    pub domain: String,
    pub is_active: bool,
    pub subscription_plan: Option<String>,
    pub audit: Audit,
}

impl Tenant {
    pub fn new(
        id: TenantId,
        name: impl Into<String>,
        code: impl Into<String>,
        domain: impl Into<String>,
        audit: Audit,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            code: code.into(),
            description: None,
            domain: domain.into(),
            is_active: true,
            subscription_plan: None,
            audit,
        }
    }
}
