use uuid::Uuid;

/// The reference string this system attaches at subscription creation and
/// the gateway echoes back on every notification. It round-trips through an
/// external system that does not validate its content, so parsing must
/// tolerate anything and answer `Unknown` instead of failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalReference {
    Tenant { tenant_id: i64, plan_key: String },
    Signup { intent_id: String },
    Unknown,
}

impl ExternalReference {
    pub fn for_tenant(tenant_id: i64, plan_key: &str) -> String {
        format!("tenant:{tenant_id}:plan:{plan_key}")
    }

    pub fn for_signup(intent_id: Uuid) -> String {
        format!("signup:{intent_id}")
    }

    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return ExternalReference::Unknown;
        };
        let parts: Vec<&str> = raw.split(':').collect();
        match parts.as_slice() {
            ["tenant", id, "plan", key] if !key.is_empty() => match id.parse::<i64>() {
                Ok(tenant_id) => ExternalReference::Tenant {
                    tenant_id,
                    plan_key: (*key).to_string(),
                },
                Err(_) => ExternalReference::Unknown,
            },
            ["signup", id] if !id.is_empty() => ExternalReference::Signup {
                intent_id: (*id).to_string(),
            },
            _ => ExternalReference::Unknown,
        }
    }
}
