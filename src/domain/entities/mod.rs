pub mod external_reference;
pub mod processed_event;
pub mod signup_intent;
pub mod subscription_plan;
pub mod tenant_billing;
