//! Mock payment gateway with programmable responses and call counters.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{Duration, Utc};

use crate::{
    app_error::{AppError, AppResult},
    application::ports::payment_gateway::{CreatePreapproval, PaymentGatewayPort, Preapproval},
};

#[derive(Default)]
pub struct MockGateway {
    pub preapprovals: Mutex<HashMap<String, Preapproval>>,
    pub created: Mutex<Vec<CreatePreapproval>>,
    pub create_calls: AtomicUsize,
    pub get_calls: AtomicUsize,
    pub cancel_calls: AtomicUsize,
    pub fail_create: AtomicBool,
    pub fail_get: AtomicBool,
    pub fail_cancel: AtomicBool,
    counter: AtomicUsize,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_preapproval(&self, id: &str, status: &str, external_reference: Option<&str>) {
        self.preapprovals.lock().unwrap().insert(
            id.to_string(),
            Preapproval {
                id: id.to_string(),
                status: status.to_string(),
                external_reference: external_reference.map(str::to_string),
                payer_email: Some("payer@example.com".to_string()),
                preapproval_plan_id: Some("plan_ext_test".to_string()),
                next_payment_date: Some(Utc::now() + Duration::days(30)),
                init_point: None,
            },
        );
    }

    pub fn last_created(&self) -> Option<CreatePreapproval> {
        self.created.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl PaymentGatewayPort for MockGateway {
    async fn create_preapproval(&self, input: &CreatePreapproval) -> AppResult<Preapproval> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(AppError::Upstream("gateway unavailable".into()));
        }

        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let preapproval = Preapproval {
            id: format!("pa_test_{n}"),
            status: "pending".to_string(),
            external_reference: Some(input.external_reference.clone()),
            payer_email: Some(input.payer_email.clone()),
            preapproval_plan_id: Some(input.preapproval_plan_id.clone()),
            next_payment_date: None,
            init_point: Some(format!("https://gateway.test/checkout/pa_test_{n}")),
        };
        self.preapprovals
            .lock()
            .unwrap()
            .insert(preapproval.id.clone(), preapproval.clone());
        self.created.lock().unwrap().push(input.clone());
        Ok(preapproval)
    }

    async fn get_preapproval(&self, id: &str) -> AppResult<Preapproval> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(AppError::Upstream("gateway unavailable".into()));
        }
        self.preapprovals
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or(AppError::NotFound)
    }

    async fn cancel_preapproval(&self, id: &str) -> AppResult<Preapproval> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_cancel.load(Ordering::SeqCst) {
            return Err(AppError::Upstream("gateway unavailable".into()));
        }
        let mut preapprovals = self.preapprovals.lock().unwrap();
        let preapproval = preapprovals.get_mut(id).ok_or(AppError::NotFound)?;
        preapproval.status = "cancelled".to_string();
        Ok(preapproval.clone())
    }
}
