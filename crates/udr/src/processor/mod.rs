//! Data repository processor: the Nudr_DR resources the SBI server exposes.
//!
//! Documents are kept in memory. Each resource supports the subset of
//! query/create/modify/remove operations Nudr_DR defines for it.

pub mod handlers;
pub mod patch;
pub mod store;

use std::future::Future;

use axum::{extract::Request, http::Method, response::Response};

use crate::sbi::Route;

pub use store::DocumentStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Query,
    Replace,
    Modify,
    Remove,
}

impl Operation {
    fn method(self) -> Method {
        match self {
            Operation::Query => Method::GET,
            Operation::Replace => Method::PUT,
            Operation::Modify => Method::PATCH,
            Operation::Remove => Method::DELETE,
        }
    }
}

const AUTH_SUBSCRIPTION: &str = "/subscription-data/:ueId/authentication-data/authentication-subscription";
const AM_DATA: &str = "/subscription-data/:ueId/:servingPlmnId/provisioned-data/am-data";
const SM_DATA: &str = "/subscription-data/:ueId/:servingPlmnId/provisioned-data/sm-data";
const SMF_SELECTION_DATA: &str =
    "/subscription-data/:ueId/:servingPlmnId/provisioned-data/smf-selection-subscription-data";
const AMF_3GPP_ACCESS: &str = "/subscription-data/:ueId/context-data/amf-3gpp-access";
const AM_POLICY_DATA: &str = "/policy-data/ues/:ueId/am-data";
const SM_POLICY_DATA: &str = "/policy-data/ues/:ueId/sm-data";

/// `(operation name, operation, pattern)` for every exposed endpoint.
const ENDPOINTS: [(&str, Operation, &str); 18] = [
    ("QueryAuthSubsData", Operation::Query, AUTH_SUBSCRIPTION),
    ("CreateAuthenticationSubscription", Operation::Replace, AUTH_SUBSCRIPTION),
    ("ModifyAuthenticationSubscription", Operation::Modify, AUTH_SUBSCRIPTION),
    ("RemoveAuthenticationSubscription", Operation::Remove, AUTH_SUBSCRIPTION),
    ("QueryAmData", Operation::Query, AM_DATA),
    ("CreateAmData", Operation::Replace, AM_DATA),
    ("QuerySmData", Operation::Query, SM_DATA),
    ("CreateSmData", Operation::Replace, SM_DATA),
    ("QuerySmfSelectData", Operation::Query, SMF_SELECTION_DATA),
    ("CreateSmfSelectData", Operation::Replace, SMF_SELECTION_DATA),
    ("QueryAmfContext3gpp", Operation::Query, AMF_3GPP_ACCESS),
    ("CreateAmfContext3gpp", Operation::Replace, AMF_3GPP_ACCESS),
    ("AmfContext3gpp", Operation::Modify, AMF_3GPP_ACCESS),
    ("ReadAccessAndMobilityPolicyData", Operation::Query, AM_POLICY_DATA),
    ("CreateAccessAndMobilityPolicyData", Operation::Replace, AM_POLICY_DATA),
    ("DeleteAccessAndMobilityPolicyData", Operation::Remove, AM_POLICY_DATA),
    ("ReadSessionManagementPolicyData", Operation::Query, SM_POLICY_DATA),
    ("UpdateSessionManagementPolicyData", Operation::Modify, SM_POLICY_DATA),
];

/// Serves the Nudr_DR resources out of a [`DocumentStore`].
#[derive(Clone, Default)]
pub struct Processor {
    store: DocumentStore,
}

impl Processor {
    pub fn new(store: DocumentStore) -> Self {
        Self { store }
    }

    /// Route entries for the data repository group, in registration order.
    pub fn data_repository_routes(&self) -> Vec<Route> {
        ENDPOINTS
            .iter()
            .map(|&(name, op, pattern)| match op {
                Operation::Query => self.route(name, op, pattern, handlers::query),
                Operation::Replace => self.route(name, op, pattern, handlers::replace),
                Operation::Modify => self.route(name, op, pattern, handlers::modify),
                Operation::Remove => self.route(name, op, pattern, handlers::remove),
            })
            .collect()
    }

    fn route<F, Fut>(&self, name: &'static str, op: Operation, pattern: &'static str, f: F) -> Route
    where
        F: Fn(DocumentStore, Request) -> Fut + Copy + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        let store = self.store.clone();
        Route::new(name, op.method(), pattern, move |req| f(store.clone(), req))
    }
}
