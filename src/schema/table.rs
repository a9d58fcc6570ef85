//! Endpoint schema table.
//!
//! # Responsibilities
//! - Collect endpoint declarations for one API
//! - Flatten them into the lookup list the dispatcher scans
//!
//! # Design Decisions
//! - Nested map keeps "one entry per (endpoint, method)"; re-declaring a
//!   pair replaces the earlier schema
//! - Declaration order is preserved in the flattened list
//! - The flattened list is produced once and never mutated

use axum::http::Method;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::schema::endpoint::Endpoint;
use crate::schema::validate::RequestSchema;

/// Flattened `(endpoint, method, schema)` triple.
#[derive(Clone)]
pub struct RouteSchema {
    pub endpoint: String,
    pub method: Method,
    pub request: Arc<dyn RequestSchema>,
}

impl RouteSchema {
    pub fn matches(&self, method: &Method, endpoint: &str) -> bool {
        self.endpoint == endpoint && self.method == *method
    }
}

impl fmt::Debug for RouteSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteSchema")
            .field("endpoint", &self.endpoint)
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

/// Mapping endpoint → method → request schema for the API marker `A`.
pub struct SchemaTable<A> {
    endpoints: Vec<(String, Vec<(Method, Arc<dyn RequestSchema>)>)>,
    _api: PhantomData<fn() -> A>,
}

impl<A> SchemaTable<A> {
    pub fn new() -> Self {
        Self {
            endpoints: Vec::new(),
            _api: PhantomData,
        }
    }

    /// Declare endpoint `E` with its default request schema.
    pub fn route<E>(self) -> Self
    where
        E: Endpoint<Api = A>,
    {
        self.route_with::<E>(E::request_schema())
    }

    /// Declare endpoint `E` validated by an explicit schema.
    pub fn route_with<E>(mut self, schema: Arc<dyn RequestSchema>) -> Self
    where
        E: Endpoint<Api = A>,
    {
        self.insert(E::PATH, E::METHOD, schema);
        self
    }

    fn insert(&mut self, endpoint: &str, method: Method, schema: Arc<dyn RequestSchema>) {
        let methods = match self.endpoints.iter().position(|(path, _)| path == endpoint) {
            Some(index) => &mut self.endpoints[index].1,
            None => {
                self.endpoints.push((endpoint.to_string(), Vec::new()));
                let last = self.endpoints.len() - 1;
                &mut self.endpoints[last].1
            }
        };
        match methods.iter_mut().find(|(m, _)| *m == method) {
            Some(entry) => entry.1 = schema,
            None => methods.push((method, schema)),
        }
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, endpoint: &str, method: &Method) -> bool {
        self.endpoints
            .iter()
            .filter(|(path, _)| path == endpoint)
            .any(|(_, methods)| methods.iter().any(|(m, _)| m == method))
    }

    /// Number of `(endpoint, method)` pairs.
    pub fn len(&self) -> usize {
        self.endpoints.iter().map(|(_, methods)| methods.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn flatten(self) -> Vec<RouteSchema> {
        self.endpoints
            .into_iter()
            .flat_map(|(endpoint, methods)| {
                methods.into_iter().map(move |(method, request)| RouteSchema {
                    endpoint: endpoint.clone(),
                    method,
                    request,
                })
            })
            .collect()
    }
}

impl<A> Default for SchemaTable<A> {
    fn default() -> Self {
        Self::new()
    }
}
