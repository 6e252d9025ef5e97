//! # Schema Registry
//!
//! The session-scoped store of resolved schema, produced once per connection by
//! discovery and read-only afterwards.
//!
//! Lookups are pure and never fatal: an unknown symbol yields `None`, which callers
//! must treat as "this file or service was not resolvable" and skip it when
//! enumerating. Enumeration order is fixed by the discovery session: services in
//! server-reported order, methods in declaration order.
use crate::reflection::client::DiscoveredSchema;
use prost_reflect::{
    DescriptorError, DescriptorPool, MessageDescriptor, MethodDescriptor, ServiceDescriptor,
};

/// An in-memory store of type and file definitions, indexed by fully-qualified name.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    pool: DescriptorPool,
    service_symbols: Vec<String>,
    file_names: Vec<String>,
}

impl SchemaRegistry {
    /// Builds a registry from the output of a discovery session.
    pub fn from_discovered(schema: DiscoveredSchema) -> Result<Self, DescriptorError> {
        let file_names = schema
            .file_descriptor_set
            .file
            .iter()
            .map(|fd| fd.name().to_string())
            .collect();

        let pool = DescriptorPool::from_file_descriptor_set(schema.file_descriptor_set)?;

        Ok(Self {
            pool,
            service_symbols: schema.service_symbols,
            file_names,
        })
    }

    /// The discovered service symbols, in server-reported order. A symbol may be
    /// present here without resolving via [`Self::find_service`] if its file could
    /// not be fetched during discovery.
    pub fn service_symbols(&self) -> &[String] {
        &self.service_symbols
    }

    /// The resolved file names, in first-resolution order. Each file appears once.
    pub fn file_names(&self) -> &[String] {
        &self.file_names
    }

    /// Looks up a service by its fully-qualified name.
    pub fn find_service(&self, symbol: &str) -> Option<ServiceDescriptor> {
        self.pool.get_service_by_name(symbol)
    }

    /// The methods of `service`, in declaration order.
    pub fn methods_of(&self, service: &ServiceDescriptor) -> Vec<MethodDescriptor> {
        service.methods().collect()
    }

    /// Looks up a message type by its fully-qualified name.
    pub fn resolve_type(&self, symbol: &str) -> Option<MessageDescriptor> {
        self.pool.get_message_by_name(symbol)
    }

    /// Every invokable method, as `(simple name, descriptor)` pairs.
    ///
    /// Ordered by discovery order of services, then declaration order of methods.
    /// Services whose schema was not resolvable contribute nothing.
    pub fn list_methods(&self) -> Vec<(String, MethodDescriptor)> {
        self.service_symbols
            .iter()
            .filter_map(|symbol| self.find_service(symbol))
            .flat_map(|service| service.methods().collect::<Vec<_>>())
            .map(|method| (method.name().to_string(), method))
            .collect()
    }
}
