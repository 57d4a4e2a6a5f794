//! Shared system model repository
//!
//! Reconstructed executions refer to hosts, classes, operations and their
//! deployments by interned entity rather than by raw string. The repository
//! is the only state shared between traces processed in parallel, so every
//! registry offers an atomic get-or-create: the same name always yields the
//! same `Arc` handle and never a second identity.
//!
//! ```text
//! ExecutionContainer (host) ──┐
//!                             ├── AllocationComponent ("host::context")
//! ComponentType (class) ── AssemblyComponent (context)
//!        └── Operation (class + signature)
//! ```
//!
//! # Example
//!
//! ```
//! use flowtrace::system_model::SystemModelRepository;
//! use std::sync::Arc;
//!
//! let repository = SystemModelRepository::new();
//! let first = repository.intern_execution_container("srv-1");
//! let second = repository.intern_execution_container("srv-1");
//! assert!(Arc::ptr_eq(&first, &second));
//! assert_eq!(repository.containers().len(), 1);
//! ```

mod entities;
mod registry;

pub use entities::{
    root_allocation, root_operation, AllocationComponent, AssemblyComponent, ComponentType,
    ExecutionContainer, Operation, ROOT_ID, ROOT_NAME,
};
pub use registry::{EntityRegistry, HasId};

use crate::signature::ClassOperationSignaturePair;
use std::sync::Arc;

/// Registries for every entity kind of the system model
#[derive(Debug, Default)]
pub struct SystemModelRepository {
    containers: EntityRegistry<ExecutionContainer>,
    component_types: EntityRegistry<ComponentType>,
    operations: EntityRegistry<Operation>,
    assemblies: EntityRegistry<AssemblyComponent>,
    allocations: EntityRegistry<AllocationComponent>,
}

impl SystemModelRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn containers(&self) -> &EntityRegistry<ExecutionContainer> {
        &self.containers
    }

    pub fn component_types(&self) -> &EntityRegistry<ComponentType> {
        &self.component_types
    }

    pub fn operations(&self) -> &EntityRegistry<Operation> {
        &self.operations
    }

    pub fn assemblies(&self) -> &EntityRegistry<AssemblyComponent> {
        &self.assemblies
    }

    pub fn allocations(&self) -> &EntityRegistry<AllocationComponent> {
        &self.allocations
    }

    pub fn intern_execution_container(&self, hostname: &str) -> Arc<ExecutionContainer> {
        self.containers
            .get_or_create(hostname, |id| ExecutionContainer {
                id,
                name: hostname.to_string(),
            })
    }

    pub fn intern_component_type(&self, fq_class_name: &str) -> Arc<ComponentType> {
        self.component_types.get_or_create(fq_class_name, |id| {
            let (package_name, type_name) = match fq_class_name.rsplit_once('.') {
                Some((package, name)) => (package.to_string(), name.to_string()),
                None => (String::new(), fq_class_name.to_string()),
            };
            ComponentType {
                id,
                package_name,
                type_name,
            }
        })
    }

    pub fn intern_operation(
        &self,
        component_type: &Arc<ComponentType>,
        pair: &ClassOperationSignaturePair,
    ) -> Arc<Operation> {
        let key = format!("{}#{}", component_type.full_name(), pair.signature);
        self.operations.get_or_create(&key, |id| Operation {
            id,
            component_type: Arc::clone(component_type),
            signature: pair.signature.clone(),
        })
    }

    pub fn intern_assembly_component(
        &self,
        name: &str,
        component_type: &Arc<ComponentType>,
    ) -> Arc<AssemblyComponent> {
        self.assemblies.get_or_create(name, |id| AssemblyComponent {
            id,
            name: name.to_string(),
            component_type: Arc::clone(component_type),
        })
    }

    pub fn intern_allocation_component(
        &self,
        assembly: &Arc<AssemblyComponent>,
        container: &Arc<ExecutionContainer>,
    ) -> Arc<AllocationComponent> {
        let key = format!("{}::{}", container.name, assembly.name);
        self.allocations.get_or_create(&key, |id| AllocationComponent {
            id,
            assembly: Arc::clone(assembly),
            container: Arc::clone(container),
        })
    }

    /// Intern everything an execution of `pair` in `context` on `hostname` needs
    pub fn resolve_execution(
        &self,
        hostname: &str,
        context: &str,
        pair: &ClassOperationSignaturePair,
    ) -> (Arc<AllocationComponent>, Arc<Operation>) {
        let container = self.intern_execution_container(hostname);
        let component_type = self.intern_component_type(&pair.fq_class_name);
        let operation = self.intern_operation(&component_type, pair);
        let assembly = self.intern_assembly_component(context, &component_type);
        let allocation = self.intern_allocation_component(&assembly, &container);
        (allocation, operation)
    }
}
