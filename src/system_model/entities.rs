use super::registry::HasId;
use crate::signature::Signature;
use serde::Serialize;
use std::sync::Arc;

/// Id shared by all synthetic root entities
pub const ROOT_ID: u32 = 0;

/// Name shared by all synthetic root entities
pub const ROOT_NAME: &str = "$";

/// A host (or any other deployment node) executing monitored code
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ExecutionContainer {
    pub id: u32,
    pub name: String,
}

/// A class, identified by its fully-qualified name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ComponentType {
    pub id: u32,
    pub package_name: String,
    pub type_name: String,
}

impl ComponentType {
    pub fn full_name(&self) -> String {
        if self.package_name.is_empty() {
            self.type_name.clone()
        } else {
            format!("{}.{}", self.package_name, self.type_name)
        }
    }
}

/// An operation of a component type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Operation {
    pub id: u32,
    pub component_type: Arc<ComponentType>,
    pub signature: Signature,
}

/// A named instance of a component type (the execution context)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AssemblyComponent {
    pub id: u32,
    pub name: String,
    pub component_type: Arc<ComponentType>,
}

/// An assembly component deployed on an execution container
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AllocationComponent {
    pub id: u32,
    pub assembly: Arc<AssemblyComponent>,
    pub container: Arc<ExecutionContainer>,
}

impl AllocationComponent {
    /// `host::context`, the allocation's named identifier
    pub fn name(&self) -> String {
        format!("{}::{}", self.container.name, self.assembly.name)
    }
}

impl HasId for ExecutionContainer {
    fn id(&self) -> u32 {
        self.id
    }
}

impl HasId for ComponentType {
    fn id(&self) -> u32 {
        self.id
    }
}

impl HasId for Operation {
    fn id(&self) -> u32 {
        self.id
    }
}

impl HasId for AssemblyComponent {
    fn id(&self) -> u32 {
        self.id
    }
}

impl HasId for AllocationComponent {
    fn id(&self) -> u32 {
        self.id
    }
}

fn root_component_type() -> Arc<ComponentType> {
    Arc::new(ComponentType {
        id: ROOT_ID,
        package_name: String::new(),
        type_name: ROOT_NAME.to_string(),
    })
}

/// Operation of the synthetic root execution
pub fn root_operation() -> Arc<Operation> {
    Arc::new(Operation {
        id: ROOT_ID,
        component_type: root_component_type(),
        signature: Signature::new(ROOT_NAME, &[], None, &[]),
    })
}

/// Allocation of the synthetic root execution
pub fn root_allocation() -> Arc<AllocationComponent> {
    let component_type = root_component_type();
    Arc::new(AllocationComponent {
        id: ROOT_ID,
        assembly: Arc::new(AssemblyComponent {
            id: ROOT_ID,
            name: ROOT_NAME.to_string(),
            component_type,
        }),
        container: Arc::new(ExecutionContainer {
            id: ROOT_ID,
            name: ROOT_NAME.to_string(),
        }),
    })
}
