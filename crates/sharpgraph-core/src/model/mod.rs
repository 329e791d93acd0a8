//! Graph model: code elements, their properties and the relationships they own.

mod edge;
mod element;
mod property;

pub use edge::{EdgeKind, Endpoint, Relationship};
pub use element::{
    CodeElement, ElementDetails, ElementKind, InvokedMethodContext, MethodDetails, VariableContext,
};
pub use property::{PropertyMap, PropertyValue};
