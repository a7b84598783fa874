//! Node model and navigation core for XPath/XQuery 3.0 processors.
//!
//! Trees are immutable arenas ([`tree`]); navigation ([`axis`]), document order
//! ([`order`]), set operators ([`set_ops`]) and accessors are generic over the
//! [`XdmNode`] adapter trait. Construction ([`construct`]) honours the copy-namespaces
//! mode and ordering-sensitive operations honour the ordering mode of the
//! [`StaticContext`](context::StaticContext) they are given.
pub mod accessors;
pub mod axis;
pub mod consts;
pub mod construct;
pub mod context;
pub mod error;
pub mod model;
pub mod namespaces;
pub mod order;
pub mod path;
pub mod set_ops;
pub mod static_check;
pub mod tree;
pub mod xdm;

pub use axis::{Axis, AxisIter, NodeTest, StepIter, axis, step};
pub use context::{OrderingMode, Prolog, StaticContext, StaticContextBuilder};
pub use error::{Error, ErrorClass, ErrorCode};
pub use model::{NodeKind, OrderKey, QName, XdmNode};
pub use namespaces::{CopyNamespacesMode, InScopeNamespaces, NamespaceBinding};
pub use tree::{Node, NodeId, Tree, TreeBuilder};
pub use xdm::{ExpandedName, XdmAtomicValue, XdmItem, XdmSequence};
