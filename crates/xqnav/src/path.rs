//! Relative path expressions made of axis steps (`E1/axis::test/...`).
//!
//! A [`PathExpr`] is compiled against a [`StaticContext`]: name tests are resolved,
//! every step is statically typed and the ordering mode is captured. The
//! [`CompiledPath`] then evaluates against any node sequence. In ordered mode each step
//! result is deduplicated and sorted into document order, so reverse axes come back in
//! document order here even though the raw [`axis`](crate::axis::axis) iterator yields
//! them nearest first. In unordered mode results are only deduplicated.
use tracing::debug;

use crate::axis::{Axis, InternedName, NodeTest, step};
use crate::context::{OrderingMode, StaticContext};
use crate::error::{Error, ErrorCode};
use crate::model::XdmNode;
use crate::order::normalize;
use crate::static_check::{KindSet, check_step};
use crate::xdm::{XdmItem, XdmSequence, node_sequence};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub axis: Axis,
    pub test: NodeTest,
}

impl Step {
    pub fn new(axis: Axis, test: NodeTest) -> Self {
        Self { axis, test }
    }

    /// The `descendant-or-self::node()` step behind `//`.
    pub fn descendant_or_self() -> Self {
        Self::new(Axis::DescendantOrSelf, NodeTest::AnyKind)
    }
}

/// Build a name test from its lexical form (`name`, `p:name`, `*`, `p:*`, `*:name`).
///
/// Unprefixed names take the default element namespace only on axes whose principal
/// kind is element.
pub fn name_test(ctx: &StaticContext, lexical: &str, axis: Axis) -> Result<NodeTest, Error> {
    let elements = axis.principal_kind() == crate::model::NodeKind::Element;
    match lexical {
        "*" => Ok(NodeTest::Wildcard),
        _ => {
            if let Some(local) = lexical.strip_prefix("*:") {
                return Ok(NodeTest::LocalWildcard(local.into()));
            }
            if let Some(prefix) = lexical.strip_suffix(":*") {
                return match ctx.resolve_prefix(prefix).filter(|_| !prefix.is_empty()) {
                    Some(uri) => Ok(NodeTest::NamespaceWildcard(uri.into())),
                    None => Err(Error::from_code(ErrorCode::XPST0081, format!("unbound prefix '{prefix}'"))),
                };
            }
            let q = ctx.resolve_qname(lexical, elements)?;
            Ok(NodeTest::Name(InternedName::from(&q)))
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PathExpr {
    steps: Vec<Step>,
}

impl PathExpr {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    pub fn step(mut self, axis: Axis, test: NodeTest) -> Self {
        self.steps.push(Step::new(axis, test));
        self
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Type the steps against `context_kinds`, the kinds the context item may have.
    pub fn compile(self, context_kinds: KindSet, ctx: &StaticContext) -> Result<CompiledPath, Error> {
        let mut kinds = context_kinds;
        for s in &self.steps {
            kinds = check_step(kinds, s.axis, &s.test, ctx)?;
        }
        debug!(steps = self.steps.len(), ordering = %ctx.ordering, result = ?kinds, "path compiled");
        Ok(CompiledPath { steps: self.steps, ordering: ctx.ordering, result_kinds: kinds })
    }
}

#[derive(Debug, Clone)]
pub struct CompiledPath {
    steps: Vec<Step>,
    ordering: OrderingMode,
    result_kinds: KindSet,
}

impl CompiledPath {
    pub fn ordering(&self) -> OrderingMode {
        self.ordering
    }

    /// Kinds the path can return; empty when static typing was off and a step was
    /// statically impossible.
    pub fn result_kinds(&self) -> KindSet {
        self.result_kinds
    }

    /// Evaluate with every item of `input` as context item. Atomic context items are a
    /// type error (XPTY0020).
    pub fn evaluate<N: XdmNode>(&self, input: &XdmSequence<N>) -> Result<XdmSequence<N>, Error> {
        let mut current = Vec::with_capacity(input.len());
        for item in input {
            match item {
                XdmItem::Node(n) => current.push(n.clone()),
                XdmItem::Atomic(a) => {
                    return Err(Error::from_code(
                        ErrorCode::XPTY0020,
                        format!("context item of an axis step is an atomic value ({})", a.type_name()),
                    ));
                }
            }
        }
        Ok(node_sequence(self.evaluate_nodes(current)))
    }

    pub fn evaluate_nodes<N: XdmNode>(&self, mut current: Vec<N>) -> Vec<N> {
        if self.result_kinds.is_empty() {
            return Vec::new();
        }
        for s in &self.steps {
            let next: Vec<N> = current.iter().flat_map(|n| step(n, s.axis, &s.test)).collect();
            current = normalize(next, self.ordering);
        }
        current
    }
}
