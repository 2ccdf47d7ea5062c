//! Rewrites expression ASTs from one dialect into the other.
//!
//! Translation is total: whatever cannot be rewritten is left as it is and
//! reported as a `ReviewReason` alongside the rewritten tree.

mod scope;

pub use scope::{NodeRef, ReferenceTable, TranslationScope, Upstream};

use crate::ast::{Accessor, Expression, IndexKey, Root};
use crate::dialect::{Builtin, Platform, RootKind};
use crate::review::ReviewReason;

/// Where the expression being translated lives.
pub struct TranslationContext<'a> {
    /// Source key of the node owning the expression.
    pub node_key: &'a str,
    pub scope: &'a dyn TranslationScope,
}

/// A rewritten expression and everything that kept it from being a clean
/// translation.
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub expression: Expression,
    pub issues: Vec<ReviewReason>,
}

impl Translation {
    pub fn has_unknown_function(&self) -> bool {
        self.issues
            .iter()
            .any(|i| matches!(i, ReviewReason::UnknownFunction(_)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Translator {
    from: Platform,
    to: Platform,
}

impl Translator {
    pub fn new(from: Platform, to: Platform) -> Self {
        Self { from, to }
    }

    pub fn source(&self) -> Platform {
        self.from
    }

    pub fn target(&self) -> Platform {
        self.to
    }

    /// Rewrites a source-dialect expression into the target dialect.
    pub fn to_target(&self, expr: &Expression, ctx: &TranslationContext) -> Translation {
        rewrite_top(expr, ctx, self.from, self.to)
    }

    /// Rewrites a target-dialect expression back into the source dialect.
    /// The scope in `ctx` must describe the workflow on the target side.
    pub fn to_source(&self, expr: &Expression, ctx: &TranslationContext) -> Translation {
        rewrite_top(expr, ctx, self.to, self.from)
    }
}

fn rewrite_top(
    expr: &Expression,
    ctx: &TranslationContext,
    from: Platform,
    to: Platform,
) -> Translation {
    if from == to {
        return Translation {
            expression: expr.clone(),
            issues: Vec::new(),
        };
    }
    let mut rewriter = Rewriter {
        ctx,
        from,
        to,
        issues: Vec::new(),
    };
    let expression = rewriter.rewrite(expr);
    Translation {
        expression,
        issues: rewriter.issues,
    }
}

struct Rewriter<'c, 'a> {
    ctx: &'c TranslationContext<'a>,
    from: Platform,
    to: Platform,
    issues: Vec<ReviewReason>,
}

impl Rewriter<'_, '_> {
    fn rewrite(&mut self, expr: &Expression) -> Expression {
        match expr {
            Expression::Literal(_) => expr.clone(),
            Expression::VariableRoot(root) => self.rewrite_root(root, &[]),
            Expression::PropertyAccess { base, path } => match base.as_ref() {
                Expression::VariableRoot(root) => self.rewrite_root(root, path),
                other => {
                    let base = self.rewrite(other);
                    Expression::access(base, path.clone())
                }
            },
            Expression::FunctionCall { name, args } => Expression::FunctionCall {
                name: self.rewrite_function(name),
                args: args.iter().map(|a| self.rewrite(a)).collect(),
            },
            Expression::Concatenation(parts) => {
                Expression::Concatenation(parts.iter().map(|p| self.rewrite(p)).collect())
            }
        }
    }

    fn rewrite_function(&mut self, name: &str) -> String {
        if let Some(builtin) = Builtin::from_name(name, self.from) {
            return builtin.name(self.to).to_string();
        }
        if Builtin::from_name(name, self.to).is_none() {
            self.flag(ReviewReason::UnknownFunction(name.to_string()));
        }
        name.to_string()
    }

    /// Rewrites a root together with the accessor chain that follows it, since
    /// `$node["Name"].json` collapses into a single positional root.
    fn rewrite_root(&mut self, root: &Root, path: &[Accessor]) -> Expression {
        let unchanged = || Expression::access(Expression::VariableRoot(root.clone()), path.to_vec());

        match self.from.classify_root(root) {
            RootKind::Environment | RootKind::Now => {
                let kind = self.from.classify_root(root);
                match self.to.root_name(kind) {
                    Some(name) => Expression::access(Expression::named(name), path.to_vec()),
                    None => unchanged(),
                }
            }
            RootKind::JsonContext => match self.upstream_reference() {
                Some(node) => Expression::access(node, path.to_vec()),
                None => unchanged(),
            },
            RootKind::NodeByName => match split_node_access(path) {
                Some((name, rest)) => match self.ctx.scope.by_source_name(name) {
                    Some(node) => match self.reference_to(node) {
                        Some(base) => Expression::access(base, rest.to_vec()),
                        None => {
                            self.flag(ReviewReason::UnresolvedReference(unchanged().to_string()));
                            unchanged()
                        }
                    },
                    None => {
                        self.flag(ReviewReason::UnresolvedReference(format!(
                            "$node[{}]",
                            crate::ast::quote(name)
                        )));
                        unchanged()
                    }
                },
                None => {
                    self.flag(ReviewReason::UnresolvedReference(unchanged().to_string()));
                    unchanged()
                }
            },
            RootKind::Positional => {
                let Root::Positional(position) = root else {
                    return unchanged();
                };
                self.rewrite_positional(*position, path)
                    .unwrap_or_else(|| {
                        self.flag(ReviewReason::UnresolvedReference(root.to_string()));
                        unchanged()
                    })
            }
            RootKind::Unknown => {
                // Roots that already belong to the target dialect stay as they are.
                if self.to.classify_root(root) == RootKind::Unknown {
                    self.flag(ReviewReason::UnresolvedReference(root.to_string()));
                }
                unchanged()
            }
        }
    }

    /// Resolves `$json` to the node feeding the current one.
    fn upstream_reference(&mut self) -> Option<Expression> {
        let scope = self.ctx.scope;
        let node = match scope.upstream(self.ctx.node_key) {
            Upstream::Single(node) => node,
            Upstream::Ambiguous { first, count } => {
                self.flag(ReviewReason::AmbiguousPredecessor {
                    used: first.source_key.clone(),
                    count,
                });
                first
            }
            Upstream::None => {
                self.flag(ReviewReason::UnresolvedReference(format!(
                    "{} (no upstream node)",
                    self.from
                        .root_name(RootKind::JsonContext)
                        .unwrap_or("$json")
                )));
                return None;
            }
        };
        let reference = self.reference_to(node);
        if reference.is_none() {
            self.flag(ReviewReason::UnresolvedReference(node.source_key.clone()));
        }
        reference
    }

    fn rewrite_positional(&mut self, position: u64, path: &[Accessor]) -> Option<Expression> {
        let node = self.ctx.scope.by_source_position(position)?;
        let is_sole_upstream = matches!(
            self.ctx.scope.upstream(self.ctx.node_key),
            Upstream::Single(up) if up.source_position == Some(position)
        );
        let base = match self.to.root_name(RootKind::JsonContext) {
            Some(json) if is_sole_upstream => Expression::named(json),
            _ => self.reference_to(node)?,
        };
        Some(Expression::access(base, path.to_vec()))
    }

    /// How the target dialect addresses another node's output.
    fn reference_to(&self, node: &NodeRef) -> Option<Expression> {
        match self.to {
            Platform::FlowGraph => node.target_position.map(Expression::positional),
            Platform::NodeGraph => {
                let root = self.to.root_name(RootKind::NodeByName)?;
                Some(Expression::access(
                    Expression::named(root),
                    vec![
                        Accessor::Index(IndexKey::Key(node.target_name.clone())),
                        Accessor::Field("json".to_string()),
                    ],
                ))
            }
        }
    }

    fn flag(&mut self, issue: ReviewReason) {
        if !self.issues.contains(&issue) {
            self.issues.push(issue);
        }
    }
}

/// Splits `["Name"].json.rest` into the node name and `rest`.
fn split_node_access(path: &[Accessor]) -> Option<(&str, &[Accessor])> {
    let name = match path.first()? {
        Accessor::Index(IndexKey::Key(name)) | Accessor::Field(name) => name.as_str(),
        Accessor::Index(IndexKey::Position(_)) => return None,
    };
    match path.get(1)? {
        Accessor::Field(field) if field == "json" => Some((name, &path[2..])),
        _ => None,
    }
}
