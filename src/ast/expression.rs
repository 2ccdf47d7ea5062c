use super::Literal;
use std::fmt;

/// The root an expression reads its data from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Root {
    /// A named root such as `$json`, `$env` or `env`.
    Named(String),
    /// A numeric reference to another node's output, e.g. `1` in `1.text`.
    Positional(u64),
}

impl fmt::Display for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Root::Named(name) => write!(f, "{}", name),
            Root::Positional(id) => write!(f, "{}", id),
        }
    }
}

/// The key inside a `[...]` accessor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexKey {
    Position(i64),
    Key(String),
}

/// One step of a property access chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Accessor {
    Field(String),
    Index(IndexKey),
}

/// The Abstract Syntax Tree of a single embedded expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Literal),
    VariableRoot(Root),
    PropertyAccess {
        base: Box<Expression>,
        path: Vec<Accessor>,
    },
    FunctionCall {
        name: String,
        args: Vec<Expression>,
    },
    Concatenation(Vec<Expression>),
}

impl Expression {
    pub fn named(name: &str) -> Self {
        Expression::VariableRoot(Root::Named(name.to_string()))
    }

    pub fn positional(id: u64) -> Self {
        Expression::VariableRoot(Root::Positional(id))
    }

    /// Builds a property access, merging with an existing access on `base`.
    pub fn access(base: Expression, path: Vec<Accessor>) -> Self {
        if path.is_empty() {
            return base;
        }
        match base {
            Expression::PropertyAccess {
                base: inner,
                path: mut inner_path,
            } => {
                inner_path.extend(path);
                Expression::PropertyAccess {
                    base: inner,
                    path: inner_path,
                }
            }
            other => Expression::PropertyAccess {
                base: Box::new(other),
                path,
            },
        }
    }

    /// Collects every function name called anywhere in the tree.
    pub fn collect_function_names<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Expression::FunctionCall { name, args } => {
                names.push(name);
                for arg in args {
                    arg.collect_function_names(names);
                }
            }
            Expression::PropertyAccess { base, .. } => base.collect_function_names(names),
            Expression::Concatenation(parts) => {
                for part in parts {
                    part.collect_function_names(names);
                }
            }
            Expression::Literal(_) | Expression::VariableRoot(_) => {}
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(v) => write!(f, "{}", v),
            Expression::VariableRoot(root) => write!(f, "{}", root),
            Expression::PropertyAccess { base, path } => {
                if matches!(**base, Expression::Concatenation(_)) {
                    write!(f, "({})", base)?;
                } else {
                    write!(f, "{}", base)?;
                }
                for accessor in path {
                    write!(f, "{}", accessor)?;
                }
                Ok(())
            }
            Expression::FunctionCall { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expression::Concatenation(parts) => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, " + ")?;
                    }
                    write!(f, "{}", part)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Accessor::Field(name) if is_identifier(name) => write!(f, ".{}", name),
            Accessor::Field(name) => write!(f, "[{}]", super::quote(name)),
            Accessor::Index(IndexKey::Position(i)) => write!(f, "[{}]", i),
            Accessor::Index(IndexKey::Key(k)) => write!(f, "[{}]", super::quote(k)),
        }
    }
}

/// Whether `name` can be written after a `.` without quoting.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// A wrapper that prints an expression as an indented tree.
/// Used by the CLI's `explain` command to show how a string was parsed.
pub struct ExpressionTree<'a> {
    pub expr: &'a Expression,
}

impl<'a> fmt::Display for ExpressionTree<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_as_tree(self.expr, f, "", true)
    }
}

impl<'a> ExpressionTree<'a> {
    fn fmt_as_tree(
        &self,
        expr: &Expression,
        f: &mut fmt::Formatter<'_>,
        prefix: &str,
        is_last: bool,
    ) -> fmt::Result {
        let node_marker = if is_last { "└── " } else { "├── " };
        write!(f, "{}{}", prefix, node_marker)?;

        let child_prefix = format!("{}{}", prefix, if is_last { "    " } else { "│   " });

        match expr {
            Expression::Literal(v) => writeln!(f, "Literal: {}", v)?,
            Expression::VariableRoot(root) => writeln!(f, "Root: {}", root)?,
            Expression::PropertyAccess { base, path } => {
                let chain: String = path.iter().map(|a| a.to_string()).collect();
                writeln!(f, "Access: {}", chain)?;
                self.fmt_as_tree(base, f, &child_prefix, true)?;
            }
            Expression::FunctionCall { name, args } => {
                writeln!(f, "Call: {}", name)?;
                self.fmt_children(args, f, &child_prefix)?;
            }
            Expression::Concatenation(parts) => {
                writeln!(f, "Concat (+)")?;
                self.fmt_children(parts, f, &child_prefix)?;
            }
        }
        Ok(())
    }

    fn fmt_children(
        &self,
        children: &[Expression],
        f: &mut fmt::Formatter<'_>,
        prefix: &str,
    ) -> fmt::Result {
        for (i, child) in children.iter().enumerate() {
            self.fmt_as_tree(child, f, prefix, i + 1 == children.len())?;
        }
        Ok(())
    }
}
