//! Kernel-facing names that are not ordinary variables.
//!
//! | Source                               | Meaning                              |
//! |--------------------------------------|--------------------------------------|
//! | `inputs.threadId`                    | invocation id as `vec3`              |
//! | `inputs.buffers.NAME[i][j][k]`       | buffer element (row-major, dim 0 fastest) |
//! | `inputs.buffers.NAME[i]` (partial)   | view over the trailing dimensions    |
//! | `inputs.uniforms.NAME`               | uniform value                        |
//! | `inputs.canvas`                      | pixel canvas (`size`, `setPixel`)    |
//! | `types.number` ... `types.boolean`   | parameter type annotations           |
//! | `vec2` `vec3` `vec4` `array` `dim`   | free helpers                         |
//!
//! Helpers may also be reached through any unbound namespace identifier,
//! which is what bundlers emit after renaming imports: `_lib.vec3(...)`,
//! `(0, _lib.vec3)(...)` and `_lib.types.number` resolve to the helper.
//!
//! Resolution is structural: a member expression is flattened into a root
//! identifier plus a list of links, and the whole chain is matched at once.

use crate::layout::{BufferSpec, KernelLayout, UniformSpec};
use crate::types::ElementType;
use crate::{Result, TranspileError};
use swc_core::ecma::ast::{Expr, MemberExpr, MemberProp};

/// Names of the free helper functions.
pub const HELPERS: [&str; 5] = ["vec2", "vec3", "vec4", "array", "dim"];

/// Name of the type literal namespace.
pub const TYPES: &str = "types";

/// Members of the kernel parameter.
const INPUT_MEMBERS: [&str; 4] = ["threadId", "buffers", "uniforms", "canvas"];

/// One step of a member chain.
#[derive(Debug, Clone, Copy)]
pub enum Link<'a> {
    /// `.name`
    Name(&'a str),
    /// `[expr]`
    Index(&'a Expr),
}

/// `root.a[b].c` flattened.
#[derive(Debug, Clone)]
pub struct MemberChain<'a> {
    pub root: &'a str,
    pub links: Vec<Link<'a>>,
}

impl<'a> MemberChain<'a> {
    /// Flatten a member expression whose innermost object is an identifier.
    pub fn from_member(member: &'a MemberExpr) -> Option<Self> {
        let mut links = Vec::new();
        let mut current = member;
        loop {
            match &current.prop {
                MemberProp::Ident(id) => links.push(Link::Name(&*id.sym)),
                MemberProp::Computed(computed) => links.push(Link::Index(&computed.expr)),
                _ => return None,
            }
            match unparen(&current.obj) {
                Expr::Member(inner) => current = inner,
                Expr::Ident(id) => {
                    links.reverse();
                    return Some(Self {
                        root: &*id.sym,
                        links,
                    });
                }
                _ => return None,
            }
        }
    }
}

/// Strip any number of parentheses.
pub fn unparen(expr: &Expr) -> &Expr {
    match expr {
        Expr::Paren(paren) => unparen(&paren.expr),
        other => other,
    }
}

/// Resolved pseudo-variable.
#[derive(Debug, Clone)]
pub enum Pseudo<'a, 'l> {
    ThreadId,
    Buffers,
    Buffer {
        spec: &'l BufferSpec,
        indices: Vec<&'a Expr>,
    },
    Uniforms,
    Uniform(&'l UniformSpec),
    Canvas,
    Types,
    TypeLiteral(ElementType),
    Helper(&'static str),
}

/// What the root identifier of a chain refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootKind {
    /// The kernel parameter.
    Inputs,
    /// Some other variable in scope.
    Bound,
    /// Not bound at all.
    Unbound,
}

/// Type literal by name.
pub fn type_literal(name: &str) -> Option<ElementType> {
    ElementType::ALL.into_iter().find(|e| e.tag() == name)
}

/// Helper by name.
pub fn helper(name: &str) -> Option<&'static str> {
    HELPERS.into_iter().find(|h| *h == name)
}

/// Match a chain against the pseudo-variable forms.
///
/// Returns `Ok(None)` when the chain is not a pseudo-variable as a whole;
/// the caller then resolves the object and the last link separately.
pub fn classify<'a, 'l>(
    chain: &MemberChain<'a>,
    root: RootKind,
    layout: &'l KernelLayout,
) -> Result<Option<Pseudo<'a, 'l>>> {
    match root {
        RootKind::Inputs => classify_inputs(chain, layout),
        RootKind::Bound => Ok(None),
        RootKind::Unbound => classify_namespace(chain),
    }
}

fn classify_inputs<'a, 'l>(
    chain: &MemberChain<'a>,
    layout: &'l KernelLayout,
) -> Result<Option<Pseudo<'a, 'l>>> {
    let root = chain.root;
    match chain.links.as_slice() {
        [Link::Name("threadId")] => Ok(Some(Pseudo::ThreadId)),
        [Link::Name("buffers")] => Ok(Some(Pseudo::Buffers)),
        [Link::Name("buffers"), Link::Name(name), rest @ ..]
            if rest.iter().all(|l| matches!(l, Link::Index(_))) =>
        {
            let spec = layout.buffer(name).ok_or_else(|| {
                TranspileError::unknown_symbol(format!("unknown buffer `{}`", name))
            })?;
            let indices: Vec<&Expr> = rest
                .iter()
                .filter_map(|l| match l {
                    Link::Index(expr) => Some(*expr),
                    Link::Name(_) => None,
                })
                .collect();
            if indices.len() > spec.rank() {
                return Err(TranspileError::dimensionality(format!(
                    "buffer `{}` has {} dimension{} but is indexed {} times",
                    name,
                    spec.rank(),
                    if spec.rank() == 1 { "" } else { "s" },
                    indices.len()
                )));
            }
            Ok(Some(Pseudo::Buffer { spec, indices }))
        }
        [Link::Name("uniforms")] => Ok(Some(Pseudo::Uniforms)),
        [Link::Name("uniforms"), Link::Name(name)] => layout
            .uniform(name)
            .map(|spec| Some(Pseudo::Uniform(spec)))
            .ok_or_else(|| TranspileError::unknown_symbol(format!("unknown uniform `{}`", name))),
        [Link::Name("canvas")] => {
            if layout.canvas.is_some() {
                Ok(Some(Pseudo::Canvas))
            } else {
                Err(TranspileError::unknown_symbol(format!(
                    "`{}.canvas` is used but no canvas is attached",
                    root
                )))
            }
        }
        [Link::Name(name)] if !INPUT_MEMBERS.contains(name) => Err(TranspileError::unknown_symbol(
            format!("`{}.{}` is not a kernel input", root, name),
        )),
        [Link::Index(_), ..] => Err(TranspileError::unsupported(format!(
            "`{}` cannot be indexed",
            root
        ))),
        _ => Ok(None),
    }
}

fn classify_namespace<'a, 'l>(chain: &MemberChain<'a>) -> Result<Option<Pseudo<'a, 'l>>> {
    if chain.root == TYPES {
        return match chain.links.as_slice() {
            [Link::Name(name)] => type_literal(name)
                .map(|e| Some(Pseudo::TypeLiteral(e)))
                .ok_or_else(|| {
                    TranspileError::unknown_symbol(format!("unknown type literal `types.{}`", name))
                }),
            _ => Ok(None),
        };
    }
    match chain.links.as_slice() {
        [Link::Name(TYPES)] => Ok(Some(Pseudo::Types)),
        [Link::Name(TYPES), Link::Name(name)] => type_literal(name)
            .map(|e| Some(Pseudo::TypeLiteral(e)))
            .ok_or_else(|| {
                TranspileError::unknown_symbol(format!("unknown type literal `types.{}`", name))
            }),
        [Link::Name(name)] => Ok(helper(name).map(Pseudo::Helper)),
        _ => Ok(None),
    }
}
