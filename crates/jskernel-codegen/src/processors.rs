//! Resolution of calls, members and indexing against the overload table.

use crate::backend::Backend;
use crate::functions::{FunctionTable, Overload, Receiver, TemplateInput};
use crate::state::WalkState;
use crate::swizzle;
use crate::types::VariableType;
use crate::{Result, TranspileError};

/// Extra facts about an emitted expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprInfo {
    Plain,
    /// A compile-time number.
    Constant(f64),
    /// Known dimension sizes: array length, or the trailing dimensions of a
    /// buffer view.
    Sized(Vec<usize>),
}

/// An emitted expression and its type.
#[derive(Debug, Clone, PartialEq)]
pub struct Typed {
    pub code: String,
    pub ty: VariableType,
    pub info: ExprInfo,
}

impl Typed {
    pub fn new(code: impl Into<String>, ty: VariableType) -> Self {
        Self {
            code: code.into(),
            ty,
            info: ExprInfo::Plain,
        }
    }

    pub fn with_info(mut self, info: ExprInfo) -> Self {
        self.info = info;
        self
    }

    /// Compile-time value, if any.
    pub fn constant(&self) -> Option<f64> {
        match self.info {
            ExprInfo::Constant(value) => Some(value),
            _ => None,
        }
    }

    /// Compile-time value as a non-negative integer.
    pub fn constant_index(&self) -> Option<usize> {
        self.constant()
            .filter(|v| *v >= 0.0 && v.fract() == 0.0 && *v <= u32::MAX as f64)
            .map(|v| v as usize)
    }

    /// Known sizes of an array or buffer view.
    pub fn sizes(&self) -> Option<&[usize]> {
        match &self.info {
            ExprInfo::Sized(sizes) => Some(sizes),
            _ => None,
        }
    }
}

/// Human-readable call signature for diagnostics.
pub fn describe_call(name: &str, receiver: Option<&Typed>, args: &[Typed]) -> String {
    let types: Vec<String> = args.iter().map(|a| a.ty.to_string()).collect();
    match (receiver, name.strip_suffix('u')) {
        (Some(r), _) => format!("{}.{}({})", r.ty, name, types.join(", ")),
        (None, Some(op)) if !op.is_empty() && !op.chars().any(char::is_alphanumeric) => {
            format!("unary `{}` on {}", op, types.join(", "))
        }
        (None, _) if !name.chars().any(char::is_alphanumeric) => {
            format!("`{}` on ({})", name, types.join(", "))
        }
        (None, _) => format!("{}({})", name, types.join(", ")),
    }
}

/// Size a sized overload renders with: array length, buffer view dims, or
/// a constant first operand.
fn resolve_size(first: Option<&Typed>) -> Option<Vec<usize>> {
    let first = first?;
    if let Some(sizes) = first.sizes() {
        return Some(sizes.to_vec());
    }
    first.constant_index().map(|n| vec![n])
}

/// Resolve and render a call, operator or method.
pub fn process_function(
    state: &WalkState<'_>,
    name: &str,
    receiver: Option<&Typed>,
    args: &[Typed],
) -> Result<Typed> {
    let builtin = FunctionTable::builtin();
    let key = match receiver {
        Some(r) => Receiver::Of(r.ty),
        None => Receiver::Standalone,
    };
    let overloads = match receiver {
        None => state
            .overlay
            .overloads(key, name)
            .or_else(|| builtin.overloads(key, name)),
        Some(_) => builtin.overloads(key, name),
    };
    let overloads = overloads.ok_or_else(|| {
        TranspileError::unknown_symbol(match receiver {
            Some(r) => format!("type {} has no method `{}`", r.ty, name),
            None if name.chars().any(char::is_alphanumeric) => {
                format!("unknown function `{}`", name)
            }
            None => format!("unknown operator `{}`", name.trim_end_matches('u')),
        })
    })?;

    let arg_types: Vec<VariableType> = args.iter().map(|a| a.ty).collect();
    let overload = overloads
        .iter()
        .find(|o| o.matches(&arg_types))
        .ok_or_else(|| {
            TranspileError::unknown_symbol(format!(
                "no matching overload for {}",
                describe_call(name, receiver, args)
            ))
        })?;

    render(state, overload, receiver, args, &describe_call(name, receiver, args))
}

fn render(
    state: &WalkState<'_>,
    overload: &Overload,
    receiver: Option<&Typed>,
    args: &[Typed],
    call: &str,
) -> Result<Typed> {
    let size = if overload.uses_size {
        let first = receiver.or_else(|| args.first());
        resolve_size(first).ok_or_else(|| {
            TranspileError::type_mismatch(format!(
                "{} needs a compile-time constant size",
                call
            ))
        })?
    } else {
        Vec::new()
    };

    let codes: Vec<String> = args.iter().map(|a| a.code.clone()).collect();
    let input = TemplateInput::new(receiver.map(|r| r.code.as_str()), &codes, &size);
    let code = overload.template(state.target).render(&input);

    let info = match (overload.return_type, size.as_slice()) {
        (VariableType::Number, [n]) => ExprInfo::Constant(*n as f64),
        (ty, [0, ..]) if ty.is_array() => {
            return Err(TranspileError::type_mismatch(format!(
                "{} would create an empty array",
                call
            )))
        }
        (ty, [n, ..]) if ty.is_array() => ExprInfo::Sized(vec![*n]),
        _ => ExprInfo::Plain,
    };
    Ok(Typed::new(code, overload.return_type).with_info(info))
}

/// Resolve `object.name`: swizzles first, then table properties.
pub fn process_property(state: &WalkState<'_>, object: &Typed, name: &str) -> Result<Typed> {
    if let Some(ty) = swizzle::resolve(&object.ty, name) {
        return Ok(Typed::new(format!("{}.{}", object.code, name), ty));
    }
    if object.ty.is_vector() && name.chars().all(|c| "xyzw".contains(c)) {
        return Err(TranspileError::unknown_symbol(format!(
            "`{}` is not a valid swizzle of {}",
            name, object.ty
        )));
    }

    let builtin = FunctionTable::builtin();
    if let Some(property) = builtin.property(Receiver::Of(object.ty), name) {
        return render(state, property, Some(object), &[], &format!("{}.{}", object.ty, name));
    }
    if builtin.overloads(Receiver::Of(object.ty), name).is_some() {
        return Err(TranspileError::unsupported(format!(
            "method `{}` of {} must be called",
            name, object.ty
        )));
    }
    Err(TranspileError::unknown_symbol(format!(
        "type {} has no member `{}`",
        object.ty, name
    )))
}

/// Resolve `array[index]`.
pub fn process_index(backend: &dyn Backend, array: &Typed, index: &Typed) -> Result<Typed> {
    let element = match array.ty.array_element() {
        Some(element) => element,
        None if matches!(array.ty, VariableType::Buffer { .. }) => {
            return Err(TranspileError::unsupported(
                "buffers must be indexed directly as `inputs.buffers.NAME[i]`",
            ))
        }
        None => {
            return Err(TranspileError::type_mismatch(format!(
                "cannot index a value of type {}",
                array.ty
            )))
        }
    };
    if index.ty != VariableType::Number {
        return Err(TranspileError::type_mismatch(format!(
            "array index must be a number, got {}",
            index.ty
        )));
    }

    let constant = index.constant_index();
    if let (Some(i), Some([len])) = (constant, array.sizes()) {
        if i >= *len {
            return Err(TranspileError::dimensionality(format!(
                "index {} is out of bounds for an array of length {}",
                i, len
            )));
        }
    }

    Ok(Typed::new(
        backend.array_index(&array.code, &index.code, constant),
        element.value_type(),
    ))
}
