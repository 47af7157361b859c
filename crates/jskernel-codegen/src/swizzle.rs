//! Vector swizzle accessors.
//!
//! Swizzles are not listed in the overload table. Any combination of one to
//! four axis letters valid for the vector's arity is accepted: a single
//! letter yields a number, `n` letters yield a `vecN`.

use crate::types::VariableType;

/// Axis letters in component order.
pub const AXES: [char; 4] = ['x', 'y', 'z', 'w'];

/// Resolve `name` as a swizzle of a value of type `ty`.
///
/// Returns `None` if `ty` is not a vector or `name` is not a valid swizzle
/// for its arity.
pub fn resolve(ty: &VariableType, name: &str) -> Option<VariableType> {
    let arity = ty.vector_arity()?;
    let len = name.chars().count();
    if len == 0 || len > 4 {
        return None;
    }
    let valid = &AXES[..arity];
    if !name.chars().all(|c| valid.contains(&c)) {
        return None;
    }
    match len {
        1 => Some(VariableType::Number),
        2 => Some(VariableType::Vec2),
        3 => Some(VariableType::Vec3),
        _ => Some(VariableType::Vec4),
    }
}

/// Component indices addressed by a swizzle, e.g. `"zx"` gives `[2, 0]`.
pub fn indices(name: &str) -> Vec<usize> {
    name.chars()
        .filter_map(|c| AXES.iter().position(|a| *a == c))
        .collect()
}

/// Every swizzle of length 1..=4 for a vector of the given arity.
pub fn all(arity: usize) -> Vec<String> {
    let letters = &AXES[..arity.min(4)];
    let mut out = Vec::new();
    let mut frontier: Vec<String> = vec![String::new()];
    for _ in 0..4 {
        let mut next = Vec::with_capacity(frontier.len() * letters.len());
        for prefix in &frontier {
            for letter in letters {
                let mut name = prefix.clone();
                name.push(*letter);
                next.push(name);
            }
        }
        out.extend(next.iter().cloned());
        frontier = next;
    }
    out
}
