//! Reference vector library for CPU programs.
//!
//! Emitted JavaScript calls vector methods (`a.add(b)`, `v.length()`,
//! `v.xyz`) on values built by `vec2`/`vec3`/`vec4`. Hosts that do not ship
//! their own implementation can evaluate [`vector_library`] and pass the
//! result as the `lib` argument.

/// JavaScript expression evaluating to `{ vec2, vec3, vec4 }`.
///
/// Vectors are frozen; every operation returns a new vector. Constructors
/// accept a single number (splat) or any mix of numbers and vectors whose
/// component counts add up to the arity.
pub fn vector_library() -> &'static str {
    VECTOR_LIBRARY
}

const VECTOR_LIBRARY: &str = r#"(() => {
    "use strict";
    const LETTERS = ["x", "y", "z", "w"];
    const ctors = {};

    const flatten = (args) => {
        const out = [];
        for (const a of args) {
            if (typeof a === "number") {
                out.push(a);
            } else {
                out.push(...a.toArray());
            }
        }
        return out;
    };

    const define = (n) => {
        const keys = LETTERS.slice(0, n);
        class Vec {
            constructor(values) {
                keys.forEach((k, i) => {
                    this[k] = values[i];
                });
                Object.freeze(this);
            }
            toArray() {
                return keys.map((k) => this[k]);
            }
            map(f) {
                return new Vec(keys.map((k) => f(this[k])));
            }
            zip(o, f) {
                const b = typeof o === "number" ? keys.map(() => o) : o.toArray();
                return new Vec(keys.map((k, i) => f(this[k], b[i])));
            }
            add(o) { return this.zip(o, (a, b) => a + b); }
            sub(o) { return this.zip(o, (a, b) => a - b); }
            mul(o) { return this.zip(o, (a, b) => a * b); }
            div(o) { return this.zip(o, (a, b) => a / b); }
            mod(o) { return this.zip(o, (a, b) => a % b); }
            neg() { return this.map((a) => -a); }
            min(o) { return this.zip(o, Math.min); }
            max(o) { return this.zip(o, Math.max); }
            clamp(lo, hi) { return this.max(lo).min(hi); }
            mix(o, t) { return this.zip(o, (a, b) => a * (1 - t) + b * t); }
            dot(o) { return keys.reduce((s, k) => s + this[k] * o[k], 0); }
            length() { return Math.sqrt(this.dot(this)); }
            distance(o) { return this.sub(o).length(); }
            normalize() { return this.div(this.length()); }
            abs() { return this.map(Math.abs); }
            floor() { return this.map(Math.floor); }
            ceil() { return this.map(Math.ceil); }
            fract() { return this.map((a) => a - Math.floor(a)); }
            sign() { return this.map(Math.sign); }
            sqrt() { return this.map(Math.sqrt); }
            sin() { return this.map(Math.sin); }
            cos() { return this.map(Math.cos); }
            exp() { return this.map(Math.exp); }
            log() { return this.map(Math.log); }
            equals(o) { return keys.every((k) => this[k] === o[k]); }
            toString() { return `vec${n}(${this.toArray().join(", ")})`; }
        }

        const swizzle = (prefix) => {
            if (prefix.length >= 2) {
                Object.defineProperty(Vec.prototype, prefix.join(""), {
                    get() {
                        return ctors[prefix.length](prefix.map((k) => this[k]));
                    },
                });
            }
            if (prefix.length < 4) {
                keys.forEach((k) => swizzle([...prefix, k]));
            }
        };
        swizzle([]);

        ctors[n] = (values) => new Vec(values);
        return (...args) => {
            const values = flatten(args);
            if (values.length === 1) {
                return new Vec(keys.map(() => values[0]));
            }
            if (values.length !== n) {
                throw new TypeError(`vec${n} needs ${n} components, got ${values.length}`);
            }
            return new Vec(values);
        };
    };

    const vec2 = define(2);
    const vec3 = define(3);
    const vec4 = define(4);

    Object.defineProperty(Object.getPrototypeOf(vec3(0)), "cross", {
        value(o) {
            return vec3(
                this.y * o.z - this.z * o.y,
                this.z * o.x - this.x * o.z,
                this.x * o.y - this.y * o.x
            );
        },
    });

    return { vec2, vec3, vec4 };
})()"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports_constructors() {
        let source = vector_library();
        assert!(source.starts_with("(() => {"));
        assert!(source.ends_with("})()"));
        assert!(source.contains("return { vec2, vec3, vec4 };"));
    }

    #[test]
    fn test_library_covers_vector_methods() {
        let source = vector_library();
        for method in [
            "add(o)", "sub(o)", "mul(o)", "div(o)", "mod(o)", "neg()", "dot(o)", "length()",
            "distance(o)", "normalize()", "clamp(lo, hi)", "mix(o, t)", "equals(o)", "fract()",
        ] {
            assert!(source.contains(method), "{method}");
        }
        assert!(source.contains("\"cross\""));
    }
}
