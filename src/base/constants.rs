//! Language constants for the Thrift IDL.

/// File extensions recognized as Thrift sources.
pub const THRIFT_EXTENSIONS: &[&str] = &["thrift"];

/// Built-in scalar types. `void` is only meaningful as a method return type
/// but resolves everywhere, matching the lenient linting contract.
pub const PRIMITIVE_TYPES: &[&str] = &[
    "bool", "byte", "i8", "i16", "i32", "i64", "double", "string", "binary", "uuid", "slist",
    "void",
];

/// Integral scalar types whose defaults must be integer literals.
pub const INTEGRAL_TYPES: &[&str] = &["byte", "i8", "i16", "i32", "i64"];

/// Field requiredness qualifiers.
pub const REQUIREDNESS: &[&str] = &["required", "optional"];

/// Check if a type name is a built-in primitive.
pub fn is_primitive(name: &str) -> bool {
    PRIMITIVE_TYPES.contains(&name)
}

/// Check if a type name is an integral primitive.
pub fn is_integral(name: &str) -> bool {
    INTEGRAL_TYPES.contains(&name)
}
