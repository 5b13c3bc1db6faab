use std::fmt;

use crate::runner::ds::heap::HeapRef;

/// Reference to a native function registered on a built-in object.
///
/// `on_prototype` selects the instance methods (`"abc".toUpperCase`) rather
/// than the static ones (`Math.max`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeFunctionRef {
    pub object: String,
    pub name: String,
    pub on_prototype: bool,
}

impl NativeFunctionRef {
    pub fn new_static(object: impl Into<String>, name: impl Into<String>) -> Self {
        NativeFunctionRef {
            object: object.into(),
            name: name.into(),
            on_prototype: false,
        }
    }

    pub fn new_prototype(object: impl Into<String>, name: impl Into<String>) -> Self {
        NativeFunctionRef {
            object: object.into(),
            name: name.into(),
            on_prototype: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JsValue {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    /// A plain object or an array living on the evaluation heap.
    Object(HeapRef),
    /// A read-only object from the built-in registry, such as `Math`.
    BuiltIn(String),
    Function(NativeFunctionRef),
}

impl JsValue {
    pub fn is_nullish(&self) -> bool {
        matches!(self, JsValue::Undefined | JsValue::Null)
    }
}

impl fmt::Display for JsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsValue::Undefined => write!(f, "undefined"),
            JsValue::Null => write!(f, "null"),
            JsValue::Boolean(b) => write!(f, "{}", b),
            JsValue::Number(n) => write!(
                f,
                "{}",
                crate::runner::ds::operations::type_conversion::number_to_string(*n)
            ),
            JsValue::String(s) => write!(f, "{}", s),
            JsValue::Object(_) => write!(f, "[object Object]"),
            JsValue::BuiltIn(name) => write!(f, "[object {}]", name),
            JsValue::Function(func) => write!(f, "function {}() {{ [native code] }}", func.name),
        }
    }
}
