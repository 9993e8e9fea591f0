//! The type-erased scalar model.
//!
//! Every coordinate or data element read from or written to storage passes through `Value`, a
//! closed tagged union over the twelve scalar kinds the storage layer knows about. The merge
//! algorithms only ever compare, order and copy `Value`s, so they never see a raw type code.
//!
use std::cmp::Ordering;
use std::fmt;
use std::result;

use num_traits::{cast, NumCast};
use paste::paste;
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// The twelve scalar kinds, numbered with their storage type codes.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TypeCode {
    Byte = 1,
    Char = 2,
    Short = 3,
    Int = 4,
    Float = 5,
    Double = 6,
    UByte = 7,
    UShort = 8,
    UInt = 9,
    Int64 = 10,
    UInt64 = 11,
    String = 12,
}

impl TypeCode {
    pub const ALL: [TypeCode; 12] = [
        TypeCode::Byte,
        TypeCode::Char,
        TypeCode::Short,
        TypeCode::Int,
        TypeCode::Float,
        TypeCode::Double,
        TypeCode::UByte,
        TypeCode::UShort,
        TypeCode::UInt,
        TypeCode::Int64,
        TypeCode::UInt64,
        TypeCode::String,
    ];

    /// The raw storage code for this kind
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn name(self) -> &'static str {
        match self {
            TypeCode::Byte => "byte",
            TypeCode::Char => "char",
            TypeCode::Short => "short",
            TypeCode::Int => "int",
            TypeCode::Float => "float",
            TypeCode::Double => "double",
            TypeCode::UByte => "ubyte",
            TypeCode::UShort => "ushort",
            TypeCode::UInt => "uint",
            TypeCode::Int64 => "int64",
            TypeCode::UInt64 => "uint64",
            TypeCode::String => "string",
        }
    }

    /// Resolve a raw storage code, failing with `Error::Type` if it isn't one of the twelve
    /// recognized kinds.
    ///
    /// # Arguments
    ///
    /// * `code` - The raw type code as reported by storage.
    /// * `context` - Describes where the code was found (dataset path, variable or attribute
    ///   name), for the error message.
    ///
    pub fn resolve<C: fmt::Display>(code: i32, context: C) -> Result<Self> {
        Self::try_from(code).map_err(|code| Error::Type {
            code,
            context: context.to_string(),
        })
    }
}

impl TryFrom<i32> for TypeCode {
    type Error = i32;

    fn try_from(code: i32) -> result::Result<Self, i32> {
        match code {
            1..=12 => Ok(Self::ALL[(code - 1) as usize]),
            _ => Err(code),
        }
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single scalar of one of the twelve kinds.
///
/// Equality is exact and never crosses kinds: `Int(1) != Int64(1)`. Floating point values
/// compare by bit pattern, so a NaN equals itself and `0.0` differs from `-0.0`.
///
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Value {
    Byte(i8),
    Char(u8),
    Short(i16),
    Int(i32),
    Float(#[serde(with = "float32")] f32),
    Double(#[serde(with = "float64")] f64),
    UByte(u8),
    UShort(u16),
    UInt(u32),
    Int64(i64),
    UInt64(u64),
    String(String),
}

/// JSON has no NaN or infinity, so non-finite floats are written as a string holding the hex
/// digits of their bit pattern. Finite floats are written as plain numbers.
macro_rules! float_serde {
    ($module:ident, $float:ident, $bits:ident) => {
        mod $module {
            use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

            #[derive(Deserialize)]
            #[serde(untagged)]
            enum Repr {
                Number($float),
                Bits(String),
            }

            pub fn serialize<S>(n: &$float, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                if n.is_finite() {
                    n.serialize(serializer)
                } else {
                    serializer.serialize_str(&format!("0x{:x}", n.to_bits()))
                }
            }

            pub fn deserialize<'de, D>(deserializer: D) -> Result<$float, D::Error>
            where
                D: Deserializer<'de>,
            {
                match Repr::deserialize(deserializer)? {
                    Repr::Number(n) => Ok(n),
                    Repr::Bits(s) => s
                        .strip_prefix("0x")
                        .and_then(|hex| $bits::from_str_radix(hex, 16).ok())
                        .map($float::from_bits)
                        .ok_or_else(|| de::Error::custom(format!("invalid float bits: {s:?}"))),
                }
            }
        }
    };
}

float_serde!(float32, f32, u32);
float_serde!(float64, f64, u64);

/// Native types that map one to one onto a `Value` variant.
///
pub trait Scalar: Sized {
    const TYPE_CODE: TypeCode;

    fn from_value(value: &Value) -> Option<Self>;

    fn into_value(self) -> Value;
}

macro_rules! Scalar {
    ($variant:ident, $type:ident) => {
        paste! {
            impl Scalar for $type {
                const TYPE_CODE: TypeCode = TypeCode::$variant;

                fn from_value(value: &Value) -> Option<Self> {
                    match value {
                        Value::$variant(n) => Some(*n),
                        _ => None,
                    }
                }

                fn into_value(self) -> Value {
                    Value::$variant(self)
                }
            }

            impl From<$type> for Value {
                fn from(n: $type) -> Self {
                    n.into_value()
                }
            }

            impl Value {
                pub fn [<as_ $type>](&self) -> Option<$type> {
                    $type::from_value(self)
                }
            }
        }
    };
}

Scalar!(Byte, i8);
Scalar!(Short, i16);
Scalar!(Int, i32);
Scalar!(Float, f32);
Scalar!(Double, f64);
Scalar!(UByte, u8);
Scalar!(UShort, u16);
Scalar!(UInt, u32);
Scalar!(Int64, i64);
Scalar!(UInt64, u64);

impl Scalar for String {
    const TYPE_CODE: TypeCode = TypeCode::String;

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        Value::String(self)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        s.into_value()
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl Value {
    pub fn type_code(&self) -> TypeCode {
        match self {
            Value::Byte(_) => TypeCode::Byte,
            Value::Char(_) => TypeCode::Char,
            Value::Short(_) => TypeCode::Short,
            Value::Int(_) => TypeCode::Int,
            Value::Float(_) => TypeCode::Float,
            Value::Double(_) => TypeCode::Double,
            Value::UByte(_) => TypeCode::UByte,
            Value::UShort(_) => TypeCode::UShort,
            Value::UInt(_) => TypeCode::UInt,
            Value::Int64(_) => TypeCode::Int64,
            Value::UInt64(_) => TypeCode::UInt64,
            Value::String(_) => TypeCode::String,
        }
    }

    /// Get the value as native type `T`, if it is of `T`'s kind.
    pub fn get<T: Scalar>(&self) -> Option<T> {
        T::from_value(self)
    }

    pub fn as_char(&self) -> Option<u8> {
        match self {
            Value::Char(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// The value storage reports for a cell that was never written.
    ///
    pub fn fill(type_code: TypeCode) -> Self {
        match type_code {
            TypeCode::Byte => Value::Byte(-127),
            TypeCode::Char => Value::Char(0),
            TypeCode::Short => Value::Short(-32767),
            TypeCode::Int => Value::Int(-2147483647),
            TypeCode::Float => Value::Float(9.969_209_968_386_869e36),
            TypeCode::Double => Value::Double(9.969_209_968_386_869e36),
            TypeCode::UByte => Value::UByte(255),
            TypeCode::UShort => Value::UShort(65535),
            TypeCode::UInt => Value::UInt(4294967295),
            TypeCode::Int64 => Value::Int64(-9223372036854775806),
            TypeCode::UInt64 => Value::UInt64(18446744073709551614),
            TypeCode::String => Value::String(String::new()),
        }
    }

    /// Convert to another kind.
    ///
    /// Numeric kinds convert among themselves as long as the value is representable in the
    /// target kind. Text kinds only "convert" to themselves. Returns `None` when no conversion is
    /// possible.
    ///
    pub fn cast(&self, to: TypeCode) -> Option<Value> {
        if self.type_code() == to {
            return Some(self.clone());
        }

        match *self {
            Value::Byte(n) => cast_number(n, to),
            Value::Short(n) => cast_number(n, to),
            Value::Int(n) => cast_number(n, to),
            Value::Float(n) => cast_number(n, to),
            Value::Double(n) => cast_number(n, to),
            Value::UByte(n) => cast_number(n, to),
            Value::UShort(n) => cast_number(n, to),
            Value::UInt(n) => cast_number(n, to),
            Value::Int64(n) => cast_number(n, to),
            Value::UInt64(n) => cast_number(n, to),
            Value::Char(_) | Value::String(_) => None,
        }
    }

    /// Total order used to sort a coordinate axis.
    ///
    /// Numeric order within a kind (IEEE total order for floating point), lexicographic order
    /// for strings. Values of different kinds order by type code.
    ///
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Byte(a), Value::Byte(b)) => a.cmp(b),
            (Value::Char(a), Value::Char(b)) => a.cmp(b),
            (Value::Short(a), Value::Short(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::Double(a), Value::Double(b)) => a.total_cmp(b),
            (Value::UByte(a), Value::UByte(b)) => a.cmp(b),
            (Value::UShort(a), Value::UShort(b)) => a.cmp(b),
            (Value::UInt(a), Value::UInt(b)) => a.cmp(b),
            (Value::Int64(a), Value::Int64(b)) => a.cmp(b),
            (Value::UInt64(a), Value::UInt64(b)) => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            _ => self.type_code().cmp(&other.type_code()),
        }
    }
}

fn cast_number<N: NumCast + Copy>(n: N, to: TypeCode) -> Option<Value> {
    let value = match to {
        TypeCode::Byte => Value::Byte(cast(n)?),
        TypeCode::Short => Value::Short(cast(n)?),
        TypeCode::Int => Value::Int(cast(n)?),
        TypeCode::Float => Value::Float(cast(n)?),
        TypeCode::Double => Value::Double(cast(n)?),
        TypeCode::UByte => Value::UByte(cast(n)?),
        TypeCode::UShort => Value::UShort(cast(n)?),
        TypeCode::UInt => Value::UInt(cast(n)?),
        TypeCode::Int64 => Value::Int64(cast(n)?),
        TypeCode::UInt64 => Value::UInt64(cast(n)?),
        TypeCode::Char | TypeCode::String => return None,
    };

    Some(value)
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Byte(a), Value::Byte(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Short(a), Value::Short(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::UByte(a), Value::UByte(b)) => a == b,
            (Value::UShort(a), Value::UShort(b)) => a == b,
            (Value::UInt(a), Value::UInt(b)) => a == b,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::UInt64(a), Value::UInt64(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Byte(n) => write!(f, "{n}"),
            Value::Char(c) => write!(f, "{}", *c as char),
            Value::Short(n) => write!(f, "{n}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::Double(n) => write!(f, "{n}"),
            Value::UByte(n) => write!(f, "{n}"),
            Value::UShort(n) => write!(f, "{n}"),
            Value::UInt(n) => write!(f, "{n}"),
            Value::Int64(n) => write!(f, "{n}"),
            Value::UInt64(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s:?}"),
        }
    }
}
