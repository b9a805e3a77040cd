/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

//! The argument list carried by an invocation.
//!
//! A call's arguments are passed as one Rust value. A tuple is a list of arguments,
//! `()` is no arguments and any other value is exactly one argument. Each argument
//! becomes one JSON entry, so nested sequences and optional values keep their shape.

use std::fmt;

use serde::de::{self, DeserializeOwned, Deserializer, Visitor};
use serde::ser::{self, Impossible, Serializer};
use serde::Serialize;
use serde_json::Value;

use crate::common::ActiveError;

/// Encodes call arguments as the ordered list carried by an invocation.
///
/// A tuple becomes one entry per element, `()` becomes an empty list and anything else,
/// sequences included, becomes a single entry.
///
/// # Errors
///
/// [`ActiveError::Serialization`] if `args` cannot be represented as JSON.
pub fn encode_arguments<Args: Serialize + ?Sized>(args: &Args) -> Result<Vec<Value>, ActiveError> {
    match shape_of(args) {
        Shape::Unit => Ok(Vec::new()),
        Shape::Tuple => match serde_json::to_value(args)? {
            Value::Array(items) => Ok(items),
            other => Ok(vec![other]),
        },
        Shape::Single => Ok(vec![serde_json::to_value(args)?]),
    }
}

/// Decodes an invocation's argument list into the method's parameter type.
///
/// Inverse of [`encode_arguments`]: a tuple takes the entries in order, `()` takes an
/// empty list and any other type takes exactly one entry.
///
/// # Errors
///
/// [`ActiveError::InvalidArguments`] if the list does not fit the parameter type.
pub fn decode_arguments<Args: DeserializeOwned>(
    method: &str,
    arguments: &[Value],
) -> Result<Args, ActiveError> {
    <Args as serde::Deserialize>::deserialize(ArgumentList(arguments.to_vec())).map_err(|err| ActiveError::InvalidArguments {
        method: method.to_string(),
        reason: err.to_string(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Unit,
    Tuple,
    Single,
}

fn shape_of<T: Serialize + ?Sized>(value: &T) -> Shape {
    match value.serialize(OuterShape) {
        Ok(shape) | Err(ShapeError(shape)) => shape,
    }
}

/// Serializer that only looks at the outermost kind of a value.
struct OuterShape;

/// Carries the shape out of the compound serializer entry points.
#[derive(Debug)]
struct ShapeError(Shape);

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl std::error::Error for ShapeError {}

impl ser::Error for ShapeError {
    fn custom<T: fmt::Display>(_msg: T) -> Self {
        Self(Shape::Single)
    }
}

macro_rules! single_scalar {
    ($($method:ident: $ty:ty),* $(,)?) => {$(
        fn $method(self, _v: $ty) -> Result<Shape, ShapeError> {
            Ok(Shape::Single)
        }
    )*};
}

impl Serializer for OuterShape {
    type Ok = Shape;
    type Error = ShapeError;
    type SerializeSeq = Impossible<Shape, ShapeError>;
    type SerializeTuple = Impossible<Shape, ShapeError>;
    type SerializeTupleStruct = Impossible<Shape, ShapeError>;
    type SerializeTupleVariant = Impossible<Shape, ShapeError>;
    type SerializeMap = Impossible<Shape, ShapeError>;
    type SerializeStruct = Impossible<Shape, ShapeError>;
    type SerializeStructVariant = Impossible<Shape, ShapeError>;

    single_scalar! {
        serialize_bool: bool,
        serialize_i8: i8,
        serialize_i16: i16,
        serialize_i32: i32,
        serialize_i64: i64,
        serialize_i128: i128,
        serialize_u8: u8,
        serialize_u16: u16,
        serialize_u32: u32,
        serialize_u64: u64,
        serialize_u128: u128,
        serialize_f32: f32,
        serialize_f64: f64,
        serialize_char: char,
        serialize_str: &str,
        serialize_bytes: &[u8],
    }

    fn serialize_none(self) -> Result<Shape, ShapeError> {
        Ok(Shape::Single)
    }

    fn serialize_some<T: Serialize + ?Sized>(self, _value: &T) -> Result<Shape, ShapeError> {
        Ok(Shape::Single)
    }

    fn serialize_unit(self) -> Result<Shape, ShapeError> {
        Ok(Shape::Unit)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Shape, ShapeError> {
        Ok(Shape::Single)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
    ) -> Result<Shape, ShapeError> {
        Ok(Shape::Single)
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _value: &T,
    ) -> Result<Shape, ShapeError> {
        Ok(Shape::Single)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<Shape, ShapeError> {
        Ok(Shape::Single)
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, ShapeError> {
        Err(ShapeError(Shape::Single))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, ShapeError> {
        Err(ShapeError(Shape::Tuple))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, ShapeError> {
        Err(ShapeError(Shape::Single))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, ShapeError> {
        Err(ShapeError(Shape::Single))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, ShapeError> {
        Err(ShapeError(Shape::Single))
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, ShapeError> {
        Err(ShapeError(Shape::Single))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, ShapeError> {
        Err(ShapeError(Shape::Single))
    }
}

/// Deserializer over an invocation's argument list.
struct ArgumentList(Vec<Value>);

impl ArgumentList {
    fn single(mut self) -> Result<Value, serde_json::Error> {
        match self.0.len() {
            1 => Ok(self.0.remove(0)),
            n => Err(de::Error::invalid_length(n, &"exactly one argument")),
        }
    }
}

macro_rules! forward_to_single {
    ($($method:ident)*) => {$(
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
            self.single()?.$method(visitor)
        }
    )*};
}

impl<'de> Deserializer<'de> for ArgumentList {
    type Error = serde_json::Error;

    forward_to_single! {
        deserialize_any deserialize_bool
        deserialize_i8 deserialize_i16 deserialize_i32 deserialize_i64 deserialize_i128
        deserialize_u8 deserialize_u16 deserialize_u32 deserialize_u64 deserialize_u128
        deserialize_f32 deserialize_f64 deserialize_char
        deserialize_str deserialize_string deserialize_bytes deserialize_byte_buf
        deserialize_option deserialize_seq deserialize_map
        deserialize_identifier deserialize_ignored_any
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0.len() {
            0 => visitor.visit_unit(),
            n => Err(de::Error::invalid_length(n, &"no arguments")),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, len: usize, visitor: V) -> Result<V::Value, Self::Error> {
        Value::Array(self.0).deserialize_tuple(len, visitor)
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.single()?.deserialize_unit_struct(name, visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.single()?.deserialize_newtype_struct(name, visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.single()?.deserialize_tuple_struct(name, len, visitor)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.single()?.deserialize_struct(name, fields, visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.single()?.deserialize_enum(name, variants, visitor)
    }
}
