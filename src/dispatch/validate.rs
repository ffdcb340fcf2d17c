//! Required-field validation for decoded bodies.
//!
//! A field is required when it appears in the value's serialized form.
//! Fields without a serialization key (`#[serde(skip)]`) never appear, and
//! omissible fields (`#[serde(skip_serializing_if = "...")]`) are skipped
//! when they are empty, so both are exempt.
//!
//! A required field is empty when it is an unset `Option`, an empty string,
//! or a sequence or map with no elements. A set `Option` is never empty,
//! whatever it holds. Numbers, booleans and nested records are never empty.
//! This is not schema validation: no ranges, no formats.
//!
//! The check walks the value with a serializer that only looks at the
//! top-level fields, so nothing is encoded or allocated per field.

use std::fmt;

use serde::ser::{self, Impossible, Serialize, Serializer};

/// Name of the first required field found empty.
///
/// The name is empty when the value is not a record at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmptyField(pub String);

/// Check every required field of `value` is non-empty.
pub fn required_fields_present<T: Serialize>(value: &T) -> Result<(), EmptyField> {
    match value.serialize(RecordWalker) {
        Ok(None) => Ok(()),
        Ok(Some(field)) => Err(EmptyField(field.to_owned())),
        Err(_) => Err(EmptyField(String::new())),
    }
}

#[derive(Debug)]
struct WalkError(String);

impl fmt::Display for WalkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for WalkError {}

impl ser::Error for WalkError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        WalkError(msg.to_string())
    }
}

fn not_a_record<T>() -> Result<T, WalkError> {
    Err(WalkError("body is not a record".to_owned()))
}

/// Accepts a record and reports its first empty field.
struct RecordWalker;

type Rejected = Impossible<Option<&'static str>, WalkError>;

macro_rules! reject_scalars {
    ($($method:ident($ty:ty)),* $(,)?) => {
        $(
            fn $method(self, _: $ty) -> Result<Self::Ok, Self::Error> {
                not_a_record()
            }
        )*
    };
}

impl Serializer for RecordWalker {
    type Ok = Option<&'static str>;
    type Error = WalkError;
    type SerializeSeq = Rejected;
    type SerializeTuple = Rejected;
    type SerializeTupleStruct = Rejected;
    type SerializeTupleVariant = Rejected;
    type SerializeMap = Rejected;
    type SerializeStruct = FieldCheck;
    type SerializeStructVariant = Rejected;

    reject_scalars! {
        serialize_bool(bool),
        serialize_i8(i8),
        serialize_i16(i16),
        serialize_i32(i32),
        serialize_i64(i64),
        serialize_u8(u8),
        serialize_u16(u16),
        serialize_u32(u32),
        serialize_u64(u64),
        serialize_f32(f32),
        serialize_f64(f64),
        serialize_char(char),
        serialize_str(&str),
        serialize_bytes(&[u8]),
        serialize_unit_struct(&'static str),
    }

    fn serialize_none(self) -> Result<Self::Ok, Self::Error> {
        not_a_record()
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<Self::Ok, Self::Error> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Self::Ok, Self::Error> {
        not_a_record()
    }

    fn serialize_unit_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
    ) -> Result<Self::Ok, Self::Error> {
        not_a_record()
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _: &'static str,
        value: &T,
    ) -> Result<Self::Ok, Self::Error> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: &T,
    ) -> Result<Self::Ok, Self::Error> {
        not_a_record()
    }

    fn serialize_seq(self, _: Option<usize>) -> Result<Self::SerializeSeq, Self::Error> {
        not_a_record()
    }

    fn serialize_tuple(self, _: usize) -> Result<Self::SerializeTuple, Self::Error> {
        not_a_record()
    }

    fn serialize_tuple_struct(
        self,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeTupleStruct, Self::Error> {
        not_a_record()
    }

    fn serialize_tuple_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeTupleVariant, Self::Error> {
        not_a_record()
    }

    fn serialize_map(self, _: Option<usize>) -> Result<Self::SerializeMap, Self::Error> {
        not_a_record()
    }

    fn serialize_struct(
        self,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeStruct, Self::Error> {
        Ok(FieldCheck { first_empty: None })
    }

    fn serialize_struct_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeStructVariant, Self::Error> {
        not_a_record()
    }
}

struct FieldCheck {
    first_empty: Option<&'static str>,
}

impl ser::SerializeStruct for FieldCheck {
    type Ok = Option<&'static str>;
    type Error = WalkError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), Self::Error> {
        if self.first_empty.is_none() && value.serialize(EmptinessCheck)? {
            self.first_empty = Some(key);
        }
        Ok(())
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Ok(self.first_empty)
    }
}

/// Answers whether one field value is empty.
struct EmptinessCheck;

macro_rules! never_empty {
    ($($method:ident($ty:ty)),* $(,)?) => {
        $(
            fn $method(self, _: $ty) -> Result<bool, WalkError> {
                Ok(false)
            }
        )*
    };
}

impl Serializer for EmptinessCheck {
    type Ok = bool;
    type Error = WalkError;
    type SerializeSeq = Counter;
    type SerializeTuple = Counter;
    type SerializeTupleStruct = Opaque;
    type SerializeTupleVariant = Opaque;
    type SerializeMap = Counter;
    type SerializeStruct = Opaque;
    type SerializeStructVariant = Opaque;

    never_empty! {
        serialize_bool(bool),
        serialize_i8(i8),
        serialize_i16(i16),
        serialize_i32(i32),
        serialize_i64(i64),
        serialize_u8(u8),
        serialize_u16(u16),
        serialize_u32(u32),
        serialize_u64(u64),
        serialize_f32(f32),
        serialize_f64(f64),
        serialize_char(char),
        serialize_unit_struct(&'static str),
    }

    fn serialize_str(self, v: &str) -> Result<bool, WalkError> {
        Ok(v.is_empty())
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<bool, WalkError> {
        Ok(v.is_empty())
    }

    fn serialize_none(self) -> Result<bool, WalkError> {
        Ok(true)
    }

    fn serialize_some<T: ?Sized + Serialize>(self, _: &T) -> Result<bool, WalkError> {
        Ok(false)
    }

    /// `()` and `serde_json::Value::Null` both land here.
    fn serialize_unit(self) -> Result<bool, WalkError> {
        Ok(true)
    }

    fn serialize_unit_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
    ) -> Result<bool, WalkError> {
        Ok(false)
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _: &'static str,
        value: &T,
    ) -> Result<bool, WalkError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: &T,
    ) -> Result<bool, WalkError> {
        Ok(false)
    }

    fn serialize_seq(self, _: Option<usize>) -> Result<Counter, WalkError> {
        Ok(Counter(0))
    }

    fn serialize_tuple(self, _: usize) -> Result<Counter, WalkError> {
        Ok(Counter(0))
    }

    fn serialize_tuple_struct(self, _: &'static str, _: usize) -> Result<Opaque, WalkError> {
        Ok(Opaque)
    }

    fn serialize_tuple_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Opaque, WalkError> {
        Ok(Opaque)
    }

    fn serialize_map(self, _: Option<usize>) -> Result<Counter, WalkError> {
        Ok(Counter(0))
    }

    fn serialize_struct(self, _: &'static str, _: usize) -> Result<Opaque, WalkError> {
        Ok(Opaque)
    }

    fn serialize_struct_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Opaque, WalkError> {
        Ok(Opaque)
    }
}

/// Counts elements without looking at them; empty when none arrive.
struct Counter(usize);

impl ser::SerializeSeq for Counter {
    type Ok = bool;
    type Error = WalkError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, _: &T) -> Result<(), WalkError> {
        self.0 += 1;
        Ok(())
    }

    fn end(self) -> Result<bool, WalkError> {
        Ok(self.0 == 0)
    }
}

impl ser::SerializeTuple for Counter {
    type Ok = bool;
    type Error = WalkError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, _: &T) -> Result<(), WalkError> {
        self.0 += 1;
        Ok(())
    }

    fn end(self) -> Result<bool, WalkError> {
        Ok(self.0 == 0)
    }
}

impl ser::SerializeMap for Counter {
    type Ok = bool;
    type Error = WalkError;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, _: &T) -> Result<(), WalkError> {
        self.0 += 1;
        Ok(())
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, _: &T) -> Result<(), WalkError> {
        Ok(())
    }

    fn end(self) -> Result<bool, WalkError> {
        Ok(self.0 == 0)
    }
}

/// Nested records and variants: never empty, contents ignored.
struct Opaque;

impl ser::SerializeTupleStruct for Opaque {
    type Ok = bool;
    type Error = WalkError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, _: &T) -> Result<(), WalkError> {
        Ok(())
    }

    fn end(self) -> Result<bool, WalkError> {
        Ok(false)
    }
}

impl ser::SerializeTupleVariant for Opaque {
    type Ok = bool;
    type Error = WalkError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, _: &T) -> Result<(), WalkError> {
        Ok(())
    }

    fn end(self) -> Result<bool, WalkError> {
        Ok(false)
    }
}

impl ser::SerializeStruct for Opaque {
    type Ok = bool;
    type Error = WalkError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        _: &'static str,
        _: &T,
    ) -> Result<(), WalkError> {
        Ok(())
    }

    fn end(self) -> Result<bool, WalkError> {
        Ok(false)
    }
}

impl ser::SerializeStructVariant for Opaque {
    type Ok = bool;
    type Error = WalkError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        _: &'static str,
        _: &T,
    ) -> Result<(), WalkError> {
        Ok(())
    }

    fn end(self) -> Result<bool, WalkError> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::collections::HashMap;

    #[derive(Debug, Serialize, Deserialize)]
    struct Payload {
        message: String,
        #[serde(rename = "messagePtr")]
        message_ptr: Option<String>,
        code: i64,
        #[serde(rename = "codePtr")]
        code_ptr: Option<i64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct WithOptional {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        nickname: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tags: Vec<String>,
        #[serde(skip)]
        internal: String,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Meta {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Marker;

    #[derive(Debug, Serialize, Deserialize)]
    struct Tagged {
        name: String,
        meta: Meta,
        marker: Marker,
    }

    fn payload() -> Payload {
        Payload {
            message: "Hello".into(),
            message_ptr: Some("Hello".into()),
            code: 200,
            code_ptr: Some(200),
        }
    }

    #[test]
    fn test_complete_payload_passes() {
        assert_eq!(required_fields_present(&payload()), Ok(()));
    }

    #[test]
    fn test_unset_option_fails() {
        let mut p = payload();
        p.message_ptr = None;
        assert_eq!(
            required_fields_present(&p),
            Err(EmptyField("messagePtr".into()))
        );
    }

    #[test]
    fn test_set_option_passes_even_when_inner_is_empty() {
        let p: Payload = serde_json::from_str(
            r#"{"message":"Hello","messagePtr":"","code":0,"codePtr":0}"#,
        )
        .unwrap();
        assert_eq!(required_fields_present(&p), Ok(()));

        #[derive(Serialize)]
        struct Items {
            items: Option<Vec<u8>>,
        }
        assert_eq!(required_fields_present(&Items { items: Some(vec![]) }), Ok(()));
    }

    #[test]
    fn test_empty_string_fails() {
        let mut p = payload();
        p.message = String::new();
        assert_eq!(
            required_fields_present(&p),
            Err(EmptyField("message".into()))
        );
    }

    #[test]
    fn test_zero_number_is_not_empty() {
        let mut p = payload();
        p.code = 0;
        assert_eq!(required_fields_present(&p), Ok(()));
    }

    #[test]
    fn test_nested_records_are_never_empty() {
        let value: Tagged =
            serde_json::from_str(r#"{"name":"a","meta":{},"marker":null}"#).unwrap();
        assert!(value.meta.source.is_none());
        assert_eq!(required_fields_present(&value), Ok(()));
    }

    #[test]
    fn test_omissible_and_skipped_fields_exempt() {
        let value = WithOptional {
            name: "ada".into(),
            nickname: None,
            tags: Vec::new(),
            internal: String::new(),
        };
        assert!(value.internal.is_empty());
        assert_eq!(required_fields_present(&value), Ok(()));
    }

    #[test]
    fn test_empty_collections_fail() {
        #[derive(Serialize)]
        struct Collections {
            items: Vec<u8>,
            labels: HashMap<String, String>,
        }

        let value = Collections {
            items: vec![1],
            labels: HashMap::new(),
        };
        assert_eq!(
            required_fields_present(&value),
            Err(EmptyField("labels".into()))
        );
    }

    #[test]
    fn test_newtype_is_transparent() {
        #[derive(Serialize)]
        struct Name(String);

        #[derive(Serialize)]
        struct Person {
            name: Name,
        }

        assert_eq!(
            required_fields_present(&Person {
                name: Name(String::new())
            }),
            Err(EmptyField("name".into()))
        );
    }

    #[test]
    fn test_non_record_fails() {
        assert_eq!(required_fields_present(&42), Err(EmptyField(String::new())));
        assert!(required_fields_present(&vec!["a"]).is_err());
        assert!(required_fields_present(&HashMap::<String, String>::new()).is_err());
    }
}
